//! Entities and parameters of the demand response module.
use crate::horizon::{Hour, Period, ScenarioID};
use crate::input::table::ParamTable;
use crate::network::NodeID;
use crate::storage::StorageID;
use indexmap::IndexMap;
use serde::Deserialize;

fn default_activation() -> f64 {
    1.0
}

/// One segment of the piecewise-linear activation cost of a demand response storage.
///
/// The segment bounds the marginal cost variable from below by
/// `cost * (discharge + charge - (1 - activation) * installed_power)`, so it only starts to bite
/// once the shifted demand exceeds `1 - activation` of the installed power capacity.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct CostPiece {
    /// The storage this segment applies to
    pub storage_id: StorageID,
    /// Position of the segment
    pub piece: u32,
    /// Slope of the segment
    pub cost: f64,
    /// Fraction of installed power from which the segment applies
    #[serde(default = "default_activation")]
    pub activation: f64,
}

/// Hourly parameters of demand response storage
#[derive(Clone, Debug, PartialEq)]
pub struct DemandResponseParameters {
    /// Lower limit on the energy level outside the first hour of a season
    /// (node, storage, hour, period, scenario)
    pub demand: ParamTable<(NodeID, StorageID, Hour, Period, ScenarioID)>,
    /// Upper limit on the energy level (node, storage, hour, period, scenario)
    pub max_level: ParamTable<(NodeID, StorageID, Hour, Period, ScenarioID)>,
    /// Discharge availability relative to installed power (node, storage, hour, period, scenario)
    pub discharge_availability: ParamTable<(NodeID, StorageID, Hour, Period, ScenarioID)>,
    /// Charge availability relative to installed power (node, storage, hour, period, scenario)
    pub charge_availability: ParamTable<(NodeID, StorageID, Hour, Period, ScenarioID)>,
    /// Exogenous inflow to the energy level (node, storage, hour, period, scenario)
    pub baseline: ParamTable<(NodeID, StorageID, Hour, Period, ScenarioID)>,
}

impl Default for DemandResponseParameters {
    fn default() -> Self {
        Self {
            demand: ParamTable::new(0.0),
            max_level: ParamTable::new(500_000.0),
            discharge_availability: ParamTable::new(1.0),
            charge_availability: ParamTable::new(1.0),
            baseline: ParamTable::new(0.0),
        }
    }
}

/// Everything the demand response module adds to a model
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DemandResponseModule {
    /// Cost segments of each demand response storage, ordered by piece
    pub cost_pieces: IndexMap<StorageID, Vec<CostPiece>>,
    /// Demand response parameters
    pub parameters: DemandResponseParameters,
}

impl DemandResponseModule {
    /// The cost segments of a demand response storage
    pub fn cost_pieces_of(&self, storage_id: &StorageID) -> &[CostPiece] {
        self.cost_pieces
            .get(storage_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Whether the slopes of a storage's cost segments never decrease in piece order
pub fn is_convex(pieces: &[CostPiece]) -> bool {
    pieces.windows(2).all(|pair| pair[0].cost <= pair[1].cost)
}
