//! Capacities of investable assets, as read back from a previous run for out-of-sample solves.
use crate::generator::GeneratorID;
use crate::heat::{ConverterID, NeighbourhoodID};
use crate::horizon::Period;
use crate::network::NodeID;
use crate::storage::StorageID;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A row of `generator_capacities.csv`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct GeneratorCapacityRow {
    pub node: NodeID,
    pub generator: GeneratorID,
    pub period: Period,
    pub invested: f64,
    pub installed: f64,
}

/// A row of `transmission_capacities.csv`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct TransmissionCapacityRow {
    pub from_node: NodeID,
    pub to_node: NodeID,
    pub period: Period,
    pub invested: f64,
    pub installed: f64,
}

/// A row of `storage_capacities.csv`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct StorageCapacityRow {
    pub node: NodeID,
    pub storage: StorageID,
    pub period: Period,
    pub power_invested: f64,
    pub power_installed: f64,
    pub energy_invested: f64,
    pub energy_installed: f64,
}

/// A row of `converter_capacities.csv`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct ConverterCapacityRow {
    pub node: NodeID,
    pub converter: ConverterID,
    pub period: Period,
    pub invested: f64,
    pub installed: f64,
}

/// A row of `neighbourhood_capacities.csv`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct NeighbourhoodCapacityRow {
    pub node: NodeID,
    pub neighbourhood: NeighbourhoodID,
    pub period: Period,
    pub invested: f64,
    pub installed: f64,
}

/// An investable asset at a particular location
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CapacityAsset {
    /// A generator at a node
    Generator(NodeID, GeneratorID),
    /// A bidirectional transmission line
    Transmission(NodeID, NodeID),
    /// The power rating of a storage at a node
    StoragePower(NodeID, StorageID),
    /// The energy rating of a storage at a node
    StorageEnergy(NodeID, StorageID),
    /// A converter at a node
    Converter(NodeID, ConverterID),
    /// A neighbourhood at a node
    Neighbourhood(NodeID, NeighbourhoodID),
}

/// Capacity invested in a period and installed capacity during it
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct CapacityValues {
    /// Capacity added in the period
    pub invested: f64,
    /// Capacity available for dispatch in the period
    pub installed: f64,
}

/// Capacities which are fixed rather than chosen by the optimisation
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FixedCapacities(HashMap<(CapacityAsset, Period), CapacityValues>);

impl FixedCapacities {
    /// Look up the capacities of an asset in a period.
    ///
    /// Assets missing from the previous run's results have zero capacity.
    pub fn get(&self, asset: &CapacityAsset, period: Period) -> CapacityValues {
        self.0
            .get(&(asset.clone(), period))
            .copied()
            .unwrap_or_default()
    }

    /// Set the capacities of an asset in a period, returning the old values if there were any
    pub fn insert(
        &mut self,
        asset: CapacityAsset,
        period: Period,
        values: CapacityValues,
    ) -> Option<CapacityValues> {
        self.0.insert((asset, period), values)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_capacities_default_zero() {
        let mut capacities = FixedCapacities::default();
        let asset = CapacityAsset::Generator("north".into(), "gas".into());
        let values = CapacityValues {
            invested: 10.0,
            installed: 25.0,
        };
        assert!(capacities.insert(asset.clone(), 1, values).is_none());
        assert_eq!(capacities.get(&asset, 1), values);
        assert_eq!(capacities.get(&asset, 2), CapacityValues::default());

        let other = CapacityAsset::StoragePower("north".into(), "battery".into());
        assert_eq!(capacities.get(&other, 1).installed, 0.0);
    }
}
