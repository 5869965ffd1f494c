//! The model: everything read from a model directory, ready for parameter derivation.
use crate::capacity::FixedCapacities;
use crate::demand_response::DemandResponseModule;
use crate::generator::{Generator, GeneratorID, GeneratorMap, GeneratorParameters, TechnologyID};
use crate::heat::HeatModule;
use crate::horizon::{Horizon, Period, SeasonID};
use crate::input::table::ParamTable;
use crate::network::{Network, NodeID, NodeParameters, TransmissionParameters};
use crate::storage::{Storage, StorageID, StorageMap, StorageParameters};
use indexmap::IndexSet;
use serde::Serialize;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::ModelParameters;

/// Parameters which apply to the whole system
#[derive(Clone, Debug, PartialEq)]
pub struct SystemParameters {
    /// Number of times each season is repeated to make up a year (season)
    pub season_scale: ParamTable<SeasonID>,
    /// Emission cap in MtCO2 (period)
    pub co2_cap: ParamTable<Period>,
    /// Emission price per tCO2 (period)
    pub co2_price: ParamTable<Period>,
    /// Variable cost of transporting and storing captured CO2 (period)
    pub ccs_variable_cost: ParamTable<Period>,
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            season_scale: ParamTable::new(1.0),
            co2_cap: ParamTable::new(5000.0),
            co2_price: ParamTable::new(0.0),
            ccs_variable_cost: ParamTable::new(0.0),
        }
    }
}

/// The structural options of a model, fixed once the model has been loaded
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Heat balance with converters and neighbourhoods
    pub heat: bool,
    /// Demand response storage with piecewise activation costs
    pub demand_response: bool,
    /// Exogenous load changes
    pub load_change: bool,
    /// Emissions limited by a cap rather than priced
    pub emission_cap: bool,
    /// Capacities fixed to those of a previous run
    pub out_of_sample: bool,
}

/// Model definition
pub struct Model {
    /// Path to model folder
    pub model_path: PathBuf,
    /// Parameters from the model TOML file
    pub parameters: ModelParameters,
    /// Periods, seasons and scenarios
    pub horizon: Horizon,
    /// Nodes and transmission lines
    pub network: Network,
    /// Electricity demand and hydro resources
    pub node_parameters: NodeParameters,
    /// Transmission investment parameters
    pub transmission_parameters: TransmissionParameters,
    /// Generator types
    pub generators: GeneratorMap,
    /// Technologies which generators belong to
    pub technologies: IndexSet<TechnologyID>,
    /// Which generators can be built at which nodes
    pub generators_of_node: IndexSet<(NodeID, GeneratorID)>,
    /// Generator costs and capacities
    pub generator_parameters: GeneratorParameters,
    /// Storage types
    pub storages: StorageMap,
    /// Which storages can be built at which nodes
    pub storages_of_node: IndexSet<(NodeID, StorageID)>,
    /// Storage costs and capacities
    pub storage_parameters: StorageParameters,
    /// System-wide parameters
    pub system_parameters: SystemParameters,
    /// Heat module, if enabled
    pub heat: Option<HeatModule>,
    /// Demand response module, if enabled
    pub demand_response: Option<DemandResponseModule>,
    /// Capacities from a previous run, for out-of-sample solves
    pub fixed_capacities: Option<FixedCapacities>,
}

impl Model {
    /// The structural options of this model
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            heat: self.heat.is_some(),
            demand_response: self.demand_response.is_some(),
            load_change: self.parameters.modules.load_change,
            emission_cap: self.parameters.emission_cap,
            out_of_sample: self.fixed_capacities.is_some(),
        }
    }

    /// Iterate over the generators at a node
    pub fn iter_generators_of_node<'a>(
        &'a self,
        node: &'a NodeID,
    ) -> impl Iterator<Item = &'a Generator> {
        self.generators_of_node
            .iter()
            .filter(move |(n, _)| n == node)
            .map(|(_, id)| &self.generators[id])
    }

    /// Iterate over the storages at a node
    pub fn iter_storages_of_node<'a>(
        &'a self,
        node: &'a NodeID,
    ) -> impl Iterator<Item = &'a Storage> {
        self.storages_of_node
            .iter()
            .filter(move |(n, _)| n == node)
            .map(|(_, id)| &self.storages[id])
    }

    /// Iterate over the (node, generator) pairs whose generator belongs to a technology
    pub fn iter_generators_of_technology<'a>(
        &'a self,
        node: &'a NodeID,
        technology: &'a TechnologyID,
    ) -> impl Iterator<Item = &'a Generator> {
        self.iter_generators_of_node(node)
            .filter(move |generator| generator.technology == *technology)
    }
}
