//! Entities and parameters of the heat module.
//!
//! With the heat module enabled, each node has a heat balance alongside its electricity balance.
//! Heat is supplied by heat-only and CHP generators, heat storage, converters (which turn
//! electricity into heat) and neighbourhoods (aggregated local supply blocks which can produce
//! electricity and heat and convert one into the other).
use crate::horizon::{Hour, Period, ScenarioID};
use crate::id::{define_id_getter, define_id_type};
use crate::input::table::ParamTable;
use crate::network::NodeID;
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;

define_id_type! {ConverterID}
define_id_type! {NeighbourhoodID}

/// A map of [`Converter`]s, keyed by converter ID
pub type ConverterMap = IndexMap<ConverterID, Converter>;

/// A map of [`Neighbourhood`]s, keyed by neighbourhood ID
pub type NeighbourhoodMap = IndexMap<NeighbourhoodID, Neighbourhood>;

fn default_converter_efficiency() -> f64 {
    1.0
}

fn default_neighbourhood_lifetime() -> f64 {
    60.0
}

/// A unit converting electricity into heat (e.g. a heat pump or electric boiler)
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Converter {
    /// Unique identifier
    pub id: ConverterID,
    /// Technical lifetime in years
    pub lifetime: f64,
    /// Heat delivered per unit of electricity consumed
    #[serde(default = "default_converter_efficiency")]
    pub efficiency: f64,
}
define_id_getter! {Converter, ConverterID}

/// An aggregated block of local heat and electricity supply
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Neighbourhood {
    /// Unique identifier
    pub id: NeighbourhoodID,
    /// Technical lifetime in years
    #[serde(default = "default_neighbourhood_lifetime")]
    pub lifetime: f64,
    /// Emissions per unit of installed capacity counted against the emission cap
    #[serde(default)]
    pub co2_quota: f64,
}
define_id_getter! {Neighbourhood, NeighbourhoodID}

/// Parameters of the heat module
#[derive(Clone, Debug, PartialEq)]
pub struct HeatParameters {
    /// Cost of unserved heat demand (node, period)
    pub value_of_lost_heat: ParamTable<(NodeID, Period)>,
    /// Annual heat demand which the heat load profile is scaled to (node, period)
    pub annual_demand: ParamTable<(NodeID, Period)>,
    /// Raw hourly heat load (node, hour, scenario, period)
    pub load_profile: ParamTable<(NodeID, Hour, ScenarioID, Period)>,
    /// Exogenous change to the hourly heat load (node, hour, scenario, period)
    pub load_change: ParamTable<(NodeID, Hour, ScenarioID, Period)>,
    /// Capital cost of converters (converter, period)
    pub converter_capital_cost: ParamTable<(ConverterID, Period)>,
    /// Annual fixed O&M cost of converters (converter, period)
    pub converter_fixed_om_cost: ParamTable<(ConverterID, Period)>,
    /// Converter capacity present before any investment (node, converter, period)
    pub converter_initial_capacity: ParamTable<(NodeID, ConverterID, Period)>,
    /// Converter capacity which can be built in one period (node, converter, period)
    pub converter_max_built_capacity: ParamTable<(NodeID, ConverterID, Period)>,
    /// Raw limit on installed converter capacity (node, converter)
    pub converter_max_installed_capacity: ParamTable<(NodeID, ConverterID)>,
    /// Hourly availability of converters (node, converter, hour, scenario, period)
    pub converter_availability: ParamTable<(NodeID, ConverterID, Hour, ScenarioID, Period)>,
    /// Capital cost of neighbourhoods (neighbourhood, period)
    pub neighbourhood_capital_cost: ParamTable<(NeighbourhoodID, Period)>,
    /// Annual fixed O&M cost of neighbourhoods (neighbourhood, period)
    pub neighbourhood_fixed_om_cost: ParamTable<(NeighbourhoodID, Period)>,
    /// Neighbourhood capacity present before any investment (node, neighbourhood, period)
    pub neighbourhood_initial_capacity: ParamTable<(NodeID, NeighbourhoodID, Period)>,
    /// Neighbourhood capacity which can be built in one period (node, neighbourhood, period)
    pub neighbourhood_max_built_capacity: ParamTable<(NodeID, NeighbourhoodID, Period)>,
    /// Raw limit on installed neighbourhood capacity (node, neighbourhood)
    pub neighbourhood_max_installed_capacity: ParamTable<(NodeID, NeighbourhoodID)>,
    /// Heat produced per unit of electricity converted (node, neighbourhood, hour, scenario)
    pub neighbourhood_conversion_efficiency: ParamTable<(NodeID, NeighbourhoodID, Hour, ScenarioID)>,
    /// Electricity production per unit of capacity (node, neighbourhood, hour, scenario)
    pub neighbourhood_electricity_availability:
        ParamTable<(NodeID, NeighbourhoodID, Hour, ScenarioID)>,
    /// Heat production per unit of capacity (node, neighbourhood, hour, scenario)
    pub neighbourhood_heat_availability: ParamTable<(NodeID, NeighbourhoodID, Hour, ScenarioID)>,
    /// Conversion per unit of capacity (node, neighbourhood, hour, scenario)
    pub neighbourhood_conversion_availability:
        ParamTable<(NodeID, NeighbourhoodID, Hour, ScenarioID)>,
}

impl Default for HeatParameters {
    fn default() -> Self {
        Self {
            value_of_lost_heat: ParamTable::new(22000.0),
            annual_demand: ParamTable::new(0.0),
            load_profile: ParamTable::new(0.0),
            load_change: ParamTable::new(0.0),
            converter_capital_cost: ParamTable::new(0.0),
            converter_fixed_om_cost: ParamTable::new(0.0),
            converter_initial_capacity: ParamTable::new(0.0),
            converter_max_built_capacity: ParamTable::new(50_000.0),
            converter_max_installed_capacity: ParamTable::new(200_000.0),
            converter_availability: ParamTable::new(1.0),
            neighbourhood_capital_cost: ParamTable::new(0.0),
            neighbourhood_fixed_om_cost: ParamTable::new(0.0),
            neighbourhood_initial_capacity: ParamTable::new(0.0),
            neighbourhood_max_built_capacity: ParamTable::new(50_000.0),
            neighbourhood_max_installed_capacity: ParamTable::new(200_000.0),
            neighbourhood_conversion_efficiency: ParamTable::new(1.0),
            neighbourhood_electricity_availability: ParamTable::new(0.0),
            neighbourhood_heat_availability: ParamTable::new(0.0),
            neighbourhood_conversion_availability: ParamTable::new(0.0),
        }
    }
}

/// Everything the heat module adds to a model
#[derive(Clone, Debug, PartialEq, Default)]
pub struct HeatModule {
    /// Converter types
    pub converters: ConverterMap,
    /// Which converters can be built at which nodes
    pub converters_of_node: IndexSet<(NodeID, ConverterID)>,
    /// Neighbourhood types
    pub neighbourhoods: NeighbourhoodMap,
    /// Which neighbourhoods exist at which nodes
    pub neighbourhoods_of_node: IndexSet<(NodeID, NeighbourhoodID)>,
    /// Heat module parameters
    pub parameters: HeatParameters,
}

impl HeatModule {
    /// Iterate over the converters at a node
    pub fn iter_converters_of_node<'a>(
        &'a self,
        node: &'a NodeID,
    ) -> impl Iterator<Item = &'a Converter> {
        self.converters_of_node
            .iter()
            .filter(move |(n, _)| n == node)
            .map(|(_, id)| &self.converters[id])
    }

    /// Iterate over the neighbourhoods at a node
    pub fn iter_neighbourhoods_of_node<'a>(
        &'a self,
        node: &'a NodeID,
    ) -> impl Iterator<Item = &'a Neighbourhood> {
        self.neighbourhoods_of_node
            .iter()
            .filter(move |(n, _)| n == node)
            .map(|(_, id)| &self.neighbourhoods[id])
    }
}
