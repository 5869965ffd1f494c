//! Generator types and their parameters.
use crate::horizon::{Hour, Period, ScenarioID};
use crate::id::{define_id_getter, define_id_type};
use crate::input::table::ParamTable;
use crate::network::NodeID;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_string_enum::DeserializeLabeledStringEnum;

define_id_type! {GeneratorID}
define_id_type! {TechnologyID}

/// A map of [`Generator`]s, keyed by generator ID
pub type GeneratorMap = IndexMap<GeneratorID, Generator>;

/// The technology name which marks generators as using carbon capture and storage
pub const CCS_TECHNOLOGY: &str = "CCS";

/// What a generator produces
#[derive(PartialEq, Eq, Copy, Clone, Debug, Default, DeserializeLabeledStringEnum)]
pub enum GeneratorCarrier {
    /// Electricity only
    #[default]
    #[string = "electricity"]
    Electricity,
    /// Heat only
    #[string = "heat"]
    Heat,
    /// Combined heat and power. Dispatch is measured in heat and electricity output follows from
    /// the CHP efficiency.
    #[string = "chp"]
    Chp,
}

/// The kind of hydro resource a generator draws on
#[derive(PartialEq, Eq, Copy, Clone, Debug, Default, DeserializeLabeledStringEnum)]
pub enum HydroKind {
    /// Not a hydro generator
    #[default]
    #[string = "none"]
    None,
    /// Hydro without a reservoir
    #[string = "run_of_river"]
    RunOfRiver,
    /// Hydro with a reservoir, limited by a seasonal energy budget
    #[string = "reservoir"]
    Reservoir,
}

fn default_availability() -> f64 {
    1.0
}

/// A type of generator which can be built at nodes
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Generator {
    /// Unique identifier (e.g. "GasCCGT")
    pub id: GeneratorID,
    /// The technology this generator belongs to
    pub technology: TechnologyID,
    /// What the generator produces
    #[serde(default)]
    pub carrier: GeneratorCarrier,
    /// Technical lifetime in years
    pub lifetime: f64,
    /// Whether dispatch is subject to ramping limits
    #[serde(default)]
    pub thermal: bool,
    /// Maximum increase in output from one hour to the next, as a fraction of installed capacity
    #[serde(default)]
    pub ramp_up_capacity: f64,
    /// Hydro resource used by the generator
    #[serde(default)]
    pub hydro: HydroKind,
    /// Emissions per unit of fuel (tCO2/GJ)
    #[serde(default)]
    pub co2_factor: f64,
    /// Variable operation and maintenance cost per unit of output
    #[serde(default)]
    pub variable_om_cost: f64,
    /// Fixed availability factor. Zero means the stochastic hourly availability is used instead.
    #[serde(default = "default_availability")]
    pub availability: f64,
}
define_id_getter! {Generator, GeneratorID}

impl Generator {
    /// Whether the generator captures its emissions
    pub fn is_ccs(&self) -> bool {
        &*self.technology.0 == CCS_TECHNOLOGY
    }

    /// Whether the generator contributes to the electricity balance
    pub fn produces_electricity(&self) -> bool {
        matches!(
            self.carrier,
            GeneratorCarrier::Electricity | GeneratorCarrier::Chp
        )
    }

    /// Whether the generator contributes to the heat balance
    pub fn produces_heat(&self) -> bool {
        matches!(self.carrier, GeneratorCarrier::Heat | GeneratorCarrier::Chp)
    }

    /// Whether the generator is any kind of hydro
    pub fn is_hydro(&self) -> bool {
        self.hydro != HydroKind::None
    }

    /// Whether the generator has a reservoir with a seasonal budget
    pub fn is_reservoir_hydro(&self) -> bool {
        self.hydro == HydroKind::Reservoir
    }

    /// Whether the stochastic hourly availability series applies
    pub fn has_stochastic_availability(&self) -> bool {
        self.availability == 0.0
    }
}

/// Cost and capacity parameters for generators
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorParameters {
    /// Overnight capital cost per kW (generator, period)
    pub capital_cost: ParamTable<(GeneratorID, Period)>,
    /// Annual fixed O&M cost per kW (generator, period)
    pub fixed_om_cost: ParamTable<(GeneratorID, Period)>,
    /// Fuel cost per GJ (generator, period)
    pub fuel_cost: ParamTable<(GeneratorID, Period)>,
    /// Conversion efficiency from fuel to output (generator, period)
    pub efficiency: ParamTable<(GeneratorID, Period)>,
    /// Electricity produced per unit of heat by CHP generators (generator, period)
    pub chp_efficiency: ParamTable<(GeneratorID, Period)>,
    /// Reference capacity used to fill in missing initial capacities (node, generator)
    pub reference_initial_capacity: ParamTable<(NodeID, GeneratorID)>,
    /// Fraction of the reference capacity retired by each period (generator, period)
    pub initial_capacity_scale: ParamTable<(GeneratorID, Period)>,
    /// Capacity present before any investment (node, generator, period)
    pub initial_capacity: ParamTable<(NodeID, GeneratorID, Period)>,
    /// Capacity of a technology which can be built in one period (node, technology, period)
    pub max_built_capacity: ParamTable<(NodeID, TechnologyID, Period)>,
    /// Raw resource limit on installed capacity of a technology (node, technology)
    pub max_installed_capacity: ParamTable<(NodeID, TechnologyID)>,
    /// Hourly availability for generators without a fixed availability
    /// (node, generator, hour, scenario, period)
    pub stochastic_availability: ParamTable<(NodeID, GeneratorID, Hour, ScenarioID, Period)>,
}

impl Default for GeneratorParameters {
    fn default() -> Self {
        Self {
            capital_cost: ParamTable::new(0.0),
            fixed_om_cost: ParamTable::new(0.0),
            fuel_cost: ParamTable::new(0.0),
            efficiency: ParamTable::new(1.0),
            chp_efficiency: ParamTable::new(0.0),
            reference_initial_capacity: ParamTable::new(0.0),
            initial_capacity_scale: ParamTable::new(0.0),
            initial_capacity: ParamTable::new(0.0),
            max_built_capacity: ParamTable::new(500_000.0),
            max_installed_capacity: ParamTable::new(0.0),
            stochastic_availability: ParamTable::new(0.0),
        }
    }
}
