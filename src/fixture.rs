//! Fixtures for tests

use crate::generator::{
    Generator, GeneratorCarrier, GeneratorMap, GeneratorParameters, HydroKind, TechnologyID,
};
use crate::horizon::Horizon;
use crate::input::table::KnownIDs;
use crate::model::parameters::{
    CcsParameters, ModelParameters, ModuleFlags, SeasonParameters, Solver,
};
use crate::model::{Model, SystemParameters};
use crate::network::{
    DEFAULT_LINE_EFFICIENCY, DirectionalLink, LineTypeID, Network, Node, NodeMap, NodeParameters,
    TransmissionParameters,
};
use crate::storage::{Storage, StorageCarrier, StorageMap, StorageParameters};
use indexmap::IndexSet;
use itertools::iproduct;
use rstest::fixture;
use std::path::PathBuf;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

#[fixture]
pub fn model_parameters() -> ModelParameters {
    ModelParameters {
        num_periods: 2,
        leap_years_investment: 10,
        discount_rate: 0.05,
        wacc: 0.05,
        num_scenarios: 2,
        seasons: SeasonParameters {
            regular: vec!["winter".into(), "summer".into()],
            regular_length: 3,
            num_peak: 1,
            peak_length: 2,
        },
        modules: ModuleFlags::default(),
        emission_cap: true,
        out_of_sample: None,
        solver: Solver::Highs,
        ccs: CcsParameters::default(),
    }
}

/// Two regular seasons of three hours and one peak season of two hours
#[fixture]
pub fn horizon(model_parameters: ModelParameters) -> Horizon {
    model_parameters.horizon().unwrap()
}

#[fixture]
pub fn nodes() -> NodeMap {
    ["north", "south"]
        .into_iter()
        .map(|id| {
            let node = Node {
                id: id.into(),
                max_hydro_generation: 0.0,
                electric_heat_share: 0.0,
            };
            (node.id.clone(), node)
        })
        .collect()
}

#[fixture]
pub fn network(nodes: NodeMap) -> Network {
    let link = |from: &str, to: &str| DirectionalLink {
        from: from.into(),
        to: to.into(),
        line_type: Some("HVAC".into()),
        efficiency: DEFAULT_LINE_EFFICIENCY,
    };
    Network::new(nodes, [link("north", "south"), link("south", "north")]).unwrap()
}

#[fixture]
pub fn generator() -> Generator {
    Generator {
        id: "gas".into(),
        technology: "Gas".into(),
        carrier: GeneratorCarrier::Electricity,
        lifetime: 30.0,
        thermal: true,
        ramp_up_capacity: 0.5,
        hydro: HydroKind::None,
        co2_factor: 0.056,
        variable_om_cost: 2.0,
        availability: 1.0,
    }
}

#[fixture]
pub fn generators(generator: Generator) -> GeneratorMap {
    let wind = Generator {
        id: "wind".into(),
        technology: "Wind".into(),
        lifetime: 25.0,
        thermal: false,
        ramp_up_capacity: 0.0,
        co2_factor: 0.0,
        variable_om_cost: 0.0,
        availability: 0.0,
        ..generator.clone()
    };
    [generator, wind]
        .into_iter()
        .map(|generator| (generator.id.clone(), generator))
        .collect()
}

#[fixture]
pub fn storage() -> Storage {
    Storage {
        id: "battery".into(),
        carrier: StorageCarrier::Electricity,
        lifetime: 15.0,
        charge_efficiency: 0.95,
        discharge_efficiency: 0.95,
        bleed_efficiency: 1.0,
        discharge_to_charge_ratio: 1.0,
        initial_level: 0.5,
        power_to_energy: None,
    }
}

#[fixture]
pub fn storages(storage: Storage) -> StorageMap {
    [(storage.id.clone(), storage)].into_iter().collect()
}

/// The entities of a small model, for checking the keys of parameter tables
pub struct EntityFixture {
    pub network: Network,
    pub generators: GeneratorMap,
    pub technologies: IndexSet<TechnologyID>,
    pub storages: StorageMap,
    pub line_types: IndexSet<LineTypeID>,
    pub horizon: Horizon,
}

impl EntityFixture {
    pub fn known_ids(&self) -> KnownIDs<'_> {
        KnownIDs {
            nodes: &self.network.nodes,
            generators: &self.generators,
            technologies: &self.technologies,
            storages: &self.storages,
            line_types: &self.line_types,
            seasons: &self.horizon.seasons,
            scenarios: &self.horizon.scenarios,
            converters: None,
            neighbourhoods: None,
        }
    }
}

#[fixture]
pub fn entities(
    network: Network,
    generators: GeneratorMap,
    storages: StorageMap,
    horizon: Horizon,
) -> EntityFixture {
    let technologies = generators
        .values()
        .map(|generator| generator.technology.clone())
        .collect();
    let line_types = network.line_types.clone();
    EntityFixture {
        network,
        generators,
        technologies,
        storages,
        line_types,
        horizon,
    }
}

/// A two-node model with gas and wind at the northern node, gas at the southern node and a
/// battery at both. Each node has a flat load profile and an annual demand of 1000.
#[fixture]
pub fn model(model_parameters: ModelParameters, entities: EntityFixture) -> Model {
    let EntityFixture {
        network,
        generators,
        technologies,
        storages,
        horizon,
        ..
    } = entities;

    let generators_of_node = [("north", "gas"), ("north", "wind"), ("south", "gas")]
        .into_iter()
        .map(|(node, generator)| (node.into(), generator.into()))
        .collect();
    let storages_of_node = [("north", "battery"), ("south", "battery")]
        .into_iter()
        .map(|(node, storage)| (node.into(), storage.into()))
        .collect();

    let mut node_parameters = NodeParameters::default();
    for (node, period) in iproduct!(network.nodes.keys(), horizon.periods()) {
        node_parameters
            .annual_demand
            .insert((node.clone(), period), 1000.0);
    }
    for (node, hour, scenario, period) in iproduct!(
        network.nodes.keys(),
        horizon.hours(),
        horizon.scenarios.iter(),
        horizon.periods()
    ) {
        node_parameters
            .load_profile
            .insert((node.clone(), hour, scenario.clone(), period), 10.0);
    }

    let mut generator_parameters = GeneratorParameters::default();
    for (hour, scenario, period) in
        iproduct!(horizon.hours(), horizon.scenarios.iter(), horizon.periods())
    {
        generator_parameters.stochastic_availability.insert(
            ("north".into(), "wind".into(), hour, scenario.clone(), period),
            0.4,
        );
    }

    Model {
        model_path: PathBuf::from("model"),
        parameters: model_parameters,
        horizon,
        network,
        node_parameters,
        transmission_parameters: TransmissionParameters::default(),
        generators,
        technologies,
        generators_of_node,
        generator_parameters,
        storages,
        storages_of_node,
        storage_parameters: StorageParameters::default(),
        system_parameters: SystemParameters::default(),
        heat: None,
        demand_response: None,
        fixed_capacities: None,
    }
}
