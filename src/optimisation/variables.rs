//! Decision variables and their objective coefficients.
use super::{CapacityFamily, Problem, VariableMap, operational_weight};
use crate::capacity::{CapacityAsset, FixedCapacities};
use crate::derivation::DerivedParameters;
use crate::generator::GeneratorID;
use crate::heat::{ConverterID, NeighbourhoodID};
use crate::horizon::{Horizon, Hour, Period, ScenarioID};
use crate::model::Model;
use crate::network::NodeID;
use crate::storage::StorageID;
use indexmap::IndexMap;
use itertools::iproduct;
use std::fmt::Debug;
use std::hash::Hash;

/// Key for a capacity of an asset at a node in a period
pub type CapacityKey<T> = (NodeID, T, Period);

/// Key for transmission capacity of a bidirectional arc in a period
pub type TransmissionKey = (NodeID, NodeID, Period);

/// Key for the operation of an asset at a node in one hour of one scenario
pub type OperationKey<T> = (NodeID, T, Hour, Period, ScenarioID);

/// Key for a node in one hour of one scenario
pub type NodeHourKey = (NodeID, Hour, Period, ScenarioID);

/// Variables which only exist with the heat module
pub struct HeatVariables {
    /// Converter capacity
    pub converter_capacity: CapacityFamily<CapacityKey<ConverterID>>,
    /// Neighbourhood capacity
    pub neighbourhood_capacity: CapacityFamily<CapacityKey<NeighbourhoodID>>,
    /// Electricity turned into heat by converters
    pub converter_operation: VariableMap<OperationKey<ConverterID>>,
    /// Electricity supplied by neighbourhoods
    pub neighbourhood_electricity: VariableMap<OperationKey<NeighbourhoodID>>,
    /// Heat supplied by neighbourhoods
    pub neighbourhood_heat: VariableMap<OperationKey<NeighbourhoodID>>,
    /// Electricity converted into heat within neighbourhoods
    pub neighbourhood_conversion: VariableMap<OperationKey<NeighbourhoodID>>,
    /// Unserved heat demand
    pub heat_shed: VariableMap<NodeHourKey>,
}

/// All variables of the problem
pub struct Variables {
    /// Generator capacity
    pub generator_capacity: CapacityFamily<CapacityKey<GeneratorID>>,
    /// Transmission capacity of each bidirectional arc
    pub transmission_capacity: CapacityFamily<TransmissionKey>,
    /// Storage power capacity
    pub storage_power_capacity: CapacityFamily<CapacityKey<StorageID>>,
    /// Storage energy capacity
    pub storage_energy_capacity: CapacityFamily<CapacityKey<StorageID>>,
    /// Generator output
    pub generation: VariableMap<OperationKey<GeneratorID>>,
    /// Storage charging
    pub storage_charge: VariableMap<OperationKey<StorageID>>,
    /// Storage discharging
    pub storage_discharge: VariableMap<OperationKey<StorageID>>,
    /// Storage energy level at the end of each hour
    pub storage_level: VariableMap<OperationKey<StorageID>>,
    /// Flow along each directional link, keyed by (from, to, hour, period, scenario)
    pub flow: VariableMap<(NodeID, NodeID, Hour, Period, ScenarioID)>,
    /// Unserved electricity demand
    pub load_shed: VariableMap<NodeHourKey>,
    /// Heat module variables
    pub heat: Option<HeatVariables>,
    /// Cost of demand response activation
    pub demand_response_cost: Option<VariableMap<OperationKey<StorageID>>>,
    /// Cost of fixed investments, which is added to the objective value
    pub objective_offset: f64,
}

/// One capacity to be added to a [`CapacityFamily`]
struct CapacityEntry<K> {
    key: K,
    asset: CapacityAsset,
    period: Period,
    cost: f64,
}

/// Add a family of capacities.
///
/// When capacities are fixed, their investment costs are added to the objective offset instead.
fn add_capacity_family<K: Clone + Eq + Hash + Debug>(
    problem: &mut Problem,
    entries: Vec<CapacityEntry<K>>,
    fixed: Option<&FixedCapacities>,
    objective_offset: &mut f64,
) -> CapacityFamily<K> {
    if let Some(fixed) = fixed {
        let values: IndexMap<_, _> = entries
            .into_iter()
            .map(|entry| {
                let values = fixed.get(&entry.asset, entry.period);
                *objective_offset += entry.cost * values.invested;
                (entry.key, values)
            })
            .collect();
        return CapacityFamily::Fixed(values);
    }

    let mut invested = VariableMap::new(problem);
    for entry in &entries {
        invested.add(problem, entry.key.clone(), entry.cost);
    }
    let mut installed = VariableMap::new(problem);
    for entry in entries {
        installed.add(problem, entry.key, 0.0);
    }

    CapacityFamily::Decision {
        invested,
        installed,
    }
}

/// The key for the operation of an asset at a node in one hour of one scenario
pub fn operation_key<T: Clone>(
    node: &NodeID,
    id: &T,
    hour: Hour,
    period: Period,
    scenario: &ScenarioID,
) -> OperationKey<T> {
    (node.clone(), id.clone(), hour, period, scenario.clone())
}

/// Iterate over every hour of every scenario for each (node, asset) pair
fn operation_keys<'a, T: Clone + 'a>(
    horizon: &'a Horizon,
    pairs: impl IntoIterator<Item = &'a (NodeID, T)> + 'a,
) -> impl Iterator<Item = OperationKey<T>> + 'a {
    iproduct!(
        pairs,
        horizon.hours(),
        horizon.periods(),
        &horizon.scenarios
    )
    .map(|((node, id), hour, period, scenario)| {
        (node.clone(), id.clone(), hour, period, scenario.clone())
    })
}

/// Add all variables to the problem, with their objective coefficients
pub fn add_variables(
    problem: &mut Problem,
    model: &Model,
    derived: &DerivedParameters,
) -> Variables {
    let fixed = model.fixed_capacities.as_ref();
    let costs = &derived.investment_costs;
    let periods = || model.horizon.periods();
    let mut objective_offset = 0.0;

    let entries = iproduct!(&model.generators_of_node, periods())
        .map(|((node, generator), period)| CapacityEntry {
            key: (node.clone(), generator.clone(), period),
            asset: CapacityAsset::Generator(node.clone(), generator.clone()),
            period,
            cost: derived.discount_multiplier(period)
                * costs.generator.get(&(generator.clone(), period)),
        })
        .collect();
    let generator_capacity = add_capacity_family(problem, entries, fixed, &mut objective_offset);

    let entries = iproduct!(&model.network.arcs, periods())
        .map(|((from, to), period)| CapacityEntry {
            key: (from.clone(), to.clone(), period),
            asset: CapacityAsset::Transmission(from.clone(), to.clone()),
            period,
            cost: derived.discount_multiplier(period)
                * costs
                    .transmission
                    .get(&(from.clone(), to.clone(), period)),
        })
        .collect();
    let transmission_capacity =
        add_capacity_family(problem, entries, fixed, &mut objective_offset);

    let entries = iproduct!(&model.storages_of_node, periods())
        .map(|((node, storage), period)| CapacityEntry {
            key: (node.clone(), storage.clone(), period),
            asset: CapacityAsset::StoragePower(node.clone(), storage.clone()),
            period,
            cost: derived.discount_multiplier(period)
                * costs.storage_power.get(&(storage.clone(), period)),
        })
        .collect();
    let storage_power_capacity =
        add_capacity_family(problem, entries, fixed, &mut objective_offset);

    let entries = iproduct!(&model.storages_of_node, periods())
        .map(|((node, storage), period)| CapacityEntry {
            key: (node.clone(), storage.clone(), period),
            asset: CapacityAsset::StorageEnergy(node.clone(), storage.clone()),
            period,
            cost: derived.discount_multiplier(period)
                * costs.storage_energy.get(&(storage.clone(), period)),
        })
        .collect();
    let storage_energy_capacity =
        add_capacity_family(problem, entries, fixed, &mut objective_offset);

    let horizon = &model.horizon;

    let mut generation = VariableMap::new(problem);
    for key in operation_keys(horizon, &model.generators_of_node) {
        let cost = operational_weight(model, derived, key.2, key.3)
            * derived.marginal_costs.get(&(key.1.clone(), key.3));
        generation.add(problem, key, cost);
    }

    let storage_keys = || operation_keys(horizon, &model.storages_of_node);
    let mut storage_charge = VariableMap::new(problem);
    for key in storage_keys() {
        storage_charge.add(problem, key, 0.0);
    }
    let mut storage_discharge = VariableMap::new(problem);
    for key in storage_keys() {
        storage_discharge.add(problem, key, 0.0);
    }
    let mut storage_level = VariableMap::new(problem);
    for key in storage_keys() {
        storage_level.add(problem, key, 0.0);
    }

    let mut flow = VariableMap::new(problem);
    for (from, to) in model.network.links.keys() {
        for (hour, period, scenario) in iproduct!(horizon.hours(), periods(), &horizon.scenarios)
        {
            flow.add(
                problem,
                (from.clone(), to.clone(), hour, period, scenario.clone()),
                0.0,
            );
        }
    }

    let node_hour_keys = || {
        iproduct!(
            model.network.nodes.keys(),
            horizon.hours(),
            periods(),
            &horizon.scenarios
        )
        .map(|(node, hour, period, scenario)| (node.clone(), hour, period, scenario.clone()))
    };
    let mut load_shed = VariableMap::new(problem);
    for key in node_hour_keys() {
        let cost = operational_weight(model, derived, key.1, key.2)
            * model
                .node_parameters
                .value_of_lost_load
                .get(&(key.0.clone(), key.2));
        load_shed.add(problem, key, cost);
    }

    let heat = model.heat.as_ref().map(|heat| {
        let entries = iproduct!(&heat.converters_of_node, periods())
            .map(|((node, converter), period)| CapacityEntry {
                key: (node.clone(), converter.clone(), period),
                asset: CapacityAsset::Converter(node.clone(), converter.clone()),
                period,
                cost: derived.discount_multiplier(period)
                    * costs.converter.get(&(converter.clone(), period)),
            })
            .collect();
        let converter_capacity =
            add_capacity_family(problem, entries, fixed, &mut objective_offset);

        let entries = iproduct!(&heat.neighbourhoods_of_node, periods())
            .map(|((node, neighbourhood), period)| CapacityEntry {
                key: (node.clone(), neighbourhood.clone(), period),
                asset: CapacityAsset::Neighbourhood(node.clone(), neighbourhood.clone()),
                period,
                cost: derived.discount_multiplier(period)
                    * costs.neighbourhood.get(&(neighbourhood.clone(), period)),
            })
            .collect();
        let neighbourhood_capacity =
            add_capacity_family(problem, entries, fixed, &mut objective_offset);

        let mut converter_operation = VariableMap::new(problem);
        for key in operation_keys(horizon, &heat.converters_of_node) {
            converter_operation.add(problem, key, 0.0);
        }

        let neighbourhood_keys =
            || operation_keys(horizon, &heat.neighbourhoods_of_node);
        let mut neighbourhood_electricity = VariableMap::new(problem);
        for key in neighbourhood_keys() {
            neighbourhood_electricity.add(problem, key, 0.0);
        }
        let mut neighbourhood_heat = VariableMap::new(problem);
        for key in neighbourhood_keys() {
            neighbourhood_heat.add(problem, key, 0.0);
        }
        let mut neighbourhood_conversion = VariableMap::new(problem);
        for key in neighbourhood_keys() {
            neighbourhood_conversion.add(problem, key, 0.0);
        }

        let mut heat_shed = VariableMap::new(problem);
        for key in node_hour_keys() {
            let cost = operational_weight(model, derived, key.1, key.2)
                * heat
                    .parameters
                    .value_of_lost_heat
                    .get(&(key.0.clone(), key.2));
            heat_shed.add(problem, key, cost);
        }

        HeatVariables {
            converter_capacity,
            neighbourhood_capacity,
            converter_operation,
            neighbourhood_electricity,
            neighbourhood_heat,
            neighbourhood_conversion,
            heat_shed,
        }
    });

    let demand_response_cost = model.demand_response.as_ref().map(|_| {
        let pairs = model
            .storages_of_node
            .iter()
            .filter(|(_, storage)| model.storages[storage].is_demand_response());
        let mut costs = VariableMap::new(problem);
        for key in operation_keys(horizon, pairs) {
            let cost = operational_weight(model, derived, key.2, key.3);
            costs.add(problem, key, cost);
        }
        costs
    });

    Variables {
        generator_capacity,
        transmission_capacity,
        storage_power_capacity,
        storage_energy_capacity,
        generation,
        storage_charge,
        storage_discharge,
        storage_level,
        flow,
        load_shed,
        heat,
        demand_response_cost,
        objective_offset,
    }
}
