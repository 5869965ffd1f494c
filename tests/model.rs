//! Integration tests which load and solve the demo models without going through the CLI.
//!
//! Besides loading and solving, these check properties of the solved models directly from the
//! column values: energy balances hold, storage returns to its seasonal starting level, installed
//! capacity follows the lifetime window and demand response costs follow their cost pieces.
use empire::capacity::CapacityValues;
use empire::derivation::{DerivedParameters, derive_parameters, lifetime_window};
use empire::horizon::Period;
use empire::input::load_model;
use empire::model::Model;
use empire::network::NodeID;
use empire::optimisation::variables::{CapacityKey, operation_key};
use empire::optimisation::{CapacityFamily, Solution, VariableMap, solve_model};
use empire::storage::StorageCarrier;
use float_cmp::assert_approx_eq;
use indexmap::IndexMap;
use itertools::iproduct;
use std::fmt::Debug;
use std::hash::Hash;
use std::path::{Path, PathBuf};

/// Get the path to a demo model.
fn get_model_dir(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

#[test]
fn test_load_simple_model() {
    let model = load_model(get_model_dir("simple")).unwrap();
    let capabilities = model.capabilities();
    assert!(!capabilities.heat);
    assert!(!capabilities.demand_response);
    assert!(capabilities.emission_cap);
    assert_eq!(model.network.nodes.len(), 2);
    assert_eq!(model.network.arcs.len(), 1);
    assert_eq!(model.horizon.num_hours(), 14);
}

#[test]
fn test_load_heat_dr_model() {
    let model = load_model(get_model_dir("heat_dr")).unwrap();
    let capabilities = model.capabilities();
    assert!(capabilities.heat);
    assert!(capabilities.demand_response);
    assert!(capabilities.load_change);
    assert!(!capabilities.emission_cap);
}

#[test]
fn test_solve_heat_dr_model() {
    let model = load_model(get_model_dir("heat_dr")).unwrap();
    let derived = derive_parameters(&model).unwrap();

    // Only the heat load which is reduced below zero is adjusted
    assert_eq!(derived.loads.adjustments.len(), 1);

    let solution = solve_model(&model, &derived).unwrap();
    assert!(solution.objective_value() > 0.0);
    assert_eq!(solution.iter_heat_prices().count(), 2 * 8 * 2);
    assert_eq!(solution.iter_emission_prices().count(), 0);
    assert!(solution.iter_electricity_prices().all(|(_, price)| price.is_finite()));
}

/// Absolute tolerance for a solved quantity of the given size
fn tolerance(value: f64) -> f64 {
    1e-5 * value.abs().max(1.0)
}

/// The solved value of each variable of a map
fn values<K: Clone + Eq + Hash + Debug>(map: &VariableMap<K>, columns: &[f64]) -> IndexMap<K, f64> {
    map.zip_values(columns)
        .map(|(key, value)| (key.clone(), value))
        .collect()
}

/// The solved invested and installed capacity of each key of a family
fn capacities<K: Clone + Eq + Hash + Debug>(
    family: &CapacityFamily<K>,
    columns: &[f64],
) -> IndexMap<K, CapacityValues> {
    family
        .iter_values(columns)
        .map(|(key, values)| (key.clone(), values))
        .collect()
}

/// Check that each electricity balance holds for the solved values
fn assert_electricity_balance(model: &Model, derived: &DerivedParameters, solution: &Solution) {
    let columns = solution.columns();
    let variables = solution.variables();
    let generation = values(&variables.generation, columns);
    let charge = values(&variables.storage_charge, columns);
    let discharge = values(&variables.storage_discharge, columns);
    let flow = values(&variables.flow, columns);
    let load_shed = values(&variables.load_shed, columns);
    let heat = variables.heat.as_ref().map(|heat| {
        (
            values(&heat.neighbourhood_electricity, columns),
            values(&heat.neighbourhood_conversion, columns),
            values(&heat.converter_operation, columns),
        )
    });

    let horizon = &model.horizon;
    for (node, hour, period, scenario) in iproduct!(
        model.network.nodes.keys(),
        horizon.hours(),
        horizon.periods(),
        &horizon.scenarios
    ) {
        let mut supply = 0.0;
        for generator in model
            .iter_generators_of_node(node)
            .filter(|generator| generator.produces_electricity())
        {
            let efficiency = derived
                .chp_efficiencies
                .get(&(generator.id.clone(), period));
            let key = operation_key(node, &generator.id, hour, period, scenario);
            supply += efficiency * generation[&key];
        }
        for storage in model
            .iter_storages_of_node(node)
            .filter(|storage| storage.is_electric())
        {
            let key = operation_key(node, &storage.id, hour, period, scenario);
            supply += storage.discharge_efficiency * discharge[&key] - charge[&key];
        }
        for link in model.network.links.values() {
            let key = (
                link.from.clone(),
                link.to.clone(),
                hour,
                period,
                scenario.clone(),
            );
            if link.to == *node {
                supply += link.efficiency * flow[&key];
            }
            if link.from == *node {
                supply -= flow[&key];
            }
        }
        if let (Some(module), Some((electricity, conversion, converters))) = (&model.heat, &heat) {
            for neighbourhood in module.iter_neighbourhoods_of_node(node) {
                let key = operation_key(node, &neighbourhood.id, hour, period, scenario);
                supply += electricity[&key] - conversion[&key];
            }
            for converter in module.iter_converters_of_node(node) {
                let key = operation_key(node, &converter.id, hour, period, scenario);
                supply -= converters[&key];
            }
        }

        let key = (node.clone(), hour, period, scenario.clone());
        supply += load_shed[&key];
        let load = derived.loads.electricity.get(&key);
        assert_approx_eq!(f64, supply, load, epsilon = tolerance(load));
    }
}

/// Check that each heat balance holds for the solved values
fn assert_heat_balance(model: &Model, derived: &DerivedParameters, solution: &Solution) {
    let columns = solution.columns();
    let variables = solution.variables();
    let module = model.heat.as_ref().unwrap();
    let heat = variables.heat.as_ref().unwrap();
    let params = &module.parameters;
    let generation = values(&variables.generation, columns);
    let charge = values(&variables.storage_charge, columns);
    let discharge = values(&variables.storage_discharge, columns);
    let neighbourhood_heat = values(&heat.neighbourhood_heat, columns);
    let conversion = values(&heat.neighbourhood_conversion, columns);
    let converters = values(&heat.converter_operation, columns);
    let heat_shed = values(&heat.heat_shed, columns);

    let horizon = &model.horizon;
    for (node, hour, period, scenario) in iproduct!(
        model.network.nodes.keys(),
        horizon.hours(),
        horizon.periods(),
        &horizon.scenarios
    ) {
        let mut supply = 0.0;
        for generator in model
            .iter_generators_of_node(node)
            .filter(|generator| generator.produces_heat())
        {
            let key = operation_key(node, &generator.id, hour, period, scenario);
            supply += generation[&key];
        }
        for storage in model
            .iter_storages_of_node(node)
            .filter(|storage| storage.carrier == StorageCarrier::Heat)
        {
            let key = operation_key(node, &storage.id, hour, period, scenario);
            supply += storage.discharge_efficiency * discharge[&key] - charge[&key];
        }
        for neighbourhood in module.iter_neighbourhoods_of_node(node) {
            let key = operation_key(node, &neighbourhood.id, hour, period, scenario);
            let efficiency = params.neighbourhood_conversion_efficiency.get(&(
                node.clone(),
                neighbourhood.id.clone(),
                hour,
                scenario.clone(),
            ));
            supply += neighbourhood_heat[&key] + efficiency * conversion[&key];
        }
        for converter in module.iter_converters_of_node(node) {
            let availability = params.converter_availability.get(&(
                node.clone(),
                converter.id.clone(),
                hour,
                scenario.clone(),
                period,
            ));
            let key = operation_key(node, &converter.id, hour, period, scenario);
            supply += converter.efficiency * availability * converters[&key];
        }

        let key = (node.clone(), hour, period, scenario.clone());
        supply += heat_shed[&key];
        let load = derived.loads.heat.get(&key);
        assert_approx_eq!(f64, supply, load, epsilon = tolerance(load));
    }
}

/// Check that storage other than demand response ends each season at its starting level.
///
/// Returns the number of season ends checked.
fn assert_storage_returns_to_initial_level(model: &Model, solution: &Solution) -> usize {
    let columns = solution.columns();
    let variables = solution.variables();
    let levels = values(&variables.storage_level, columns);
    let energy = capacities(&variables.storage_energy_capacity, columns);

    let horizon = &model.horizon;
    let mut count = 0;
    for ((node, storage_id), season, period, scenario) in iproduct!(
        &model.storages_of_node,
        horizon.seasons.values(),
        horizon.periods(),
        &horizon.scenarios
    ) {
        let storage = &model.storages[storage_id];
        if storage.is_demand_response() {
            continue;
        }

        let installed = energy[&(node.clone(), storage_id.clone(), period)].installed;
        let key = (
            node.clone(),
            storage_id.clone(),
            season.last_hour(),
            period,
            scenario.clone(),
        );
        let expected = storage.initial_level * installed;
        assert_approx_eq!(f64, levels[&key], expected, epsilon = tolerance(expected));
        count += 1;
    }

    count
}

/// Check that installed capacity is the initial capacity plus the investment within the lifetime
/// window.
///
/// Returns the number of installed capacities whose window covers more than one period.
fn assert_lifetime_windows<T>(
    family: &CapacityFamily<CapacityKey<T>>,
    columns: &[f64],
    leap_years: u32,
    lifetime: impl Fn(&NodeID, &T) -> f64,
    initial_capacity: impl Fn(&CapacityKey<T>) -> f64,
) -> usize
where
    T: Clone + Eq + Hash + Debug,
{
    let values = capacities(family, columns);
    let mut multi_period = 0;
    for (key @ (node, id, period), value) in &values {
        let window = lifetime_window(*period, lifetime(node, id), leap_years);
        if window.start() < window.end() {
            multi_period += 1;
        }

        let invested: f64 = window
            .map(|earlier: Period| values[&(node.clone(), id.clone(), earlier)].invested)
            .sum();
        let expected = initial_capacity(key) + invested;
        assert_approx_eq!(
            f64,
            value.installed,
            expected,
            epsilon = tolerance(expected)
        );
    }

    multi_period
}

#[test]
fn test_simple_model_properties() {
    let model = load_model(get_model_dir("simple")).unwrap();
    let derived = derive_parameters(&model).unwrap();
    let solution = solve_model(&model, &derived).unwrap();
    let columns = solution.columns();
    let variables = solution.variables();
    let leap_years = model.horizon.leap_years;

    assert_electricity_balance(&model, &derived, &solution);

    // 1 storage at each of 2 nodes, 3 seasons, 2 periods and 2 scenarios
    assert_eq!(
        assert_storage_returns_to_initial_level(&model, &solution),
        2 * 3 * 2 * 2
    );

    let limits = &derived.capacity_limits;
    let multi_period = assert_lifetime_windows(
        &variables.generator_capacity,
        columns,
        leap_years,
        |_, generator| model.generators[generator].lifetime,
        |key| limits.generator_initial_capacity.get(key),
    );
    // Every generator outlives one period, so investment in period 1 is still installed in 2
    assert_eq!(multi_period, variables.generator_capacity.iter_values(columns).count() / 2);

    let params = &model.transmission_parameters;
    assert_lifetime_windows(
        &variables.transmission_capacity,
        columns,
        leap_years,
        |from, to| params.lifetime.get(&(from.clone(), to.clone())),
        |key| params.initial_capacity.get(key),
    );
    let params = &model.storage_parameters;
    assert_lifetime_windows(
        &variables.storage_power_capacity,
        columns,
        leap_years,
        |_, storage| model.storages[storage].lifetime,
        |key| params.power_initial_capacity.get(key),
    );
    assert_lifetime_windows(
        &variables.storage_energy_capacity,
        columns,
        leap_years,
        |_, storage| model.storages[storage].lifetime,
        |key| params.energy_initial_capacity.get(key),
    );
}

#[test]
fn test_heat_dr_model_properties() {
    let model = load_model(get_model_dir("heat_dr")).unwrap();
    let derived = derive_parameters(&model).unwrap();
    let solution = solve_model(&model, &derived).unwrap();
    let columns = solution.columns();
    let variables = solution.variables();

    assert_electricity_balance(&model, &derived, &solution);
    assert_heat_balance(&model, &derived, &solution);
    assert!(assert_storage_returns_to_initial_level(&model, &solution) > 0);

    let heat_module = model.heat.as_ref().unwrap();
    let heat = variables.heat.as_ref().unwrap();
    let params = &heat_module.parameters;
    let leap_years = model.horizon.leap_years;
    assert_lifetime_windows(
        &heat.converter_capacity,
        columns,
        leap_years,
        |_, converter| heat_module.converters[converter].lifetime,
        |key| params.converter_initial_capacity.get(key),
    );
    assert_lifetime_windows(
        &heat.neighbourhood_capacity,
        columns,
        leap_years,
        |_, neighbourhood| heat_module.neighbourhoods[neighbourhood].lifetime,
        |key| params.neighbourhood_initial_capacity.get(key),
    );
}

#[test]
fn test_heat_dr_demand_response_costs() {
    let model = load_model(get_model_dir("heat_dr")).unwrap();
    let derived = derive_parameters(&model).unwrap();
    let solution = solve_model(&model, &derived).unwrap();
    let columns = solution.columns();
    let variables = solution.variables();
    let module = model.demand_response.as_ref().unwrap();
    let params = &module.parameters;

    let costs = values(variables.demand_response_cost.as_ref().unwrap(), columns);
    let levels = values(&variables.storage_level, columns);
    let charge = values(&variables.storage_charge, columns);
    let discharge = values(&variables.storage_discharge, columns);
    let power = capacities(&variables.storage_power_capacity, columns);
    assert!(!costs.is_empty());

    for (key @ (node, storage_id, hour, period, _), cost) in &costs {
        // Shifted demand stays within its bounds
        let level = levels[key];
        if !model.horizon.is_first_hour(*hour) {
            let demand = params.demand.get(key);
            assert!(level >= demand - tolerance(demand));
        }
        let max_level = params.max_level.get(key);
        assert!(level <= max_level + tolerance(max_level));

        // The cost is the largest of the pieces, or zero if none is active
        let installed = power[&(node.clone(), storage_id.clone(), *period)].installed;
        let pieces = module.cost_pieces_of(storage_id);
        assert!(!pieces.is_empty());
        let activated = pieces
            .iter()
            .map(|piece| {
                piece.cost * (discharge[key] + charge[key])
                    - piece.cost * (1.0 - piece.activation) * installed
            })
            .fold(0.0, f64::max);
        assert_approx_eq!(f64, *cost, activated, epsilon = tolerance(activated));
    }
}
