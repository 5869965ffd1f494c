//! Constraints linking investment to installed capacity, and limits on both.
//!
//! These are only added when capacities are decisions of the optimisation.
use super::variables::{CapacityKey, Variables};
use super::{CapacityFamily, Expression, Problem, VariableMap, add_eq_row, add_le_row};
use crate::derivation::{DerivedParameters, lifetime_window};
use crate::model::Model;
use crate::network::NodeID;
use crate::storage::StorageID;
use itertools::iproduct;
use std::fmt::Debug;
use std::hash::Hash;

/// Add capacity definitions and limits for every kind of asset
pub fn add_investment_constraints(
    problem: &mut Problem,
    variables: &Variables,
    model: &Model,
    derived: &DerivedParameters,
) {
    let leap_years = model.horizon.leap_years;
    let limits = &derived.capacity_limits;

    // Generators
    add_lifetime_constraints(
        problem,
        &variables.generator_capacity,
        leap_years,
        |_, generator| model.generators[generator].lifetime,
        |key| limits.generator_initial_capacity.get(key),
    );
    add_technology_limit_constraints(problem, variables, model, derived);

    // Transmission
    let params = &model.transmission_parameters;
    add_lifetime_constraints(
        problem,
        &variables.transmission_capacity,
        leap_years,
        |from, to| params.lifetime.get(&(from.clone(), to.clone())),
        |key| params.initial_capacity.get(key),
    );
    add_limit_constraints(
        problem,
        &variables.transmission_capacity,
        |key| params.max_built_capacity.get(key),
        |key| limits.transmission_max_installed.get(key),
    );

    // Storage
    let params = &model.storage_parameters;
    let storage_lifetime = |_: &NodeID, storage: &StorageID| model.storages[storage].lifetime;
    add_lifetime_constraints(
        problem,
        &variables.storage_power_capacity,
        leap_years,
        storage_lifetime,
        |key| params.power_initial_capacity.get(key),
    );
    add_lifetime_constraints(
        problem,
        &variables.storage_energy_capacity,
        leap_years,
        storage_lifetime,
        |key| params.energy_initial_capacity.get(key),
    );
    add_limit_constraints(
        problem,
        &variables.storage_power_capacity,
        |key| params.power_max_built_capacity.get(key),
        |key| limits.storage_power_max_installed.get(key),
    );
    add_limit_constraints(
        problem,
        &variables.storage_energy_capacity,
        |key| params.energy_max_built_capacity.get(key),
        |key| limits.storage_energy_max_installed.get(key),
    );
    add_dependent_storage_constraints(problem, variables, model);

    // Converters and neighbourhoods
    if let (Some(heat_module), Some(heat_variables)) = (&model.heat, &variables.heat) {
        let params = &heat_module.parameters;
        add_lifetime_constraints(
            problem,
            &heat_variables.converter_capacity,
            leap_years,
            |_, converter| heat_module.converters[converter].lifetime,
            |key| params.converter_initial_capacity.get(key),
        );
        add_limit_constraints(
            problem,
            &heat_variables.converter_capacity,
            |key| params.converter_max_built_capacity.get(key),
            |key| limits.converter_max_installed.get(key),
        );
        add_lifetime_constraints(
            problem,
            &heat_variables.neighbourhood_capacity,
            leap_years,
            |_, neighbourhood| heat_module.neighbourhoods[neighbourhood].lifetime,
            |key| params.neighbourhood_initial_capacity.get(key),
        );
        add_limit_constraints(
            problem,
            &heat_variables.neighbourhood_capacity,
            |key| params.neighbourhood_max_built_capacity.get(key),
            |key| limits.neighbourhood_max_installed.get(key),
        );
    }
}

/// Define installed capacity as the initial capacity plus the investment which is still within
/// its lifetime
fn add_lifetime_constraints<T, L, I>(
    problem: &mut Problem,
    family: &CapacityFamily<CapacityKey<T>>,
    leap_years: u32,
    lifetime: L,
    initial_capacity: I,
) where
    T: Clone + Eq + Hash + Debug,
    L: Fn(&NodeID, &T) -> f64,
    I: Fn(&CapacityKey<T>) -> f64,
{
    let CapacityFamily::Decision {
        invested,
        installed,
    } = family
    else {
        return;
    };

    for key @ (node, id, period) in installed.keys() {
        let mut expression = Expression::default();
        expression.add(installed.get(key), 1.0);
        for earlier in lifetime_window(*period, lifetime(node, id), leap_years) {
            expression.add(invested.get(&(node.clone(), id.clone(), earlier)), -1.0);
        }
        add_eq_row(problem, expression, initial_capacity(key));
    }
}

/// Limit the capacity built in each period and the capacity installed
fn add_limit_constraints<K, B, C>(
    problem: &mut Problem,
    family: &CapacityFamily<K>,
    max_built: B,
    max_installed: C,
) where
    K: Eq + Hash + Debug,
    B: Fn(&K) -> f64,
    C: Fn(&K) -> f64,
{
    let CapacityFamily::Decision {
        invested,
        installed,
    } = family
    else {
        return;
    };

    add_upper_bounds(problem, invested, max_built);
    add_upper_bounds(problem, installed, max_installed);
}

/// Add a single-variable upper bound for each variable of a map
fn add_upper_bounds<K, F>(problem: &mut Problem, variables: &VariableMap<K>, bound: F)
where
    K: Eq + Hash + Debug,
    F: Fn(&K) -> f64,
{
    for key in variables.keys() {
        let mut expression = Expression::default();
        expression.add(variables.get(key), 1.0);
        add_le_row(problem, expression, bound(key));
    }
}

/// Limit the generator capacity built and installed for each technology at each node
fn add_technology_limit_constraints(
    problem: &mut Problem,
    variables: &Variables,
    model: &Model,
    derived: &DerivedParameters,
) {
    let CapacityFamily::Decision {
        invested,
        installed,
    } = &variables.generator_capacity
    else {
        return;
    };

    let params = &model.generator_parameters;
    let limits = &derived.capacity_limits;
    for (node, technology, period) in iproduct!(
        model.network.nodes.keys(),
        &model.technologies,
        model.horizon.periods()
    ) {
        let mut built = Expression::default();
        let mut total = Expression::default();
        for generator in model.iter_generators_of_technology(node, technology) {
            let key = (node.clone(), generator.id.clone(), period);
            built.add(invested.get(&key), 1.0);
            total.add(installed.get(&key), 1.0);
        }

        if built.is_constant() {
            continue;
        }

        let key = (node.clone(), technology.clone(), period);
        add_le_row(problem, built, params.max_built_capacity.get(&key));
        add_le_row(problem, total, limits.generator_max_installed.get(&key));
    }
}

/// Tie the power capacity of storage with a fixed power to energy ratio to its energy capacity
fn add_dependent_storage_constraints(problem: &mut Problem, variables: &Variables, model: &Model) {
    for ((node, storage_id), period) in iproduct!(&model.storages_of_node, model.horizon.periods())
    {
        let Some(ratio) = model.storages[storage_id].power_to_energy else {
            continue;
        };

        let key = (node.clone(), storage_id.clone(), period);
        let mut expression = Expression::default();
        expression.add_capacity(variables.storage_power_capacity.installed(&key), 1.0);
        expression.add_capacity(variables.storage_energy_capacity.installed(&key), -ratio);
        add_eq_row(problem, expression, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::derive_parameters;
    use crate::fixture::model;
    use crate::optimisation::variables::add_variables;
    use rstest::rstest;

    fn count_rows(model: &Model) -> usize {
        let derived = derive_parameters(model).unwrap();
        let mut problem = Problem::default();
        let variables = add_variables(&mut problem, model, &derived);
        add_investment_constraints(&mut problem, &variables, model, &derived);
        problem.num_rows()
    }

    #[rstest]
    fn test_investment_rows(model: Model) {
        // Generators: 3 pairs * 2 periods of lifetime rows and 3 (node, technology) pairs * 2
        // periods * 2 ceilings
        let generators = 3 * 2 + 3 * 2 * 2;
        // Transmission: 1 arc * 2 periods * (lifetime + 2 ceilings)
        let transmission = 2 * 3;
        // Storage: 2 pairs * 2 periods * 2 ratings * (lifetime + 2 ceilings)
        let storage = 2 * 2 * 2 * 3;
        assert_eq!(count_rows(&model), generators + transmission + storage);
    }

    #[rstest]
    fn test_dependent_storage_adds_rows(mut model: Model) {
        let before = count_rows(&model);
        model.storages[0].power_to_energy = Some(0.25);
        assert_eq!(count_rows(&model), before + 2 * 2);
    }
}
