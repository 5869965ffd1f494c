//! Constraints of the heat module.
use super::constraints::BalanceKeys;
use super::variables::{HeatVariables, Variables, operation_key};
use super::{Expression, Problem, add_eq_row, add_le_row};
use crate::derivation::DerivedParameters;
use crate::heat::HeatModule;
use crate::model::Model;
use crate::storage::StorageCarrier;
use itertools::iproduct;

/// Add the heat balance and the limits on converters and neighbourhoods.
///
/// Returns the keys of the heat balance constraints.
pub fn add_heat_constraints(
    problem: &mut Problem,
    variables: &Variables,
    heat_variables: &HeatVariables,
    model: &Model,
    heat_module: &HeatModule,
    derived: &DerivedParameters,
) -> BalanceKeys {
    let keys = add_heat_balance_constraints(
        problem,
        variables,
        heat_variables,
        model,
        heat_module,
        derived,
    );
    add_converter_limit_constraints(problem, heat_variables);
    add_neighbourhood_limit_constraints(problem, heat_variables, heat_module);

    keys
}

/// Add the heat balance at every node in every hour
fn add_heat_balance_constraints(
    problem: &mut Problem,
    variables: &Variables,
    heat_variables: &HeatVariables,
    model: &Model,
    heat_module: &HeatModule,
    derived: &DerivedParameters,
) -> BalanceKeys {
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = problem.num_rows();

    let params = &heat_module.parameters;
    let horizon = &model.horizon;
    let mut keys = Vec::new();
    for (node, hour, period, scenario) in iproduct!(
        model.network.nodes.keys(),
        horizon.hours(),
        horizon.periods(),
        &horizon.scenarios
    ) {
        let mut expression = Expression::default();

        for generator in model
            .iter_generators_of_node(node)
            .filter(|generator| generator.produces_heat())
        {
            let key = operation_key(node, &generator.id, hour, period, scenario);
            expression.add(variables.generation.get(&key), 1.0);
        }

        for neighbourhood in heat_module.iter_neighbourhoods_of_node(node) {
            let key = operation_key(node, &neighbourhood.id, hour, period, scenario);
            let efficiency = params.neighbourhood_conversion_efficiency.get(&(
                node.clone(),
                neighbourhood.id.clone(),
                hour,
                scenario.clone(),
            ));
            expression.add(heat_variables.neighbourhood_heat.get(&key), 1.0);
            expression.add(heat_variables.neighbourhood_conversion.get(&key), efficiency);
        }

        for storage in model
            .iter_storages_of_node(node)
            .filter(|storage| storage.carrier == StorageCarrier::Heat)
        {
            let key = operation_key(node, &storage.id, hour, period, scenario);
            expression.add(
                variables.storage_discharge.get(&key),
                storage.discharge_efficiency,
            );
            expression.add(variables.storage_charge.get(&key), -1.0);
        }

        for converter in heat_module.iter_converters_of_node(node) {
            let key = operation_key(node, &converter.id, hour, period, scenario);
            let availability = params.converter_availability.get(&(
                node.clone(),
                converter.id.clone(),
                hour,
                scenario.clone(),
                period,
            ));
            expression.add(
                heat_variables.converter_operation.get(&key),
                converter.efficiency * availability,
            );
        }

        let key = (node.clone(), hour, period, scenario.clone());
        expression.add(heat_variables.heat_shed.get(&key), 1.0);
        add_eq_row(problem, expression, derived.loads.heat.get(&key));
        keys.push(key);
    }

    BalanceKeys { offset, keys }
}

/// Limit the electricity used by converters to their installed capacity
fn add_converter_limit_constraints(problem: &mut Problem, heat_variables: &HeatVariables) {
    for key @ (node, converter_id, _, period, _) in heat_variables.converter_operation.keys() {
        let mut expression = Expression::default();
        expression.add(heat_variables.converter_operation.get(key), 1.0);
        expression.add_capacity(
            heat_variables
                .converter_capacity
                .installed(&(node.clone(), converter_id.clone(), *period)),
            -1.0,
        );
        add_le_row(problem, expression, 0.0);
    }
}

/// Limit each neighbourhood flow to its available share of installed capacity
fn add_neighbourhood_limit_constraints(
    problem: &mut Problem,
    heat_variables: &HeatVariables,
    heat_module: &HeatModule,
) {
    let params = &heat_module.parameters;
    let families = [
        (
            &heat_variables.neighbourhood_electricity,
            &params.neighbourhood_electricity_availability,
        ),
        (
            &heat_variables.neighbourhood_heat,
            &params.neighbourhood_heat_availability,
        ),
        (
            &heat_variables.neighbourhood_conversion,
            &params.neighbourhood_conversion_availability,
        ),
    ];

    for (family, availability) in families {
        for key @ (node, neighbourhood_id, hour, period, scenario) in family.keys() {
            let availability = availability.get(&(
                node.clone(),
                neighbourhood_id.clone(),
                *hour,
                scenario.clone(),
            ));
            let mut expression = Expression::default();
            expression.add(family.get(key), 1.0);
            expression.add_capacity(
                heat_variables.neighbourhood_capacity.installed(&(
                    node.clone(),
                    neighbourhood_id.clone(),
                    *period,
                )),
                -availability,
            );
            add_le_row(problem, expression, 0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derivation::derive_parameters;
    use crate::fixture::model;
    use crate::heat::{Converter, Neighbourhood};
    use crate::optimisation::variables::add_variables;
    use rstest::rstest;

    fn heat_model(mut model: Model) -> Model {
        let mut heat = HeatModule::default();
        heat.converters.insert(
            "heat_pump".into(),
            Converter {
                id: "heat_pump".into(),
                lifetime: 20.0,
                efficiency: 3.0,
            },
        );
        heat.converters_of_node
            .insert(("north".into(), "heat_pump".into()));
        heat.neighbourhoods.insert(
            "district".into(),
            Neighbourhood {
                id: "district".into(),
                lifetime: 60.0,
                co2_quota: 0.0,
            },
        );
        heat.neighbourhoods_of_node
            .insert(("south".into(), "district".into()));
        model.heat = Some(heat);
        model
    }

    #[rstest]
    fn test_heat_constraint_rows(model: Model) {
        let model = heat_model(model);
        let derived = derive_parameters(&model).unwrap();
        let mut problem = Problem::default();
        let variables = add_variables(&mut problem, &model, &derived);
        let heat_variables = variables.heat.as_ref().unwrap();
        let keys = add_heat_constraints(
            &mut problem,
            &variables,
            heat_variables,
            &model,
            model.heat.as_ref().unwrap(),
            &derived,
        );

        let num_hours = 8 * 2 * 2;
        assert_eq!(keys.len(), 2 * num_hours);
        // Balance, one converter limit and three neighbourhood limits per hour
        assert_eq!(problem.num_rows(), 2 * num_hours + num_hours + 3 * num_hours);
    }
}
