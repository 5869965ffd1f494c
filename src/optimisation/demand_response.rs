//! Constraints of the demand response module.
//!
//! Demand response storage is charged and discharged like any other electricity storage, but its
//! level must stay between a lower and upper bound on shifted demand. The cost of shifting is
//! convex and piecewise linear: each cost piece gives a lower bound on the cost variable.
use super::variables::{OperationKey, Variables};
use super::{Expression, Problem, VariableMap, add_ge_row, add_le_row};
use crate::demand_response::DemandResponseModule;
use crate::model::Model;
use crate::storage::StorageID;

/// Add the level bounds, power limits and cost pieces of demand response storage
pub fn add_demand_response_constraints(
    problem: &mut Problem,
    variables: &Variables,
    costs: &VariableMap<OperationKey<StorageID>>,
    model: &Model,
    module: &DemandResponseModule,
) {
    let params = &module.parameters;
    for key @ (node, storage_id, hour, period, _) in costs.keys() {
        let power = variables.storage_power_capacity.installed(&(
            node.clone(),
            storage_id.clone(),
            *period,
        ));
        let level = variables.storage_level.get(key);
        let charge = variables.storage_charge.get(key);
        let discharge = variables.storage_discharge.get(key);

        // Demand which must already have been shifted
        if !model.horizon.is_first_hour(*hour) {
            let mut expression = Expression::default();
            expression.add(level, 1.0);
            add_ge_row(problem, expression, params.demand.get(key));
        }

        let mut expression = Expression::default();
        expression.add(level, 1.0);
        add_le_row(problem, expression, params.max_level.get(key));

        let mut expression = Expression::default();
        expression.add(discharge, 1.0);
        expression.add_capacity(power, -params.discharge_availability.get(key));
        add_le_row(problem, expression, 0.0);

        let mut expression = Expression::default();
        expression.add(charge, 1.0);
        expression.add_capacity(power, -params.charge_availability.get(key));
        add_le_row(problem, expression, 0.0);

        for piece in module.cost_pieces_of(storage_id) {
            let mut expression = Expression::default();
            expression.add(discharge, piece.cost);
            expression.add(charge, piece.cost);
            expression.add_capacity(power, -piece.cost * (1.0 - piece.activation));
            expression.add(costs.get(key), -1.0);
            add_le_row(problem, expression, 0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demand_response::CostPiece;
    use crate::derivation::derive_parameters;
    use crate::fixture::model;
    use crate::optimisation::variables::add_variables;
    use crate::storage::{Storage, StorageCarrier};
    use rstest::rstest;

    #[rstest]
    fn test_demand_response_rows(mut model: Model) {
        model.storages.insert(
            "flex".into(),
            Storage {
                id: "flex".into(),
                carrier: StorageCarrier::DemandResponse,
                lifetime: 10.0,
                charge_efficiency: 1.0,
                discharge_efficiency: 1.0,
                bleed_efficiency: 1.0,
                discharge_to_charge_ratio: 1.0,
                initial_level: 0.0,
                power_to_energy: None,
            },
        );
        model
            .storages_of_node
            .insert(("north".into(), "flex".into()));
        let pieces = (1..=2)
            .map(|piece| CostPiece {
                storage_id: "flex".into(),
                piece,
                cost: 10.0 * f64::from(piece),
                activation: 0.5,
            })
            .collect();
        let mut module = DemandResponseModule::default();
        module.cost_pieces.insert("flex".into(), pieces);
        model.demand_response = Some(module);

        let derived = derive_parameters(&model).unwrap();
        let mut problem = Problem::default();
        let variables = add_variables(&mut problem, &model, &derived);
        let costs = variables.demand_response_cost.as_ref().unwrap();
        assert_eq!(costs.len(), 8 * 2 * 2);

        add_demand_response_constraints(
            &mut problem,
            &variables,
            costs,
            &model,
            model.demand_response.as_ref().unwrap(),
        );

        // Per (period, scenario): 5 lower bounds, then 8 hours of upper bound, two power limits
        // and two cost pieces
        assert_eq!(problem.num_rows(), 2 * 2 * (5 + 8 * 5));
    }
}
