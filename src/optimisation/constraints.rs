//! Code for adding constraints to the capacity expansion problem.
use super::variables::{NodeHourKey, Variables, operation_key};
use super::{Expression, Problem, add_eq_row, add_le_row, demand_response, heat, investment};
use crate::derivation::{DerivedParameters, HEAT_RATE_FACTOR, generator_availability};
use crate::horizon::{Period, ScenarioID};
use crate::model::Model;
use crate::network::NodeID;
use itertools::iproduct;
use log::debug;

/// Emissions in the cap are in MtCO2, while emission factors are per tonne
const TONNES_PER_MEGATONNE: f64 = 1e6;

/// Corresponding variables for a constraint along with the row offset in the solution
pub struct KeysWithOffset<T> {
    pub(super) offset: usize,
    pub(super) keys: Vec<T>,
}

impl<T> KeysWithOffset<T> {
    /// Zip the keys with the corresponding dual values in the solution, accounting for the offset
    pub fn zip_duals<'a>(&'a self, duals: &'a [f64]) -> impl Iterator<Item = (&'a T, f64)> {
        assert!(
            self.offset + self.keys.len() <= duals.len(),
            "Bad constraint keys: dual rows out of range"
        );

        self.keys.iter().zip(duals[self.offset..].iter().copied())
    }

    /// Number of constraints
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether there are no constraints
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Indicates the node and hour covered by each energy balance constraint
pub type BalanceKeys = KeysWithOffset<NodeHourKey>;

/// Indicates the period and scenario covered by each emission cap constraint
pub type EmissionCapKeys = KeysWithOffset<(Period, ScenarioID)>;

/// The keys for constraints whose duals are reported
pub struct ConstraintKeys {
    /// Keys for electricity balance constraints
    pub electricity_balance_keys: BalanceKeys,
    /// Keys for heat balance constraints (heat module only)
    pub heat_balance_keys: Option<BalanceKeys>,
    /// Keys for emission cap constraints, if emissions are capped
    pub emission_cap_keys: Option<EmissionCapKeys>,
}

/// Add all constraints to the problem.
///
/// Which families are added depends on the capabilities of the model. Capacity definitions and
/// limits are left out when capacities are fixed.
pub fn add_constraints(
    problem: &mut Problem,
    variables: &Variables,
    model: &Model,
    derived: &DerivedParameters,
) -> ConstraintKeys {
    let capabilities = model.capabilities();

    let electricity_balance_keys =
        add_electricity_balance_constraints(problem, variables, model, derived);
    let heat_balance_keys = match (&model.heat, &variables.heat) {
        (Some(heat_module), Some(heat_variables)) => Some(heat::add_heat_constraints(
            problem,
            variables,
            heat_variables,
            model,
            heat_module,
            derived,
        )),
        _ => None,
    };

    add_generation_limit_constraints(problem, variables, model);
    add_ramping_constraints(problem, variables, model);
    add_storage_constraints(problem, variables, model);
    if let (Some(module), Some(costs)) = (&model.demand_response, &variables.demand_response_cost)
    {
        demand_response::add_demand_response_constraints(
            problem, variables, costs, model, module,
        );
    }
    add_hydro_constraints(problem, variables, model, derived);
    add_transmission_constraints(problem, variables, model);

    let emission_cap_keys = capabilities
        .emission_cap
        .then(|| add_emission_cap_constraints(problem, variables, model));

    if capabilities.out_of_sample {
        debug!("Skipping capacity constraints for fixed capacities");
    } else {
        investment::add_investment_constraints(problem, variables, model, derived);
    }

    ConstraintKeys {
        electricity_balance_keys,
        heat_balance_keys,
        emission_cap_keys,
    }
}

/// Add the electricity balance at every node in every hour.
///
/// Supply from generators, storage discharge, inbound flows (after line losses), neighbourhoods
/// and load shedding must equal the load plus storage charging, outbound flows and electricity
/// consumed by converters.
fn add_electricity_balance_constraints(
    problem: &mut Problem,
    variables: &Variables,
    model: &Model,
    derived: &DerivedParameters,
) -> BalanceKeys {
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = problem.num_rows();

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
            .filter(|generator| generator.produces_electricity())
        {
            let efficiency = derived
                .chp_efficiencies
                .get(&(generator.id.clone(), period));
            let key = operation_key(node, &generator.id, hour, period, scenario);
            expression.add(variables.generation.get(&key), efficiency);
        }

        for storage in model
            .iter_storages_of_node(node)
            .filter(|storage| storage.is_electric())
        {
            let key = operation_key(node, &storage.id, hour, period, scenario);
            expression.add(
                variables.storage_discharge.get(&key),
                storage.discharge_efficiency,
            );
            expression.add(variables.storage_charge.get(&key), -1.0);
        }

        let flow = |from: &NodeID, to: &NodeID| {
            variables
                .flow
                .get(&(from.clone(), to.clone(), hour, period, scenario.clone()))
        };
        for link in model.network.iter_inbound_links(node) {
            expression.add(flow(&link.from, &link.to), link.efficiency);
        }
        for link in model.network.iter_outbound_links(node) {
            expression.add(flow(&link.from, &link.to), -1.0);
        }

        if let (Some(heat_module), Some(heat_variables)) = (&model.heat, &variables.heat) {
            for neighbourhood in heat_module.iter_neighbourhoods_of_node(node) {
                let key = operation_key(node, &neighbourhood.id, hour, period, scenario);
                expression.add(heat_variables.neighbourhood_electricity.get(&key), 1.0);
                expression.add(heat_variables.neighbourhood_conversion.get(&key), -1.0);
            }
            for converter in heat_module.iter_converters_of_node(node) {
                expression.add(
                    heat_variables.converter_operation.get(&operation_key(
                        node,
                        &converter.id,
                        hour,
                        period,
                        scenario,
                    )),
                    -1.0,
                );
            }
        }

        let key = (node.clone(), hour, period, scenario.clone());
        expression.add(variables.load_shed.get(&key), 1.0);
        let load = derived.loads.electricity.get(&key);
        add_eq_row(problem, expression, load);
        keys.push(key);
    }

    BalanceKeys { offset, keys }
}

/// Limit generator output to the available share of installed capacity
fn add_generation_limit_constraints(problem: &mut Problem, variables: &Variables, model: &Model) {
    for key @ (node, generator_id, hour, period, scenario) in variables.generation.keys() {
        let generator = &model.generators[generator_id];
        let availability =
            generator_availability(model, node, generator, *hour, scenario, *period);
        let mut expression = Expression::default();
        expression.add(variables.generation.get(key), 1.0);
        expression.add_capacity(
            variables
                .generator_capacity
                .installed(&(node.clone(), generator_id.clone(), *period)),
            -availability,
        );
        add_le_row(problem, expression, 0.0);
    }
}

/// Limit the increase in output of thermal generators from one hour to the next.
///
/// The first hour of each season has no predecessor, so it is not limited.
fn add_ramping_constraints(problem: &mut Problem, variables: &Variables, model: &Model) {
    let horizon = &model.horizon;
    for ((node, generator_id), hour, period, scenario) in iproduct!(
        &model.generators_of_node,
        horizon.hours(),
        horizon.periods(),
        &horizon.scenarios
    ) {
        let generator = &model.generators[generator_id];
        if !generator.thermal || horizon.is_first_hour(hour) {
            continue;
        }

        let op = |hour| {
            (
                node.clone(),
                generator_id.clone(),
                hour,
                period,
                scenario.clone(),
            )
        };
        let mut expression = Expression::default();
        expression.add(variables.generation.get(&op(hour)), 1.0);
        expression.add(variables.generation.get(&op(hour - 1)), -1.0);
        expression.add_capacity(
            variables
                .generator_capacity
                .installed(&(node.clone(), generator_id.clone(), period)),
            -generator.ramp_up_capacity,
        );
        add_le_row(problem, expression, 0.0);
    }
}

/// Add energy balances and limits for storage.
///
/// Each season starts from the initial level. Storage other than demand response must also end
/// each season at that level and is limited by its power capacity.
fn add_storage_constraints(problem: &mut Problem, variables: &Variables, model: &Model) {
    let horizon = &model.horizon;
    for ((node, storage_id), hour, period, scenario) in iproduct!(
        &model.storages_of_node,
        horizon.hours(),
        horizon.periods(),
        &horizon.scenarios
    ) {
        let storage = &model.storages[storage_id];
        let op = |hour| {
            (
                node.clone(),
                storage_id.clone(),
                hour,
                period,
                scenario.clone(),
            )
        };
        let key = op(hour);
        let capacity_key = (node.clone(), storage_id.clone(), period);
        let energy = variables.storage_energy_capacity.installed(&capacity_key);
        let power = variables.storage_power_capacity.installed(&capacity_key);
        let level = variables.storage_level.get(&key);
        let charge = variables.storage_charge.get(&key);
        let discharge = variables.storage_discharge.get(&key);

        // Energy balance
        let mut expression = Expression::default();
        expression.add(level, 1.0);
        expression.add(charge, -storage.charge_efficiency);
        expression.add(discharge, 1.0);
        if horizon.is_first_hour(hour) {
            expression.add_capacity(energy, -storage.initial_level);
        } else {
            expression.add(
                variables.storage_level.get(&op(hour - 1)),
                -storage.bleed_efficiency,
            );
        }
        let baseline = match &model.demand_response {
            Some(module) if storage.is_demand_response() => module.parameters.baseline.get(&key),
            _ => 0.0,
        };
        add_eq_row(problem, expression, baseline);

        // Energy capacity
        let mut expression = Expression::default();
        expression.add(level, 1.0);
        expression.add_capacity(energy, -1.0);
        add_le_row(problem, expression, 0.0);

        if storage.is_demand_response() {
            continue;
        }

        // Return to the initial level at the end of each season
        let is_last_hour = horizon
            .season_of_hour(hour)
            .is_some_and(|season| season.last_hour() == hour);
        if is_last_hour {
            let mut expression = Expression::default();
            expression.add(level, 1.0);
            expression.add_capacity(energy, -storage.initial_level);
            add_eq_row(problem, expression, 0.0);
        }

        // Power capacity
        let mut expression = Expression::default();
        expression.add(discharge, 1.0);
        expression.add_capacity(power, -storage.discharge_to_charge_ratio);
        add_le_row(problem, expression, 0.0);

        let mut expression = Expression::default();
        expression.add(charge, 1.0);
        expression.add_capacity(power, -1.0);
        add_le_row(problem, expression, 0.0);
    }
}

/// Limit hydro generation.
///
/// Reservoir hydro is limited by a budget for each season, and all hydro at a node is limited by
/// an annual expected generation.
fn add_hydro_constraints(
    problem: &mut Problem,
    variables: &Variables,
    model: &Model,
    derived: &DerivedParameters,
) {
    let horizon = &model.horizon;

    for ((node, generator_id), period, season, scenario) in iproduct!(
        &model.generators_of_node,
        horizon.periods(),
        horizon.seasons.values(),
        &horizon.scenarios
    ) {
        if !model.generators[generator_id].is_reservoir_hydro() {
            continue;
        }

        let mut expression = Expression::default();
        for hour in season.hours() {
            let key = (
                node.clone(),
                generator_id.clone(),
                hour,
                period,
                scenario.clone(),
            );
            expression.add(variables.generation.get(&key), 1.0);
        }
        let budget =
            derived
                .hydro_budgets
                .get(&(node.clone(), period, season.id.clone(), scenario.clone()));
        add_le_row(problem, expression, budget);
    }

    let probability = horizon.scenario_probability();
    for (node, period) in iproduct!(model.network.nodes.values(), horizon.periods()) {
        let mut expression = Expression::default();
        for generator in model
            .iter_generators_of_node(&node.id)
            .filter(|generator| generator.is_hydro())
        {
            for ((season_id, hour), scenario) in
                iproduct!(horizon.iter_hours_of_season(), &horizon.scenarios)
            {
                let season_scale = model.system_parameters.season_scale.get(season_id);
                let key = (
                    node.id.clone(),
                    generator.id.clone(),
                    hour,
                    period,
                    scenario.clone(),
                );
                expression.add(variables.generation.get(&key), season_scale * probability);
            }
        }

        if expression.is_constant() {
            continue;
        }
        add_le_row(problem, expression, node.max_hydro_generation);
    }
}

/// Limit the flow along each link to the installed capacity of the line it belongs to
fn add_transmission_constraints(problem: &mut Problem, variables: &Variables, model: &Model) {
    for key @ (from, to, _, period, _) in variables.flow.keys() {
        let Some((arc_from, arc_to)) = model.network.arc_of_link(from, to) else {
            continue;
        };

        let mut expression = Expression::default();
        expression.add(variables.flow.get(key), 1.0);
        expression.add_capacity(
            variables
                .transmission_capacity
                .installed(&(arc_from.clone(), arc_to.clone(), *period)),
            -1.0,
        );
        add_le_row(problem, expression, 0.0);
    }
}

/// Cap the emissions in each period and scenario.
///
/// Emissions are counted over a full year. Neighbourhoods add their CO2 quota per unit of
/// installed capacity.
fn add_emission_cap_constraints(
    problem: &mut Problem,
    variables: &Variables,
    model: &Model,
) -> EmissionCapKeys {
    // Row offset in problem. This line **must** come before we add more constraints.
    let offset = problem.num_rows();

    let horizon = &model.horizon;
    let params = &model.generator_parameters;
    let mut keys = Vec::new();
    for (period, scenario) in iproduct!(horizon.periods(), &horizon.scenarios) {
        let mut expression = Expression::default();
        for ((node, generator_id), (season_id, hour)) in
            iproduct!(&model.generators_of_node, horizon.iter_hours_of_season())
        {
            let generator = &model.generators[generator_id];
            let efficiency = params.efficiency.get(&(generator_id.clone(), period));
            let season_scale = model.system_parameters.season_scale.get(season_id);
            let coeff = season_scale * generator.co2_factor * HEAT_RATE_FACTOR / efficiency
                / TONNES_PER_MEGATONNE;
            let key = (
                node.clone(),
                generator_id.clone(),
                hour,
                period,
                scenario.clone(),
            );
            expression.add(variables.generation.get(&key), coeff);
        }

        if let (Some(heat_module), Some(heat_variables)) = (&model.heat, &variables.heat) {
            for (node, neighbourhood_id) in &heat_module.neighbourhoods_of_node {
                let quota = heat_module.neighbourhoods[neighbourhood_id].co2_quota;
                expression.add_capacity(
                    heat_variables.neighbourhood_capacity.installed(&(
                        node.clone(),
                        neighbourhood_id.clone(),
                        period,
                    )),
                    quota / TONNES_PER_MEGATONNE,
                );
            }
        }

        let cap = model.system_parameters.co2_cap.get(&period);
        add_le_row(problem, expression, cap);
        keys.push((period, scenario.clone()));
    }

    EmissionCapKeys { offset, keys }
}
