//! Code for assembling and solving the capacity expansion problem.
//!
//! The problem is a single linear program covering every investment period and scenario. Each
//! family of variables is added to the problem as one contiguous block of columns, so that values
//! can be read back by zipping the keys of a [`VariableMap`] with the solution.
use crate::capacity::CapacityValues;
use crate::derivation::DerivedParameters;
use crate::horizon::{Hour, Period, ScenarioID};
use crate::model::Model;
use crate::network::NodeID;
use anyhow::Result;
use highs::{HighsModelStatus, HighsStatus, RowProblem as Problem, Sense};
use indexmap::IndexMap;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt;
use std::hash::Hash;
use std::ops::RangeBounds;

pub mod constraints;
use constraints::{ConstraintKeys, add_constraints};
mod demand_response;
mod heat;
mod investment;
mod statistics;
use statistics::log_problem_statistics;
pub mod variables;
use variables::{Variables, add_variables};

/// A decision variable in the optimisation
///
/// Note that this type does **not** include the value of the variable; it just refers to a
/// particular column of the problem.
pub type Variable = highs::Col;

/// A map for easy lookup of variables in the problem.
///
/// The entries are ordered (see [`IndexMap`]) and occupy a contiguous block of columns starting at
/// `offset`.
pub struct VariableMap<K> {
    offset: usize,
    variables: IndexMap<K, Variable>,
}

impl<K: Eq + Hash + fmt::Debug> VariableMap<K> {
    /// Create an empty map whose columns will start at the next column of the problem
    fn new(problem: &Problem) -> Self {
        Self {
            offset: problem.num_cols(),
            variables: IndexMap::new(),
        }
    }

    /// Add a non-negative variable with the given objective coefficient
    fn add(&mut self, problem: &mut Problem, key: K, cost: f64) -> Variable {
        assert!(
            problem.num_cols() == self.offset + self.variables.len(),
            "Variables of one family must be added together"
        );
        let var = problem.add_column(cost, 0.0..);
        let existing = self.variables.insert(key, var).is_some();
        assert!(!existing, "Duplicate entry for var");

        var
    }

    /// Get the [`Variable`] corresponding to the given key
    pub fn get(&self, key: &K) -> Variable {
        *self
            .variables
            .get(key)
            .unwrap_or_else(|| panic!("No variable found for key {key:?}"))
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// Whether there are no variables
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Iterate over the keys of the map
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.variables.keys()
    }

    /// Zip the keys with the corresponding column values of a solution
    pub fn zip_values<'a>(&'a self, columns: &'a [f64]) -> impl Iterator<Item = (&'a K, f64)> {
        assert!(
            self.offset + self.variables.len() <= columns.len(),
            "Bad variable map: columns out of range"
        );

        self.variables
            .keys()
            .zip(columns[self.offset..].iter().copied())
    }
}

/// Installed capacity, which is either a decision or fixed by a previous run
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Capacity {
    /// Chosen by the optimisation
    Variable(Variable),
    /// Fixed to a known value
    Fixed(f64),
}

/// The investment and installed capacity of one kind of asset
pub enum CapacityFamily<K> {
    /// Investment and installed capacity are decision variables
    Decision {
        /// Capacity invested in each period
        invested: VariableMap<K>,
        /// Capacity installed in each period
        installed: VariableMap<K>,
    },
    /// Capacities are fixed to those of a previous run
    Fixed(IndexMap<K, CapacityValues>),
}

impl<K: Eq + Hash + fmt::Debug> CapacityFamily<K> {
    /// The installed capacity for a key
    pub fn installed(&self, key: &K) -> Capacity {
        match self {
            Self::Decision { installed, .. } => Capacity::Variable(installed.get(key)),
            Self::Fixed(values) => {
                Capacity::Fixed(values.get(key).map_or(0.0, |value| value.installed))
            }
        }
    }

    /// The investment variables, unless capacities are fixed
    pub fn invested_variables(&self) -> Option<&VariableMap<K>> {
        match self {
            Self::Decision { invested, .. } => Some(invested),
            Self::Fixed(_) => None,
        }
    }

    /// Iterate over the invested and installed capacity for every key
    pub fn iter_values<'a>(
        &'a self,
        columns: &'a [f64],
    ) -> Box<dyn Iterator<Item = (&'a K, CapacityValues)> + 'a> {
        match self {
            Self::Decision {
                invested,
                installed,
            } => Box::new(invested.zip_values(columns).zip(installed.zip_values(columns)).map(
                |((key, invested), (_, installed))| {
                    (
                        key,
                        CapacityValues {
                            invested,
                            installed,
                        },
                    )
                },
            )),
            Self::Fixed(values) => Box::new(values.iter().map(|(key, value)| (key, *value))),
        }
    }
}

/// A linear expression: a sum of variable terms plus a constant
#[derive(Default)]
pub struct Expression {
    terms: Vec<(Variable, f64)>,
    constant: f64,
}

impl Expression {
    /// Add a variable term
    pub fn add(&mut self, var: Variable, coeff: f64) {
        self.terms.push((var, coeff));
    }

    /// Add a constant
    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    /// Add a capacity term, which is a constant if the capacity is fixed
    pub fn add_capacity(&mut self, capacity: Capacity, coeff: f64) {
        match capacity {
            Capacity::Variable(var) => self.add(var, coeff),
            Capacity::Fixed(value) => self.add_constant(coeff * value),
        }
    }

    /// Whether the expression has no variable terms
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Add a row requiring `expression <= rhs`
pub fn add_le_row(problem: &mut Problem, expression: Expression, rhs: f64) {
    add_row(problem, expression, ..=rhs);
}

/// Add a row requiring `expression >= rhs`
pub fn add_ge_row(problem: &mut Problem, expression: Expression, rhs: f64) {
    add_row(problem, expression, rhs..);
}

/// Add a row requiring `expression == rhs`
pub fn add_eq_row(problem: &mut Problem, expression: Expression, rhs: f64) {
    add_row(problem, expression, rhs..=rhs);
}

/// Add a row, moving the constant part of the expression into the bounds
fn add_row<B: RangeBounds<f64>>(problem: &mut Problem, expression: Expression, bounds: B) {
    use std::ops::Bound;

    let shift = |bound: Bound<&f64>| match bound {
        Bound::Included(value) => Bound::Included(value - expression.constant),
        Bound::Excluded(value) => Bound::Excluded(value - expression.constant),
        Bound::Unbounded => Bound::Unbounded,
    };
    let bounds = (shift(bounds.start_bound()), shift(bounds.end_bound()));
    problem.add_row(bounds, expression.terms);
}

/// An error from the solver
#[derive(Debug, Clone)]
pub enum ModelError {
    /// The solver rejected the problem
    Incoherent(HighsStatus),
    /// The solver finished without an optimal solution
    NonOptimal(HighsModelStatus),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incoherent(status) => write!(f, "Incoherent model: {status:?}"),
            Self::NonOptimal(status) => write!(f, "Could not find optimal solution: {status:?}"),
        }
    }
}

impl Error for ModelError {}

/// The solution to the capacity expansion problem
pub struct Solution<'a> {
    solution: highs::Solution,
    objective_value: f64,
    variables: Variables,
    constraint_keys: ConstraintKeys,
    model: &'a Model,
    derived: &'a DerivedParameters,
}

impl<'a> Solution<'a> {
    /// The value of the objective, including the cost of any fixed investments
    pub fn objective_value(&self) -> f64 {
        self.objective_value
    }

    /// The variables of the problem
    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    /// Values of all columns
    pub fn columns(&self) -> &[f64] {
        self.solution.columns()
    }

    /// Iterate over the output of each generator in each hour
    pub fn iter_generation(
        &self,
    ) -> impl Iterator<Item = (&(NodeID, crate::generator::GeneratorID, Hour, Period, ScenarioID), f64)>
    {
        self.variables.generation.zip_values(self.solution.columns())
    }

    /// Iterate over the electricity price at each node and hour.
    ///
    /// Prices are the duals of the electricity balance, converted back from discounted and
    /// probability-weighted objective units. The period discount multiplier is divided out too, so
    /// each price is in the money of its own period and prices of different periods can be
    /// compared directly. Multiplying by the discount multiplier gives the price discounted to the
    /// start of the first period.
    pub fn iter_electricity_prices(
        &self,
    ) -> impl Iterator<Item = (&(NodeID, Hour, Period, ScenarioID), f64)> {
        self.constraint_keys
            .electricity_balance_keys
            .zip_duals(self.solution.dual_rows())
            .map(|(key, dual)| (key, dual / self.balance_weight(key.1, key.2)))
    }

    /// Iterate over the heat price at each node and hour (heat module only)
    pub fn iter_heat_prices(
        &self,
    ) -> impl Iterator<Item = (&(NodeID, Hour, Period, ScenarioID), f64)> {
        self.constraint_keys
            .heat_balance_keys
            .iter()
            .flat_map(|keys| keys.zip_duals(self.solution.dual_rows()))
            .map(|(key, dual)| (key, dual / self.balance_weight(key.1, key.2)))
    }

    /// Iterate over the CO2 price in each period and scenario, if emissions are capped.
    ///
    /// The dual of a binding cap is negative when minimising, so it is negated to give a
    /// non-negative price per tonne. As with electricity prices, the period discount multiplier is
    /// divided out.
    pub fn iter_emission_prices(&self) -> impl Iterator<Item = (&(Period, ScenarioID), f64)> {
        let probability = self.model.horizon.scenario_probability();
        self.constraint_keys
            .emission_cap_keys
            .iter()
            .flat_map(|keys| keys.zip_duals(self.solution.dual_rows()))
            .map(move |(key, dual)| {
                let weight = self.derived.discount_multiplier(key.0)
                    * self.derived.operational_discount
                    * probability
                    * 1e6;
                (key, -dual / weight)
            })
    }

    /// The weight of one hour of one scenario in the objective
    fn balance_weight(&self, hour: Hour, period: Period) -> f64 {
        operational_weight(self.model, self.derived, hour, period)
    }
}

/// The objective weight of one unit of operational cost in an hour of one scenario.
///
/// This combines the period discount multiplier, the operational discount factor, the scale of
/// the hour's season and the scenario probability.
pub fn operational_weight(
    model: &Model,
    derived: &DerivedParameters,
    hour: Hour,
    period: Period,
) -> f64 {
    let season_scale = model
        .horizon
        .season_of_hour(hour)
        .map_or(1.0, |season| model.system_parameters.season_scale.get(&season.id));
    derived.discount_multiplier(period)
        * derived.operational_discount
        * season_scale
        * model.horizon.scenario_probability()
}

/// Options for solving the capacity expansion problem
#[derive(Clone, Debug, PartialEq)]
pub struct SolveOptions {
    /// Whether the solver prints its own progress output
    pub solver_output: bool,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            solver_output: true,
        }
    }
}

/// Assemble and solve the capacity expansion problem with the default [`SolveOptions`]
pub fn solve_model<'a>(model: &'a Model, derived: &'a DerivedParameters) -> Result<Solution<'a>> {
    solve_model_with_options(model, derived, &SolveOptions::default())
}

/// Assemble and solve the capacity expansion problem.
///
/// # Arguments
///
/// * `model` - The model
/// * `derived` - Parameters derived from the model
/// * `options` - How the solver is run
///
/// # Returns
///
/// The solution, with handles for reading variable values and constraint duals.
pub fn solve_model_with_options<'a>(
    model: &'a Model,
    derived: &'a DerivedParameters,
    options: &SolveOptions,
) -> Result<Solution<'a>> {
    let capabilities = model.capabilities();
    if capabilities.out_of_sample {
        info!("Capacities are fixed to those of a previous run");
    }

    // Set up problem
    let mut problem = Problem::default();
    let variables = add_variables(&mut problem, model, derived);

    // Add constraints
    let constraint_keys = add_constraints(&mut problem, &variables, model, derived);

    log_problem_statistics(model, derived, &problem);

    // Solve problem
    let mut highs_model = problem.optimise(Sense::Minimise);
    if options.solver_output {
        enable_highs_logging(&mut highs_model);
    } else {
        debug!("Solver output is switched off");
    }
    let solved = highs_model.try_solve().map_err(ModelError::Incoherent)?;
    match solved.status() {
        HighsModelStatus::Optimal => {
            let objective_value = solved.objective_value() + variables.objective_offset;
            info!("Objective value: {objective_value}");
            Ok(Solution {
                solution: solved.get_solution(),
                objective_value,
                variables,
                constraint_keys,
                model,
                derived,
            })
        }
        status => {
            warn!("Solver finished with status {status:?}");
            Err(ModelError::NonOptimal(status).into())
        }
    }
}

/// Enable logging for the HiGHS solver, unless logging has been switched off
fn enable_highs_logging(model: &mut highs::Model) {
    if crate::log::is_logging_disabled_by_env() {
        return;
    }

    model.set_option("log_to_console", true);
    model.set_option("output_flag", true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::{CapacityAsset, FixedCapacities};
    use crate::derivation::derive_parameters;
    use crate::fixture::model;
    use crate::generator::GeneratorID;
    use crate::network::Network;
    use float_cmp::assert_approx_eq;
    use rstest::{fixture, rstest};
    use variables::CapacityKey;

    /// One node with one gas generator and a flat load of 1000 / 60 in every hour
    #[fixture]
    fn single_node_model(mut model: Model) -> Model {
        let north = model.network.nodes["north"].clone();
        let nodes = [(north.id.clone(), north)].into_iter().collect();
        model.network = Network::new(nodes, std::iter::empty()).unwrap();
        model.generators.shift_remove("wind");
        model.generators["gas"].lifetime = 10.0;
        model.technologies = ["Gas".into()].into_iter().collect();
        model.generators_of_node = [("north".into(), "gas".into())].into_iter().collect();
        model.storages_of_node.clear();
        for period in model.horizon.periods() {
            model
                .generator_parameters
                .capital_cost
                .insert(("gas".into(), period), 100.0);
        }
        model
            .generator_parameters
            .max_installed_capacity
            .insert(("north".into(), "Gas".into()), 1000.0);
        model
    }

    fn gas_capacities(solution: &Solution) -> IndexMap<CapacityKey<GeneratorID>, CapacityValues> {
        solution
            .variables()
            .generator_capacity
            .iter_values(solution.columns())
            .map(|(key, values)| (key.clone(), values))
            .collect()
    }

    #[rstest]
    fn test_single_node_capacity_covers_load(single_node_model: Model) {
        let model = single_node_model;
        let derived = derive_parameters(&model).unwrap();
        let solution = solve_model(&model, &derived).unwrap();
        let load = 1000.0 / 60.0;

        // Capacity built in the first period has retired by the second
        let capacities = gas_capacities(&solution);
        let key = |period| -> CapacityKey<GeneratorID> { ("north".into(), "gas".into(), period) };
        let first = capacities[&key(1)];
        let second = capacities[&key(2)];
        assert_approx_eq!(f64, first.installed, load, epsilon = 1e-6);
        assert_approx_eq!(f64, first.invested, load, epsilon = 1e-6);
        assert_approx_eq!(f64, second.installed, load, epsilon = 1e-6);
        assert_approx_eq!(f64, second.invested, load, epsilon = 1e-6);

        for (_, output) in solution.iter_generation() {
            assert_approx_eq!(f64, output, load, epsilon = 1e-6);
        }
        assert!(solution.iter_electricity_prices().all(|(_, price)| price > 0.0));
        assert!(solution.iter_heat_prices().next().is_none());
        assert_eq!(solution.iter_emission_prices().count(), 4);
    }

    #[rstest]
    fn test_out_of_sample_uses_fixed_capacity(single_node_model: Model) {
        let mut model = single_node_model;
        let mut fixed = FixedCapacities::default();
        for period in model.horizon.periods() {
            fixed.insert(
                CapacityAsset::Generator("north".into(), "gas".into()),
                period,
                CapacityValues {
                    invested: 5.0,
                    installed: 5.0,
                },
            );
        }
        model.fixed_capacities = Some(fixed);

        let derived = derive_parameters(&model).unwrap();
        let solution = solve_model(&model, &derived).unwrap();
        for (_, output) in solution.iter_generation() {
            assert_approx_eq!(f64, output, 5.0, epsilon = 1e-6);
        }

        // The remaining load is shed, so the price is the value of lost load in both periods
        for (_, price) in solution.iter_electricity_prices() {
            assert_approx_eq!(f64, price, 22000.0, epsilon = 1e-3);
        }
        assert!(solution.variables().objective_offset > 0.0);
        assert!(solution.objective_value() > solution.variables().objective_offset);
    }

    #[rstest]
    fn test_emission_price_when_cap_binds(single_node_model: Model) {
        let mut model = single_node_model;
        for period in model.horizon.periods() {
            model.system_parameters.co2_cap.insert(period, 0.0);
        }

        let derived = derive_parameters(&model).unwrap();
        let solution = solve_model(&model, &derived).unwrap();
        for (_, output) in solution.iter_generation() {
            assert_approx_eq!(f64, output, 0.0, epsilon = 1e-6);
        }

        let prices: Vec<_> = solution.iter_emission_prices().collect();
        assert_eq!(prices.len(), 4);
        assert!(prices.iter().all(|(_, price)| *price > 0.0));
    }

    #[rstest]
    fn test_solve_without_solver_output(single_node_model: Model) {
        let model = single_node_model;
        let derived = derive_parameters(&model).unwrap();
        let options = SolveOptions {
            solver_output: false,
        };
        let quiet = solve_model_with_options(&model, &derived, &options).unwrap();
        let default = solve_model(&model, &derived).unwrap();
        assert_approx_eq!(
            f64,
            quiet.objective_value(),
            default.objective_value(),
            epsilon = 1e-6 * default.objective_value().abs()
        );
    }

    #[test]
    fn test_expression_fixed_capacity_moves_to_rhs() {
        let mut problem = Problem::default();
        let var = problem.add_column(1.0, 0.0..);
        let mut expression = Expression::default();
        expression.add(var, 1.0);
        expression.add_capacity(Capacity::Fixed(4.0), -0.5);
        assert!(!expression.is_constant());
        assert_eq!(expression.constant, -2.0);

        // var - 0.5 * 4 <= 0, i.e. var <= 2
        add_le_row(&mut problem, expression, 0.0);
        let solved = problem.optimise(Sense::Maximise).solve();
        assert_eq!(solved.status(), HighsModelStatus::Optimal);
        assert_eq!(solved.get_solution().columns(), [2.0]);
    }

    #[test]
    fn test_variable_map_zip_values() {
        let mut problem = Problem::default();
        problem.add_column(0.0, 0.0..);
        let mut map = VariableMap::new(&problem);
        map.add(&mut problem, "a", 1.0);
        map.add(&mut problem, "b", 1.0);
        assert_eq!(map.len(), 2);

        let values: Vec<_> = map.zip_values(&[9.0, 1.0, 2.0]).collect();
        assert_eq!(values, [(&"a", 1.0), (&"b", 2.0)]);
    }

    #[test]
    #[should_panic(expected = "Variables of one family must be added together")]
    fn test_variable_map_not_contiguous() {
        let mut problem = Problem::default();
        let mut map = VariableMap::new(&problem);
        map.add(&mut problem, "a", 1.0);
        problem.add_column(0.0, 0.0..);
        map.add(&mut problem, "b", 1.0);
    }

    #[test]
    fn test_fixed_capacity_family() {
        let family: CapacityFamily<&str> = CapacityFamily::Fixed(
            [(
                "a",
                CapacityValues {
                    invested: 1.0,
                    installed: 3.0,
                },
            )]
            .into_iter()
            .collect(),
        );
        assert_eq!(family.installed(&"a"), Capacity::Fixed(3.0));
        assert_eq!(family.installed(&"b"), Capacity::Fixed(0.0));
        assert!(family.invested_variables().is_none());
        assert_eq!(family.iter_values(&[]).count(), 1);
    }
}
