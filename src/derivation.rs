//! Derivation of the parameters which are not read directly from the input files.
//!
//! The derivations run once per model, in a fixed order: investment costs, marginal costs,
//! capacity limits, loads and then hydro resources.
use crate::finance::{operational_discount_factor, period_discount_multiplier};
use crate::generator::GeneratorID;
use crate::horizon::{Period, ScenarioID, SeasonID};
use crate::input::table::ParamTable;
use crate::model::Model;
use crate::network::NodeID;
use crate::units::Dimensionless;
use anyhow::Result;
use indexmap::IndexMap;
use log::debug;

mod capacity;
pub use capacity::{CapacityLimits, calculate_capacity_limits, lifetime_window};
mod costs;
pub use costs::{
    HEAT_RATE_FACTOR, InvestmentCosts, calculate_investment_costs, calculate_marginal_costs,
};
mod load;
pub use load::{
    ELECTRICITY_LOAD_FLOOR, HEAT_LOAD_FLOOR, LoadAdjustment, LoadCarrier, LoadTable, Loads,
    calculate_loads,
};
mod resources;
pub use resources::{calculate_chp_efficiencies, calculate_hydro_budgets, generator_availability};

/// Parameters derived from the model inputs
#[derive(Clone, Debug, PartialEq)]
pub struct DerivedParameters {
    /// Converts the cost of a representative year into the cost of all years of a period
    pub operational_discount: f64,
    /// Discounts the costs of each period to the start of the first period
    pub discount_multipliers: IndexMap<Period, f64>,
    /// Per-period investment costs
    pub investment_costs: InvestmentCosts,
    /// Cost per unit of generator output (generator, period)
    pub marginal_costs: ParamTable<(GeneratorID, Period)>,
    /// Initial capacities and installed capacity limits
    pub capacity_limits: CapacityLimits,
    /// Scaled hourly loads
    pub loads: Loads,
    /// Seasonal reservoir hydro budgets (node, period, season, scenario)
    pub hydro_budgets: ParamTable<(NodeID, Period, SeasonID, ScenarioID)>,
    /// Electricity produced per unit of generator output (generator, period)
    pub chp_efficiencies: ParamTable<(GeneratorID, Period)>,
}

impl DerivedParameters {
    /// The discount multiplier for a period of the horizon
    pub fn discount_multiplier(&self, period: Period) -> f64 {
        self.discount_multipliers[&period]
    }
}

/// Derive all parameters of a model
pub fn derive_parameters(model: &Model) -> Result<DerivedParameters> {
    let params = &model.parameters;
    let discount_rate = Dimensionless(params.discount_rate);
    let operational_discount =
        operational_discount_factor(params.leap_years_investment, discount_rate);
    let discount_multipliers = model
        .horizon
        .periods()
        .map(|period| {
            let multiplier =
                period_discount_multiplier(period, params.leap_years_investment, discount_rate);
            (period, multiplier)
        })
        .collect();

    debug!("Calculating investment costs");
    let investment_costs = calculate_investment_costs(model);
    debug!("Calculating marginal costs");
    let marginal_costs = calculate_marginal_costs(model);
    debug!("Calculating capacity limits");
    let capacity_limits = calculate_capacity_limits(model);
    debug!("Scaling loads");
    let loads = calculate_loads(model)?;
    debug!("Calculating hydro budgets");
    let hydro_budgets = calculate_hydro_budgets(model);
    let chp_efficiencies = calculate_chp_efficiencies(model);

    Ok(DerivedParameters {
        operational_discount,
        discount_multipliers,
        investment_costs,
        marginal_costs,
        capacity_limits,
        loads,
        hydro_budgets,
        chp_efficiencies,
    })
}
