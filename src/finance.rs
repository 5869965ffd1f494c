//! General functions related to finance.
use crate::units::{Dimensionless, MoneyPerCapacity, MoneyPerCapacityPerYear, Year};

/// Calculates the capital recovery factor (CRF) for a given lifetime and interest rate.
///
/// The CRF is used to annualise capital costs over the lifetime of an asset. It is equivalent to
/// `r / (1 - (1 + r)^-L)`.
pub fn capital_recovery_factor(lifetime: f64, rate: Dimensionless) -> Dimensionless {
    if lifetime <= 0.0 {
        return Dimensionless(0.0);
    }
    if rate == Dimensionless(0.0) {
        return Dimensionless(1.0 / lifetime);
    }
    rate / (Dimensionless(1.0) - (Dimensionless(1.0) + rate).powf(-lifetime))
}

/// Calculates the annual cost of a unit of capacity.
///
/// This is the annualised capital cost plus the fixed operation and maintenance cost.
pub fn annual_capacity_cost(
    capital_cost: MoneyPerCapacity,
    fixed_om_cost: MoneyPerCapacityPerYear,
    lifetime: f64,
    wacc: Dimensionless,
) -> MoneyPerCapacityPerYear {
    let crf = capital_recovery_factor(lifetime, wacc);
    MoneyPerCapacityPerYear(capital_cost.value() * crf.value()) + fixed_om_cost
}

/// The present value of one unit paid at the start of each of `years` years.
///
/// This is `sum((1 + r)^-j)` for `j` in `0..years`, extended to non-integer `years` through its
/// closed form `(1 - (1 + r)^-years) / (1 - 1 / (1 + r))`.
pub fn annuity_due_years(years: f64, discount_rate: Dimensionless) -> Year {
    if discount_rate == Dimensionless(0.0) {
        return Year(years);
    }
    let growth = Dimensionless(1.0) + discount_rate;
    let numerator = Dimensionless(1.0) - growth.powf(-years);
    let denominator = Dimensionless(1.0) - Dimensionless(1.0) / growth;
    Year((numerator / denominator).value())
}

/// The factor converting the cost of one representative operational year into the discounted
/// cost of every year an investment period represents.
pub fn operational_discount_factor(leap_years: u32, discount_rate: Dimensionless) -> f64 {
    (0..leap_years)
        .map(|j| (1.0 + discount_rate.value()).powi(-(j as i32)))
        .sum()
}

/// The multiplier discounting costs in `period` back to the start of the first period
pub fn period_discount_multiplier(period: u32, leap_years: u32, discount_rate: Dimensionless) -> f64 {
    if period <= 1 {
        return 1.0;
    }
    let exponent = -((leap_years * (period - 1)) as f64);
    (1.0 + discount_rate.value()).powf(exponent)
}

/// Calculates the cost of a unit of capacity invested in `period`, as seen from that period.
///
/// The annual cost is charged for every remaining year of the horizon, or for the lifetime of the
/// asset if that ends first, and discounted to the start of the investment period.
///
/// # Arguments
///
/// * `annual_cost` - The annual cost of a unit of capacity (see [`annual_capacity_cost`])
/// * `unit_scale` - Scale applied to convert cost units to those of the capacity variables
/// * `remaining_periods` - Number of periods from this one to the end of the horizon (inclusive)
/// * `leap_years` - Number of years in each period
/// * `lifetime` - Technical lifetime of the asset in years
/// * `discount_rate` - Discount rate
pub fn investment_cost_per_period(
    annual_cost: MoneyPerCapacityPerYear,
    unit_scale: f64,
    remaining_periods: u32,
    leap_years: u32,
    lifetime: f64,
    discount_rate: Dimensionless,
) -> MoneyPerCapacity {
    let years_charged = f64::from(remaining_periods * leap_years).min(lifetime);
    annual_cost * annuity_due_years(years_charged, discount_rate) * Dimensionless(unit_scale)
}
