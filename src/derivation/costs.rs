//! Per-period investment costs and marginal operating costs.
use crate::finance::{annual_capacity_cost, investment_cost_per_period};
use crate::generator::GeneratorID;
use crate::heat::{ConverterID, NeighbourhoodID};
use crate::horizon::Period;
use crate::input::table::ParamTable;
use crate::model::Model;
use crate::network::NodeID;
use crate::storage::StorageID;
use crate::units::{Dimensionless, MoneyPerCapacity, MoneyPerCapacityPerYear};

/// Cost scale applied to generation, storage and heat module assets, whose costs are given per kW
const CAPACITY_UNIT_SCALE: f64 = 1000.0;

/// Converts an efficiency into a heat rate in GJ/MWh
pub const HEAT_RATE_FACTOR: f64 = 3.6;

/// Per-period investment cost of every kind of investable asset
#[derive(Clone, Debug, PartialEq)]
pub struct InvestmentCosts {
    /// (generator, period)
    pub generator: ParamTable<(GeneratorID, Period)>,
    /// (storage, period)
    pub storage_power: ParamTable<(StorageID, Period)>,
    /// (storage, period)
    pub storage_energy: ParamTable<(StorageID, Period)>,
    /// (from, to, period) for each bidirectional arc
    pub transmission: ParamTable<(NodeID, NodeID, Period)>,
    /// (converter, period)
    pub converter: ParamTable<(ConverterID, Period)>,
    /// (neighbourhood, period)
    pub neighbourhood: ParamTable<(NeighbourhoodID, Period)>,
}

/// Cost of a unit of capacity invested in `period`
fn cost_per_period(
    model: &Model,
    capital_cost: f64,
    fixed_om_cost: f64,
    lifetime: f64,
    unit_scale: f64,
    period: Period,
) -> f64 {
    let params = &model.parameters;
    let annual_cost = annual_capacity_cost(
        MoneyPerCapacity(capital_cost),
        MoneyPerCapacityPerYear(fixed_om_cost),
        lifetime,
        Dimensionless(params.wacc),
    );
    investment_cost_per_period(
        annual_cost,
        unit_scale,
        params.num_periods - period + 1,
        params.leap_years_investment,
        lifetime,
        Dimensionless(params.discount_rate),
    )
    .value()
}

/// Calculate the per-period investment cost of all assets.
///
/// Generators with carbon capture also pay a fixed cost for transporting and storing the captured
/// CO2. Transmission costs are derived from the line type of each arc. Arcs without a line type
/// keep the investment cost given in the input.
pub fn calculate_investment_costs(model: &Model) -> InvestmentCosts {
    let gen_params = &model.generator_parameters;
    let ccs = &model.parameters.ccs;
    let mut generator = ParamTable::new(0.0);
    for (generator_obj, period) in model
        .generators
        .values()
        .flat_map(|g| model.horizon.periods().map(move |i| (g, i)))
    {
        let key = (generator_obj.id.clone(), period);
        let mut cost = cost_per_period(
            model,
            gen_params.capital_cost.get(&key),
            gen_params.fixed_om_cost.get(&key),
            generator_obj.lifetime,
            CAPACITY_UNIT_SCALE,
            period,
        );
        if generator_obj.is_ccs() {
            cost += ccs.transport_storage_fixed_cost
                * ccs.capture_fraction
                * generator_obj.co2_factor
                * (HEAT_RATE_FACTOR / gen_params.efficiency.get(&key));
        }
        generator.insert(key, cost);
    }

    let stor_params = &model.storage_parameters;
    let mut storage_power = ParamTable::new(0.0);
    let mut storage_energy = ParamTable::new(0.0);
    for storage in model.storages.values() {
        for period in model.horizon.periods() {
            let key = (storage.id.clone(), period);
            storage_power.insert(
                key.clone(),
                cost_per_period(
                    model,
                    stor_params.power_capital_cost.get(&key),
                    stor_params.power_fixed_om_cost.get(&key),
                    storage.lifetime,
                    CAPACITY_UNIT_SCALE,
                    period,
                ),
            );
            storage_energy.insert(
                key.clone(),
                cost_per_period(
                    model,
                    stor_params.energy_capital_cost.get(&key),
                    stor_params.energy_fixed_om_cost.get(&key),
                    storage.lifetime,
                    CAPACITY_UNIT_SCALE,
                    period,
                ),
            );
        }
    }

    let trans_params = &model.transmission_parameters;
    let mut transmission = ParamTable::new(trans_params.investment_cost.default_value());
    for arc in &model.network.arcs {
        let lifetime = trans_params.lifetime.get(arc);
        let length = trans_params.length.get(arc);
        for period in model.horizon.periods() {
            let key = (arc.0.clone(), arc.1.clone(), period);
            let cost = match model.network.line_type_of_arc(arc) {
                Some(line_type) => {
                    let type_key = (line_type.clone(), period);
                    cost_per_period(
                        model,
                        length * trans_params.capital_cost.get(&type_key),
                        trans_params.fixed_om_cost.get(&type_key),
                        lifetime,
                        1.0,
                        period,
                    )
                }
                None => trans_params.investment_cost.get(&key),
            };
            transmission.insert(key, cost);
        }
    }

    let mut converter = ParamTable::new(0.0);
    let mut neighbourhood = ParamTable::new(0.0);
    if let Some(heat) = &model.heat {
        let heat_params = &heat.parameters;
        for conv in heat.converters.values() {
            for period in model.horizon.periods() {
                let key = (conv.id.clone(), period);
                let cost = cost_per_period(
                    model,
                    heat_params.converter_capital_cost.get(&key),
                    heat_params.converter_fixed_om_cost.get(&key),
                    conv.lifetime,
                    CAPACITY_UNIT_SCALE,
                    period,
                );
                converter.insert(key, cost);
            }
        }
        for neigh in heat.neighbourhoods.values() {
            for period in model.horizon.periods() {
                let key = (neigh.id.clone(), period);
                let cost = cost_per_period(
                    model,
                    heat_params.neighbourhood_capital_cost.get(&key),
                    heat_params.neighbourhood_fixed_om_cost.get(&key),
                    neigh.lifetime,
                    CAPACITY_UNIT_SCALE,
                    period,
                );
                neighbourhood.insert(key, cost);
            }
        }
    }

    InvestmentCosts {
        generator,
        storage_power,
        storage_energy,
        transmission,
        converter,
        neighbourhood,
    }
}

/// Calculate the cost of producing one unit of output from each generator in each period.
///
/// Fuel and emissions are converted to output with the heat rate `3.6 / efficiency`. Generators
/// with carbon capture pay the CO2 price on the uncaptured share of their emissions and the
/// variable transport and storage cost on the captured share.
pub fn calculate_marginal_costs(model: &Model) -> ParamTable<(GeneratorID, Period)> {
    let gen_params = &model.generator_parameters;
    let sys_params = &model.system_parameters;
    let capture = model.parameters.ccs.capture_fraction;
    let mut costs = ParamTable::new(0.0);
    for generator in model.generators.values() {
        for period in model.horizon.periods() {
            let key = (generator.id.clone(), period);
            let heat_rate = HEAT_RATE_FACTOR / gen_params.efficiency.get(&key);
            let fuel = gen_params.fuel_cost.get(&key);
            let co2_price = sys_params.co2_price.get(&period);
            let cost = if generator.is_ccs() {
                heat_rate * (fuel + (1.0 - capture) * generator.co2_factor * co2_price)
                    + heat_rate
                        * capture
                        * generator.co2_factor
                        * sys_params.ccs_variable_cost.get(&period)
            } else {
                heat_rate * (fuel + generator.co2_factor * co2_price)
            };
            costs.insert(key, cost + generator.variable_om_cost);
        }
    }

    costs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use crate::generator::CCS_TECHNOLOGY;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_generator_investment_cost_decreases_towards_horizon_end(mut model: Model) {
        let gas = GeneratorID::from("gas");
        for period in 1..=2 {
            model
                .generator_parameters
                .capital_cost
                .insert((gas.clone(), period), 600.0);
        }
        let costs = calculate_investment_costs(&model);
        let first = costs.generator.get(&(gas.clone(), 1));
        let second = costs.generator.get(&(gas, 2));
        assert!(first > 0.0);
        assert!(second <= first);
    }

    #[rstest]
    fn test_generator_investment_cost_value(mut model: Model) {
        // Lifetime 30, two periods of 10 years, rates 0.05
        let gas = GeneratorID::from("gas");
        model
            .generator_parameters
            .capital_cost
            .insert((gas.clone(), 2), 1000.0);
        let costs = calculate_investment_costs(&model);
        let crf = 0.05 / (1.0 - 1.05f64.powf(-30.0));
        let annuity = (1.0 - 1.05f64.powf(-10.0)) / (1.0 - 1.0 / 1.05);
        assert_approx_eq!(
            f64,
            costs.generator.get(&(gas, 2)),
            crf * 1000.0 * 1000.0 * annuity,
            epsilon = 1e-6
        );
    }

    #[rstest]
    fn test_ccs_investment_cost_adder(mut model: Model) {
        let gas = GeneratorID::from("gas");
        let before = calculate_investment_costs(&model).generator.get(&(gas.clone(), 1));
        model.generators[0].technology = CCS_TECHNOLOGY.into();
        let after = calculate_investment_costs(&model).generator.get(&(gas, 1));
        let ccs = &model.parameters.ccs;
        assert_approx_eq!(
            f64,
            after - before,
            ccs.transport_storage_fixed_cost * ccs.capture_fraction * 0.056 * 3.6,
            epsilon = 1e-6
        );
    }

    #[rstest]
    fn test_transmission_cost_uses_line_type(mut model: Model) {
        let arc: (NodeID, NodeID) = ("north".into(), "south".into());
        model.transmission_parameters.length.insert(arc, 100.0);
        model
            .transmission_parameters
            .capital_cost
            .insert(("HVAC".into(), 1), 1500.0);
        let costs = calculate_investment_costs(&model);
        let derived = costs.transmission.get(&("north".into(), "south".into(), 1));
        assert!(derived > 0.0);
        assert!(derived < 3_000_000.0);
    }

    #[rstest]
    fn test_transmission_cost_without_line_type(mut model: Model) {
        model.network.links[0].line_type = None;
        let costs = calculate_investment_costs(&model);
        assert_eq!(
            costs.transmission.get(&("north".into(), "south".into(), 1)),
            3_000_000.0
        );
    }

    #[rstest]
    fn test_marginal_cost(mut model: Model) {
        let gas = GeneratorID::from("gas");
        model
            .generator_parameters
            .efficiency
            .insert((gas.clone(), 1), 0.5);
        model
            .generator_parameters
            .fuel_cost
            .insert((gas.clone(), 1), 5.0);
        model.system_parameters.co2_price.insert(1, 100.0);

        let costs = calculate_marginal_costs(&model);
        // 3.6 / 0.5 * (5 + 0.056 * 100) + 2
        assert_approx_eq!(f64, costs.get(&(gas.clone(), 1)), 78.32, epsilon = 1e-9);

        model.generators[0].technology = CCS_TECHNOLOGY.into();
        model.system_parameters.ccs_variable_cost.insert(1, 10.0);
        let costs = calculate_marginal_costs(&model);
        // 7.2 * (5 + 0.1 * 0.056 * 100) + 7.2 * 0.9 * 0.056 * 10 + 2
        assert_approx_eq!(f64, costs.get(&(gas, 1)), 45.6608, epsilon = 1e-9);
    }
}
