//! Hydro budgets, generator availability and CHP efficiencies.
use crate::generator::{Generator, GeneratorCarrier, GeneratorID};
use crate::horizon::{Hour, Period, ScenarioID, SeasonID};
use crate::input::table::ParamTable;
use crate::model::Model;
use crate::network::NodeID;
use itertools::iproduct;

/// Calculate the energy available to reservoir hydro in each season, keyed by
/// (node, period, season, scenario)
pub fn calculate_hydro_budgets(model: &Model) -> ParamTable<(NodeID, Period, SeasonID, ScenarioID)> {
    let inflow = &model.node_parameters.reservoir_inflow;
    let mut budgets = ParamTable::new(0.0);
    for (node, period, season, scenario) in iproduct!(
        model.network.nodes.keys(),
        model.horizon.periods(),
        model.horizon.seasons.values(),
        &model.horizon.scenarios
    ) {
        let budget = season
            .hours()
            .map(|hour| {
                inflow.get(&(
                    node.clone(),
                    period,
                    season.id.clone(),
                    hour,
                    scenario.clone(),
                ))
            })
            .sum();
        budgets.insert(
            (node.clone(), period, season.id.clone(), scenario.clone()),
            budget,
        );
    }

    budgets
}

/// Calculate the electricity produced per unit of output of each generator.
///
/// This is the CHP efficiency for CHP generators and one for all others.
pub fn calculate_chp_efficiencies(model: &Model) -> ParamTable<(GeneratorID, Period)> {
    let raw = &model.generator_parameters.chp_efficiency;
    let mut efficiencies = ParamTable::new(1.0);
    for generator in model
        .generators
        .values()
        .filter(|generator| generator.carrier == GeneratorCarrier::Chp)
    {
        for period in model.horizon.periods() {
            let key = (generator.id.clone(), period);
            efficiencies.insert(key.clone(), raw.get(&key));
        }
    }

    efficiencies
}

/// The fraction of installed capacity of a generator which can produce in an hour.
///
/// Generators with a fixed availability use it in every hour. The others use the stochastic
/// hourly series.
pub fn generator_availability(
    model: &Model,
    node: &NodeID,
    generator: &Generator,
    hour: Hour,
    scenario: &ScenarioID,
    period: Period,
) -> f64 {
    if generator.has_stochastic_availability() {
        model.generator_parameters.stochastic_availability.get(&(
            node.clone(),
            generator.id.clone(),
            hour,
            scenario.clone(),
            period,
        ))
    } else {
        generator.availability
    }
}
