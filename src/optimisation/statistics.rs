//! Logging of problem statistics.
use super::Problem;
use crate::derivation::DerivedParameters;
use crate::model::Model;
use log::info;

/// Log the size of the model and of the assembled problem
pub fn log_problem_statistics(model: &Model, derived: &DerivedParameters, problem: &Problem) {
    let horizon = &model.horizon;
    let network = &model.network;

    info!(
        "Network: {} nodes, {} lines",
        network.nodes.len(),
        network.arcs.len()
    );
    info!("Generator types: {}", model.generators.len());
    if model.heat.is_some() {
        let electric = model
            .generators
            .values()
            .filter(|generator| generator.produces_electricity())
            .count();
        let heat = model
            .generators
            .values()
            .filter(|generator| generator.produces_heat())
            .count();
        info!("Electricity generator types: {electric}, heat generator types: {heat}");
    }
    info!(
        "Generators at nodes: {}",
        model.generators_of_node.len()
    );
    info!(
        "Storage types: {}, storages at nodes: {}",
        model.storages.len(),
        model.storages_of_node.len()
    );
    if let Some(heat) = &model.heat {
        info!("Converters: {}", heat.converters.len());
    }

    let regular = horizon.iter_regular_seasons().collect::<Vec<_>>();
    let peak = horizon.iter_peak_seasons().collect::<Vec<_>>();
    info!(
        "Scenarios: {}, operational hours: {}, seasons: {}",
        horizon.scenarios.len(),
        horizon.num_hours(),
        horizon.seasons.len()
    );
    info!(
        "Regular seasons: {} of {} hours, peak seasons: {} of {} hours",
        regular.len(),
        regular.first().map_or(0, |season| season.length),
        peak.len(),
        peak.first().map_or(0, |season| season.length)
    );
    info!(
        "Discount rate: {}, operational discount factor: {}",
        model.parameters.discount_rate, derived.operational_discount
    );
    info!(
        "Problem has {} variables and {} constraints",
        problem.num_cols(),
        problem.num_rows()
    );
}
