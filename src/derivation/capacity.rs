//! Initial capacities and the limits on installed capacity.
use crate::generator::{GeneratorID, TechnologyID};
use crate::heat::{ConverterID, NeighbourhoodID};
use crate::horizon::Period;
use crate::input::table::ParamTable;
use crate::model::Model;
use crate::network::NodeID;
use crate::storage::StorageID;
use itertools::iproduct;
use std::ops::RangeInclusive;

/// Installed capacity limits for every kind of asset.
///
/// Generator, transmission and storage limits are at least the initial capacity, so that existing
/// capacity never makes the model infeasible. Converter and neighbourhood limits are the raw
/// values.
#[derive(Clone, Debug, PartialEq)]
pub struct CapacityLimits {
    /// Initial generator capacity, filled in from the reference capacity where missing
    /// (node, generator, period)
    pub generator_initial_capacity: ParamTable<(NodeID, GeneratorID, Period)>,
    /// (node, technology, period)
    pub generator_max_installed: ParamTable<(NodeID, TechnologyID, Period)>,
    /// (from, to, period)
    pub transmission_max_installed: ParamTable<(NodeID, NodeID, Period)>,
    /// (node, storage, period)
    pub storage_power_max_installed: ParamTable<(NodeID, StorageID, Period)>,
    /// (node, storage, period)
    pub storage_energy_max_installed: ParamTable<(NodeID, StorageID, Period)>,
    /// (node, converter, period)
    pub converter_max_installed: ParamTable<(NodeID, ConverterID, Period)>,
    /// (node, neighbourhood, period)
    pub neighbourhood_max_installed: ParamTable<(NodeID, NeighbourhoodID, Period)>,
}

/// The periods whose investments are still operating in `period`.
///
/// An investment made in period `j` lasts until `lifetime` years have passed, so it is counted in
/// every period `i` with `j >= 1 + i - lifetime / leap_years`.
pub fn lifetime_window(period: Period, lifetime: f64, leap_years: u32) -> RangeInclusive<Period> {
    let start = (1.0 + f64::from(period) - lifetime / f64::from(leap_years)).max(1.0);
    (start.ceil() as Period)..=period
}

/// Calculate initial generator capacities and the limits on installed capacity
pub fn calculate_capacity_limits(model: &Model) -> CapacityLimits {
    let gen_params = &model.generator_parameters;
    let mut generator_initial_capacity = ParamTable::new(0.0);
    for ((node, generator), period) in iproduct!(&model.generators_of_node, model.horizon.periods())
    {
        let key = (node.clone(), generator.clone(), period);
        let mut capacity = gen_params.initial_capacity.get(&key);
        if capacity == 0.0 {
            capacity = gen_params
                .reference_initial_capacity
                .get(&(node.clone(), generator.clone()))
                * (1.0 - gen_params.initial_capacity_scale.get(&(generator.clone(), period)));
        }
        generator_initial_capacity.insert(key, capacity);
    }

    let mut generator_max_installed = ParamTable::new(0.0);
    for (node, technology, period) in iproduct!(
        model.network.nodes.keys(),
        &model.technologies,
        model.horizon.periods()
    ) {
        let initial: f64 = model
            .iter_generators_of_technology(node, technology)
            .map(|generator| {
                generator_initial_capacity.get(&(node.clone(), generator.id.clone(), period))
            })
            .sum();
        let raw = gen_params
            .max_installed_capacity
            .get(&(node.clone(), technology.clone()));
        generator_max_installed.insert((node.clone(), technology.clone(), period), raw.max(initial));
    }

    let trans_params = &model.transmission_parameters;
    let mut transmission_max_installed = ParamTable::new(0.0);
    for ((from, to), period) in iproduct!(&model.network.arcs, model.horizon.periods()) {
        let key = (from.clone(), to.clone(), period);
        let limit = trans_params
            .max_installed_capacity
            .get(&key)
            .max(trans_params.initial_capacity.get(&key));
        transmission_max_installed.insert(key, limit);
    }

    let stor_params = &model.storage_parameters;
    let mut storage_power_max_installed = ParamTable::new(0.0);
    let mut storage_energy_max_installed = ParamTable::new(0.0);
    for ((node, storage_id), period) in iproduct!(&model.storages_of_node, model.horizon.periods())
    {
        let default = model.storages[storage_id].default_max_installed_capacity();
        let pair = (node.clone(), storage_id.clone());
        let key = (node.clone(), storage_id.clone(), period);
        storage_power_max_installed.insert(
            key.clone(),
            stor_params
                .power_max_installed_capacity
                .get_or(&pair, default)
                .max(stor_params.power_initial_capacity.get(&key)),
        );
        storage_energy_max_installed.insert(
            key.clone(),
            stor_params
                .energy_max_installed_capacity
                .get_or(&pair, default)
                .max(stor_params.energy_initial_capacity.get(&key)),
        );
    }

    let mut converter_max_installed = ParamTable::new(0.0);
    let mut neighbourhood_max_installed = ParamTable::new(0.0);
    if let Some(heat) = &model.heat {
        let heat_params = &heat.parameters;
        for ((node, converter), period) in
            iproduct!(&heat.converters_of_node, model.horizon.periods())
        {
            let limit = heat_params
                .converter_max_installed_capacity
                .get(&(node.clone(), converter.clone()));
            converter_max_installed.insert((node.clone(), converter.clone(), period), limit);
        }
        for ((node, neighbourhood), period) in
            iproduct!(&heat.neighbourhoods_of_node, model.horizon.periods())
        {
            let limit = heat_params
                .neighbourhood_max_installed_capacity
                .get(&(node.clone(), neighbourhood.clone()));
            neighbourhood_max_installed.insert((node.clone(), neighbourhood.clone(), period), limit);
        }
    }

    CapacityLimits {
        generator_initial_capacity,
        generator_max_installed,
        transmission_max_installed,
        storage_power_max_installed,
        storage_energy_max_installed,
        converter_max_installed,
        neighbourhood_max_installed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use itertools::Itertools;
    use rstest::rstest;

    #[rstest]
    #[case(1, 30.0, 10, 1..=1)]
    #[case(3, 30.0, 10, 1..=3)]
    #[case(3, 20.0, 10, 2..=3)]
    #[case(4, 15.0, 10, 4..=4)]
    #[case(5, 25.0, 10, 4..=5)]
    fn test_lifetime_window(
        #[case] period: Period,
        #[case] lifetime: f64,
        #[case] leap_years: u32,
        #[case] expected: RangeInclusive<Period>,
    ) {
        assert_eq!(
            lifetime_window(period, lifetime, leap_years).collect_vec(),
            expected.collect_vec()
        );
    }

    #[rstest]
    fn test_initial_capacity_filled_from_reference(mut model: Model) {
        let params = &mut model.generator_parameters;
        params
            .reference_initial_capacity
            .insert(("north".into(), "gas".into()), 100.0);
        params.initial_capacity_scale.insert(("gas".into(), 2), 0.25);
        params
            .initial_capacity
            .insert(("south".into(), "gas".into(), 1), 40.0);

        let limits = calculate_capacity_limits(&model);
        let initial = &limits.generator_initial_capacity;
        assert_eq!(initial.get(&("north".into(), "gas".into(), 1)), 100.0);
        assert_eq!(initial.get(&("north".into(), "gas".into(), 2)), 75.0);
        assert_eq!(initial.get(&("south".into(), "gas".into(), 1)), 40.0);
        assert_eq!(initial.get(&("south".into(), "gas".into(), 2)), 0.0);
    }

    #[rstest]
    fn test_max_installed_at_least_initial(mut model: Model) {
        model
            .generator_parameters
            .initial_capacity
            .insert(("north".into(), "gas".into(), 1), 300.0);
        model
            .generator_parameters
            .max_installed_capacity
            .insert(("north".into(), "Gas".into()), 200.0);
        model
            .storage_parameters
            .energy_initial_capacity
            .insert(("south".into(), "battery".into(), 2), 50.0);
        model
            .transmission_parameters
            .max_installed_capacity
            .insert(("north".into(), "south".into(), 1), 500.0);

        let limits = calculate_capacity_limits(&model);
        let gen_limit = &limits.generator_max_installed;
        assert_eq!(gen_limit.get(&("north".into(), "Gas".into(), 1)), 300.0);
        assert_eq!(gen_limit.get(&("north".into(), "Gas".into(), 2)), 200.0);
        assert_eq!(
            limits
                .storage_energy_max_installed
                .get(&("south".into(), "battery".into(), 2)),
            50.0
        );
        assert_eq!(
            limits
                .transmission_max_installed
                .get(&("north".into(), "south".into(), 1)),
            500.0
        );
    }
}
