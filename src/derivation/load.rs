//! Scaling of hourly load profiles to annual demand.
use crate::horizon::{Hour, Period, ScenarioID};
use crate::input::table::ParamTable;
use crate::model::Model;
use crate::network::NodeID;
use anyhow::{Result, ensure};
use itertools::iproduct;
use log::info;
use serde::Serialize;

/// Electricity load used in place of a negative value
pub const ELECTRICITY_LOAD_FLOOR: f64 = 10.0;

/// Heat load used in place of a negative value
pub const HEAT_LOAD_FLOOR: f64 = 0.0;

/// Annual demand below which a node is treated as having no demand
const MIN_ANNUAL_DEMAND: f64 = 1.0;

/// Hourly load at each node, keyed by (node, hour, period, scenario)
pub type LoadTable = ParamTable<(NodeID, Hour, Period, ScenarioID)>;

/// A raw hourly load profile, keyed by (node, hour, scenario, period)
type ProfileTable = ParamTable<(NodeID, Hour, ScenarioID, Period)>;

/// The balance a load belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadCarrier {
    /// Electricity load
    Electricity,
    /// Heat load
    Heat,
}

/// A negative load which was replaced
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LoadAdjustment {
    /// Electricity or heat
    pub carrier: LoadCarrier,
    /// The node
    pub node: NodeID,
    /// The hour
    pub hour: Hour,
    /// The period
    pub period: Period,
    /// The scenario
    pub scenario: ScenarioID,
    /// Load before the correction
    pub original: f64,
    /// The value used instead
    pub replacement: f64,
}

/// Hourly electricity and heat loads after scaling and adjustment
#[derive(Clone, Debug, PartialEq)]
pub struct Loads {
    /// Electricity load
    pub electricity: LoadTable,
    /// Heat load. Empty unless the heat module is enabled.
    pub heat: LoadTable,
    /// Every negative load which was replaced
    pub adjustments: Vec<LoadAdjustment>,
}

/// Expected sum of a load profile over the regular seasons of one year
fn regular_season_sum(model: &Model, profile: &ProfileTable, node: &NodeID, period: Period) -> f64 {
    let probability = model.horizon.scenario_probability();
    let season_scale = &model.system_parameters.season_scale;
    model
        .horizon
        .iter_regular_seasons()
        .flat_map(|season| season.hours().map(move |hour| (season, hour)))
        .flat_map(|(season, hour)| {
            model.horizon.scenarios.iter().map(move |scenario| {
                probability
                    * season_scale.get(&season.id)
                    * profile.get(&(node.clone(), hour, scenario.clone(), period))
            })
        })
        .sum()
}

/// The factor which scales a profile so that its sum over the regular seasons matches the annual
/// demand
fn scale_factor(
    model: &Model,
    carrier: LoadCarrier,
    profile: &ProfileTable,
    node: &NodeID,
    period: Period,
    annual_demand: f64,
) -> Result<f64> {
    if annual_demand < MIN_ANNUAL_DEMAND {
        return Ok(0.0);
    }

    let raw_sum = regular_season_sum(model, profile, node, period);
    ensure!(
        raw_sum > 0.0,
        "The {carrier:?} load profile of node {node} in period {period} sums to zero over the \
        regular seasons, but the annual demand is {annual_demand}"
    );

    Ok(annual_demand / raw_sum)
}

/// Scale the hourly loads of every node and apply any adjustments.
///
/// Electricity load is reduced by the share of heat load which it already covers when the heat
/// module is enabled. Exogenous load changes are added when the load change module is enabled.
/// Negative results are replaced by [`ELECTRICITY_LOAD_FLOOR`] or [`HEAT_LOAD_FLOOR`] and recorded.
pub fn calculate_loads(model: &Model) -> Result<Loads> {
    let load_change = model.parameters.modules.load_change;
    let node_params = &model.node_parameters;
    let mut adjustments = Vec::new();

    let mut electricity = ParamTable::new(0.0);
    for (node, period) in iproduct!(model.network.nodes.values(), model.horizon.periods()) {
        let scale = scale_factor(
            model,
            LoadCarrier::Electricity,
            &node_params.load_profile,
            &node.id,
            period,
            node_params.annual_demand.get(&(node.id.clone(), period)),
        )?;
        for (hour, scenario) in iproduct!(model.horizon.hours(), &model.horizon.scenarios) {
            let raw_key = (node.id.clone(), hour, scenario.clone(), period);
            let mut load = node_params.load_profile.get(&raw_key) * scale;
            if let Some(heat) = &model.heat {
                load -= node.electric_heat_share * heat.parameters.load_profile.get(&raw_key);
            }
            if load_change {
                load += node_params.load_change.get(&raw_key);
            }
            if load < 0.0 {
                adjustments.push(LoadAdjustment {
                    carrier: LoadCarrier::Electricity,
                    node: node.id.clone(),
                    hour,
                    period,
                    scenario: scenario.clone(),
                    original: load,
                    replacement: ELECTRICITY_LOAD_FLOOR,
                });
                load = ELECTRICITY_LOAD_FLOOR;
            }
            electricity.insert((node.id.clone(), hour, period, scenario.clone()), load);
        }
    }
    info!(
        "Replaced {} negative electricity loads with {ELECTRICITY_LOAD_FLOOR}",
        adjustments.len()
    );

    let mut heat_load = ParamTable::new(0.0);
    if let Some(heat) = &model.heat {
        let heat_params = &heat.parameters;
        let num_electricity_adjustments = adjustments.len();
        for (node, period) in iproduct!(model.network.nodes.keys(), model.horizon.periods()) {
            let scale = scale_factor(
                model,
                LoadCarrier::Heat,
                &heat_params.load_profile,
                node,
                period,
                heat_params.annual_demand.get(&(node.clone(), period)),
            )?;
            for (hour, scenario) in iproduct!(model.horizon.hours(), &model.horizon.scenarios) {
                let raw_key = (node.clone(), hour, scenario.clone(), period);
                let mut load = heat_params.load_profile.get(&raw_key) * scale;
                if load_change {
                    load += heat_params.load_change.get(&raw_key);
                }
                if load < 0.0 {
                    adjustments.push(LoadAdjustment {
                        carrier: LoadCarrier::Heat,
                        node: node.clone(),
                        hour,
                        period,
                        scenario: scenario.clone(),
                        original: load,
                        replacement: HEAT_LOAD_FLOOR,
                    });
                    load = HEAT_LOAD_FLOOR;
                }
                heat_load.insert((node.clone(), hour, period, scenario.clone()), load);
            }
        }
        info!(
            "Replaced {} negative heat loads with {HEAT_LOAD_FLOOR}",
            adjustments.len() - num_electricity_adjustments
        );
    }

    Ok(Loads {
        electricity,
        heat: heat_load,
        adjustments,
    })
}
