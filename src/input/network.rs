//! Code for reading nodes, transmission links and their parameters.
use super::table::{KnownIDs, ParamTable, fill_param_table};
use super::*;
use crate::network::{
    DEFAULT_LINE_EFFICIENCY, DirectionalLink, LineTypeID, Network, NodeID, NodeMap,
    NodeParameters, NodePair, TransmissionParameters,
};
use serde::Deserialize;
use std::path::Path;

const NODES_FILE_NAME: &str = "nodes.csv";
const LINKS_FILE_NAME: &str = "links.csv";
const VALUE_OF_LOST_LOAD_FILE_NAME: &str = "node_value_of_lost_load.csv";
const ANNUAL_DEMAND_FILE_NAME: &str = "node_annual_demand.csv";
const LOAD_PROFILE_FILE_NAME: &str = "electric_load.csv";
const LOAD_CHANGE_FILE_NAME: &str = "electric_load_change.csv";
const RESERVOIR_INFLOW_FILE_NAME: &str = "reservoir_hydro_inflow.csv";

fn default_line_efficiency() -> f64 {
    DEFAULT_LINE_EFFICIENCY
}

/// A row of the links file
#[derive(Deserialize)]
struct LinkRaw {
    from_node: NodeID,
    to_node: NodeID,
    line_type: Option<LineTypeID>,
    #[serde(default = "default_line_efficiency")]
    efficiency: f64,
}

/// Read nodes from the specified model directory
pub fn read_nodes(model_dir: &Path) -> Result<NodeMap> {
    let file_path = model_dir.join(NODES_FILE_NAME);
    let nodes: NodeMap = read_csv_id_file(&file_path)?;
    for node in nodes.values() {
        check_non_negative(node.max_hydro_generation, "max_hydro_generation")
            .and_then(|()| check_share(node.electric_heat_share))
            .with_context(|| format!("Invalid parameters for node {}", node.id))
            .with_context(|| input_err_msg(&file_path))?;
    }

    Ok(nodes)
}

fn check_share(value: f64) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&value),
        "electric_heat_share must be between 0 and 1"
    );

    Ok(())
}

/// Read the transmission network.
///
/// The links file is optional, as a model with a single node needs no links.
pub fn read_network(model_dir: &Path) -> Result<Network> {
    let nodes = read_nodes(model_dir)?;
    let file_path = model_dir.join(LINKS_FILE_NAME);
    let links = read_csv_optional::<LinkRaw>(&file_path)?.map(|raw| DirectionalLink {
        from: raw.from_node,
        to: raw.to_node,
        line_type: raw.line_type,
        efficiency: raw.efficiency,
    });

    Network::new(nodes, links).with_context(|| input_err_msg(&file_path))
}

/// Read demand and hydro parameters for nodes.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `ids` - Known entity IDs
/// * `load_change` - Whether the load change module is enabled
pub fn read_node_parameters(
    model_dir: &Path,
    ids: &KnownIDs,
    load_change: bool,
) -> Result<NodeParameters> {
    let mut params = NodeParameters::default();
    fill_param_table(
        &mut params.value_of_lost_load,
        &model_dir.join(VALUE_OF_LOST_LOAD_FILE_NAME),
        ids,
    )?;
    fill_param_table(
        &mut params.annual_demand,
        &model_dir.join(ANNUAL_DEMAND_FILE_NAME),
        ids,
    )?;
    fill_param_table(
        &mut params.load_profile,
        &model_dir.join(LOAD_PROFILE_FILE_NAME),
        ids,
    )?;
    if load_change {
        fill_param_table(
            &mut params.load_change,
            &model_dir.join(LOAD_CHANGE_FILE_NAME),
            ids,
        )?;
    }
    fill_param_table(
        &mut params.reservoir_inflow,
        &model_dir.join(RESERVOIR_INFLOW_FILE_NAME),
        ids,
    )?;

    Ok(params)
}

/// Read transmission investment parameters.
///
/// Parameters of individual lines must be given for the orientation of the line which appears
/// first in the links file.
pub fn read_transmission_parameters(
    model_dir: &Path,
    network: &Network,
    ids: &KnownIDs,
) -> Result<TransmissionParameters> {
    let mut params = TransmissionParameters::default();
    fill_param_table(
        &mut params.capital_cost,
        &model_dir.join("transmission_type_capital_costs.csv"),
        ids,
    )?;
    fill_param_table(
        &mut params.fixed_om_cost,
        &model_dir.join("transmission_type_fixed_om_costs.csv"),
        ids,
    )?;

    let arc_tables: [(&mut ParamTable<NodePair>, &str); 2] = [
        (&mut params.length, "transmission_lengths.csv"),
        (&mut params.lifetime, "transmission_lifetimes.csv"),
    ];
    for (table, file_name) in arc_tables {
        let file_path = model_dir.join(file_name);
        fill_param_table(table, &file_path, ids)?;
        check_arc_keys(network, table.iter().map(|(arc, _)| arc))
            .with_context(|| input_err_msg(&file_path))?;
    }

    let arc_period_tables: [(&mut ParamTable<(NodeID, NodeID, u32)>, &str); 4] = [
        (
            &mut params.initial_capacity,
            "transmission_initial_capacities.csv",
        ),
        (
            &mut params.max_built_capacity,
            "transmission_max_built_capacities.csv",
        ),
        (
            &mut params.max_installed_capacity,
            "transmission_max_installed_capacities.csv",
        ),
        (
            &mut params.investment_cost,
            "transmission_investment_costs.csv",
        ),
    ];
    for (table, file_name) in arc_period_tables {
        let file_path = model_dir.join(file_name);
        fill_param_table(table, &file_path, ids)?;
        let arcs = table
            .iter()
            .map(|((from, to, _), _)| (from.clone(), to.clone()))
            .collect_vec();
        check_arc_keys(network, arcs.iter()).with_context(|| input_err_msg(&file_path))?;
    }

    for (arc, lifetime) in params.lifetime.iter() {
        check_positive(lifetime, "Transmission lifetime")
            .with_context(|| format!("Invalid lifetime for line {} - {}", arc.0, arc.1))?;
    }

    Ok(params)
}

/// Check that every pair of nodes is a bidirectional arc in its canonical orientation
fn check_arc_keys<'a, I>(network: &Network, pairs: I) -> Result<()>
where
    I: Iterator<Item = &'a NodePair>,
{
    for (from, to) in pairs {
        ensure!(
            network.arcs.contains(&(from.clone(), to.clone())),
            "{from} - {to} is not a transmission line in the orientation given in {LINKS_FILE_NAME}"
        );
    }

    Ok(())
}
