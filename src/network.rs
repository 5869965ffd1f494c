//! Nodes and the transmission network which connects them.
//!
//! Each physical line is described by a pair of [`DirectionalLink`]s, one per flow direction. The
//! capacity of a line is shared by both directions and belongs to its bidirectional arc, which is
//! the first orientation of the pair to appear in the input.
use crate::horizon::{Hour, Period, ScenarioID, SeasonID};
use crate::id::{define_id_getter, define_id_type};
use crate::input::table::ParamTable;
use anyhow::{Result, ensure};
use indexmap::{IndexMap, IndexSet};
use serde::Deserialize;

define_id_type! {NodeID}
define_id_type! {LineTypeID}

/// A map of [`Node`]s, keyed by node ID
pub type NodeMap = IndexMap<NodeID, Node>;

/// An ordered pair of nodes
pub type NodePair = (NodeID, NodeID);

/// Default efficiency of a transmission line
pub const DEFAULT_LINE_EFFICIENCY: f64 = 0.97;

/// A spatial bus at which energy is balanced
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Node {
    /// Unique identifier for the node (e.g. "NO1")
    pub id: NodeID,
    /// Expected annual generation limit for all hydro generators at this node
    #[serde(default)]
    pub max_hydro_generation: f64,
    /// Share of the raw heat load which is already included in the electricity load
    #[serde(default)]
    pub electric_heat_share: f64,
}
define_id_getter! {Node, NodeID}

/// One direction of a transmission line
#[derive(Clone, Debug, PartialEq)]
pub struct DirectionalLink {
    /// The node power flows from
    pub from: NodeID,
    /// The node power flows to
    pub to: NodeID,
    /// The type of line, used to derive investment costs
    pub line_type: Option<LineTypeID>,
    /// Fraction of the power sent which arrives
    pub efficiency: f64,
}

/// The nodes and the lines between them
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Network {
    /// All nodes
    pub nodes: NodeMap,
    /// Directional links, keyed by (from, to)
    pub links: IndexMap<NodePair, DirectionalLink>,
    /// One entry for each bidirectional line, in input order
    pub arcs: IndexSet<NodePair>,
    /// Line types referenced by any link
    pub line_types: IndexSet<LineTypeID>,
    /// Keys of the links into and out of each node
    node_links: IndexMap<NodeID, NodeLinks>,
}

/// The links connected to one node, as keys into [`Network::links`]
#[derive(Clone, Debug, PartialEq, Default)]
struct NodeLinks {
    inbound: Vec<NodePair>,
    outbound: Vec<NodePair>,
}

impl Network {
    /// Create a new [`Network`], checking that the links are consistent with the nodes
    pub fn new(nodes: NodeMap, links: impl IntoIterator<Item = DirectionalLink>) -> Result<Self> {
        let mut link_map = IndexMap::new();
        for link in links {
            ensure!(
                nodes.contains_key(&link.from) && nodes.contains_key(&link.to),
                "Link {} -> {} refers to an unknown node",
                link.from,
                link.to
            );
            ensure!(
                link.from != link.to,
                "Links must connect two different nodes (got {})",
                link.from
            );
            ensure!(
                link.efficiency > 0.0 && link.efficiency <= 1.0,
                "Efficiency of link {} -> {} must be in the range (0, 1]",
                link.from,
                link.to
            );

            let key = (link.from.clone(), link.to.clone());
            ensure!(
                link_map.insert(key, link.clone()).is_none(),
                "Duplicate link {} -> {}",
                link.from,
                link.to
            );
        }

        let mut arcs = IndexSet::new();
        for (from, to) in link_map.keys() {
            ensure!(
                link_map.contains_key(&(to.clone(), from.clone())),
                "Link {from} -> {to} has no link in the reverse direction"
            );
            if !arcs.contains(&(to.clone(), from.clone())) {
                arcs.insert((from.clone(), to.clone()));
            }
        }

        let line_types = link_map
            .values()
            .filter_map(|link| link.line_type.clone())
            .collect();

        let mut node_links: IndexMap<NodeID, NodeLinks> = nodes
            .keys()
            .map(|id| (id.clone(), NodeLinks::default()))
            .collect();
        for key @ (from, to) in link_map.keys() {
            node_links[from].outbound.push(key.clone());
            node_links[to].inbound.push(key.clone());
        }

        Ok(Self {
            nodes,
            links: link_map,
            arcs,
            line_types,
            node_links,
        })
    }

    /// The bidirectional arc which a directional link belongs to
    pub fn arc_of_link<'a>(&'a self, from: &NodeID, to: &NodeID) -> Option<&'a NodePair> {
        self.arcs
            .get(&(from.clone(), to.clone()))
            .or_else(|| self.arcs.get(&(to.clone(), from.clone())))
    }

    /// Iterate over the links which deliver power to `node`
    pub fn iter_inbound_links(&self, node: &NodeID) -> impl Iterator<Item = &DirectionalLink> {
        self.iter_node_links(node, |links| &links.inbound)
    }

    /// Iterate over the links which take power away from `node`
    pub fn iter_outbound_links(&self, node: &NodeID) -> impl Iterator<Item = &DirectionalLink> {
        self.iter_node_links(node, |links| &links.outbound)
    }

    fn iter_node_links<'a>(
        &'a self,
        node: &NodeID,
        select: fn(&NodeLinks) -> &Vec<NodePair>,
    ) -> impl Iterator<Item = &'a DirectionalLink> + use<'a> {
        self.node_links
            .get(node)
            .map(select)
            .into_iter()
            .flatten()
            .map(|key| &self.links[key])
    }

    /// The type of line an arc is made of, taken from the link in the arc's own orientation
    pub fn line_type_of_arc(&self, arc: &NodePair) -> Option<&LineTypeID> {
        self.links.get(arc)?.line_type.as_ref()
    }
}

/// Parameters describing electricity demand and hydro resources at each node
#[derive(Clone, Debug, PartialEq)]
pub struct NodeParameters {
    /// Cost of unserved electricity demand (node, period)
    pub value_of_lost_load: ParamTable<(NodeID, Period)>,
    /// Annual electricity demand which the load profile is scaled to (node, period)
    pub annual_demand: ParamTable<(NodeID, Period)>,
    /// Raw hourly electricity load (node, hour, scenario, period)
    pub load_profile: ParamTable<(NodeID, Hour, ScenarioID, Period)>,
    /// Exogenous change to the hourly electricity load (node, hour, scenario, period)
    pub load_change: ParamTable<(NodeID, Hour, ScenarioID, Period)>,
    /// Reservoir hydro energy available at each hour (node, period, season, hour, scenario)
    pub reservoir_inflow: ParamTable<(NodeID, Period, SeasonID, Hour, ScenarioID)>,
}

impl Default for NodeParameters {
    fn default() -> Self {
        Self {
            value_of_lost_load: ParamTable::new(22000.0),
            annual_demand: ParamTable::new(0.0),
            load_profile: ParamTable::new(0.0),
            load_change: ParamTable::new(0.0),
            reservoir_inflow: ParamTable::new(0.0),
        }
    }
}

/// Parameters describing transmission investment
#[derive(Clone, Debug, PartialEq)]
pub struct TransmissionParameters {
    /// Capital cost of a line type per unit length (line type, period)
    pub capital_cost: ParamTable<(LineTypeID, Period)>,
    /// Fixed O&M cost of a line type per unit length (line type, period)
    pub fixed_om_cost: ParamTable<(LineTypeID, Period)>,
    /// Line length (arc)
    pub length: ParamTable<NodePair>,
    /// Technical lifetime in years (arc)
    pub lifetime: ParamTable<NodePair>,
    /// Capacity present before any investment (from, to, period)
    pub initial_capacity: ParamTable<(NodeID, NodeID, Period)>,
    /// Capacity which can be built in one period (from, to, period)
    pub max_built_capacity: ParamTable<(NodeID, NodeID, Period)>,
    /// Raw limit on installed capacity (from, to, period)
    pub max_installed_capacity: ParamTable<(NodeID, NodeID, Period)>,
    /// Investment cost used for arcs without a line type (arc, period)
    pub investment_cost: ParamTable<(NodeID, NodeID, Period)>,
}

impl Default for TransmissionParameters {
    fn default() -> Self {
        Self {
            capital_cost: ParamTable::new(0.0),
            fixed_om_cost: ParamTable::new(0.0),
            length: ParamTable::new(0.0),
            lifetime: ParamTable::new(40.0),
            initial_capacity: ParamTable::new(0.0),
            max_built_capacity: ParamTable::new(20000.0),
            max_installed_capacity: ParamTable::new(0.0),
            investment_cost: ParamTable::new(3_000_000.0),
        }
    }
}
