//! Switch-state resolution.
//!
//! Buses are first collapsed into electrical nodes across bolted connections,
//! then nodes are grouped into islands across every active branch. Both passes
//! use the same union-find structure.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::elements::*;
use super::error::SolveError;
use super::network::Network;

/// A union-find (disjoint set) structure for merging nodes.
#[derive(Debug, Clone)]
pub struct NodeMerge {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl NodeMerge {
    pub fn new(n: usize) -> Self {
        NodeMerge {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    /// Finds the root of the node, with path compression.
    pub fn find(&mut self, node: usize) -> usize {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = node;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// Unites two nodes by their roots. Returns false if they were already joined.
    pub fn union(&mut self, a: usize, b: usize) -> bool {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }

    /// Dense relabelling of the sets, numbered in order of their smallest member.
    pub fn mapping(&mut self) -> Vec<usize> {
        let mut root_to_new = BTreeMap::new();
        (0..self.parent.len())
            .map(|node| {
                let root = self.find(node);
                let next = root_to_new.len();
                *root_to_new.entry(root).or_insert(next)
            })
            .collect()
    }
}

/// How an island can be solved.
#[derive(Debug, Clone, PartialEq)]
pub enum IslandSupply {
    /// Exactly one source node; that node is the slack reference.
    Energized { slack: SourceId, slack_node: usize },
    /// No in-service source reaches the island.
    DeEnergized,
    /// The island is ill-posed and will not be solved.
    Faulted(SolveError),
}

/// A maximal set of buses connected by active branches and closed switches.
#[derive(Debug, Clone, PartialEq)]
pub struct Island {
    pub index: usize,
    /// Sorted by index; the first is the island's lowest bus.
    pub buses: Vec<BusId>,
    /// Electrical nodes of the island, sorted.
    pub nodes: Vec<usize>,
    /// Active branches with both ends in this island.
    pub branches: Vec<BranchId>,
    /// Closed bus-bus switches with contact impedance.
    pub couplers: Vec<SwitchId>,
    pub supply: IslandSupply,
}

impl Island {
    pub fn is_energized(&self) -> bool {
        matches!(self.supply, IslandSupply::Energized { .. })
    }
}

/// Result of resolving a network's switch states.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    /// Electrical node of each bus, `None` for out-of-service buses.
    pub bus_node: Vec<Option<usize>>,
    /// Buses merged into each node.
    pub node_buses: Vec<Vec<BusId>>,
    /// Island of each node.
    pub node_island: Vec<usize>,
    pub islands: Vec<Island>,
    /// In-service lines absorbed into a node.
    pub merged_branches: Vec<BranchId>,
}

impl Topology {
    pub fn island_of(&self, bus: BusId) -> Option<&Island> {
        let node = self.bus_node[bus.0]?;
        self.islands.get(self.node_island[node])
    }

    pub fn node_count(&self) -> usize {
        self.node_buses.len()
    }
}

fn branch_is_active(net: &Network, id: BranchId, branch: &Branch) -> bool {
    branch.in_service
        && net.bus(branch.from).in_service
        && net.bus(branch.to).in_service
        && !net.is_branch_isolated(id)
}

/// Partition the network into electrical nodes and islands for its current
/// switch states.
///
/// Lines whose series impedance is at most `zero_impedance_threshold_pu` are
/// merged away rather than handed to the admittance builder.
pub fn resolve(net: &Network, zero_impedance_threshold_pu: f64) -> Topology {
    let nbus = net.bus_count();
    let mut merge = NodeMerge::new(nbus);
    let mut merged_branches = Vec::new();

    for (_, sw) in net.switches() {
        if let Some((a, b)) = sw.bus_pair() {
            if sw.is_ideal_coupler() && net.bus(a).in_service && net.bus(b).in_service {
                merge.union(a.0, b.0);
            }
        }
    }
    for (id, br) in net.branches() {
        if br.is_transformer() || !branch_is_active(net, id, br) {
            continue;
        }
        let base = net.bus(br.from).base(net.sn_mva);
        if br.is_bolted(&base, zero_impedance_threshold_pu) {
            merge.union(br.from.0, br.to.0);
            merged_branches.push(id);
        }
    }

    // node numbering over in-service buses only
    let raw = merge.mapping();
    let mut bus_node = vec![None; nbus];
    let mut node_buses: Vec<Vec<BusId>> = Vec::new();
    let mut renumber = BTreeMap::new();
    for (bus_id, bus) in net.buses() {
        if !bus.in_service {
            continue;
        }
        let next = renumber.len();
        let node = *renumber.entry(raw[bus_id.0]).or_insert(next);
        if node == node_buses.len() {
            node_buses.push(Vec::new());
        }
        node_buses[node].push(bus_id);
        bus_node[bus_id.0] = Some(node);
    }
    let nnode = node_buses.len();

    let mut grouping = NodeMerge::new(nnode);
    let mut active = Vec::new();
    for (id, br) in net.branches() {
        if !branch_is_active(net, id, br) || merged_branches.contains(&id) {
            continue;
        }
        if let (Some(a), Some(b)) = (bus_node[br.from.0], bus_node[br.to.0]) {
            grouping.union(a, b);
            active.push((id, a));
        }
    }
    let mut couplers = Vec::new();
    for (id, sw) in net.switches() {
        if let Some((a, b)) = sw.bus_pair() {
            if !sw.closed || sw.is_ideal_coupler() {
                continue;
            }
            if let (Some(na), Some(nb)) = (bus_node[a.0], bus_node[b.0]) {
                grouping.union(na, nb);
                couplers.push((id, na));
            }
        }
    }

    // nodes are numbered by lowest bus, so islands come out ordered the same way
    let node_island = grouping.mapping();
    let nisland = node_island.iter().max().map_or(0, |m| m + 1);
    let mut islands: Vec<Island> = (0..nisland)
        .map(|index| Island {
            index,
            buses: Vec::new(),
            nodes: Vec::new(),
            branches: Vec::new(),
            couplers: Vec::new(),
            supply: IslandSupply::DeEnergized,
        })
        .collect();
    for (node, buses) in node_buses.iter().enumerate() {
        let island = &mut islands[node_island[node]];
        island.nodes.push(node);
        island.buses.extend(buses.iter().copied());
    }
    for island in islands.iter_mut() {
        island.buses.sort();
    }
    for (id, node) in active {
        islands[node_island[node]].branches.push(id);
    }
    for (id, node) in couplers {
        islands[node_island[node]].couplers.push(id);
    }

    let mut island_sources: Vec<Vec<(usize, SourceId)>> = vec![Vec::new(); nisland];
    for (id, src) in net.sources() {
        if !src.in_service {
            continue;
        }
        if let Some(node) = bus_node[src.bus.0] {
            island_sources[node_island[node]].push((node, id));
        }
    }

    for (island, sources) in islands.iter_mut().zip(island_sources) {
        island.supply = match sources.as_slice() {
            [] => {
                warn!(island = island.index, buses = island.buses.len(), "island has no source");
                IslandSupply::DeEnergized
            }
            &[(slack_node, slack)] => IslandSupply::Energized { slack, slack_node },
            many => {
                warn!(island = island.index, sources = many.len(), "island has several sources");
                IslandSupply::Faulted(SolveError::MultipleSources { count: many.len() })
            }
        };
        if island.is_energized() {
            let bolted_transformer = island.branches.iter().find(|&&id| {
                let br = net.branch(id);
                br.is_transformer()
                    && br.is_bolted(&net.bus(br.from).base(net.sn_mva), zero_impedance_threshold_pu)
            });
            if let Some(&id) = bolted_transformer {
                island.supply = IslandSupply::Faulted(SolveError::SingularSystem {
                    branch: Some(net.branch(id).name.clone()),
                    reason: "transformer with zero short-circuit impedance".into(),
                });
            }
        }
    }

    debug!(
        buses = nbus,
        nodes = nnode,
        islands = islands.len(),
        merged = merged_branches.len(),
        "topology resolved"
    );

    Topology {
        bus_node,
        node_buses,
        node_island,
        islands,
        merged_branches,
    }
}
