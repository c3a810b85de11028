// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::maxflow::{self, Edge, Node, Tree};
use pcr_core::PcrError;
use std::io::{self, Write};

/// Binary energy over a chain of sites, reduced to an s-t flow network.
///
/// A site on the **source side** of the cut keeps its current label (binary
/// value 0); a site on the sink side switches to the trial label (value 1).
/// The node set and the paired forward/reverse edges are allocated once and
/// recycled between expansion moves; only capacities and colors are reset.
///
/// Normalising negative residual legs shifts the objective by a constant,
/// which is accumulated so that [`EnergyGraph::minimize`] returns the exact
/// energy of the decoded cut.
#[derive(Debug)]
pub struct EnergyGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    /// Accumulated construction capacities, kept for the graphviz dump
    /// (`edges[i].cap` holds residuals after a cut).
    initial_caps: Vec<i64>,
    constant: i64,
    solved: bool,
}

impl EnergyGraph {
    /// Builds the recycled chain structure: one node per site and a
    /// forward/reverse edge pair between each adjacent pair.
    pub fn chain(n_sites: usize) -> Self {
        let mut nodes = vec![Node::new(); n_sites];
        let mut edges = Vec::with_capacity(2 * n_sites.saturating_sub(1));

        for i in 1..n_sites {
            let forward = edges.len();
            let backward = forward + 1;
            edges.push(Edge {
                tail: i - 1,
                head: i,
                next: nodes[i - 1].first,
                rev: backward,
                cap: 0,
            });
            nodes[i - 1].first = Some(forward);
            edges.push(Edge {
                tail: i,
                head: i - 1,
                next: nodes[i].first,
                rev: forward,
                cap: 0,
            });
            nodes[i].first = Some(backward);
        }

        let initial_caps = vec![0; edges.len()];
        Self {
            nodes,
            edges,
            initial_caps,
            constant: 0,
            solved: false,
        }
    }

    pub fn n_sites(&self) -> usize {
        self.nodes.len()
    }

    /// Zeroes all capacities, colors, and the accumulated constant; the
    /// arena itself is kept.
    pub fn recycle(&mut self) {
        for node in &mut self.nodes {
            node.tr_cap = 0;
            node.tree = None;
            node.parent = maxflow::Parent::None;
            node.active = false;
        }
        for edge in &mut self.edges {
            edge.cap = 0;
        }
        self.initial_caps.fill(0);
        self.constant = 0;
        self.solved = false;
    }

    /// Unary term on `site`: `e0` is paid if the site keeps its label,
    /// `e1` if it switches.
    pub fn add_unary(&mut self, site: usize, e0: i64, e1: i64) -> Result<(), PcrError> {
        self.check_site(site)?;
        self.add_terminal_caps(site, e1, e0)
    }

    /// Pairwise term on the chain-adjacent sites `u` and `v` with energies
    /// `E(0,0) = e00`, `E(0,1) = e01`, `E(1,0) = e10`, `E(1,1) = e11`,
    /// reduced via
    ///
    /// ```text
    /// e00 e01   e00 e00   0  b         b = e01 - e00
    /// e10 e11 = e11 e11 + c  0         c = e10 - e11
    /// ```
    ///
    /// where the first summand is a unary term on `u` and the residual goes
    /// into interior edges (after normalising a negative `b` or `c` through
    /// the terminals).
    ///
    /// Requires `b + c >= 0` (submodular after reduction); violations are
    /// reported as [`PcrError::NonSubmodular`] so the caller can heal,
    /// skip, or fail according to its policy.
    pub fn add_pairwise(
        &mut self,
        u: usize,
        v: usize,
        e00: i64,
        e01: i64,
        e10: i64,
        e11: i64,
    ) -> Result<(), PcrError> {
        self.check_site(u)?;
        self.check_site(v)?;
        if u.abs_diff(v) != 1 {
            return Err(PcrError::invalid_input(format!(
                "pairwise terms are restricted to chain-adjacent sites; got ({u}, {v})"
            )));
        }

        let b = checked_sub(e01, e00)?;
        let c = checked_sub(e10, e11)?;
        let b_plus_c = checked_add(b, c)?;
        if b_plus_c < 0 {
            return Err(PcrError::non_submodular(b, c));
        }

        // Row term [[e00, e00], [e11, e11]] depends on u alone.
        self.add_terminal_caps(u, e11, e00)?;

        if b < 0 {
            self.add_terminal_caps(u, 0, b)?;
            self.add_terminal_caps(v, 0, -b)?;
            self.add_edge_cap(v, u, b_plus_c)?;
        } else if c < 0 {
            self.add_terminal_caps(u, 0, -c)?;
            self.add_terminal_caps(v, 0, c)?;
            self.add_edge_cap(u, v, b_plus_c)?;
        } else {
            self.add_edge_cap(u, v, b)?;
            self.add_edge_cap(v, u, c)?;
        }

        Ok(())
    }

    /// Solves the current network and returns the move energy: max-flow
    /// plus the accumulated construction constant.
    pub fn minimize(&mut self) -> i64 {
        let flow = maxflow::max_flow(&mut self.nodes, &mut self.edges);
        self.solved = true;
        self.constant + flow
    }

    /// Cut side of a site after [`EnergyGraph::minimize`]: `true` means the
    /// site is reachable from the source and keeps its current label. Free
    /// nodes land on the sink side.
    pub fn is_source_side(&self, site: usize) -> Result<bool, PcrError> {
        self.check_site(site)?;
        if !self.solved {
            return Err(PcrError::invalid_input(
                "cut sides are only defined after minimize()",
            ));
        }
        Ok(self.nodes[site].tree == Some(Tree::Source))
    }

    /// Dumps the network in graphviz dot notation: interior nodes (filled
    /// when on the source side of a solved cut), terminal legs from the
    /// signed terminal residual, and interior edges labelled
    /// `residual/constructed`.
    pub fn write_graphviz<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "digraph energy {{")?;
        writeln!(writer, "  s [shape=box];")?;
        writeln!(writer, "  t [shape=box];")?;

        for (index, node) in self.nodes.iter().enumerate() {
            let filled = self.solved && node.tree == Some(Tree::Source);
            if filled {
                writeln!(
                    writer,
                    "  v{index} [label=\"{index}\", color=black, fontcolor=white, style=filled];"
                )?;
            } else {
                writeln!(writer, "  v{index} [label=\"{index}\"];")?;
            }

            if node.tr_cap > 0 {
                writeln!(writer, "  s -> v{index} [label=\"{}\"];", node.tr_cap)?;
            } else if node.tr_cap < 0 {
                writeln!(writer, "  v{index} -> t [label=\"{}\"];", -node.tr_cap)?;
            }
        }

        for (index, edge) in self.edges.iter().enumerate() {
            let constructed = self.initial_caps[index];
            if edge.cap == 0 && constructed == 0 {
                continue;
            }
            writeln!(
                writer,
                "  v{} -> v{} [label=\"c:{}/{}\"];",
                edge.tail, edge.head, edge.cap, constructed
            )?;
        }

        writeln!(writer, "}}")
    }

    fn check_site(&self, site: usize) -> Result<(), PcrError> {
        if site >= self.nodes.len() {
            return Err(PcrError::invalid_input(format!(
                "site index {site} is out of range for a graph with {} sites",
                self.nodes.len()
            )));
        }
        Ok(())
    }

    /// Terminal legs `s -> site` (`cap_source`, paid on the sink side) and
    /// `site -> t` (`cap_sink`, paid on the source side), folded into the
    /// signed terminal residual. The incoming legs are merged with the
    /// residual already on the node before the always-paid part moves into
    /// the constant, so stacked legs of opposite sign cancel exactly.
    fn add_terminal_caps(
        &mut self,
        site: usize,
        cap_source: i64,
        cap_sink: i64,
    ) -> Result<(), PcrError> {
        let mut cap_source = cap_source;
        let mut cap_sink = cap_sink;

        let residual = self.nodes[site].tr_cap;
        if residual > 0 {
            cap_source = checked_add(cap_source, residual)?;
        } else {
            cap_sink = checked_sub(cap_sink, residual)?;
        }

        self.constant = checked_add(self.constant, cap_source.min(cap_sink))?;
        self.nodes[site].tr_cap = checked_sub(cap_source, cap_sink)?;
        Ok(())
    }

    fn add_edge_cap(&mut self, from: usize, to: usize, cap: i64) -> Result<(), PcrError> {
        debug_assert!(cap >= 0);

        let mut edge_id = self.nodes[from].first;
        while let Some(index) = edge_id {
            if self.edges[index].head == to {
                self.edges[index].cap = checked_add(self.edges[index].cap, cap)?;
                self.initial_caps[index] = checked_add(self.initial_caps[index], cap)?;
                return Ok(());
            }
            edge_id = self.edges[index].next;
        }

        Err(PcrError::invalid_input(format!(
            "no recycled edge between sites {from} and {to}"
        )))
    }
}

fn checked_add(a: i64, b: i64) -> Result<i64, PcrError> {
    a.checked_add(b)
        .ok_or_else(|| PcrError::resource_limit("energy capacity overflow"))
}

fn checked_sub(a: i64, b: i64) -> Result<i64, PcrError> {
    a.checked_sub(b)
        .ok_or_else(|| PcrError::resource_limit("energy capacity overflow"))
}

#[cfg(test)]
mod tests {
    use super::EnergyGraph;

    #[test]
    fn unary_only_picks_the_cheaper_side_per_site() {
        let mut graph = EnergyGraph::chain(2);
        graph.add_unary(0, 5, 3).expect("site exists");
        graph.add_unary(1, 2, 9).expect("site exists");

        assert_eq!(graph.minimize(), 5);
        // Site 0 switches (pays 3), site 1 keeps (pays 2).
        assert!(!graph.is_source_side(0).expect("solved"));
        assert!(graph.is_source_side(1).expect("solved"));
    }

    #[test]
    fn pairwise_coupling_overrides_a_weak_unary_preference() {
        // Site 0 strongly prefers switching, site 1 weakly prefers keeping,
        // and disagreeing costs 10: both switch.
        let mut graph = EnergyGraph::chain(2);
        graph.add_unary(0, 20, 0).expect("site exists");
        graph.add_unary(1, 0, 1).expect("site exists");
        graph.add_pairwise(0, 1, 0, 10, 10, 0).expect("term is submodular");

        assert_eq!(graph.minimize(), 1);
        assert!(!graph.is_source_side(0).expect("solved"));
        assert!(!graph.is_source_side(1).expect("solved"));
    }

    #[test]
    fn minimize_equals_the_energy_of_the_decoded_cut() {
        let unaries = [(4i64, 7i64), (6, 1), (3, 3)];
        // The second term has e01 < e00, driving the negative-leg
        // normalisation and its constant accounting.
        let pairwise = [(0i64, 5i64, 2i64, 1i64), (5, 2, 4, 0)];

        let mut graph = EnergyGraph::chain(3);
        for (site, (e0, e1)) in unaries.iter().enumerate() {
            graph.add_unary(site, *e0, *e1).expect("site exists");
        }
        for (i, (e00, e01, e10, e11)) in pairwise.iter().enumerate() {
            graph
                .add_pairwise(i, i + 1, *e00, *e01, *e10, *e11)
                .expect("term is submodular");
        }

        let energy = graph.minimize();

        let assignment: Vec<bool> = (0..3)
            .map(|site| !graph.is_source_side(site).expect("solved"))
            .collect();
        let mut replayed = 0i64;
        for (site, (e0, e1)) in unaries.iter().enumerate() {
            replayed += if assignment[site] { *e1 } else { *e0 };
        }
        for (i, (e00, e01, e10, e11)) in pairwise.iter().enumerate() {
            replayed += match (assignment[i], assignment[i + 1]) {
                (false, false) => *e00,
                (false, true) => *e01,
                (true, false) => *e10,
                (true, true) => *e11,
            };
        }

        assert_eq!(energy, replayed);
    }

    #[test]
    fn non_submodular_terms_are_reported() {
        let mut graph = EnergyGraph::chain(2);
        let err = graph
            .add_pairwise(0, 1, 0, 0, 0, 5)
            .expect_err("e00 + e11 > e01 + e10 must be rejected");
        assert_eq!(err.code(), "non_submodular");
    }

    #[test]
    fn non_adjacent_pairs_are_rejected() {
        let mut graph = EnergyGraph::chain(3);
        assert!(graph.add_pairwise(0, 2, 0, 1, 1, 0).is_err());
    }

    #[test]
    fn recycling_clears_the_previous_move() {
        let mut graph = EnergyGraph::chain(2);
        graph.add_unary(0, 10, 0).expect("site exists");
        graph.add_unary(1, 0, 10).expect("site exists");
        graph.add_pairwise(0, 1, 0, 3, 3, 0).expect("term is submodular");
        let first = graph.minimize();

        graph.recycle();
        assert_eq!(graph.minimize(), 0);

        graph.add_unary(0, 10, 0).expect("site exists");
        graph.add_unary(1, 0, 10).expect("site exists");
        graph.add_pairwise(0, 1, 0, 3, 3, 0).expect("term is submodular");
        assert_eq!(graph.minimize(), first);
    }

    #[test]
    fn cut_sides_require_a_solved_graph() {
        let graph = EnergyGraph::chain(1);
        assert!(graph.is_source_side(0).is_err());
    }

    #[test]
    fn graphviz_dump_lists_terminal_legs_and_interior_edges() {
        let mut graph = EnergyGraph::chain(2);
        graph.add_unary(0, 0, 4).expect("site exists");
        graph.add_unary(1, 4, 0).expect("site exists");
        graph.add_pairwise(0, 1, 0, 2, 2, 0).expect("term is submodular");

        let mut dump = Vec::new();
        graph.write_graphviz(&mut dump).expect("write to memory");
        let text = String::from_utf8(dump).expect("dump is utf-8");

        assert!(text.contains("digraph energy"));
        assert!(text.contains("s -> v0"));
        assert!(text.contains("v1 -> t"));
        assert!(text.contains("v0 -> v1"));
    }
}
