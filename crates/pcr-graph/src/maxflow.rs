// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Boykov-Kolmogorov augmenting-path max-flow on the edge arena.
//!
//! Two search trees are grown from the terminals; whenever they touch, the
//! connecting path is augmented and the nodes cut off from their terminal
//! are re-adopted. Terminal arcs are folded into a signed per-node residual
//! (`tr_cap` > 0: residual from the source, < 0: residual to the sink).

use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Tree {
    Source,
    Sink,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Parent {
    None,
    /// Attached directly to the terminal of its tree.
    Terminal,
    /// Detached during augmentation, waiting for adoption.
    Orphan,
    /// Edge from this node towards its tree parent.
    Arc(usize),
}

#[derive(Clone, Debug)]
pub(crate) struct Node {
    pub first: Option<usize>,
    pub tr_cap: i64,
    pub tree: Option<Tree>,
    pub parent: Parent,
    pub active: bool,
}

impl Node {
    pub fn new() -> Self {
        Self {
            first: None,
            tr_cap: 0,
            tree: None,
            parent: Parent::None,
            active: false,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Edge {
    pub tail: usize,
    pub head: usize,
    pub next: Option<usize>,
    pub rev: usize,
    pub cap: i64,
}

fn push_active(nodes: &mut [Node], active: &mut VecDeque<usize>, index: usize) {
    if !nodes[index].active {
        nodes[index].active = true;
        active.push_back(index);
    }
}

fn pop_active(nodes: &mut [Node], active: &mut VecDeque<usize>) -> Option<usize> {
    while let Some(index) = active.pop_front() {
        nodes[index].active = false;
        if nodes[index].tree.is_some() {
            return Some(index);
        }
    }
    None
}

/// True when `start`'s parent chain reaches a terminal without crossing a
/// detached node.
fn has_root(nodes: &[Node], edges: &[Edge], start: usize) -> bool {
    let mut current = start;
    loop {
        match nodes[current].parent {
            Parent::Terminal => return true,
            Parent::Arc(arc) => current = edges[arc].head,
            Parent::None | Parent::Orphan => return false,
        }
    }
}

/// Residual of the arc pointing from `q` towards a node of `tree`: into the
/// node for a source tree, out of it for a sink tree.
fn residual_towards(edges: &[Edge], edge_from_node: usize, tree: Tree) -> i64 {
    match tree {
        Tree::Source => edges[edges[edge_from_node].rev].cap,
        Tree::Sink => edges[edge_from_node].cap,
    }
}

fn augment(
    nodes: &mut [Node],
    edges: &mut [Edge],
    boundary: usize,
    orphans: &mut VecDeque<usize>,
) -> i64 {
    // Bottleneck over the boundary arc, both tree paths, and the terminals.
    let mut bottleneck = edges[boundary].cap;

    let mut current = edges[boundary].tail;
    loop {
        match nodes[current].parent {
            Parent::Terminal => {
                bottleneck = bottleneck.min(nodes[current].tr_cap);
                break;
            }
            Parent::Arc(arc) => {
                bottleneck = bottleneck.min(edges[edges[arc].rev].cap);
                current = edges[arc].head;
            }
            Parent::None | Parent::Orphan => break,
        }
    }

    let mut current = edges[boundary].head;
    loop {
        match nodes[current].parent {
            Parent::Terminal => {
                bottleneck = bottleneck.min(-nodes[current].tr_cap);
                break;
            }
            Parent::Arc(arc) => {
                bottleneck = bottleneck.min(edges[arc].cap);
                current = edges[arc].head;
            }
            Parent::None | Parent::Orphan => break,
        }
    }

    // Push the bottleneck and orphan every node whose parent arc saturates.
    let rev = edges[boundary].rev;
    edges[boundary].cap -= bottleneck;
    edges[rev].cap += bottleneck;

    let mut current = edges[boundary].tail;
    loop {
        match nodes[current].parent {
            Parent::Terminal => {
                nodes[current].tr_cap -= bottleneck;
                if nodes[current].tr_cap == 0 {
                    nodes[current].parent = Parent::Orphan;
                    orphans.push_back(current);
                }
                break;
            }
            Parent::Arc(arc) => {
                let into = edges[arc].rev;
                edges[into].cap -= bottleneck;
                edges[arc].cap += bottleneck;
                let next = edges[arc].head;
                if edges[into].cap == 0 {
                    nodes[current].parent = Parent::Orphan;
                    orphans.push_back(current);
                }
                current = next;
            }
            Parent::None | Parent::Orphan => break,
        }
    }

    let mut current = edges[boundary].head;
    loop {
        match nodes[current].parent {
            Parent::Terminal => {
                nodes[current].tr_cap += bottleneck;
                if nodes[current].tr_cap == 0 {
                    nodes[current].parent = Parent::Orphan;
                    orphans.push_back(current);
                }
                break;
            }
            Parent::Arc(arc) => {
                edges[arc].cap -= bottleneck;
                let out = edges[arc].rev;
                edges[out].cap += bottleneck;
                let next = edges[arc].head;
                if edges[arc].cap == 0 {
                    nodes[current].parent = Parent::Orphan;
                    orphans.push_back(current);
                }
                current = next;
            }
            Parent::None | Parent::Orphan => break,
        }
    }

    bottleneck
}

fn adopt(
    nodes: &mut [Node],
    edges: &[Edge],
    active: &mut VecDeque<usize>,
    orphans: &mut VecDeque<usize>,
) {
    while let Some(orphan) = orphans.pop_front() {
        let Some(tree) = nodes[orphan].tree else {
            continue;
        };

        // Look for a same-tree neighbour with residual towards the orphan
        // and a live connection to its terminal.
        let mut adopted = None;
        let mut edge_id = nodes[orphan].first;
        while let Some(arc) = edge_id {
            let neighbour = edges[arc].head;
            if nodes[neighbour].tree == Some(tree)
                && residual_towards(edges, arc, tree) > 0
                && has_root(nodes, edges, neighbour)
            {
                adopted = Some(arc);
                break;
            }
            edge_id = edges[arc].next;
        }

        if let Some(arc) = adopted {
            nodes[orphan].parent = Parent::Arc(arc);
            continue;
        }

        // No parent found: the orphan leaves its tree. Its children become
        // orphans and neighbours that can still reach it become active.
        let mut edge_id = nodes[orphan].first;
        while let Some(arc) = edge_id {
            let neighbour = edges[arc].head;
            if nodes[neighbour].tree == Some(tree) {
                if residual_towards(edges, arc, tree) > 0 {
                    push_active(nodes, active, neighbour);
                }
                if let Parent::Arc(parent_arc) = nodes[neighbour].parent
                    && edges[parent_arc].head == orphan
                {
                    nodes[neighbour].parent = Parent::Orphan;
                    orphans.push_back(neighbour);
                }
            }
            edge_id = edges[arc].next;
        }

        nodes[orphan].tree = None;
        nodes[orphan].parent = Parent::None;
    }
}

/// Runs BK to completion and returns the max-flow value. On return, nodes
/// reachable from the source keep `tree == Some(Tree::Source)`; everything
/// else (sink tree and free nodes) is on the sink side of the cut.
pub(crate) fn max_flow(nodes: &mut [Node], edges: &mut [Edge]) -> i64 {
    let mut flow = 0i64;
    let mut active = VecDeque::new();
    let mut orphans = VecDeque::new();

    for index in 0..nodes.len() {
        let node = &mut nodes[index];
        node.active = false;
        node.parent = Parent::None;
        node.tree = match node.tr_cap {
            cap if cap > 0 => Some(Tree::Source),
            cap if cap < 0 => Some(Tree::Sink),
            _ => None,
        };
        if node.tree.is_some() {
            node.parent = Parent::Terminal;
            push_active(nodes, &mut active, index);
        }
    }

    loop {
        // Growth: scan active nodes until the trees touch.
        let mut boundary = None;
        'growth: while let Some(p) = pop_active(nodes, &mut active) {
            let Some(p_tree) = nodes[p].tree else {
                continue;
            };

            let mut edge_id = nodes[p].first;
            while let Some(arc) = edge_id {
                let residual = match p_tree {
                    Tree::Source => edges[arc].cap,
                    Tree::Sink => edges[edges[arc].rev].cap,
                };
                if residual > 0 {
                    let q = edges[arc].head;
                    match nodes[q].tree {
                        None => {
                            nodes[q].tree = Some(p_tree);
                            nodes[q].parent = Parent::Arc(edges[arc].rev);
                            push_active(nodes, &mut active, q);
                        }
                        Some(q_tree) if q_tree != p_tree => {
                            boundary = Some(match p_tree {
                                Tree::Source => arc,
                                Tree::Sink => edges[arc].rev,
                            });
                            // p still has unscanned arcs.
                            push_active(nodes, &mut active, p);
                            break 'growth;
                        }
                        Some(_) => {}
                    }
                }
                edge_id = edges[arc].next;
            }
        }

        let Some(boundary) = boundary else {
            break;
        };

        flow += augment(nodes, edges, boundary, &mut orphans);
        adopt(nodes, edges, &mut active, &mut orphans);
    }

    flow
}
