// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Submodular binary energies over chain topologies, reduced to s-t flow
//! networks and solved with the Boykov-Kolmogorov min-cut algorithm.

pub mod energy;
mod maxflow;

pub use energy::EnergyGraph;
