//! Morphology analysis algorithms.
//!
//! - **Sparse**: CSR matrices for adjacency-based propagation
//! - **Topology**: node classification and branch order

pub mod sparse;
pub mod topology;

pub use topology::{branch_order, branch_order_sparse, node_types, NodeType};
