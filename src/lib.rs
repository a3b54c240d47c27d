//! # Dendron
//!
//! Loading of neuronal morphology reconstructions and topological metrics
//! over them.
//!
//! Dendron reads three file formats into one canonical rooted-tree model and
//! computes per-node structural metrics such as branch order.
//!
//! ## Features
//!
//! - **Canonical tree model**: validated parent pointers, type-safe indices,
//!   per-tree region catalogs
//! - **Multiple file formats**: SWC, NEU, and a native serialized container
//! - **Forest splitting**: files holding several reconstructions become a
//!   [`Morphology::Forest`](tree::Morphology::Forest)
//! - **Branch order**: by top-down traversal or sparse matrix propagation
//!
//! ## Quick Start
//!
//! ```no_run
//! use dendron::prelude::*;
//!
//! // Load a morphology
//! let morphology = dendron::io::load("cell.swc").unwrap();
//!
//! for tree in morphology.trees() {
//!     let order = branch_order(tree, &node_types(tree)).unwrap();
//!     println!("{}: {} nodes, max order {:?}", tree.name(), tree.num_nodes(), order.iter().max());
//! }
//! ```
//!
//! ## Building Trees Programmatically
//!
//! ```
//! use dendron::prelude::*;
//! use nalgebra::Point3;
//!
//! let mut catalog = RegionCatalog::new();
//! let dend = catalog.get_or_insert("dend[]");
//!
//! // 0 -> 1 -> {2, 3}
//! let nodes = vec![
//!     Node::new(Point3::new(0.0, 0.0, 0.0), 2.0, dend),
//!     Node::new(Point3::new(0.0, 1.0, 0.0), 1.0, dend),
//!     Node::new(Point3::new(-1.0, 2.0, 0.0), 1.0, dend),
//!     Node::new(Point3::new(1.0, 2.0, 0.0), 1.0, dend),
//! ];
//! let parents = [None, Some(0), Some(1), Some(1)];
//!
//! let tree = build_from_parents("y", nodes, &parents, catalog).unwrap();
//! assert_eq!(tree.num_nodes(), 4);
//! assert_eq!(branch_order(&tree, &node_types(&tree)).unwrap(), vec![0, 0, 1, 1]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod load;
pub mod tree;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use dendron::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::{branch_order, branch_order_sparse, node_types, NodeType};
    pub use crate::error::{MorphError, Result};
    pub use crate::load::{LoadOptions, LoadOutcome, Loader, TreeRegistry, TreeStore};
    pub use crate::tree::{
        build_from_parents, Morphology, MorphologyTree, Node, NodeId, RegionCatalog, RegionId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;
