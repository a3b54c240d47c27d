//! Core morphology data structures.
//!
//! This module provides the canonical rooted-tree representation of a
//! neuronal reconstruction and its supporting types.
//!
//! # Overview
//!
//! The primary type is [`MorphologyTree`]: a connected tree of sample points
//! where node 0 is the root and every other node stores exactly one parent.
//! A source holding several disjoint trees yields a [`Morphology::Forest`].
//!
//! # Index Types
//!
//! - [`NodeId`] - Identifies a node (zero-based, root is `NodeId::ROOT`)
//! - [`RegionId`] - Identifies an entry in a tree's [`RegionCatalog`]
//!
//! # Construction
//!
//! Trees are built by the file readers in [`crate::io`] or directly from
//! parent lists:
//!
//! ```
//! use dendron::tree::{build_from_parents, Node, RegionCatalog};
//! use nalgebra::Point3;
//!
//! let mut catalog = RegionCatalog::new();
//! let r = catalog.get_or_insert("dend[]");
//! let nodes = vec![
//!     Node::new(Point3::new(0.0, 0.0, 0.0), 1.0, r),
//!     Node::new(Point3::new(1.0, 0.0, 0.0), 1.0, r),
//!     Node::new(Point3::new(2.0, 0.0, 0.0), 1.0, r),
//! ];
//!
//! let tree = build_from_parents("chain", nodes, &[None, Some(0), Some(1)], catalog).unwrap();
//! assert_eq!(tree.num_edges(), 2);
//! ```

mod builder;
mod index;
mod morphology;
mod region;

pub use builder::build_from_parents;
pub use index::{NodeId, RegionId};
pub use morphology::{Morphology, MorphologyTree, Node, MAX_NESTING};
pub use region::{fold_indexed_label, RegionCatalog};
