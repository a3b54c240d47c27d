//! Index types for morphology elements.
//!
//! Nodes and regions are identified by type-safe, zero-based index wrappers so
//! that a region index can never be used where a node index is expected.
//! File formats number nodes from one; the conversion happens in [`crate::io`].

use std::fmt::{self, Debug};

use serde::{Deserialize, Serialize};

/// A type-safe node index. `NodeId::new(0)` is always the root.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct NodeId(u32);

/// A type-safe index into a [`RegionCatalog`](super::RegionCatalog).
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct RegionId(u32);

macro_rules! impl_index_type {
    ($name:ident, $display:literal) => {
        impl $name {
            /// Create a new index from a raw value.
            ///
            /// # Panics
            /// Panics in debug builds if the value does not fit in 32 bits.
            #[inline]
            pub fn new(index: usize) -> Self {
                debug_assert!(index <= u32::MAX as usize, "index {} too large", index);
                Self(index as u32)
            }

            /// Get the raw index value.
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", $display, self.0)
            }
        }

        impl From<usize> for $name {
            fn from(v: usize) -> Self {
                Self::new(v)
            }
        }
    };
}

impl_index_type!(NodeId, "N");
impl_index_type!(RegionId, "R");

impl NodeId {
    /// The root node of every tree.
    pub const ROOT: NodeId = NodeId(0);

    /// Whether this is the root node.
    #[inline]
    pub fn is_root(self) -> bool {
        self.0 == 0
    }
}
