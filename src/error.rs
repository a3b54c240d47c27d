//! Error types for dendron.
//!
//! This module defines all error types used throughout the library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MorphError`].
pub type Result<T> = std::result::Result<T, MorphError>;

/// Errors that can occur while loading or analysing morphologies.
#[derive(Error, Debug)]
pub enum MorphError {
    /// The referenced source file does not exist.
    #[error("file not found: {path}")]
    FileNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// A branch in a topology section violates the format's attachment rules.
    #[error("malformed topology at branch '{branch}': {details}")]
    MalformedTopology {
        /// Label of the offending branch.
        branch: String,
        /// What is wrong with it.
        details: String,
    },

    /// Node ids of a segment do not run 1..N after local re-indexing.
    #[error("segment {segment}: row {row} has id {found}, expected {expected}")]
    IndexingError {
        /// Zero-based segment index.
        segment: usize,
        /// Zero-based row within the segment.
        row: usize,
        /// Expected local id.
        expected: i64,
        /// Local id found in the file.
        found: i64,
    },

    /// The input contains no root record.
    #[error("no root record found")]
    MissingRoot,

    /// A node references a parent that is out of range or itself.
    #[error("node {node} has invalid parent {parent}")]
    InvalidParent {
        /// Zero-based node index.
        node: usize,
        /// The offending parent reference.
        parent: i64,
    },

    /// Parent pointers contain a cycle.
    #[error("node {node} does not reach the root (cyclic parent pointers)")]
    CyclicTopology {
        /// A node on or below the cycle.
        node: usize,
    },

    /// A node references a region missing from the catalog.
    #[error("node {node} references unknown region {region}")]
    UnknownRegion {
        /// Zero-based node index.
        node: usize,
        /// The region index.
        region: usize,
    },

    /// A tree must have at least one node.
    #[error("tree has no nodes")]
    EmptyTree,

    /// Per-node sequences have different lengths.
    #[error("attribute length mismatch: {nodes} nodes but {parents} parents")]
    AttributeMismatch {
        /// Number of node records.
        nodes: usize,
        /// Number of parent entries.
        parents: usize,
    },

    /// A forest is nested deeper than allowed.
    #[error("morphology nested {depth} levels deep (max {max})")]
    NestingTooDeep {
        /// Actual depth.
        depth: usize,
        /// Allowed depth.
        max: usize,
    },

    /// A text record could not be parsed.
    #[error("line {line}: {message}")]
    Parse {
        /// One-based line number.
        line: usize,
        /// Error message.
        message: String,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading a morphology from file.
    #[error("failed to load morphology from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving a morphology to file.
    #[error("failed to save morphology to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MorphError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MorphError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create a parse error for a one-based line.
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        MorphError::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a malformed topology error for a branch.
    pub(crate) fn malformed(branch: &str, details: impl Into<String>) -> Self {
        MorphError::MalformedTopology {
            branch: branch.to_string(),
            details: details.into(),
        }
    }
}
