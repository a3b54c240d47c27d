//! Morphology file I/O.
//!
//! This module provides functions for loading and saving morphologies in
//! various formats.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | Native container | `.mtr` | ✓ | ✓ | Tree, forest or forest of forests |
//! | SWC | `.swc` | ✓ | ✓ | Point cloud, one record per sample |
//! | NEU | `.neu` | ✓ | ✗ | Branch topology plus per-point geometry |
//!
//! # Usage
//!
//! ```no_run
//! use dendron::io::{load, save};
//!
//! // Load with automatic format detection
//! let morphology = load("cell.swc").unwrap();
//!
//! // Save with automatic format detection
//! save(&morphology, "cell.mtr").unwrap();
//! ```
//!
//! Format-specific functions are also available:
//!
//! ```no_run
//! use dendron::io::neu;
//!
//! let morphology = neu::load("cell.neu").unwrap();
//! ```

pub mod native;
pub mod neu;
pub mod swc;

use std::path::Path;

use tracing::debug;

use crate::error::{MorphError, Result};
use crate::tree::{Morphology, MorphologyTree};

/// Supported morphology file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Native serialized container.
    Native,
    /// SWC point-cloud format.
    Swc,
    /// NEU topology+geometry format.
    Neu,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "mtr" => Some(Format::Native),
            "swc" => Some(Format::Swc),
            "neu" => Some(Format::Neu),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }

    /// Whether this is one of the plain-text interchange formats.
    pub fn is_text(self) -> bool {
        matches!(self, Format::Swc | Format::Neu)
    }
}

/// The error for a path whose extension names no known format.
pub(crate) fn unsupported(path: &Path) -> MorphError {
    MorphError::UnsupportedFormat {
        extension: path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "(none)".to_string()),
    }
}

/// Parse a file in a known format.
///
/// Fails with [`MorphError::FileNotFound`] when the file does not exist.
pub fn parse<P: AsRef<Path>>(path: P, format: Format) -> Result<Morphology> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(MorphError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    debug!(path = %path.display(), ?format, "parsing morphology");
    match format {
        Format::Native => native::load(path),
        Format::Swc => swc::load(path),
        Format::Neu => neu::load(path),
    }
}

/// Load a morphology from a file with automatic format detection.
///
/// The format is determined by the file extension; an unknown extension is
/// reported before the file is touched.
///
/// # Example
///
/// ```no_run
/// use dendron::io::load;
///
/// let morphology = load("cell.neu").unwrap();
/// for tree in morphology.trees() {
///     println!("{}: {} nodes", tree.name(), tree.num_nodes());
/// }
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<Morphology> {
    let path = path.as_ref();
    let format = Format::from_path(path).ok_or_else(|| unsupported(path))?;
    parse(path, format)
}

/// Save a morphology to a file with automatic format detection.
///
/// # Example
///
/// ```no_run
/// use dendron::io::{load, save};
///
/// let morphology = load("cell.neu").unwrap();
/// save(&morphology, "cell.swc").unwrap();
/// ```
pub fn save<P: AsRef<Path>>(morphology: &Morphology, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = Format::from_path(path).ok_or_else(|| unsupported(path))?;

    match format {
        Format::Native => native::save(morphology, path),
        Format::Swc => swc::save(morphology, path),
        Format::Neu => Err(MorphError::SaveError {
            path: path.to_path_buf(),
            message: "NEU saving is not supported".to_string(),
        }),
    }
}

/// Name derived from a source path: the file stem.
pub(crate) fn source_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Wrap parsed trees: one tree keeps `name`, several become `name_1`, `name_2`, ...
pub(crate) fn assemble(mut trees: Vec<MorphologyTree>, name: &str) -> Morphology {
    if trees.len() == 1 {
        let mut tree = trees.remove(0);
        tree.set_name(name);
        return Morphology::Tree(tree);
    }

    Morphology::Forest(
        trees
            .into_iter()
            .enumerate()
            .map(|(i, mut tree)| {
                tree.set_name(format!("{}_{}", name, i + 1));
                Morphology::Tree(tree)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b/cell.SWC"), Some(Format::Swc));
        assert_eq!(Format::from_path("cell.neu"), Some(Format::Neu));
        assert_eq!(Format::from_path("cell.mtr"), Some(Format::Native));
        assert_eq!(Format::from_path("sample.xyz"), None);
        assert_eq!(Format::from_path("noext"), None);
        assert!(Format::Neu.is_text());
        assert!(!Format::Native.is_text());
    }

    #[test]
    fn test_unknown_extension_before_existence() {
        let result = load("definitely/missing/sample.xyz");
        assert!(matches!(
            result,
            Err(MorphError::UnsupportedFormat { ref extension }) if extension == "xyz"
        ));
    }

    #[test]
    fn test_unsupported_extension_text() {
        let ext = |p: &str| match unsupported(Path::new(p)) {
            MorphError::UnsupportedFormat { extension } => extension,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(ext("data/sample.XYZ"), "XYZ");
        assert_eq!(ext("data/noext"), "(none)");
    }

    #[cfg(unix)]
    #[test]
    fn test_unsupported_non_utf8_extension() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"cell.\xffz"));
        assert!(matches!(
            load(path),
            Err(MorphError::UnsupportedFormat { ref extension }) if extension == "\u{FFFD}z"
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = load("definitely/missing/cell.swc");
        assert!(matches!(result, Err(MorphError::FileNotFound { .. })));
    }

    #[test]
    fn test_load_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("neuron.swc");
        std::fs::write(&path, "1 1 0 0 0 0.5 -1\n2 1 0 0 1 0.5 1\n").unwrap();

        let morphology = load(&path).unwrap();
        assert_eq!(morphology.as_tree().unwrap().name(), "neuron");
    }

    #[test]
    fn test_convert_neu_to_swc_and_native() {
        let dir = tempfile::tempdir().unwrap();
        let neu_path = dir.path().join("cell.neu");
        std::fs::write(
            &neu_path,
            "NEU\nTOPOLOGY\nsoma 0 - 0 2\ndend[0] 0 soma 1 2\nGEOMETRY\n0 0 0 4\n0 1 0 4\n0 2 0 1\n0 3 0 1\n",
        )
        .unwrap();
        let morphology = load(&neu_path).unwrap();

        let swc_path = dir.path().join("cell.swc");
        save(&morphology, &swc_path).unwrap();
        let reread = load(&swc_path).unwrap();
        let (a, b) = (morphology.as_tree().unwrap(), reread.as_tree().unwrap());
        assert_eq!(a.parents(), b.parents());
        assert_eq!(a.num_nodes(), b.num_nodes());
        for v in a.node_ids() {
            assert_eq!(a.position(v), b.position(v));
            assert_eq!(a.diameter(v), b.diameter(v));
        }

        let mtr_path = dir.path().join("cell.mtr");
        save(&morphology, &mtr_path).unwrap();
        assert_eq!(load(&mtr_path).unwrap(), morphology);

        assert!(matches!(
            save(&morphology, dir.path().join("cell.neu")),
            Err(MorphError::SaveError { .. })
        ));
    }

    #[test]
    fn test_assemble_naming() {
        let forest = swc::parse_str("1 1 0 0 0 1 -1\n2 1 0 0 1 1 1\n3 1 0 0 0 1 -1\n4 1 0 0 1 1 3\n", "n")
            .unwrap();
        let names: Vec<String> = forest.trees().iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["n_1", "n_2"]);
    }
}
