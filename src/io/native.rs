//! Native container format (`.mtr`).
//!
//! A serialized [`Morphology`]: a tree, a forest, or a forest of forests. The
//! stored value is not repaired or normalised. Every tree is rebuilt through
//! the validating builder and the nesting depth is checked on load.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{MorphError, Result};
use crate::tree::{Morphology, MAX_NESTING};

/// Load a morphology from a native container file.
///
/// # Example
///
/// ```no_run
/// use dendron::io::native;
///
/// let morphology = native::load("cells.mtr").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<Morphology> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let morphology: Morphology =
        serde_json::from_reader(reader).map_err(|e| MorphError::LoadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    morphology.validate_depth(MAX_NESTING)?;

    Ok(morphology)
}

/// Save a morphology to a native container file.
pub fn save<P: AsRef<Path>>(morphology: &Morphology, path: P) -> Result<()> {
    let path = path.as_ref();
    morphology.validate_depth(MAX_NESTING)?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, morphology).map_err(|e| MorphError::SaveError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    writer.flush()?;

    Ok(())
}
