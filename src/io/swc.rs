//! SWC point-cloud format support.
//!
//! One record per line: `id region x y z radius parent`. Fields are separated
//! by whitespace and/or commas, `#` starts a comment line, and a parent of
//! `-1` marks a root. A file with several roots holds several trees, one per
//! run of rows starting at a root.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use tracing::debug;

use super::{assemble, source_name};
use crate::error::{MorphError, Result};
use crate::tree::{build_from_parents, Morphology, MorphologyTree, Node, NodeId, RegionCatalog};

/// Parent id marking a root record.
pub const ROOT_SENTINEL: i64 = -1;

/// One parsed SWC line.
#[derive(Debug, Clone)]
struct Record {
    id: i64,
    region: i64,
    position: Point3<f64>,
    radius: f64,
    parent: i64,
}

/// Load a morphology from an SWC file.
///
/// # Example
///
/// ```no_run
/// use dendron::io::swc;
///
/// let morphology = swc::load("cell.swc").unwrap();
/// println!("{} trees", morphology.num_trees());
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<Morphology> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    parse_str(&source, &source_name(path))
}

/// Parse SWC text. `name` becomes the tree name (or the forest name prefix).
///
/// ```
/// use dendron::io::swc;
///
/// let text = "1 1 0 0 0 0.5 -1\n2 1 0 0 1 0.5 1\n3 1 0 0 2 0.5 2\n";
/// let morphology = swc::parse_str(text, "chain").unwrap();
/// let tree = morphology.as_tree().unwrap();
/// assert_eq!(tree.num_nodes(), 3);
/// ```
pub fn parse_str(source: &str, name: &str) -> Result<Morphology> {
    let records = read_records(source)?;

    let markers: Vec<usize> = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.parent == ROOT_SENTINEL)
        .map(|(i, _)| i)
        .collect();
    if markers.is_empty() {
        return Err(MorphError::MissingRoot);
    }

    // The first segment always starts at the first row
    let mut bounds = markers.clone();
    bounds[0] = 0;
    bounds.push(records.len());
    let split = markers.len() > 1;

    let mut trees = Vec::with_capacity(markers.len());
    for (segment, window) in bounds.windows(2).enumerate() {
        let rows = &records[window[0]..window[1]];
        if split && rows.len() <= 1 {
            debug!(segment, "dropping single-node segment");
            continue;
        }
        trees.push(build_segment(segment, rows)?);
    }

    Ok(assemble(trees, name))
}

fn read_records(source: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();

    for (i, raw) in source.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() != 7 {
            return Err(MorphError::parse(
                line_no,
                format!("expected 7 fields, found {}", fields.len()),
            ));
        }

        let real = |k: usize, what: &str| -> Result<f64> {
            fields[k]
                .parse::<f64>()
                .map_err(|_| MorphError::parse(line_no, format!("invalid {} '{}'", what, fields[k])))
        };
        let int = |k: usize, what: &str| -> Result<i64> {
            parse_int(fields[k])
                .ok_or_else(|| MorphError::parse(line_no, format!("invalid {} '{}'", what, fields[k])))
        };

        records.push(Record {
            id: int(0, "id")?,
            region: int(1, "region")?,
            position: Point3::new(real(2, "x")?, real(3, "y")?, real(4, "z")?),
            radius: real(5, "radius")?,
            parent: int(6, "parent")?,
        });
    }

    Ok(records)
}

/// Parse an integer field, also accepting integral float spellings like `3.0`.
fn parse_int(field: &str) -> Option<i64> {
    if let Ok(v) = field.parse::<i64>() {
        return Some(v);
    }
    let v = field.parse::<f64>().ok()?;
    (v.fract() == 0.0 && v.abs() < i64::MAX as f64).then_some(v as i64)
}

fn build_segment(segment: usize, rows: &[Record]) -> Result<MorphologyTree> {
    let n = rows.len() as i64;
    let out_of_range = |row: usize, found: i64| MorphError::IndexingError {
        segment,
        row,
        expected: row as i64 + 1,
        found,
    };
    let offset = rows[0]
        .id
        .checked_sub(1)
        .ok_or_else(|| out_of_range(0, rows[0].id))?;

    for (row, record) in rows.iter().enumerate() {
        let expected = row as i64 + 1;
        let found = record
            .id
            .checked_sub(offset)
            .ok_or_else(|| out_of_range(row, record.id))?;
        if found != expected {
            return Err(MorphError::IndexingError {
                segment,
                row,
                expected,
                found,
            });
        }
    }

    let mut parents = Vec::with_capacity(rows.len());
    for (row, record) in rows.iter().enumerate() {
        if record.parent == ROOT_SENTINEL {
            parents.push(None);
            continue;
        }
        let local = match record.parent.checked_sub(offset) {
            Some(local) if (1..=n).contains(&local) => local,
            _ => {
                return Err(MorphError::InvalidParent {
                    node: row,
                    parent: record.parent,
                })
            }
        };
        parents.push(Some((local - 1) as usize));
    }

    // Distinct codes in ascending order become the catalog
    let mut codes: Vec<i64> = rows.iter().map(|r| r.region).collect();
    codes.sort_unstable();
    codes.dedup();
    let mut catalog = RegionCatalog::new();
    for code in &codes {
        catalog.get_or_insert(&code.to_string());
    }

    let nodes = rows
        .iter()
        .map(|r| {
            let region = catalog.get_or_insert(&r.region.to_string());
            Node::new(r.position, 2.0 * r.radius, region)
        })
        .collect();

    build_from_parents(String::new(), nodes, &parents, catalog)
}

/// Save a single tree to an SWC file.
///
/// Region codes are written as the numeric catalog name when it parses as an
/// integer, otherwise as the catalog index plus one. Forests are rejected.
///
/// # Example
///
/// ```no_run
/// use dendron::io::swc;
///
/// let morphology = swc::load("cell.swc").unwrap();
/// swc::save(&morphology, "copy.swc").unwrap();
/// ```
pub fn save<P: AsRef<Path>>(morphology: &Morphology, path: P) -> Result<()> {
    let path = path.as_ref();
    let tree = morphology.as_tree().ok_or_else(|| MorphError::SaveError {
        path: path.to_path_buf(),
        message: "SWC holds a single tree; save forests as .mtr".to_string(),
    })?;

    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_tree(tree, &mut writer)?;
    writer.flush()?;
    Ok(())
}

fn write_tree<W: Write>(tree: &MorphologyTree, writer: &mut W) -> Result<()> {
    writeln!(writer, "# {}", tree.name())?;
    writeln!(writer, "# generated by dendron")?;
    for (id, name) in tree.catalog().iter() {
        writeln!(writer, "# region {} {}", region_code(id.index(), name), name)?;
    }

    for (id, node) in tree.nodes() {
        let parent = tree
            .parent(id)
            .map_or(ROOT_SENTINEL, |p: NodeId| p.index() as i64 + 1);
        writeln!(
            writer,
            "{} {} {} {} {} {} {}",
            id.index() + 1,
            region_code(node.region.index(), tree.region_name(id)),
            node.position.x,
            node.position.y,
            node.position.z,
            node.diameter / 2.0,
            parent
        )?;
    }
    Ok(())
}

fn region_code(index: usize, name: &str) -> i64 {
    name.parse::<i64>().unwrap_or(index as i64 + 1)
}
