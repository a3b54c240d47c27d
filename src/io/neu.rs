//! NEU topology+geometry format support.
//!
//! A NEU file describes a cell as branches (sections) and their sample points:
//!
//! ```text
//! NEU
//! TOPOLOGY
//! # label   own_end  parent  parent_end  points
//! soma      0        -       0           3
//! dend[0]   0        soma    1           4
//! GEOMETRY
//! # x y z diameter, branches in topology order
//! 0 0 0 10
//! ...
//! ```
//!
//! Every branch attaches to its parent with its own point 0. The parent end is
//! 0 (first point of the parent) or 1 (last point). A parent label naming no
//! branch makes the branch a root; several roots produce a forest.
//!
//! Only loading is supported.

use std::collections::HashMap;
use std::path::Path;

use nalgebra::Point3;
use tracing::debug;

use super::{assemble, source_name};
use crate::error::{MorphError, Result};
use crate::tree::{build_from_parents, fold_indexed_label, Morphology, MorphologyTree, Node, RegionCatalog};

const HEADER: &str = "NEU";
const TOPOLOGY: &str = "TOPOLOGY";
const GEOMETRY: &str = "GEOMETRY";

/// One topology row.
#[derive(Debug, Clone)]
struct Branch {
    label: String,
    parent_label: String,
    /// True when attached at the parent's last point.
    parent_far_end: bool,
    points: usize,
}

/// One geometry row.
#[derive(Debug, Clone, Copy)]
struct Sample {
    position: Point3<f64>,
    diameter: f64,
}

/// Load a morphology from a NEU file.
///
/// # Example
///
/// ```no_run
/// use dendron::io::neu;
///
/// let morphology = neu::load("cell.neu").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<Morphology> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    parse_str(&source, &source_name(path))
}

/// Parse NEU text. `name` becomes the tree name (or the forest name prefix).
///
/// ```
/// use dendron::io::neu;
///
/// let text = "NEU\nTOPOLOGY\nsoma 0 - 0 2\nGEOMETRY\n0 0 0 8\n0 4 0 8\n";
/// let tree = neu::parse_str(text, "cell").unwrap().into_trees().remove(0);
/// assert_eq!(tree.num_nodes(), 2);
/// assert_eq!(tree.region_name(tree.root()), "soma");
/// ```
pub fn parse_str(source: &str, name: &str) -> Result<Morphology> {
    let (branches, samples) = read_sections(source)?;
    let parents = resolve_parents(&branches)?;
    let order = topological_order(&branches, &parents)?;

    // Point ranges per branch, in file order
    let mut first_sample = Vec::with_capacity(branches.len());
    let mut total = 0;
    for b in &branches {
        first_sample.push(total);
        total += b.points;
    }

    let mut root_of = vec![0; branches.len()];
    for &b in &order {
        root_of[b] = match parents[b] {
            Some(p) => root_of[p],
            None => b,
        };
    }
    let roots: Vec<usize> = (0..branches.len()).filter(|&b| parents[b].is_none()).collect();
    let split = roots.len() > 1;

    let mut trees = Vec::with_capacity(roots.len());
    for (segment, &root) in roots.iter().enumerate() {
        let members: Vec<usize> = order.iter().copied().filter(|&b| root_of[b] == root).collect();
        let size: usize = members.iter().map(|&b| branches[b].points).sum();
        if split && size <= 1 {
            debug!(segment, branch = %branches[root].label, "dropping single-node segment");
            continue;
        }
        trees.push(flatten(&branches, &parents, &members, &samples, &first_sample)?);
    }

    Ok(assemble(trees, name))
}

/// Split the file into topology rows and geometry rows.
fn read_sections(source: &str) -> Result<(Vec<Branch>, Vec<Sample>)> {
    #[derive(PartialEq)]
    enum Section {
        Header,
        Marker,
        Topology,
        Geometry,
    }

    let mut section = Section::Header;
    let mut branches: Vec<Branch> = Vec::new();
    let mut samples = Vec::new();
    let mut last_line = 0;

    for (i, raw) in source.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        last_line = line_no;

        match section {
            Section::Header => {
                if !line.eq_ignore_ascii_case(HEADER) {
                    return Err(MorphError::parse(line_no, format!("expected '{}' header", HEADER)));
                }
                section = Section::Marker;
            }
            Section::Marker => {
                if !line.eq_ignore_ascii_case(TOPOLOGY) {
                    return Err(MorphError::parse(line_no, format!("expected '{}'", TOPOLOGY)));
                }
                section = Section::Topology;
            }
            Section::Topology if line.eq_ignore_ascii_case(GEOMETRY) => {
                section = Section::Geometry;
            }
            Section::Topology => branches.push(read_branch(line, line_no)?),
            Section::Geometry => samples.push(read_sample(line, line_no)?),
        }
    }

    if section != Section::Geometry {
        return Err(MorphError::parse(
            last_line,
            format!("missing '{}' section", GEOMETRY),
        ));
    }
    if branches.is_empty() {
        return Err(MorphError::MissingRoot);
    }

    let expected = branches
        .iter()
        .try_fold(0usize, |total, b| total.checked_add(b.points))
        .ok_or_else(|| MorphError::parse(last_line, "point count overflow"))?;
    if samples.len() != expected {
        return Err(MorphError::parse(
            last_line,
            format!("topology declares {} points, geometry has {}", expected, samples.len()),
        ));
    }

    Ok((branches, samples))
}

fn read_branch(line: &str, line_no: usize) -> Result<Branch> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 5 {
        return Err(MorphError::parse(
            line_no,
            format!("expected 5 topology fields, found {}", fields.len()),
        ));
    }
    let label = fields[0];
    let number = |k: usize| -> Result<f64> {
        fields[k]
            .parse::<f64>()
            .map_err(|_| MorphError::parse(line_no, format!("invalid number '{}'", fields[k])))
    };

    let own_end = number(1)?;
    if own_end != 0.0 {
        return Err(MorphError::malformed(
            label,
            format!("attaches at own end {}, must attach at 0", own_end),
        ));
    }

    let parent_end = number(3)?;
    if parent_end != 0.0 && parent_end != 1.0 {
        return Err(MorphError::malformed(
            label,
            format!("parent end {} is neither 0 nor 1", parent_end),
        ));
    }

    let points = fields[4]
        .parse::<usize>()
        .map_err(|_| MorphError::parse(line_no, format!("invalid point count '{}'", fields[4])))?;
    if points == 0 {
        return Err(MorphError::malformed(label, "branch has no points"));
    }

    Ok(Branch {
        label: label.to_string(),
        parent_label: fields[2].to_string(),
        parent_far_end: parent_end == 1.0,
        points,
    })
}

fn read_sample(line: &str, line_no: usize) -> Result<Sample> {
    let values = line
        .split_whitespace()
        .map(|f| {
            f.parse::<f64>()
                .map_err(|_| MorphError::parse(line_no, format!("invalid number '{}'", f)))
        })
        .collect::<Result<Vec<f64>>>()?;
    if values.len() != 4 {
        return Err(MorphError::parse(
            line_no,
            format!("expected 4 geometry fields, found {}", values.len()),
        ));
    }
    Ok(Sample {
        position: Point3::new(values[0], values[1], values[2]),
        diameter: values[3],
    })
}

/// Match parent labels against branch labels; unmatched labels mark roots.
fn resolve_parents(branches: &[Branch]) -> Result<Vec<Option<usize>>> {
    let mut by_label: HashMap<&str, usize> = HashMap::with_capacity(branches.len());
    for (i, b) in branches.iter().enumerate() {
        if by_label.insert(b.label.as_str(), i).is_some() {
            return Err(MorphError::malformed(&b.label, "duplicate branch label"));
        }
    }

    branches
        .iter()
        .enumerate()
        .map(|(i, b)| match by_label.get(b.parent_label.as_str()) {
            Some(&p) if p == i => Err(MorphError::malformed(&b.label, "branch is its own parent")),
            Some(&p) => Ok(Some(p)),
            None => Ok(None),
        })
        .collect()
}

/// Order branches parent-before-child, stable in file order.
fn topological_order(branches: &[Branch], parents: &[Option<usize>]) -> Result<Vec<usize>> {
    let mut placed = vec![false; branches.len()];
    let mut order = Vec::with_capacity(branches.len());

    while order.len() < branches.len() {
        let before = order.len();
        for b in 0..branches.len() {
            if !placed[b] && parents[b].map_or(true, |p| placed[p]) {
                placed[b] = true;
                order.push(b);
            }
        }
        if order.len() == before {
            // Nothing placeable: the remaining branches only reach each other
            let stuck = (0..branches.len()).find(|&b| !placed[b]).unwrap_or(0);
            return Err(MorphError::malformed(
                &branches[stuck].label,
                "branch is part of a parent cycle",
            ));
        }
    }

    Ok(order)
}

/// Build one tree from the branches of one root, given in topological order.
fn flatten(
    branches: &[Branch],
    parents: &[Option<usize>],
    members: &[usize],
    samples: &[Sample],
    first_sample: &[usize],
) -> Result<MorphologyTree> {
    let size: usize = members.iter().map(|&b| branches[b].points).sum();
    let mut nodes = Vec::with_capacity(size);
    let mut node_parents = Vec::with_capacity(size);
    let mut first_node: HashMap<usize, usize> = HashMap::with_capacity(members.len());
    let mut catalog = RegionCatalog::new();

    for &b in members {
        let branch = &branches[b];
        let region = catalog.get_or_insert(&fold_indexed_label(&branch.label));
        let start = nodes.len();
        first_node.insert(b, start);

        let attach = match parents[b] {
            None => None,
            Some(p) => {
                // Parents precede children in `members`
                let parent_start = first_node[&p];
                let offset = if branch.parent_far_end {
                    branches[p].points - 1
                } else {
                    0
                };
                Some(parent_start + offset)
            }
        };

        let points = &samples[first_sample[b]..first_sample[b] + branch.points];
        for (k, sample) in points.iter().enumerate() {
            nodes.push(Node::new(sample.position, sample.diameter, region));
            node_parents.push(if k == 0 { attach } else { Some(start + k - 1) });
        }
    }

    build_from_parents(String::new(), nodes, &node_parents, catalog)
}
