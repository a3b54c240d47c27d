//! Loading with options and external collaborators.
//!
//! [`Loader`] wraps [`crate::io`] with the behaviour expected by interactive
//! callers:
//!
//! - a missing name asks a [`FileSelector`]; cancelling yields an empty outcome
//! - an unknown extension is a warning and an empty outcome, not an error
//! - `-r` runs a [`Repair`] pass over every tree, `-s` hands the result to a
//!   [`Viewer`]
//! - appending to a [`TreeStore`] is an explicit, separate step
//!
//! # Example
//!
//! ```no_run
//! use dendron::load::{Loader, TreeRegistry};
//! use std::path::Path;
//!
//! let mut registry = TreeRegistry::new();
//! let outcome = Loader::new().load(Some(Path::new("cell.swc")), None).unwrap();
//! println!("{} in {}", outcome.name, outcome.path.display());
//! outcome.append_to(&mut registry);
//! ```

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::io::{self, Format};
use crate::tree::{Morphology, MorphologyTree};

/// Structural normalisation applied to freshly parsed trees.
pub trait Repair {
    /// Normalise a tree in place.
    fn repair(&self, tree: &mut MorphologyTree);
}

/// Display of a loaded morphology.
pub trait Viewer {
    /// Show the morphology.
    fn show(&self, morphology: &Morphology);
}

/// Interactive choice of a file to load.
pub trait FileSelector {
    /// Return the chosen path, or `None` if the user cancelled.
    fn select(&self) -> Option<PathBuf>;
}

/// Sink collecting loaded trees.
pub trait TreeStore {
    /// Append one tree.
    fn append(&mut self, tree: MorphologyTree);
}

/// In-memory, append-only [`TreeStore`].
#[derive(Debug, Clone, Default)]
pub struct TreeRegistry {
    trees: Vec<MorphologyTree>,
}

impl TreeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored trees in insertion order.
    pub fn trees(&self) -> &[MorphologyTree] {
        &self.trees
    }

    /// Number of stored trees.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Whether nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

impl TreeStore for TreeRegistry {
    fn append(&mut self, tree: MorphologyTree) {
        self.trees.push(tree);
    }
}

/// Options for loading, usually parsed from a flag string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Run the repair pass. `None` picks the per-format default: on for
    /// the text formats, off for the native container.
    pub repair: Option<bool>,

    /// Hand the result to the viewer.
    pub show: bool,
}

impl LoadOptions {
    /// Parse a flag string such as `"-r -s"`.
    ///
    /// Only flags present are enabled; unknown tokens are ignored with a warning.
    ///
    /// ```
    /// use dendron::load::LoadOptions;
    ///
    /// let options = LoadOptions::parse("-s");
    /// assert_eq!(options.repair, Some(false));
    /// assert!(options.show);
    /// ```
    pub fn parse(flags: &str) -> Self {
        let mut options = LoadOptions {
            repair: Some(false),
            show: false,
        };
        for token in flags.split_whitespace() {
            match token {
                "-r" => options.repair = Some(true),
                "-s" => options.show = true,
                other => warn!(flag = other, "ignoring unknown load flag"),
            }
        }
        options
    }

    /// Set whether to repair.
    pub fn with_repair(mut self, repair: bool) -> Self {
        self.repair = Some(repair);
        self
    }

    /// Set whether to show the result.
    pub fn with_show(mut self, show: bool) -> Self {
        self.show = show;
        self
    }

    /// Whether repair applies to a file of the given format.
    pub fn repair_for(&self, format: Format) -> bool {
        self.repair.unwrap_or_else(|| format.is_text())
    }
}

/// Result of a load: the morphology plus the resolved file name and directory.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    /// The loaded morphology, `None` when nothing was loaded.
    pub morphology: Option<Morphology>,
    /// File name including extension.
    pub name: String,
    /// Directory containing the file.
    pub path: PathBuf,
}

impl LoadOutcome {
    fn empty(name: String, path: PathBuf) -> Self {
        Self {
            morphology: None,
            name,
            path,
        }
    }

    /// Whether a morphology was loaded.
    pub fn is_empty(&self) -> bool {
        self.morphology.is_none()
    }

    /// Append every loaded tree to a store, returning how many were added.
    pub fn append_to<S: TreeStore + ?Sized>(self, store: &mut S) -> usize {
        let trees = self.morphology.map(Morphology::into_trees).unwrap_or_default();
        let count = trees.len();
        for tree in trees {
            store.append(tree);
        }
        count
    }
}

/// Loader with optional collaborators.
#[derive(Default)]
pub struct Loader {
    repair: Option<Box<dyn Repair>>,
    viewer: Option<Box<dyn Viewer>>,
    selector: Option<Box<dyn FileSelector>>,
}

impl Loader {
    /// Create a loader without collaborators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the repair pass.
    pub fn with_repair<R: Repair + 'static>(mut self, repair: R) -> Self {
        self.repair = Some(Box::new(repair));
        self
    }

    /// Install the viewer.
    pub fn with_viewer<V: Viewer + 'static>(mut self, viewer: V) -> Self {
        self.viewer = Some(Box::new(viewer));
        self
    }

    /// Install the file selector.
    pub fn with_selector<S: FileSelector + 'static>(mut self, selector: S) -> Self {
        self.selector = Some(Box::new(selector));
        self
    }

    /// Load a morphology.
    ///
    /// # Arguments
    ///
    /// * `name` - File to load; `None` asks the file selector
    /// * `flags` - Flag string (see [`LoadOptions::parse`]); `None` uses defaults
    ///
    /// # Returns
    ///
    /// The outcome, empty when the selection was cancelled or the extension
    /// is not recognised. Structural problems in a recognised file are errors.
    pub fn load(&self, name: Option<&Path>, flags: Option<&str>) -> Result<LoadOutcome> {
        let options = flags.map(LoadOptions::parse).unwrap_or_default();
        self.load_with(name, &options)
    }

    /// Load a morphology with explicit options.
    pub fn load_with(&self, name: Option<&Path>, options: &LoadOptions) -> Result<LoadOutcome> {
        let selected;
        let path = match name {
            Some(path) => path,
            None => match self.selector.as_ref().and_then(|s| s.select()) {
                Some(chosen) => {
                    selected = chosen;
                    selected.as_path()
                }
                None => {
                    debug!("no file selected");
                    return Ok(LoadOutcome::empty(String::new(), PathBuf::new()));
                }
            },
        };

        let file_name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let Some(format) = Format::from_path(path) else {
            let err = io::unsupported(path);
            warn!(path = %path.display(), "{}", err);
            return Ok(LoadOutcome::empty(file_name, dir));
        };

        let mut morphology = io::parse(path, format)?;

        if options.repair_for(format) {
            match &self.repair {
                Some(repair) => morphology.for_each_tree_mut(&mut |tree: &mut MorphologyTree| {
                    repair.repair(tree)
                }),
                None => debug!("repair requested but no repair pass installed"),
            }
        }

        if options.show {
            match &self.viewer {
                Some(viewer) => viewer.show(&morphology),
                None => debug!("show requested but no viewer installed"),
            }
        }

        info!(
            file = %file_name,
            trees = morphology.num_trees(),
            "loaded morphology"
        );

        Ok(LoadOutcome {
            morphology: Some(morphology),
            name: file_name,
            path: dir,
        })
    }
}
