//! Label selection: which records get relocated, and where to.
//!
//! A [`LabelSelector`] either matches one literal label and sends the matching
//! files to a fixed destination folder, or maps several labels onto folder
//! names (several fine-grained labels may share one coarser folder).
//!
//! # Examples
//!
//! ```
//! use labelsort::selector::{LabelSelector, Selection};
//!
//! let selector = LabelSelector::mapping([("door_wood_creaks", "Background_noise")]);
//! assert_eq!(
//!     selector.resolve("door_wood_creaks"),
//!     Selection::Include("Background_noise")
//! );
//! assert_eq!(selector.resolve("Bus"), Selection::Skip);
//! ```

use std::collections::BTreeMap;
use std::fmt;

/// Result of matching a record's label against a selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection<'a> {
    /// The label is not selected; the record is left alone.
    Skip,
    /// The label is selected; the file goes to this destination folder.
    Include(&'a str),
}

/// The configured rule deciding which records are relocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelSelector {
    /// Match one label exactly and relocate into `folder`.
    Exact { label: String, folder: String },
    /// Relocate every label present in the map into its associated folder.
    Mapping(BTreeMap<String, String>),
}

impl LabelSelector {
    /// Selector matching `label` and relocating into a folder of the same name.
    pub fn exact(label: impl Into<String>) -> Self {
        let label = label.into();
        Self::Exact {
            folder: label.clone(),
            label,
        }
    }

    /// Selector matching `label` and relocating into `folder`.
    pub fn exact_into(label: impl Into<String>, folder: impl Into<String>) -> Self {
        Self::Exact {
            label: label.into(),
            folder: folder.into(),
        }
    }

    /// Selector built from `(label, folder)` pairs.
    pub fn mapping<I, L, F>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, F)>,
        L: Into<String>,
        F: Into<String>,
    {
        Self::Mapping(
            pairs
                .into_iter()
                .map(|(label, folder)| (label.into(), folder.into()))
                .collect(),
        )
    }

    /// Resolves a record's label to a destination folder.
    ///
    /// Matching is exact and case-sensitive. A label absent from a mapping
    /// selector resolves to [`Selection::Skip`].
    pub fn resolve(&self, label: &str) -> Selection<'_> {
        match self {
            Self::Exact {
                label: wanted,
                folder,
            } if wanted == label => Selection::Include(folder),
            Self::Exact { .. } => Selection::Skip,
            Self::Mapping(map) => map
                .get(label)
                .map_or(Selection::Skip, |folder| Selection::Include(folder)),
        }
    }

    /// Every destination folder this selector can produce, sorted and deduplicated.
    pub fn folders(&self) -> Vec<&str> {
        match self {
            Self::Exact { folder, .. } => vec![folder.as_str()],
            Self::Mapping(map) => {
                let mut folders: Vec<&str> = map.values().map(String::as_str).collect();
                folders.sort_unstable();
                folders.dedup();
                folders
            }
        }
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact { label, folder } if label == folder => write!(f, "label '{}'", label),
            Self::Exact { label, folder } => write!(f, "label '{}' -> {}/", label, folder),
            Self::Mapping(map) => {
                let pairs: Vec<String> = map
                    .iter()
                    .map(|(label, folder)| format!("'{}' -> {}/", label, folder))
                    .collect();
                write!(f, "mapping {{{}}}", pairs.join(", "))
            }
        }
    }
}
