//! Display-title lookup in a category's `gamelist.xml`.
//!
//! The file lists `<game>` entries, each with a `<name>` and a `<thumbnail>`
//! path. A cover matches an entry when the thumbnail's file name contains
//! the cover's file name, compared case-insensitively. Lookup never fails:
//! an unreadable or malformed file behaves like a file with no entries.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use roxmltree::{Document, Node};

/// Parsed title entries of one metadata file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Gamelist {
    entries: Vec<Entry>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Entry {
    /// Lower-cased thumbnail file name.
    thumbnail: String,
    /// Whitespace-normalized display name.
    name: String,
}

impl Gamelist {
    /// Load `path`, or an empty list when it is missing or malformed.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!("no metadata at {}: {e}", path.display());
                return Self::default();
            }
        };
        match Self::parse(&text) {
            Ok(list) => list,
            Err(e) => {
                warn!("ignoring malformed metadata {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Parse metadata XML.
    pub fn parse(text: &str) -> Result<Self, roxmltree::Error> {
        let doc = Document::parse(text)?;
        let entries = doc
            .descendants()
            .filter(|n| n.has_tag_name("game"))
            .filter_map(|game| {
                let thumbnail = child_text(game, "thumbnail")?;
                let name = collapse_whitespace(child_text(game, "name")?);
                if name.is_empty() {
                    return None;
                }
                let file = thumbnail
                    .rsplit(['/', '\\'])
                    .next()
                    .unwrap_or(thumbnail)
                    .trim()
                    .to_lowercase();
                Some(Entry {
                    thumbnail: file,
                    name,
                })
            })
            .collect();
        Ok(Self { entries })
    }

    /// Number of usable entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Title of the first entry whose thumbnail file name contains
    /// `cover_file_name`, case-insensitively.
    pub fn title_for(&self, cover_file_name: &str) -> Option<&str> {
        let needle = cover_file_name.to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.thumbnail.contains(&needle))
            .map(|e| e.name.as_str())
    }
}

/// One-shot lookup: load `path` and search it for `cover_file_name`.
pub fn lookup_title(path: &Path, cover_file_name: &str) -> Option<String> {
    Gamelist::load(path)
        .title_for(cover_file_name)
        .map(str::to_owned)
}

fn child_text<'a>(node: Node<'a, '_>, tag: &str) -> Option<&'a str> {
    node.children()
        .find(|c| c.has_tag_name(tag))
        .and_then(|c| c.text())
}

/// Collapse whitespace runs to single spaces and trim.
fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
