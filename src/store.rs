//! Persisted build state for incremental runs.
//!
//! Every stage reads the store at the start of the run and writes it back when
//! it finishes, so an interrupted build resumes where it stopped and an
//! unchanged recipe is never extracted or preprocessed twice.
//!
//! ## Layout
//!
//! The store is a single pretty-printed JSON file inside the build directory:
//!
//! ```text
//! _build/
//! ├── metadata.json            # BuildStore
//! ├── bodies/                  # Extracted body artifacts
//! │   └── 01-appetizers/
//! │       └── bruschetta.tex
//! └── html/
//!     └── book.html
//! ```
//!
//! ## Ownership
//!
//! Each stage owns a slice of the data and only that stage writes it:
//!
//! - **scan**: `sections`, `last_build`, record membership, `mtime`, `changed`
//! - **extract**: `extracted_body`, record `packages`, `title`; a successful
//!   extraction clears `changed`, a failed one forgets `mtime`. The global
//!   `packages` is recomputed from the records afterwards.
//! - **preprocess**: `preprocessed`
//! - **latex**: replaces the global `packages` with the consolidated list,
//!   again recomputed from the records so removed packages drop out
//!
//! ## Legacy data
//!
//! Older stores stored the body reference as `false` when extraction had not
//! happened yet and wrote timestamps in a naive local format. Both load
//! leniently: a body reference that is not a non-empty string becomes `None`,
//! and a timestamp that does not parse becomes unknown, which compares unequal
//! to every observed mtime and therefore forces the recipe to be rebuilt.
//!
//! A missing file, invalid JSON, or an explicitly different [`STORE_VERSION`]
//! all load as an empty store. A store without a `version` field predates
//! versioning and loads as the current version.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

/// Name of the store file within the build directory.
pub const STORE_FILENAME: &str = "metadata.json";

/// Version of the store format. Bump this to discard all existing stores when
/// the record layout changes incompatibly.
pub const STORE_VERSION: u32 = 2;

/// Build state of one recipe source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RecipeRecord {
    /// Owning section identifier (top-level directory name).
    pub section: String,
    /// Display title; from the filename until extraction finds a `\title{}`.
    pub title: String,
    /// Last observed modification time. `None` means unknown.
    #[serde(with = "lenient_timestamp")]
    pub mtime: Option<DateTime<Utc>>,
    /// Body artifact, relative to the build directory.
    #[serde(deserialize_with = "lenient_body_ref")]
    pub extracted_body: Option<PathBuf>,
    pub preprocessed: bool,
    /// Packages declared by the recipe's `\usepackage` lines.
    pub packages: BTreeSet<String>,
    /// Set by the scan of the current run.
    pub changed: bool,
}

impl RecipeRecord {
    /// Absolute path of the body artifact, if one was recorded.
    pub fn body_path(&self, build_dir: &Path) -> Option<PathBuf> {
        self.extracted_body.as_ref().map(|rel| build_dir.join(rel))
    }

    /// True when the body reference resolves to a file on disk.
    pub fn has_body(&self, build_dir: &Path) -> bool {
        self.body_path(build_dir).is_some_and(|p| p.is_file())
    }

    /// Ready for assembly: preprocessed and the artifact still exists.
    pub fn is_ready(&self, build_dir: &Path) -> bool {
        self.preprocessed && self.has_body(build_dir)
    }
}

/// The whole persisted build state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildStore {
    /// Stores written before the field existed load as the current version.
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default, with = "lenient_timestamp")]
    pub last_build: Option<DateTime<Utc>>,
    /// Records keyed by source path relative to the content root.
    #[serde(default)]
    pub recipes: BTreeMap<String, RecipeRecord>,
    /// Section identifier → display title.
    #[serde(default)]
    pub sections: BTreeMap<String, String>,
    /// Union of all packages the book needs.
    #[serde(default)]
    pub packages: BTreeSet<String>,
}

fn current_version() -> u32 {
    STORE_VERSION
}

impl Default for BuildStore {
    fn default() -> Self {
        Self::empty()
    }
}

impl BuildStore {
    /// Create an empty store (first build or unreadable file).
    pub fn empty() -> Self {
        Self {
            version: STORE_VERSION,
            last_build: None,
            recipes: BTreeMap::new(),
            sections: BTreeMap::new(),
            packages: BTreeSet::new(),
        }
    }

    /// Load from the build directory. Returns an empty store if the file
    /// doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(build_dir: &Path) -> Self {
        let path = store_path(build_dir);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        let store: Self = match serde_json::from_str(&content) {
            Ok(s) => s,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "discarding unreadable store");
                return Self::empty();
            }
        };
        if store.version != STORE_VERSION {
            tracing::debug!(found = store.version, "discarding store with other version");
            return Self::empty();
        }
        store
    }

    /// Save to the build directory.
    ///
    /// Writes `metadata.json.tmp` first and renames it into place, so a crash
    /// mid-write leaves the previous store intact.
    pub fn save(&self, build_dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(build_dir)?;
        let path = store_path(build_dir);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)
    }

    /// Union of the packages the current records declare.
    pub fn recipe_packages(&self) -> BTreeSet<String> {
        self.recipes
            .values()
            .flat_map(|r| r.packages.iter().cloned())
            .collect()
    }
}

/// Full path of the store file for a build directory.
pub fn store_path(build_dir: &Path) -> PathBuf {
    build_dir.join(STORE_FILENAME)
}

/// Parse a stored timestamp: RFC 3339 first, then the naive
/// `YYYY-MM-DDTHH:MM:SS[.f]` form older stores wrote (read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Optional timestamps as RFC 3339 strings with nanosecond precision.
/// Anything unparseable deserializes to `None`.
mod lenient_timestamp {
    use super::parse_timestamp;
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::de::IgnoredAny;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Other(IgnoredAny),
    }

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Nanos, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => parse_timestamp(&s),
            Raw::Other(_) => None,
        })
    }
}

fn lenient_body_ref<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<PathBuf>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Other(serde::de::IgnoredAny),
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) if !s.trim().is_empty() => Some(PathBuf::from(s)),
        _ => None,
    })
}

/// RFC 3339 rendering used in console output.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}
