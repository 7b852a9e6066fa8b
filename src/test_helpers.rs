//! Shared test utilities for the recipe-book test suite.
//!
//! Provides the fixture cookbook, small builders for ad-hoc recipe files, and
//! mtime control for change-detection tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! write_recipe(tmp.path(), "03-soups/minestrone.tex", "Minestrone", "Simmer.");
//!
//! let mut store = BuildStore::empty();
//! scan(tmp.path(), &mut store, &None).unwrap();
//! ```

use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tempfile::TempDir;

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/book/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/book");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

// =========================================================================
// Recipe builders
// =========================================================================

/// A minimal standalone recipe document with the given title and body.
pub fn recipe_source(title: &str, body: &str) -> String {
    format!(
        "\\documentclass{{article}}\n\\title{{{title}}}\n\\begin{{document}}\n{body}\n\\end{{document}}\n"
    )
}

/// Write a recipe document at `rel` under `root`, creating parent directories.
pub fn write_recipe(root: &Path, rel: &str, title: &str, body: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, recipe_source(title, body)).unwrap();
}

/// Force a file's modification time.
pub fn set_mtime(path: &Path, mtime: SystemTime) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(mtime)
        .unwrap();
}
