//! Golden rewrite fixtures.
//!
//! ```toml
//! format = "rewrite-fixture-v1"
//!
//! [[cases]]
//! id = "delete-script"
//! selectors = "script { delete(); }"
//! input = "<p>a</p><script>x()</script>"
//! expected = "<p>a</p>"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

pub const REWRITE_FIXTURE_FORMAT_V1: &str = "rewrite-fixture-v1";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewriteFixture {
    pub format: String,
    #[serde(default)]
    pub cases: Vec<RewriteCase>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewriteCase {
    pub id: String,
    pub selectors: String,
    pub input: String,
    pub expected: String,
    /// Run with whitespace minimization on.
    #[serde(default)]
    pub minimize: bool,
    /// Encoding label; `input` and `expected` are compared after encoding.
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Parse one fixture file. Panics with the path on any problem.
pub fn load_fixture(path: &Path) -> RewriteFixture {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read fixture file {path:?}: {err}"));
    let fixture: RewriteFixture = toml::from_str(&content)
        .unwrap_or_else(|err| panic!("failed to parse fixture file {path:?}: {err}"));
    assert_eq!(
        fixture.format, REWRITE_FIXTURE_FORMAT_V1,
        "unsupported format in {path:?}"
    );
    assert!(!fixture.cases.is_empty(), "fixture file {path:?} has no cases");
    let mut ids: Vec<&str> = fixture.cases.iter().map(|case| case.id.as_str()).collect();
    ids.sort_unstable();
    if let Some(pair) = ids.windows(2).find(|pair| pair[0] == pair[1]) {
        panic!("duplicate case id {:?} in {path:?}", pair[0]);
    }
    fixture
}

/// `*.toml` files directly under `dir`, sorted by name.
pub fn fixture_files(dir: &Path) -> Vec<PathBuf> {
    let entries = fs::read_dir(dir)
        .unwrap_or_else(|err| panic!("failed to list fixture directory {dir:?}: {err}"));
    let mut files: Vec<PathBuf> = entries
        .map(|entry| {
            entry
                .unwrap_or_else(|err| panic!("failed to read entry in {dir:?}: {err}"))
                .path()
        })
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .collect();
    files.sort();
    files
}
