//! Rewriter configuration, loadable from TOML.
//!
//! ```toml
//! minimize_html = true
//! minimize_skip_tags = ["pre", "script", "textarea"]
//! max_token_run = 4096
//! read_buffer_size = 8192
//! pass_through = true
//! encoding = "windows-1252"
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use encoding_rs::{Encoding, UTF_8};
use html::{LexerConfig, encoding_for_label};
use serde::{Deserialize, Deserializer, de};

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RewriterConfig {
    /// Collapse whitespace and drop unmatched comments.
    pub minimize_html: bool,
    /// Elements whose content is never minimized.
    pub minimize_skip_tags: Vec<String>,
    /// Longest text/comment/CDATA run handled as one token.
    pub max_token_run: usize,
    /// Bytes requested from the reader per refill.
    pub read_buffer_size: usize,
    /// Copy the rest of the input verbatim once no selector can fire anymore.
    pub pass_through: bool,
    /// Encoding of input and output. Characters inserted by actions that it cannot
    /// represent are written as numeric character references.
    #[serde(deserialize_with = "encoding_label")]
    pub encoding: &'static Encoding,
}

impl Default for RewriterConfig {
    fn default() -> Self {
        let lexer = LexerConfig::default();
        Self {
            minimize_html: false,
            minimize_skip_tags: ["pre", "script", "textarea"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_token_run: lexer.max_token_run,
            read_buffer_size: lexer.read_buffer_size,
            pass_through: true,
            encoding: UTF_8,
        }
    }
}

impl RewriterConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(ConfigError::Parse)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Switch to the encoding named by `label`.
    pub fn set_encoding(&mut self, label: &str) -> Result<(), ConfigError> {
        self.encoding = encoding_for_label(label)
            .ok_or_else(|| ConfigError::UnsupportedEncoding(label.to_string()))?;
        Ok(())
    }

    pub fn lexer_config(&self) -> LexerConfig {
        LexerConfig {
            max_token_run: self.max_token_run,
            read_buffer_size: self.read_buffer_size.max(1),
            encoding: self.encoding,
        }
    }
}

fn encoding_label<'de, D: Deserializer<'de>>(deserializer: D) -> Result<&'static Encoding, D::Error> {
    let label = String::deserialize(deserializer)?;
    encoding_for_label(&label)
        .ok_or_else(|| de::Error::custom(format!("unsupported encoding `{label}`")))
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: io::Error },
    Parse(toml::de::Error),
    UnsupportedEncoding(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Parse(err) => write!(f, "invalid configuration: {err}"),
            Self::UnsupportedEncoding(label) => write!(f, "unsupported encoding `{label}`"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::UnsupportedEncoding(_) => None,
        }
    }
}
