//! Streaming HTML rewriter.
//!
//! A [`Rewriter`] holds compiled selectors and the action registry they resolve
//! their functions in, and streams documents from any [`Read`] to any [`Write`]:
//!
//! ```no_run
//! use rewriter::Rewriter;
//!
//! let mut rewriter = Rewriter::from_source("script { delete(); }")?;
//! let html = rewriter.rewrite_str("<p>hi</p><script>track()</script>")?;
//! assert_eq!(html, "<p>hi</p>");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Memory stays bounded by the buffered span of the outermost pending match, not by
//! the document. Markup errors never fail a run; only I/O does.

mod buffer;
pub mod config;
mod error;
mod minimize;
mod session;
mod stack;

use std::io::{Read, Write};
use std::sync::Arc;

use selector::{ActionError, ActionRegistry, CompileError, Selector};

pub use config::{ConfigError, RewriterConfig};
pub use error::RewriteError;
pub use minimize::collapse_whitespace;
pub use session::RewriteStats;

use session::RewriteSession;

#[derive(Debug)]
pub struct Rewriter {
    selectors: Vec<Selector>,
    registry: Arc<ActionRegistry>,
    config: RewriterConfig,
    errors: Vec<ActionError>,
}

impl Rewriter {
    /// Rewriter over `selectors` using the standard function library.
    pub fn new(selectors: Vec<Selector>) -> Self {
        Self {
            selectors,
            registry: Arc::new(ActionRegistry::new()),
            config: RewriterConfig::default(),
            errors: Vec::new(),
        }
    }

    /// Compile selector source and build a rewriter over it.
    pub fn from_source(source: &str) -> Result<Self, CompileError> {
        Ok(Self::new(selector::compile(source)?))
    }

    pub fn with_registry(mut self, registry: Arc<ActionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_config(mut self, config: RewriterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn config(&self) -> &RewriterConfig {
        &self.config
    }

    /// Action names no library in the registry provides.
    pub fn unresolved_actions(&self) -> Vec<String> {
        let mut missing: Vec<String> = self
            .selectors
            .iter()
            .flat_map(Selector::actions)
            .filter(|action| !self.registry.contains(action))
            .map(|action| action.qualified_name())
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }

    /// Forget everything learned from previous documents.
    pub fn reset(&mut self) {
        for selector in &mut self.selectors {
            selector.reset();
        }
        self.errors.clear();
    }

    /// Rewrite one document from `reader` into `writer`.
    ///
    /// Selector state starts fresh; action errors from the run are kept until
    /// [`Rewriter::take_action_errors`].
    pub fn rewrite<R: Read, W: Write>(
        &mut self,
        reader: R,
        writer: W,
    ) -> Result<RewriteStats, RewriteError> {
        self.reset();
        let session = RewriteSession::new(
            reader,
            writer,
            &mut self.selectors,
            &self.registry,
            &self.config,
            &mut self.errors,
        );
        let stats = session.run()?;
        if !self.errors.is_empty() {
            log::debug!(
                target: "rewriter.session",
                "{} action error(s) during run",
                self.errors.len()
            );
        }
        Ok(stats)
    }

    /// Rewrite a string. The configured encoding does not apply: both sides are UTF-8.
    pub fn rewrite_str(&mut self, input: &str) -> Result<String, RewriteError> {
        let mut sink = tools::Utf8Sink::with_capacity(input.len());
        let encoding = std::mem::replace(&mut self.config.encoding, encoding_rs::UTF_8);
        let result = self.rewrite(input.as_bytes(), &mut sink);
        self.config.encoding = encoding;
        result?;
        Ok(sink.into_string())
    }

    pub fn take_action_errors(&mut self) -> Vec<ActionError> {
        std::mem::take(&mut self.errors)
    }
}
