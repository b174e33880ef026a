//! Action calls and the function table they dispatch through.

use std::collections::HashMap;
use std::fmt;

use html::TokenSpan;

use crate::functions;
use crate::selector::SelectorState;

/// Library that unqualified function names resolve against.
pub const DEFAULT_LIBRARY: &str = "std";

/// One `function(args)` call from a selector's action block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    library: Option<String>,
    function: String,
    arguments: Vec<String>,
}

impl Action {
    /// `name` may be qualified as `library.function`; the library is everything
    /// before the last dot.
    pub fn new(name: &str) -> Self {
        let (library, function) = match name.rsplit_once('.') {
            Some((library, function)) => (Some(library.to_string()), function.to_string()),
            None => (None, name.to_string()),
        };
        Self {
            library,
            function,
            arguments: Vec::new(),
        }
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn push_argument(&mut self, argument: impl Into<String>) {
        self.arguments.push(argument.into());
    }

    pub fn library(&self) -> &str {
        self.library.as_deref().unwrap_or(DEFAULT_LIBRARY)
    }

    pub fn function(&self) -> &str {
        &self.function
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.library(), self.function)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(library) = &self.library {
            write!(f, "{library}.")?;
        }
        write!(f, "{}({})", self.function, self.arguments.join(", "))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionErrorKind {
    Unresolved,
    WrongArgumentCount { expected: usize, found: usize },
    InvalidPattern(String),
    Failed(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionError {
    pub function: String,
    pub kind: ActionErrorKind,
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ActionErrorKind::Unresolved => write!(f, "unresolved function `{}`", self.function),
            ActionErrorKind::WrongArgumentCount { expected, found } => write!(
                f,
                "`{}` takes {expected} argument(s), {found} given",
                self.function
            ),
            ActionErrorKind::InvalidPattern(detail) => {
                write!(f, "`{}`: invalid pattern: {detail}", self.function)
            }
            ActionErrorKind::Failed(detail) => write!(f, "`{}` failed: {detail}", self.function),
        }
    }
}

impl std::error::Error for ActionError {}

/// Signature of an action function.
///
/// Returning `Ok(false)` stops the remaining actions of the current firing.
pub type ActionFn = dyn Fn(&mut SelectorState, &mut TokenSpan<'_>, &[String]) -> Result<bool, ActionErrorKind>
    + Send
    + Sync;

/// Name to function table, grouped by library.
pub struct ActionRegistry {
    libraries: HashMap<String, HashMap<String, Box<ActionFn>>>,
}

impl ActionRegistry {
    /// Registry without any functions.
    pub fn empty() -> Self {
        Self {
            libraries: HashMap::new(),
        }
    }

    /// Registry preloaded with the standard library.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        functions::register_std(&mut registry);
        registry
    }

    pub fn register<F>(&mut self, library: &str, name: &str, function: F)
    where
        F: Fn(&mut SelectorState, &mut TokenSpan<'_>, &[String]) -> Result<bool, ActionErrorKind>
            + Send
            + Sync
            + 'static,
    {
        self.libraries
            .entry(library.to_string())
            .or_default()
            .insert(name.to_string(), Box::new(function));
    }

    pub fn resolve(&self, action: &Action) -> Option<&ActionFn> {
        self.libraries
            .get(action.library())?
            .get(action.function())
            .map(Box::as_ref)
    }

    pub fn contains(&self, action: &Action) -> bool {
        self.resolve(action).is_some()
    }

    pub fn invoke(
        &self,
        action: &Action,
        state: &mut SelectorState,
        span: &mut TokenSpan<'_>,
    ) -> Result<bool, ActionError> {
        let function = self.resolve(action).ok_or_else(|| ActionError {
            function: action.qualified_name(),
            kind: ActionErrorKind::Unresolved,
        })?;
        log::trace!(
            target: "selector.action",
            "{action} over {} token(s)",
            span.len()
        );
        function(state, span, action.arguments()).map_err(|kind| ActionError {
            function: action.qualified_name(),
            kind,
        })
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .libraries
            .iter()
            .flat_map(|(library, functions)| {
                functions.keys().map(move |name| format!("{library}.{name}"))
            })
            .collect();
        names.sort();
        f.debug_struct("ActionRegistry")
            .field("functions", &names)
            .finish()
    }
}
