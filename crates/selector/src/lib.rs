pub mod action;
pub mod attribute;
pub mod compile;
pub mod component;
mod functions;
pub mod live;
pub mod selector;

// Re-exports so the driver can just use `selector::...`.
pub use action::{Action, ActionError, ActionErrorKind, ActionFn, ActionRegistry, DEFAULT_LIBRARY};
pub use attribute::{AttributePredicate, Comparator};
pub use compile::{CompileError, CompileErrorKind, compile};
pub use component::{Combinator, Component, NthChild, TagPredicate};
pub use live::{LiveMatch, LiveMatches};
pub use selector::{Placement, Selector, SelectorState};
