//! Compiled selector: a component chain plus the actions fired on a match.

use html::{ElementSymbol, Token, TokenSpan};

use crate::action::{Action, ActionError, ActionRegistry};
use crate::component::Component;

/// Where the actions of a matched selector apply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Placement {
    /// The whole element span, once it closes.
    #[default]
    Element,
    /// An empty span right before the opening tag (`:before`).
    Before,
    /// An empty span right after the element (`:after`).
    After,
}

/// Counters and flags visible to action functions.
#[derive(Clone, Debug, Default)]
pub struct SelectorState {
    done: bool,
    matches: u32,
    executes: u32,
}

impl SelectorState {
    /// Stop this selector for the rest of the document.
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn matches(&self) -> u32 {
        self.matches
    }

    pub fn executes(&self) -> u32 {
        self.executes
    }
}

#[derive(Clone, Debug)]
pub struct Selector {
    line: usize,
    components: Vec<Component>,
    actions: Vec<Action>,
    placement: Placement,
    start: u32,
    count: u32,
    state: SelectorState,
    /// Levels of matched elements still waiting for their span, innermost last.
    pending: Vec<u32>,
}

impl Selector {
    pub fn new(components: Vec<Component>) -> Self {
        debug_assert!(!components.is_empty(), "selector without components");
        Self {
            line: 0,
            components,
            actions: Vec::new(),
            placement: Placement::Element,
            start: 1,
            count: 0,
            state: SelectorState::default(),
            pending: Vec::new(),
        }
    }

    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    /// Fire only from the `start`-th match on (1-based).
    pub fn with_start(mut self, start: u32) -> Self {
        self.start = start.max(1);
        self
    }

    /// Fire at most `count` times; zero means unlimited.
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn start(&self) -> u32 {
        self.start
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn state(&self) -> &SelectorState {
        &self.state
    }

    pub fn is_expired(&self) -> bool {
        self.state.done || (self.count > 0 && self.state.executes >= self.count)
    }

    /// Matched at least once and still waiting for an element span.
    pub fn is_deferred(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Can this selector still affect output?
    pub fn is_live(&self) -> bool {
        !self.is_expired() || self.is_deferred()
    }

    pub fn pending_level(&self) -> Option<u32> {
        self.pending.last().copied()
    }

    /// Test the construct in `queue`, opened at `(level, sequence)`, against the chain.
    ///
    /// `symbol` is the element being opened, if any; void elements never prune
    /// records. On success the level is queued for execution.
    pub fn check(
        &mut self,
        symbol: Option<&ElementSymbol>,
        queue: &[&Token],
        level: u32,
        sequence: u32,
    ) -> bool {
        let prune = !symbol.is_some_and(ElementSymbol::is_void);
        let mut matched = false;

        for idx in 0..self.components.len() {
            let (anchors, rest) = self.components.split_at_mut(idx);
            let adjustment = rest
                .get(1)
                .map_or(0, |next| next.combinator().level_adjustment());
            let component = &mut rest[0];

            matched = match anchors.last() {
                None => component.matches(queue, 0, 0, level, sequence),
                Some(previous) => previous
                    .live()
                    .active_recent_first()
                    .any(|(anchor_level, anchor_sequence)| {
                        component.matches(queue, anchor_level, anchor_sequence, level, sequence)
                    }),
            };

            if !matched && prune {
                component.clear_level_matched(level + adjustment, false);
            }
            if !component.live().has_active() {
                break;
            }
        }

        if matched {
            self.pending.push(level);
            self.state.matches += 1;
        }
        matched
    }

    /// Run the actions for the match pending at `level` over `span`.
    ///
    /// Returns whether the actions ran. The pending entry is consumed even when the
    /// selector has expired or has not reached its start index yet. Failing actions
    /// are pushed to `errors` and end the firing like a `false` return.
    pub fn execute_actions(
        &mut self,
        registry: &ActionRegistry,
        span: &mut TokenSpan<'_>,
        level: u32,
        implied: bool,
        errors: &mut Vec<ActionError>,
    ) -> bool {
        if self.pending_level() != Some(level) {
            return false;
        }
        self.pending.pop();

        if self.state.matches < self.start || self.is_expired() {
            return false;
        }

        for action in &self.actions {
            match registry.invoke(action, &mut self.state, span) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    log::warn!(
                        target: "selector.action",
                        "selector on line {}: {err}",
                        self.line
                    );
                    errors.push(err);
                    break;
                }
            }
        }

        self.clear_level_matched(level, implied);
        self.state.executes += 1;
        true
    }

    /// Retire live records that the element closing at `level` kept extendable.
    ///
    /// Components feeding a sibling combinator keep records at `level` itself, since
    /// later siblings may still anchor on them.
    pub fn clear_level_matched(&mut self, level: u32, implied: bool) {
        let adjustments: Vec<u32> = self
            .components
            .iter()
            .skip(1)
            .map(|next| next.combinator().level_adjustment())
            .chain(std::iter::once(0))
            .collect();
        for (component, adjustment) in self.components.iter_mut().zip(adjustments) {
            component.clear_level_matched(level + adjustment, implied);
        }
    }

    /// Forget all per-document state.
    pub fn reset(&mut self) {
        self.state = SelectorState::default();
        self.pending.clear();
        for component in &mut self.components {
            component.reset();
        }
    }
}
