//! Describe scopes, example states, and the stack that nests them.

use std::fmt;

use crate::errors::Fault;
use crate::runner::mspec::MSpec;

/// User code run by the kernel: describe bodies, examples, and hooks.
pub type Block = Box<dyn FnMut(&mut MSpec) -> Result<(), Fault>>;

/// A captured fault with the context it was raised in (`"it"`, `"before :each"`, ...).
pub type CapturedFault = (String, Fault);

/// True when every captured fault is an unmet expectation.
///
/// An empty list is failure-style by vacuous truth. That case is never
/// reported because a state without faults passed.
pub fn all_expectations(faults: &[CapturedFault]) -> bool {
    faults.iter().all(|(_, fault)| fault.is_expectation())
}

// ============================================================================
// SPEC STATE - one example
// ============================================================================

/// The outcome of a single example, handed to `before`, `expectation`, and
/// `after` actions.
#[derive(Debug, Clone)]
pub struct SpecState {
    describe: String,
    it: String,
    faults: Vec<CapturedFault>,
}

impl SpecState {
    pub fn new(describe: impl Into<String>, it: impl Into<String>) -> Self {
        SpecState {
            describe: describe.into(),
            it: it.into(),
            faults: Vec::new(),
        }
    }

    /// The enclosing describe description.
    pub fn describe(&self) -> &str {
        &self.describe
    }

    /// The example's own description.
    pub fn it(&self) -> &str {
        &self.it
    }

    /// The full description used for filtering and tagging.
    pub fn description(&self) -> String {
        if self.describe.is_empty() {
            return self.it.clone();
        }
        format!("{} {}", self.describe, self.it)
    }

    pub fn record_fault(&mut self, label: impl Into<String>, fault: Fault) {
        self.faults.push((label.into(), fault));
    }

    pub fn faults(&self) -> &[CapturedFault] {
        &self.faults
    }

    pub fn has_faults(&self) -> bool {
        !self.faults.is_empty()
    }

    /// Failure (only unmet expectations) as opposed to error.
    pub fn is_failure(&self) -> bool {
        all_expectations(&self.faults)
    }
}

// ============================================================================
// RUN STATE - one describe scope
// ============================================================================

/// Before/after hooks registered inside a describe block.
#[derive(Default)]
pub(crate) struct Hooks {
    pub(crate) before_all: Vec<Block>,
    pub(crate) before_each: Vec<Block>,
    pub(crate) after_each: Vec<Block>,
    pub(crate) after_all: Vec<Block>,
}

pub(crate) struct Example {
    pub(crate) description: String,
    pub(crate) body: Block,
}

/// Which runs of a hook: once per describe or once per example.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Each,
}

/// Execution context of one describe scope.
pub struct RunState {
    description: String,
    parent: Option<usize>,
    faults: Vec<CapturedFault>,
    pub(crate) examples: Vec<Example>,
    pub(crate) hooks: Hooks,
    pub(crate) state: Option<SpecState>,
}

impl RunState {
    fn new(description: String, parent: Option<usize>) -> Self {
        RunState {
            description,
            parent,
            faults: Vec::new(),
            examples: Vec::new(),
            hooks: Hooks::default(),
            state: None,
        }
    }

    /// Full description, including every enclosing describe.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Stack index of the enclosing describe scope.
    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// The example currently running in this scope.
    pub fn spec_state(&self) -> Option<&SpecState> {
        self.state.as_ref()
    }

    /// Attributes a fault to the running example, or to the scope itself when
    /// no example is running.
    pub fn record_fault(&mut self, label: impl Into<String>, fault: Fault) {
        match self.state.as_mut() {
            Some(state) => state.record_fault(label, fault),
            None => self.faults.push((label.into(), fault)),
        }
    }

    /// Faults raised in this scope outside any example.
    pub fn faults(&self) -> &[CapturedFault] {
        &self.faults
    }

    pub fn is_failure(&self) -> bool {
        all_expectations(&self.faults)
    }

    pub(crate) fn add_example(&mut self, description: String, body: Block) {
        self.examples.push(Example { description, body });
    }

    pub(crate) fn add_hook(&mut self, when: HookPoint, scope: Scope, block: Block) {
        let hooks = &mut self.hooks;
        let list = match (when, scope) {
            (HookPoint::Before, Scope::All) => &mut hooks.before_all,
            (HookPoint::Before, Scope::Each) => &mut hooks.before_each,
            (HookPoint::After, Scope::Each) => &mut hooks.after_each,
            (HookPoint::After, Scope::All) => &mut hooks.after_all,
        };
        list.push(block);
    }
}

impl fmt::Debug for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunState")
            .field("description", &self.description)
            .field("parent", &self.parent)
            .field("faults", &self.faults)
            .field("examples", &self.examples.len())
            .field("state", &self.state)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HookPoint {
    Before,
    After,
}

// ============================================================================
// STATE STACK
// ============================================================================

/// Nested describe scopes. The top of the stack is the current scope.
#[derive(Debug, Default)]
pub struct StateStack {
    frames: Vec<RunState>,
}

impl StateStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a scope nested in the current one and makes it current.
    pub fn push(&mut self, description: impl Into<String>) -> &mut RunState {
        let description = description.into();
        let parent = self.frames.len().checked_sub(1);
        let full = match self.current() {
            Some(outer) if !outer.description().is_empty() => {
                format!("{} {}", outer.description(), description)
            }
            _ => description,
        };
        self.frames.push(RunState::new(full, parent));
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    pub fn pop(&mut self) -> Option<RunState> {
        self.frames.pop()
    }

    pub fn current(&self) -> Option<&RunState> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut RunState> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Pops every scope above `depth`, innermost first.
    pub fn unwind_to(&mut self, depth: usize) -> Vec<RunState> {
        let mut popped = Vec::new();
        while self.frames.len() > depth {
            if let Some(frame) = self.frames.pop() {
                popped.push(frame);
            }
        }
        popped
    }
}
