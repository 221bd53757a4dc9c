//! Lifecycle action registry.
//!
//! Actions are objects that want to observe the run. They are registered for
//! one or more [`Phase`]s and invoked in registration order whenever that phase
//! is dispatched:
//!
//! | Phase         | Dispatched                                   |
//! |---------------|----------------------------------------------|
//! | `Start`       | before any spec file is loaded               |
//! | `Load`        | before a spec file is loaded                 |
//! | `Enter`       | before a describe block is run               |
//! | `Before`      | before a single example is run               |
//! | `Expectation` | when an example checks an expectation        |
//! | `After`       | after a single example is run                |
//! | `Leave`       | after a describe block is run                |
//! | `Unload`      | after a spec file is run                     |
//! | `Finish`      | after all spec files are run                 |
//!
//! `Include` and `Exclude` are filtering phases. Their actions are predicates
//! over an example's full description rather than observers.
//!
//! The registry never catches a fault returned by an action; callers decide how
//! to isolate it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;

use crate::errors::Fault;
use crate::runner::state::SpecState;

/// A registered action. Identity (the allocation) decides duplicates.
pub type SharedAction = Rc<RefCell<dyn Action>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Start,
    Load,
    Enter,
    Before,
    Expectation,
    After,
    Leave,
    Unload,
    Finish,
    Include,
    Exclude,
}

impl Phase {
    pub const ALL: [Phase; 11] = [
        Phase::Start,
        Phase::Load,
        Phase::Enter,
        Phase::Before,
        Phase::Expectation,
        Phase::After,
        Phase::Leave,
        Phase::Unload,
        Phase::Finish,
        Phase::Include,
        Phase::Exclude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Start => "start",
            Phase::Load => "load",
            Phase::Enter => "enter",
            Phase::Before => "before",
            Phase::Expectation => "expectation",
            Phase::After => "after",
            Phase::Leave => "leave",
            Phase::Unload => "unload",
            Phase::Finish => "finish",
            Phase::Include => "include",
            Phase::Exclude => "exclude",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dispatched lifecycle event together with its payload.
#[derive(Debug, Clone, Copy)]
pub enum Event<'a> {
    Start,
    Load(&'a Path),
    Enter(&'a str),
    Before(&'a SpecState),
    Expectation(&'a SpecState),
    After(&'a SpecState),
    Leave,
    Unload(&'a Path),
    Finish,
}

impl Event<'_> {
    pub fn phase(&self) -> Phase {
        match self {
            Event::Start => Phase::Start,
            Event::Load(_) => Phase::Load,
            Event::Enter(_) => Phase::Enter,
            Event::Before(_) => Phase::Before,
            Event::Expectation(_) => Phase::Expectation,
            Event::After(_) => Phase::After,
            Event::Leave => Phase::Leave,
            Event::Unload(_) => Phase::Unload,
            Event::Finish => Phase::Finish,
        }
    }
}

/// An observer of the run lifecycle.
///
/// Every method is named after the phase it handles and defaults to doing
/// nothing, so an action only implements the phases it registers for.
pub trait Action {
    fn start(&mut self) -> Result<(), Fault> {
        Ok(())
    }

    fn load(&mut self, _file: &Path) -> Result<(), Fault> {
        Ok(())
    }

    fn enter(&mut self, _description: &str) -> Result<(), Fault> {
        Ok(())
    }

    fn before(&mut self, _state: &SpecState) -> Result<(), Fault> {
        Ok(())
    }

    fn expectation(&mut self, _state: &SpecState) -> Result<(), Fault> {
        Ok(())
    }

    fn after(&mut self, _state: &SpecState) -> Result<(), Fault> {
        Ok(())
    }

    fn leave(&mut self) -> Result<(), Fault> {
        Ok(())
    }

    fn unload(&mut self, _file: &Path) -> Result<(), Fault> {
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Fault> {
        Ok(())
    }

    /// Returns true if the example should run.
    fn include(&self, _description: &str) -> bool {
        false
    }

    /// Returns true if the example should NOT run.
    fn exclude(&self, _description: &str) -> bool {
        false
    }
}

/// Ordered action lists keyed by phase.
#[derive(Default)]
pub struct ActionRegistry {
    slots: HashMap<Phase, Vec<SharedAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `action` to `phase` unless it is already registered there.
    ///
    /// Returns false when the action was already present.
    pub fn register(&mut self, phase: Phase, action: SharedAction) -> bool {
        let slot = self.slots.entry(phase).or_default();
        if slot.iter().any(|existing| same_action(existing, &action)) {
            return false;
        }
        slot.push(action);
        true
    }

    /// Removes `action` from `phase`. Returns false if it was not registered.
    pub fn unregister(&mut self, phase: Phase, action: &SharedAction) -> bool {
        let Some(slot) = self.slots.get_mut(&phase) else {
            return false;
        };
        let before = slot.len();
        slot.retain(|existing| !same_action(existing, action));
        slot.len() != before
    }

    pub fn actions(&self, phase: Phase) -> &[SharedAction] {
        self.slots.get(&phase).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_registered(&self, phase: Phase, action: &SharedAction) -> bool {
        self.actions(phase)
            .iter()
            .any(|existing| same_action(existing, action))
    }

    /// Invokes the phase-named method of every action registered for the
    /// event's phase, in registration order. Stops at the first fault.
    pub fn dispatch(&self, event: &Event<'_>) -> Result<(), Fault> {
        for action in self.actions(event.phase()) {
            let mut action = action.borrow_mut();
            match *event {
                Event::Start => action.start()?,
                Event::Load(file) => action.load(file)?,
                Event::Enter(description) => action.enter(description)?,
                Event::Before(state) => action.before(state)?,
                Event::Expectation(state) => action.expectation(state)?,
                Event::After(state) => action.after(state)?,
                Event::Leave => action.leave()?,
                Event::Unload(file) => action.unload(file)?,
                Event::Finish => action.finish()?,
            }
        }
        Ok(())
    }

    /// Returns true if the example described by `description` must not run.
    ///
    /// With include actions registered, at least one must accept the example.
    /// Any exclude action matching it filters it out.
    pub fn filtered(&self, description: &str) -> bool {
        let includes = self.actions(Phase::Include);
        if !includes.is_empty()
            && !includes
                .iter()
                .any(|action| action.borrow().include(description))
        {
            return true;
        }
        self.actions(Phase::Exclude)
            .iter()
            .any(|action| action.borrow().exclude(description))
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for phase in Phase::ALL {
            let count = self.actions(phase).len();
            if count > 0 {
                map.entry(&phase, &count);
            }
        }
        map.finish()
    }
}

fn same_action(a: &SharedAction, b: &SharedAction) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}
