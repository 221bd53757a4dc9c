//! Counts files, examples, expectations, failures, and errors.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use crate::errors::Fault;
use crate::runner::actions::{Action, Phase};
use crate::runner::mspec::MSpec;
use crate::runner::state::SpecState;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub files: usize,
    pub examples: usize,
    pub expectations: usize,
    pub failures: usize,
    pub errors: usize,
}

impl Tally {
    /// `"N files, N examples, N expectations, N failures, N errors"`.
    pub fn format(&self) -> String {
        [
            pluralize(self.files, "file"),
            pluralize(self.examples, "example"),
            pluralize(self.expectations, "expectation"),
            pluralize(self.failures, "failure"),
            pluralize(self.errors, "error"),
        ]
        .join(", ")
    }
}

fn pluralize(count: usize, singular: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {singular}s")
    }
}

#[derive(Debug, Default)]
pub struct TallyAction {
    counter: Tally,
}

impl TallyAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self) -> Tally {
        self.counter
    }

    pub fn format(&self) -> String {
        self.counter.format()
    }

    pub fn register(self, mspec: &mut MSpec) -> Rc<RefCell<Self>> {
        let shared = Rc::new(RefCell::new(self));
        mspec.register(Phase::Load, shared.clone());
        mspec.register(Phase::Expectation, shared.clone());
        mspec.register(Phase::After, shared.clone());
        shared
    }
}

impl Action for TallyAction {
    fn load(&mut self, _file: &Path) -> Result<(), Fault> {
        self.counter.files += 1;
        Ok(())
    }

    fn expectation(&mut self, _state: &SpecState) -> Result<(), Fault> {
        self.counter.expectations += 1;
        Ok(())
    }

    fn after(&mut self, state: &SpecState) -> Result<(), Fault> {
        self.counter.examples += 1;
        if state.has_faults() {
            if state.is_failure() {
                self.counter.failures += 1;
            } else {
                self.counter.errors += 1;
            }
        }
        Ok(())
    }
}
