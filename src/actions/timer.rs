//! Wall-clock duration of a run.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::errors::Fault;
use crate::runner::actions::{Action, Phase};
use crate::runner::mspec::MSpec;

#[derive(Debug, Default)]
pub struct TimerAction {
    started: Option<Instant>,
    elapsed: Duration,
}

impl TimerAction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// `"Finished in X.XXXXXX seconds"`.
    pub fn format(&self) -> String {
        format!("Finished in {:.6} seconds", self.elapsed.as_secs_f64())
    }

    pub fn register(self, mspec: &mut MSpec) -> Rc<RefCell<Self>> {
        let shared = Rc::new(RefCell::new(self));
        mspec.register(Phase::Start, shared.clone());
        mspec.register(Phase::Finish, shared.clone());
        shared
    }
}

impl Action for TimerAction {
    fn start(&mut self) -> Result<(), Fault> {
        self.started = Some(Instant::now());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Fault> {
        if let Some(started) = self.started {
            self.elapsed = started.elapsed();
        }
        Ok(())
    }
}
