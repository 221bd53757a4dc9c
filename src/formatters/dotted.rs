//! The default progress formatter.
//!
//! Prints one character per example while the run progresses:
//!
//! - `.` the example passed
//! - `F` every fault the example raised was an unmet expectation
//! - `E` the example raised any other fault
//!
//! and, when the run finishes, every fault in detail followed by the timer and
//! tally lines.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use termcolor::{Color, ColorSpec, WriteColor};

use crate::actions::{Tally, TallyAction, TimerAction};
use crate::errors::{Fault, EXPECTATION_NOT_MET};
use crate::runner::actions::{Action, Phase};
use crate::runner::mspec::MSpec;
use crate::runner::state::SpecState;

pub struct DottedFormatter<W: WriteColor> {
    out: W,
    states: Vec<SpecState>,
    timer: Option<Rc<RefCell<TimerAction>>>,
    tally: Option<Rc<RefCell<TallyAction>>>,
}

impl<W: WriteColor + 'static> DottedFormatter<W> {
    pub fn new(out: W) -> Self {
        DottedFormatter {
            out,
            states: Vec::new(),
            timer: None,
            tally: None,
        }
    }

    /// Registers a timer and a tally ahead of the formatter so both are
    /// complete by the time it prints its summary.
    pub fn register(mut self, mspec: &mut MSpec) -> Rc<RefCell<Self>> {
        self.timer = Some(TimerAction::new().register(mspec));
        self.tally = Some(TallyAction::new().register(mspec));
        let shared = Rc::new(RefCell::new(self));
        mspec.register(Phase::After, shared.clone());
        mspec.register(Phase::Finish, shared.clone());
        shared
    }
}

impl<W: WriteColor> DottedFormatter<W> {
    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn tally(&self) -> Tally {
        self.tally
            .as_ref()
            .map(|tally| tally.borrow().counter())
            .unwrap_or_default()
    }

    fn progress(&mut self, mark: &str, color: Option<Color>) -> std::io::Result<()> {
        let colored = color.is_some();
        if colored {
            self.out.set_color(ColorSpec::new().set_fg(color))?;
        }
        write!(self.out, "{mark}")?;
        if colored {
            self.out.reset()?;
        }
        self.out.flush()
    }

    fn summary_lines(&self) -> (String, String) {
        let timer = self
            .timer
            .as_ref()
            .map(|timer| timer.borrow().format())
            .unwrap_or_else(|| TimerAction::new().format());
        (timer, self.tally().format())
    }
}

impl<W: WriteColor> Action for DottedFormatter<W> {
    fn after(&mut self, state: &SpecState) -> Result<(), Fault> {
        if !state.has_faults() {
            self.progress(".", None)?;
            return Ok(());
        }
        let mark = if state.is_failure() { "F" } else { "E" };
        self.progress(mark, Some(Color::Red))?;
        self.states.push(state.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Fault> {
        writeln!(self.out)?;
        let mut count = 0;
        for state in &self.states {
            let outcome = if state.is_failure() { "FAILED" } else { "ERROR" };
            for (label, fault) in state.faults() {
                count += 1;
                write!(self.out, "\n{count})\n")?;
                self.out
                    .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
                write!(self.out, "{} {outcome}", state.description())?;
                self.out.reset()?;
                writeln!(self.out)?;
                writeln!(self.out, "{} occurred during: {label}", fault.class())?;
                writeln!(self.out, "{}", message(fault))?;
                writeln!(self.out, "{}", fault.backtrace().unwrap_or_default())?;
            }
        }
        let (timer, tally) = self.summary_lines();
        write!(self.out, "\n{timer}\n\n{tally}\n")?;
        self.out.flush()?;
        Ok(())
    }
}

fn message(fault: &Fault) -> String {
    if fault.message().is_empty() {
        "<No message>".to_string()
    } else if fault.class() == EXPECTATION_NOT_MET {
        fault.message().to_string()
    } else {
        format!("{}: {}", fault.class(), fault.message())
    }
}
