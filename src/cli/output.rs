//! Where user-facing output goes.
//!
//! The report is written through `termcolor`; colour is only used when stdout
//! is a terminal, and never when the report goes to a file.

use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use termcolor::{ColorChoice, NoColor, StandardStream, WriteColor};

use crate::errors::{Fault, MSpecError};
use crate::runner::actions::{Action, Phase};
use crate::runner::mspec::MSpec;

pub fn color_choice() -> ColorChoice {
    if atty::is(atty::Stream::Stdout) {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    }
}

/// The sink the formatter writes to: `path` when given, stdout otherwise.
pub fn report_sink(path: Option<&Path>) -> Result<Box<dyn WriteColor>, MSpecError> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| MSpecError::io("create", path, e))?;
            Ok(Box::new(NoColor::new(file)))
        }
        None => Ok(Box::new(StandardStream::stdout(color_choice()))),
    }
}

/// Prints the name of every spec file as it is loaded (`--verbose`).
pub struct FileAnnouncer<W: Write> {
    out: W,
}

impl<W: Write + 'static> FileAnnouncer<W> {
    pub fn new(out: W) -> Self {
        FileAnnouncer { out }
    }

    pub fn register(self, mspec: &mut MSpec) -> Rc<RefCell<Self>> {
        let shared = Rc::new(RefCell::new(self));
        mspec.register(Phase::Load, shared.clone());
        shared
    }
}

impl<W: Write> Action for FileAnnouncer<W> {
    fn load(&mut self, file: &Path) -> Result<(), Fault> {
        writeln!(self.out, "{}", file.display())?;
        Ok(())
    }
}
