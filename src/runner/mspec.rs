//! The execution kernel.
//!
//! [`MSpec`] owns everything a run needs: the configuration, the action
//! registry, the describe-scope stack, the tag store, and the exit code.
//! The single entry point is [`MSpec::process`]:
//!
//! ```text
//! start actions -> for each file: load actions, load file, unload actions -> finish actions
//! ```
//!
//! Spec code never aborts the run. Every piece of user code runs through
//! [`MSpec::protect`], which turns a returned fault or a panic into a record
//! on the current state (or a diagnostic when there is no state) and carries on.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, trace, warn};

use crate::errors::{Fault, MSpecError};
use crate::runner::actions::{ActionRegistry, Event, Phase, SharedAction};
use crate::runner::config::{Config, Mode};
use crate::runner::loader::SpecLoader;
use crate::runner::panics;
use crate::runner::shuffle::{seeded_rng, shuffle};
use crate::runner::state::{Block, HookPoint, RunState, Scope, SpecState, StateStack};
use crate::runner::tags::{SpecTag, TagStore};

pub struct MSpec {
    config: Config,
    tags: TagStore,
    actions: ActionRegistry,
    stack: StateStack,
    exit: i32,
    file: Option<PathBuf>,
    seed: Option<u64>,
    diagnostics: Box<dyn Write>,
}

impl Default for MSpec {
    fn default() -> Self {
        MSpec {
            config: Config::default(),
            tags: TagStore::default(),
            actions: ActionRegistry::new(),
            stack: StateStack::new(),
            exit: 0,
            file: None,
            seed: None,
            diagnostics: Box::new(io::stderr()),
        }
    }
}

impl MSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a kernel from a config, compiling its tag patterns.
    pub fn with_config(config: Config) -> Result<Self, MSpecError> {
        let mut mspec = MSpec::new();
        mspec.register_tags_patterns(&config.tags_patterns)?;
        mspec.config = config;
        Ok(mspec)
    }

    // ========================================================================
    // CONFIGURATION
    // ========================================================================

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn register_files<I, P>(&mut self, files: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config.files = files.into_iter().map(Into::into).collect();
    }

    /// Replaces the tag file rewrite rules. An empty list restores the defaults.
    pub fn register_tags_patterns<P, R>(&mut self, patterns: &[(P, R)]) -> Result<(), MSpecError>
    where
        P: AsRef<str>,
        R: AsRef<str>,
    {
        self.config.tags_patterns = patterns
            .iter()
            .map(|(p, r)| (p.as_ref().to_string(), r.as_ref().to_string()))
            .collect();
        self.tags = if patterns.is_empty() {
            TagStore::default()
        } else {
            TagStore::new(patterns)?
        };
        Ok(())
    }

    pub fn register_tag_store(&mut self, store: TagStore) {
        self.tags = store;
    }

    pub fn tag_store(&self) -> &TagStore {
        &self.tags
    }

    pub fn register_mode(&mut self, mode: Mode) {
        self.config.mode = mode;
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    pub fn verify_mode(&self) -> bool {
        self.config.mode == Mode::Verify
    }

    pub fn report_mode(&self) -> bool {
        self.config.mode == Mode::Report
    }

    pub fn pretend_mode(&self) -> bool {
        self.config.mode == Mode::Pretend
    }

    pub fn randomize(&mut self, flag: bool) {
        self.config.randomize = flag;
    }

    pub fn register_seed(&mut self, seed: u64) {
        self.config.seed = Some(seed);
    }

    /// The seed the last randomized run shuffled with.
    pub fn shuffle_seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn register_exit(&mut self, code: i32) {
        self.exit = code;
    }

    pub fn exit_code(&self) -> i32 {
        self.exit
    }

    /// Redirects the diagnostics written for faults outside any describe scope.
    pub fn register_diagnostics(&mut self, out: Box<dyn Write>) {
        self.diagnostics = out;
    }

    // ========================================================================
    // ACTIONS
    // ========================================================================

    /// Registers `action` for `phase`. Registering it twice is a no-op.
    pub fn register(&mut self, phase: Phase, action: SharedAction) -> bool {
        self.actions.register(phase, action)
    }

    pub fn unregister(&mut self, phase: Phase, action: &SharedAction) -> bool {
        self.actions.unregister(phase, action)
    }

    pub fn action_registry(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Dispatches `event` to its phase's actions. Faults are not isolated here.
    pub fn actions(&self, event: &Event<'_>) -> Result<(), Fault> {
        trace!(phase = %event.phase(), "dispatching actions");
        self.actions.dispatch(event)
    }

    /// Signals that the running example checked an expectation.
    pub fn expectation(&mut self) -> Result<(), Fault> {
        match self.stack.current().and_then(RunState::spec_state) {
            Some(state) => self.actions.dispatch(&Event::Expectation(state)),
            None => Ok(()),
        }
    }

    // ========================================================================
    // DESCRIBE SCOPES
    // ========================================================================

    /// The innermost describe scope, if any.
    pub fn current(&self) -> Option<&RunState> {
        self.stack.current()
    }

    pub fn stack(&self) -> &StateStack {
        &self.stack
    }

    /// Runs a describe scope: `block` registers examples and hooks (and may
    /// nest further scopes), then the examples run, then the scope is popped.
    ///
    /// Returns a fault raised by an action during the scope. Faults raised by
    /// spec code are captured instead.
    pub fn describe<F>(&mut self, description: impl Into<String>, block: F) -> Result<(), Fault>
    where
        F: FnOnce(&mut MSpec) -> Result<(), Fault>,
    {
        let depth = self.stack.depth();
        let frame = self.stack.push(description);
        debug!(describe = frame.description(), "entering describe");

        self.protect("describe", block);
        let result = self.process_current();
        self.close_scopes(depth);
        result
    }

    /// Adds an example to the current describe scope.
    pub fn it<F>(&mut self, description: impl Into<String>, body: F) -> Result<(), Fault>
    where
        F: FnMut(&mut MSpec) -> Result<(), Fault> + 'static,
    {
        let frame = self.current_scope("it")?;
        frame.add_example(description.into(), Box::new(body));
        Ok(())
    }

    /// Adds a hook that runs before every example (`Scope::Each`) or once
    /// before the scope's examples (`Scope::All`).
    pub fn before<F>(&mut self, scope: Scope, block: F) -> Result<(), Fault>
    where
        F: FnMut(&mut MSpec) -> Result<(), Fault> + 'static,
    {
        let frame = self.current_scope("before")?;
        frame.add_hook(HookPoint::Before, scope, Box::new(block));
        Ok(())
    }

    pub fn after<F>(&mut self, scope: Scope, block: F) -> Result<(), Fault>
    where
        F: FnMut(&mut MSpec) -> Result<(), Fault> + 'static,
    {
        let frame = self.current_scope("after")?;
        frame.add_hook(HookPoint::After, scope, Box::new(block));
        Ok(())
    }

    fn current_scope(&mut self, caller: &str) -> Result<&mut RunState, Fault> {
        self.stack.current_mut().ok_or_else(|| {
            Fault::error(
                "DescribeError",
                format!("`{caller}` called outside of a describe block"),
            )
        })
    }

    /// Runs the examples registered on the current scope.
    fn process_current(&mut self) -> Result<(), Fault> {
        let Some(frame) = self.stack.current_mut() else {
            return Ok(());
        };
        let description = frame.description().to_string();
        let mut examples = std::mem::take(&mut frame.examples);
        let mut hooks = std::mem::take(&mut frame.hooks);
        let pretend = self.pretend_mode();

        self.actions(&Event::Enter(&description))?;
        if !examples.is_empty() {
            let ready = pretend || self.run_hooks("before :all", &mut hooks.before_all);
            if !ready {
                debug!(describe = %description, "before :all faulted, skipping examples");
                examples.clear();
            }

            for example in &mut examples {
                let state = SpecState::new(&description, &example.description);
                if self.actions.filtered(&state.description()) {
                    trace!(example = %state.description(), "filtered out");
                    continue;
                }

                self.begin_example(state);
                if let Some(state) = self.running_example() {
                    self.actions.dispatch(&Event::Before(state))?;
                }

                if !pretend {
                    if self.run_hooks("before :each", &mut hooks.before_each) {
                        self.protect("it", |m| (example.body)(m));
                    }
                    self.run_hooks("after :each", &mut hooks.after_each);
                }

                if let Some(state) = self.end_example() {
                    self.actions(&Event::After(&state))?;
                }
            }

            if !pretend {
                self.run_hooks("after :all", &mut hooks.after_all);
            }
        }
        self.actions(&Event::Leave)
    }

    /// Runs hooks in order, stopping at the first one that faults.
    fn run_hooks(&mut self, label: &str, hooks: &mut [Block]) -> bool {
        hooks.iter_mut().all(|hook| self.protect(label, |m| hook(m)))
    }

    fn begin_example(&mut self, state: SpecState) {
        if let Some(frame) = self.stack.current_mut() {
            frame.state = Some(state);
        }
    }

    fn running_example(&self) -> Option<&SpecState> {
        self.stack.current().and_then(RunState::spec_state)
    }

    fn end_example(&mut self) -> Option<SpecState> {
        self.stack.current_mut().and_then(|frame| frame.state.take())
    }

    /// Pops every scope above `depth`. Faults a scope collected outside its
    /// examples have no report to go to, so they go to the diagnostics.
    fn close_scopes(&mut self, depth: usize) {
        for frame in self.stack.unwind_to(depth) {
            debug!(describe = frame.description(), "leaving describe");
            for (label, fault) in frame.faults() {
                let label = format!("{} ({label})", frame.description());
                self.write_diagnostic(&label, fault);
            }
        }
    }

    // ========================================================================
    // PROTECTED EXECUTION
    // ========================================================================

    /// Runs `block`, isolating any fault it raises or panic it throws.
    ///
    /// On a fault the exit code becomes 1 and the fault is recorded on the
    /// current state, or written to the diagnostics when there is none.
    /// Returns true if the block completed cleanly.
    pub fn protect<F>(&mut self, label: &str, block: F) -> bool
    where
        F: FnOnce(&mut MSpec) -> Result<(), Fault>,
    {
        let depth = self.stack.depth();
        let fault = match panics::catch(|| block(&mut *self)) {
            Ok(Ok(())) => return true,
            Ok(Err(fault)) | Err(fault) => fault,
        };

        self.close_scopes(depth);
        self.register_exit(1);
        debug!(label, class = fault.class(), message = fault.message(), "captured fault");
        match self.stack.current_mut() {
            Some(frame) => frame.record_fault(label, fault),
            None => self.write_diagnostic(label, &fault),
        }
        false
    }

    fn write_diagnostic(&mut self, label: &str, fault: &Fault) {
        let mut text = format!(
            "\nAn exception occurred in {label}:\n{}: {:?}\n",
            fault.class(),
            fault.message()
        );
        if let Some(trace) = fault.backtrace() {
            text.push_str(trace);
        }
        if let Err(e) = self.diagnostics.write_all(text.as_bytes()) {
            warn!("failed to write diagnostic: {e}");
        }
    }

    // ========================================================================
    // FILE PIPELINE
    // ========================================================================

    /// Runs the whole suite: start actions, every file, finish actions.
    pub fn process<L: SpecLoader + ?Sized>(&mut self, loader: &L) {
        self.protect_actions("start actions", &Event::Start);
        self.files(loader);
        self.protect_actions("finish actions", &Event::Finish);
    }

    /// Loads every registered file, shuffled when randomization is on.
    ///
    /// A file that faults still gets its unload actions, and the next file
    /// still runs.
    pub fn files<L: SpecLoader + ?Sized>(&mut self, loader: &L) {
        let mut files = self.config.files.clone();
        if self.config.randomize {
            let seed = self.config.seed.unwrap_or_else(rand::random);
            debug!(seed, "shuffling spec files");
            shuffle(&mut files, &mut seeded_rng(seed));
            self.seed = Some(seed);
        }

        for file in &files {
            debug!(file = %file.display(), "loading spec file");
            self.file = Some(file.clone());
            self.protect_actions("load actions", &Event::Load(file));
            self.protect(&format!("loading {}", file.display()), |m| {
                loader.load(file, m)
            });
            self.protect_actions("unload actions", &Event::Unload(file));
        }
        self.file = None;
    }

    fn protect_actions(&mut self, label: &str, event: &Event<'_>) {
        self.protect(label, |m| m.actions(event));
    }

    /// The spec file being processed.
    pub fn current_file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    // ========================================================================
    // TAGS FOR THE CURRENT FILE
    // ========================================================================

    /// Tag file of the spec file being processed.
    pub fn tags_file(&self) -> Option<PathBuf> {
        self.file.as_deref().map(|file| self.tags.tags_file(file))
    }

    pub fn read_tags<S: AsRef<str>>(&self, kinds: &[S]) -> Result<Vec<SpecTag>, MSpecError> {
        match self.file.as_deref() {
            Some(file) => self.tags.read_tags(file, kinds),
            None => Ok(Vec::new()),
        }
    }

    pub fn write_tag(&self, tag: &SpecTag) -> Result<bool, MSpecError> {
        match self.file.as_deref() {
            Some(file) => self.tags.write_tag(file, tag),
            None => Ok(false),
        }
    }

    pub fn delete_tag(&self, tag: &SpecTag) -> Result<bool, MSpecError> {
        match self.file.as_deref() {
            Some(file) => self.tags.delete_tag(file, tag),
            None => Ok(false),
        }
    }
}

impl fmt::Debug for MSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MSpec")
            .field("config", &self.config)
            .field("actions", &self.actions)
            .field("stack", &self.stack)
            .field("exit", &self.exit)
            .field("file", &self.file)
            .finish_non_exhaustive()
    }
}
