//! Adds or removes tags based on example outcomes.
//!
//! `--add-tag fails` tags every example that faults so a later run can skip it;
//! `--del-tag fails` removes the tag from examples that now pass.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::debug;

use crate::errors::Fault;
use crate::runner::actions::{Action, Phase};
use crate::runner::mspec::MSpec;
use crate::runner::state::SpecState;
use crate::runner::tags::{SpecTag, TagStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOp {
    Add,
    Delete,
}

/// Which example outcomes the action applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagOutcome {
    Fail,
    Pass,
    All,
}

impl TagOutcome {
    fn accepts(self, state: &SpecState) -> bool {
        match self {
            TagOutcome::Fail => state.has_faults(),
            TagOutcome::Pass => !state.has_faults(),
            TagOutcome::All => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TagAction {
    op: TagOp,
    outcome: TagOutcome,
    tag: String,
    comment: Option<String>,
    store: TagStore,
    file: Option<PathBuf>,
    changed: Vec<String>,
}

impl TagAction {
    pub fn new(op: TagOp, outcome: TagOutcome, tag: impl Into<String>, store: TagStore) -> Self {
        TagAction {
            op,
            outcome,
            tag: tag.into(),
            comment: None,
            store,
            file: None,
            changed: Vec::new(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Descriptions whose tag was actually written or deleted.
    pub fn changed(&self) -> &[String] {
        &self.changed
    }

    /// Summary of the tags changed during the run, empty when none were.
    pub fn report(&self) -> String {
        if self.changed.is_empty() {
            return String::new();
        }
        let verb = match self.op {
            TagOp::Add => "tagged with",
            TagOp::Delete => "untagged from",
        };
        let mut out = format!("\nTagAction: specs {verb} '{}':\n\n", self.tag);
        for description in &self.changed {
            out.push_str(description);
            out.push('\n');
        }
        out
    }

    pub fn register(mut self, mspec: &mut MSpec) -> Rc<RefCell<Self>> {
        self.store = mspec.tag_store().clone();
        let shared = Rc::new(RefCell::new(self));
        mspec.register(Phase::Load, shared.clone());
        mspec.register(Phase::After, shared.clone());
        shared
    }

    fn spec_tag(&self, description: String) -> SpecTag {
        let tag = SpecTag::new(self.tag.as_str(), description);
        match &self.comment {
            Some(comment) => tag.with_comment(comment.as_str()),
            None => tag,
        }
    }
}

impl Action for TagAction {
    fn load(&mut self, file: &Path) -> Result<(), Fault> {
        self.file = Some(file.to_path_buf());
        Ok(())
    }

    fn after(&mut self, state: &SpecState) -> Result<(), Fault> {
        if !self.outcome.accepts(state) {
            return Ok(());
        }
        let Some(file) = self.file.as_deref() else {
            return Ok(());
        };

        let tag = self.spec_tag(state.description());
        let changed = match self.op {
            TagOp::Add => self.store.write_tag(file, &tag)?,
            TagOp::Delete => self.store.delete_tag(file, &tag)?,
        };
        if changed {
            debug!(op = ?self.op, tag = %tag, "tag file updated");
            self.changed.push(tag.description);
        }
        Ok(())
    }
}
