//! Include/exclude filters over example descriptions.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use tracing::trace;

use crate::errors::Fault;
use crate::runner::actions::{Action, Phase};
use crate::runner::mspec::MSpec;
use crate::runner::tags::TagStore;

/// Whether a filter selects the examples it matches or removes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Include,
    Exclude,
}

impl FilterKind {
    fn phase(self) -> Phase {
        match self {
            FilterKind::Include => Phase::Include,
            FilterKind::Exclude => Phase::Exclude,
        }
    }
}

// ============================================================================
// MATCH FILTER
// ============================================================================

/// Matches examples whose full description contains any of its patterns.
#[derive(Debug, Clone)]
pub struct MatchFilter {
    kind: FilterKind,
    patterns: Vec<String>,
}

impl MatchFilter {
    pub fn new<I, S>(kind: FilterKind, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        MatchFilter {
            kind,
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn matches(&self, description: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| description.contains(pattern.as_str()))
    }

    pub fn register(self, mspec: &mut MSpec) -> Rc<RefCell<Self>> {
        let phase = self.kind.phase();
        let shared = Rc::new(RefCell::new(self));
        mspec.register(phase, shared.clone());
        shared
    }
}

impl Action for MatchFilter {
    fn include(&self, description: &str) -> bool {
        self.matches(description)
    }

    fn exclude(&self, description: &str) -> bool {
        self.matches(description)
    }
}

// ============================================================================
// TAG FILTER
// ============================================================================

/// Matches examples tagged with any of its tag kinds in the current file's
/// tag file. The tags are reread on every `load`.
#[derive(Debug, Clone)]
pub struct TagFilter {
    kind: FilterKind,
    tags: Vec<String>,
    store: TagStore,
    descriptions: Vec<String>,
}

impl TagFilter {
    pub fn new<I, S>(kind: FilterKind, tags: I, store: TagStore) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TagFilter {
            kind,
            tags: tags.into_iter().map(Into::into).collect(),
            store,
            descriptions: Vec::new(),
        }
    }

    /// Descriptions tagged in the file loaded last.
    pub fn descriptions(&self) -> &[String] {
        &self.descriptions
    }

    pub fn matches(&self, description: &str) -> bool {
        self.descriptions.iter().any(|tagged| tagged == description)
    }

    /// Registers for `load` and the filter's own phase, reading tag files
    /// through the kernel's current tag store.
    pub fn register(mut self, mspec: &mut MSpec) -> Rc<RefCell<Self>> {
        self.store = mspec.tag_store().clone();
        let phase = self.kind.phase();
        let shared = Rc::new(RefCell::new(self));
        mspec.register(Phase::Load, shared.clone());
        mspec.register(phase, shared.clone());
        shared
    }
}

impl Action for TagFilter {
    fn load(&mut self, file: &Path) -> Result<(), Fault> {
        self.descriptions = self
            .store
            .read_tags(file, &self.tags)?
            .into_iter()
            .map(|tag| tag.description)
            .collect();
        trace!(
            file = %file.display(),
            tagged = self.descriptions.len(),
            "read tags for filter"
        );
        Ok(())
    }

    fn include(&self, description: &str) -> bool {
        self.matches(description)
    }

    fn exclude(&self, description: &str) -> bool {
        self.matches(description)
    }
}
