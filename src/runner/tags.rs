//! Tag file persistence.
//!
//! Every spec file has a companion tag file holding one [`SpecTag`] per line:
//!
//! ```text
//! fails:Array#push appends to the end
//! fails(slow on CI):Array#sort sorts a large array
//! ```
//!
//! The tag file path is derived from the spec file path by applying an ordered
//! list of regex rewrite rules. The defaults map
//! `path/to/spec/class/method_spec.rb` to
//! `path/to/spec/tags/class/method_tags.txt`.
//!
//! A missing tag file is always treated as empty.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::errors::MSpecError;

/// Default `(pattern, replacement)` rules, applied in order.
pub const DEFAULT_TAGS_PATTERNS: [(&str, &str); 2] =
    [("spec/", "spec/tags/"), (r"_spec\.\w+$", "_tags.txt")];

static DEFAULT_RULES: Lazy<Vec<RewriteRule>> = Lazy::new(|| {
    DEFAULT_TAGS_PATTERNS
        .iter()
        .map(|(pattern, replacement)| {
            RewriteRule::new(pattern, replacement).expect("default tag patterns are valid")
        })
        .collect()
});

static TAG_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^:()#]+)(\(([^)]*)\))?:(.*)$").expect("tag line pattern is valid")
});

// ============================================================================
// SPEC TAG
// ============================================================================

/// A persisted marker on one example: a kind such as `fails`, an optional
/// comment, and the example's full description.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecTag {
    pub tag: String,
    pub comment: Option<String>,
    pub description: String,
}

impl SpecTag {
    pub fn new(tag: impl Into<String>, description: impl Into<String>) -> Self {
        SpecTag {
            tag: tag.into(),
            comment: None,
            description: description.into(),
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Parses one tag file line. Returns `None` for lines that are not tags.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = TAG_LINE.captures(line)?;
        let comment = caps
            .get(3)
            .map(|m| m.as_str().to_string())
            .filter(|c| !c.is_empty());
        Some(SpecTag {
            tag: caps[1].to_string(),
            comment,
            description: caps[4].to_string(),
        })
    }
}

impl fmt::Display for SpecTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.comment {
            Some(comment) => write!(f, "{}({}):{}", self.tag, comment, self.description),
            None => write!(f, "{}:{}", self.tag, self.description),
        }
    }
}

// ============================================================================
// TAG STORE
// ============================================================================

#[derive(Debug, Clone)]
struct RewriteRule {
    pattern: Regex,
    replacement: String,
}

impl RewriteRule {
    fn new(pattern: &str, replacement: &str) -> Result<Self, MSpecError> {
        let regex = Regex::new(pattern).map_err(|source| MSpecError::TagPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(RewriteRule {
            pattern: regex,
            replacement: replacement.to_string(),
        })
    }
}

/// Reads and writes the tag files that belong to spec files.
#[derive(Debug, Clone)]
pub struct TagStore {
    rules: Vec<RewriteRule>,
}

impl Default for TagStore {
    fn default() -> Self {
        TagStore {
            rules: DEFAULT_RULES.clone(),
        }
    }
}

impl TagStore {
    /// Builds a store from `(pattern, replacement)` rules.
    pub fn new<P, R>(patterns: &[(P, R)]) -> Result<Self, MSpecError>
    where
        P: AsRef<str>,
        R: AsRef<str>,
    {
        let rules = patterns
            .iter()
            .map(|(pattern, replacement)| RewriteRule::new(pattern.as_ref(), replacement.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TagStore { rules })
    }

    /// Rules that send every tag file under `dir`, keeping the spec-relative layout.
    pub fn for_tags_dir(dir: &Path) -> Result<Self, MSpecError> {
        let dir = dir.to_string_lossy();
        let dir = dir.trim_end_matches('/');
        // `$` in a replacement starts a capture reference.
        let replacement = format!("{}/", dir.replace('$', "$$"));
        TagStore::new(&[
            (r"^(.*/)?spec/", replacement.as_str()),
            (DEFAULT_TAGS_PATTERNS[1].0, DEFAULT_TAGS_PATTERNS[1].1),
        ])
    }

    /// Derives the tag file path for `spec`. Each rule rewrites the output of
    /// the previous one.
    pub fn tags_file(&self, spec: &Path) -> PathBuf {
        let mut file = spec.to_string_lossy().into_owned();
        for rule in &self.rules {
            file = rule
                .pattern
                .replace_all(&file, rule.replacement.as_str())
                .into_owned();
        }
        PathBuf::from(file)
    }

    /// Returns every tag for `spec` whose kind is one of `kinds`.
    pub fn read_tags<S: AsRef<str>>(
        &self,
        spec: &Path,
        kinds: &[S],
    ) -> Result<Vec<SpecTag>, MSpecError> {
        let file = self.tags_file(spec);
        let Some(content) = read_optional(&file)? else {
            return Ok(Vec::new());
        };
        let tags = content
            .lines()
            .filter_map(|line| {
                let tag = SpecTag::parse(line);
                if tag.is_none() {
                    trace!(file = %file.display(), line, "skipping unparsable tag line");
                }
                tag
            })
            .filter(|tag| kinds.iter().any(|kind| kind.as_ref() == tag.tag))
            .collect();
        Ok(tags)
    }

    /// Appends `tag` to the tag file for `spec`.
    ///
    /// Returns false without writing when an identical line already exists.
    pub fn write_tag(&self, spec: &Path, tag: &SpecTag) -> Result<bool, MSpecError> {
        let line = tag.to_string();
        let file = self.tags_file(spec);
        if let Some(dir) = file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| MSpecError::io("create", dir, e))?;
        }

        let existing = read_optional(&file)?.unwrap_or_default();
        if existing.lines().any(|existing| existing == line) {
            return Ok(false);
        }

        let mut out = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
            .map_err(|e| MSpecError::io("open", &file, e))?;
        let separator = if existing.is_empty() || existing.ends_with('\n') {
            ""
        } else {
            "\n"
        };
        writeln!(out, "{separator}{line}").map_err(|e| MSpecError::io("write", &file, e))?;
        debug!(file = %file.display(), tag = %line, "wrote tag");
        Ok(true)
    }

    /// Removes every line naming `tag.tag` followed by `tag.description`.
    ///
    /// The description is matched literally. A tag file left empty is removed.
    /// Returns whether any line was deleted.
    pub fn delete_tag(&self, spec: &Path, tag: &SpecTag) -> Result<bool, MSpecError> {
        let source = format!(
            "{}.*{}",
            regex::escape(&tag.tag),
            regex::escape(&tag.description)
        );
        let pattern = Regex::new(&source).map_err(|source_err| MSpecError::TagPattern {
            pattern: source.clone(),
            source: source_err,
        })?;

        let file = self.tags_file(spec);
        let Some(content) = read_optional(&file)? else {
            return Ok(false);
        };

        let (removed, kept): (Vec<&str>, Vec<&str>) =
            content.lines().partition(|line| pattern.is_match(line));

        if kept.is_empty() {
            fs::remove_file(&file).map_err(|e| MSpecError::io("remove", &file, e))?;
        } else if !removed.is_empty() {
            let mut rewritten = kept.join("\n");
            rewritten.push('\n');
            fs::write(&file, rewritten).map_err(|e| MSpecError::io("write", &file, e))?;
        }

        if !removed.is_empty() {
            debug!(file = %file.display(), count = removed.len(), "deleted tags");
        }
        Ok(!removed.is_empty())
    }
}

/// Reads `path`, mapping a missing file to `None`.
fn read_optional(path: &Path) -> Result<Option<String>, MSpecError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MSpecError::io("read", path, e)),
    }
}
