//! Spec file loading.
//!
//! A spec file is a path plus the code that defines its examples. The kernel
//! does not interpret files; it hands each registered path to a
//! [`SpecLoader`], which runs the file's top-level code against the kernel.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::Fault;
use crate::runner::mspec::MSpec;

/// Top-level code of one spec file.
pub type SpecFn = Box<dyn Fn(&mut MSpec) -> Result<(), Fault>>;

/// Loads and executes a spec file's top-level code.
pub trait SpecLoader {
    fn load(&self, file: &Path, mspec: &mut MSpec) -> Result<(), Fault>;
}

impl<F> SpecLoader for F
where
    F: Fn(&Path, &mut MSpec) -> Result<(), Fault>,
{
    fn load(&self, file: &Path, mspec: &mut MSpec) -> Result<(), Fault> {
        self(file, mspec)
    }
}

/// An in-process set of spec files, kept in registration order.
///
/// ```rust
/// use mspec::prelude::*;
///
/// let suite = Suite::new().file("spec/core/array/push_spec.rs", |m| {
///     m.describe("Array#push", |m| {
///         m.it("appends an element", |_| Ok(()))
///     })
/// });
/// assert_eq!(suite.len(), 1);
/// ```
#[derive(Default)]
pub struct Suite {
    files: Vec<(PathBuf, SpecFn)>,
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a spec file. A later registration of the same path replaces
    /// the earlier one.
    pub fn file<P, F>(mut self, path: P, spec: F) -> Self
    where
        P: Into<PathBuf>,
        F: Fn(&mut MSpec) -> Result<(), Fault> + 'static,
    {
        let path = path.into();
        self.files.retain(|(existing, _)| *existing != path);
        self.files.push((path, Box::new(spec)));
        self
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|(path, _)| path.as_path())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Registered files at or below any of `patterns`, in registration order.
    pub fn select<S: AsRef<Path>>(&self, patterns: &[S]) -> Vec<PathBuf> {
        self.paths()
            .filter(|path| {
                patterns
                    .iter()
                    .any(|pattern| path.starts_with(pattern.as_ref()))
            })
            .map(Path::to_path_buf)
            .collect()
    }
}

impl SpecLoader for Suite {
    fn load(&self, file: &Path, mspec: &mut MSpec) -> Result<(), Fault> {
        let Some((_, spec)) = self.files.iter().find(|(path, _)| path == file) else {
            return Err(Fault::error(
                "LoadError",
                format!("cannot load such file -- {}", file.display()),
            ));
        };
        spec(mspec)
    }
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.paths()).finish()
    }
}
