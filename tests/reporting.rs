// End-to-end reporting: the dotted formatter, tally, and tag actions driven
// by a real kernel run.

use std::fs;

use mspec::actions::{TagOp, TagOutcome};
use mspec::prelude::*;
use pretty_assertions::assert_eq;
use tempfile::tempdir;
use termcolor::Buffer;

fn suite() -> Suite {
    Suite::new().file("spec/core/foo_spec.rs", |m| {
        m.describe("Foo", |m| {
            m.it("passes", |m| m.expectation())?;
            m.it("fails", |m| {
                m.expectation()?;
                Err(Fault::ExpectationNotMet {
                    message: "expected 1 to equal 2".into(),
                    trace: None,
                })
            })?;
            m.it("errors", |_| {
                Err(Fault::Error {
                    class: "ZeroDivisionError".into(),
                    message: "divided by 0".into(),
                    trace: None,
                })
            })
        })
    })
}

fn report(mspec: &mut MSpec) -> String {
    let formatter = DottedFormatter::new(Buffer::no_color()).register(mspec);
    mspec.process(&suite());
    let formatter = formatter.borrow();
    String::from_utf8_lossy(formatter.output().as_slice()).into_owned()
}

#[test]
fn dotted_report_for_a_mixed_run() {
    let mut mspec = MSpec::new();
    mspec.register_files(["spec/core/foo_spec.rs"]);
    let text = report(&mut mspec);

    let (body, summary) = text.split_once("\nFinished in ").unwrap();
    assert_eq!(
        body,
        ".FE\n\
         \n1)\nFoo fails FAILED\nExpectationNotMetError occurred during: it\nexpected 1 to equal 2\n\n\
         \n2)\nFoo errors ERROR\nZeroDivisionError occurred during: it\nZeroDivisionError: divided by 0\n\n"
    );
    assert!(summary.ends_with(
        " seconds\n\n1 file, 3 examples, 2 expectations, 1 failure, 1 error\n"
    ));
    assert_eq!(mspec.exit_code(), 1);
}

#[test]
fn tally_counts_match_the_run() {
    let mut mspec = MSpec::new();
    mspec.register_files(["spec/core/foo_spec.rs"]);
    let formatter = DottedFormatter::new(Buffer::no_color()).register(&mut mspec);
    mspec.process(&suite());

    let tally = formatter.borrow().tally();
    assert_eq!(tally.files, 1);
    assert_eq!(tally.examples, 3);
    assert_eq!(tally.expectations, 2);
    assert_eq!(tally.failures, 1);
    assert_eq!(tally.errors, 1);
}

#[test]
fn tagging_failures_then_excluding_them() {
    let dir = tempdir().unwrap();
    let spec = dir.path().join("spec/core/foo_spec.rs");
    let suite = Suite::new().file(spec.clone(), |m| {
        m.describe("Foo", |m| {
            m.it("passes", |_| Ok(()))?;
            m.it("fails", |_| Err(Fault::expectation("no")))
        })
    });

    let mut first = MSpec::new();
    first.register_files([spec.clone()]);
    let tagger = TagAction::new(TagOp::Add, TagOutcome::Fail, "fails", TagStore::default())
        .register(&mut first);
    first.process(&suite);
    assert_eq!(tagger.borrow().changed(), ["Foo fails".to_string()]);

    let tags_file = dir.path().join("spec/tags/core/foo_tags.txt");
    assert_eq!(fs::read_to_string(&tags_file).unwrap(), "fails:Foo fails\n");

    let mut second = MSpec::new();
    second.register_files([spec.clone()]);
    TagFilter::new(FilterKind::Exclude, ["fails"], TagStore::default()).register(&mut second);
    let tally = TallyAction::new().register(&mut second);
    second.process(&suite);
    assert_eq!(tally.borrow().counter().examples, 1);
    assert_eq!(second.exit_code(), 0);
}

#[test]
fn deleting_tags_of_passing_examples_removes_the_file() {
    let dir = tempdir().unwrap();
    let spec = dir.path().join("spec/core/foo_spec.rs");
    let store = TagStore::default();
    store.write_tag(&spec, &SpecTag::new("fails", "Foo passes")).unwrap();

    let suite = Suite::new().file(spec.clone(), |m| {
        m.describe("Foo", |m| m.it("passes", |_| Ok(())))
    });
    let mut mspec = MSpec::new();
    mspec.register_files([spec.clone()]);
    TagAction::new(TagOp::Delete, TagOutcome::Pass, "fails", store.clone()).register(&mut mspec);
    mspec.process(&suite);

    assert!(!store.tags_file(&spec).exists());
}

#[test]
fn tags_of_top_level_examples_exclude_them() {
    let dir = tempdir().unwrap();
    let spec = dir.path().join("spec/core/bare_spec.rs");
    TagStore::default()
        .write_tag(&spec, &SpecTag::new("fails", "works"))
        .unwrap();

    let suite = Suite::new().file(spec.clone(), |m| {
        m.describe("", |m| m.it("works", |_| Err(Fault::expectation("no"))))
    });
    let mut mspec = MSpec::new();
    mspec.register_files([spec.clone()]);
    TagFilter::new(FilterKind::Exclude, ["fails"], TagStore::default()).register(&mut mspec);
    let tally = TallyAction::new().register(&mut mspec);
    mspec.process(&suite);

    assert_eq!(tally.borrow().counter().examples, 0);
    assert_eq!(mspec.exit_code(), 0);
}
