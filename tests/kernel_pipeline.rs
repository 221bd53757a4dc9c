// Integration tests for the kernel: phase order, fault isolation, hooks,
// filtering, pretend mode, and randomized file order.

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use mspec::prelude::*;
use pretty_assertions::assert_eq;

// ============================================================================
// HELPERS
// ============================================================================

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl Action for Recorder {
    fn start(&mut self) -> Result<(), Fault> {
        self.events.push("start".into());
        Ok(())
    }

    fn load(&mut self, file: &Path) -> Result<(), Fault> {
        self.events.push(format!("load {}", file.display()));
        Ok(())
    }

    fn enter(&mut self, description: &str) -> Result<(), Fault> {
        self.events.push(format!("enter {description}"));
        Ok(())
    }

    fn before(&mut self, state: &SpecState) -> Result<(), Fault> {
        self.events.push(format!("before {}", state.description()));
        Ok(())
    }

    fn after(&mut self, state: &SpecState) -> Result<(), Fault> {
        let outcome = match (state.has_faults(), state.is_failure()) {
            (false, _) => "pass",
            (true, true) => "fail",
            (true, false) => "error",
        };
        self.events
            .push(format!("after {} {outcome}", state.description()));
        Ok(())
    }

    fn leave(&mut self) -> Result<(), Fault> {
        self.events.push("leave".into());
        Ok(())
    }

    fn unload(&mut self, file: &Path) -> Result<(), Fault> {
        self.events.push(format!("unload {}", file.display()));
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Fault> {
        self.events.push("finish".into());
        Ok(())
    }
}

fn record(mspec: &mut MSpec) -> Rc<RefCell<Recorder>> {
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    for phase in [
        Phase::Start,
        Phase::Load,
        Phase::Enter,
        Phase::Before,
        Phase::After,
        Phase::Leave,
        Phase::Unload,
        Phase::Finish,
    ] {
        mspec.register(phase, recorder.clone());
    }
    recorder
}

#[derive(Clone, Default)]
struct Diagnostics(Rc<RefCell<Vec<u8>>>);

impl Write for Diagnostics {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Diagnostics {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

fn kernel(files: &[&str]) -> (MSpec, Diagnostics) {
    let diagnostics = Diagnostics::default();
    let mut mspec = MSpec::new();
    mspec.register_diagnostics(Box::new(diagnostics.clone()));
    mspec.register_files(files.iter().copied());
    (mspec, diagnostics)
}

fn passing_file() -> impl Fn(&mut MSpec) -> Result<(), Fault> {
    |m| {
        m.describe("Foo", |m| {
            m.it("works", |m| m.expectation())?;
            m.it("breaks", |_| Err(Fault::expectation("expected true")))
        })
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

#[test]
fn phases_dispatch_in_order() {
    let suite = Suite::new().file("spec/a_spec.rs", passing_file());
    let (mut mspec, diagnostics) = kernel(&["spec/a_spec.rs"]);
    let recorder = record(&mut mspec);

    mspec.process(&suite);

    assert_eq!(
        recorder.borrow().events,
        vec![
            "start",
            "load spec/a_spec.rs",
            "enter Foo",
            "before Foo works",
            "after Foo works pass",
            "before Foo breaks",
            "after Foo breaks fail",
            "leave",
            "unload spec/a_spec.rs",
            "finish",
        ]
    );
    assert_eq!(mspec.exit_code(), 0);
    assert_eq!(diagnostics.text(), "");
}

#[test]
fn faulting_file_still_unloads_and_next_file_runs() {
    let suite = Suite::new()
        .file("spec/a_spec.rs", |_| {
            Err(Fault::error("SyntaxError", "unexpected token"))
        })
        .file("spec/b_spec.rs", passing_file());
    let (mut mspec, diagnostics) = kernel(&["spec/a_spec.rs", "spec/b_spec.rs"]);
    let recorder = record(&mut mspec);

    mspec.process(&suite);

    let events = recorder.borrow().events.clone();
    assert_eq!(&events[..4], ["start", "load spec/a_spec.rs", "unload spec/a_spec.rs", "load spec/b_spec.rs"]);
    assert_eq!(events.last().map(String::as_str), Some("finish"));
    assert_eq!(mspec.exit_code(), 1);
    assert!(diagnostics.text().contains(
        "An exception occurred in loading spec/a_spec.rs:\nSyntaxError: \"unexpected token\"\n"
    ));
}

#[test]
fn panicking_file_is_isolated() {
    let suite = Suite::new()
        .file("spec/a_spec.rs", |_| panic!("file blew up"))
        .file("spec/b_spec.rs", passing_file());
    let (mut mspec, diagnostics) = kernel(&["spec/a_spec.rs", "spec/b_spec.rs"]);
    let recorder = record(&mut mspec);

    mspec.process(&suite);

    assert!(recorder
        .borrow()
        .events
        .contains(&"after Foo works pass".to_string()));
    assert!(diagnostics
        .text()
        .contains("An exception occurred in loading spec/a_spec.rs:\nPanic: \"file blew up\""));
    assert!(mspec.stack().is_empty());
}

#[test]
fn example_faults_set_exit_code() {
    let suite = Suite::new().file("spec/a_spec.rs", |m| {
        m.describe("Foo", |m| {
            m.it("errors", |_| Err(Fault::error("TypeError", "nil is not a number")))
        })
    });
    let (mut mspec, diagnostics) = kernel(&["spec/a_spec.rs"]);
    let recorder = record(&mut mspec);

    mspec.process(&suite);

    assert!(recorder
        .borrow()
        .events
        .contains(&"after Foo errors error".to_string()));
    assert_eq!(mspec.exit_code(), 1);
    assert_eq!(diagnostics.text(), "");
}

#[test]
fn load_action_faults_do_not_abort_the_run() {
    struct FailingLoad;
    impl Action for FailingLoad {
        fn load(&mut self, _file: &Path) -> Result<(), Fault> {
            Err(Fault::error("RuntimeError", "load hook failed"))
        }
    }

    let suite = Suite::new().file("spec/a_spec.rs", passing_file());
    let (mut mspec, diagnostics) = kernel(&["spec/a_spec.rs"]);
    mspec.register(Phase::Load, Rc::new(RefCell::new(FailingLoad)));
    let recorder = record(&mut mspec);

    mspec.process(&suite);

    let events = recorder.borrow().events.clone();
    assert!(events.contains(&"unload spec/a_spec.rs".to_string()));
    assert!(events.contains(&"finish".to_string()));
    assert!(diagnostics.text().contains("An exception occurred in load actions:"));
    assert_eq!(mspec.exit_code(), 1);
}

// ============================================================================
// HOOKS AND SCOPES
// ============================================================================

#[test]
fn hooks_run_around_examples() {
    let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    let spec_log = Rc::clone(&log);
    let suite = Suite::new().file("spec/a_spec.rs", move |m| {
        let log = Rc::clone(&spec_log);
        m.describe("Foo", move |m| {
            let l = Rc::clone(&log);
            m.before(Scope::All, move |_| Ok(l.borrow_mut().push("before all")))?;
            let l = Rc::clone(&log);
            m.before(Scope::Each, move |_| Ok(l.borrow_mut().push("before each")))?;
            let l = Rc::clone(&log);
            m.after(Scope::Each, move |_| Ok(l.borrow_mut().push("after each")))?;
            let l = Rc::clone(&log);
            m.after(Scope::All, move |_| Ok(l.borrow_mut().push("after all")))?;
            let l = Rc::clone(&log);
            m.it("one", move |_| Ok(l.borrow_mut().push("one")))?;
            let l = Rc::clone(&log);
            m.it("two", move |_| Ok(l.borrow_mut().push("two")))
        })
    });
    let (mut mspec, _) = kernel(&["spec/a_spec.rs"]);
    mspec.process(&suite);

    assert_eq!(
        *log.borrow(),
        vec![
            "before all",
            "before each",
            "one",
            "after each",
            "before each",
            "two",
            "after each",
            "after all",
        ]
    );
}

#[test]
fn failing_before_each_skips_body_but_runs_after_each() {
    let ran: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    let spec_ran = Rc::clone(&ran);
    let suite = Suite::new().file("spec/a_spec.rs", move |m| {
        let ran = Rc::clone(&spec_ran);
        m.describe("Foo", move |m| {
            m.before(Scope::Each, |_| Err(Fault::error("RuntimeError", "setup failed")))?;
            let r = Rc::clone(&ran);
            m.after(Scope::Each, move |_| Ok(r.borrow_mut().push("after each")))?;
            let r = Rc::clone(&ran);
            m.it("body", move |_| Ok(r.borrow_mut().push("body")))
        })
    });
    let (mut mspec, _) = kernel(&["spec/a_spec.rs"]);
    let recorder = record(&mut mspec);
    mspec.process(&suite);

    assert_eq!(*ran.borrow(), vec!["after each"]);
    assert!(recorder
        .borrow()
        .events
        .contains(&"after Foo body error".to_string()));
}

#[test]
fn nested_describes_join_descriptions() {
    let suite = Suite::new().file("spec/a_spec.rs", |m| {
        m.describe("Array", |m| {
            m.describe("#push", |m| m.it("appends", |_| Ok(())))
        })
    });
    let (mut mspec, _) = kernel(&["spec/a_spec.rs"]);
    let recorder = record(&mut mspec);
    mspec.process(&suite);

    let events = recorder.borrow().events.clone();
    assert!(events.contains(&"enter Array #push".to_string()));
    assert!(events.contains(&"after Array #push appends pass".to_string()));
    assert!(mspec.stack().is_empty());
}

#[test]
fn describe_level_faults_go_to_diagnostics() {
    let suite = Suite::new().file("spec/a_spec.rs", |m| {
        m.describe("Foo", |m| {
            m.it("works", |_| Ok(()))?;
            Err(Fault::error("NameError", "undefined constant"))
        })
    });
    let (mut mspec, diagnostics) = kernel(&["spec/a_spec.rs"]);
    let recorder = record(&mut mspec);
    mspec.process(&suite);

    assert!(recorder
        .borrow()
        .events
        .contains(&"after Foo works pass".to_string()));
    assert!(diagnostics
        .text()
        .contains("An exception occurred in Foo (describe):\nNameError: \"undefined constant\""));
    assert_eq!(mspec.exit_code(), 1);
}

#[test]
fn failing_before_all_skips_examples_but_runs_after_all() {
    let ran: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    let spec_ran = Rc::clone(&ran);
    let suite = Suite::new().file("spec/a_spec.rs", move |m| {
        let ran = Rc::clone(&spec_ran);
        m.describe("Foo", move |m| {
            m.before(Scope::All, |_| Err(Fault::error("RuntimeError", "no database")))?;
            let r = Rc::clone(&ran);
            m.before(Scope::Each, move |_| Ok(r.borrow_mut().push("before each")))?;
            let r = Rc::clone(&ran);
            m.after(Scope::All, move |_| Ok(r.borrow_mut().push("after all")))?;
            let r = Rc::clone(&ran);
            m.it("body", move |_| Ok(r.borrow_mut().push("body")))
        })
    });
    let (mut mspec, diagnostics) = kernel(&["spec/a_spec.rs"]);
    let recorder = record(&mut mspec);
    mspec.process(&suite);

    assert_eq!(*ran.borrow(), vec!["after all"]);
    let events = recorder.borrow().events.clone();
    assert!(events.contains(&"enter Foo".to_string()));
    assert!(events.contains(&"leave".to_string()));
    assert!(!events.iter().any(|e| e.contains("body")));
    assert!(diagnostics
        .text()
        .contains("An exception occurred in Foo (before :all):\nRuntimeError: \"no database\""));
    assert_eq!(mspec.exit_code(), 1);
}

#[test]
fn current_file_is_set_while_loading() {
    let seen: Rc<RefCell<Vec<PathBuf>>> = Rc::default();
    let spec_seen = Rc::clone(&seen);
    let suite = Suite::new().file("spec/a_spec.rs", move |m| {
        spec_seen
            .borrow_mut()
            .extend(m.current_file().map(Path::to_path_buf));
        Ok(())
    });
    let (mut mspec, _) = kernel(&["spec/a_spec.rs"]);
    assert!(mspec.current_file().is_none());
    mspec.process(&suite);

    assert_eq!(*seen.borrow(), vec![PathBuf::from("spec/a_spec.rs")]);
    assert!(mspec.current_file().is_none());
}

// ============================================================================
// MODES AND FILTERS
// ============================================================================

#[test]
fn pretend_mode_dispatches_without_running_code() {
    let ran = Rc::new(RefCell::new(false));
    let spec_ran = Rc::clone(&ran);
    let suite = Suite::new().file("spec/a_spec.rs", move |m| {
        let ran = Rc::clone(&spec_ran);
        m.describe("Foo", move |m| {
            let r = Rc::clone(&ran);
            m.before(Scope::All, move |_| Ok(*r.borrow_mut() = true))?;
            let r = Rc::clone(&ran);
            m.it("would fail", move |_| {
                *r.borrow_mut() = true;
                Err(Fault::expectation("no"))
            })
        })
    });
    let (mut mspec, _) = kernel(&["spec/a_spec.rs"]);
    mspec.register_mode(Mode::Pretend);
    let recorder = record(&mut mspec);
    mspec.process(&suite);

    assert!(!*ran.borrow());
    assert!(recorder
        .borrow()
        .events
        .contains(&"after Foo would fail pass".to_string()));
    assert_eq!(mspec.exit_code(), 0);
}

#[test]
fn filtered_examples_are_not_dispatched() {
    let suite = Suite::new().file("spec/a_spec.rs", passing_file());
    let (mut mspec, _) = kernel(&["spec/a_spec.rs"]);
    MatchFilter::new(FilterKind::Exclude, ["breaks"]).register(&mut mspec);
    let recorder = record(&mut mspec);
    mspec.process(&suite);

    let events = recorder.borrow().events.clone();
    assert!(events.contains(&"after Foo works pass".to_string()));
    assert!(!events.iter().any(|e| e.contains("breaks")));
}

#[test]
fn randomized_order_is_a_seeded_permutation() {
    let files: Vec<String> = (0..8).map(|i| format!("spec/f{i}_spec.rs")).collect();
    let suite = files
        .iter()
        .fold(Suite::new(), |suite, file| suite.file(file.as_str(), |_| Ok(())));
    let suite = &suite;

    let order = |seed: u64| -> Vec<PathBuf> {
        let loaded: Rc<RefCell<Vec<PathBuf>>> = Rc::default();
        let sink = Rc::clone(&loaded);
        let loader = move |file: &Path, m: &mut MSpec| suite.load(file, m).map(|()| {
            sink.borrow_mut().push(file.to_path_buf());
        });
        let (mut mspec, _) = kernel(&files.iter().map(String::as_str).collect::<Vec<_>>());
        mspec.randomize(true);
        mspec.register_seed(seed);
        mspec.process(&loader);
        assert_eq!(mspec.shuffle_seed(), Some(seed));
        let order = loaded.borrow().clone();
        order
    };

    let first = order(5);
    assert_eq!(first, order(5));
    let mut sorted = first.clone();
    sorted.sort();
    let mut expected: Vec<PathBuf> = files.iter().map(PathBuf::from).collect();
    expected.sort();
    assert_eq!(sorted, expected);
}
