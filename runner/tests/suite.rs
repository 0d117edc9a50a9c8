use std::{
    path::Path,
    time::Duration,
    };
use rawrepl::{
    Session, Config, Error,
    transport::mock::{MockDevice, Fault, Banner},
    };
use rawrepl_runner::suite::{self, Program, Verdict};


fn program(name: &str, text: &str) -> Program {
    Program {name: name.into(), text: text.into()}
}
/// device printing what it runs, raising on programs starting with "raise"
fn device() -> MockDevice {
    MockDevice::new().running(|program| {
        if program.starts_with(b"raise")
            {(Vec::new(), b"Traceback (most recent call last):\r\nAssertionError\r\n".to_vec())}
        else
            {([&b"ran "[..], program, b"\r\n"].concat(), Vec::new())}
    })
}

#[test]
fn shipped_programs_resolve() {
    let root = Path::new(suite::PROGRAMS);
    for name in ["registers/read_write.py", "pins/toggle.py"] {
        let program = suite::load(root, Path::new(name)).unwrap();
        assert_eq!(program.name, name);
        assert!(program.text.contains("from machine import Pin"));
    }
    assert!(suite::load(root, Path::new("missing.py")).is_err());
    // existing paths are not taken relative to the root
    let absolute = Path::new(suite::PROGRAMS).join("pins/toggle.py");
    assert_eq!(suite::resolve(Path::new("/elsewhere"), &absolute), absolute);
}

#[tokio::test(start_paused = true)]
async fn stops_after_failure() {
    let mut session = Session::new(device(), Config::default());
    let programs = [program("first", "a = 1"), program("second", "raise"), program("third", "b = 2")];
    let reports = suite::run(&mut session, &programs, Duration::from_secs(1), false).await;

    assert!(matches!(&reports[0].verdict, Verdict::Passed {stdout} if stdout == b"ran a = 1\r\n"));
    assert!(matches!(&reports[1].verdict, Verdict::Failed(Error::Execution {..})));
    assert!(matches!(&reports[2].verdict, Verdict::Skipped));
    assert_eq!(session.transport().programs().len(), 2);

    let mut printed = Vec::new();
    suite::print(&reports, &mut printed).unwrap();
    let printed = String::from_utf8(printed).unwrap();
    assert!(printed.contains("=== first\nran a = 1\r\n--- passed\n"));
    assert!(printed.contains("--- failed: program failed on device: Traceback (most recent call last):\r\nAssertionError\n"));
    assert!(printed.ends_with("1 passed, 1 failed, 1 skipped\n"));
}

#[tokio::test(start_paused = true)]
async fn keep_going() {
    let mut session = Session::new(device(), Config::default());
    let programs = [program("first", "raise"), program("second", "c = 3")];
    let reports = suite::run(&mut session, &programs, Duration::from_secs(1), true).await;
    assert!(! reports[0].passed());
    assert!(reports[1].passed());
}

#[tokio::test(start_paused = true)]
async fn unreachable_device() {
    let mut session = Session::new(device().fault(Fault::MuteBanner(Banner::Entry)), Config::default());
    let reports = suite::run(&mut session, &[program("only", "pass")], Duration::from_secs(1), false).await;
    assert!(matches!(&reports[0].verdict, Verdict::Failed(Error::RawReplEntryFailed {..})));

    let mut printed = Vec::new();
    suite::print(&reports, &mut printed).unwrap();
    assert!(String::from_utf8(printed).unwrap().contains("--- failed: could not enter raw repl\n"));
}
