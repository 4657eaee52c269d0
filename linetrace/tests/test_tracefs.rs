//! `Tracefs` against a temporary directory shaped like a tracefs mount

use std::fs;
use std::path::Path;

use linetrace::domain::{ProbeDescriptor, SessionError};
use linetrace::session::{ProbeControl, ProbeSession, Tracefs};

fn probe(identifier: &str, offset: u64) -> ProbeDescriptor {
    ProbeDescriptor {
        identifier: identifier.to_string(),
        function_name: "vfs_read".to_string(),
        offset,
    }
}

fn fake_tracefs(identifiers: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("kprobe_events"), b"").unwrap();
    for id in identifiers {
        let event_dir = dir.path().join("events").join("kprobes").join(id);
        fs::create_dir_all(&event_dir).unwrap();
        fs::write(event_dir.join("enable"), b"0").unwrap();
    }
    dir
}

fn enable_state(root: &Path, identifier: &str) -> String {
    fs::read_to_string(root.join("events/kprobes").join(identifier).join("enable")).unwrap()
}

#[test]
fn test_definitions_are_appended() {
    let dir = fake_tracefs(&[]);
    fs::write(dir.path().join("kprobe_events"), b"p:existing do_sys_open+0x0\n").unwrap();

    let mut tracefs = Tracefs::open(dir.path()).unwrap();
    tracefs.define(&probe("read_c_L450_C2_0xffffffff81234567", 0x17)).unwrap();
    tracefs.remove(&probe("read_c_L450_C2_0xffffffff81234567", 0x17)).unwrap();

    let content = fs::read_to_string(dir.path().join("kprobe_events")).unwrap();
    assert_eq!(
        content,
        "p:existing do_sys_open+0x0\n\
         p:read_c_L450_C2_0xffffffff81234567 vfs_read+0x17\n\
         -:read_c_L450_C2_0xffffffff81234567\n"
    );
}

#[test]
fn test_enable_switch_written() {
    let dir = fake_tracefs(&["a"]);
    let mut tracefs = Tracefs::open(dir.path()).unwrap();

    tracefs.set_enabled(&probe("a", 0), true).unwrap();
    assert_eq!(enable_state(dir.path(), "a"), "1");

    tracefs.set_enabled(&probe("a", 0), false).unwrap();
    assert_eq!(enable_state(dir.path(), "a"), "0");
}

#[test]
fn test_missing_event_directory_fails_that_probe_only() {
    let dir = fake_tracefs(&["a"]);
    let mut tracefs = Tracefs::open(dir.path()).unwrap();

    assert!(tracefs.set_enabled(&probe("missing", 0), true).is_err());
    assert!(tracefs.set_enabled(&probe("a", 0), true).is_ok());
}

#[test]
fn test_open_without_kprobe_events() {
    let dir = tempfile::tempdir().unwrap();
    let err = Tracefs::open(dir.path()).unwrap_err();
    assert!(matches!(err, SessionError::ControlUnavailable { .. }));
}

#[test]
fn test_session_leaves_only_foreign_definitions_behind() {
    let dir = fake_tracefs(&["a", "b"]);
    let tracefs = Tracefs::open(dir.path()).unwrap();

    let (mut session, report) = ProbeSession::install(tracefs, vec![probe("a", 0), probe("b", 4)]);
    assert_eq!(report.installed, 2);
    assert!(session.enable_all().is_empty());
    assert_eq!(enable_state(dir.path(), "b"), "1");

    let teardown = session.teardown();

    assert!(teardown.is_clean());
    assert_eq!(teardown.removed, 2);
    assert_eq!(enable_state(dir.path(), "a"), "0");
    let content = fs::read_to_string(dir.path().join("kprobe_events")).unwrap();
    assert!(content.ends_with("-:a\n-:b\n"));
}
