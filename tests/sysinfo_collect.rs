// CLASSIFICATION: COMMUNITY
// Filename: sysinfo_collect.rs v0.1
// Author: Lukas Bower
// Date Modified: 2026-10-18

use std::fs;
use std::path::Path;

use rebootlog::collect::{collect, CollectError, CollectFlags, CollectSources};
use tempfile::tempdir;

fn fake_proc(root: &Path) -> CollectSources {
    let proc_root = root.join("proc");
    fs::create_dir_all(proc_root.join("42/fd")).unwrap();
    fs::write(proc_root.join("meminfo"), "MemTotal: 1024 kB\n").unwrap();
    fs::write(proc_root.join("42/maps"), "00400000-00452000 r-xp /bin/app\n").unwrap();
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink("/dev/null", proc_root.join("42/fd/0")).unwrap();
        std::os::unix::fs::symlink("/tmp/app.log", proc_root.join("42/fd/3")).unwrap();
    }
    let messages = root.join("messages");
    fs::write(&messages, "kernel: boot\n").unwrap();
    CollectSources {
        proc_root,
        messages,
    }
}

#[test]
fn collects_everything_selected() {
    let _ = env_logger::builder().is_test(true).try_init();
    let root = tempdir().unwrap();
    let sources = fake_proc(root.path());
    let out = root.path().join("sysinfo");

    let report = collect(&out, &[42], CollectFlags::all(), &sources).unwrap();
    assert!(report.skipped.is_empty(), "{:?}", report.skipped);
    assert_eq!(fs::read_to_string(out.join("kmsg")).unwrap(), "kernel: boot\n");
    assert_eq!(fs::read_to_string(out.join("meminfo")).unwrap(), "MemTotal: 1024 kB\n");
    assert!(fs::read_to_string(out.join("42_maps")).unwrap().contains("/bin/app"));
    #[cfg(unix)]
    assert_eq!(
        fs::read_to_string(out.join("42_fd")).unwrap(),
        "0 /dev/null\n3 /tmp/app.log\n"
    );
}

#[test]
fn flags_limit_what_is_collected() {
    let root = tempdir().unwrap();
    let sources = fake_proc(root.path());
    let out = root.path().join("sysinfo");

    let report = collect(&out, &[42], CollectFlags::MEMINFO, &sources).unwrap();
    assert_eq!(report.written, vec![out.join("meminfo")]);
    assert!(!out.join("kmsg").exists());
    assert!(!out.join("42_maps").exists());
}

#[test]
fn vanished_process_is_skipped() {
    let root = tempdir().unwrap();
    let sources = fake_proc(root.path());
    let out = root.path().join("sysinfo");

    let report = collect(&out, &[42, 7], CollectFlags::MAPS, &sources).unwrap();
    assert_eq!(report.written, vec![out.join("42_maps")]);
    assert_eq!(report.skipped, vec![out.join("7_maps")]);
}

#[test]
fn target_must_be_a_directory() {
    let root = tempdir().unwrap();
    let file = root.path().join("not_a_dir");
    fs::write(&file, "x").unwrap();
    let err = collect(&file, &[], CollectFlags::all(), &CollectSources::default()).unwrap_err();
    assert!(matches!(err, CollectError::Prepare { .. } | CollectError::NotADirectory(_)));
}
