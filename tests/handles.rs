// Kept in its own test binary so no other test opens maps files while we count descriptors.
#![cfg(target_os = "linux")]

use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};

use sycophant::proc::maps::{Config, Enumerator, ProcfsSource};
use sycophant::Target;

fn open_files() -> Vec<PathBuf> {
    fs::read_dir("/proc/self/fd")
        .unwrap()
        .filter_map(|fd| fs::read_link(fd.unwrap().path()).ok())
        .collect()
}

fn holds_open(path: &Path) -> bool {
    open_files().iter().any(|p| p == path)
}

#[test]
fn test_partial_consumption_leaves_no_open_handle() {
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("31337");
    fs::create_dir(&dir).unwrap();
    let mut table = String::new();
    for i in 0..1000usize {
        let start = 0x10000 + i * 0x2000;
        writeln!(
            table,
            "{:08x}-{:08x} r-xp 00000000 08:01 {} /usr/lib/lib{}.so",
            start,
            start + 0x1000,
            i + 1,
            i
        )
        .unwrap();
    }
    fs::write(dir.join("maps"), table).unwrap();
    let maps_file = fs::canonicalize(dir.join("maps")).unwrap();

    let enumerator = Enumerator::new(ProcfsSource::with_root(root.path()))
        .with_config(Config { page_size: 0x1000 });
    let mut maps = enumerator.all(Target::Pid(31337)).unwrap();
    assert!(!holds_open(&maps_file));

    let first = maps.next().unwrap().unwrap();
    assert_eq!(first.start(), 0x10000);
    drop(maps);
    assert!(!holds_open(&maps_file));
}

#[test]
fn test_own_maps_handle_is_closed() {
    let own_maps = PathBuf::from(format!("/proc/{}/maps", std::process::id()));
    let mut maps = sycophant::proc::maps::current().unwrap();
    let _ = maps.next();
    assert!(!holds_open(&own_maps));
    drop(maps);
    assert!(!holds_open(&own_maps));
}
