use std::fs;
use std::path::{Path, PathBuf};

use crate::core::types::{Pid, Target};

pub const DEFAULT_PROCFS_ROOT: &str = "/proc";

// Smallest page size Linux runs with, used when sysconf can't tell us
const FALLBACK_PAGE_SIZE: usize = 4096;

lazy_static! {
    static ref PAGE_SIZE: usize = {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size > 0 {
            size as usize
        } else {
            warn!("sysconf(_SC_PAGESIZE) failed, assuming {}", FALLBACK_PAGE_SIZE);
            FALLBACK_PAGE_SIZE
        }
    };
}

/// The page size of the host, looked up once per process
pub fn page_size() -> usize {
    *PAGE_SIZE
}

/// The procfs directory describing `target`. The calling process goes through `self` so that
/// the path stays valid for it even inside a PID namespace.
pub fn process_dir(root: &Path, target: Target) -> PathBuf {
    match target {
        Target::Current => root.join("self"),
        Target::Pid(pid) => root.join(pid.to_string()),
    }
}

pub fn maps_path(root: &Path, target: Target) -> PathBuf {
    process_dir(root, target).join("maps")
}

/// The one-letter scheduler state from `<root>/<pid>/stat`, e.g. `R`, `S` or `Z`
pub fn process_state(root: &Path, pid: Pid) -> Option<char> {
    let stat = fs::read_to_string(root.join(pid.to_string()).join("stat")).ok()?;
    // the command name is parenthesized and may itself contain spaces or parens
    let (_, rest) = stat.rsplit_once(')')?;
    rest.trim_start().chars().next()
}

/// Whether `pid` still exists and hasn't exited. Zombies (`Z`) and dead tasks (`X`) keep
/// their procfs entry until reaped but have no address space left.
pub fn is_alive(root: &Path, pid: Pid) -> bool {
    if !root.join(pid.to_string()).is_dir() {
        return false;
    }
    !matches!(process_state(root, pid), Some('Z') | Some('X'))
}

#[cfg(test)]
pub mod tests {
    use std::ops::{Deref, DerefMut};
    use std::path::Path;
    use std::process::{Child, Command};

    use super::*;

    pub struct ManagedProcess(pub Child);

    impl ManagedProcess {
        pub fn sleeper() -> ManagedProcess {
            ManagedProcess(
                Command::new("sleep")
                    .arg("60")
                    .spawn()
                    .expect("couldn't spawn sleep"),
            )
        }

        pub fn pid(&self) -> Pid {
            self.0.id() as Pid
        }
    }

    impl Drop for ManagedProcess {
        fn drop(&mut self) {
            match self.0.kill() {
                Err(e) => debug!("Failed to kill process {}: {:?}", self.0.id(), e),
                _ => (),
            }
            match self.0.wait() {
                Err(e) => debug!("Failed to wait for process {}: {:?}", self.0.id(), e),
                _ => (),
            }
        }
    }

    impl Deref for ManagedProcess {
        type Target = Child;

        fn deref(&self) -> &Self::Target {
            &self.0
        }
    }

    impl DerefMut for ManagedProcess {
        fn deref_mut(&mut self) -> &mut Self::Target {
            &mut self.0
        }
    }

    #[test]
    fn test_page_size_is_power_of_two() {
        let size = page_size();
        assert!(size >= FALLBACK_PAGE_SIZE);
        assert!(size.is_power_of_two());
    }

    #[test]
    fn test_maps_path() {
        let root = Path::new("/proc");
        assert_eq!(maps_path(root, Target::Current), Path::new("/proc/self/maps"));
        assert_eq!(maps_path(root, Target::Pid(42)), Path::new("/proc/42/maps"));
    }

    #[test]
    fn test_process_state_from_stat() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("77");
        fs::create_dir(&dir).unwrap();
        assert_eq!(process_state(root.path(), 77), None);
        assert!(is_alive(root.path(), 77));

        fs::write(dir.join("stat"), "77 (odd) name)) S 1 77 77 0 -1\n").unwrap();
        assert_eq!(process_state(root.path(), 77), Some('S'));
        assert!(is_alive(root.path(), 77));

        fs::write(dir.join("stat"), "77 (true) Z 1 77 77 0 -1\n").unwrap();
        assert!(!is_alive(root.path(), 77));
        fs::write(dir.join("stat"), "77 (true) X 1 77 77 0 -1\n").unwrap();
        assert!(!is_alive(root.path(), 77));

        assert!(!is_alive(root.path(), 78));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_is_alive() {
        let root = Path::new(DEFAULT_PROCFS_ROOT);
        let process = ManagedProcess::sleeper();
        assert!(is_alive(root, process.pid()));
        assert!(is_alive(root, std::process::id() as Pid));
    }
}
