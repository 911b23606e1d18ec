use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use crate::core::process::{is_alive, maps_path, DEFAULT_PROCFS_ROOT};
use crate::core::types::{MapsError, Target};

/// Something that can produce the raw mapping table of a process.
///
/// A snapshot is the complete table read in one go. Implementations must not keep any OS
/// handle open once `snapshot` has returned; whatever the snapshot holds is released when
/// it is dropped.
pub trait MapsSource {
    type Snapshot: AsRef<str>;

    fn snapshot(&self, target: Target) -> Result<Self::Snapshot, MapsError>;
}

/// Reads `/proc/PID/maps`
#[derive(Debug, Clone)]
pub struct ProcfsSource {
    root: PathBuf,
}

impl Default for ProcfsSource {
    fn default() -> Self {
        ProcfsSource::with_root(DEFAULT_PROCFS_ROOT)
    }
}

impl ProcfsSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads from a procfs mounted somewhere other than /proc
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        ProcfsSource {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self, target: Target) -> Result<Vec<u8>, MapsError> {
        let path = maps_path(&self.root, target);
        let mut file = File::open(&path).map_err(|e| self.classify(target, e))?;
        // procfs files report a size of 0, so there's no point in sizing the buffer up front
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|e| self.classify(target, e))?;
        debug!("read {} bytes from {}", contents.len(), path.display());
        // A zombie, or a process that exits after open, reads as a short or empty table
        // without any error
        if let Target::Pid(pid) = target {
            if !is_alive(&self.root, pid) {
                warn!("process {} exited while reading its maps", pid);
                return Err(MapsError::ProcessNotFound(pid));
            }
        }
        Ok(contents)
    }

    fn classify(&self, target: Target, error: io::Error) -> MapsError {
        let pid = target.pid();
        if error.kind() == io::ErrorKind::NotFound {
            return MapsError::ProcessNotFound(pid);
        }
        if error.kind() == io::ErrorKind::PermissionDenied {
            return MapsError::PermissionDenied(pid);
        }
        match error.raw_os_error() {
            Some(libc::ESRCH) => MapsError::ProcessNotFound(pid),
            Some(libc::EACCES) | Some(libc::EPERM) => MapsError::PermissionDenied(pid),
            _ => {
                // A process exiting while we read its maps shows up as an arbitrary I/O
                // error. If it's gone now, report it as gone.
                if target != Target::Current && !is_alive(&self.root, pid) {
                    warn!("process {} exited while reading its maps: {}", pid, error);
                    MapsError::ProcessNotFound(pid)
                } else {
                    MapsError::Io { pid, source: error }
                }
            }
        }
    }
}

impl MapsSource for ProcfsSource {
    type Snapshot = String;

    fn snapshot(&self, target: Target) -> Result<String, MapsError> {
        let contents = self.read(target)?;
        Ok(match String::from_utf8(contents) {
            Ok(text) => text,
            // only pathnames can be non-UTF-8
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

impl<S: MapsSource + ?Sized> MapsSource for &S {
    type Snapshot = S::Snapshot;

    fn snapshot(&self, target: Target) -> Result<Self::Snapshot, MapsError> {
        (**self).snapshot(target)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::core::types::Pid;

    fn fake_procfs(pid: Pid, contents: &str) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join(pid.to_string());
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("maps"), contents).unwrap();
        root
    }

    #[test]
    fn test_reads_whole_file() {
        let contents = include_str!("../../../ci/testdata/map.txt");
        let root = fake_procfs(4242, contents);
        let source = ProcfsSource::with_root(root.path());
        assert_eq!(source.snapshot(Target::Pid(4242)).unwrap(), contents);
    }

    #[test]
    fn test_missing_process() {
        let root = fake_procfs(4242, "");
        let source = ProcfsSource::with_root(root.path());
        match source.snapshot(Target::Pid(4343)) {
            Err(MapsError::ProcessNotFound(4343)) => {}
            other => panic!("expected ProcessNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_non_utf8_path_is_kept_lossily() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("7");
        fs::create_dir(&dir).unwrap();
        let mut contents = b"00400000-00401000 r-xp 00000000 08:01 1 /tmp/\xff\n".to_vec();
        contents.extend_from_slice(b"00600000-00601000 rw-p 00000000 00:00 0\n");
        fs::write(dir.join("maps"), contents).unwrap();

        let snapshot = ProcfsSource::with_root(root.path())
            .snapshot(Target::Pid(7))
            .unwrap();
        assert_eq!(snapshot.lines().count(), 2);
        assert!(snapshot.contains("/tmp/\u{fffd}"));
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_reads_own_maps() {
        let snapshot = ProcfsSource::new().snapshot(Target::Current).unwrap();
        assert!(!snapshot.is_empty());
    }

    #[test]
    fn test_root() {
        assert_eq!(ProcfsSource::new().root(), Path::new("/proc"));
        assert_eq!(ProcfsSource::with_root("/mnt/proc").root(), Path::new("/mnt/proc"));
    }

    #[test]
    fn test_classify_permission_errors() {
        let root = fake_procfs(4242, "");
        let source = ProcfsSource::with_root(root.path());
        for errno in [libc::EACCES, libc::EPERM] {
            match source.classify(Target::Pid(4242), io::Error::from_raw_os_error(errno)) {
                MapsError::PermissionDenied(4242) => {}
                other => panic!("errno {}: expected PermissionDenied, got {:?}", errno, other),
            }
        }
    }

    #[test]
    fn test_classify_missing_process() {
        let root = fake_procfs(4242, "");
        let source = ProcfsSource::with_root(root.path());
        let errors = [
            io::Error::from_raw_os_error(libc::ESRCH),
            io::Error::from(io::ErrorKind::NotFound),
        ];
        for error in errors {
            match source.classify(Target::Pid(4242), error) {
                MapsError::ProcessNotFound(4242) => {}
                other => panic!("expected ProcessNotFound, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_classify_io_error() {
        let root = fake_procfs(4242, "");
        let source = ProcfsSource::with_root(root.path());
        match source.classify(Target::Pid(4242), io::Error::from_raw_os_error(libc::EIO)) {
            MapsError::Io { pid: 4242, source } => {
                assert_eq!(source.raw_os_error(), Some(libc::EIO))
            }
            other => panic!("expected Io, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_io_error_after_exit() {
        let root = fake_procfs(4242, "");
        let source = ProcfsSource::with_root(root.path());
        fs::remove_dir_all(root.path().join("4242")).unwrap();
        match source.classify(Target::Pid(4242), io::Error::from_raw_os_error(libc::EIO)) {
            MapsError::ProcessNotFound(4242) => {}
            other => panic!("expected ProcessNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_zombie_in_fake_procfs() {
        let root = fake_procfs(4242, "");
        fs::write(root.path().join("4242").join("stat"), "4242 (true) Z 1 4242 4242 0\n").unwrap();
        let source = ProcfsSource::with_root(root.path());
        match source.snapshot(Target::Pid(4242)) {
            Err(MapsError::ProcessNotFound(4242)) => {}
            other => panic!("expected ProcessNotFound, got {:?}", other),
        }
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_unreaped_child_is_not_found() {
        use std::process::Command;
        use std::thread;
        use std::time::Duration;

        use crate::core::process::process_state;

        let root = Path::new(DEFAULT_PROCFS_ROOT);
        let mut child = Command::new("true").spawn().unwrap();
        let pid = child.id() as Pid;
        for _ in 0..500 {
            if process_state(root, pid) == Some('Z') {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(process_state(root, pid), Some('Z'));

        let result = ProcfsSource::new().snapshot(Target::Pid(pid));
        child.wait().unwrap();
        match result {
            Err(MapsError::ProcessNotFound(p)) => assert_eq!(p, pid),
            other => panic!("expected ProcessNotFound for zombie {}, got {:?}", pid, other),
        }
    }
}
