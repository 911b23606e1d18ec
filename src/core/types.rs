/// Core types used throughout sycophant: Pid, Target and MapsError
use std::fmt;
use std::io;

use thiserror::Error;

pub type Pid = libc::pid_t;

/// Which process to inspect. `Current` is the calling process and is the default.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    #[default]
    Current,
    Pid(Pid),
}

impl Target {
    pub fn pid(&self) -> Pid {
        match *self {
            Target::Current => std::process::id() as Pid,
            Target::Pid(pid) => pid,
        }
    }
}

impl From<Pid> for Target {
    fn from(pid: Pid) -> Self {
        Target::Pid(pid)
    }
}

impl From<Option<Pid>> for Target {
    fn from(pid: Option<Pid>) -> Self {
        pid.map_or(Target::Current, Target::Pid)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Target::Current => write!(f, "self"),
            Target::Pid(pid) => write!(f, "{}", pid),
        }
    }
}

#[derive(Error, Debug)]
pub enum MapsError {
    #[error("No process with PID: {}", _0)]
    ProcessNotFound(Pid),
    #[error("Permission denied when reading the memory maps of process {}. If you're not running as root, try again with sudo. If you're using Docker, try passing `--cap-add=SYS_PTRACE` to `docker run`", _0)]
    PermissionDenied(Pid),
    #[error("Error reading memory maps of process {}", pid)]
    Io {
        pid: Pid,
        #[source]
        source: io::Error,
    },
    #[error("Malformed maps record at line {}: {} ({:?})", line, reason, text)]
    MalformedRecord {
        /// The process the table was read from; None for text parsed directly
        pid: Option<Pid>,
        line: usize,
        text: String,
        reason: MalformedReason,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    #[error("missing field {}", _0)]
    MissingField(&'static str),
    #[error("address range has no '-' separator")]
    NoRangeSeparator,
    #[error("invalid hexadecimal {}: {:?}", field, value)]
    BadHex { field: &'static str, value: String },
    #[error("invalid inode: {:?}", _0)]
    BadInode(String),
    #[error("invalid device: {:?}", _0)]
    BadDevice(String),
    #[error("start {:#x} is not below end {:#x}", start, end)]
    EmptyRange { start: usize, end: usize },
    #[error("address {:#x} is not aligned to page size {:#x}", addr, page_size)]
    Unaligned { addr: usize, page_size: usize },
    #[error("flags must be 4 characters, got {:?}", _0)]
    BadFlagsLength(String),
    #[error("unrecognized flag character {:?}", _0)]
    BadFlag(char),
    #[error("flags must mark the mapping either private ('p') or shared ('s')")]
    NoSharingFlag,
    #[error("region at {:#x} overlaps previous region ending at {:#x}", start, previous_end)]
    Overlap { start: usize, previous_end: usize },
}

impl MapsError {
    pub(crate) fn malformed(line: usize, text: &str, reason: MalformedReason) -> Self {
        MapsError::MalformedRecord {
            pid: None,
            line,
            text: text.to_string(),
            reason,
        }
    }

    /// Records which process a malformed table came from
    pub(crate) fn with_pid(mut self, target_pid: Pid) -> Self {
        if let MapsError::MalformedRecord { ref mut pid, .. } = self {
            *pid = Some(target_pid);
        }
        self
    }

    /// The line index of a malformed record, if this is a parse error
    pub fn line(&self) -> Option<usize> {
        match self {
            MapsError::MalformedRecord { line, .. } => Some(*line),
            _ => None,
        }
    }
}
