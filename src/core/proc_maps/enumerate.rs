use std::iter::FusedIterator;

use crate::core::proc_maps::entry::MapEntry;
use crate::core::proc_maps::linux_maps::Cursor;
use crate::core::proc_maps::normalize::normalize;
use crate::core::proc_maps::source::{MapsSource, ProcfsSource};
use crate::core::process;
use crate::core::types::{MapsError, Target};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Every region boundary must be a multiple of this. 0 or 1 disables the check.
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            page_size: process::page_size(),
        }
    }
}

/// Enumerates memory maps through a pluggable source
#[derive(Debug, Clone, Default)]
pub struct Enumerator<S = ProcfsSource> {
    source: S,
    config: Config,
}

impl<S: MapsSource> Enumerator<S> {
    pub fn new(source: S) -> Self {
        Enumerator {
            source,
            config: Config::default(),
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Takes a snapshot of `target`'s mapping table and returns a lazy sequence over it.
    ///
    /// Errors reading the table are returned here, before any entry is produced.
    pub fn all<T: Into<Target>>(&self, target: T) -> Result<Maps<S::Snapshot>, MapsError> {
        let target = target.into();
        let snapshot = self.source.snapshot(target)?;
        debug!("enumerating maps of process {}", target);
        Ok(Maps::new(snapshot, Some(target), &self.config))
    }
}

/// The entries of one snapshot, in ascending address order.
///
/// Not rewindable: once consumed, enumerating again requires a new snapshot. Dropping the
/// sequence, consumed or not, releases the snapshot. After an error no further entries are
/// yielded.
pub struct Maps<T: AsRef<str>> {
    snapshot: T,
    cursor: Cursor,
    target: Option<Target>,
    failed: bool,
}

impl<T: AsRef<str>> Maps<T> {
    pub(crate) fn new(snapshot: T, target: Option<Target>, config: &Config) -> Self {
        Maps {
            snapshot,
            cursor: Cursor::new(config.page_size),
            target,
            failed: false,
        }
    }

    /// The process this snapshot was taken from, or None for text parsed directly.
    /// Malformed record errors carry the same process id.
    pub fn target(&self) -> Option<Target> {
        self.target
    }
}

impl<T: AsRef<str>> Iterator for Maps<T> {
    type Item = Result<MapEntry, MapsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = match self.cursor.next_record(self.snapshot.as_ref())? {
            Ok(record) => normalize(&record),
            Err(e) => Err(e),
        };
        let result = result.map_err(|e| {
            self.failed = true;
            match self.target {
                Some(target) => {
                    debug!("maps of process {}: {}", target, e);
                    e.with_pid(target.pid())
                }
                None => {
                    debug!("maps text: {}", e);
                    e
                }
            }
        });
        Some(result)
    }
}

impl<T: AsRef<str>> FusedIterator for Maps<T> {}
