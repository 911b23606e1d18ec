//! Virtual memory maps of a process.
//!
//! ```no_run
//! use sycophant::proc::maps;
//!
//! for entry in maps::current()? {
//!     let entry = entry?;
//!     match entry.path() {
//!         Some(path) if entry.is_backed() => println!("Mapping: {}", path),
//!         _ => println!("Mapping: ANONYMOUS"),
//!     }
//!     println!("  Range: {:016X}:{:016X}", entry.start(), entry.end());
//!     println!("  Prot:  {}", entry.flags());
//! }
//! # Ok::<(), sycophant::MapsError>(())
//! ```
//!
//! Every call takes a fresh snapshot of the mapping table. Reading another process's maps can
//! block for as long as the kernel holds that process's memory map lock; there is no timeout.

pub use crate::core::proc_maps::{
    maps_contain_addr, normalize, Config, Device, Enumerator, Flag, Flags, MapEntry, Maps,
    MapsSource, ProcfsSource, PseudoRegion, RawRecord, Records, RegionKind,
};
pub use crate::core::types::{MalformedReason, MapsError, Pid, Target};

/// Snapshots the maps of `target` (`Target::Current` for the calling process) from /proc
pub fn all<T: Into<Target>>(target: T) -> Result<Maps<String>, MapsError> {
    Enumerator::new(ProcfsSource::new()).all(target)
}

/// Snapshots the maps of the calling process
pub fn current() -> Result<Maps<String>, MapsError> {
    all(Target::Current)
}

pub fn collect_all<T: Into<Target>>(target: T) -> Result<Vec<MapEntry>, MapsError> {
    all(target)?.collect()
}

/// Finds the mapping containing `addr`, if any
pub fn find<T: Into<Target>>(target: T, addr: usize) -> Result<Option<MapEntry>, MapsError> {
    for entry in all(target)? {
        let entry = entry?;
        if entry.contains(addr) {
            return Ok(Some(entry));
        }
        if entry.start() > addr {
            break;
        }
    }
    Ok(None)
}

pub fn is_mapped<T: Into<Target>>(target: T, addr: usize) -> Result<bool, MapsError> {
    Ok(find(target, addr)?.is_some())
}

/// Parses a maps table captured earlier, e.g. a saved copy of /proc/PID/maps
pub fn parse<'a>(text: &'a str, config: &Config) -> Maps<&'a str> {
    Maps::new(text, None, config)
}
