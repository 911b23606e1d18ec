//! Snapshot the virtual memory mappings of a running process.
//!
//! The entry point is [`proc::maps::all`], which reads the mapping table of a process once and
//! returns a lazy, address-ordered sequence of [`proc::maps::MapEntry`] values.

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate serde_derive;

pub(crate) mod core;
pub mod proc;

pub use crate::core::types::{MalformedReason, MapsError, Pid, Target};
