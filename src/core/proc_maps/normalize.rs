use std::borrow::Cow;

use crate::core::proc_maps::entry::{Device, Flags, MapEntry, PseudoRegion, RegionKind};
use crate::core::proc_maps::linux_maps::RawRecord;
use crate::core::types::{MalformedReason, MapsError};

const DELETED_SUFFIX: &str = " (deleted)";

/// Turns a tokenized maps record into a `MapEntry`.
pub fn normalize(record: &RawRecord) -> Result<MapEntry, MapsError> {
    let flags = parse_flags(record.flags)
        .map_err(|reason| MapsError::malformed(record.line, record.text, reason))?;
    let device = Device {
        major: record.device.0,
        minor: record.device.1,
    };
    let has_backing_object = record.inode != 0 && !device.is_null();

    let (path, kind) = match record.path {
        None => (None, RegionKind::Anonymous),
        Some(label) => match PseudoRegion::from_label(label) {
            Some(region) => (Some(label.to_string()), RegionKind::Pseudo(region)),
            // Labelled anonymous memory has no file that could have been deleted, so its
            // label is kept as printed, suffix included
            None if !has_backing_object => {
                (Some(unescape(label).into_owned()), RegionKind::Anonymous)
            }
            None => {
                let (path, deleted) = split_deleted(label);
                (Some(unescape(path).into_owned()), RegionKind::File { deleted })
            }
        },
    };

    let backed = matches!(kind, RegionKind::File { .. });
    Ok(MapEntry {
        start: record.start,
        end: record.end,
        flags,
        offset: record.offset,
        device: if backed { Some(device) } else { None },
        inode: if backed { Some(record.inode) } else { None },
        path,
        kind,
    })
}

/// Maps the positional `rwxp` flag column onto `Flags`
fn parse_flags(flags: &str) -> Result<Flags, MalformedReason> {
    let chars: Vec<char> = flags.chars().collect();
    if chars.len() != 4 {
        return Err(MalformedReason::BadFlagsLength(flags.to_string()));
    }
    let bit = |c: char, expected: char| -> Result<bool, MalformedReason> {
        match c {
            '-' => Ok(false),
            c if c == expected => Ok(true),
            c => Err(MalformedReason::BadFlag(c)),
        }
    };
    let read = bit(chars[0], 'r')?;
    let write = bit(chars[1], 'w')?;
    let execute = bit(chars[2], 'x')?;
    let shared = match chars[3] {
        's' => true,
        'p' => false,
        '-' => return Err(MalformedReason::NoSharingFlag),
        c => return Err(MalformedReason::BadFlag(c)),
    };
    Ok(Flags::new(read, write, execute, shared))
}

fn split_deleted(path: &str) -> (&str, bool) {
    match path.strip_suffix(DELETED_SUFFIX) {
        Some(stripped) => (stripped, true),
        None => (path, false),
    }
}

// The kernel prints newlines in pathnames as the octal escape \012
fn unescape(path: &str) -> Cow<'_, str> {
    if path.contains("\\012") {
        Cow::Owned(path.replace("\\012", "\n"))
    } else {
        Cow::Borrowed(path)
    }
}
