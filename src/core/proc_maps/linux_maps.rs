use crate::core::types::{MalformedReason, MapsError};

/*
 * Tokenizer for the Linux /proc/PID/maps text format. One record per line:
 *
 *   00400000-00507000 r-xp 00000000 00:14 205736      /usr/bin/fish
 *
 * Columns are padded with a variable amount of whitespace and the pathname is optional.
 * Numeric columns are parsed and checked here; flag characters and pathnames are left
 * for the normalizer to interpret.
 */

/// One line of a maps file. Borrows from the snapshot it was read out of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord<'a> {
    /// 0-based line index in the snapshot
    pub line: usize,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
    pub flags: &'a str,
    pub offset: u64,
    pub device: (u32, u32),
    pub inode: u64,
    pub path: Option<&'a str>,
}

/// Parser state over a snapshot. Kept apart from the text so that an owner of the snapshot
/// can drive it without borrowing itself.
#[derive(Debug, Clone)]
pub struct Cursor {
    pos: usize,
    line: usize,
    page_size: usize,
    previous_end: Option<usize>,
    done: bool,
}

impl Cursor {
    pub fn new(page_size: usize) -> Cursor {
        Cursor {
            pos: 0,
            line: 0,
            page_size,
            previous_end: None,
            done: false,
        }
    }

    /// Parses the next record out of `text`, which must be the same text on every call.
    /// After the first error no more records are produced.
    pub fn next_record<'a>(&mut self, text: &'a str) -> Option<Result<RawRecord<'a>, MapsError>> {
        while !self.done && self.pos < text.len() {
            let rest = &text[self.pos..];
            let (line, consumed) = match rest.find('\n') {
                Some(newline) => (&rest[..newline], newline + 1),
                None => (rest, rest.len()),
            };
            let line = line.strip_suffix('\r').unwrap_or(line);
            let index = self.line;
            self.pos += consumed;
            self.line += 1;

            if line.trim().is_empty() {
                continue;
            }

            let result = self.parse_line(index, line);
            match result {
                Ok(ref record) => {
                    trace!("maps line {}: {:#x}-{:#x}", index, record.start, record.end);
                    self.previous_end = Some(record.end);
                }
                Err(_) => self.done = true,
            }
            return Some(result);
        }
        self.done = true;
        None
    }

    fn parse_line<'a>(&self, index: usize, line: &'a str) -> Result<RawRecord<'a>, MapsError> {
        let malformed = |reason| MapsError::malformed(index, line, reason);

        let (range, rest) = required_field(line, "address").map_err(malformed)?;
        let (flags, rest) = required_field(rest, "perms").map_err(malformed)?;
        let (offset, rest) = required_field(rest, "offset").map_err(malformed)?;
        let (device, rest) = required_field(rest, "dev").map_err(malformed)?;
        let (inode, rest) = required_field(rest, "inode").map_err(malformed)?;
        let path = rest.trim_start();
        let path = if path.is_empty() { None } else { Some(path) };

        let (start, end) = range
            .split_once('-')
            .ok_or_else(|| malformed(MalformedReason::NoRangeSeparator))?;
        let start = parse_hex::<usize>("start", start).map_err(malformed)?;
        let end = parse_hex::<usize>("end", end).map_err(malformed)?;
        if start >= end {
            return Err(malformed(MalformedReason::EmptyRange { start, end }));
        }
        for addr in [start, end] {
            if self.page_size > 1 && addr % self.page_size != 0 {
                return Err(malformed(MalformedReason::Unaligned {
                    addr,
                    page_size: self.page_size,
                }));
            }
        }
        if let Some(previous_end) = self.previous_end {
            if start < previous_end {
                return Err(malformed(MalformedReason::Overlap { start, previous_end }));
            }
        }

        check_flag_chars(flags).map_err(malformed)?;
        let offset = parse_hex::<u64>("offset", offset).map_err(malformed)?;
        let device = parse_device(device).map_err(malformed)?;
        let inode = parse_inode(inode).map_err(malformed)?;

        Ok(RawRecord {
            line: index,
            text: line,
            start,
            end,
            flags,
            offset,
            device,
            inode,
            path,
        })
    }
}

/// Borrowing iterator over the records of a snapshot
pub struct Records<'a> {
    text: &'a str,
    cursor: Cursor,
}

impl<'a> Records<'a> {
    pub fn new(text: &'a str, page_size: usize) -> Records<'a> {
        Records {
            text,
            cursor: Cursor::new(page_size),
        }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<RawRecord<'a>, MapsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next_record(self.text)
    }
}

impl<'a> std::iter::FusedIterator for Records<'a> {}

// Splits off the next whitespace-delimited field, skipping leading padding
fn next_field(s: &str) -> Option<(&str, &str)> {
    let s = s.trim_start();
    if s.is_empty() {
        return None;
    }
    let end = s.find(char::is_whitespace).unwrap_or(s.len());
    Some(s.split_at(end))
}

fn required_field<'a>(
    s: &'a str,
    name: &'static str,
) -> Result<(&'a str, &'a str), MalformedReason> {
    next_field(s).ok_or(MalformedReason::MissingField(name))
}

trait FromHex: Sized {
    fn from_hex(s: &str) -> Option<Self>;
}

impl FromHex for usize {
    fn from_hex(s: &str) -> Option<Self> {
        usize::from_str_radix(s, 16).ok()
    }
}

impl FromHex for u64 {
    fn from_hex(s: &str) -> Option<Self> {
        u64::from_str_radix(s, 16).ok()
    }
}

impl FromHex for u32 {
    fn from_hex(s: &str) -> Option<Self> {
        u32::from_str_radix(s, 16).ok()
    }
}

fn parse_hex<T: FromHex>(field: &'static str, value: &str) -> Result<T, MalformedReason> {
    // from_str_radix accepts a leading '+', the kernel never prints one
    let digits_only = !value.is_empty() && value.bytes().all(|b| b.is_ascii_hexdigit());
    digits_only
        .then(|| T::from_hex(value))
        .flatten()
        .ok_or_else(|| MalformedReason::BadHex {
            field,
            value: value.to_string(),
        })
}

fn parse_device(device: &str) -> Result<(u32, u32), MalformedReason> {
    let bad = || MalformedReason::BadDevice(device.to_string());
    let (major, minor) = device.split_once(':').ok_or_else(bad)?;
    let major = parse_hex::<u32>("dev", major).map_err(|_| bad())?;
    let minor = parse_hex::<u32>("dev", minor).map_err(|_| bad())?;
    Ok((major, minor))
}

fn parse_inode(inode: &str) -> Result<u64, MalformedReason> {
    let digits_only = !inode.is_empty() && inode.bytes().all(|b| b.is_ascii_digit());
    digits_only
        .then(|| inode.parse::<u64>().ok())
        .flatten()
        .ok_or_else(|| MalformedReason::BadInode(inode.to_string()))
}

fn check_flag_chars(flags: &str) -> Result<(), MalformedReason> {
    if flags.chars().count() != 4 {
        return Err(MalformedReason::BadFlagsLength(flags.to_string()));
    }
    match flags.chars().find(|c| !matches!(c, 'r' | 'w' | 'x' | 's' | 'p' | '-')) {
        Some(c) => Err(MalformedReason::BadFlag(c)),
        None => Ok(()),
    }
}
