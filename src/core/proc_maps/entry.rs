use std::fmt;

use serde::ser::{Serialize, Serializer};

/// A single permission bit of a mapping, in the order the kernel prints them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Flag {
    Read,
    Write,
    Execute,
    Private,
    Shared,
}

impl Flag {
    pub fn as_char(&self) -> char {
        match self {
            Flag::Read => 'r',
            Flag::Write => 'w',
            Flag::Execute => 'x',
            Flag::Private => 'p',
            Flag::Shared => 's',
        }
    }
}

/// Permission set of a mapping. Exactly one of `Private`/`Shared` is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Flags {
    read: bool,
    write: bool,
    execute: bool,
    shared: bool,
}

impl Flags {
    pub fn new(read: bool, write: bool, execute: bool, shared: bool) -> Flags {
        Flags {
            read,
            write,
            execute,
            shared,
        }
    }

    pub fn contains(&self, flag: Flag) -> bool {
        match flag {
            Flag::Read => self.read,
            Flag::Write => self.write,
            Flag::Execute => self.execute,
            Flag::Private => !self.shared,
            Flag::Shared => self.shared,
        }
    }

    /// Iterates the flags that are set, ordered read, write, execute, private/shared
    pub fn iter(&self) -> impl Iterator<Item = Flag> + '_ {
        [Flag::Read, Flag::Write, Flag::Execute, Flag::Private, Flag::Shared]
            .into_iter()
            .filter(move |flag| self.contains(*flag))
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for flag in [Flag::Read, Flag::Write, Flag::Execute] {
            let c = if self.contains(flag) { flag.as_char() } else { '-' };
            write!(f, "{}", c)?;
        }
        let sharing = if self.shared { Flag::Shared } else { Flag::Private };
        write!(f, "{}", sharing.as_char())
    }
}

impl Serialize for Flags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Device number of the filesystem holding a mapping's backing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Device {
    pub major: u32,
    pub minor: u32,
}

impl Device {
    pub fn is_null(&self) -> bool {
        self.major == 0 && self.minor == 0
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02x}:{:02x}", self.major, self.minor)
    }
}

impl Serialize for Device {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Kernel-labelled anonymous regions, e.g. `[heap]`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PseudoRegion {
    Heap,
    Stack,
    /// `[stack:<tid>]`, printed by older kernels for thread stacks
    ThreadStack(u32),
    Vdso,
    Vvar,
    Vsyscall,
    /// Any other bracketed label, such as `[anon:name]` or `[uprobes]`
    Named(String),
}

impl PseudoRegion {
    /// Recognizes a bracketed label. Returns None for anything that isn't one.
    pub fn from_label(label: &str) -> Option<PseudoRegion> {
        let inner = label.strip_prefix('[')?.strip_suffix(']')?;
        let region = match inner {
            "heap" => PseudoRegion::Heap,
            "stack" => PseudoRegion::Stack,
            "vdso" => PseudoRegion::Vdso,
            "vvar" => PseudoRegion::Vvar,
            "vsyscall" => PseudoRegion::Vsyscall,
            _ => match inner.strip_prefix("stack:").and_then(|tid| tid.parse().ok()) {
                Some(tid) => PseudoRegion::ThreadStack(tid),
                None => PseudoRegion::Named(inner.to_string()),
            },
        };
        Some(region)
    }

    pub fn label(&self) -> String {
        match self {
            PseudoRegion::Heap => "[heap]".to_string(),
            PseudoRegion::Stack => "[stack]".to_string(),
            PseudoRegion::ThreadStack(tid) => format!("[stack:{}]", tid),
            PseudoRegion::Vdso => "[vdso]".to_string(),
            PseudoRegion::Vvar => "[vvar]".to_string(),
            PseudoRegion::Vsyscall => "[vsyscall]".to_string(),
            PseudoRegion::Named(name) => format!("[{}]", name),
        }
    }
}

/// What a mapping is backed by.
///
/// `Anonymous` regions usually have no path, but some platforms label anonymous memory with a
/// path-like string; such entries keep the label in `MapEntry::path` and stay `Anonymous`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum RegionKind {
    Anonymous,
    Pseudo(PseudoRegion),
    File { deleted: bool },
}

/// One contiguous region of a process's address space with uniform permissions and backing.
///
/// Entries are snapshots: they are built once while parsing and never refreshed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MapEntry {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) flags: Flags,
    pub(crate) offset: u64,
    pub(crate) device: Option<Device>,
    pub(crate) inode: Option<u64>,
    pub(crate) path: Option<String>,
    pub(crate) kind: RegionKind,
}

impl MapEntry {
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn size(&self) -> usize {
        self.end - self.start
    }

    pub fn flags(&self) -> Flags {
        self.flags
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn device(&self) -> Option<Device> {
        self.device
    }

    pub fn inode(&self) -> Option<u64> {
        self.inode
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn kind(&self) -> &RegionKind {
        &self.kind
    }

    /// True iff the region is backed by a real filesystem object, i.e. it has both a device
    /// and an inode. A path alone (e.g. `[stack]`) does not make a mapping backed.
    pub fn is_backed(&self) -> bool {
        self.device.is_some() && self.inode.is_some()
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, RegionKind::Pseudo(_))
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self.kind, RegionKind::File { deleted: true })
    }

    pub fn contains(&self, addr: usize) -> bool {
        addr >= self.start && addr < self.end
    }

    pub fn is_read(&self) -> bool {
        self.flags.contains(Flag::Read)
    }

    pub fn is_write(&self) -> bool {
        self.flags.contains(Flag::Write)
    }

    pub fn is_exec(&self) -> bool {
        self.flags.contains(Flag::Execute)
    }

    pub fn is_shared(&self) -> bool {
        self.flags.contains(Flag::Shared)
    }

    pub fn is_private(&self) -> bool {
        self.flags.contains(Flag::Private)
    }
}

impl fmt::Display for MapEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:08x} {} {:08x} {} {}",
            self.start,
            self.end,
            self.flags,
            self.offset,
            self.device.unwrap_or(Device { major: 0, minor: 0 }),
            self.inode.unwrap_or(0)
        )?;
        if let Some(ref path) = self.path {
            write!(f, " {}", path.replace('\n', "\\012"))?;
            if self.is_deleted() {
                write!(f, " (deleted)")?;
            }
        }
        Ok(())
    }
}

pub fn maps_contain_addr(addr: usize, maps: &[MapEntry]) -> bool {
    maps.iter().any(|map| map.contains(addr))
}
