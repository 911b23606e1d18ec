pub mod entry;
pub mod enumerate;
pub mod linux_maps;
pub mod normalize;
pub mod source;

pub use self::entry::{maps_contain_addr, Device, Flag, Flags, MapEntry, PseudoRegion, RegionKind};
pub use self::enumerate::{Config, Enumerator, Maps};
pub use self::linux_maps::{RawRecord, Records};
pub use self::normalize::normalize;
pub use self::source::{MapsSource, ProcfsSource};
