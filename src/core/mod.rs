pub mod proc_maps;
pub mod process;
pub mod types;
