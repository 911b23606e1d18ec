//! Process introspection. Each facet lives in its own submodule; importing one has no side
//! effects.

pub mod maps;
