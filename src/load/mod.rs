// src/load/mod.rs

//! Loading compiled artifacts and harvesting what they declare.

pub mod archive;
pub mod loader;
pub mod runtime;

pub use archive::{list_modules, ArchiveContext, ArchiveRuntime, SCRIPT_MODULE};
pub use loader::{ArtifactLoader, Harvest};
pub use runtime::{
    Declaration, LoadContext, LoadedModule, Member, MemberValue, ModuleRuntime, ReturnKind,
};
