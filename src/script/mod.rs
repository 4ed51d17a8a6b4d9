// src/script/mod.rs

//! Build-script sources and everything that happens to them before the
//! compiler runs.
//!
//! - [`source`] holds the immutable [`ScriptSource`] handle.
//! - [`discovery`] finds scripts below a project root.
//! - [`directives`] extracts plugin/repository declarations for the
//!   bootstrap compile.
//! - [`cache`] decides whether a compiled artifact can be reused.

pub mod cache;
pub mod directives;
pub mod discovery;
pub mod source;

pub use cache::{CacheGuard, CacheLayout, VersionCheck};
pub use directives::{extract_directives, DirectiveCall, DirectiveKind, ExtractedDirectives};
pub use discovery::{discover_scripts, ScriptPatterns};
pub use source::ScriptSource;
