//! Reference compiler for subpack builds.
//!
//! [`ScriptCompiler`] is a small pass-based compiler for CommonJS-style
//! mini-program sources. It scans `require`/`import` specifiers, resolves
//! them on disk, lets the registered cache groups claim shared modules and
//! emits one chunk per entry plus one per non-empty group. Sources are
//! emitted as written; no syntax is transformed.
//!
//! [`UsingComponentsScanner`] reports the custom components a page or
//! component declares in its sibling `.json` file.

pub mod components;
pub mod compiler;
pub mod emit;
pub mod imports;
pub mod resolve;

pub use components::UsingComponentsScanner;
pub use compiler::ScriptCompiler;
pub use emit::ChunkPlan;
pub use imports::{ImportRef, scan_imports};
pub use resolve::Resolver;
