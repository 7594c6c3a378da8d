//! Structure walking and per-language extraction for mycelium.
//!
//! - [`walker`] — Phase 1 directory enumeration with the fixed ignore set
//! - [`analyser`] — The [`LanguageAnalyser`](analyser::LanguageAnalyser)
//!   trait, raw extraction types, and the lazy analyser registry
//! - [`languages`] — The ten language analysers
//! - [`dotnet`] — `.sln` / `.csproj` / `.vbproj` extraction
//!
//! Analysers are total: a malformed or partially parsed file yields whatever
//! symbols were recoverable and never fails the phase.

pub mod analyser;
pub mod dotnet;
pub mod languages;
pub mod treesitter;
pub mod walker;
