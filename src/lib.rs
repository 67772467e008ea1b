#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Kiln: a keyed, asynchronous, disk-backed shader compilation cache.
//!
//! A renderer extension asks [`ShaderCache`] for the program matching a
//! `(class, family, descriptor)` key. Hits return immediately; misses are
//! compiled on worker threads (or inline in synchronous mode), optionally
//! served from the on-disk bytecode cache, and handed to a
//! [`ProgramDevice`] to become native programs.

pub mod cache;
pub mod compilation;
pub mod compiler;
pub mod defines;
pub mod descriptor;
pub mod device;
pub mod disk_cache;
pub mod errors;
pub mod host;
pub mod layout;
pub mod program;
pub mod settings;
pub mod task;
pub mod utils;
pub mod watcher;
pub mod worker;

pub use cache::ShaderCache;
pub use compilation::{CompilationSet, CompilationStats};
pub use compiler::{CompileRequest, DxcCompiler, ShaderCompiler};
pub use defines::ShaderDefines;
pub use descriptor::{PassContext, ShaderClass, ShaderFamily, TechniqueDescriptor, normalize, normalize_for_pass};
pub use device::{HeadlessDevice, NativeProgram, ProgramDevice};
pub use errors::{KilnError, Result};
pub use host::{DrawCall, ProgramSubstitution, RendererExtension, Substitutes};
pub use program::{CompiledProgram, ConstantTable};
pub use settings::KilnSettings;
pub use task::CompilationTask;
pub use utils::interner;
