//! Shader Compiler Seam
//!
//! [`ShaderCompiler`] is everything the cache needs from an HLSL toolchain:
//! turn a [`CompileRequest`] into bytecode, and reflect bytecode into a
//! [`ConstantTable`]. [`DxcCompiler`] implements it by shelling out to the
//! `dxc` executable.
//!
//! # Diagnostics
//!
//! A rejected compile surfaces as [`KilnError::Compile`] carrying the full
//! compiler output. Warnings on a successful compile are logged at debug
//! level and otherwise ignored.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::defines::ShaderDefines;
use crate::descriptor::{ShaderClass, ShaderFamily, TechniqueDescriptor};
use crate::errors::{KilnError, Result};
use crate::layout;
use crate::program::{ConstantTable, ReflectedBuffer, ReflectedVariable};

/// Everything that determines the bytecode of one program.
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    pub class: ShaderClass,
    pub family: ShaderFamily,
    pub descriptor: TechniqueDescriptor,
    pub source_path: &'a Path,
    pub include_dirs: &'a [PathBuf],
    pub defines: &'a ShaderDefines,
    /// Emit debug information and skip optimization.
    pub debug: bool,
}

impl CompileRequest<'_> {
    /// `family:class:descriptor`, used in logs and errors.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}:{}:{}", self.family, self.class, self.descriptor)
    }
}

/// An HLSL toolchain. Called concurrently from worker threads.
pub trait ShaderCompiler: Send + Sync + 'static {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<Vec<u8>>;

    /// Builds the constant table of a program. The default leaves every
    /// engine slot unused.
    fn reflect(&self, class: ShaderClass, family: ShaderFamily, bytecode: &[u8]) -> ConstantTable {
        let _ = bytecode;
        ConstantTable::with_slots(layout::slot_names(family, class).len())
    }
}

impl<C: ShaderCompiler> ShaderCompiler for std::sync::Arc<C> {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<Vec<u8>> {
        self.as_ref().compile(request)
    }

    fn reflect(&self, class: ShaderClass, family: ShaderFamily, bytecode: &[u8]) -> ConstantTable {
        self.as_ref().reflect(class, family, bytecode)
    }
}

// ============================================================================
// dxc
// ============================================================================

const ENTRY_POINT: &str = "main";

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Compiles with the `dxc` command line compiler.
#[derive(Debug, Clone)]
pub struct DxcCompiler {
    executable: PathBuf,
    scratch_dir: PathBuf,
}

impl Default for DxcCompiler {
    fn default() -> Self {
        Self::new("dxc")
    }
}

impl DxcCompiler {
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    /// Directory for intermediate output files.
    #[must_use]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    fn scratch_path(&self, extension: &str) -> PathBuf {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.scratch_dir
            .join(format!("kiln-{}-{n}.{extension}", std::process::id()))
    }

    fn run(&self, command: &mut Command) -> Result<Output> {
        command.output().map_err(|source| KilnError::ToolchainUnavailable {
            tool: self.executable.display().to_string(),
            source,
        })
    }

    fn command_line(&self, request: &CompileRequest<'_>, output: &Path) -> Command {
        let mut command = Command::new(&self.executable);
        command
            .args(["-T", request.class.profile()])
            .args(["-E", ENTRY_POINT]);

        for (name, value) in request.defines.iter() {
            let define = if value.is_empty() {
                name.to_string()
            } else {
                format!("{name}={value}")
            };
            command.arg("-D").arg(define);
        }
        for dir in request.include_dirs {
            command.arg("-I").arg(dir);
        }
        if request.debug {
            command.args(["-Zi", "-Qembed_debug", "-Od"]);
        } else {
            command.arg("-O3");
        }

        command.arg("-Fo").arg(output).arg(request.source_path);
        command
    }
}

impl ShaderCompiler for DxcCompiler {
    fn compile(&self, request: &CompileRequest<'_>) -> Result<Vec<u8>> {
        if !request.source_path.is_file() {
            return Err(KilnError::MissingSource(request.source_path.to_path_buf()));
        }

        let output_path = self.scratch_path(request.class.extension());
        let output = self.run(&mut self.command_line(request, &output_path))?;
        let diagnostics = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !output.status.success() {
            let _ = std::fs::remove_file(&output_path);
            return Err(KilnError::Compile {
                task: request.label(),
                diagnostics,
            });
        }
        if !diagnostics.is_empty() {
            log::debug!("Compiled {} with warnings:\n{diagnostics}", request.label());
        }

        let bytecode = std::fs::read(&output_path);
        let _ = std::fs::remove_file(&output_path);
        bytecode.map_err(KilnError::from)
    }

    fn reflect(&self, class: ShaderClass, family: ShaderFamily, bytecode: &[u8]) -> ConstantTable {
        let path = self.scratch_path("dxil");
        let listing = std::fs::write(&path, bytecode)
            .map_err(KilnError::from)
            .and_then(|()| self.run(Command::new(&self.executable).arg("-dumpbin").arg(&path)));
        let _ = std::fs::remove_file(&path);

        match listing {
            Ok(output) if output.status.success() => {
                let text = String::from_utf8_lossy(&output.stdout);
                ConstantTable::from_reflection(family, class, &parse_listing(&text))
            }
            Ok(output) => {
                log::warn!(
                    "Failed to reflect {family}/{class} program: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                ConstantTable::with_slots(layout::slot_names(family, class).len())
            }
            Err(err) => {
                log::warn!("Failed to reflect {family}/{class} program: {err}");
                ConstantTable::with_slots(layout::slot_names(family, class).len())
            }
        }
    }
}

// ============================================================================
// Listing parser
// ============================================================================

fn strip_comment(line: &str) -> &str {
    let line = line.trim_start();
    line.strip_prefix("//")
        .or_else(|| line.strip_prefix(';'))
        .unwrap_or(line)
        .trim()
}

/// Splits `decl ; Offset: ...` into the declaration and its annotation.
fn split_annotation(line: &str) -> Option<(&str, &str)> {
    let at = line.find("Offset:")?;
    let decl = line[..at].trim_end();
    let decl = decl
        .strip_suffix("//")
        .or_else(|| decl.strip_suffix(';'))
        .unwrap_or(decl)
        .trim();
    Some((decl, &line[at..]))
}

fn field(annotation: &str, key: &str) -> Option<u32> {
    let rest = annotation[annotation.find(key)? + key.len()..].trim_start();
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

fn variable_name(decl: &str) -> Option<&str> {
    let name = decl.trim_end_matches(';').split_whitespace().last()?;
    let name = name.split('[').next()?;
    (!name.is_empty() && !name.contains('{')).then_some(name)
}

fn finish(mut buffer: ReflectedBuffer) -> ReflectedBuffer {
    let used = buffer
        .variables
        .iter()
        .map(|v| v.offset + v.size)
        .max()
        .unwrap_or(0);
    buffer.size = buffer.size.max(used);
    buffer
}

/// Extracts constant buffer layouts from a compiler disassembly listing.
///
/// Understands both the `;`-commented listing `dxc -dumpbin` prints and the
/// `//`-commented one of older toolchains.
#[must_use]
pub fn parse_listing(text: &str) -> Vec<ReflectedBuffer> {
    let mut buffers = Vec::new();
    let mut current: Option<ReflectedBuffer> = None;

    for raw in text.lines() {
        let line = strip_comment(raw);

        if let Some(name) = line.strip_prefix("cbuffer ") {
            buffers.extend(current.take().map(finish));
            current = Some(ReflectedBuffer {
                name: name.trim().to_string(),
                ..ReflectedBuffer::default()
            });
            continue;
        }

        let Some(buffer) = current.as_mut() else {
            continue;
        };
        let Some((decl, annotation)) = split_annotation(line) else {
            continue;
        };

        if let Some(rest) = decl.strip_prefix('}') {
            if rest.trim().trim_end_matches(';').trim() == buffer.name {
                buffer.size = field(annotation, "Size:").unwrap_or(0);
                buffers.extend(current.take().map(finish));
            }
            continue;
        }

        if let (Some(name), Some(offset)) = (variable_name(decl), field(annotation, "Offset:")) {
            buffer.variables.push(ReflectedVariable {
                name: name.to_string(),
                offset,
                size: field(annotation, "Size:").unwrap_or(0),
            });
        }
    }

    buffers.extend(current.map(finish));
    buffers
}
