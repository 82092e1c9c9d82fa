//! `flashcppc` (§6.1): the command-line driver that strings the pipeline
//! crates together - `flashcpp-lex` → `flashcpp-par` → `flashcpp-sem` →
//! `flashcpp-ir` → `flashcpp-codegen` → `flashcpp-obj` - and writes one
//! object file per input source.
//!
//! The flag set is closed (§6.1): this crate does not grow new flags to
//! match a real `clang`/`gcc` surface. `-I`/`-D` are accepted for
//! command-line compatibility with build systems that always pass them, but
//! since input is already-preprocessed C++ (§6.1: "Input: one or more
//! preprocessed C++ source files"), this binary never invokes a
//! preprocessor and the flags are inert here.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use flashcpp_ir::Target;
use flashcpp_util::{Handler, SourceMap, StringInterner};
use tracing::{debug, info};

/// `flashcppc` - compiles preprocessed C++20 translation units to native
/// object files.
#[derive(Debug, Parser)]
#[command(name = "flashcppc", version, about)]
pub struct Cli {
    /// Preprocessed C++ source files to compile.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output object file path. Only valid with a single input file;
    /// defaults to the input's basename with the platform object suffix.
    #[arg(short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Print progress to stderr as each pipeline stage runs.
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Emit a minimal DWARF-lite line table alongside the object code.
    #[arg(short = 'g')]
    pub debug_info: bool,

    /// Target Linux: System V ABI, ELF64 object format, Itanium mangling.
    #[arg(long = "target-linux", conflicts_with = "target_windows")]
    pub target_linux: bool,

    /// Target Windows: Win64 ABI, PE/COFF object format, MSVC mangling.
    #[arg(long = "target-windows", conflicts_with = "target_linux")]
    pub target_windows: bool,

    /// Include directory, forwarded to the external preprocessor.
    #[arg(short = 'I', value_name = "DIR")]
    pub include_dirs: Vec<PathBuf>,

    /// Preprocessor macro definition (`name` or `name=value`), forwarded to
    /// the external preprocessor.
    #[arg(short = 'D', value_name = "NAME[=VALUE]")]
    pub defines: Vec<String>,

    /// Language mode. `c++20` is the only accepted value (§6.1).
    #[arg(long = "std", value_name = "STD", default_value = "c++20")]
    pub std: String,
}

impl Cli {
    fn target(&self) -> Target {
        if self.target_windows {
            Target::Windows
        } else if self.target_linux {
            Target::Linux
        } else {
            Target::host()
        }
    }
}

/// Why a compilation failed, mapped to the exit codes in §6.1/§7.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// A source file failed to compile: lexical, parse, or semantic
    /// errors were reported through the diagnostic handler.
    #[error("compilation failed with {0} error(s)")]
    Compile(usize),

    /// Reading the input or writing the output object file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything the pipeline itself treats as a bug, not a user-facing
    /// diagnostic (e.g. the object writer rejecting generated code).
    #[error("internal compiler error: {0}")]
    Internal(String),
}

impl DriverError {
    /// Exit code per §6.1: 0 success, 1 parse/semantic error, 2 IO error,
    /// 3 internal error. `clap`'s own usage errors exit separately (its
    /// convention, noted in `SPEC_FULL.md`).
    pub fn exit_code(&self) -> ExitCode {
        match self {
            DriverError::Compile(_) => ExitCode::from(1),
            DriverError::Io(_) => ExitCode::from(2),
            DriverError::Internal(_) => ExitCode::from(3),
        }
    }
}

/// Runs the full CLI: validates flags, compiles every input, and returns
/// the process exit code. `main` only needs to forward the parsed [`Cli`]
/// in and the returned code out.
///
/// Each input is compiled behind an [`anyhow::Result`] so that I/O context
/// (which file, which stage) rides along with the error regardless of
/// which pipeline crate raised it; the exit code is then decided by
/// downcasting back to the typed [`DriverError`] underneath.
pub fn run(cli: Cli) -> ExitCode {
    if cli.std != "c++20" {
        eprintln!("flashcppc: unsupported --std value '{}', only 'c++20' is accepted", cli.std);
        return ExitCode::from(3);
    }
    if cli.output.is_some() && cli.inputs.len() > 1 {
        eprintln!("flashcppc: -o requires a single input file");
        return ExitCode::from(3);
    }

    let target = cli.target();
    for input in &cli.inputs {
        let output = cli.output.clone().unwrap_or_else(|| default_output_path(input, target));
        info!(input = %input.display(), output = %output.display(), "compiling");
        if let Err(err) = compile_one(input, &output, target) {
            eprintln!("flashcppc: {err:#}");
            let code = err.downcast_ref::<DriverError>().map(DriverError::exit_code).unwrap_or(ExitCode::from(3));
            return code;
        }
    }
    ExitCode::SUCCESS
}

/// Input basename plus the platform object suffix (§6.1): `.o` on Linux,
/// `.obj` on Windows.
fn default_output_path(input: &Path, target: Target) -> PathBuf {
    let suffix = match target {
        Target::Linux => "o",
        Target::Windows => "obj",
    };
    input.with_extension(suffix)
}

/// Runs one translation unit through lex → parse → semantic analysis → IR
/// build → LIR lowering → object emission, writing the finished object
/// bytes to `output`.
fn compile_one(input: &Path, output: &Path, target: Target) -> anyhow::Result<()> {
    let source = fs::read_to_string(input)
        .map_err(DriverError::Io)
        .with_context(|| format!("reading {}", input.display()))?;

    let mut interner = StringInterner::new();
    let mut handler = Handler::new();

    debug!(file = %input.display(), "parsing");
    let parse_output = flashcpp_par::Parser::new(&source, &mut handler, &mut interner).parse_unit();
    let mut ast = parse_output.ast;

    debug!("semantic analysis");
    let (mut table, _names) = flashcpp_sem::analyze(&mut ast, &interner, &handler);

    report_and_check(&handler, input, &source)?;

    debug!("building IR");
    let tu = flashcpp_ir::build(&ast, &mut table, &mut interner, &handler, target);

    report_and_check(&handler, input, &source)?;

    debug!("lowering to machine LIR");
    let module = flashcpp_codegen::lower_translation_unit(&tu, &table, target);

    debug!("assembling object file");
    let bytes = flashcpp_obj::write_module(&module, &interner)
        .map_err(|e| DriverError::Internal(e.to_string()))
        .context("assembling object file")?;

    fs::write(output, &bytes)
        .map_err(DriverError::Io)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(())
}

/// Renders every diagnostic the handler has accumulated in the §7 format
/// and, if any are errors, turns them into the `Compile` exit path instead
/// of letting a partially-built IR/object continue through the pipeline.
fn report_and_check(handler: &Handler, input: &Path, source: &str) -> anyhow::Result<()> {
    if handler.is_empty() {
        return Ok(());
    }
    let mut source_map = SourceMap::new();
    source_map.add_file(input.display().to_string(), source.to_string());

    for diagnostic in handler.diagnostics() {
        eprint!("{}", diagnostic.render(&source_map));
    }

    if handler.has_errors() {
        return Err(DriverError::Compile(handler.error_count()).into());
    }
    Ok(())
}
