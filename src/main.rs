//=====================================================
// File: main.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: ChronoScript CLI entry point
// Objective: Run .chs source files or an interactive REPL, with AST
//            printing, JSON diagnostics and configurable runtime limits
//=====================================================

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use chronoscript::config::RuntimeConfig;
use chronoscript::devtools::repl::{ReplOutput, ReplSession};
use chronoscript::diagnostics::{Diagnostic, ErrorSink};
use chronoscript::interpreter::Interpreter;
use chronoscript::runtime::{RunReport, run_source};
use chronoscript::source::SourceFile;

/// sysexits EX_DATAERR
const EXIT_DATA_ERROR: u8 = 65;
/// sysexits EX_IOERR
const EXIT_IO_ERROR: u8 = 74;

#[derive(Parser, Debug)]
#[command(name = "chronoscript", version, about = "ChronoScript temporal interpreter")]
pub struct Args {
    /// Path to a .chs script. Starts a REPL when omitted.
    pub script: Option<PathBuf>,

    /// Runtime configuration file (TOML).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Print parsed AST before execution.
    #[arg(long = "print-ast")]
    pub print_ast: bool,

    /// Emit diagnostics as JSON on stderr.
    #[arg(long = "json")]
    pub json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    install_tracing(args.verbose);

    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn install_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn run(args: &Args) -> Result<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    match &args.script {
        Some(path) => run_file(path, config, args),
        None => run_repl(config, args),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<RuntimeConfig> {
    if let Some(path) = explicit {
        return RuntimeConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()));
    }
    match RuntimeConfig::default_path() {
        Some(path) => RuntimeConfig::load_or_default(&path)
            .with_context(|| format!("loading configuration {}", path.display())),
        None => Ok(RuntimeConfig::default()),
    }
}

//=====================================================
//            Section 1: File Execution
//=====================================================

fn run_file(path: &Path, config: RuntimeConfig, args: &Args) -> Result<ExitCode> {
    if path.extension().is_none_or(|ext| ext != "chs") {
        eprintln!(
            "warning: {} does not have the .chs extension",
            path.display()
        );
    }
    let source = match SourceFile::from_path(path) {
        Ok(source) => Rc::new(source),
        Err(err) => {
            eprintln!("error: {}", err);
            return Ok(ExitCode::from(EXIT_IO_ERROR));
        }
    };

    let mut interpreter = Interpreter::with_config(config, ErrorSink::new());
    let report = run_source(&mut interpreter, source);
    if args.print_ast {
        println!("{:#?}", report.program);
    }
    emit_diagnostics(&report.diagnostics, args.json)?;

    if report.has_errors() {
        if let Some(error) = &report.error {
            tracing::info!(code = error.code_str(), "script failed");
        }
        return Ok(ExitCode::from(EXIT_DATA_ERROR));
    }
    if let Some(value) = &report.value {
        if !value.is_nil() {
            println!("{}", value);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn emit_diagnostics(diagnostics: &[Diagnostic], as_json: bool) -> Result<()> {
    if diagnostics.is_empty() {
        return Ok(());
    }
    let mut stderr = io::stderr().lock();
    if as_json {
        let entries: Vec<_> = diagnostics.iter().map(Diagnostic::to_json).collect();
        let rendered = serde_json::to_string_pretty(&json!({ "diagnostics": entries }))?;
        writeln!(stderr, "{}", rendered)?;
    } else {
        for diagnostic in diagnostics {
            writeln!(stderr, "{}", diagnostic)?;
        }
    }
    Ok(())
}

//=====================================================
//            Section 2: REPL
//=====================================================

fn run_repl(config: RuntimeConfig, args: &Args) -> Result<ExitCode> {
    let mut session = ReplSession::new(config);
    let stdin = io::stdin();
    let mut input = stdin.lock();
    println!("ChronoScript REPL. Type 'help' for commands, 'exit' to quit.");

    loop {
        print!("chrono> ");
        io::stdout().flush().context("flushing prompt")?;
        let mut line = String::new();
        let read = input.read_line(&mut line).context("reading REPL input")?;
        if read == 0 {
            println!();
            break;
        }
        match session.handle_line(&line) {
            ReplOutput::Exit => break,
            ReplOutput::Empty => {}
            ReplOutput::Message(text) => println!("{}", text),
            ReplOutput::Evaluated(report) => print_repl_report(&report, args)?,
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn print_repl_report(report: &RunReport, args: &Args) -> Result<()> {
    if args.print_ast {
        println!("{:#?}", report.program);
    }
    emit_diagnostics(&report.diagnostics, args.json)?;
    if let Some(value) = &report.value {
        println!("{}", value);
    }
    Ok(())
}

//=====================================================
// End of file
//=====================================================
