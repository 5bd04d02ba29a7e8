//! `cadlc` -- the CLI surface: `compile <path> [--emit=...] [--no-emit]
//! [--option=k=v]...`. Built on `clap::Command`, a single `-p/--project`
//! style argument, plain process exit codes rather than a library-level
//! result type.

use std::process::ExitCode;

use cadl_compiler_cli::fs_host::FsHost;
use cadl_compiler_cli::host::Host;
use cadl_compiler_cli::logging::{ConsoleLogger, LogLevel};
use cadl_compiler_cli::options::CompilerOptionsBuilder;
use cadl_compiler_cli::program::{load_program, LoadError};
use cadl_compiler_cli::version::VERSION;
use clap::{Arg, ArgAction, Command};

fn main() -> ExitCode {
    let matches = Command::new("cadlc")
        .version(VERSION)
        .about("CADL compiler")
        .subcommand(
            Command::new("compile")
                .arg(Arg::new("path").required(true).value_name("PATH"))
                .arg(
                    Arg::new("emit")
                        .long("emit")
                        .value_name("PACKAGE[:NAME]")
                        .action(ArgAction::Append),
                )
                .arg(Arg::new("no-emit").long("no-emit").action(ArgAction::SetTrue))
                .arg(Arg::new("no-std-lib").long("no-std-lib").action(ArgAction::SetTrue))
                .arg(Arg::new("output-dir").long("output-dir").value_name("DIR"))
                .arg(
                    Arg::new("option")
                        .long("option")
                        .value_name("KEY=VALUE")
                        .action(ArgAction::Append),
                ),
        )
        .get_matches();

    let Some(compile) = matches.subcommand_matches("compile") else {
        eprintln!("usage: cadlc compile <path> [--emit=<pkg>[:<name>]]... [--no-emit] [--option=<k=v>]...");
        return ExitCode::FAILURE;
    };

    let path = compile.get_one::<String>("path").expect("required");
    let mut builder = CompilerOptionsBuilder::new().no_emit(compile.get_flag("no-emit")).no_std_lib(compile.get_flag("no-std-lib"));
    if let Some(dir) = compile.get_one::<String>("output-dir") {
        builder = builder.output_dir(dir.clone());
    }
    for emit in compile.get_many::<String>("emit").unwrap_or_default() {
        builder = builder.emit(emit);
    }
    for option in compile.get_many::<String>("option").unwrap_or_default() {
        if let Some((key, value)) = option.split_once('=') {
            builder = builder.option(key, value);
        } else {
            eprintln!("warning: ignoring malformed --option '{option}' (expected key=value)");
        }
    }
    let options = builder.build();

    let logger = ConsoleLogger::new(LogLevel::Info);
    let host = FsHost::new(logger, Vec::new());

    let program = match load_program(&host, path, options) {
        Ok(program) => program,
        Err(LoadError::Fatal(diagnostics)) => {
            for diag in &diagnostics {
                host.log(LogLevel::Error, &format!("{}: {}", diag.code, diag.message));
            }
            return ExitCode::FAILURE;
        }
    };

    for diag in program.diagnostics() {
        let level = match diag.severity {
            cadl_compiler::diagnostics::Severity::Error => LogLevel::Error,
            cadl_compiler::diagnostics::Severity::Warning => LogLevel::Warn,
        };
        host.log(level, &format!("{}: {}", diag.code, diag.message));
    }

    if program.has_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
