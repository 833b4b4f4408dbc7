use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser as ClapParser;

use lyra::core::diag::{CompileError, format_error};
use lyra::driver::check_source;

#[derive(ClapParser)]
#[command(name = "lyra", about = "Type-check a Lyra source file")]
struct Cli {
    /// Source file to check
    file: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let source = match std::fs::read_to_string(&cli.file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{}", CompileError::Io(cli.file, err));
            return ExitCode::FAILURE;
        }
    };

    match check_source(&source) {
        Ok(checked) => {
            for diag in &checked.parse_diags {
                eprint!("{}", format_error(&source, diag.span(), diag.kind()));
            }
            println!("ok");
            ExitCode::SUCCESS
        }
        Err(CompileError::Lex(err)) => {
            eprint!("{}", format_error(&source, err.span(), err.kind()));
            ExitCode::FAILURE
        }
        Err(CompileError::Parse(err)) => {
            eprint!("{}", format_error(&source, err.span(), err.kind()));
            ExitCode::FAILURE
        }
        Err(CompileError::Resolve(errors)) => {
            for err in &errors {
                eprint!("{}", format_error(&source, err.span(), err.kind()));
            }
            ExitCode::FAILURE
        }
        Err(CompileError::TypeCheck(errors)) => {
            for err in &errors {
                eprint!("{}", format_error(&source, err.span(), err.kind()));
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
