//! Command line interpreter for the pscript programming language.
//!
//! With `--file` the script runs once against a fresh context; without it
//! an interactive session reads one complete script per line against a
//! persistent context.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use pscript::{Context, ExecutionContext, Script};

/// Command line interpreter for the pscript programming language.
#[derive(Parser, Debug)]
#[command(name = "pscript", version, about)]
struct Cli {
    /// Path to the pscript file to execute.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Memory to allocate for the interpreter, in bytes.
    #[arg(short, long, default_value_t = 1024 * 1024)]
    memory: usize,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    match cli.file {
        Some(path) => run_from_file(&path, cli.memory),
        None => run_interactive(cli.memory),
    }
}

fn run_from_file(path: &PathBuf, memory: usize) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Failed to open file {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    };

    let script = match Script::parse(source) {
        Ok(script) => script,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let mut ctx = Context::new(memory);
    let mut runtime = ExecutionContext::default();
    match ctx.try_execute(&script, &mut runtime) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("execution terminated due to unexpected exception: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_interactive(memory: usize) -> ExitCode {
    let mut ctx = Context::new(memory);
    let mut runtime = ExecutionContext::default();

    println!("====================== pscript interactive tool ======================");
    loop {
        print!(">>> ");
        use std::io::Write as _;
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim_end_matches(['\n', '\r']).to_string();
        if line == "quit" {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }

        // Each line is parsed as a complete script and executed against
        // the persistent context; errors go to the error sink and the
        // session continues.
        match Script::parse(line) {
            Ok(script) => ctx.execute(&script, &mut runtime),
            Err(err) => eprintln!("{err}"),
        }
    }
    ExitCode::SUCCESS
}
