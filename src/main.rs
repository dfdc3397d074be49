use std::{
    fs::read_to_string,
    io::{self, BufRead, Write},
    path::PathBuf,
    process::ExitCode,
    time::Instant,
};

use clap::{Parser, ValueEnum};
use tinypy::{
    ast::types::Type,
    compiler::{instructions::render_all, stdlib::emit_module},
    errors::errors::{Error, ErrorTip},
    lexer::lexer::tokenize,
    parser::parser::parse,
    repl::{Outcome, Session},
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    /// WebAssembly text module
    Wat,
    /// Instructions of the main procedure and every declared procedure
    Instrs,
    /// Parsed syntax tree
    Ast,
}

#[derive(Parser)]
#[command(name = "tinypy", about = "Compiler for a typed Python subset", version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Source file to compile and run; starts a REPL when omitted
    file: Option<PathBuf>,

    /// Print an intermediate form instead of running the program
    #[arg(long, value_enum)]
    emit: Option<Emit>,

    /// Print how long each phase took
    #[arg(long)]
    timings: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.file {
        Some(file) => {
            let source = match read_to_string(file) {
                Ok(source) => source,
                Err(error) => {
                    eprintln!("Failed to read {}: {}", file.display(), error);
                    return ExitCode::FAILURE;
                }
            };

            match run_file(&cli, &source) {
                Ok(()) => ExitCode::SUCCESS,
                Err(error) => {
                    display_error(&error, &source);
                    ExitCode::FAILURE
                }
            }
        }
        None => {
            repl();
            ExitCode::SUCCESS
        }
    }
}

fn run_file(cli: &Cli, source: &str) -> Result<(), Error> {
    let start = Instant::now();
    let timing = |phase: &str, at: Instant| {
        if cli.timings {
            println!("{} in {:?}", phase, at.elapsed());
        }
    };

    let tokens = tokenize(source)?;
    timing("Tokenized", start);

    let parse_start = Instant::now();
    let ast = parse(tokens)?;
    timing("Parsed", parse_start);

    if cli.emit == Some(Emit::Ast) {
        println!("{:#?}", ast);
        return Ok(());
    }

    let compile_start = Instant::now();
    let session = Session::new();
    let result = session.compile(source)?;
    timing("Compiled", compile_start);

    match cli.emit {
        Some(Emit::Wat) => {
            println!("{}", emit_module(&result.main, &result.procedures, &result.env));
            return Ok(());
        }
        Some(Emit::Instrs) => {
            for procedure in result.procedures.iter().chain(std::iter::once(&result.main)) {
                let mut lines = vec![];
                render_all(&procedure.body, 1, &mut lines);
                println!("{}:\n{}", procedure.name, lines.join("\n"));
            }
            return Ok(());
        }
        _ => {}
    }

    let run_start = Instant::now();
    let mut session = session;
    let outcome = session.run(source);
    timing("Ran", run_start);

    match outcome {
        Ok(outcome) => {
            show_outcome(&session, &outcome);
            timing("Total", start);
            Ok(())
        }
        Err(error) => {
            for line in session.take_output() {
                println!("{}", line);
            }
            Err(error)
        }
    }
}

fn show_outcome(session: &Session, outcome: &Outcome) {
    for line in &outcome.output {
        println!("{}", line);
    }

    // A trailing `print(...)` has already shown its output
    if outcome.result_type == Some(Type::None) {
        return;
    }

    if let Some(value) = &outcome.value {
        match session.format(value) {
            Ok(text) => println!("{}", text),
            Err(error) => eprintln!("{}", error),
        }
    }
}

/// Reads snippets from stdin. A line ending in `:` opens a block, which is
/// closed by an empty line; any other line runs on its own.
fn repl() {
    let mut session = Session::new();
    let stdin = io::stdin();
    let mut snippet = String::new();

    prompt(">>> ");
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };

        let in_block = !snippet.is_empty();
        if in_block && !line.trim().is_empty() {
            snippet.push_str(&line);
            snippet.push('\n');
            prompt("... ");
            continue;
        }

        if !in_block {
            if line.trim().is_empty() {
                prompt(">>> ");
                continue;
            }

            snippet.push_str(&line);
            snippet.push('\n');
            if line.trim_end().ends_with(':') {
                prompt("... ");
                continue;
            }
        }

        let source = std::mem::take(&mut snippet);
        match session.run(&source) {
            Ok(outcome) => show_outcome(&session, &outcome),
            Err(error) => {
                for line in session.take_output() {
                    println!("{}", line);
                }
                display_error(&error, &source);
            }
        }

        prompt(">>> ");
    }
}

fn prompt(text: &str) {
    print!("{}", text);
    let _ = io::stdout().flush();
}

fn display_error(error: &Error, source: &str) {
    eprintln!("{}", error.render(source));
    if let ErrorTip::Suggestion(tip) = error.get_tip() {
        eprintln!("tip: {}", tip);
    }
}
