use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use itertools::Itertools;
use miette::{NamedSource, Report};
use vara_syntax::analyze;

/// Check Vara programs for lexical, grammar and type errors.
#[derive(Parser, Debug)]
#[command(author, version, long_about = None)]
struct Args {
    /// Program files to check; reads one program from stdin when empty
    files: Vec<PathBuf>,

    /// Print the token stream of each program
    #[arg(long)]
    tokens: bool,

    /// Only report programs that are not accepted
    #[arg(short, long)]
    quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let programs = if args.files.is_empty() {
        let mut source = String::new();
        std::io::stdin()
            .read_to_string(&mut source)
            .context("failed to read program from stdin")?;
        vec![("<stdin>".to_string(), source)]
    } else {
        args.files
            .iter()
            .map(|path| {
                let source = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Ok((path.display().to_string(), source))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let mut rejected = 0;
    for (name, source) in programs {
        if !check(&name, source, &args) {
            rejected += 1;
        }
    }

    if rejected > 0 {
        tracing::debug!(rejected, "some programs were not accepted");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Report on one program; returns whether it was accepted.
fn check(name: &str, source: String, args: &Args) -> bool {
    let analysis = match analyze(&source) {
        Ok(analysis) => analysis,
        Err(error) => {
            println!("Result for {name}:");
            let report = Report::new(error).with_source_code(NamedSource::new(name, source));
            eprintln!("{report:?}");
            return false;
        }
    };

    let accepted = analysis.is_accepted();
    if args.quiet && accepted {
        return true;
    }

    println!("Result for {name}:");
    if args.tokens {
        println!("  {}", analysis.tokens.iter().join(" "));
    }
    for variable in &analysis.undeclared {
        println!("  warning: variable '{variable}' used without declaration");
    }
    if let Some(error) = analysis.error() {
        let report = Report::new(error.clone()).with_source_code(NamedSource::new(name, source));
        eprintln!("{report:?}");
    }
    if accepted {
        println!("  all correct");
    }
    accepted
}
