//! `rank-grader` command line.
//!
//! Reports and listings are written to stdout as JSON; logs go to stderr
//! (filtered with `RUST_LOG`).
//!
//! Exit codes: 0 on success, 1 when a graded submission did not pass every
//! case, 2 on configuration or I/O errors.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use word_rank_grader::{
    hints, Grader, GraderConfig, GraderError, ReferenceRankingGenerator, ReferenceSolution,
    Result, ValidationMode, VectorSpace,
};

#[derive(Parser)]
#[command(name = "rank-grader", version, about = "Grade word-similarity ranking submissions")]
struct Cli {
    /// JSON configuration file (built-in defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Grade a submission and print the report
    Grade(GradeArgs),

    /// Print the reference ranking of the corpus for a target word
    Reference {
        /// Target word
        target: String,

        /// Only print the best N words
        #[arg(long)]
        top: Option<usize>,
    },

    /// Print the corpus and the test cases
    Exercise,

    /// Print a hint (levels 1-5)
    Hint {
        #[arg(default_value_t = 1)]
        level: u8,
    },
}

#[derive(Args)]
struct GradeArgs {
    /// Submission source file, run by the configured interpreter
    #[arg(long, required_unless_present = "self_check", conflicts_with = "self_check")]
    source: Option<PathBuf>,

    /// Grade the built-in reference solution instead of a file
    #[arg(long)]
    self_check: bool,

    /// Fail cases whose ranking is malformed (duplicate ranks, missing words)
    #[arg(long)]
    strict: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "rank-grader failed");
            eprintln!("error: {}", err);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = match &cli.config {
        Some(path) => GraderConfig::from_json_file(path)?,
        None => GraderConfig::default(),
    };

    match cli.command {
        Command::Grade(args) => grade(config, args),
        Command::Reference { target, top } => {
            let corpus = config.corpus()?;
            let space = VectorSpace::from_config(&config);
            if config.require_dense {
                space.ensure_dense()?;
            }
            let mut scored = ReferenceRankingGenerator::new(&space).score(&target, &corpus)?;
            if let Some(top) = top {
                scored.truncate(top);
            }
            print_json(&scored)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Exercise => {
            let grader = Grader::warm_up(config)?;
            print_json(&grader.exercise())?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Hint { level } => {
            println!("{}", hints::hint(level));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn grade(config: GraderConfig, args: GradeArgs) -> Result<ExitCode> {
    let config = if args.strict {
        config.with_validation(ValidationMode::Strict)
    } else {
        config
    };
    let grader = Grader::warm_up(config)?;

    let report = match (&args.source, args.self_check) {
        (_, true) => grader.grade(&mut ReferenceSolution),
        (Some(path), false) => {
            let source = std::fs::read_to_string(path).map_err(|e| {
                GraderError::io(format!("cannot read submission {}: {}", path.display(), e))
            })?;
            grader.grade_source(&source)
        }
        (None, false) => {
            return Err(GraderError::invalid_config(
                "either --source or --self-check is required",
            ))
        }
    };

    print_json(&report)?;
    Ok(if report.all_passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
