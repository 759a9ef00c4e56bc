use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ndot_core::DType;
use tracing::Level;

mod commands;

use commands::{CliError, DotRequest};

#[derive(Parser)]
#[command(
    name = "ndot",
    about = "Generalized N-dimensional dot product",
    long_about = "Contract the last axis of one array with the second-to-last axis of another,\nNumPy-style, and print the result as nested brackets.",
    version
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). Logs go to stderr.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print dot(x, y), dot(x[0], y) and dot(x[0][0], y) for the demo operands
    Demo {
        /// Also print the rank-6 dot(x, x)
        #[arg(long)]
        self_dot: bool,
    },
    /// Dot two JSON array literals
    Dot {
        /// Left operand, e.g. '[[1, 2], [3, 4]]'
        #[arg(long, requires = "rhs", conflicts_with = "input")]
        lhs: Option<String>,
        /// Right operand
        #[arg(long, requires = "lhs", conflicts_with = "input")]
        rhs: Option<String>,
        /// JSON file of the form {"lhs": [...], "rhs": [...]}
        #[arg(long)]
        input: Option<PathBuf>,
        /// Cast both operands before contracting: i32, i64, f32, f64
        #[arg(long)]
        dtype: Option<DType>,
        /// Print only the result shape
        #[arg(long)]
        shape_only: bool,
    },
    /// Show version, dtypes and thread pool size
    Info,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn run(command: Commands, out: &mut impl Write) -> commands::Result<()> {
    match command {
        Commands::Demo { self_dot } => commands::demo(out, self_dot),
        Commands::Dot {
            lhs,
            rhs,
            input,
            dtype,
            shape_only,
        } => {
            let request = match (lhs, rhs, input) {
                (_, _, Some(path)) => DotRequest::from_file(&path)?,
                (Some(lhs), Some(rhs), None) => DotRequest::from_literals(&lhs, &rhs)?,
                _ => {
                    return Err(CliError::Request(
                        "provide --lhs and --rhs, or --input".into(),
                    ))
                }
            };
            commands::dot(out, &request, dtype, shape_only)
        }
        Commands::Info => commands::info(out),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match run(cli.command, &mut out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(args)
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_dot_flags() {
        let cli = parse(&[
            "ndot", "-vv", "dot", "--lhs", "[1, 2]", "--rhs", "[3, 4]", "--dtype", "f64",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);

        let mut out = Vec::new();
        run(cli.command, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "11.0\n");
    }

    #[test]
    fn test_operand_flag_rules() {
        assert!(parse(&["ndot", "dot", "--lhs", "[1]"]).is_err());
        assert!(parse(&["ndot", "dot", "--lhs", "[1]", "--rhs", "[1]", "--input", "r.json"]).is_err());
        assert!(parse(&["ndot", "dot", "--lhs", "[1]", "--rhs", "[1]", "--dtype", "u8"]).is_err());

        let cli = parse(&["ndot", "dot"]).unwrap();
        let err = run(cli.command, &mut Vec::<u8>::new()).unwrap_err();
        assert!(matches!(err, CliError::Request(_)));
    }

    #[test]
    fn test_demo_flags() {
        let cli = parse(&["ndot", "demo", "--self-dot"]).unwrap();
        assert!(matches!(cli.command, Commands::Demo { self_dot: true }));
        assert_eq!(cli.verbose, 0);
    }
}
