use anyhow::{Context, Result};
use buildstamp::{aggregate_latest_timestamp, parse_ignore_filter, Config, TimestampFormat};
use chrono::{DateTime, Utc};
use clap::Parser;
use colored::Colorize;
use rayon::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Print the date of the last commit touching any tracked file under a project root",
    long_about = None
)]
struct Args {
    /// Project roots (defaults to current directory)
    #[arg(default_value = ".")]
    paths: Vec<PathBuf>,

    /// File name to leave out of the computation (repeatable)
    #[arg(long, short = 'i', value_name = "NAME")]
    ignore: Vec<String>,

    /// TOML file with a [timestamp] block (ignore_filter, format)
    #[arg(long, short, value_name = "FILE")]
    config: Option<PathBuf>,

    /// strftime pattern for the output, rendered in UTC
    #[arg(long, conflicts_with_all = ["unix", "qualifier"])]
    format: Option<String>,

    /// Print seconds since the Unix epoch
    #[arg(long, conflicts_with = "qualifier")]
    unix: bool,

    /// Print a build qualifier (%Y%m%d%H%M)
    #[arg(long)]
    qualifier: bool,

    /// Fail when no committed date is found
    #[arg(long)]
    strict: bool,

    /// Log traversal details to stderr
    #[arg(long, short)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}

fn run(args: &Args) -> Result<bool> {
    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let raw_filter = config.ignore_filter_with(&args.ignore);
    let ignore = parse_ignore_filter(raw_filter.as_deref());
    let format = TimestampFormat::from_args(
        args.format.as_deref(),
        config.timestamp.format.as_deref(),
        args.unix,
        args.qualifier,
    )?;

    tracing::debug!(
        roots = args.paths.len(),
        ignored = ignore.len(),
        "Computing build timestamps"
    );

    // Each root is an independent traversal
    let results: Vec<(&PathBuf, Option<DateTime<Utc>>)> = args
        .paths
        .par_iter()
        .map(|root| {
            aggregate_latest_timestamp(root, &ignore)
                .with_context(|| format!("Failed to read version-control metadata for {}", root.display()))
                .map(|latest| (root, latest))
        })
        .collect::<Result<Vec<_>>>()?;

    let single = results.len() == 1;
    let mut all_known = true;
    for (root, latest) in results {
        match latest {
            Some(timestamp) => {
                let rendered = format.render(&timestamp);
                if single {
                    println!("{}", rendered);
                } else {
                    println!("{}\t{}", root.display(), rendered);
                }
            }
            None => {
                all_known = false;
                eprintln!(
                    "{} no committed date found under {}",
                    "warning:".yellow().bold(),
                    root.display()
                );
                if !single {
                    println!("{}\tunknown", root.display());
                }
            }
        }
    }

    Ok(all_known)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(all_known) if all_known || !args.strict => ExitCode::SUCCESS,
        Ok(_) => {
            eprintln!(
                "{} build timestamp unknown (--strict)",
                "error:".red().bold()
            );
            ExitCode::from(2)
        }
        Err(err) => {
            eprintln!("{} {:#}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}
