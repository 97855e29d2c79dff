#![allow(non_snake_case)]
use std::env;
use std::path::PathBuf;
use std::process;

use RustedSparseBench::Utils::logger::init_combined_logger;
use RustedSparseBench::Utils::sys_info::benchmark_environment;
use RustedSparseBench::benchmark::driver::{
    BatchConfig, run_batch, summary_table, to_summary_records,
};
use RustedSparseBench::benchmark::metrics::SysinfoProbe;
use RustedSparseBench::benchmark::report::save_summary_to_csv;
use log::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_help() {
    println!(
        r#"RustedSparseBench - direct sparse solver benchmark harness

USAGE:
    RustedSparseBench run --matrices-dir <dir> --matrix <name>... --output-dir <dir>
    RustedSparseBench run --batch <config.toml>

OPTIONS:
    -h, --help              Print help information
    -V, --version           Print version information
    --matrices-dir <dir>    Directory holding <Name>/<Name>.mtx matrix suites
    --matrix <name>         Matrix to benchmark (repeatable)
    --output-dir <dir>      Directory for per-matrix metrics and solution files
    --batch <config.toml>   Read the batch description from a TOML file instead
    --no-cholesky           Skip the preferred Cholesky attempt, always use LU
    --summary-csv <path>    Also write the batch summary as CSV
    --loglevel <level>      debug, info, warn or error (default: info)

EXAMPLES:
    RustedSparseBench run --matrices-dir ./suite --matrix GT01R --matrix ns3Da --output-dir ./results
    RustedSparseBench run --batch batch.toml --summary-csv summary.csv

Exit code is 0 when every matrix succeeded, 1 when any matrix failed
(individual failures are logged and the batch always runs to the end)."#
    );
}

fn print_version() {
    println!("RustedSparseBench {}", VERSION);
}

struct CliArgs {
    batch_file: Option<PathBuf>,
    matrices_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    matrices: Vec<String>,
    attempt_cholesky: bool,
    summary_csv: Option<PathBuf>,
    loglevel: Option<String>,
}

fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut parsed = CliArgs {
        batch_file: None,
        matrices_dir: None,
        output_dir: None,
        matrices: Vec::new(),
        attempt_cholesky: true,
        summary_csv: None,
        loglevel: None,
    };
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut take_value = |name: &str| {
            iter.next()
                .map(|v| v.to_string())
                .ok_or(format!("{} requires a value", name))
        };
        match arg.as_str() {
            "--batch" => parsed.batch_file = Some(PathBuf::from(take_value("--batch")?)),
            "--matrices-dir" => {
                parsed.matrices_dir = Some(PathBuf::from(take_value("--matrices-dir")?))
            }
            "--output-dir" => parsed.output_dir = Some(PathBuf::from(take_value("--output-dir")?)),
            "--matrix" => parsed.matrices.push(take_value("--matrix")?),
            "--no-cholesky" => parsed.attempt_cholesky = false,
            "--summary-csv" => {
                parsed.summary_csv = Some(PathBuf::from(take_value("--summary-csv")?))
            }
            "--loglevel" => {
                let level = take_value("--loglevel")?;
                match level.as_str() {
                    "debug" | "info" | "warn" | "error" => parsed.loglevel = Some(level),
                    _ => return Err(format!("unknown loglevel '{}'", level)),
                }
            }
            other => return Err(format!("unknown option '{}'", other)),
        }
    }
    Ok(parsed)
}

fn build_config(args: &CliArgs) -> Result<BatchConfig, String> {
    if let Some(batch_file) = &args.batch_file {
        let mut config = BatchConfig::from_toml_file(batch_file)
            .map_err(|e| format!("failed to read {}: {}", batch_file.display(), e))?;
        if !args.attempt_cholesky {
            config.attempt_cholesky = false;
        }
        return Ok(config);
    }
    let matrices_dir = args
        .matrices_dir
        .as_deref()
        .ok_or("--matrices-dir is required (or use --batch)")?;
    let output_dir = args
        .output_dir
        .as_deref()
        .ok_or("--output-dir is required (or use --batch)")?;
    if args.matrices.is_empty() {
        return Err("at least one --matrix <name> is required".to_string());
    }
    let mut config = BatchConfig::from_dirs(&args.matrices, matrices_dir, output_dir);
    config.attempt_cholesky = args.attempt_cholesky;
    Ok(config)
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return;
    }
    if args.iter().any(|a| a == "-V" || a == "--version") {
        print_version();
        return;
    }
    match args.first().map(String::as_str) {
        Some("run") => {}
        _ => {
            eprintln!("error: expected the 'run' command, see --help");
            process::exit(2);
        }
    }

    let parsed = match parse_args(&args[1..]) {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("error: {}", msg);
            process::exit(2);
        }
    };
    let config = match build_config(&parsed) {
        Ok(config) => config,
        Err(msg) => {
            eprintln!("error: {}", msg);
            process::exit(2);
        }
    };

    init_combined_logger(parsed.loglevel.as_deref());
    benchmark_environment();

    for task in &config.tasks {
        if let Some(parent) = task.report_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                error!("cannot create output directory {}: {}", parent.display(), e);
                process::exit(1);
            }
        }
    }

    let mut probe = SysinfoProbe::new();
    let outcomes = run_batch(&config, &mut probe);

    println!("{}", summary_table(&outcomes));
    if let Some(csv_path) = &parsed.summary_csv {
        if let Err(e) = save_summary_to_csv(&to_summary_records(&outcomes), csv_path) {
            error!("failed to write summary CSV {}: {}", csv_path.display(), e);
        }
    }

    let failures = outcomes.iter().filter(|o| o.result.is_err()).count();
    info!(
        "batch finished: {} succeeded, {} failed",
        outcomes.len() - failures,
        failures
    );
    if failures > 0 {
        process::exit(1);
    }
}
