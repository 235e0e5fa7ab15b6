//! Benchmark command implementation

use crate::benchmark::{catalog, BenchmarkConfig, BenchmarkRunner};
use crate::cli::BenchmarkArgs;
use crate::config::Settings;
use crate::output;
use crate::process::CommandRunner;
use crate::utils::Result;
use console::Term;

/// Merge settings with the command line into a runnable configuration
pub fn benchmark_config(args: &BenchmarkArgs, settings: &Settings) -> Result<BenchmarkConfig> {
    let defaults = &settings.benchmark;
    let algorithms = if args.all {
        catalog::CIPHERS.iter().map(|c| c.name.to_string()).collect()
    } else if !args.algorithms.is_empty() {
        args.algorithms.clone()
    } else {
        defaults.algorithms.clone()
    };

    let file_size = match args.file_size {
        Some(bytes) => bytes,
        None => defaults.file_size_bytes()?,
    };

    Ok(BenchmarkConfig {
        algorithms,
        file_size,
        iterations: args.iterations.unwrap_or(defaults.iterations),
        include_kdf: args.kdf,
        kdf_algorithms: defaults.kdf_algorithms.clone(),
        kdf_iterations: args.kdf_iterations.unwrap_or(defaults.kdf_iterations),
        show_progress: !args.json && Term::stderr().is_term(),
    })
}

/// Run the benchmark command
pub fn run_benchmark(
    args: &BenchmarkArgs,
    settings: &Settings,
    runner: &dyn CommandRunner,
) -> Result<()> {
    let config = benchmark_config(args, settings)?;
    let report = BenchmarkRunner::new(runner, &settings.openssl.binary, config).run()?;

    if args.json {
        output::print_json(&report)?;
    } else {
        output::print_benchmark_report(&report);
    }

    if let Some(path) = &args.output {
        output::write_json_file(&report, path)?;
        if !args.json {
            output::print_info(&format!("Report written to {}", path.display()));
        }
    }

    report.check()?;
    Ok(())
}
