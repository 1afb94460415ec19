/// rgscan - ReplayGain 2.0 loudness scanner
use clap::Parser;
use rgscan_cli::{
    cli::{Cli, Commands, CustomArgs, EasyArgs},
    report, settings, EXIT_CONFIG, EXIT_JOB_FAILED, EXIT_OK,
};
use rgscan_scanner::{
    discover_directories, Config, JobRunner, LoftyTagWriter, ScanData, ScanJob,
};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();

    let level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    // Initialize tracing; reports go to stdout, logs to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "rgscan={level},rgscan_cli={level},rgscan_scanner={level},rgscan_loudness={level}"
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let status = match cli.command {
        Commands::Custom(args) => run_custom(args),
        Commands::Easy(args) => run_easy(args),
    };

    match status {
        Ok(status) => quit(status),
        Err(e) => {
            tracing::error!("{:#}", e);
            quit(EXIT_JOB_FAILED);
        }
    }
}

/// Terminate the process with `status`
fn quit(status: i32) -> ! {
    let _ = io::stdout().flush();
    std::process::exit(status)
}

fn load_config(options: &rgscan_cli::cli::ScanOptions) -> Arc<Config> {
    match settings::resolve(options) {
        Ok(config) => {
            tracing::debug!("Configuration: {}", config);
            Arc::new(config)
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            quit(EXIT_CONFIG);
        }
    }
}

fn run_custom(args: CustomArgs) -> anyhow::Result<i32> {
    let config = load_config(&args.options);

    let Some(job) = ScanJob::from_files(&args.files, Arc::clone(&config)) else {
        tracing::error!("No valid files were specified");
        return Ok(EXIT_CONFIG);
    };

    let data = Mutex::new(ScanData::new());
    let jobs = JobRunner::new(1).run(vec![job], &LoftyTagWriter::new(), &data);

    let mut out = io::stdout().lock();
    for job in &jobs {
        report::write_job(&mut out, job, &config)?;
    }

    let data = data.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner);
    Ok(if data.has_errors() {
        EXIT_JOB_FAILED
    } else {
        EXIT_OK
    })
}

fn run_easy(args: EasyArgs) -> anyhow::Result<i32> {
    let config = load_config(&args.options);

    if !args.directory.is_dir() {
        tracing::error!("Directory '{}' does not exist", args.directory.display());
        return Ok(EXIT_CONFIG);
    }

    let started = Instant::now();
    let jobs: Vec<ScanJob> = discover_directories(&args.directory, !args.no_recursive)
        .iter()
        .filter_map(|dir| ScanJob::from_directory(dir, Arc::clone(&config)))
        .collect();

    if jobs.is_empty() {
        tracing::warn!("No supported files found in {}", args.directory.display());
        return Ok(EXIT_OK);
    }

    let files: usize = jobs.iter().map(ScanJob::nb_files).sum();
    tracing::info!(
        "Found {} files in {} directories ({})",
        files,
        jobs.len(),
        config
    );

    let runner = match args.threads {
        Some(threads) => JobRunner::new(threads),
        None => JobRunner::default(),
    };

    let data = Mutex::new(ScanData::new());
    let jobs = runner.run(jobs, &LoftyTagWriter::new(), &data);

    let mut out = io::stdout().lock();
    for job in &jobs {
        report::write_job(&mut out, job, &config)?;
    }

    let data = data.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner);
    writeln!(out)?;
    report::write_summary(&mut out, &data, started.elapsed())?;

    Ok(if data.has_errors() {
        EXIT_JOB_FAILED
    } else {
        EXIT_OK
    })
}
