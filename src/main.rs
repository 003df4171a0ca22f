//! OpsKit CLI - developer productivity and DevOps toolkit

use clap::Parser;
use opskit::config::{
    CliArgs, Commands, LogWatchArgs, OutputFormat, PipelineAction, PipelineArgs, ProfileArgs,
    QualityArgs, SetupArgs, StatsArgs,
};
use opskit::envsetup::{find_python, EnvironmentSetup, SetupConfig, SystemRunner, VenvPolicy};
use opskit::error::Result;
use opskit::monitor::{discover_log_file, LogSnapshot, LogWatcher};
use opskit::pipeline::{DeploymentConfig, PipelineConfig, PipelineHelper, PipelineResult};
use opskit::profiler::{ProfileMode, Profiler};
use opskit::progress::StepReporter;
use opskit::quality::{QualityChecker, QualityConfig};
use opskit::system::ServerStats;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn main() {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Initialize logging; RUST_LOG wins over -v/-q
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Handle result
    match run(&args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run the selected tool and return the process exit status
fn run(args: &CliArgs) -> Result<i32> {
    match &args.command {
        Commands::LogWatch(a) => cmd_logwatch(a),
        Commands::Stats(a) => cmd_stats(a),
        Commands::Quality(a) => cmd_quality(a),
        Commands::Setup(a) => cmd_setup(a, args.quiet),
        Commands::Profile(a) => cmd_profile(a),
        Commands::Pipeline(a) => cmd_pipeline(a, args.quiet),
    }
}

fn reporter(quiet: bool) -> StepReporter {
    if quiet {
        StepReporter::disabled()
    } else {
        StepReporter::for_terminal()
    }
}

fn print_snapshot(snapshot: &LogSnapshot, format: OutputFormat) {
    match format {
        OutputFormat::Text => snapshot.print_text(),
        OutputFormat::Json => {
            if let Err(e) = snapshot.print_json() {
                tracing::warn!("Cannot print snapshot: {}", e);
            }
        }
    }
}

fn cmd_logwatch(args: &LogWatchArgs) -> Result<i32> {
    let path = match &args.file {
        Some(file) => file.clone(),
        None => discover_log_file(&args.logs_dir)?,
    };
    let mut watcher = LogWatcher::new(&path)?.with_tail(args.lines);

    if args.once {
        print_snapshot(&watcher.snapshot()?, args.format);
        return Ok(0);
    }

    if args.format == OutputFormat::Text {
        println!("Monitoring {} (press Ctrl-C to stop)", path.display());
    }

    let runtime = tokio::runtime::Runtime::new()?;
    let format = args.format;
    let interval = Duration::from_secs(args.interval.max(1));

    let outcome = runtime.block_on(watcher.run(
        interval,
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Cannot listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        },
        |snapshot| print_snapshot(snapshot, format),
    ))?;

    tracing::info!(
        "{} snapshots, {} failed polls",
        outcome.snapshots,
        outcome.failed_polls
    );
    println!("\nStopped monitoring {}", path.display());
    Ok(0)
}

fn cmd_stats(args: &StatsArgs) -> Result<i32> {
    let stats = ServerStats::collect(args.top);
    match args.format {
        OutputFormat::Text => stats.print_summary(),
        OutputFormat::Json => stats.print_json()?,
    }
    Ok(0)
}

fn cmd_quality(args: &QualityArgs) -> Result<i32> {
    let config = match &args.config {
        Some(path) => QualityConfig::load(path)?,
        None => QualityConfig::default(),
    }
    .with_overrides(
        args.max_line_length,
        args.max_function_complexity,
        args.external,
    );

    let checker = QualityChecker::new(&args.project_path, config);
    let report = checker.run_analysis()?;

    match args.format {
        OutputFormat::Text => report.print_summary(),
        OutputFormat::Json => report.print_json()?,
    }
    Ok(report.exit_code())
}

fn cmd_setup(args: &SetupArgs, quiet: bool) -> Result<i32> {
    let project_dir = match &args.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };

    if args.create_template {
        let path = SetupConfig::write_template(&project_dir)?;
        println!("Configuration template created: {}", path.display());
        return Ok(0);
    }

    let python = find_python(args.python.as_deref())?;
    let config = SetupConfig::from_args(args);

    let result = EnvironmentSetup::new(config, project_dir, python, Arc::new(SystemRunner))
        .with_policy(VenvPolicy::from_flags(args.yes, args.keep))
        .with_reporter(reporter(quiet))
        .run();

    println!("\n{}", result.message);
    Ok(if result.success { 0 } else { 1 })
}

fn cmd_profile(args: &ProfileArgs) -> Result<i32> {
    let python = find_python(args.python.as_deref())?;
    let profiler = Profiler::new(&args.target_file, python).with_function(args.function.clone());

    println!("Profiling: {}", args.target_file.display());
    match profiler.mode() {
        ProfileMode::Function(name) => println!("Profiling Function: {}", name),
        ProfileMode::Module => println!("Profiling entire module"),
    }

    let run = match profiler.run() {
        Ok(run) => run,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            println!("\nProfiling FAILED");
            return Ok(1);
        }
    };

    print!("{}", run.program_output);
    eprint!("{}", run.program_errors);
    run.print_summary();
    run.print_detailed(args.limit);

    if let Some(output) = &args.output {
        match run.save(output) {
            Ok(()) => println!("Results saved to: {}", output.display()),
            Err(e) => eprintln!("ERROR: Saving results: {}", e),
        }
    }

    println!("\nProfiling Done!");
    Ok(0)
}

fn cmd_pipeline(args: &PipelineArgs, quiet: bool) -> Result<i32> {
    let mut config = PipelineConfig::load(&args.config)?;
    if let Some(timeout) = args.timeout {
        config.timeout = timeout;
    }
    let timeout = Duration::from_secs(config.timeout);

    let helper = PipelineHelper::from_config(config)?
        .with_poll_interval(Duration::from_secs(args.poll_interval))
        .with_reporter(reporter(quiet));

    let result = match &args.action {
        PipelineAction::Create => {
            let result = helper.create_pipeline();
            println!("Pipeline created: {}", result.pipeline_id);
            result
        }
        PipelineAction::Start { pipeline_id, wait } => {
            let id = pipeline_id
                .clone()
                .unwrap_or_else(|| helper.config().name.clone());
            let started = helper.start_pipeline(&id);
            println!("Pipeline started: {}", started.pipeline_id);

            if *wait && started.success {
                let finished = helper.wait_for_completion(&started.pipeline_id, timeout);
                println!("Pipeline completed: {}", finished.status);
                finished
            } else {
                started
            }
        }
        PipelineAction::Status { pipeline_id } => {
            let result = helper.get_status(pipeline_id);
            println!("Pipeline status: {}", result.status);
            result
        }
        PipelineAction::Deploy { deployment } => {
            let deployment = DeploymentConfig::load(deployment)?;
            let result = helper.deploy_service(&deployment);
            println!("Deployment result: {}", result.status);
            result
        }
    };

    Ok(finish_pipeline(&result))
}

fn finish_pipeline(result: &PipelineResult) -> i32 {
    if let Some(message) = &result.error_message {
        eprintln!("Error: {}", message);
    }
    if let Some(duration) = result.duration {
        tracing::info!("Finished after {:.1}s", duration);
    }
    if result.success {
        0
    } else {
        1
    }
}
