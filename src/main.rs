use chrono::Utc;
use clap::Parser;
use viirs_export::core::engine::{RunContext, MANIFEST_FILE};
use viirs_export::core::{ConfigProvider, ExportTask, RunReport};
use viirs_export::utils::error::{ExportError, ErrorSeverity};
use viirs_export::utils::{logger, validation::Validate};
use viirs_export::{
    plan_exports, EarthEngineClient, ExportArgs, ExportConfig, ExportEngine, LocalStorage,
};

fn exit_with(e: &ExportError) -> ! {
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ExportArgs::parse();

    logger::init_logger(args.verbose, args.log_json);
    tracing::info!("🚀 Starting viirs-export");

    let config = args.load_config().unwrap_or_else(|e| exit_with(&e));
    if let Err(e) = config.validate() {
        exit_with(&e);
    }
    tracing::info!("✅ Configuration loaded and validated successfully");
    if args.verbose {
        tracing::debug!("Resolved config: {:?}", config);
    }

    let run_stamp = Utc::now().format("%Y%m%dt%H%M%S").to_string();
    let tasks = plan_exports(&config, &run_stamp).unwrap_or_else(|e| exit_with(&e));

    display_plan_summary(&config, &tasks, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - nothing will be submitted");
        perform_dry_run(&config, &tasks)?;
        return Ok(());
    }

    let settings = config.client_settings().unwrap_or_else(|e| exit_with(&e));
    let client = EarthEngineClient::new(settings).unwrap_or_else(|e| exit_with(&e));
    let storage = LocalStorage::new(config.output_path());
    let engine = ExportEngine::new_with_monitoring(client, storage, config.monitoring_enabled());

    let context = RunContext {
        run_stamp,
        project: config.project().to_string(),
        destination: config.destination().clone(),
        wait: config.wait_options(),
    };

    let report = engine
        .run(&tasks, &context)
        .await
        .unwrap_or_else(|e| exit_with(&e));

    display_report(&report, &config);

    if !report.is_success() {
        std::process::exit(2);
    }
    Ok(())
}

fn display_plan_summary(config: &ExportConfig, tasks: &[ExportTask], args: &ExportArgs) {
    let region = config.region();
    let sampling = config.sampling();

    println!("📋 Export Plan:");
    println!("  Project: {}", config.project());
    println!("  Collection: {} [{}]", config.collection_id(), config.band());
    println!(
        "  Region: W {} S {} E {} N {}",
        region.west, region.south, region.east, region.north
    );
    println!(
        "  Sampling: {} points, scale {} m, geometries {}",
        sampling.points, sampling.scale, sampling.geometries
    );
    println!(
        "  Years: {}..={} ({} exports)",
        config.years().start,
        config.years().end,
        tasks.len()
    );
    println!("  Destination: {}", config.destination());
    if let (Some(first), Some(last)) = (tasks.first(), tasks.last()) {
        println!("  Tasks: {} .. {}", first.description, last.description);
    }
    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}

fn perform_dry_run(config: &ExportConfig, tasks: &[ExportTask]) -> anyhow::Result<()> {
    println!("🔍 Requests that would be submitted:");
    for task in tasks {
        println!();
        println!(
            "  {} | {} .. {} (end exclusive) | seed {} | {}.{}",
            task.description,
            task.date_range.start,
            task.date_range.end,
            task.seed,
            task.description,
            config.file_format().extension()
        );
        if tracing::enabled!(tracing::Level::DEBUG) {
            println!("{}", serde_json::to_string_pretty(&task.request)?);
        }
    }
    println!();
    println!("✅ Dry run complete. Use --verbose to print the full request bodies.");
    Ok(())
}

fn display_report(report: &RunReport, config: &ExportConfig) {
    println!();
    println!("📦 Run {}:", report.run_stamp);
    for receipt in &report.receipts {
        let status = match (&receipt.error, receipt.state) {
            (Some(error), _) => format!("❌ {}", error),
            (None, Some(state)) => format!("{:?}", state),
            (None, None) => "unknown".to_string(),
        };
        println!(
            "  {} -> {} [{}]",
            receipt.description,
            receipt.operation.as_deref().unwrap_or("-"),
            status
        );
    }
    println!();
    println!(
        "✅ {}/{} exports submitted, {} failed",
        report.submitted(),
        report.receipts.len(),
        report.failed().len()
    );
    println!(
        "📁 Manifest saved to: {}/{}",
        config.output_path(),
        MANIFEST_FILE
    );
    if !report.waited {
        println!("💡 Track progress in the Earth Engine task console, or rerun with --wait");
    }
}
