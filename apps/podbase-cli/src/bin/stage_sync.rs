use std::env;

use podbase_core::config::{expand_path, PipelineConfig};
use podbase_core::error_log::ErrorLog;
use podbase_stage::StageSynchronizer;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = PipelineConfig::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;

    let mut repair = false;
    for arg in env::args().skip(1) { match arg.as_str() {
        "--repair" | "-r" => repair = true,
        _ => { eprintln!("Usage: podbase-stage-sync [--repair]"); std::process::exit(1); } } }

    println!("podbase stage sync\n==================");
    let sync = StageSynchronizer::new(
        expand_path(&config.data.stage3_dir),
        expand_path(&config.data.stage4_dir),
    );
    let diff = sync.diff()?;
    print!("{}", sync.report(&diff));

    let reports_dir = expand_path(&config.data.reports_dir);
    sync.write_reports(&diff, &reports_dir)?;
    println!("\n📄 Report written to {}", reports_dir.display());

    if diff.is_clean() {
        println!("✅ Stages are in sync");
        return Ok(());
    }
    if !repair {
        println!("💡 Run with --repair to copy stage3 artifacts forward");
        return Ok(());
    }

    let mut errors = ErrorLog::new();
    let repaired = sync.repair(&diff.repair_targets(), &mut errors)?;
    println!("🔧 Repaired {} stage4 artifacts ({} failures)", repaired, errors.len());
    if !errors.is_empty() {
        errors.write_reports(&reports_dir)?;
    }
    if sync.diff()?.is_clean() {
        println!("✅ Stages are in sync");
    } else {
        println!("⚠️  Drift remains, see {}", reports_dir.join("sync_report.txt").display());
    }
    Ok(())
}
