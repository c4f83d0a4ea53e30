use podbase_core::config::{expand_path, PipelineConfig};
use podbase_core::error_log::ErrorLog;
use podbase_stage::{run_titles_pass, SqliteTitleStore};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = PipelineConfig::load().map_err(|e| { eprintln!("Error loading config: {}", e); e })?;

    println!("podbase titles\n==============");
    println!("Relational db: {}", config.relational.db_file);
    println!("Stage3: {}", config.data.stage3_dir);
    println!("Stage4: {}", config.data.stage4_dir);

    let store = SqliteTitleStore::open(&expand_path(&config.relational.db_file))?;
    let mut errors = ErrorLog::new();
    let report = run_titles_pass(
        &store,
        &expand_path(&config.data.stage3_dir),
        &expand_path(&config.data.stage4_dir),
        &mut errors,
    )?;

    println!("\n📊 Relational rows updated: {}", report.db_updated);
    println!("📊 Files renamed: {} stage3, {} stage4", report.stage3_renamed, report.stage4_renamed);
    println!("📊 Artifacts rewritten: {}", report.rewritten_files);
    if report.failures > 0 {
        let reports_dir = expand_path(&config.data.reports_dir);
        errors.write_reports(&reports_dir)?;
        println!("⚠️  {} failures, details in {}", report.failures, reports_dir.display());
    }
    if report.changed_anything() {
        println!("✅ Titles aligned; rerun to verify convergence");
    } else {
        println!("✅ Everything already canonical");
    }
    Ok(())
}
