use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use annex_import::{run_import, ImportConfig};

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    println!("🗄️  Annex Import - CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = ImportConfig::default();
    let summary = run_import(&config).with_context(|| {
        format!("Import into {} failed", config.db_path.display())
    })?;

    for table in &summary.tables {
        println!("✓ {} ← {} ({} rows)", table.table, table.source.display(), table.rows);
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "✅ SQLite database '{}' created and populated successfully!",
        summary.db_path.display()
    );

    Ok(())
}
