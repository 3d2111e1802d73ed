use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use miette::{IntoDiagnostic, Result, WrapErr};
use poster_compositor::background::BackgroundCache;
use poster_compositor::canvas::Canvas;
use poster_compositor::compositor::Compositor;
use poster_compositor::config::RenderConfig;
use poster_compositor::output::{download_filename, title_filename};

mod cli;

use cli::{Cli, Commands};

fn write_schemas(out_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(out_dir)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to create schema folder {}", out_dir.display()))?;
    let path = out_dir.join("render-config.schema.json");
    let file = std::fs::File::create(&path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to open {} for writing", path.display()))?;
    let schema = schemars::schema_for!(RenderConfig);
    serde_json::to_writer_pretty(file, &schema).into_diagnostic()?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}

fn output_path(out: Option<PathBuf>, config: &RenderConfig) -> PathBuf {
    match out {
        Some(dir) if dir.is_dir() => dir.join(title_filename(&config.content.title, config.output)),
        Some(file) => file,
        None => PathBuf::from(download_filename(config.output, chrono::Utc::now())),
    }
}

async fn render(
    config_path: &Path,
    out: Option<PathBuf>,
    background: Option<String>,
    fit_report: Option<PathBuf>,
) -> Result<()> {
    let mut config = RenderConfig::load(config_path)?;
    if background.is_some() {
        config.background = background;
    }

    let mut backgrounds = BackgroundCache::with_timeout(Duration::from_secs(config.fetch_timeout_secs))?;
    let background = backgrounds.load(config.background.as_deref()).await;

    let compositor = Compositor::new(config.layout.clone(), config.palette())?;
    let mut canvas = Canvas::new(config.canvas.width, config.canvas.height)?;
    let blocks = config.content.blocks(compositor.params());
    let fit = compositor.compose(&mut canvas, &blocks, background.as_deref())?;
    let bytes = canvas.encode(config.output)?;

    let path = output_path(out, &config);
    std::fs::write(&path, &bytes)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to write poster to {}", path.display()))?;
    tracing::info!(bytes = bytes.len(), scale = fit.scale, "wrote {}", path.display());

    if let Some(report_path) = fit_report {
        let file = std::fs::File::create(&report_path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to open {} for writing", report_path.display()))?;
        serde_json::to_writer_pretty(file, &fit).into_diagnostic()?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt().with_max_level(cli.log_level).init();

    match cli.command {
        Commands::Render { config, out, background, fit_report } => {
            render(&config, out, background, fit_report).await
        }
        Commands::Schema { out_dir } => write_schemas(&out_dir),
    }
}
