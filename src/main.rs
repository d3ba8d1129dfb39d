use anyhow::Result;
use dataview::config::DisplayFormat;
use dataview::engine::{Engine, EngineConfig, EngineHandle};
use dataview::*;
use std::io::Write;
use std::sync::Arc;
use tokio::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

fn draw(handle: &EngineHandle, format: DisplayFormat) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    match format {
        DisplayFormat::Text => {
            write!(
                stdout,
                "{}{}\n\n{}",
                CLEAR_SCREEN,
                version::banner(),
                dashboard::render_text(handle)
            )?;
        }
        DisplayFormat::Json => {
            writeln!(stdout, "{}", dashboard::render_json(handle)?)?;
        }
    }
    stdout.flush()?;
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        version = version::VERSION,
        interval_ms = app_config.sampling.interval_ms,
        source_timeout_ms = app_config.sampling.source_timeout_ms,
        retention_samples = app_config.sampling.retention_samples,
        "starting"
    );

    let sampler = sampler::Sampler::new(
        sources::Sources::host(&app_config.sensors),
        app_config.sampling.source_timeout(),
    );
    let metrics_engine = Arc::new(Engine::new(sampler, EngineConfig::from_app(&app_config)));
    let handle = metrics_engine.handle();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let engine_handle = engine::spawn(metrics_engine, shutdown_rx)?;

    let mut redraw = tokio::time::interval(Duration::from_millis(app_config.display.refresh_ms));
    redraw.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = redraw.tick() => {
                if let Err(e) = draw(&handle, app_config.display.format) {
                    tracing::warn!(error = %e, operation = "draw", "redraw failed");
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal");
                let _ = shutdown_tx.send(());
                let _ = engine_handle.await;
                break;
            }
        }
    }

    Ok(())
}
