use anyhow::{Context, Result};
use chrono::Duration;
use roster_core::{DistanceMatcher, FramePipeline, Gallery, PresenceTracker, SystemClock};
use roster_store::{gallery_file, Store};
use tracing_subscriber::EnvFilter;

mod config;
mod feed;
mod runner;

use config::Config;
use feed::{DetectionFeed, FeedEngine};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::load().context("loading configuration")?;
    tracing::info!(
        db = %config.db_path.display(),
        gallery = %config.gallery_path.display(),
        feed = %config.feed_path.display(),
        "rosterd starting"
    );

    // One connection per port so the ledger and the directory never contend.
    let ledger = Store::open(&config.db_path).context("opening attendance store")?;
    let directory = Store::open(&config.db_path).context("opening identity store")?;

    let persisted = gallery_file::load(&config.gallery_path).context("loading gallery")?;
    let gallery = Gallery::load(persisted.descriptors, persisted.identities)
        .context("validating gallery")?;
    if gallery.is_empty() {
        tracing::warn!("gallery has no entries; every detection will go unmatched");
    }
    let gallery = gallery.augmented(&config.augmentation_angles);
    tracing::info!(
        entries = gallery.len(),
        identities = gallery.identity_count(),
        threshold = config.distance_threshold,
        timeout_secs = config.presence_timeout_secs,
        frame_scale = config.frame_scale_factor,
        mode = ?config.accuracy_mode,
        "gallery ready"
    );

    let source = DetectionFeed::open(&config.feed_path)
        .with_context(|| format!("opening detection feed {}", config.feed_path.display()))?;

    let pipeline = FramePipeline::new(
        source,
        FeedEngine,
        gallery,
        Box::new(DistanceMatcher::new(config.distance_threshold)),
        PresenceTracker::new(Duration::seconds(config.presence_timeout_secs as i64)),
        Box::new(ledger),
        Some(Box::new(directory)),
        Box::new(SystemClock),
        config.accuracy_mode,
    );

    let runner = runner::spawn(pipeline).context("spawning pipeline thread")?;
    let stop = runner.stop_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested; open sessions stay open");
            stop.request_stop();
        }
    });

    let report = tokio::task::spawn_blocking(move || runner.join())
        .await
        .context("pipeline task failed")??;

    tracing::info!(
        frames = report.frames,
        skipped = report.frames_skipped,
        acquisition_failures = report.acquisition_failures,
        sightings = report.sightings,
        unmatched = report.unmatched,
        arrivals = report.arrivals,
        departures = report.departures,
        "rosterd stopped"
    );

    Ok(())
}
