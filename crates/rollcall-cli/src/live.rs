//! Live attendance session: a capture loop on a dedicated thread.

use anyhow::{bail, Context, Result};
use rollcall_core::{FaceEncoder, Gallery, Matcher, NearestMatcher, OnnxEncoder, Session};
use rollcall_hw::Camera;
use rollcall_store::{write_csv, AttendanceRecord, AttendanceStore, SqliteStore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Frames discarded after opening so auto-exposure can settle.
const WARMUP_FRAMES: usize = 4;
/// Consecutive capture failures tolerated before the session aborts.
const MAX_CAPTURE_RETRIES: u32 = 5;

pub struct SessionOptions {
    pub device: Option<String>,
    pub faces: PathBuf,
    pub models: PathBuf,
    pub db: PathBuf,
    pub threshold: f32,
    pub interval_ms: u64,
    pub export: PathBuf,
}

/// Run one live session: open the camera, recognize frames until ctrl-c,
/// then export the attendance table as CSV.
pub async fn run_session(opts: SessionOptions) -> Result<()> {
    let store = SqliteStore::open(&opts.db)?;

    let mut encoder = OnnxEncoder::load_from_dir(&opts.models).context("loading ONNX models")?;
    let gallery = Gallery::build(&opts.faces, &mut encoder);
    if gallery.is_empty() {
        bail!("no known faces loaded from {}", opts.faces.display());
    }
    tracing::info!(known = gallery.len(), "gallery ready");

    let camera = match &opts.device {
        Some(path) => Camera::open(path)?,
        None => Camera::open_first()?,
    };
    camera.warm_up(WARMUP_FRAMES);

    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = stop.clone();
    let interval = Duration::from_millis(opts.interval_ms);
    let threshold = opts.threshold;

    let worker = std::thread::Builder::new()
        .name("rollcall-capture".into())
        .spawn(move || {
            capture_loop(
                camera,
                encoder,
                gallery,
                store,
                threshold,
                interval,
                &worker_stop,
            )
        })
        .expect("failed to spawn capture thread");

    tracing::info!("live session started; press ctrl-c to finish");
    tokio::signal::ctrl_c().await?;
    stop.store(true, Ordering::Relaxed);

    let session = worker
        .join()
        .map_err(|_| anyhow::anyhow!("capture thread panicked"))??;

    let store = SqliteStore::open(&opts.db)?;
    let records = store.query_all()?;
    write_csv(&opts.export, &records)?;

    tracing::info!(
        attendees = session.attendee_count(),
        export = %opts.export.display(),
        "session ended"
    );
    Ok(())
}

/// One frame at a time: capture, encode, match, record first sightings.
fn capture_loop(
    camera: Camera,
    mut encoder: OnnxEncoder,
    gallery: Gallery,
    store: SqliteStore,
    threshold: f32,
    interval: Duration,
    stop: &AtomicBool,
) -> Result<Session> {
    let matcher = NearestMatcher;
    let mut session = Session::new();
    let mut failures = 0u32;

    while !stop.load(Ordering::Relaxed) {
        let frame = match camera.capture_frame() {
            Ok(frame) => {
                failures = 0;
                frame
            }
            Err(err) => {
                failures += 1;
                tracing::warn!(error = %err, attempt = failures, "failed to read frame");
                if failures >= MAX_CAPTURE_RETRIES {
                    bail!("giving up after {failures} consecutive capture failures");
                }
                std::thread::sleep(Duration::from_secs(1));
                continue;
            }
        };

        let image = image::DynamicImage::ImageRgb8(frame.image);
        let faces = match encoder.encode(&image) {
            Ok(faces) => faces,
            Err(err) => {
                tracing::warn!(error = %err, seq = frame.sequence, "frame encoding failed");
                std::thread::sleep(interval);
                continue;
            }
        };

        if !faces.is_empty() {
            tracing::debug!(count = faces.len(), seq = frame.sequence, "faces detected");
        }

        for face in &faces {
            let decision = matcher.identify(&face.embedding, gallery.entries(), threshold);
            let Some(name) = &decision.name else {
                continue;
            };
            if session.mark(name) {
                match store.insert(&AttendanceRecord::now(name)) {
                    Ok(()) => {
                        tracing::info!(
                            name = %name,
                            confidence = decision.confidence,
                            attendees = session.attendee_count(),
                            "attendance marked"
                        );
                    }
                    Err(err) => {
                        tracing::error!(
                            name = %name,
                            error = %err,
                            "failed to record attendance"
                        );
                    }
                }
            }
        }

        std::thread::sleep(interval);
    }

    Ok(session)
}
