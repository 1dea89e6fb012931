use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rollcall_core::{FaceEncoder, Gallery, Matcher, NearestMatcher, OnnxEncoder};
use rollcall_store::{AttendanceRecord, AttendanceStore, SqliteStore};
use std::path::{Path, PathBuf};

mod live;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-recognition attendance CLI")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = "attendance.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a live attendance session from the webcam
    Run {
        /// V4L2 device path; probes /dev/video* when omitted
        #[arg(short, long)]
        device: Option<String>,
        /// Directory of labeled reference images
        #[arg(short, long, default_value = "images")]
        faces: PathBuf,
        /// Directory containing the ONNX models
        #[arg(long, default_value = "models")]
        models: PathBuf,
        /// Minimum confidence for a positive identification
        #[arg(short, long, default_value_t = 0.6)]
        threshold: f32,
        /// Milliseconds between processed frames
        #[arg(long, default_value_t = 250)]
        interval_ms: u64,
        /// CSV file written when the session ends
        #[arg(long, default_value = "attendance_export.csv")]
        export: PathBuf,
    },
    /// Recognize faces in a single image and record accepted matches
    Recognize {
        /// Image file to recognize
        image: PathBuf,
        /// Directory of labeled reference images
        #[arg(short, long, default_value = "images")]
        faces: PathBuf,
        /// Directory containing the ONNX models
        #[arg(long, default_value = "models")]
        models: PathBuf,
        /// Minimum confidence for a positive identification
        #[arg(short, long, default_value_t = 0.6)]
        threshold: f32,
    },
    /// List the reference faces loaded from a directory
    Gallery {
        /// Directory of labeled reference images
        #[arg(short, long, default_value = "images")]
        faces: PathBuf,
        /// Directory containing the ONNX models
        #[arg(long, default_value = "models")]
        models: PathBuf,
    },
    /// List recorded attendance
    Records,
    /// Export attendance to a CSV file
    Export {
        /// Output path
        #[arg(default_value = "attendance_export.csv")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            device,
            faces,
            models,
            threshold,
            interval_ms,
            export,
        } => {
            live::run_session(live::SessionOptions {
                device,
                faces,
                models,
                db: cli.db,
                threshold,
                interval_ms,
                export,
            })
            .await
        }
        Commands::Recognize {
            image,
            faces,
            models,
            threshold,
        } => recognize_image(&cli.db, &image, &faces, &models, threshold),
        Commands::Gallery { faces, models } => list_gallery(&faces, &models),
        Commands::Records => list_records(&cli.db),
        Commands::Export { output } => export_records(&cli.db, &output),
    }
}

/// Recognize every face in one image. Each invocation is its own run, so
/// accepted matches are recorded without session deduplication.
fn recognize_image(
    db: &Path,
    image_path: &Path,
    faces_dir: &Path,
    model_dir: &Path,
    threshold: f32,
) -> Result<()> {
    let mut encoder = OnnxEncoder::load_from_dir(model_dir).context("loading ONNX models")?;
    let gallery = Gallery::build(faces_dir, &mut encoder);
    if gallery.is_empty() {
        tracing::warn!(dir = %faces_dir.display(), "no known faces loaded");
    }

    let image = image::open(image_path)
        .with_context(|| format!("opening {}", image_path.display()))?;
    let faces = encoder.encode(&image)?;
    if faces.is_empty() {
        println!("no faces detected");
        return Ok(());
    }

    let store = SqliteStore::open(db)?;
    let matcher = NearestMatcher;
    for face in &faces {
        let decision = matcher.identify(&face.embedding, gallery.entries(), threshold);
        match &decision.name {
            Some(name) => {
                if let Err(err) = store.insert(&AttendanceRecord::now(name)) {
                    tracing::error!(name = %name, error = %err, "failed to record attendance");
                }
                println!("{name} (confidence {:.2})", decision.confidence);
            }
            None => println!("{} (confidence {:.2})", decision.label(), decision.confidence),
        }
    }
    Ok(())
}

fn list_gallery(faces_dir: &Path, model_dir: &Path) -> Result<()> {
    let mut encoder = OnnxEncoder::load_from_dir(model_dir).context("loading ONNX models")?;
    let gallery = Gallery::build(faces_dir, &mut encoder);
    if gallery.is_empty() {
        println!("no reference faces in {}", faces_dir.display());
        return Ok(());
    }
    for name in gallery.names() {
        println!("{name}");
    }
    Ok(())
}

fn list_records(db: &Path) -> Result<()> {
    let store = SqliteStore::open(db)?;
    let records = store.query_all()?;
    if records.is_empty() {
        println!("no attendance recorded");
        return Ok(());
    }
    for record in &records {
        println!("{}  {}  {}", record.date, record.time, record.name);
    }
    Ok(())
}

fn export_records(db: &Path, output: &Path) -> Result<()> {
    let store = SqliteStore::open(db)?;
    let records = store.query_all()?;
    rollcall_store::write_csv(output, &records)?;
    println!("exported {} records to {}", records.len(), output.display());
    Ok(())
}
