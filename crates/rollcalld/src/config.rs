use std::path::PathBuf;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Address the HTTP API listens on.
    pub listen_addr: String,
    /// Directory of labeled reference images.
    pub faces_dir: PathBuf,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Minimum confidence for a positive identification.
    pub threshold: f32,
}

impl Config {
    /// Load configuration from `ROLLCALL_*` environment variables with
    /// defaults.
    pub fn from_env() -> Self {
        let model_dir = std::env::var("ROLLCALL_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| rollcall_core::default_model_dir());

        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("rollcall");

        let db_path = std::env::var("ROLLCALL_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("attendance.db"));

        Self {
            listen_addr: std::env::var("ROLLCALL_LISTEN_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            faces_dir: std::env::var("ROLLCALL_FACES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("images")),
            model_dir,
            db_path,
            threshold: env_f32("ROLLCALL_THRESHOLD", rollcall_core::DEFAULT_THRESHOLD),
        }
    }

    /// Path to the face detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join(rollcall_core::DETECTOR_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the face embedding model.
    pub fn embedder_model_path(&self) -> String {
        self.model_dir
            .join(rollcall_core::EMBEDDER_MODEL_FILE)
            .to_string_lossy()
            .into_owned()
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_f32_default_for_unset_key() {
        assert_eq!(env_f32("ROLLCALL_TEST_UNSET_THRESHOLD", 0.6), 0.6);
    }

    #[test]
    fn test_model_paths_join_file_names() {
        let config = Config {
            listen_addr: "127.0.0.1:8000".to_string(),
            faces_dir: PathBuf::from("images"),
            model_dir: PathBuf::from("/opt/rollcall/models"),
            db_path: PathBuf::from("/tmp/attendance.db"),
            threshold: 0.6,
        };
        assert!(config.detector_model_path().ends_with("version-RFB-320.onnx"));
        assert!(config.embedder_model_path().ends_with("mobilefacenet.onnx"));
    }
}
