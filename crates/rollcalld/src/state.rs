use rollcall_core::{Gallery, NearestMatcher, OnnxEncoder};
use rollcall_store::SqliteStore;
use std::sync::Mutex;

/// Shared daemon state.
///
/// The encoder sits behind a mutex: ONNX sessions take `&mut self`, and
/// one recognition cycle runs at a time anyway. The gallery is immutable
/// for the daemon's lifetime.
pub struct AppState {
    pub encoder: Mutex<OnnxEncoder>,
    pub gallery: Gallery,
    pub matcher: NearestMatcher,
    pub store: SqliteStore,
    pub threshold: f32,
}

impl AppState {
    pub fn new(
        encoder: OnnxEncoder,
        gallery: Gallery,
        store: SqliteStore,
        threshold: f32,
    ) -> Self {
        Self {
            encoder: Mutex::new(encoder),
            gallery,
            matcher: NearestMatcher,
            store,
            threshold,
        }
    }
}
