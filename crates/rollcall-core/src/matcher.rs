//! Nearest-neighbor identity decision over a gallery of embeddings.

use crate::types::{Embedding, GalleryEntry};

/// Label reported for a probe no gallery entry was accepted for.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Default minimum confidence for a positive identification.
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// Identity decision for one probe embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDecision {
    /// Accepted gallery name, or `None` for an unknown face.
    pub name: Option<String>,
    /// `1 - distance` of the best candidate; 0.0 for an empty gallery.
    ///
    /// This is an opaque monotonic score, not a calibrated probability.
    /// With unit-norm embeddings the distance lives in [0, 2], so the
    /// score can go negative for very dissimilar pairs.
    pub confidence: f32,
}

impl MatchDecision {
    /// The accepted name, or [`UNKNOWN_LABEL`].
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_LABEL)
    }

    pub fn is_known(&self) -> bool {
        self.name.is_some()
    }

    fn unknown(confidence: f32) -> Self {
        Self { name: None, confidence }
    }
}

/// Strategy for deciding a probe embedding's identity against a gallery.
pub trait Matcher {
    fn identify(
        &self,
        probe: &Embedding,
        gallery: &[GalleryEntry],
        threshold: f32,
    ) -> MatchDecision;
}

/// Euclidean nearest-neighbor matcher.
///
/// Scans the whole gallery for the minimum-distance entry (the first
/// entry wins ties) and accepts it only when `1 - distance` reaches the
/// threshold. Entries whose embedding length differs from the probe's
/// cannot be compared and are skipped with a warning.
pub struct NearestMatcher;

impl Matcher for NearestMatcher {
    fn identify(
        &self,
        probe: &Embedding,
        gallery: &[GalleryEntry],
        threshold: f32,
    ) -> MatchDecision {
        let mut best: Option<(usize, f32)> = None;

        for (i, entry) in gallery.iter().enumerate() {
            let Some(distance) = probe.euclidean_distance(&entry.embedding) else {
                tracing::warn!(
                    name = %entry.name,
                    probe_dim = probe.dim(),
                    entry_dim = entry.embedding.dim(),
                    "skipping gallery entry with mismatched embedding length"
                );
                continue;
            };
            // Strict improvement only, so the first minimal entry wins.
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((i, distance)),
            }
        }

        match best {
            Some((idx, distance)) => {
                let confidence = 1.0 - distance;
                if confidence >= threshold {
                    MatchDecision {
                        name: Some(gallery[idx].name.clone()),
                        confidence,
                    }
                } else {
                    MatchDecision::unknown(confidence)
                }
            }
            None => MatchDecision::unknown(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, values: Vec<f32>) -> GalleryEntry {
        GalleryEntry {
            name: name.to_string(),
            embedding: Embedding { values },
        }
    }

    #[test]
    fn test_empty_gallery_is_unknown() {
        let probe = Embedding { values: vec![1.0, 0.0] };
        let decision = NearestMatcher.identify(&probe, &[], 0.0);
        assert_eq!(decision.name, None);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.label(), "Unknown");
    }

    #[test]
    fn test_exact_match_full_confidence() {
        let probe = Embedding { values: vec![0.6, 0.8, 0.0] };
        let gallery = vec![
            entry("alice", vec![0.0, 0.0, 1.0]),
            entry("bob", vec![0.6, 0.8, 0.0]),
        ];
        let decision = NearestMatcher.identify(&probe, &gallery, 1.0);
        assert_eq!(decision.name.as_deref(), Some("bob"));
        assert!((decision.confidence - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_accepts_and_rejects() {
        // Distance 0.3 → confidence 0.7 (accept at 0.6);
        // distance 0.5 → confidence 0.5 (reject at 0.6).
        let probe = Embedding { values: vec![0.0, 0.0] };
        let near = vec![entry("alice", vec![0.3, 0.0])];
        let far = vec![entry("alice", vec![0.5, 0.0])];

        let accepted = NearestMatcher.identify(&probe, &near, 0.6);
        assert_eq!(accepted.name.as_deref(), Some("alice"));
        assert!((accepted.confidence - 0.7).abs() < 1e-6);

        let rejected = NearestMatcher.identify(&probe, &far, 0.6);
        assert_eq!(rejected.name, None);
        assert!((rejected.confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_entry_wins() {
        let probe = Embedding { values: vec![0.0, 0.0] };
        let gallery = vec![
            entry("far", vec![0.4, 0.0]),
            entry("near", vec![0.1, 0.0]),
        ];
        let decision = NearestMatcher.identify(&probe, &gallery, 0.5);
        assert_eq!(decision.name.as_deref(), Some("near"));
    }

    #[test]
    fn test_tie_break_first_entry_wins() {
        let probe = Embedding { values: vec![0.0, 0.0] };
        let gallery = vec![
            entry("first", vec![0.2, 0.0]),
            entry("second", vec![0.0, 0.2]),
        ];
        let decision = NearestMatcher.identify(&probe, &gallery, 0.0);
        assert_eq!(decision.name.as_deref(), Some("first"));
    }

    #[test]
    fn test_mismatched_dimensions_skipped() {
        let probe = Embedding { values: vec![0.0, 0.0, 0.0] };
        let gallery = vec![
            entry("bad-dim", vec![0.0, 0.0]),
            entry("alice", vec![0.1, 0.0, 0.0]),
        ];
        let decision = NearestMatcher.identify(&probe, &gallery, 0.5);
        assert_eq!(decision.name.as_deref(), Some("alice"));
    }

    #[test]
    fn test_all_entries_incomparable_is_unknown() {
        let probe = Embedding { values: vec![0.0, 0.0, 0.0] };
        let gallery = vec![entry("bad-dim", vec![0.0, 0.0])];
        let decision = NearestMatcher.identify(&probe, &gallery, 0.0);
        assert_eq!(decision.name, None);
        assert_eq!(decision.confidence, 0.0);
    }

    #[test]
    fn test_threshold_monotonicity() {
        // Raising the threshold can only flip accepted → unknown,
        // never the other way around.
        let probe = Embedding { values: vec![0.0, 0.0] };
        let gallery = vec![entry("alice", vec![0.35, 0.0])];

        let mut previously_known = true;
        for threshold in [0.0, 0.3, 0.6, 0.65, 0.9, 1.0] {
            let decision = NearestMatcher.identify(&probe, &gallery, threshold);
            assert!(
                previously_known || !decision.is_known(),
                "match reappeared at threshold {threshold}"
            );
            previously_known = decision.is_known();
        }
    }
}
