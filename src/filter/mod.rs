//! Entropy-based candidate filtering.
//!
//! Plain text clusters well below 5.75 bits/byte; base64, compressed, and
//! encrypted blobs cluster above it. The skip markers veto high-entropy
//! content whose format is already known and benign (inline images, PGP
//! blocks), and take precedence over the score.

use aho_corasick::AhoCorasick;

use crate::config::FilterConfig;

/// Default skip markers: image MIME signatures and armored-block headers.
pub fn default_skip_markers() -> Vec<String> {
    [
        "image/png",
        "image/jpg",
        "image/jpeg",
        "image/gif",
        "-----BEGIN PGP PUBLIC KEY BLOCK-----",
        "----BEGIN PGP MESSAGE----",
        "-----BEGIN PGP MESSAGE-----",
        "-----BEGIN PGP SIGNATURE-----",
        "-----BEGIN INFOENCRYPT.COM MESSAGE-----",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[inline]
pub fn entropy_of_slice(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut hist = [0usize; 256];
    for &b in data {
        hist[b as usize] += 1;
    }
    let len = data.len() as f64;
    let mut h = 0.0;
    for c in hist.iter().copied() {
        if c == 0 {
            continue;
        }
        let p = (c as f64) / len;
        h -= p * p.log2();
    }
    h
}

/// Decides which pastes warrant decode analysis.
pub struct CandidateFilter {
    threshold: f64,
    markers: AhoCorasick,
}

impl CandidateFilter {
    pub fn new(cfg: &FilterConfig) -> Self {
        let markers = AhoCorasick::new(&cfg.skip_markers)
            .unwrap_or_else(|_| AhoCorasick::new(default_skip_markers()).unwrap());
        Self {
            threshold: cfg.entropy_threshold,
            markers,
        }
    }

    /// Shannon entropy of the body, in [0, 8]. Empty bodies score 0.
    pub fn score(&self, body: &[u8]) -> f64 {
        entropy_of_slice(body)
    }

    /// True when the score clears the threshold and no skip marker occurs
    /// in the body.
    pub fn is_candidate(&self, body: &[u8], score: f64) -> bool {
        score >= self.threshold && !self.markers.is_match(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> CandidateFilter {
        CandidateFilter::new(&FilterConfig::default())
    }

    fn pseudo_random(len: usize, mut seed: u64) -> Vec<u8> {
        (0..len)
            .map(|_| {
                seed = seed.wrapping_mul(1664525).wrapping_add(1013904223);
                (seed >> 24) as u8
            })
            .collect()
    }

    #[test]
    fn entropy_empty_is_zero() {
        assert_eq!(entropy_of_slice(b""), 0.0);
    }

    #[test]
    fn entropy_single_valued_is_zero() {
        let data = vec![b'A'; 4096];
        assert!(entropy_of_slice(&data) < 1e-9);
    }

    #[test]
    fn entropy_uniform_random_is_high() {
        let data = pseudo_random(1 << 15, 123456789);
        let h = entropy_of_slice(&data);
        assert!(h > 7.0, "entropy too low: {}", h);
        assert!(h <= 8.0 + 1e-6);
    }

    #[test]
    fn entropy_bounded_for_all_inputs() {
        for seed in [1u64, 42, 9999] {
            let h = entropy_of_slice(&pseudo_random(512, seed));
            assert!((0.0..=8.0).contains(&h));
        }
    }

    #[test]
    fn plain_text_is_not_a_candidate() {
        let f = filter();
        let body = b"the quick brown fox jumps over the lazy dog, repeatedly";
        let score = f.score(body);
        assert!(score < 5.75);
        assert!(!f.is_candidate(body, score));
    }

    #[test]
    fn high_entropy_body_is_a_candidate() {
        let f = filter();
        let body = pseudo_random(4096, 7);
        let score = f.score(&body);
        assert!(score >= 5.75);
        assert!(f.is_candidate(&body, score));
    }

    #[test]
    fn skip_marker_vetoes_high_entropy() {
        let f = filter();
        let mut body = pseudo_random(4096, 7);
        body.extend_from_slice(b"-----BEGIN PGP MESSAGE-----");
        let score = f.score(&body);
        assert!(score >= 5.75);
        assert!(!f.is_candidate(&body, score));
    }

    #[test]
    fn image_signature_vetoes() {
        let f = filter();
        let mut body = pseudo_random(4096, 11);
        body.extend_from_slice(b"data:image/png;base64,");
        assert!(!f.is_candidate(&body, f.score(&body)));
    }
}
