//! View hints for cheap announcement filtering.
//!
//! Each announcement carries the first byte of the shared secret. A scanner
//! recomputes the secret, compares one byte, and skips the tweak, point
//! addition, and address hashing for ~255/256 foreign announcements.
//!
//! The hint is a filter, never proof: a matching hint still goes through the
//! full address comparison.

use subtle::ConstantTimeEq;

use privatepay_core::constants::VIEW_HINT_SPACE;
use privatepay_core::types::SharedSecret;

/// Computes the view hint for a shared secret.
pub fn compute_view_hint(shared_secret: &SharedSecret) -> u8 {
    shared_secret.view_hint()
}

/// Checks a hint in constant time.
pub fn verify_view_hint(shared_secret: &SharedSecret, expected: u8) -> bool {
    compute_view_hint(shared_secret).ct_eq(&expected).into()
}

/// Distribution of observed view hints.
///
/// Used to check that hints are uniform, i.e. that they leak nothing about
/// which recipient an announcement belongs to.
#[derive(Debug, Clone)]
pub struct ViewHintStats {
    /// Count of each hint value
    pub distribution: Vec<u64>,
    /// Total number of hints analyzed
    pub total: u64,
}

impl Default for ViewHintStats {
    fn default() -> Self {
        Self {
            distribution: vec![0; VIEW_HINT_SPACE],
            total: 0,
        }
    }
}

impl ViewHintStats {
    /// Creates a new stats tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a hint.
    pub fn add(&mut self, hint: u8) {
        self.distribution[hint as usize] += 1;
        self.total += 1;
    }

    /// Returns the most common hint.
    pub fn most_common(&self) -> Option<(u8, u64)> {
        self.distribution
            .iter()
            .enumerate()
            .max_by_key(|(_, &count)| count)
            .map(|(hint, &count)| (hint as u8, count))
    }

    /// Expected count per hint under a uniform distribution.
    pub fn expected_uniform_count(&self) -> f64 {
        self.total as f64 / VIEW_HINT_SPACE as f64
    }

    /// Chi-squared statistic against the uniform distribution.
    pub fn chi_squared(&self) -> f64 {
        let expected = self.expected_uniform_count();
        if expected == 0.0 {
            return 0.0;
        }

        self.distribution
            .iter()
            .map(|&observed| {
                let diff = observed as f64 - expected;
                (diff * diff) / expected
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecdh::compute_shared_secret;
    use crate::keys::{generate_keypair, parse_public_key, parse_secret_key};

    #[test]
    fn test_view_hint_is_first_byte() {
        let mut bytes = [7u8; 32];
        bytes[0] = 0x9C;
        let secret = SharedSecret::new(bytes);
        assert_eq!(compute_view_hint(&secret), 0x9C);
    }

    #[test]
    fn test_verify_view_hint() {
        let secret = SharedSecret::new([99u8; 32]);
        assert!(verify_view_hint(&secret, 99));
        assert!(!verify_view_hint(&secret, 100));
    }

    #[test]
    fn test_view_hint_distribution_is_uniform() {
        let view = generate_keypair().unwrap();
        let view_pk = parse_public_key(view.public.as_bytes()).unwrap();
        let mut stats = ViewHintStats::new();

        for _ in 0..2_000 {
            let eph = generate_keypair().unwrap();
            let eph_sk = parse_secret_key(&eph.secret).unwrap();
            stats.add(compute_view_hint(&compute_shared_secret(&eph_sk, &view_pk, 0)));
        }

        // 255 degrees of freedom: p=0.001 critical value is ~330
        let chi_sq = stats.chi_squared();
        assert!(chi_sq < 450.0, "view hints are not uniform: chi^2 = {}", chi_sq);
    }

    #[test]
    fn test_view_hint_stats() {
        let mut stats = ViewHintStats::new();
        stats.add(0);
        stats.add(0);
        stats.add(1);
        stats.add(255);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.distribution[0], 2);
        assert_eq!(stats.distribution[255], 1);
        assert_eq!(stats.most_common(), Some((0, 2)));
        assert_eq!(ViewHintStats::new().chi_squared(), 0.0);
    }
}
