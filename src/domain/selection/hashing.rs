//! Consistent hashing for identity-stable trial assignment
//!
//! Hashes are SHA-256 based so assignments survive process restarts and
//! toolchain upgrades.

use sha2::{Digest, Sha256};

/// Consistent hasher for sticky assignments
#[derive(Debug, Clone, Copy)]
pub struct StickyHasher;

impl StickyHasher {
    /// Deterministic 32-bit hash of `identity` salted with `salt`
    pub fn hash(identity: &str, salt: &str) -> u32 {
        let mut hasher = Sha256::new();
        hasher.update(identity.as_bytes());
        hasher.update(b":");
        hasher.update(salt.as_bytes());
        let digest = hasher.finalize();

        u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
    }

    /// Deterministic bucket (0-99) for an identity and salt
    pub fn bucket(identity: &str, salt: &str) -> u8 {
        (Self::hash(identity, salt) % 100) as u8
    }

    /// Pick one of `keys` for `identity`.
    ///
    /// Keys are sorted before indexing, so the result depends only on the
    /// identity, the selector and the set of keys.
    pub fn pick<'a>(identity: &str, selector_name: &str, keys: &'a [String]) -> Option<&'a str> {
        if keys.is_empty() {
            return None;
        }

        let mut sorted: Vec<&str> = keys.iter().map(String::as_str).collect();
        sorted.sort_unstable();
        sorted.dedup();

        let index = Self::hash(identity, selector_name) as usize % sorted.len();
        Some(sorted[index])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_bucket_same_input() {
        let first = StickyHasher::bucket("user-1", "PaymentService");
        let second = StickyHasher::bucket("user-1", "PaymentService");
        assert_eq!(first, second, "Same inputs should produce same bucket");
        assert!(first <= 99);
    }

    #[test]
    fn test_hash_is_stable_across_releases() {
        // SHA-256("user-1:PaymentService"), first four bytes big endian
        let expected = {
            let digest = Sha256::digest(b"user-1:PaymentService");
            u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
        };
        assert_eq!(StickyHasher::hash("user-1", "PaymentService"), expected);
    }

    #[test]
    fn test_bucket_distribution() {
        let mut buckets = [0u32; 10];

        for i in 0..1000 {
            let bucket = StickyHasher::bucket(&format!("user-{}", i), "exp-1");
            buckets[(bucket / 10) as usize] += 1;
        }

        for count in buckets {
            assert!(count > 50, "Bucket has too few items: {}", count);
            assert!(count < 150, "Bucket has too many items: {}", count);
        }
    }

    #[test]
    fn test_pick_ignores_key_order() {
        let forward = keys(&["control", "blue", "green"]);
        let backward = keys(&["green", "blue", "control"]);

        for i in 0..200 {
            let identity = format!("user-{}", i);
            assert_eq!(
                StickyHasher::pick(&identity, "Checkout", &forward),
                StickyHasher::pick(&identity, "Checkout", &backward)
            );
        }
    }

    #[test]
    fn test_pick_is_deterministic() {
        let candidates = keys(&["a", "b", "c"]);
        let first = StickyHasher::pick("user-42", "Checkout", &candidates);

        for _ in 0..100 {
            assert_eq!(StickyHasher::pick("user-42", "Checkout", &candidates), first);
        }
    }

    #[test]
    fn test_pick_spreads_identities() {
        let candidates = keys(&["a", "b"]);
        let mut a_count = 0;

        for i in 0..1000 {
            if StickyHasher::pick(&format!("user-{}", i), "Checkout", &candidates) == Some("a") {
                a_count += 1;
            }
        }

        assert!(a_count > 400 && a_count < 600, "Split is too uneven: {}", a_count);
    }

    #[test]
    fn test_pick_empty() {
        assert_eq!(StickyHasher::pick("user-1", "Checkout", &[]), None);
    }
}
