//! Session identifiers
//!
//! Requests without a session id get one derived from the clock and the
//! question text, so retries of the same question within a second land
//! in the same session.

use chrono::Utc;
use sha2::{Digest, Sha256};

pub fn generate(question: &str) -> String {
    let digest = Sha256::digest(question.as_bytes());
    let hash = hex::encode(digest);
    format!("session_{}_{}", Utc::now().timestamp(), &hash[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        let id = generate("what is PPA");
        let mut parts = id.splitn(3, '_');
        assert_eq!(parts.next(), Some("session"));
        let ts = parts.next().unwrap();
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
        let hash = parts.next().unwrap();
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_part_is_stable_per_question() {
        let a = generate("what is PPA");
        let b = generate("what is PPA");
        assert_eq!(a.rsplit('_').next(), b.rsplit('_').next());
        let c = generate("different question");
        assert_ne!(a.rsplit('_').next(), c.rsplit('_').next());
    }
}
