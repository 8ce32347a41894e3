use sha2::{Digest, Sha256};

/// SHA-256 of `body`, lowercase hex
pub fn body_hash(body: &str) -> String {
    format!("{:x}", Sha256::digest(body.as_bytes()))
}
