use sha2::{Digest, Sha256};

/// Version tag of an injection template: the lowercase hex SHA-256 of its bytes.
///
/// Compared against tags stored outside this process, so the encoding must not change.
pub fn version_hash(template: &str) -> String {
    hex::encode(Sha256::digest(template.as_bytes()))
}
