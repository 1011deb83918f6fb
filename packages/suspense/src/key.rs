use isoresource_core::{value_to_json, Value};
use sha2::{Digest, Sha256};

/// Cache key of one resource call: `resource#action#<sha256 of the input>`.
///
/// The input is hashed as JSON with object keys in sorted order, so equal
/// inputs built in a different order share a key.
pub fn cache_key(resource: &str, action: &str, input: &Value) -> String {
    let canonical = value_to_json(input.clone()).to_string();
    let digest = Sha256::digest(canonical.as_bytes());
    let hash: String = digest.iter().map(|byte| format!("{:02x}", byte)).collect();
    format!("{}#{}#{}", resource, action, hash)
}
