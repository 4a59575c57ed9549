//! Canonical hashing and signing for sync artifacts.
//!
//! Canonical form: JSON with sorted keys and no whitespace, `checksum` and
//! `signature` fields removed before hashing. HMAC-SHA-256 is the default
//! signing algorithm; Ed25519 is opt-in per [`SigningAlgo`].

use super::models::ArtifactBundle;
use crate::config::SigningAlgo;
use crate::error::{SyncError, SyncResult};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if !s.len().is_multiple_of(2) {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

/// Serializes `artifact` with `checksum`/`signature` stripped, in the exact
/// canonical form that gets hashed and signed.
pub fn canonical_payload(artifact: &ArtifactBundle) -> SyncResult<String> {
    let mut value =
        serde_json::to_value(artifact).map_err(|e| SyncError::Transport(e.to_string()))?;
    if let Some(obj) = value.as_object_mut() {
        obj.remove("checksum");
        obj.remove("signature");
    }
    serde_json::to_string(&value).map_err(|e| SyncError::Transport(e.to_string()))
}

pub fn artifact_checksum(artifact: &ArtifactBundle) -> SyncResult<String> {
    let canonical = canonical_payload(artifact)?;
    Ok(format!("{:x}", sha2::Sha256::digest(canonical.as_bytes())))
}

pub fn validate_checksum(artifact: &ArtifactBundle) -> SyncResult<bool> {
    let Some(expected) = &artifact.checksum else {
        return Ok(false);
    };
    Ok(*expected == artifact_checksum(artifact)?)
}

/// Signs the artifact's canonical payload with `key` under `algo`. `key` is
/// a raw UTF-8 secret for HMAC, or a hex-encoded 32-byte seed for Ed25519.
pub fn sign_artifact(artifact: &ArtifactBundle, key: &str, algo: SigningAlgo) -> SyncResult<String> {
    let payload = canonical_payload(artifact)?;
    match algo {
        SigningAlgo::Hmac => {
            let mut mac = HmacSha256::new_from_slice(key.as_bytes())
                .map_err(|e| SyncError::Transport(e.to_string()))?;
            mac.update(payload.as_bytes());
            Ok(hex_encode(&mac.finalize().into_bytes()))
        }
        SigningAlgo::Ed25519 => {
            let seed_bytes = hex_decode(key).ok_or_else(|| {
                SyncError::Transport("ed25519 signing key must be 32 hex-encoded bytes".into())
            })?;
            let seed: [u8; 32] = seed_bytes
                .try_into()
                .map_err(|_| SyncError::Transport("ed25519 signing key must be 32 bytes".into()))?;
            let signing_key = SigningKey::from_bytes(&seed);
            let signature: Signature = signing_key.sign(payload.as_bytes());
            Ok(hex_encode(&signature.to_bytes()))
        }
    }
}

/// Verifies `artifact.signature` against `trusted_keys` (keyed by
/// `signing_key_id`), using the algorithm named in `artifact.signature_algo`.
/// Returns `Ok(false)` (not an error) for any missing field or lookup miss —
/// callers turn that into `SyncError::SignatureInvalid` at the call site.
pub fn verify_signature(
    artifact: &ArtifactBundle,
    trusted_keys: &HashMap<String, String>,
) -> SyncResult<bool> {
    let (Some(signature), Some(key_id), Some(algo_name)) = (
        &artifact.signature,
        &artifact.signing_key_id,
        &artifact.signature_algo,
    ) else {
        return Ok(false);
    };
    let Some(key) = trusted_keys.get(key_id) else {
        return Ok(false);
    };
    let algo = match algo_name.as_str() {
        "ed25519" => SigningAlgo::Ed25519,
        _ => SigningAlgo::Hmac,
    };
    let payload = canonical_payload(artifact)?;
    match algo {
        SigningAlgo::Hmac => {
            let mut mac = HmacSha256::new_from_slice(key.as_bytes())
                .map_err(|e| SyncError::Transport(e.to_string()))?;
            mac.update(payload.as_bytes());
            let expected = hex_encode(&mac.finalize().into_bytes());
            Ok(constant_time_eq(expected.as_bytes(), signature.as_bytes()))
        }
        SigningAlgo::Ed25519 => {
            let Some(pub_bytes) = hex_decode(key) else {
                return Ok(false);
            };
            let Ok(pub_array) = <[u8; 32]>::try_from(pub_bytes.as_slice()) else {
                return Ok(false);
            };
            let Ok(verifying_key) = VerifyingKey::from_bytes(&pub_array) else {
                return Ok(false);
            };
            let Some(sig_bytes) = hex_decode(signature) else {
                return Ok(false);
            };
            let Ok(sig_array) = <[u8; 64]>::try_from(sig_bytes.as_slice()) else {
                return Ok(false);
            };
            let signature = Signature::from_bytes(&sig_array);
            Ok(verifying_key.verify(payload.as_bytes(), &signature).is_ok())
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_artifact() -> ArtifactBundle {
        ArtifactBundle {
            artifact_id: "artifact-1".into(),
            repo_id: "repo".into(),
            snapshot_id: "snap".into(),
            parent_snapshot: None,
            tool_version: "0.1.0".into(),
            schema_version: 1,
            created_at_utc: "2026-01-01T00:00:00Z".into(),
            promoted_symbols: Vec::new(),
            promoted_edges: Vec::new(),
            impact_priors: Vec::new(),
            flow_hints: Vec::new(),
            signature_algo: None,
            signing_key_id: None,
            checksum: None,
            signature: None,
        }
    }

    #[test]
    fn checksum_round_trips() {
        let mut artifact = sample_artifact();
        let checksum = artifact_checksum(&artifact).unwrap();
        artifact.checksum = Some(checksum);
        assert!(validate_checksum(&artifact).unwrap());
    }

    #[test]
    fn hmac_signature_verifies_with_trusted_key() {
        let mut artifact = sample_artifact();
        artifact.signature_algo = Some("hmac".into());
        artifact.signing_key_id = Some("local".into());
        artifact.signature = Some(sign_artifact(&artifact, "secret", SigningAlgo::Hmac).unwrap());

        let mut trusted = HashMap::new();
        trusted.insert("local".to_string(), "secret".to_string());
        assert!(verify_signature(&artifact, &trusted).unwrap());

        trusted.insert("local".to_string(), "wrong".to_string());
        assert!(!verify_signature(&artifact, &trusted).unwrap());
    }
}
