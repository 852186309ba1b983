// huntwarden/src/clue/proof.rs
//
// Clue integrity proofs.
//
//   hash                = sha256(text ‖ lat ‖ lon ‖ timestamp)         hex
//   hmac                = HMAC-SHA256(CLUE_SECRET_KEY, hash)             hex
//   location_commitment = sha256("{lat}_{lon}_{name}")                  hex
//
// Verification recomputes the HMAC and compares in constant time through
// `Mac::verify_slice`; `verify_clue` also rebinds the hash to the clue text
// and location.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::clue::types::{ClueLocation, CryptoProof};

type HmacSha256 = Hmac<Sha256>;

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

fn mac(key: &str) -> HmacSha256 {
    // HMAC accepts keys of any length; new_from_slice only fails for
    // fixed-size MACs.
    HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length")
}

pub fn location_commitment(loc: &ClueLocation) -> String {
    sha256_hex(&format!("{}_{}_{}", loc.lat, loc.lon, loc.name.as_deref().unwrap_or("")))
}

fn clue_hash(text: &str, loc: &ClueLocation, timestamp: &str) -> String {
    sha256_hex(&format!("{}{}{}{}", text, loc.lat, loc.lon, timestamp))
}

pub fn sign(text: &str, loc: &ClueLocation, timestamp: &str, key: &str) -> CryptoProof {
    let hash = clue_hash(text, loc, timestamp);
    let mut m = mac(key);
    m.update(hash.as_bytes());
    CryptoProof {
        hmac:                hex::encode(m.finalize().into_bytes()),
        hash,
        timestamp:           timestamp.to_string(),
        location_commitment: location_commitment(loc),
    }
}

/// True iff `proof.hmac` is a valid signature of `proof.hash` under `key`.
pub fn verify(proof: &CryptoProof, key: &str) -> bool {
    let Ok(sig) = hex::decode(&proof.hmac) else { return false };
    let mut m = mac(key);
    m.update(proof.hash.as_bytes());
    m.verify_slice(&sig).is_ok()
}

/// Full check of a delivered clue: the hash and location commitment are
/// recomputed from `text` and `loc`, then the signature is verified.
pub fn verify_clue(text: &str, loc: &ClueLocation, proof: &CryptoProof, key: &str) -> bool {
    clue_hash(text, loc, &proof.timestamp) == proof.hash
        && location_commitment(loc) == proof.location_commitment
        && verify(proof, key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> ClueLocation {
        ClueLocation { lat: 51.5, lon: -0.12, name: Some("Plaza".into()), ..Default::default() }
    }

    #[test]
    fn sign_then_verify() {
        let p = sign("Find the fountain", &loc(), "2026-01-01T00:00:00", "k");
        assert_eq!(p.hash.len(), 64);
        assert!(verify(&p, "k"));
        assert!(!verify(&p, "other-key"));
    }

    #[test]
    fn edited_clue_text_fails_full_check() {
        let p = sign("Find the fountain", &loc(), "t", "k");
        assert!(verify_clue("Find the fountain", &loc(), &p, "k"));
        assert!(verify(&p, "k"));
        assert!(!verify_clue("Find the statue", &loc(), &p, "k"));

        let mut moved = loc();
        moved.lat += 0.01;
        assert!(!verify_clue("Find the fountain", &moved, &p, "k"));
    }

    #[test]
    fn tampered_hash_fails() {
        let mut p = sign("Find the fountain", &loc(), "t", "k");
        p.hash = sha256_hex("something else");
        assert!(!verify(&p, "k"));
    }

    #[test]
    fn commitment_binds_name() {
        let mut other = loc();
        other.name = Some("Market".into());
        assert_ne!(location_commitment(&loc()), location_commitment(&other));
        assert_eq!(location_commitment(&loc()), sha256_hex("51.5_-0.12_Plaza"));
    }
}
