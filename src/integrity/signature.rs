//! OpenPGP signature verification
//!
//! Keys and detached signatures are accepted ASCII-armored or binary. A
//! cleartext-signed checksum listing can be verified without a separate
//! signature by passing an empty `signature`.

use std::io::Cursor;

use pgp::cleartext::CleartextSignedMessage;
use pgp::{Deserializable, SignedPublicKey, StandaloneSignature};
use tracing::debug;

use crate::integrity::error::SignatureError;

const ARMOR_PREFIX: &[u8] = b"-----BEGIN PGP";
const CLEARTEXT_PREFIX: &[u8] = b"-----BEGIN PGP SIGNED MESSAGE-----";

/// Verify `signature` over `data` with `public_key`.
///
/// Returns `Ok(false)` when the material is well-formed but the signature was
/// not made by the key (primary or any subkey) over these bytes.
pub fn verify_signature(
    data: &[u8],
    signature: &[u8],
    public_key: &[u8],
) -> Result<bool, SignatureError> {
    let key = parse_public_key(public_key)?;

    if signature.iter().all(u8::is_ascii_whitespace) {
        return verify_cleartext(data, &key);
    }

    let signature = parse_signature(signature)?;
    let verified = signature.verify(&key, data).is_ok()
        || key
            .public_subkeys
            .iter()
            .any(|subkey| signature.verify(subkey, data).is_ok());

    debug!("Detached signature is {}valid", if verified { "" } else { "not " });
    Ok(verified)
}

/// Whether `data` is a cleartext-signed message
pub fn is_cleartext_signed(data: &[u8]) -> bool {
    trim_leading_whitespace(data).starts_with(CLEARTEXT_PREFIX)
}

fn verify_cleartext(data: &[u8], key: &SignedPublicKey) -> Result<bool, SignatureError> {
    if !is_cleartext_signed(data) {
        return Err(SignatureError::InvalidSignature(
            "no detached signature and content is not cleartext-signed".to_string(),
        ));
    }

    let text = std::str::from_utf8(data)
        .map_err(|e| SignatureError::InvalidSignature(e.to_string()))?;
    let (message, _headers) = CleartextSignedMessage::from_string(text)
        .map_err(|e| SignatureError::InvalidSignature(e.to_string()))?;

    let verified = message.verify(key).is_ok()
        || key
            .public_subkeys
            .iter()
            .any(|subkey| message.verify(subkey).is_ok());

    debug!("Cleartext signature is {}valid", if verified { "" } else { "not " });
    Ok(verified)
}

fn parse_public_key(bytes: &[u8]) -> Result<SignedPublicKey, SignatureError> {
    let bytes = trim_leading_whitespace(bytes);
    if bytes.starts_with(ARMOR_PREFIX) {
        SignedPublicKey::from_armor_single(Cursor::new(bytes))
            .map(|(key, _headers)| key)
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))
    } else {
        SignedPublicKey::from_bytes(Cursor::new(bytes))
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))
    }
}

fn parse_signature(bytes: &[u8]) -> Result<StandaloneSignature, SignatureError> {
    let bytes = trim_leading_whitespace(bytes);
    if bytes.starts_with(ARMOR_PREFIX) {
        StandaloneSignature::from_armor_single(Cursor::new(bytes))
            .map(|(signature, _headers)| signature)
            .map_err(|e| SignatureError::InvalidSignature(e.to_string()))
    } else {
        StandaloneSignature::from_bytes(Cursor::new(bytes))
            .map_err(|e| SignatureError::InvalidSignature(e.to_string()))
    }
}

fn trim_leading_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    &bytes[start..]
}
