//! Signature scheme negotiation
//!
//! Pure check against the peer's advertised scheme list. This runs before
//! any store query so an incompatible peer never costs a native resource
//! acquisition.

use crate::error::NegotiationError;
use crate::model::SignatureScheme;

/// Pick the scheme to sign with from the peer's advertised list.
///
/// The signer supports exactly one scheme, so this reduces to a membership
/// check over the wire identifiers the peer sent.
///
/// # Errors
///
/// Returns [`NegotiationError::UnsupportedScheme`] when the peer does not
/// accept `rsa_pss_rsae_sha256`.
pub fn negotiate(offered: &[u16]) -> Result<SignatureScheme, NegotiationError> {
    let supported = SignatureScheme::RsaPssSha256;
    if offered.contains(&supported.wire_id()) {
        Ok(supported)
    } else {
        Err(NegotiationError::UnsupportedScheme {
            supported: supported.name(),
            offered: offered.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ECDSA_SECP256R1_SHA256: u16 = 0x0403;
    const RSA_PKCS1_SHA256: u16 = 0x0401;

    #[test]
    fn test_negotiate_success() {
        let offered = [ECDSA_SECP256R1_SHA256, 0x0804, RSA_PKCS1_SHA256];
        assert_eq!(
            negotiate(&offered).unwrap(),
            SignatureScheme::RsaPssSha256
        );
    }

    #[test]
    fn test_negotiate_rejects_ecdsa_only_peer() {
        let err = negotiate(&[ECDSA_SECP256R1_SHA256]).unwrap_err();
        let NegotiationError::UnsupportedScheme { supported, offered } = err;
        assert_eq!(supported, "rsa_pss_rsae_sha256");
        assert_eq!(offered, vec![ECDSA_SECP256R1_SHA256]);
    }

    #[test]
    fn test_negotiate_rejects_empty_list() {
        assert!(negotiate(&[]).is_err());
    }
}
