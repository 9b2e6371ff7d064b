//! Signature scheme supported by the platform signer

use std::fmt;

/// TLS signature scheme a platform signer can service
///
/// Exactly one scheme is supported: RSA-PSS with SHA-256 and a salt length
/// equal to the hash length. Advertising a broader set than the native
/// backends can actually service would be a defect, so this enum has a
/// single variant on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureScheme {
    /// `rsa_pss_rsae_sha256` per RFC 8446 section 4.2.3
    RsaPssSha256,
}

impl SignatureScheme {
    /// TLS `signature_algorithms` wire identifier for `rsa_pss_rsae_sha256`
    pub const RSA_PSS_SHA256_WIRE_ID: u16 = 0x0804;

    /// SHA-256 digest length in bytes
    pub const DIGEST_LEN: usize = 32;

    /// Wire identifier of this scheme as sent in the TLS handshake
    pub fn wire_id(self) -> u16 {
        match self {
            SignatureScheme::RsaPssSha256 => Self::RSA_PSS_SHA256_WIRE_ID,
        }
    }

    /// IANA registry name of this scheme
    pub fn name(self) -> &'static str {
        match self {
            SignatureScheme::RsaPssSha256 => "rsa_pss_rsae_sha256",
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
