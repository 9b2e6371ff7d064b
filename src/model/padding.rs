//! PSS padding descriptor passed to the native signing primitive
//!
//! The descriptor is ephemeral: backends construct their native equivalent
//! (a `BCRYPT_PSS_PADDING_INFO` struct, a `SecKeyAlgorithm` constant) fresh
//! for every signing call and never reuse it across calls.

use crate::error::SigningError;
use crate::model::SignatureScheme;

/// Hash algorithm used inside the PSS padding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// SHA-256, the only hash the platform backends are wired for
    Sha256,
}

impl HashAlgorithm {
    /// Digest length in bytes
    pub fn digest_len(self) -> usize {
        match self {
            HashAlgorithm::Sha256 => SignatureScheme::DIGEST_LEN,
        }
    }
}

/// PSS padding parameters for a single signing call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PssPadding {
    /// Hash algorithm the digest was produced with
    pub hash: HashAlgorithm,

    /// Salt length in bytes
    pub salt_len: usize,
}

impl PssPadding {
    /// SHA-256 padding with the salt-length-equals-hash-length convention.
    ///
    /// This is the only combination the backends support.
    pub fn sha256_salt_equals_hash() -> Self {
        Self {
            hash: HashAlgorithm::Sha256,
            salt_len: HashAlgorithm::Sha256.digest_len(),
        }
    }

    /// Check that these parameters are ones the backends can service.
    ///
    /// Runs before any native call so an unsupported combination never
    /// reaches the platform API.
    pub fn validate(&self) -> Result<(), SigningError> {
        if self.hash != HashAlgorithm::Sha256 {
            return Err(SigningError::UnsupportedParameters {
                reason: format!("unsupported hash {:?}", self.hash),
            });
        }
        if self.salt_len != self.hash.digest_len() {
            return Err(SigningError::UnsupportedParameters {
                reason: format!(
                    "salt length {} does not equal hash length {}",
                    self.salt_len,
                    self.hash.digest_len()
                ),
            });
        }
        Ok(())
    }

    /// Check that a digest has the length this padding expects.
    pub fn validate_digest(&self, digest: &[u8]) -> Result<(), SigningError> {
        if digest.len() != self.hash.digest_len() {
            return Err(SigningError::UnsupportedParameters {
                reason: format!(
                    "digest length {} does not match {:?}",
                    digest.len(),
                    self.hash
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salt_equals_hash() {
        let padding = PssPadding::sha256_salt_equals_hash();
        assert_eq!(padding.salt_len, 32);
        assert!(padding.validate().is_ok());
    }

    #[test]
    fn test_rejects_other_salt_lengths() {
        let padding = PssPadding {
            hash: HashAlgorithm::Sha256,
            salt_len: 20,
        };
        assert!(matches!(
            padding.validate(),
            Err(SigningError::UnsupportedParameters { .. })
        ));
    }

    #[test]
    fn test_digest_length_check() {
        let padding = PssPadding::sha256_salt_equals_hash();
        assert!(padding.validate_digest(&[0u8; 32]).is_ok());
        assert!(matches!(
            padding.validate_digest(&[0u8; 20]),
            Err(SigningError::UnsupportedParameters { .. })
        ));
    }
}
