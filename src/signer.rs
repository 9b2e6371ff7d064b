//! Keystore-backed signer
//!
//! Owns the selected certificate by value and the platform private key
//! handle exclusively. The handle lives behind a `Mutex<Option<_>>`: the
//! mutex serializes native signing calls (platform primitives are not
//! guaranteed reentrant per handle) and the `Option` makes release an
//! explicit, exactly-once ownership transfer rather than a side effect of
//! collection timing.

use std::fmt;
use std::sync::Mutex;

use crate::error::SigningError;
use crate::model::{ClientCertificate, PssPadding, SignatureScheme};
use crate::ports::PrivateKeyHandle;
use crate::use_cases::SelectedIdentity;

/// Signer over a selected client identity
pub struct KeystoreSigner<K> {
    certificate: ClientCertificate,
    key: Mutex<Option<K>>,
}

impl<K: PrivateKeyHandle> KeystoreSigner<K> {
    /// Wrap a selected identity.
    pub fn new(identity: SelectedIdentity<K>) -> Self {
        Self {
            certificate: identity.certificate,
            key: Mutex::new(Some(identity.key)),
        }
    }

    /// The certificate of the wrapped identity.
    pub fn certificate(&self) -> &ClientCertificate {
        &self.certificate
    }

    /// DER-encoded SubjectPublicKeyInfo, derived from the certificate.
    pub fn public_key_der(&self) -> &[u8] {
        self.certificate.public_key_der()
    }

    /// Sign a SHA-256 digest with the platform key.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::UnsupportedScheme`] if `scheme` is not the
    /// scheme this signer advertised, [`SigningError::KeyReleased`] if the
    /// signer was closed, or the backend's signing error.
    pub fn sign(&self, digest: &[u8], scheme: SignatureScheme) -> Result<Vec<u8>, SigningError> {
        if scheme != SignatureScheme::RsaPssSha256 {
            return Err(SigningError::UnsupportedScheme {
                requested: scheme.to_string(),
            });
        }
        let padding = PssPadding::sha256_salt_equals_hash();
        padding.validate()?;
        padding.validate_digest(digest)?;

        let guard = self.key.lock().map_err(|_| SigningError::Failed {
            reason: "signer lock poisoned".to_string(),
        })?;
        let key = guard.as_ref().ok_or(SigningError::KeyReleased)?;
        key.sign_digest(digest, &padding)
    }

    /// Release the private key handle.
    ///
    /// The first call releases the handle (and whatever native resources
    /// ride along with it); later calls are no-ops. Any `sign` call after
    /// this fails with [`SigningError::KeyReleased`]. Dropping the signer
    /// without calling `close` releases the handle as well.
    pub fn close(&self) {
        if let Ok(mut guard) = self.key.lock() {
            guard.take();
        }
    }
}

impl<K> fmt::Debug for KeystoreSigner<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let released = self
            .key
            .lock()
            .map(|guard| guard.is_none())
            .unwrap_or(true);
        f.debug_struct("KeystoreSigner")
            .field("subject", &self.certificate.subject())
            .field("released", &released)
            .finish()
    }
}
