//! In-memory software credential store
//!
//! Plays the role the Keychain and CNG stores play on their platforms,
//! backed by plain RSA keys. It exists for tests and development on hosts
//! without a native store, and it keeps two counters the test suite leans
//! on: how many queries were issued and how many identity/key handles are
//! currently open. The counters let tests assert that negotiation failures
//! never touch the store and that selection releases everything it does
//! not return.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pss, RsaPrivateKey};
use sha2::Sha256;

use crate::error::{SigningError, StoreError};
use crate::model::{ClientCertificate, PssPadding, SelectionCriteria};
use crate::ports::{CredentialStore, PrivateKeyHandle, StoreIdentity};

/// PEM fixture material used by the test suite
pub mod fixtures {
    /// Client certificate with CN "svc-client", valid for decades
    pub const CLIENT_VALID_CERT: &str = include_str!("../../testdata/client-valid.cert.pem");
    /// PKCS#8 key for [`CLIENT_VALID_CERT`]
    pub const CLIENT_VALID_KEY: &str = include_str!("../../testdata/client-valid.key.pem");
    /// Client certificate with CN "svc-client", expired in 2021
    pub const CLIENT_EXPIRED_CERT: &str = include_str!("../../testdata/client-expired.cert.pem");
    /// PKCS#8 key for [`CLIENT_EXPIRED_CERT`]
    pub const CLIENT_EXPIRED_KEY: &str = include_str!("../../testdata/client-expired.key.pem");
    /// Server certificate for "localhost"
    pub const SERVER_CERT: &str = include_str!("../../testdata/server.cert.pem");
    /// PKCS#8 key for [`SERVER_CERT`]
    pub const SERVER_KEY: &str = include_str!("../../testdata/server.key.pem");
}

/// Decode the base64 body of a single-block PEM file.
pub fn pem_body(pem: &str) -> Result<Vec<u8>, StoreError> {
    let body: String = pem
        .lines()
        .filter(|line| !line.starts_with('-'))
        .collect();
    BASE64
        .decode(body)
        .map_err(|e| StoreError::query(format!("invalid PEM body: {}", e)))
}

struct Record {
    cert_der: Vec<u8>,
    key: Option<RsaPrivateKey>,
    can_sign: bool,
}

/// In-memory credential store
#[derive(Default)]
pub struct SoftwareStore {
    records: Vec<Record>,
    queries: AtomicUsize,
    open_handles: Arc<AtomicUsize>,
}

impl std::fmt::Debug for SoftwareStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareStore")
            .field("records", &self.records.len())
            .finish()
    }
}

impl SoftwareStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identity from PEM-encoded certificate and PKCS#8 key.
    ///
    /// # Errors
    ///
    /// Returns an error if either PEM block cannot be decoded.
    pub fn add_identity_pem(&mut self, cert_pem: &str, key_pem: &str) -> Result<(), StoreError> {
        let cert_der = pem_body(cert_pem)?;
        let key = RsaPrivateKey::from_pkcs8_pem(key_pem)
            .map_err(|e| StoreError::query(format!("invalid PKCS#8 key: {}", e)))?;
        self.records.push(Record {
            cert_der,
            key: Some(key),
            can_sign: true,
        });
        Ok(())
    }

    /// Add an identity whose certificate bytes do not decode.
    ///
    /// Used to exercise the selector's skip-on-decode-failure path.
    pub fn add_corrupt_identity(&mut self) {
        self.records.push(Record {
            cert_der: vec![0xde, 0xad, 0xbe, 0xef],
            key: None,
            can_sign: true,
        });
    }

    /// Add an identity whose key cannot sign.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate PEM cannot be decoded.
    pub fn add_non_signing_identity_pem(&mut self, cert_pem: &str) -> Result<(), StoreError> {
        let cert_der = pem_body(cert_pem)?;
        self.records.push(Record {
            cert_der,
            key: None,
            can_sign: false,
        });
        Ok(())
    }

    /// Number of queries issued against this store.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of identity/key handles currently open.
    pub fn open_handle_count(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }
}

impl CredentialStore for SoftwareStore {
    type Identity = SoftwareIdentity;

    fn find_identities(
        &self,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<Self::Identity>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);

        let mut matches = Vec::new();
        for record in &self.records {
            if criteria.require_signing && !record.can_sign {
                continue;
            }
            // Attribute matching mirrors what the native stores do; records
            // whose certificate does not decode are still returned so the
            // selector exercises its skip path, exactly like a corrupt
            // entry in a real store would be.
            if let Ok(certificate) = ClientCertificate::parse(&record.cert_der) {
                if certificate.common_name() != Some(criteria.common_name.as_str()) {
                    continue;
                }
            }
            matches.push(SoftwareIdentity {
                cert_der: record.cert_der.clone(),
                key: record.key.clone(),
                guard: HandleGuard::new(&self.open_handles),
            });
        }
        Ok(matches)
    }
}

/// Accounting guard: one open handle for as long as it lives
struct HandleGuard(Arc<AtomicUsize>);

impl HandleGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for HandleGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A candidate identity from the software store
pub struct SoftwareIdentity {
    cert_der: Vec<u8>,
    key: Option<RsaPrivateKey>,
    guard: HandleGuard,
}

impl StoreIdentity for SoftwareIdentity {
    type Key = SoftwareKey;

    fn certificate_der(&self) -> Result<Vec<u8>, StoreError> {
        Ok(self.cert_der.clone())
    }

    fn into_private_key(self) -> Result<Self::Key, StoreError> {
        let key = self
            .key
            .ok_or_else(|| StoreError::query("identity has no signing key"))?;
        // The accounting guard moves into the key handle: still one open
        // handle until the key is dropped.
        Ok(SoftwareKey {
            key,
            _guard: self.guard,
        })
    }
}

/// Private key handle over an in-memory RSA key
pub struct SoftwareKey {
    key: RsaPrivateKey,
    _guard: HandleGuard,
}

impl PrivateKeyHandle for SoftwareKey {
    fn sign_digest(&self, digest: &[u8], padding: &PssPadding) -> Result<Vec<u8>, SigningError> {
        padding.validate()?;
        padding.validate_digest(digest)?;

        let pss = Pss::new_with_salt::<Sha256>(padding.salt_len);
        self.key
            .sign_with_rng(&mut rand::thread_rng(), pss, digest)
            .map_err(|e| SigningError::Failed {
                reason: format!("RSA-PSS signing failed: {}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_counts_and_matching() {
        let mut store = SoftwareStore::new();
        store
            .add_identity_pem(fixtures::CLIENT_VALID_CERT, fixtures::CLIENT_VALID_KEY)
            .unwrap();

        let criteria = SelectionCriteria::new("svc-client");
        let found = store.find_identities(&criteria).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(store.query_count(), 1);

        let other = store
            .find_identities(&SelectionCriteria::new("someone-else"))
            .unwrap();
        assert!(other.is_empty());
        assert_eq!(store.query_count(), 2);
    }

    #[test]
    fn test_require_signing_filters_records() {
        let mut store = SoftwareStore::new();
        store
            .add_non_signing_identity_pem(fixtures::CLIENT_VALID_CERT)
            .unwrap();

        let criteria = SelectionCriteria::new("svc-client");
        assert!(store.find_identities(&criteria).unwrap().is_empty());

        let relaxed = criteria.require_signing(false);
        assert_eq!(store.find_identities(&relaxed).unwrap().len(), 1);
    }

    #[test]
    fn test_handles_released_on_drop() {
        let mut store = SoftwareStore::new();
        store
            .add_identity_pem(fixtures::CLIENT_VALID_CERT, fixtures::CLIENT_VALID_KEY)
            .unwrap();
        store
            .add_identity_pem(fixtures::CLIENT_EXPIRED_CERT, fixtures::CLIENT_EXPIRED_KEY)
            .unwrap();

        let found = store
            .find_identities(&SelectionCriteria::new("svc-client"))
            .unwrap();
        assert_eq!(store.open_handle_count(), 2);
        drop(found);
        assert_eq!(store.open_handle_count(), 0);
    }

    #[test]
    fn test_corrupt_record_is_enumerated() {
        let mut store = SoftwareStore::new();
        store.add_corrupt_identity();

        let found = store
            .find_identities(&SelectionCriteria::new("svc-client"))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(ClientCertificate::parse(&found[0].certificate_der().unwrap()).is_err());
    }

    #[test]
    fn test_pem_body_rejects_garbage() {
        assert!(pem_body("not pem at all ~~~").is_err());
    }
}
