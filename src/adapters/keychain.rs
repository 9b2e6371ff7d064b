//! macOS Keychain credential store
//!
//! Queries the user's Keychain for signing identities and signs digests
//! through `SecKeyCreateSignature`, so the private key never crosses into
//! this process. Handles are Core Foundation references and release
//! themselves when dropped.

use security_framework::identity::SecIdentity;
use security_framework::item::{ItemClass, ItemSearchOptions, Limit, Reference, SearchResult};
use security_framework::key::{Algorithm, SecKey};
use tracing::debug;

use crate::error::{SigningError, StoreError};
use crate::model::{PssPadding, SelectionCriteria};
use crate::ports::{CredentialStore, PrivateKeyHandle, StoreIdentity};

// OSStatus for "no matching items"; an empty store is not an error.
const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;

/// Credential store over the macOS Keychain
#[derive(Debug, Default)]
pub struct KeychainStore;

impl KeychainStore {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialStore for KeychainStore {
    type Identity = KeychainIdentity;

    fn find_identities(
        &self,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<Self::Identity>, StoreError> {
        debug!("querying Keychain for identities labeled {:?}", criteria.common_name);

        // The Keychain labels an identity with its certificate's common
        // name, so a label match is the store-side CN filter. Signing
        // capability is not expressible through the search options; the
        // selector re-checks both on the returned candidates.
        let mut options = ItemSearchOptions::new();
        options
            .class(ItemClass::identity())
            .label(&criteria.common_name)
            .limit(Limit::All)
            .load_refs(true);

        let results = match options.search() {
            Ok(results) => results,
            Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Native {
                    operation: "SecItemCopyMatching",
                    code: i64::from(e.code()),
                })
            }
        };

        let identities: Vec<KeychainIdentity> = results
            .into_iter()
            .filter_map(|result| match result {
                SearchResult::Ref(Reference::Identity(identity)) => {
                    Some(KeychainIdentity { identity })
                }
                _ => None,
            })
            .collect();

        debug!("Keychain returned {} candidate identities", identities.len());
        Ok(identities)
    }
}

/// A candidate identity from the Keychain
pub struct KeychainIdentity {
    identity: SecIdentity,
}

impl StoreIdentity for KeychainIdentity {
    type Key = KeychainKey;

    fn certificate_der(&self) -> Result<Vec<u8>, StoreError> {
        let certificate = self.identity.certificate().map_err(|e| StoreError::Native {
            operation: "SecIdentityCopyCertificate",
            code: i64::from(e.code()),
        })?;
        Ok(certificate.to_der())
    }

    fn into_private_key(self) -> Result<Self::Key, StoreError> {
        let key = self.identity.private_key().map_err(|e| StoreError::Native {
            operation: "SecIdentityCopyPrivateKey",
            code: i64::from(e.code()),
        })?;
        Ok(KeychainKey { key })
    }
}

/// Private key handle backed by a `SecKey` reference
pub struct KeychainKey {
    key: SecKey,
}

impl PrivateKeyHandle for KeychainKey {
    fn sign_digest(&self, digest: &[u8], padding: &PssPadding) -> Result<Vec<u8>, SigningError> {
        padding.validate()?;
        padding.validate_digest(digest)?;

        // The digest PSS algorithm fixes the salt length to the digest
        // length, which validate() has already pinned to SHA-256.
        self.key
            .create_signature(Algorithm::RSASignatureDigestPSSSHA256, digest)
            .map_err(|e| SigningError::Native {
                operation: "SecKeyCreateSignature",
                code: e.code() as i64,
            })
    }
}
