//! rustls integration
//!
//! Bridges the credential store onto rustls' client certificate resolver
//! so a TLS client can authenticate with a key held by the platform.
//! Resolution happens once per handshake, inside rustls' callback; rustls
//! hands the signer the full to-be-signed message, so the adapter hashes
//! it and delegates the digest to the keystore signer.

use std::fmt;
use std::sync::Arc;

use rustls::client::ResolvesClientCert;
use rustls::pki_types::CertificateDer;
use rustls::sign::{CertifiedKey, Signer, SigningKey};
use rustls::{SignatureAlgorithm, SignatureScheme as TlsScheme};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::model::{SelectionCriteria, SignatureScheme};
use crate::ports::{CredentialStore, PrivateKeyHandle, StoreIdentity};
use crate::signer::KeystoreSigner;
use crate::use_cases::resolve_client_credential;

/// Client certificate resolver backed by a credential store
///
/// Every handshake in which the server requests a client certificate
/// triggers a fresh store query; nothing is cached between handshakes.
pub struct StoreCertResolver<S> {
    store: S,
    criteria: SelectionCriteria,
}

impl<S> StoreCertResolver<S> {
    pub fn new(store: S, criteria: SelectionCriteria) -> Self {
        Self { store, criteria }
    }
}

impl<S> fmt::Debug for StoreCertResolver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCertResolver")
            .field("criteria", &self.criteria)
            .finish()
    }
}

impl<S> ResolvesClientCert for StoreCertResolver<S>
where
    S: CredentialStore + Send + Sync,
    <S::Identity as StoreIdentity>::Key: Send + Sync + 'static,
{
    fn resolve(
        &self,
        _root_hint_subjects: &[&[u8]],
        sigschemes: &[TlsScheme],
    ) -> Option<Arc<CertifiedKey>> {
        let offered: Vec<u16> = sigschemes.iter().map(|s| u16::from(*s)).collect();
        match resolve_client_credential(&self.store, &self.criteria, &offered) {
            Ok(credential) => {
                debug!(
                    "resolved client certificate {:?} for {}",
                    credential.signer.certificate().subject(),
                    credential.scheme
                );
                let der = CertificateDer::from(credential.signer.certificate().der().to_vec());
                let key = RsaPssSigningKey {
                    signer: Arc::new(credential.signer),
                };
                Some(Arc::new(CertifiedKey::new(vec![der], Arc::new(key))))
            }
            // rustls only takes Option here; continuing without a client
            // certificate is the protocol-level fallback, and the server
            // decides whether to accept that.
            Err(e) => {
                warn!("client certificate unavailable: {}", e);
                None
            }
        }
    }

    fn has_certs(&self) -> bool {
        true
    }
}

/// rustls signing key that defers to a keystore signer
struct RsaPssSigningKey<K> {
    signer: Arc<KeystoreSigner<K>>,
}

impl<K> fmt::Debug for RsaPssSigningKey<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPssSigningKey")
            .field("signer", &self.signer)
            .finish()
    }
}

impl<K> SigningKey for RsaPssSigningKey<K>
where
    K: PrivateKeyHandle + Send + Sync + 'static,
{
    fn choose_scheme(&self, offered: &[TlsScheme]) -> Option<Box<dyn Signer>> {
        if !offered.contains(&TlsScheme::RSA_PSS_SHA256) {
            return None;
        }
        Some(Box::new(RsaPssSigner {
            signer: Arc::clone(&self.signer),
        }))
    }

    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::RSA
    }
}

/// rustls signer for one handshake signature
struct RsaPssSigner<K> {
    signer: Arc<KeystoreSigner<K>>,
}

impl<K> fmt::Debug for RsaPssSigner<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPssSigner")
            .field("signer", &self.signer)
            .finish()
    }
}

impl<K> Signer for RsaPssSigner<K>
where
    K: PrivateKeyHandle + Send + Sync,
{
    fn sign(&self, message: &[u8]) -> Result<Vec<u8>, rustls::Error> {
        let digest = Sha256::digest(message);
        self.signer
            .sign(&digest, SignatureScheme::RsaPssSha256)
            .map_err(|e| rustls::Error::General(e.to_string()))
    }

    fn scheme(&self) -> TlsScheme {
        TlsScheme::RSA_PSS_SHA256
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::software::{fixtures, pem_body, SoftwareStore};

    fn resolver_with_valid_identity() -> (Arc<StoreCertResolver<SoftwareStore>>, Vec<u8>) {
        let mut store = SoftwareStore::new();
        store
            .add_identity_pem(fixtures::CLIENT_VALID_CERT, fixtures::CLIENT_VALID_KEY)
            .unwrap();
        let der = pem_body(fixtures::CLIENT_VALID_CERT).unwrap();
        let resolver = Arc::new(StoreCertResolver::new(
            store,
            SelectionCriteria::new("svc-client"),
        ));
        (resolver, der)
    }

    #[test]
    fn test_resolve_returns_selected_certificate() {
        let (resolver, expected_der) = resolver_with_valid_identity();

        let key = resolver
            .resolve(&[], &[TlsScheme::RSA_PSS_SHA256])
            .expect("certified key");
        assert_eq!(key.cert.len(), 1);
        assert_eq!(key.cert[0].as_ref(), expected_der.as_slice());
    }

    #[test]
    fn test_resolve_declines_unsupported_peer() {
        let (resolver, _) = resolver_with_valid_identity();

        assert!(resolver
            .resolve(&[], &[TlsScheme::ECDSA_NISTP256_SHA256])
            .is_none());
    }

    #[test]
    fn test_resolve_declines_when_store_is_empty() {
        let resolver = StoreCertResolver::new(
            SoftwareStore::new(),
            SelectionCriteria::new("svc-client"),
        );

        assert!(resolver.resolve(&[], &[TlsScheme::RSA_PSS_SHA256]).is_none());
    }

    #[test]
    fn test_certified_key_signs_verifiable_pss() {
        use rsa::pkcs8::DecodePublicKey;
        use rsa::{Pss, RsaPublicKey};

        let (resolver, _) = resolver_with_valid_identity();
        let key = resolver
            .resolve(&[], &[TlsScheme::RSA_PSS_SHA256])
            .expect("certified key");

        let signer = key
            .key
            .choose_scheme(&[TlsScheme::RSA_PSS_SHA256])
            .expect("scheme accepted");
        assert_eq!(signer.scheme(), TlsScheme::RSA_PSS_SHA256);

        let message = b"tls 1.3 signature payload";
        let signature = signer.sign(message).unwrap();

        let cert =
            crate::model::ClientCertificate::parse(key.cert[0].as_ref()).unwrap();
        let public = RsaPublicKey::from_public_key_der(cert.public_key_der()).unwrap();
        let digest = Sha256::digest(message);
        public
            .verify(Pss::new_with_salt::<Sha256>(32), &digest, &signature)
            .expect("signature verifies");
    }

    #[test]
    fn test_signing_key_rejects_other_schemes() {
        let (resolver, _) = resolver_with_valid_identity();
        let key = resolver
            .resolve(&[], &[TlsScheme::RSA_PSS_SHA256])
            .expect("certified key");

        assert!(key
            .key
            .choose_scheme(&[TlsScheme::RSA_PKCS1_SHA256])
            .is_none());
    }
}
