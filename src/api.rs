//! Public API
//!
//! High-level entry points for callers that do not want to assemble the
//! pieces themselves: build a rustls `ClientConfig` whose client
//! certificate comes out of a credential store, or list the certificates
//! a store would offer for a given selection.

use std::sync::Arc;

use rustls::{ClientConfig, RootCertStore};
use tracing::debug;

use crate::error::PlatsignError;
use crate::model::{ClientCertificate, SelectionCriteria};
use crate::ports::{CredentialStore, StoreIdentity};
use crate::tls::StoreCertResolver;

/// Root store preloaded with the Mozilla CA bundle.
pub fn mozilla_roots() -> RootCertStore {
    RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned())
}

/// Build a TLS client configuration whose client certificate and signing
/// key are resolved from the given credential store at handshake time.
///
/// # Errors
///
/// Returns an error if the TLS configuration cannot be assembled.
pub fn client_config_with_store<S>(
    store: S,
    criteria: SelectionCriteria,
    roots: RootCertStore,
) -> Result<ClientConfig, PlatsignError>
where
    S: CredentialStore + Send + Sync + 'static,
    <S::Identity as StoreIdentity>::Key: Send + Sync + 'static,
{
    let config = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(roots)
    .with_client_cert_resolver(Arc::new(StoreCertResolver::new(store, criteria)));
    Ok(config)
}

/// Build a TLS client configuration over the platform credential store,
/// trusting the Mozilla CA bundle for servers.
///
/// # Errors
///
/// Returns an error if the TLS configuration cannot be assembled.
#[cfg(target_os = "macos")]
pub fn client_config(criteria: SelectionCriteria) -> Result<ClientConfig, PlatsignError> {
    client_config_with_store(
        crate::adapters::keychain::KeychainStore::new(),
        criteria,
        mozilla_roots(),
    )
}

/// Build a TLS client configuration over the platform credential store,
/// trusting the Mozilla CA bundle for servers.
///
/// # Errors
///
/// Returns an error if the TLS configuration cannot be assembled.
#[cfg(windows)]
pub fn client_config(criteria: SelectionCriteria) -> Result<ClientConfig, PlatsignError> {
    client_config_with_store(
        crate::adapters::cng::CngStore::new(),
        criteria,
        mozilla_roots(),
    )
}

/// List the decodable certificates a store offers for the given criteria.
///
/// Candidates whose certificate bytes cannot be read or decoded are
/// skipped. All store handles are released before this returns.
///
/// # Errors
///
/// Returns an error if the store query itself fails.
pub fn list_certificates<S>(
    store: &S,
    criteria: &SelectionCriteria,
) -> Result<Vec<ClientCertificate>, PlatsignError>
where
    S: CredentialStore,
{
    let mut certificates = Vec::new();
    for identity in store.find_identities(criteria)? {
        let der = match identity.certificate_der() {
            Ok(der) => der,
            Err(e) => {
                debug!("skipping unreadable candidate: {}", e);
                continue;
            }
        };
        match ClientCertificate::parse(&der) {
            Ok(certificate) => certificates.push(certificate),
            Err(e) => debug!("skipping undecodable candidate: {}", e),
        }
    }
    Ok(certificates)
}
