//! Select a client identity from a credential store
//!
//! Implements the selection policy: query the store, walk candidates in
//! store order, skip the undecodable and the expired, take the first valid
//! one. Everything that is not part of the returned identity is released
//! (dropped) before this function returns.

use std::time::SystemTime;

use tracing::{debug, info};

use crate::error::{PlatsignError, SelectionError};
use crate::model::{ClientCertificate, SelectionCriteria};
use crate::ports::{CredentialStore, StoreIdentity};

/// The identity chosen by [`select_identity`]
///
/// Owns the parsed certificate by value and the private key handle
/// exclusively.
pub struct SelectedIdentity<K> {
    /// Certificate of the selected identity
    pub certificate: ClientCertificate,
    /// Live handle to the identity's private key
    pub key: K,
}

impl<K> std::fmt::Debug for SelectedIdentity<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedIdentity")
            .field("certificate", &self.certificate)
            .finish_non_exhaustive()
    }
}

/// Find the first matching, non-expired identity in the store.
///
/// Candidates whose certificate fails to read or decode are skipped, not
/// fatal. With `criteria.enforce_expiry` set (the default), candidates whose
/// certificate is not valid right now are skipped as well.
///
/// # Errors
///
/// Returns [`SelectionError::NotFound`] when the store holds no valid
/// candidate (empty store, no match, or all matches expired), or a
/// [`crate::error::StoreError`] if the query itself or key acquisition on
/// the selected candidate fails.
pub fn select_identity<S>(
    store: &S,
    criteria: &SelectionCriteria,
) -> Result<SelectedIdentity<<S::Identity as StoreIdentity>::Key>, PlatsignError>
where
    S: CredentialStore,
{
    let candidates = store.find_identities(criteria)?;
    debug!(
        "store query for {:?} returned {} candidates",
        criteria.common_name,
        candidates.len()
    );

    let now = SystemTime::now();
    for candidate in candidates {
        let der = match candidate.certificate_der() {
            Ok(der) => der,
            Err(e) => {
                debug!("skipping candidate with unreadable certificate: {}", e);
                continue;
            }
        };
        let certificate = match ClientCertificate::parse(&der) {
            Ok(certificate) => certificate,
            Err(e) => {
                debug!("skipping undecodable candidate: {}", e);
                continue;
            }
        };
        if certificate.common_name() != Some(criteria.common_name.as_str()) {
            debug!(
                "skipping candidate with subject {:?}",
                certificate.subject()
            );
            continue;
        }
        if criteria.enforce_expiry && !certificate.valid_at(now) {
            debug!(
                "skipping expired candidate from issuer {:?} (notAfter {:?})",
                certificate.issuer(),
                certificate.not_after()
            );
            continue;
        }

        // Unselected candidates still owned by the loop are dropped here,
        // releasing their native resources.
        let key = candidate.into_private_key()?;
        info!(
            "selected client identity {:?} from issuer {:?}",
            certificate.subject(),
            certificate.issuer()
        );
        return Ok(SelectedIdentity { certificate, key });
    }

    Err(SelectionError::NotFound {
        common_name: criteria.common_name.clone(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::software::{fixtures, SoftwareStore};
    use crate::model::{PssPadding, SignatureScheme};
    use crate::ports::PrivateKeyHandle;

    #[test]
    fn test_select_valid_identity() {
        let mut store = SoftwareStore::new();
        store.add_identity_pem(fixtures::CLIENT_VALID_CERT, fixtures::CLIENT_VALID_KEY).unwrap();

        let selected = select_identity(&store, &SelectionCriteria::new("svc-client")).unwrap();
        assert_eq!(selected.certificate.common_name(), Some("svc-client"));
    }

    #[test]
    fn test_select_prefers_valid_over_expired_regardless_of_order() {
        for expired_first in [true, false] {
            let mut store = SoftwareStore::new();
            if expired_first {
                store.add_identity_pem(fixtures::CLIENT_EXPIRED_CERT, fixtures::CLIENT_EXPIRED_KEY).unwrap();
                store.add_identity_pem(fixtures::CLIENT_VALID_CERT, fixtures::CLIENT_VALID_KEY).unwrap();
            } else {
                store.add_identity_pem(fixtures::CLIENT_VALID_CERT, fixtures::CLIENT_VALID_KEY).unwrap();
                store.add_identity_pem(fixtures::CLIENT_EXPIRED_CERT, fixtures::CLIENT_EXPIRED_KEY).unwrap();
            }

            let selected =
                select_identity(&store, &SelectionCriteria::new("svc-client")).unwrap();
            assert!(selected.certificate.valid_at(SystemTime::now()));
        }
    }

    #[test]
    fn test_select_empty_store_not_found() {
        let store = SoftwareStore::new();
        let err = select_identity(&store, &SelectionCriteria::new("svc-client")).unwrap_err();
        assert!(matches!(
            err,
            PlatsignError::Selection(SelectionError::NotFound { .. })
        ));
    }

    #[test]
    fn test_select_all_expired_not_found() {
        let mut store = SoftwareStore::new();
        store.add_identity_pem(fixtures::CLIENT_EXPIRED_CERT, fixtures::CLIENT_EXPIRED_KEY).unwrap();

        let err = select_identity(&store, &SelectionCriteria::new("svc-client")).unwrap_err();
        assert!(matches!(
            err,
            PlatsignError::Selection(SelectionError::NotFound { .. })
        ));
    }

    #[test]
    fn test_select_expired_allowed_when_enforcement_disabled() {
        let mut store = SoftwareStore::new();
        store.add_identity_pem(fixtures::CLIENT_EXPIRED_CERT, fixtures::CLIENT_EXPIRED_KEY).unwrap();

        let criteria = SelectionCriteria::new("svc-client").enforce_expiry(false);
        let selected = select_identity(&store, &criteria).unwrap();
        assert!(!selected.certificate.valid_at(SystemTime::now()));
    }

    #[test]
    fn test_select_skips_undecodable_candidate() {
        let mut store = SoftwareStore::new();
        store.add_corrupt_identity();
        store.add_identity_pem(fixtures::CLIENT_VALID_CERT, fixtures::CLIENT_VALID_KEY).unwrap();

        let selected = select_identity(&store, &SelectionCriteria::new("svc-client")).unwrap();
        assert_eq!(selected.certificate.common_name(), Some("svc-client"));
    }

    #[test]
    fn test_select_releases_unselected_handles() {
        let mut store = SoftwareStore::new();
        store.add_identity_pem(fixtures::CLIENT_EXPIRED_CERT, fixtures::CLIENT_EXPIRED_KEY).unwrap();
        store.add_identity_pem(fixtures::CLIENT_VALID_CERT, fixtures::CLIENT_VALID_KEY).unwrap();
        store.add_identity_pem(fixtures::CLIENT_VALID_CERT, fixtures::CLIENT_VALID_KEY).unwrap();

        let selected = select_identity(&store, &SelectionCriteria::new("svc-client")).unwrap();
        // Only the selected identity's handle may remain open.
        assert_eq!(store.open_handle_count(), 1);

        drop(selected);
        assert_eq!(store.open_handle_count(), 0);
    }

    #[test]
    fn test_selected_key_signs() {
        let mut store = SoftwareStore::new();
        store.add_identity_pem(fixtures::CLIENT_VALID_CERT, fixtures::CLIENT_VALID_KEY).unwrap();

        let selected = select_identity(&store, &SelectionCriteria::new("svc-client")).unwrap();
        let digest = [7u8; SignatureScheme::DIGEST_LEN];
        let signature = selected
            .key
            .sign_digest(&digest, &PssPadding::sha256_salt_equals_hash())
            .unwrap();
        assert!(!signature.is_empty());
    }
}
