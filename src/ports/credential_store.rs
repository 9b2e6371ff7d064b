//! Credential store traits

use crate::error::{SigningError, StoreError};
use crate::model::{PssPadding, SelectionCriteria};

/// Capability to query a credential store for client identities
///
/// A query is scoped: any native resource it opens that does not end up in
/// a returned identity must be released before `find_identities` returns.
/// Returned identities own their native resources and release them on drop,
/// so abandoning an enumeration can never leak.
pub trait CredentialStore {
    /// Candidate identity type produced by a query
    type Identity: StoreIdentity;

    /// Find identities matching the criteria, in native store order.
    ///
    /// Matching uses the store's own attribute query (subject common name,
    /// signing capability); expiry filtering is the selector's job because
    /// native stores do not filter on validity.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened or the query fails.
    /// An empty result is not an error.
    fn find_identities(
        &self,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<Self::Identity>, StoreError>;
}

// Shared stores work too; callers that keep the store around to observe
// it (or hand it to several configs) pass an Arc.
impl<S: CredentialStore> CredentialStore for std::sync::Arc<S> {
    type Identity = S::Identity;

    fn find_identities(
        &self,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<Self::Identity>, StoreError> {
        S::find_identities(self, criteria)
    }
}

/// A candidate identity enumerated from a credential store
///
/// Holds native resources (certificate context, store reference) until
/// dropped or converted into a private key handle.
pub trait StoreIdentity {
    /// Private key handle type this identity converts into
    type Key: PrivateKeyHandle;

    /// DER-encoded certificate of this identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be read out of the
    /// native context; the selector skips such candidates.
    fn certificate_der(&self) -> Result<Vec<u8>, StoreError>;

    /// Convert this identity into its private key handle.
    ///
    /// Consumes the identity: ownership of the native resources transfers
    /// to the key handle, which releases them exactly once on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if the key reference cannot be acquired.
    fn into_private_key(self) -> Result<Self::Key, StoreError>;
}

/// An opaque handle to a private key held by the platform
///
/// Key material never crosses this boundary; only digests go in and
/// signatures come out.
pub trait PrivateKeyHandle {
    /// Sign a digest with PSS padding.
    ///
    /// The padding descriptor is validated and translated to the native
    /// representation fresh on every call.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::UnsupportedParameters`] for padding the
    /// backend cannot produce, or [`SigningError::Native`] with the native
    /// status code when the platform call fails.
    fn sign_digest(&self, digest: &[u8], padding: &PssPadding) -> Result<Vec<u8>, SigningError>;
}
