//! Resolve a client credential for one handshake attempt
//!
//! The sequence the TLS "peer requested a client certificate" callback
//! runs: negotiate the scheme first (pure, cheap, no native resources),
//! then select an identity, then wrap it in a signer. Each handshake
//! attempt resolves from scratch; there is no cross-handshake caching
//! because the store can change between handshakes.

use tracing::debug;

use crate::error::PlatsignError;
use crate::logic::negotiate;
use crate::model::{SelectionCriteria, SignatureScheme};
use crate::ports::{CredentialStore, StoreIdentity};
use crate::signer::KeystoreSigner;
use crate::use_cases::select_identity;

/// A resolved client credential: certificate, signer and the negotiated
/// scheme, ready to hand to the TLS stack
pub struct ClientCredential<K> {
    /// Signer over the selected identity
    pub signer: KeystoreSigner<K>,
    /// The scheme negotiated with the peer
    pub scheme: SignatureScheme,
}

impl<K> std::fmt::Debug for ClientCredential<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredential")
            .field("signer", &self.signer)
            .field("scheme", &self.scheme)
            .finish()
    }
}

/// Resolve a credential for a handshake in which the peer offered the given
/// signature schemes (TLS wire identifiers, in the peer's preference order).
///
/// # Errors
///
/// Returns [`crate::error::NegotiationError::UnsupportedScheme`] before any
/// store access if the peer does not accept the supported scheme, or the
/// selection error otherwise.
pub fn resolve_client_credential<S>(
    store: &S,
    criteria: &SelectionCriteria,
    offered_schemes: &[u16],
) -> Result<ClientCredential<<S::Identity as StoreIdentity>::Key>, PlatsignError>
where
    S: CredentialStore,
{
    // Scheme check comes first so an incompatible peer costs no store query.
    let scheme = negotiate(offered_schemes)?;
    debug!("peer accepts {}, querying credential store", scheme);

    let identity = select_identity(store, criteria)?;
    Ok(ClientCredential {
        signer: KeystoreSigner::new(identity),
        scheme,
    })
}
