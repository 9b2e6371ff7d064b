//! TLS client authentication with keys held by the platform credential
//! store.
//!
//! The private key never enters this process. Candidate identities are
//! enumerated from the platform store (macOS Keychain, Windows CNG), the
//! first usable one is selected, and handshake signatures are produced by
//! the store itself over RSA-PSS with SHA-256. A [`StoreCertResolver`]
//! plugs the whole flow into rustls, and [`api::client_config`] builds a
//! ready-to-use `ClientConfig` on supported platforms.
//!
//! The crate is organized hexagonally: `model` and `logic` are pure,
//! `ports` defines the store traits, `adapters` implements them per
//! platform, and `use_cases` plus `tls` wire everything together.

pub mod adapters;
pub mod api;
pub mod error;
pub mod logic;
pub mod model;
pub mod ports;
pub mod signer;
pub mod tls;
pub mod use_cases;

pub use error::{PlatsignError, PlatsignResult};
pub use model::{ClientCertificate, SelectionCriteria, SignatureScheme};
pub use signer::KeystoreSigner;
pub use tls::StoreCertResolver;
pub use use_cases::{resolve_client_credential, select_identity, ClientCredential};
