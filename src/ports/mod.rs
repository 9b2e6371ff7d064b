//! Ports (traits) for credential store access
//!
//! These traits define the capabilities the selection and signing core
//! needs from a platform credential store. They are ports in hexagonal
//! architecture: the core depends on these abstractions, the Keychain,
//! CNG and software adapters implement them.

mod credential_store;

pub use credential_store::{CredentialStore, PrivateKeyHandle, StoreIdentity};
