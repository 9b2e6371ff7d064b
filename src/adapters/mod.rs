//! Credential store adapters
//!
//! Each platform gets one adapter implementing the [`CredentialStore`]
//! port, plus an in-memory software store for tests and unsupported
//! hosts.
//!
//! [`CredentialStore`]: crate::ports::CredentialStore

#[cfg(windows)]
pub mod cng;
#[cfg(target_os = "macos")]
pub mod keychain;
pub mod software;

#[cfg(windows)]
pub use cng::{CngIdentity, CngKey, CngStore};
#[cfg(target_os = "macos")]
pub use keychain::{KeychainIdentity, KeychainKey, KeychainStore};
pub use software::{SoftwareIdentity, SoftwareKey, SoftwareStore};
