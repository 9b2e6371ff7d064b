//! Use cases - orchestration of selection and credential resolution
//!
//! These functions are generic over the store ports so they can be tested
//! against the software store and reused unchanged by every native backend.

mod resolve_credential;
mod select_identity;

pub use resolve_credential::{resolve_client_credential, ClientCredential};
pub use select_identity::{select_identity, SelectedIdentity};
