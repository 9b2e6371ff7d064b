//! Windows certificate store and CNG credential store
//!
//! Enumerates the current user's "MY" store and signs digests through
//! `NCryptSignHash`, so the private key stays inside the platform key
//! storage provider. All native handles are wrapped in RAII guards; the
//! store handle is reference counted because an NCrypt key acquired from
//! a certificate context is only usable while its store stays open.

use std::ffi::c_void;
use std::sync::Arc;

use tracing::debug;
use windows::core::w;
use windows::Win32::Foundation::BOOL;
use windows::Win32::Security::Cryptography::{
    CertCloseStore, CertDuplicateCertificateContext, CertFindCertificateInStore,
    CertFreeCertificateContext, CertOpenStore, CryptAcquireCertificatePrivateKey,
    NCryptFreeObject, NCryptSignHash, BCRYPT_PAD_PSS, BCRYPT_PSS_PADDING_INFO,
    BCRYPT_SHA256_ALGORITHM, CERT_CONTEXT, CERT_FIND_SUBJECT_STR_W, CERT_NCRYPT_KEY_SPEC,
    CERT_OPEN_STORE_FLAGS, CERT_QUERY_ENCODING_TYPE, CERT_STORE_PROV_SYSTEM_W,
    CERT_SYSTEM_STORE_CURRENT_USER_ID, CERT_SYSTEM_STORE_LOCATION_SHIFT, CRYPT_ACQUIRE_CACHE_FLAG,
    CRYPT_ACQUIRE_ONLY_NCRYPT_KEY_FLAG, CRYPT_ACQUIRE_SILENT_FLAG, HCERTSTORE,
    HCRYPTPROV_LEGACY, HCRYPTPROV_OR_NCRYPT_KEY_HANDLE, NCRYPT_FLAGS, NCRYPT_HANDLE,
    NCRYPT_KEY_HANDLE, NCRYPT_SILENT_FLAG, PKCS_7_ASN_ENCODING, X509_ASN_ENCODING,
};

use crate::error::{SigningError, StoreError};
use crate::model::{PssPadding, SelectionCriteria};
use crate::ports::{CredentialStore, PrivateKeyHandle, StoreIdentity};

const ENCODING: CERT_QUERY_ENCODING_TYPE =
    CERT_QUERY_ENCODING_TYPE(X509_ASN_ENCODING.0 | PKCS_7_ASN_ENCODING.0);

/// Open "MY" system store handle, closed on drop
struct StoreHandle(HCERTSTORE);

// HCERTSTORE is a process-wide handle; CryptoAPI store operations are
// documented thread safe.
unsafe impl Send for StoreHandle {}
unsafe impl Sync for StoreHandle {}

impl Drop for StoreHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CertCloseStore(Some(self.0), 0);
        }
    }
}

/// Duplicated certificate context, freed on drop
///
/// Keeps its originating store alive: an NCrypt key acquired from the
/// context stops working once the store closes.
struct CertContextHandle {
    ptr: *const CERT_CONTEXT,
    _store: Arc<StoreHandle>,
}

unsafe impl Send for CertContextHandle {}
unsafe impl Sync for CertContextHandle {}

impl Drop for CertContextHandle {
    fn drop(&mut self) {
        unsafe {
            let _ = CertFreeCertificateContext(Some(self.ptr));
        }
    }
}

/// Credential store over the current user's "MY" certificate store
#[derive(Debug, Default)]
pub struct CngStore;

impl CngStore {
    pub fn new() -> Self {
        Self
    }
}

impl CredentialStore for CngStore {
    type Identity = CngIdentity;

    fn find_identities(
        &self,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<Self::Identity>, StoreError> {
        debug!(
            "querying user certificate store for subject {:?}",
            criteria.common_name
        );

        let store = unsafe {
            CertOpenStore(
                CERT_STORE_PROV_SYSTEM_W,
                CERT_QUERY_ENCODING_TYPE(0),
                HCRYPTPROV_LEGACY(0),
                CERT_OPEN_STORE_FLAGS(
                    CERT_SYSTEM_STORE_CURRENT_USER_ID << CERT_SYSTEM_STORE_LOCATION_SHIFT,
                ),
                Some(w!("MY").as_ptr() as *const c_void),
            )
        }
        .map_err(|e| StoreError::Native {
            operation: "CertOpenStore",
            code: i64::from(e.code().0),
        })?;
        let store = Arc::new(StoreHandle(store));

        // Substring match on the subject, like a filtered store view; the
        // selector re-checks the exact common name on each candidate.
        // Signing capability is asserted later when the key is acquired.
        let subject: Vec<u16> = criteria
            .common_name
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();

        let mut identities = Vec::new();
        let mut current: *const CERT_CONTEXT = std::ptr::null();
        loop {
            current = unsafe {
                CertFindCertificateInStore(
                    store.0,
                    ENCODING,
                    0,
                    CERT_FIND_SUBJECT_STR_W,
                    Some(subject.as_ptr() as *const c_void),
                    Some(current),
                )
            };
            if current.is_null() {
                break;
            }
            // The find call frees the previous context on each iteration,
            // so keep an owned duplicate per candidate.
            let duplicate = unsafe { CertDuplicateCertificateContext(Some(current)) };
            if duplicate.is_null() {
                continue;
            }
            identities.push(CngIdentity {
                context: CertContextHandle {
                    ptr: duplicate,
                    _store: Arc::clone(&store),
                },
            });
        }

        debug!("certificate store returned {} candidates", identities.len());
        Ok(identities)
    }
}

/// A candidate identity from the Windows certificate store
pub struct CngIdentity {
    context: CertContextHandle,
}

impl StoreIdentity for CngIdentity {
    type Key = CngKey;

    fn certificate_der(&self) -> Result<Vec<u8>, StoreError> {
        let context = unsafe { &*self.context.ptr };
        let der = unsafe {
            std::slice::from_raw_parts(context.pbCertEncoded, context.cbCertEncoded as usize)
        };
        Ok(der.to_vec())
    }

    fn into_private_key(self) -> Result<Self::Key, StoreError> {
        let mut handle = HCRYPTPROV_OR_NCRYPT_KEY_HANDLE(0);
        let mut key_spec = CERT_NCRYPT_KEY_SPEC;
        let mut caller_free = BOOL(0);
        unsafe {
            CryptAcquireCertificatePrivateKey(
                self.context.ptr,
                CRYPT_ACQUIRE_CACHE_FLAG
                    | CRYPT_ACQUIRE_SILENT_FLAG
                    | CRYPT_ACQUIRE_ONLY_NCRYPT_KEY_FLAG,
                None,
                &mut handle,
                Some(&mut key_spec),
                Some(&mut caller_free),
            )
        }
        .map_err(|e| StoreError::Native {
            operation: "CryptAcquireCertificatePrivateKey",
            code: i64::from(e.code().0),
        })?;

        Ok(CngKey {
            handle: NCRYPT_KEY_HANDLE(handle.0 as _),
            caller_free: caller_free.as_bool(),
            _context: self.context,
        })
    }
}

/// Private key handle backed by an NCrypt key
pub struct CngKey {
    handle: NCRYPT_KEY_HANDLE,
    caller_free: bool,
    _context: CertContextHandle,
}

unsafe impl Send for CngKey {}
unsafe impl Sync for CngKey {}

impl Drop for CngKey {
    fn drop(&mut self) {
        // With CRYPT_ACQUIRE_CACHE_FLAG the provider usually keeps
        // ownership; free only when the acquire call said to.
        if self.caller_free {
            unsafe {
                let _ = NCryptFreeObject(NCRYPT_HANDLE(self.handle.0));
            }
        }
    }
}

impl PrivateKeyHandle for CngKey {
    fn sign_digest(&self, digest: &[u8], padding: &PssPadding) -> Result<Vec<u8>, SigningError> {
        padding.validate()?;
        padding.validate_digest(digest)?;

        let padding_info = BCRYPT_PSS_PADDING_INFO {
            pszAlgId: BCRYPT_SHA256_ALGORITHM,
            cbSalt: padding.salt_len as u32,
        };
        let flags = NCRYPT_FLAGS(NCRYPT_SILENT_FLAG.0 | BCRYPT_PAD_PSS.0);
        let info_ptr = &padding_info as *const BCRYPT_PSS_PADDING_INFO as *const c_void;

        // Two-phase call: first ask for the signature length, then sign
        // into a buffer of exactly that size.
        let mut len: u32 = 0;
        unsafe { NCryptSignHash(self.handle, Some(info_ptr), digest, None, &mut len, flags) }
            .map_err(|e| SigningError::Native {
                operation: "NCryptSignHash",
                code: i64::from(e.code().0),
            })?;

        let mut signature = vec![0u8; len as usize];
        let mut written: u32 = 0;
        unsafe {
            NCryptSignHash(
                self.handle,
                Some(info_ptr),
                digest,
                Some(&mut signature),
                &mut written,
                flags,
            )
        }
        .map_err(|e| SigningError::Native {
            operation: "NCryptSignHash",
            code: i64::from(e.code().0),
        })?;

        signature.truncate(written as usize);
        Ok(signature)
    }
}
