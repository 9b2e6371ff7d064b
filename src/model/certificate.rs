//! Parsed client certificate
//!
//! Wraps the raw DER plus the handful of fields selection and signing need:
//! subject common name for matching, validity for expiry filtering, and the
//! SPKI for deriving the public key without touching the private key handle.

use std::time::SystemTime;

use x509_cert::der::asn1::{PrintableStringRef, Utf8StringRef};
use x509_cert::der::oid::ObjectIdentifier;
use x509_cert::der::{Decode, Encode};
use x509_cert::Certificate;

use crate::error::SelectionError;

const COMMON_NAME_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");

/// A decoded client certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    der: Vec<u8>,
    subject: String,
    common_name: Option<String>,
    issuer: String,
    not_before: SystemTime,
    not_after: SystemTime,
    public_key_der: Vec<u8>,
}

impl ClientCertificate {
    /// Parse a DER-encoded X.509 certificate.
    pub fn parse(der: &[u8]) -> Result<Self, SelectionError> {
        let certificate = Certificate::from_der(der)
            .map_err(|e| SelectionError::decode(format!("invalid X.509 DER: {}", e)))?;
        let tbs = &certificate.tbs_certificate;

        let public_key_der = tbs
            .subject_public_key_info
            .to_der()
            .map_err(|e| SelectionError::decode(format!("invalid SPKI: {}", e)))?;

        Ok(Self {
            der: der.to_vec(),
            subject: tbs.subject.to_string(),
            common_name: common_name_of(&tbs.subject),
            issuer: tbs.issuer.to_string(),
            not_before: tbs.validity.not_before.to_system_time(),
            not_after: tbs.validity.not_after.to_system_time(),
            public_key_der,
        })
    }

    /// Raw DER bytes, as sent in the TLS Certificate message.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name (RFC 4514 string).
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Subject common name, if the subject carries one.
    pub fn common_name(&self) -> Option<&str> {
        self.common_name.as_deref()
    }

    /// Issuer distinguished name (RFC 4514 string).
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// End of the validity period.
    pub fn not_after(&self) -> SystemTime {
        self.not_after
    }

    /// DER-encoded SubjectPublicKeyInfo.
    ///
    /// The public key always comes from the certificate, never from the
    /// private key handle.
    pub fn public_key_der(&self) -> &[u8] {
        &self.public_key_der
    }

    /// Whether the certificate is within its validity period at `now`.
    ///
    /// Expiry is strict: a certificate whose notAfter equals `now` is
    /// treated as expired.
    pub fn valid_at(&self, now: SystemTime) -> bool {
        self.not_before <= now && now < self.not_after
    }
}

fn common_name_of(name: &x509_cert::name::Name) -> Option<String> {
    for rdn in name.0.iter() {
        for atv in rdn.0.iter() {
            if atv.oid != COMMON_NAME_OID {
                continue;
            }
            if let Ok(s) = Utf8StringRef::try_from(&atv.value) {
                return Some(s.as_str().to_owned());
            }
            if let Ok(s) = PrintableStringRef::try_from(&atv.value) {
                return Some(s.as_str().to_owned());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;

    const VALID_PEM: &str = include_str!("../../testdata/client-valid.cert.pem");
    const EXPIRED_PEM: &str = include_str!("../../testdata/client-expired.cert.pem");

    fn pem_body(pem: &str) -> Vec<u8> {
        let body: String = pem
            .lines()
            .filter(|line| !line.starts_with('-'))
            .collect();
        BASE64.decode(body).expect("valid base64 body")
    }

    #[test]
    fn test_parse_fixture_certificate() {
        let cert = ClientCertificate::parse(&pem_body(VALID_PEM)).unwrap();
        assert_eq!(cert.common_name(), Some("svc-client"));
        assert!(cert.subject().contains("svc-client"));
        assert!(cert.issuer().contains("svc-client"));
        assert!(!cert.public_key_der().is_empty());
    }

    #[test]
    fn test_validity_window() {
        let cert = ClientCertificate::parse(&pem_body(VALID_PEM)).unwrap();
        assert!(cert.valid_at(SystemTime::now()));
        assert!(!cert.valid_at(cert.not_after() + Duration::from_secs(1)));
        // notAfter itself is already outside the window
        assert!(!cert.valid_at(cert.not_after()));
    }

    #[test]
    fn test_expired_fixture_is_expired() {
        let cert = ClientCertificate::parse(&pem_body(EXPIRED_PEM)).unwrap();
        assert_eq!(cert.common_name(), Some("svc-client"));
        assert!(!cert.valid_at(SystemTime::now()));
    }

    #[test]
    fn test_parse_garbage_fails() {
        let err = ClientCertificate::parse(&[0x30, 0x03, 0x01, 0x01, 0x00]).unwrap_err();
        assert!(matches!(err, SelectionError::Decode { .. }));
    }
}
