//! Account key handling, digesting, and the self-signed certificates used by
//! the `tls-alpn-01`/`tls-sni-01` challenge handlers.

use ring::digest::{digest, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{EcdsaKeyPair, EcdsaSigningAlgorithm, ECDSA_P256_SHA256_FIXED_SIGNING};
use time::{Duration, OffsetDateTime};

use crate::error::AcmeError;

static ALG: &EcdsaSigningAlgorithm = &ECDSA_P256_SHA256_FIXED_SIGNING;

/// An ACME account key pair.
///
/// Implemented as ECDSA P-256; see `DESIGN.md` for the rationale.
pub struct AccountKey {
    pub(crate) key_pair: EcdsaKeyPair,
}

impl std::fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountKey").finish_non_exhaustive()
    }
}

impl AccountKey {
    /// Generate a fresh account key, returning both the usable key and its
    /// PKCS#8 bytes (for the caller to persist).
    pub fn generate() -> Result<(Self, Vec<u8>), AcmeError> {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(ALG, &rng)
            .map_err(|_| AcmeError::Crypto(ring::error::Unspecified))?;
        let bytes = pkcs8.as_ref().to_vec();
        let key_pair = EcdsaKeyPair::from_pkcs8(ALG, &bytes, &rng)?;
        Ok((AccountKey { key_pair }, bytes))
    }

    /// Load an account key from previously generated PKCS#8 bytes.
    pub fn from_pkcs8(bytes: &[u8]) -> Result<Self, AcmeError> {
        let rng = SystemRandom::new();
        let key_pair = EcdsaKeyPair::from_pkcs8(ALG, bytes, &rng)?;
        Ok(AccountKey { key_pair })
    }

    /// The raw, uncompressed SEC1 public key point (`0x04 || x || y`), 65 bytes for P-256.
    pub(crate) fn public_key_point(&self) -> &[u8] {
        use ring::signature::KeyPair;
        self.key_pair.public_key().as_ref()
    }

    /// Sign `data` (already the `protected.payload` concatenation for JWS).
    pub(crate) fn sign(&self, data: &[u8]) -> Result<Vec<u8>, AcmeError> {
        let rng = SystemRandom::new();
        let sig = self.key_pair.sign(&rng, data)?;
        Ok(sig.as_ref().to_vec())
    }
}

/// Lowercase hex SHA-256 digest of `data`.
pub fn sha256_digest_hex(data: &[u8]) -> String {
    let d = digest(&SHA256, data);
    let mut out = String::with_capacity(d.as_ref().len() * 2);
    for byte in d.as_ref() {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Does `cert_der`'s SAN list contain `domain`?
pub fn cert_covers_domain(cert_der: &[u8], domain: &str) -> Result<bool, AcmeError> {
    let (_, cert) = x509_parser::parse_x509_certificate(cert_der)
        .map_err(|e| AcmeError::CertParse(e.to_string()))?;
    let Ok(Some(ext)) = cert.subject_alternative_name() else {
        return Ok(false);
    };
    let san = &ext.value;
    for name in &san.general_names {
        if let x509_parser::extensions::GeneralName::DNSName(dns) = name {
            if dns.eq_ignore_ascii_case(domain) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// A freshly generated challenge key plus its self-signed certificate, as DER bytes.
pub struct ChallengeCert {
    pub key_der: Vec<u8>,
    pub cert_der: Vec<u8>,
}

/// A 7-day self-signed cert for `domain` carrying the `acme-identifier`
/// critical extension derived from `key_authz`.
pub fn cert_make_tls_alpn_01(domain: &str, key_authz: &str) -> Result<ChallengeCert, AcmeError> {
    let token_digest = digest(&SHA256, key_authz.as_bytes());

    let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)?;
    let mut params = rcgen::CertificateParams::new(vec![domain.to_string()])?;
    params.custom_extensions = vec![rcgen::CustomExtension::new_acme_identifier(token_digest.as_ref())];
    params.not_before = OffsetDateTime::now_utc();
    params.not_after = params.not_before + Duration::days(7);

    let cert = params.self_signed(&key_pair)?;
    Ok(ChallengeCert {
        key_der: key_pair.serialize_der(),
        cert_der: cert.der().to_vec(),
    })
}

/// A 7-day self-signed cert whose subject CN is `cn` and whose SANs are `sans`.
pub fn cert_self_sign(cn: &str, sans: &[String]) -> Result<ChallengeCert, AcmeError> {
    let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P256_SHA256)?;
    let mut params = rcgen::CertificateParams::new(sans.to_vec())?;
    let mut dn = rcgen::DistinguishedName::new();
    dn.push(rcgen::DnType::CommonName, cn);
    params.distinguished_name = dn;
    params.not_before = OffsetDateTime::now_utc();
    params.not_after = params.not_before + Duration::days(7);

    let cert = params.self_signed(&key_pair)?;
    Ok(ChallengeCert {
        key_der: key_pair.serialize_der(),
        cert_der: cert.der().to_vec(),
    })
}
