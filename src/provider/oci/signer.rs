//! # Request Signing
//!
//! OCI API-key authentication: every request carries an HTTP signature
//! (draft-cavage, version 1, `rsa-sha256`) over a fixed set of headers.
//!
//! - All requests sign `date`, `(request-target)` and `host`
//! - POST/PUT/PATCH additionally sign `content-length`, `content-type` and
//!   `x-content-sha256` (base64 SHA-256 of the body, empty body included)

use crate::provider::{ProviderError, ProviderResult};
use base64::{engine::general_purpose, Engine as _};
use reqwest::header::{HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, Url};
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

const REQUEST_TARGET: &str = "(request-target)";

/// Adds authentication to an outbound request just before it is sent
pub trait RequestSigner: Send + Sync + std::fmt::Debug {
    /// # Errors
    ///
    /// Returns [`ProviderError::Signing`] if the request cannot be signed.
    fn sign(&self, request: &mut reqwest::Request) -> ProviderResult<()>;
}

/// Signs requests with a user API key
pub struct ApiKeySigner {
    key_id: String,
    key_pair: RsaKeyPair,
    rng: SystemRandom,
}

impl std::fmt::Debug for ApiKeySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeySigner")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl ApiKeySigner {
    /// Parse a PEM encoded RSA key (PKCS#1 `RSA PRIVATE KEY` or PKCS#8 `PRIVATE KEY`)
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Signing`] for encrypted, malformed or unsupported keys.
    pub fn from_pem(key_id: impl Into<String>, pem: &str) -> ProviderResult<Self> {
        let (label, der) = decode_pem(pem)?;
        let key_pair = match label.as_str() {
            "RSA PRIVATE KEY" => RsaKeyPair::from_der(&der),
            "PRIVATE KEY" => RsaKeyPair::from_pkcs8(&der),
            other => {
                return Err(ProviderError::Signing(format!(
                    "unsupported PEM block '{other}' (expected an unencrypted RSA key)"
                )))
            }
        }
        .map_err(|e| ProviderError::Signing(format!("invalid RSA key: {e}")))?;

        Ok(Self {
            key_id: key_id.into(),
            key_pair,
            rng: SystemRandom::new(),
        })
    }

    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    fn signature(&self, signing_string: &str) -> ProviderResult<String> {
        let mut signature = vec![0; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(
                &RSA_PKCS1_SHA256,
                &self.rng,
                signing_string.as_bytes(),
                &mut signature,
            )
            .map_err(|e| ProviderError::Signing(format!("RSA signing failed: {e}")))?;
        Ok(general_purpose::STANDARD.encode(signature))
    }
}

impl RequestSigner for ApiKeySigner {
    fn sign(&self, request: &mut reqwest::Request) -> ProviderResult<()> {
        let date = chrono::Utc::now()
            .format("%a, %d %b %Y %H:%M:%S GMT")
            .to_string();
        let body = request.body().and_then(reqwest::Body::as_bytes);
        let headers = signing_headers(request.method(), request.url(), &date, body);

        let authorization = format!(
            r#"Signature version="1",keyId="{}",algorithm="rsa-sha256",headers="{}",signature="{}""#,
            self.key_id,
            header_list(&headers),
            self.signature(&signing_string(&headers))?
        );

        let target = request.headers_mut();
        for (name, value) in headers.into_iter().filter(|(n, _)| *n != REQUEST_TARGET) {
            target.insert(HeaderName::from_static(name), header_value(&value)?);
        }
        target.insert(AUTHORIZATION, header_value(&authorization)?);
        Ok(())
    }
}

fn header_value(value: &str) -> ProviderResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| ProviderError::Signing(format!("invalid header value: {e}")))
}

/// Ordered header name/value pairs covered by the signature
pub(crate) fn signing_headers(
    method: &Method,
    url: &Url,
    date: &str,
    body: Option<&[u8]>,
) -> Vec<(&'static str, String)> {
    let mut target = format!("{} {}", method.as_str().to_ascii_lowercase(), url.path());
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };

    let mut headers = vec![
        ("date", date.to_string()),
        (REQUEST_TARGET, target),
        ("host", host),
    ];

    if *method == Method::POST || *method == Method::PUT || *method == Method::PATCH {
        let body = body.unwrap_or_default();
        headers.push(("content-length", body.len().to_string()));
        headers.push(("content-type", "application/json".to_string()));
        headers.push((
            "x-content-sha256",
            general_purpose::STANDARD.encode(Sha256::digest(body)),
        ));
    }
    headers
}

pub(crate) fn signing_string(headers: &[(&'static str, String)]) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn header_list(headers: &[(&'static str, String)]) -> String {
    headers
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract the label and DER bytes of the first PEM block
fn decode_pem(pem: &str) -> ProviderResult<(String, Zeroizing<Vec<u8>>)> {
    let mut lines = pem.lines().map(str::trim).skip_while(|l| !l.starts_with("-----BEGIN "));
    let label = lines
        .next()
        .and_then(|l| l.strip_prefix("-----BEGIN "))
        .and_then(|l| l.strip_suffix("-----"))
        .ok_or_else(|| ProviderError::Signing("no PEM block found in private key".to_string()))?
        .to_string();

    if label.contains("ENCRYPTED") {
        return Err(ProviderError::Signing(
            "encrypted private keys are not supported".to_string(),
        ));
    }

    let mut body = Zeroizing::new(String::new());
    let mut terminated = false;
    for line in lines {
        if line.starts_with("-----END ") {
            terminated = true;
            break;
        }
        // Legacy `Proc-Type`/`DEK-Info` headers mean the key is encrypted
        if line.contains(':') {
            return Err(ProviderError::Signing(
                "encrypted private keys are not supported".to_string(),
            ));
        }
        body.push_str(line);
    }
    if !terminated {
        return Err(ProviderError::Signing(format!(
            "PEM block '{label}' is not terminated"
        )));
    }

    let der = general_purpose::STANDARD
        .decode(body.as_bytes())
        .map_err(|e| ProviderError::Signing(format!("invalid PEM body: {e}")))?;
    Ok((label, Zeroizing::new(der)))
}
