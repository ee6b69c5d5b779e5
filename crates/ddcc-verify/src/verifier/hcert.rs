//! HCERT: EU Digital COVID Certificate and WHO DDCC:VS (`HC1:`).

use ddcc_trust::Framework;
use serde_json::Value;

use super::{
    conclude, verify_signature, Accepted, CredentialFormat, FormatVerifier, Rejection, Trace,
    VerifierContext,
};
use crate::codec::{base45_decode, base64_encode, inflate_zlib_if_compressed, strip_prefix_ignore_case};
use crate::cose::{cbor_to_json, CoseSign1};
use crate::document::LogicalModel;
use crate::signature::{SignatureAlgorithm, SignatureError};
use crate::status::{Status, VerificationResult};

const PREFIX: &str = "HC1:";

/// CWT claim carrying the issuing country.
const CLAIM_ISSUER: &str = "1";

#[derive(Debug, Clone)]
pub struct HcertVerifier {
    context: VerifierContext,
}

impl HcertVerifier {
    pub fn new(context: VerifierContext) -> Self {
        Self { context }
    }

    fn run(&self, raw: &str, trace: &mut Trace) -> Result<Accepted, Rejection> {
        let bytes = transport_decode(raw)?;

        let message = CoseSign1::from_slice(&bytes)
            .map_err(|e| Rejection::new(Status::InvalidSigningFormat, e))?;
        let claims = message
            .payload_value()
            .map(|cbor| cbor_to_json(&cbor))
            .map_err(|e| Rejection::new(Status::InvalidSigningFormat, e))?;
        if !claims.is_object() {
            return Err(Rejection::new(
                Status::InvalidSigningFormat,
                "CWT payload is not a map",
            ));
        }
        trace.unpacked = Some(claims.to_string());
        trace.country = claims
            .get(CLAIM_ISSUER)
            .and_then(Value::as_str)
            .map(str::to_string);

        let kid = message
            .kid()
            .and_then(|bytes| kid_to_text(&bytes))
            .ok_or_else(|| Rejection::new(Status::KidNotIncluded, "no kid in COSE headers"))?;

        let issuer = self.context.trusted_issuer(Framework::Dcc, &kid)?;

        let signed = message
            .signed_bytes()
            .map_err(|e| Rejection::new(Status::InvalidSignature, e))?;
        let algorithm = message
            .algorithm()
            .ok_or_else(|| SignatureError::UnsupportedAlgorithm("none".to_string()))
            .and_then(SignatureAlgorithm::from_cose);
        verify_signature(algorithm, &issuer, &signed, &message.signature)?;

        self.context
            .accept(LogicalModel::new(CredentialFormat::Hcert, claims), issuer)
    }
}

impl FormatVerifier for HcertVerifier {
    fn format(&self) -> CredentialFormat {
        CredentialFormat::Hcert
    }

    fn unpack_and_verify(&self, raw: &str) -> VerificationResult {
        let mut trace = Trace::default();
        let outcome = self.run(raw, &mut trace);
        conclude(self.format(), raw, trace, outcome)
    }
}

fn transport_decode(raw: &str) -> Result<Vec<u8>, Rejection> {
    let body = strip_prefix_ignore_case(raw.trim_start(), PREFIX)
        .ok_or_else(|| Rejection::new(Status::InvalidEncoding, "missing HC1: prefix"))?;
    let compressed =
        base45_decode(body).map_err(|e| Rejection::new(Status::InvalidEncoding, e))?;
    inflate_zlib_if_compressed(&compressed)
        .map_err(|e| Rejection::new(Status::InvalidCompression, e))
}

/// Text form of a COSE kid.
///
/// Kids already in `country#fragment` form are kept verbatim; opaque kids
/// (usually the first 8 bytes of the certificate hash) become standard
/// Base64. Empty kids are treated as absent.
pub fn kid_to_text(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    match std::str::from_utf8(bytes) {
        Ok(text) if text.contains('#') => Some(text.to_string()),
        _ => Some(base64_encode(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use ddcc_trust::{TrustResolver, TrustedEntity};

    struct Nobody;

    impl TrustResolver for Nobody {
        fn resolve(&self, _framework: Framework, _kid: &str) -> Option<Arc<TrustedEntity>> {
            None
        }
    }

    fn verifier() -> HcertVerifier {
        HcertVerifier::new(VerifierContext::new(Arc::new(Nobody)))
    }

    #[test]
    fn test_kid_to_text() {
        assert_eq!(
            kid_to_text(&[0x39, 0x30, 0x17, 0x68, 0xcd, 0xda, 0x05, 0x13]).as_deref(),
            Some("OTAXaM3aBRM=")
        );
        assert_eq!(kid_to_text(b"XCL#abc/def").as_deref(), Some("XCL#abc/def"));
        assert_eq!(kid_to_text(b"plain").as_deref(), Some("cGxhaW4="));
        assert_eq!(kid_to_text(b""), None);
    }

    #[test]
    fn test_transport_failures() {
        let v = verifier();
        assert_eq!(v.unpack_and_verify("HC1:A").status(), Status::InvalidEncoding);

        // Valid base45 of a broken zlib stream.
        let payload = format!("HC1:{}", base45::encode(b"\x78\x9c\xff\xff\xff\xff"));
        assert_eq!(v.unpack_and_verify(&payload).status(), Status::InvalidCompression);
    }

    #[test]
    fn test_not_cose_is_signing_format_error() {
        let payload = format!("HC1:{}", base45::encode(b"not cbor at all"));
        let result = verifier().unpack_and_verify(&payload);
        assert_eq!(result.status(), Status::InvalidSigningFormat);
        assert!(result.unpacked().is_none());
    }

    #[test]
    fn test_prefix_is_case_insensitive() {
        // An empty CBOR map gets past transport decode but is not COSE.
        let payload = format!("hc1:{}", base45::encode(b"\xa0"));
        assert_eq!(
            verifier().unpack_and_verify(&payload).status(),
            Status::InvalidSigningFormat
        );
    }
}
