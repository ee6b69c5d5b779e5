//! DIVOC W3C verifiable credentials (`B64:` or a raw ZIP starting with `PK`).

use ddcc_trust::Framework;
use serde_json::Value;

use super::{
    conclude, verify_signature, Accepted, CredentialFormat, FormatVerifier, Rejection, Trace,
    VerifierContext,
};
use crate::codec::{base64_decode, is_zip, latin1_bytes, strip_prefix_ignore_case, zip_entry};
use crate::document::LogicalModel;
use crate::jws::CompactJws;
use crate::signature::{SignatureAlgorithm, SignatureError};
use crate::status::{Status, VerificationResult};

const BASE64_PREFIX: &str = "B64:";

/// Archive entry holding the credential.
pub const CERTIFICATE_ENTRY: &str = "certificate.json";

#[derive(Debug, Clone)]
pub struct DivocVerifier {
    context: VerifierContext,
}

impl DivocVerifier {
    pub fn new(context: VerifierContext) -> Self {
        Self { context }
    }

    fn run(&self, raw: &str, trace: &mut Trace) -> Result<Accepted, Rejection> {
        let bytes = transport_decode(raw)?;
        let json = if is_zip(&bytes) {
            zip_entry(&bytes, CERTIFICATE_ENTRY)
                .map_err(|e| Rejection::new(Status::InvalidCompression, e))?
        } else {
            bytes
        };

        let mut credential: Value = serde_json::from_slice(&json)
            .map_err(|e| Rejection::new(Status::InvalidSigningFormat, e))?;
        trace.unpacked = Some(credential.to_string());
        trace.country = credential
            .get("credentialSubject")
            .and_then(|s| s.get("nationality"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let proof = credential
            .as_object_mut()
            .and_then(|object| object.remove("proof"))
            .ok_or_else(|| Rejection::new(Status::InvalidSigningFormat, "credential has no proof"))?;
        let token = proof
            .get("jws")
            .and_then(Value::as_str)
            .ok_or_else(|| Rejection::new(Status::InvalidSigningFormat, "proof has no jws"))?;
        let jws = CompactJws::parse(token)
            .map_err(|e| Rejection::new(Status::InvalidSigningFormat, e))?;

        let kid = jws
            .header
            .kid
            .as_deref()
            .or_else(|| proof.get("verificationMethod").and_then(Value::as_str))
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Rejection::new(Status::KidNotIncluded, "no kid or verificationMethod"))?;

        let issuer = self.context.trusted_issuer(Framework::Divoc, kid)?;

        let signing_input = signing_input(&jws, &credential)?;
        let signature = jws
            .signature()
            .map_err(|e| Rejection::new(Status::InvalidSignature, e))?;
        let algorithm = jws
            .header
            .alg
            .as_deref()
            .ok_or_else(|| SignatureError::UnsupportedAlgorithm("none".to_string()))
            .and_then(SignatureAlgorithm::from_jose);
        verify_signature(algorithm, &issuer, &signing_input, &signature)?;

        self.context
            .accept(LogicalModel::new(CredentialFormat::Divoc, credential), issuer)
    }
}

impl FormatVerifier for DivocVerifier {
    fn format(&self) -> CredentialFormat {
        CredentialFormat::Divoc
    }

    fn unpack_and_verify(&self, raw: &str) -> VerificationResult {
        let mut trace = Trace::default();
        let outcome = self.run(raw, &mut trace);
        conclude(self.format(), raw, trace, outcome)
    }
}

/// The QR text as bytes: Base64 after `B64:`, otherwise a Latin-1
/// rendering of binary data.
fn transport_decode(raw: &str) -> Result<Vec<u8>, Rejection> {
    match strip_prefix_ignore_case(raw, BASE64_PREFIX) {
        Some(body) => base64_decode(body),
        None => latin1_bytes(raw),
    }
    .map_err(|e| Rejection::new(Status::InvalidEncoding, e))
}

/// Bytes covered by the proof signature.
///
/// A detached JWS signs the canonical (JCS) form of the credential without
/// its proof. An attached payload must be that same credential.
fn signing_input(jws: &CompactJws<'_>, credential: &Value) -> Result<Vec<u8>, Rejection> {
    if jws.is_detached() {
        let canonical = serde_jcs::to_vec(credential)
            .map_err(|e| Rejection::new(Status::InvalidSignature, e))?;
        return Ok(jws.detached_signing_input(&canonical));
    }

    let signed: Value = jws
        .payload()
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or_else(|| Rejection::new(Status::InvalidSignature, "unreadable JWS payload"))?;
    if &signed != credential {
        return Err(Rejection::new(
            Status::InvalidSignature,
            "JWS payload does not match the credential",
        ));
    }
    Ok(jws.signing_input())
}
