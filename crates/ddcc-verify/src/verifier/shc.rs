//! SMART Health Cards (`shc:/`).

use ddcc_trust::Framework;
use serde_json::Value;

use super::{
    conclude, verify_signature, Accepted, CredentialFormat, FormatVerifier, Rejection, Trace,
    VerifierContext,
};
use crate::codec::{inflate_raw, numeric_decode, strip_prefix_ignore_case};
use crate::document::LogicalModel;
use crate::jws::CompactJws;
use crate::signature::{SignatureAlgorithm, SignatureError};
use crate::status::{Status, VerificationResult};

const PREFIX: &str = "shc:";

#[derive(Debug, Clone)]
pub struct ShcVerifier {
    context: VerifierContext,
}

impl ShcVerifier {
    pub fn new(context: VerifierContext) -> Self {
        Self { context }
    }

    fn run(&self, raw: &str, trace: &mut Trace) -> Result<Accepted, Rejection> {
        let token = transport_decode(raw)?;

        let jws = CompactJws::parse(&token)
            .map_err(|e| Rejection::new(Status::InvalidSigningFormat, e))?;
        let encoded = jws
            .payload()
            .map_err(|e| Rejection::new(Status::InvalidSigningFormat, e))?;
        let bytes = if jws.is_compressed() {
            inflate_raw(&encoded).map_err(|e| Rejection::new(Status::InvalidCompression, e))?
        } else if let Some(zip) = jws.header.zip.as_deref() {
            return Err(Rejection::new(
                Status::InvalidCompression,
                format!("unsupported zip {:?}", zip),
            ));
        } else {
            encoded
        };
        let payload: Value = serde_json::from_slice(&bytes)
            .map_err(|e| Rejection::new(Status::InvalidSigningFormat, e))?;
        trace.unpacked = Some(payload.to_string());

        let kid = jws
            .header
            .kid
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Rejection::new(Status::KidNotIncluded, "no kid in JWS header"))?;
        let iss = payload
            .get("iss")
            .and_then(Value::as_str)
            .filter(|i| !i.is_empty())
            .ok_or_else(|| Rejection::new(Status::KidNotIncluded, "no iss in payload"))?;
        let kid = format!("{}#{}", iss, kid);

        let issuer = self.context.trusted_issuer(Framework::Shc, &kid)?;

        let signature = jws
            .signature()
            .map_err(|e| Rejection::new(Status::InvalidSignature, e))?;
        let algorithm = jws
            .header
            .alg
            .as_deref()
            .ok_or_else(|| SignatureError::UnsupportedAlgorithm("none".to_string()))
            .and_then(SignatureAlgorithm::from_jose);
        verify_signature(algorithm, &issuer, &jws.signing_input(), &signature)?;

        self.context
            .accept(LogicalModel::new(CredentialFormat::Shc, payload), issuer)
    }
}

impl FormatVerifier for ShcVerifier {
    fn format(&self) -> CredentialFormat {
        CredentialFormat::Shc
    }

    fn unpack_and_verify(&self, raw: &str) -> VerificationResult {
        let mut trace = Trace::default();
        let outcome = self.run(raw, &mut trace);
        conclude(self.format(), raw, trace, outcome)
    }
}

/// `shc:/<digits>` back to the compact JWS text.
fn transport_decode(raw: &str) -> Result<String, Rejection> {
    let body = strip_prefix_ignore_case(raw.trim(), PREFIX)
        .ok_or_else(|| Rejection::new(Status::InvalidEncoding, "missing shc: prefix"))?;
    let body = body.strip_prefix('/').unwrap_or(body);
    if body.contains('/') {
        return Err(Rejection::new(
            Status::InvalidEncoding,
            "multi-chunk health cards are not supported",
        ));
    }
    numeric_decode(body).map_err(|e| Rejection::new(Status::InvalidEncoding, e))
}
