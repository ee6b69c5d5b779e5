//! ICAO Visible Digital Seal for Non-Constrained environments (VDS-NC).

use ddcc_trust::Framework;
use serde_json::Value;
use x509_cert::der::asn1::{ObjectIdentifier, OctetString};
use x509_cert::der::Decode;
use x509_cert::Certificate;

use super::{
    conclude, verify_signature, Accepted, CredentialFormat, FormatVerifier, Rejection, Trace,
    VerifierContext,
};
use crate::codec::{base64_encode, base64url_decode};
use crate::document::LogicalModel;
use crate::signature::{SignatureAlgorithm, SignatureError};
use crate::status::{Status, VerificationResult};

/// `id-at-countryName`.
const COUNTRY_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");

/// `id-ce-subjectKeyIdentifier`.
const SUBJECT_KEY_IDENTIFIER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.14");

#[derive(Debug, Clone)]
pub struct IcaoVerifier {
    context: VerifierContext,
}

impl IcaoVerifier {
    pub fn new(context: VerifierContext) -> Self {
        Self { context }
    }

    fn run(&self, raw: &str, trace: &mut Trace) -> Result<Accepted, Rejection> {
        let seal: Value = serde_json::from_str(raw.trim())
            .map_err(|e| Rejection::new(Status::InvalidEncoding, e))?;
        trace.unpacked = Some(seal.to_string());

        let data = seal
            .get("data")
            .filter(|d| d.is_object())
            .ok_or_else(|| Rejection::new(Status::InvalidSigningFormat, "seal has no data"))?;
        let sig = seal
            .get("sig")
            .filter(|s| s.is_object())
            .ok_or_else(|| Rejection::new(Status::InvalidSigningFormat, "seal has no sig"))?;
        let certificate_b64 = sig_field(sig, "cer")?;
        let signature_b64 = sig_field(sig, "sigvl")?;

        let der = base64url_decode(certificate_b64)
            .map_err(|e| Rejection::new(Status::InvalidSigningFormat, e))?;
        let certificate = Certificate::from_der(&der)
            .map_err(|e| Rejection::new(Status::InvalidSigningFormat, e))?;
        let country = subject_country(&certificate);
        trace.country = country.clone();

        let country = country.ok_or_else(|| {
            Rejection::new(Status::KidNotIncluded, "certificate subject has no country")
        })?;
        let key_identifier = subject_key_identifier(&certificate).ok_or_else(|| {
            Rejection::new(Status::KidNotIncluded, "certificate has no subject key identifier")
        })?;
        let kid = format!("{}#{}", country, base64_encode(&key_identifier));

        let issuer = self.context.trusted_issuer(Framework::Icao, &kid)?;

        let signed = serde_jcs::to_vec(data)
            .map_err(|e| Rejection::new(Status::InvalidSignature, e))?;
        let signature = base64url_decode(signature_b64)
            .map_err(|e| Rejection::new(Status::InvalidSignature, e))?;
        let algorithm = sig
            .get("alg")
            .and_then(Value::as_str)
            .ok_or_else(|| SignatureError::UnsupportedAlgorithm("none".to_string()))
            .and_then(SignatureAlgorithm::from_jose);
        verify_signature(algorithm, &issuer, &signed, &signature)?;

        self.context
            .accept(LogicalModel::new(CredentialFormat::Icao, seal), issuer)
    }
}

impl FormatVerifier for IcaoVerifier {
    fn format(&self) -> CredentialFormat {
        CredentialFormat::Icao
    }

    fn unpack_and_verify(&self, raw: &str) -> VerificationResult {
        let mut trace = Trace::default();
        let outcome = self.run(raw, &mut trace);
        conclude(self.format(), raw, trace, outcome)
    }
}

fn sig_field<'a>(sig: &'a Value, name: &str) -> Result<&'a str, Rejection> {
    sig.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| Rejection::new(Status::InvalidSigningFormat, format!("sig has no {}", name)))
}

/// First `C=` attribute of the certificate subject.
pub fn subject_country(certificate: &Certificate) -> Option<String> {
    certificate
        .tbs_certificate
        .subject
        .0
        .iter()
        .flat_map(|rdn| rdn.0.iter())
        .find(|attribute| attribute.oid == COUNTRY_NAME)
        .and_then(|attribute| std::str::from_utf8(attribute.value.value()).ok())
        .filter(|country| !country.is_empty())
        .map(str::to_string)
}

/// Raw bytes of the subject key identifier extension.
pub fn subject_key_identifier(certificate: &Certificate) -> Option<Vec<u8>> {
    let extension = certificate
        .tbs_certificate
        .extensions
        .as_ref()?
        .iter()
        .find(|extension| extension.extn_id == SUBJECT_KEY_IDENTIFIER)?;
    let identifier = OctetString::from_der(extension.extn_value.as_bytes()).ok()?;
    Some(identifier.as_bytes().to_vec()).filter(|bytes| !bytes.is_empty())
}
