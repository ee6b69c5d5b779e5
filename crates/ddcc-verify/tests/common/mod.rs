//! Signed credential fixtures for integration tests.
//!
//! Every fixture is built with freshly generated keys and real signatures,
//! so a test controls exactly which key the registry trusts.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use ciborium::value::Value as Cbor;
use ddcc_trust::{
    PublicKey, Scope, StaticDocumentResolver, TrustConfig, TrustRegistry, TrustedEntity,
};
use ed25519_dalek::Signer as _;
use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::Compression;
use p256::pkcs8::EncodePublicKey;
use serde_json::{json, Value};
use x509_cert::der::asn1::{BitString, ObjectIdentifier, OctetString};
use x509_cert::der::{Decode, Encode};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::time::Validity;
use x509_cert::{Certificate, TbsCertificate, Version};

pub const PRODUCTION_DID: &str = "did:web:tng-cdn-uat.who.int:trustlist";

pub const SHC_ISSUER: &str = "https://spec.smarthealth.cards/examples/issuer";
pub const DIVOC_KID: &str = "did:india";

const ECDSA_WITH_SHA256: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");
const SUBJECT_KEY_IDENTIFIER: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.14");

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// P-256 signer producing raw `r || s` signatures.
pub struct EcSigner {
    key: p256::ecdsa::SigningKey,
}

impl EcSigner {
    pub fn generate() -> Self {
        Self {
            key: p256::ecdsa::SigningKey::random(&mut rand::thread_rng()),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::P256(*self.key.verifying_key())
    }

    pub fn verifying_key(&self) -> &p256::ecdsa::VerifyingKey {
        self.key.verifying_key()
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let signature: p256::ecdsa::Signature = self.key.sign(message);
        signature.to_bytes().to_vec()
    }

    /// Standard Base64 SubjectPublicKeyInfo, as published in trust lists.
    pub fn spki_base64(&self) -> String {
        let der = self.verifying_key().to_public_key_der().unwrap();
        STANDARD.encode(der.as_bytes())
    }
}

pub struct EdSigner {
    key: ed25519_dalek::SigningKey,
}

impl EdSigner {
    pub fn generate() -> Self {
        Self {
            key: ed25519_dalek::SigningKey::generate(&mut rand::thread_rng()),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::Ed25519(self.key.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.key.sign(message).to_bytes().to_vec()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

pub fn entity(public_key: PublicKey) -> TrustedEntity {
    TrustedEntity::new("Test issuer", Scope::Production, public_key)
}

/// Registry with `entries` pinned under the production key id of each kid.
pub fn registry(entries: Vec<(&str, TrustedEntity)>) -> Arc<TrustRegistry> {
    let mut registry = TrustRegistry::new(
        TrustConfig::default(),
        Arc::new(StaticDocumentResolver::new()),
    );
    for (kid, entity) in entries {
        let key_id = registry.candidate_key_ids(kid).remove(0);
        registry = registry.with_pinned(key_id, entity);
    }
    Arc::new(registry)
}

// ---------------------------------------------------------------------------
// HCERT
// ---------------------------------------------------------------------------

fn int(value: i64) -> Cbor {
    Cbor::Integer(value.into())
}

fn to_cbor_bytes(value: &Cbor) -> Vec<u8> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).unwrap();
    out
}

/// EU DCC payload for a completed two-dose vaccination.
pub fn eu_two_dose() -> Value {
    json!({
        "ver": "1.3.0",
        "nam": { "fn": "Musterfrau", "gn": "Gabriele", "fnt": "MUSTERFRAU", "gnt": "GABRIELE" },
        "dob": "1998-02-26",
        "v": [
            { "tg": "840539006", "vp": "1119349007", "mp": "EU/1/20/1528", "ma": "ORG-100030215",
              "dn": 1, "sd": 2, "dt": "2021-02-18", "co": "AT", "is": "Ministry of Health", "ci": "URN:UVCI:01:AT:10807843F94AEE0EE5093FBC254BD813#B" },
            { "tg": "840539006", "vp": "1119349007", "mp": "EU/1/20/1528", "ma": "ORG-100030215",
              "dn": 2, "sd": 2, "dt": "2021-03-12", "co": "AT", "is": "Ministry of Health", "ci": "URN:UVCI:01:AT:10807843F94AEE0EE5093FBC254BD813#B" }
        ]
    })
}

/// CWT claims wrapping an EU DCC.
pub fn cwt_claims(country: &str, dcc: &Value) -> Cbor {
    Cbor::Map(vec![
        (int(1), Cbor::Text(country.to_string())),
        (int(4), int(4_102_444_800)),
        (int(6), int(1_620_000_000)),
        (
            int(-260),
            Cbor::Map(vec![(int(1), Cbor::serialized(dcc).unwrap())]),
        ),
    ])
}

/// `HC1:` payload signed with ES256 over the COSE `Sig_structure`.
pub fn hcert(signer: &EcSigner, kid: &[u8], claims: &Cbor) -> String {
    let protected = to_cbor_bytes(&Cbor::Map(vec![
        (int(1), int(-7)),
        (int(4), Cbor::Bytes(kid.to_vec())),
    ]));
    let payload = to_cbor_bytes(claims);
    let signature = signer.sign(&sig_structure(&protected, &payload));
    hcert_from_parts(protected, payload, signature)
}

pub fn sig_structure(protected: &[u8], payload: &[u8]) -> Vec<u8> {
    to_cbor_bytes(&Cbor::Array(vec![
        Cbor::Text("Signature1".to_string()),
        Cbor::Bytes(protected.to_vec()),
        Cbor::Bytes(Vec::new()),
        Cbor::Bytes(payload.to_vec()),
    ]))
}

/// Assemble a tagged COSE_Sign1, zlib it and Base45 it.
pub fn hcert_from_parts(protected: Vec<u8>, payload: Vec<u8>, signature: Vec<u8>) -> String {
    let message = Cbor::Tag(
        18,
        Box::new(Cbor::Array(vec![
            Cbor::Bytes(protected),
            Cbor::Map(Vec::new()),
            Cbor::Bytes(payload),
            Cbor::Bytes(signature),
        ])),
    );
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&to_cbor_bytes(&message)).unwrap();
    let compressed = encoder.finish().unwrap();
    format!("HC1:{}", base45::encode(compressed))
}

// ---------------------------------------------------------------------------
// SMART Health Cards
// ---------------------------------------------------------------------------

pub fn shc_payload() -> Value {
    json!({
        "iss": SHC_ISSUER,
        "nbf": 1_620_847_989,
        "vc": {
            "type": ["https://smarthealth.cards#health-card", "https://smarthealth.cards#immunization"],
            "credentialSubject": {
                "fhirVersion": "4.0.1",
                "fhirBundle": {
                    "resourceType": "Bundle",
                    "type": "collection",
                    "entry": [
                        { "fullUrl": "resource:0", "resource": { "resourceType": "Patient",
                            "name": [{ "family": "Anyperson", "given": ["John", "B."] }], "birthDate": "1951-01-20" } },
                        { "fullUrl": "resource:1", "resource": { "resourceType": "Immunization", "status": "completed",
                            "vaccineCode": { "coding": [{ "system": "http://hl7.org/fhir/sid/cvx", "code": "207" }] },
                            "patient": { "reference": "resource:0" }, "occurrenceDateTime": "2021-01-01",
                            "performer": [{ "actor": { "display": "ABC General Hospital" } }], "lotNumber": "0000001" } },
                        { "fullUrl": "resource:2", "resource": { "resourceType": "Immunization", "status": "completed",
                            "vaccineCode": { "coding": [{ "system": "http://hl7.org/fhir/sid/cvx", "code": "207" }] },
                            "patient": { "reference": "resource:0" }, "occurrenceDateTime": "2021-01-29",
                            "performer": [{ "actor": { "display": "ABC General Hospital" } }], "lotNumber": "0000007" } }
                    ]
                }
            }
        }
    })
}

/// Compact JWS with a raw-DEFLATE payload.
pub fn shc_jws(signer: &EcSigner, kid: &str, payload: &Value) -> String {
    let header = json!({ "alg": "ES256", "zip": "DEF", "kid": kid });
    let header_b64 = URL_SAFE_NO_PAD.encode(header.to_string());

    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload.to_string().as_bytes()).unwrap();
    let payload_b64 = URL_SAFE_NO_PAD.encode(encoder.finish().unwrap());

    let signing_input = format!("{}.{}", header_b64, payload_b64);
    let signature_b64 = URL_SAFE_NO_PAD.encode(signer.sign(signing_input.as_bytes()));
    format!("{}.{}", signing_input, signature_b64)
}

/// `shc:/` numeric encoding of a JWS.
pub fn shc_numeric(jws: &str) -> String {
    let digits: String = jws.bytes().map(|b| format!("{:02}", b - 45)).collect();
    format!("shc:/{}", digits)
}

pub fn shc(signer: &EcSigner, kid: &str, payload: &Value) -> String {
    shc_numeric(&shc_jws(signer, kid, payload))
}

// ---------------------------------------------------------------------------
// DIVOC
// ---------------------------------------------------------------------------

/// DIVOC credential without its proof.
pub fn divoc_credential() -> Value {
    json!({
        "@context": ["https://www.w3.org/2018/credentials/v1", "https://cowin.gov.in/credentials/vaccination/v1"],
        "type": ["VerifiableCredential", "ProofOfVaccinationCredential"],
        "credentialSubject": {
            "type": "Person",
            "id": "did:Passport:Dummy256",
            "refId": "12346",
            "name": "Bhaya Mitra",
            "gender": "Male",
            "age": "27",
            "nationality": "Indian",
            "address": { "streetAddress": "", "addressLocality": "", "addressRegion": "", "addressCountry": "IN", "postalCode": "" }
        },
        "issuer": "https://cowin.gov.in/",
        "issuanceDate": "2021-01-15T17:21:13.117Z",
        "evidence": [{
            "id": "https://cowin.gov.in/vaccine/undefined",
            "feedbackUrl": "https://cowin.gov.in/?undefined",
            "infoUrl": "https://cowin.gov.in/?undefined",
            "type": ["Vaccination"],
            "batch": "MB3428BX",
            "vaccine": "CoVax",
            "manufacturer": "COVPharma",
            "date": "2020-12-02T19:21:18.646Z",
            "effectiveStart": "2020-12-02",
            "effectiveUntil": "2025-12-02",
            "dose": 1,
            "totalDoses": 2,
            "verifier": { "name": "Sooraj Singh" },
            "facility": {
                "name": "ABC Medical Center",
                "address": { "streetAddress": "123, Koramangala", "addressLocality": "Bengaluru", "addressRegion": "Karnataka", "addressCountry": "IN", "postalCode": "" }
            }
        }]
    })
}

/// Attach an Ed25519 detached-JWS proof over the canonical credential.
pub fn divoc_signed(signer: &EdSigner, credential: &Value) -> Value {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"EdDSA","b64":false,"crit":["b64"]}"#);
    let mut signing_input = format!("{}.", header).into_bytes();
    signing_input.extend(serde_jcs::to_vec(credential).unwrap());
    let signature = URL_SAFE_NO_PAD.encode(signer.sign(&signing_input));

    let mut signed = credential.clone();
    signed["proof"] = json!({
        "type": "Ed25519Signature2018",
        "created": "2021-01-15T17:21:13Z",
        "verificationMethod": DIVOC_KID,
        "proofPurpose": "assertionMethod",
        "jws": format!("{}..{}", header, signature),
    });
    signed
}

pub fn divoc_b64(signed: &Value) -> String {
    format!("B64:{}", STANDARD.encode(signed.to_string()))
}

/// A ZIP archive holding `certificate.json`, rendered as Latin-1 text the
/// way a QR scanner returns binary content.
pub fn divoc_zip(signed: &Value) -> String {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("certificate.json", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(signed.to_string().as_bytes()).unwrap();
    let bytes = writer.finish().unwrap().into_inner();
    bytes.into_iter().map(char::from).collect()
}

// ---------------------------------------------------------------------------
// ICAO VDS-NC
// ---------------------------------------------------------------------------

/// Minimal document signer certificate. Only the subject and SKI matter to
/// the verifier; the certificate signature is a placeholder.
pub fn certificate_der(
    key: &p256::ecdsa::VerifyingKey,
    country: Option<&str>,
    subject_key_identifier: Option<&[u8]>,
) -> Vec<u8> {
    let spki_der = key.to_public_key_der().unwrap();
    let spki = SubjectPublicKeyInfoOwned::from_der(spki_der.as_bytes()).unwrap();
    let algorithm = AlgorithmIdentifierOwned {
        oid: ECDSA_WITH_SHA256,
        parameters: None,
    };
    let subject = match country {
        Some(country) => format!("CN=Test DSC,C={}", country),
        None => "CN=Test DSC".to_string(),
    };
    let extensions = subject_key_identifier.map(|ski| {
        let value = OctetString::new(ski).unwrap().to_der().unwrap();
        vec![Extension {
            extn_id: SUBJECT_KEY_IDENTIFIER,
            critical: false,
            extn_value: OctetString::new(value).unwrap(),
        }]
    });

    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&[0x01, 0x02]).unwrap(),
        signature: algorithm.clone(),
        issuer: Name::from_str("CN=Test CSCA,C=UT").unwrap(),
        validity: Validity::from_now(Duration::from_secs(365 * 24 * 3600)).unwrap(),
        subject: Name::from_str(&subject).unwrap(),
        subject_public_key_info: spki,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions,
    };
    Certificate {
        tbs_certificate,
        signature_algorithm: algorithm,
        signature: BitString::from_bytes(&[0u8; 8]).unwrap(),
    }
    .to_der()
    .unwrap()
}

pub fn icao_data() -> Value {
    json!({
        "hdr": { "t": "icao.vacc", "v": 1, "is": "UTO" },
        "msg": {
            "uvci": "U32870",
            "pid": { "n": "Smith Bill", "dob": "1990-01-02", "sex": "M", "i": "A1234567Z", "ai": "L4567890Z" },
            "ve": [{
                "des": "XM68M6",
                "nam": "Comirnaty",
                "dis": "RA01.0",
                "vd": [
                    { "dvc": "2021-03-03", "seq": 1, "ctr": "UTO", "adm": "RIVM", "lot": "VC35679", "dvn": "2021-03-24" },
                    { "dvc": "2021-03-24", "seq": 2, "ctr": "UTO", "adm": "RIVM", "lot": "VC87540" }
                ]
            }]
        }
    })
}

/// VDS-NC seal signing the canonical form of `data`.
pub fn icao(signer: &EcSigner, certificate: &[u8], data: &Value) -> String {
    let signature = signer.sign(&serde_jcs::to_vec(data).unwrap());
    json!({
        "data": data,
        "sig": {
            "alg": "ES256",
            "cer": URL_SAFE_NO_PAD.encode(certificate),
            "sigvl": URL_SAFE_NO_PAD.encode(signature),
        }
    })
    .to_string()
}

/// Kid the ICAO verifier derives for a certificate.
pub fn icao_kid(country: &str, subject_key_identifier: &[u8]) -> String {
    format!("{}#{}", country, STANDARD.encode(subject_key_identifier))
}
