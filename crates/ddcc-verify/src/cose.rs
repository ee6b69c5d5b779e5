//! COSE_Sign1 envelopes (RFC 9052) as used by HCERT.

use ciborium::value::Value as Cbor;
use serde_json::{Map, Number, Value};

use crate::codec::base64_encode;

/// CBOR tag of a COSE_Sign1 message.
pub const COSE_SIGN1_TAG: u64 = 18;

/// Header label of the signature algorithm.
pub const HEADER_ALG: i64 = 1;

/// Header label of the key identifier.
pub const HEADER_KID: i64 = 4;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoseError {
    #[error("invalid CBOR: {0}")]
    Cbor(String),

    #[error("not a COSE_Sign1 message: {0}")]
    Structure(String),
}

type HeaderMap = Vec<(Cbor, Cbor)>;

/// A parsed `COSE_Sign1` message.
#[derive(Debug, Clone)]
pub struct CoseSign1 {
    /// Serialized protected header, exactly as signed.
    pub protected_bytes: Vec<u8>,
    protected: HeaderMap,
    unprotected: HeaderMap,
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl CoseSign1 {
    /// Parse a (optionally tagged) COSE_Sign1 message.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CoseError> {
        let value: Cbor =
            ciborium::de::from_reader(bytes).map_err(|e| CoseError::Cbor(e.to_string()))?;

        let value = match value {
            Cbor::Tag(COSE_SIGN1_TAG, inner) => *inner,
            Cbor::Tag(tag, _) => {
                return Err(CoseError::Structure(format!("unexpected tag {}", tag)));
            }
            other => other,
        };

        let Cbor::Array(items) = value else {
            return Err(CoseError::Structure("expected an array".to_string()));
        };
        let [protected, unprotected, payload, signature]: [Cbor; 4] =
            items.try_into().map_err(|items: Vec<Cbor>| {
                CoseError::Structure(format!("expected 4 elements, got {}", items.len()))
            })?;

        let protected_bytes = into_bytes(protected, "protected header")?;
        let protected = if protected_bytes.is_empty() {
            Vec::new()
        } else {
            let decoded: Cbor = ciborium::de::from_reader(protected_bytes.as_slice())
                .map_err(|e| CoseError::Cbor(format!("protected header: {}", e)))?;
            into_map(decoded, "protected header")?
        };
        let unprotected = into_map(unprotected, "unprotected header")?;

        Ok(Self {
            protected_bytes,
            protected,
            unprotected,
            payload: into_bytes(payload, "payload")?,
            signature: into_bytes(signature, "signature")?,
        })
    }

    /// Header value, protected bucket first.
    pub fn header(&self, label: i64) -> Option<&Cbor> {
        find_label(&self.protected, label).or_else(|| find_label(&self.unprotected, label))
    }

    /// COSE algorithm identifier.
    pub fn algorithm(&self) -> Option<i64> {
        match self.header(HEADER_ALG)? {
            Cbor::Integer(i) => i64::try_from(i128::from(*i)).ok(),
            _ => None,
        }
    }

    /// Raw key identifier bytes.
    pub fn kid(&self) -> Option<Vec<u8>> {
        match self.header(HEADER_KID)? {
            Cbor::Bytes(bytes) => Some(bytes.clone()),
            Cbor::Text(text) => Some(text.as_bytes().to_vec()),
            _ => None,
        }
    }

    /// `Sig_structure` for a single signer:
    /// `["Signature1", protected, external_aad = h'', payload]`.
    pub fn signed_bytes(&self) -> Result<Vec<u8>, CoseError> {
        let structure = Cbor::Array(vec![
            Cbor::Text("Signature1".to_string()),
            Cbor::Bytes(self.protected_bytes.clone()),
            Cbor::Bytes(Vec::new()),
            Cbor::Bytes(self.payload.clone()),
        ]);
        let mut out = Vec::new();
        ciborium::ser::into_writer(&structure, &mut out)
            .map_err(|e| CoseError::Cbor(e.to_string()))?;
        Ok(out)
    }

    /// Payload decoded as CBOR.
    pub fn payload_value(&self) -> Result<Cbor, CoseError> {
        ciborium::de::from_reader(self.payload.as_slice())
            .map_err(|e| CoseError::Cbor(format!("payload: {}", e)))
    }
}

fn into_bytes(value: Cbor, what: &str) -> Result<Vec<u8>, CoseError> {
    match value {
        Cbor::Bytes(bytes) => Ok(bytes),
        _ => Err(CoseError::Structure(format!("{} is not a byte string", what))),
    }
}

fn into_map(value: Cbor, what: &str) -> Result<HeaderMap, CoseError> {
    match value {
        Cbor::Map(entries) => Ok(entries),
        _ => Err(CoseError::Structure(format!("{} is not a map", what))),
    }
}

fn find_label(map: &HeaderMap, label: i64) -> Option<&Cbor> {
    map.iter().find_map(|(key, value)| match key {
        Cbor::Integer(i) if i128::from(*i) == i128::from(label) => Some(value),
        _ => None,
    })
}

/// Look up an integer-keyed entry of a CBOR map.
pub fn map_get(value: &Cbor, label: i64) -> Option<&Cbor> {
    match value {
        Cbor::Map(entries) => find_label(entries, label),
        _ => None,
    }
}

/// Convert CBOR to JSON.
///
/// Map keys become strings (`-260`, `1`, ...), byte strings become
/// standard Base64 and tags are dropped in favour of their content.
pub fn cbor_to_json(value: &Cbor) -> Value {
    match value {
        Cbor::Integer(i) => {
            let n = i128::from(*i);
            if let Ok(v) = i64::try_from(n) {
                Value::from(v)
            } else if let Ok(v) = u64::try_from(n) {
                Value::from(v)
            } else {
                Value::String(n.to_string())
            }
        }
        Cbor::Bytes(bytes) => Value::String(base64_encode(bytes)),
        Cbor::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Cbor::Text(text) => Value::String(text.clone()),
        Cbor::Bool(b) => Value::Bool(*b),
        Cbor::Tag(_, inner) => cbor_to_json(inner),
        Cbor::Array(items) => Value::Array(items.iter().map(cbor_to_json).collect()),
        Cbor::Map(entries) => {
            let object: Map<String, Value> = entries
                .iter()
                .map(|(key, value)| (key_string(key), cbor_to_json(value)))
                .collect();
            Value::Object(object)
        }
        _ => Value::Null,
    }
}

fn key_string(key: &Cbor) -> String {
    match key {
        Cbor::Text(text) => text.clone(),
        Cbor::Integer(i) => i128::from(*i).to_string(),
        other => cbor_to_json(other).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Cbor {
        Cbor::Integer(i.into())
    }

    fn text(s: &str) -> Cbor {
        Cbor::Text(s.to_string())
    }

    fn map(entries: Vec<(Cbor, Cbor)>) -> Cbor {
        Cbor::Map(entries)
    }

    fn to_vec(value: &Cbor) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(value, &mut out).unwrap();
        out
    }

    fn sign1(protected: Cbor, unprotected: Cbor, tagged: bool) -> Vec<u8> {
        let message = Cbor::Array(vec![
            Cbor::Bytes(to_vec(&protected)),
            unprotected,
            Cbor::Bytes(to_vec(&map(vec![(int(1), text("DE"))]))),
            Cbor::Bytes(vec![7; 64]),
        ]);
        if tagged {
            to_vec(&Cbor::Tag(COSE_SIGN1_TAG, Box::new(message)))
        } else {
            to_vec(&message)
        }
    }

    #[test]
    fn test_parse_tagged_message() {
        let protected = map(vec![(int(1), int(-7)), (int(4), Cbor::Bytes(vec![1, 2, 3]))]);
        let bytes = sign1(protected, map(vec![]), true);

        let message = CoseSign1::from_slice(&bytes).unwrap();
        assert_eq!(message.algorithm(), Some(-7));
        assert_eq!(message.kid(), Some(vec![1, 2, 3]));
        assert_eq!(message.signature.len(), 64);

        let payload = cbor_to_json(&message.payload_value().unwrap());
        assert_eq!(payload, serde_json::json!({ "1": "DE" }));
    }

    #[test]
    fn test_kid_from_unprotected_header() {
        let protected = map(vec![(int(1), int(-8))]);
        let unprotected = map(vec![(int(4), Cbor::Bytes(b"kid".to_vec()))]);
        let message = CoseSign1::from_slice(&sign1(protected, unprotected, false)).unwrap();

        assert_eq!(message.algorithm(), Some(-8));
        assert_eq!(message.kid(), Some(b"kid".to_vec()));
    }

    #[test]
    fn test_protected_kid_wins() {
        let protected = map(vec![
            (int(1), int(-7)),
            (int(4), Cbor::Bytes(b"protected".to_vec())),
        ]);
        let unprotected = map(vec![(int(4), Cbor::Bytes(b"unprotected".to_vec()))]);
        let message = CoseSign1::from_slice(&sign1(protected, unprotected, true)).unwrap();

        assert_eq!(message.kid(), Some(b"protected".to_vec()));
    }

    #[test]
    fn test_signed_bytes_layout() {
        let protected = map(vec![(int(1), int(-7))]);
        let message = CoseSign1::from_slice(&sign1(protected, map(vec![]), true)).unwrap();

        let decoded: Cbor =
            ciborium::de::from_reader(message.signed_bytes().unwrap().as_slice()).unwrap();
        let Cbor::Array(items) = decoded else {
            panic!("expected array");
        };
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], text("Signature1"));
        assert_eq!(items[1], Cbor::Bytes(message.protected_bytes.clone()));
        assert_eq!(items[2], Cbor::Bytes(Vec::new()));
        assert_eq!(items[3], Cbor::Bytes(message.payload.clone()));
    }

    #[test]
    fn test_rejects_wrong_shapes() {
        assert!(matches!(
            CoseSign1::from_slice(&[0xff, 0x00]),
            Err(CoseError::Cbor(_))
        ));
        assert!(matches!(
            CoseSign1::from_slice(&to_vec(&Cbor::Array(vec![int(1), int(2), int(3)]))),
            Err(CoseError::Structure(_))
        ));
        assert!(matches!(
            CoseSign1::from_slice(&to_vec(&Cbor::Tag(98, Box::new(Cbor::Array(vec![]))))),
            Err(CoseError::Structure(_))
        ));
    }

    #[test]
    fn test_cbor_to_json_keys_and_bytes() {
        let vaccination = map(vec![(text("v"), Cbor::Array(vec![map(vec![(text("dn"), int(2))])]))]);
        let value = map(vec![
            (int(-260), map(vec![(int(1), vaccination)])),
            (text("b"), Cbor::Bytes(vec![0xde, 0xad])),
        ]);

        assert_eq!(
            cbor_to_json(&value),
            serde_json::json!({ "-260": { "1": { "v": [ { "dn": 2 } ] } }, "b": "3q0=" })
        );
        assert_eq!(
            map_get(&value, -260).map(cbor_to_json),
            Some(serde_json::json!({ "1": { "v": [ { "dn": 2 } ] } }))
        );
    }
}
