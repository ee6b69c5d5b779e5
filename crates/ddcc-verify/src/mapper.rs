//! Default logical-model → document mapper.
//!
//! Every format is first reduced to a patient plus a list of clinical
//! resources (immunizations, test and recovery observations); the same
//! assembly step then links them to the patient and prepends a
//! `Composition` listing them.

use serde_json::{json, Map, Value};

use crate::document::{CanonicalDocument, DocumentMapper, LogicalModel, MapError};
use crate::verifier::CredentialFormat;

const LOINC: &str = "http://loinc.org";
const ICD11: &str = "http://id.who.int/icd11/mms";
const EU_VALUE_SETS: &str = "https://ec.europa.eu/health/ehealth/covid-19";
const COUNTRY_EXTENSION: &str =
    "http://worldhealthorganization.github.io/ddcc/StructureDefinition/DDCCCountryOfEvent";
const BRAND_EXTENSION: &str =
    "http://worldhealthorganization.github.io/ddcc/StructureDefinition/DDCCVaccineBrand";

const PATIENT_URL: &str = "urn:ddcc:patient";
const COMPOSITION_URL: &str = "urn:ddcc:composition";

/// Maps HCERT (WHO and EU), SMART Health Card, DIVOC and ICAO payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct DdccMapper;

impl DdccMapper {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentMapper for DdccMapper {
    fn map(&self, model: &LogicalModel) -> Result<CanonicalDocument, MapError> {
        let extracted = match model.format {
            CredentialFormat::Hcert => hcert(&model.payload)?,
            CredentialFormat::Shc => shc(&model.payload)?,
            CredentialFormat::Divoc => divoc(&model.payload)?,
            CredentialFormat::Icao => icao(&model.payload)?,
        };
        Ok(assemble(model.format, extracted))
    }
}

/// Format-independent content of a credential.
#[derive(Debug, Default)]
struct Extracted {
    patient: Map<String, Value>,
    clinical: Vec<Value>,
    certificate_id: Option<String>,
    issuer: Option<String>,
}

#[derive(Debug, Default)]
struct Dose {
    vaccine: Option<Value>,
    brand: Option<Value>,
    manufacturer: Option<String>,
    date: Option<String>,
    dose_number: Option<u64>,
    total_doses: Option<u64>,
    lot: Option<String>,
    country: Option<String>,
    centre: Option<String>,
}

impl Dose {
    fn into_immunization(self) -> Value {
        let mut resource = Map::new();
        resource.insert("resourceType".into(), json!("Immunization"));
        resource.insert("status".into(), json!("completed"));
        resource.insert(
            "vaccineCode".into(),
            self.vaccine.unwrap_or_else(|| json!({ "text": "unknown" })),
        );
        insert_opt(&mut resource, "occurrenceDateTime", self.date.map(Value::from));
        insert_opt(&mut resource, "lotNumber", self.lot.map(Value::from));
        insert_opt(
            &mut resource,
            "location",
            self.centre.map(|c| json!({ "display": c })),
        );
        insert_opt(
            &mut resource,
            "manufacturer",
            self.manufacturer.map(|m| json!({ "display": m })),
        );

        let mut extensions = Vec::new();
        if let Some(brand) = self.brand {
            extensions.push(json!({ "url": BRAND_EXTENSION, "valueCodeableConcept": brand }));
        }
        if let Some(country) = self.country {
            extensions.push(json!({ "url": COUNTRY_EXTENSION, "valueCode": country }));
        }
        if !extensions.is_empty() {
            resource.insert("extension".into(), Value::Array(extensions));
        }

        let mut protocol = Map::new();
        insert_opt(&mut protocol, "doseNumberPositiveInt", self.dose_number.map(Value::from));
        insert_opt(&mut protocol, "seriesDosesPositiveInt", self.total_doses.map(Value::from));
        if !protocol.is_empty() {
            resource.insert("protocolApplied".into(), json!([protocol]));
        }
        Value::Object(resource)
    }
}

fn assemble(format: CredentialFormat, extracted: Extracted) -> CanonicalDocument {
    let Extracted {
        mut patient,
        clinical,
        certificate_id,
        issuer,
    } = extracted;
    patient.insert("resourceType".into(), json!("Patient"));

    let mut linked = Vec::with_capacity(clinical.len());
    let mut counters: Vec<(String, usize)> = Vec::new();
    for mut resource in clinical {
        let kind = resource
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or("Resource")
            .to_string();
        let index = match counters.iter_mut().find(|(k, _)| *k == kind) {
            Some((_, n)) => {
                *n += 1;
                *n
            }
            None => {
                counters.push((kind.clone(), 1));
                1
            }
        };
        let reference_field = if kind == "Immunization" { "patient" } else { "subject" };
        if let Some(object) = resource.as_object_mut() {
            object.insert(reference_field.into(), json!({ "reference": PATIENT_URL }));
        }
        let url = format!("urn:ddcc:{}:{}", kind.to_lowercase(), index);
        linked.push((url, resource));
    }

    let mut composition = json!({
        "resourceType": "Composition",
        "status": "final",
        "type": {
            "coding": [{ "system": LOINC, "code": "82593-5", "display": "Immunization summary report" }]
        },
        "subject": { "reference": PATIENT_URL },
        "title": "International Certificate of Vaccination or Prophylaxis",
        "category": [{ "coding": [{ "code": format.as_str() }] }],
        "section": [{
            "code": {
                "coding": [{ "system": LOINC, "code": "11369-6", "display": "History of Immunization Narrative" }]
            },
            "entry": linked.iter().map(|(url, _)| json!({ "reference": url })).collect::<Vec<_>>(),
        }],
    });
    if let Some(object) = composition.as_object_mut() {
        if let Some(id) = certificate_id {
            object.insert("identifier".into(), json!({ "value": id }));
        }
        if let Some(issuer) = issuer {
            object.insert("author".into(), json!([{ "display": issuer }]));
        }
    }

    let mut document = CanonicalDocument::new(COMPOSITION_URL, composition);
    document.push(PATIENT_URL, Value::Object(patient));
    for (url, resource) in linked {
        document.push(url, resource);
    }
    document
}

// HCERT: CWT claims with either the WHO (-255) or EU (-260 / 1) model.
fn hcert(payload: &Value) -> Result<Extracted, MapError> {
    let issuer = text_at(payload, &["1"]);
    if let Some(who) = payload.get("-255").filter(|v| v.is_object()) {
        let mut extracted = who_model(who);
        extracted.issuer = extracted.issuer.or(issuer);
        return Ok(extracted);
    }
    if let Some(eu) = at(payload, &["-260", "1"]).filter(|v| v.is_object()) {
        let mut extracted = eu_model(eu);
        extracted.issuer = extracted.issuer.or(issuer);
        return Ok(extracted);
    }
    Err(MapError::Missing("HCERT claim (-255 or -260)"))
}

fn who_model(model: &Value) -> Extracted {
    let mut patient = Map::new();
    insert_opt(&mut patient, "name", text_at(model, &["name"]).map(human_name));
    insert_opt(&mut patient, "birthDate", text_at(model, &["birthDate"]).map(Value::from));
    insert_opt(&mut patient, "gender", text_at(model, &["sex"]).map(Value::from));
    insert_opt(
        &mut patient,
        "identifier",
        text_at(model, &["identifier"]).map(|id| json!([{ "value": id }])),
    );

    let clinical = model
        .get("vaccination")
        .map(|v| {
            vec![Dose {
                vaccine: v.get("vaccine").and_then(concept_from_coding),
                brand: v.get("brand").and_then(concept_from_coding),
                manufacturer: text_at(v, &["manufacturer", "code"])
                    .or_else(|| text_at(v, &["manufacturer"])),
                date: text_at(v, &["date"]),
                dose_number: u64_at(v, &["dose"]),
                total_doses: u64_at(v, &["totalDoses"]),
                lot: text_at(v, &["lot"]),
                country: text_at(v, &["country", "code"]).or_else(|| text_at(v, &["country"])),
                centre: text_at(v, &["centre"]),
            }
            .into_immunization()]
        })
        .unwrap_or_default();

    Extracted {
        patient,
        clinical,
        certificate_id: text_at(model, &["certificate", "hcid"]),
        issuer: text_at(model, &["certificate", "issuer", "identifier"]),
    }
}

fn eu_model(model: &Value) -> Extracted {
    let given = text_at(model, &["nam", "gn"]).or_else(|| text_at(model, &["nam", "gnt"]));
    let family = text_at(model, &["nam", "fn"]).or_else(|| text_at(model, &["nam", "fnt"]));
    let mut patient = Map::new();
    if given.is_some() || family.is_some() {
        let text = [given.as_deref(), family.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        let mut name = Map::new();
        name.insert("text".into(), json!(text));
        insert_opt(&mut name, "family", family.map(Value::from));
        insert_opt(&mut name, "given", given.map(|g| json!([g])));
        patient.insert("name".into(), json!([name]));
    }
    insert_opt(&mut patient, "birthDate", text_at(model, &["dob"]).map(Value::from));

    let mut clinical = Vec::new();
    let mut certificate_id = None;
    let mut issuer = None;
    let mut note_certificate = |entry: &Value| {
        certificate_id = certificate_id.take().or_else(|| text_at(entry, &["ci"]));
        issuer = issuer.take().or_else(|| text_at(entry, &["is"]));
    };

    for v in array_at(model, "v") {
        note_certificate(v);
        clinical.push(
            Dose {
                vaccine: text_at(v, &["vp"]).map(|c| concept(EU_VALUE_SETS, &c)),
                brand: text_at(v, &["mp"]).map(|c| concept(EU_VALUE_SETS, &c)),
                manufacturer: text_at(v, &["ma"]),
                date: text_at(v, &["dt"]),
                dose_number: u64_at(v, &["dn"]),
                total_doses: u64_at(v, &["sd"]),
                lot: None,
                country: text_at(v, &["co"]),
                centre: None,
            }
            .into_immunization(),
        );
    }
    for t in array_at(model, "t") {
        note_certificate(t);
        let mut observation = observation("test", text_at(t, &["tt"]));
        insert_opt(&mut observation, "effectiveDateTime", text_at(t, &["sc"]).map(Value::from));
        insert_opt(
            &mut observation,
            "valueCodeableConcept",
            text_at(t, &["tr"]).map(|c| concept(EU_VALUE_SETS, &c)),
        );
        insert_opt(
            &mut observation,
            "performer",
            text_at(t, &["tc"]).map(|c| json!([{ "display": c }])),
        );
        clinical.push(Value::Object(observation));
    }
    for r in array_at(model, "r") {
        note_certificate(r);
        let mut observation = observation("recovery", text_at(r, &["tg"]));
        insert_opt(&mut observation, "effectiveDateTime", text_at(r, &["fr"]).map(Value::from));
        let mut period = Map::new();
        insert_opt(&mut period, "start", text_at(r, &["df"]).map(Value::from));
        insert_opt(&mut period, "end", text_at(r, &["du"]).map(Value::from));
        if !period.is_empty() {
            observation.insert("valuePeriod".into(), Value::Object(period));
        }
        clinical.push(Value::Object(observation));
    }

    Extracted {
        patient,
        clinical,
        certificate_id,
        issuer,
    }
}

// SMART Health Card: the payload already carries FHIR resources.
fn shc(payload: &Value) -> Result<Extracted, MapError> {
    let entries = at(payload, &["vc", "credentialSubject", "fhirBundle", "entry"])
        .and_then(Value::as_array)
        .ok_or(MapError::Missing("vc.credentialSubject.fhirBundle.entry"))?;

    let mut patient = None;
    let mut clinical = Vec::new();
    for resource in entries.iter().filter_map(|e| e.get("resource")) {
        match resource.get("resourceType").and_then(Value::as_str) {
            Some("Patient") if patient.is_none() => {
                patient = resource.as_object().cloned();
            }
            Some(_) => clinical.push(resource.clone()),
            None => {
                return Err(MapError::Shape("bundle entry without resourceType".to_string()));
            }
        }
    }

    Ok(Extracted {
        patient: patient.ok_or(MapError::Missing("Patient resource"))?,
        clinical,
        certificate_id: text_at(payload, &["jti"]),
        issuer: text_at(payload, &["iss"]),
    })
}

// DIVOC: W3C credential with credentialSubject and evidence.
fn divoc(payload: &Value) -> Result<Extracted, MapError> {
    let subject = payload
        .get("credentialSubject")
        .filter(|v| v.is_object())
        .ok_or(MapError::Missing("credentialSubject"))?;

    let mut patient = Map::new();
    insert_opt(&mut patient, "name", text_at(subject, &["name"]).map(human_name));
    insert_opt(&mut patient, "birthDate", text_at(subject, &["dob"]).map(Value::from));
    insert_opt(
        &mut patient,
        "gender",
        text_at(subject, &["gender"]).map(|g| Value::from(g.to_lowercase())),
    );
    insert_opt(
        &mut patient,
        "identifier",
        text_at(subject, &["refId"])
            .or_else(|| text_at(subject, &["id"]))
            .map(|id| json!([{ "value": id }])),
    );

    let evidence: Vec<&Value> = match payload.get("evidence") {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    };
    let certificate_id = evidence
        .iter()
        .find_map(|e| text_at(e, &["certificateId"]));
    let clinical = evidence
        .into_iter()
        .map(|e| {
            let vaccine = match (text_at(e, &["icd11Code"]), text_at(e, &["vaccine"])) {
                (Some(code), text) => {
                    let mut c = concept(ICD11, &code);
                    if let (Some(object), Some(text)) = (c.as_object_mut(), text) {
                        object.insert("text".into(), json!(text));
                    }
                    Some(c)
                }
                (None, Some(text)) => Some(json!({ "text": text })),
                (None, None) => None,
            };
            Dose {
                vaccine,
                brand: None,
                manufacturer: text_at(e, &["manufacturer"]),
                date: text_at(e, &["date"]),
                dose_number: u64_at(e, &["dose"]),
                total_doses: u64_at(e, &["totalDoses"]),
                lot: text_at(e, &["batch"]),
                country: text_at(e, &["facility", "address", "addressCountry"]),
                centre: text_at(e, &["facility", "name"]),
            }
            .into_immunization()
        })
        .collect();

    Ok(Extracted {
        patient,
        clinical,
        certificate_id,
        issuer: text_at(payload, &["issuer"]),
    })
}

// ICAO VDS-NC proof of vaccination.
fn icao(payload: &Value) -> Result<Extracted, MapError> {
    let message = at(payload, &["data", "msg"])
        .filter(|v| v.is_object())
        .ok_or(MapError::Missing("data.msg"))?;

    let mut patient = Map::new();
    insert_opt(&mut patient, "name", text_at(message, &["pid", "n"]).map(human_name));
    insert_opt(&mut patient, "birthDate", text_at(message, &["pid", "dob"]).map(Value::from));
    insert_opt(
        &mut patient,
        "gender",
        text_at(message, &["pid", "sex"]).map(|s| Value::from(icao_gender(&s))),
    );
    insert_opt(
        &mut patient,
        "identifier",
        text_at(message, &["pid", "i"]).map(|id| json!([{ "value": id }])),
    );

    let mut clinical = Vec::new();
    for event in array_at(message, "ve") {
        for detail in array_at(event, "vd") {
            clinical.push(
                Dose {
                    vaccine: text_at(event, &["des"]).map(|code| {
                        let mut c = concept(ICD11, &code);
                        if let (Some(object), Some(text)) = (c.as_object_mut(), text_at(event, &["dis"])) {
                            object.insert("text".into(), json!(text));
                        }
                        c
                    }),
                    brand: text_at(event, &["nam"]).map(|n| json!({ "text": n })),
                    manufacturer: None,
                    date: text_at(detail, &["dvc"]),
                    dose_number: u64_at(detail, &["seq"]),
                    total_doses: None,
                    lot: text_at(detail, &["lot"]),
                    country: text_at(detail, &["ctr"]),
                    centre: text_at(detail, &["adm"]),
                }
                .into_immunization(),
            );
        }
    }

    Ok(Extracted {
        patient,
        clinical,
        certificate_id: text_at(message, &["uvci"]),
        issuer: text_at(payload, &["data", "hdr", "is"]),
    })
}

fn icao_gender(code: &str) -> &'static str {
    match code {
        "M" | "m" => "male",
        "F" | "f" => "female",
        _ => "unknown",
    }
}

fn observation(kind: &str, code: Option<String>) -> Map<String, Value> {
    let mut observation = Map::new();
    observation.insert("resourceType".into(), json!("Observation"));
    observation.insert("status".into(), json!("final"));
    observation.insert(
        "category".into(),
        json!([{ "coding": [{ "code": kind }] }]),
    );
    observation.insert(
        "code".into(),
        code.map_or_else(|| json!({ "text": kind }), |c| concept(EU_VALUE_SETS, &c)),
    );
    observation
}

fn human_name(text: String) -> Value {
    json!([{ "text": text }])
}

fn concept(system: &str, code: &str) -> Value {
    json!({ "coding": [{ "system": system, "code": code }] })
}

/// A WHO `Coding` map, or a bare code string.
fn concept_from_coding(value: &Value) -> Option<Value> {
    match value {
        Value::Object(coding) if coding.contains_key("code") => {
            Some(json!({ "coding": [coding] }))
        }
        Value::String(code) if !code.is_empty() => Some(json!({ "coding": [{ "code": code }] })),
        _ => None,
    }
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        map.insert(key.to_string(), value);
    }
}

fn at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

fn text_at(value: &Value, path: &[&str]) -> Option<String> {
    match at(value, path)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn u64_at(value: &Value, path: &[&str]) -> Option<u64> {
    match at(value, path)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn array_at<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .into_iter()
        .flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(format: CredentialFormat, payload: Value) -> Result<CanonicalDocument, MapError> {
        DdccMapper.map(&LogicalModel::new(format, payload))
    }

    #[test]
    fn test_who_hcert() {
        let payload = json!({
            "1": "XCL",
            "-255": {
                "name": "Eddie Murphy",
                "birthDate": "1986-09-19",
                "sex": "male",
                "identifier": "111000111",
                "vaccination": {
                    "vaccine": { "code": "XM68M6", "system": ICD11 },
                    "brand": { "code": "XM8NQ0", "system": "http://id.who.int/icd11/mms" },
                    "date": "2021-02-18",
                    "dose": 1,
                    "totalDoses": 2,
                    "lot": "PT123F",
                    "country": { "code": "XCL" },
                    "centre": "Vaccination Site"
                },
                "certificate": { "hcid": "123456", "issuer": { "identifier": "wA84s" } }
            }
        });

        let doc = map(CredentialFormat::Hcert, payload).unwrap();
        let composition = doc.composition().unwrap();
        assert_eq!(composition["identifier"]["value"], "123456");
        assert_eq!(composition["author"][0]["display"], "wA84s");
        assert_eq!(composition["section"][0]["entry"][0]["reference"], "urn:ddcc:immunization:1");

        let patient = doc.resources("Patient").next().unwrap();
        assert_eq!(patient["name"][0]["text"], "Eddie Murphy");
        assert_eq!(patient["birthDate"], "1986-09-19");

        let immunization = doc.resources("Immunization").next().unwrap();
        assert_eq!(immunization["vaccineCode"]["coding"][0]["code"], "XM68M6");
        assert_eq!(immunization["protocolApplied"][0]["doseNumberPositiveInt"], 1);
        assert_eq!(immunization["protocolApplied"][0]["seriesDosesPositiveInt"], 2);
        assert_eq!(immunization["lotNumber"], "PT123F");
        assert_eq!(immunization["patient"]["reference"], PATIENT_URL);
    }

    #[test]
    fn test_eu_hcert_two_doses_and_test() {
        let payload = json!({
            "1": "AT",
            "-260": { "1": {
                "nam": { "fn": "Musterfrau", "gn": "Gabriele", "fnt": "MUSTERFRAU", "gnt": "GABRIELE" },
                "dob": "1998-02-26",
                "v": [
                    { "tg": "840539006", "vp": "1119349007", "mp": "EU/1/20/1528", "ma": "ORG-100030215",
                      "dn": 1, "sd": 2, "dt": "2021-02-18", "co": "AT", "is": "BMSGPK", "ci": "URN:UVCI:01:AT:1" },
                    { "tg": "840539006", "vp": "1119349007", "mp": "EU/1/20/1528", "ma": "ORG-100030215",
                      "dn": 2, "sd": 2, "dt": "2021-03-12", "co": "AT", "is": "BMSGPK", "ci": "URN:UVCI:01:AT:1" }
                ],
                "t": [ { "tg": "840539006", "tt": "LP6464-4", "sc": "2021-04-13T14:20:00Z", "tr": "260415000", "tc": "Testing center" } ]
            } }
        });

        let doc = map(CredentialFormat::Hcert, payload).unwrap();
        assert_eq!(doc.resources("Immunization").count(), 2);
        assert_eq!(doc.resources("Observation").count(), 1);

        let patient = doc.resources("Patient").next().unwrap();
        assert_eq!(patient["name"][0]["text"], "Gabriele Musterfrau");
        assert_eq!(patient["name"][0]["family"], "Musterfrau");

        let composition = doc.composition().unwrap();
        assert_eq!(composition["identifier"]["value"], "URN:UVCI:01:AT:1");
        assert_eq!(composition["author"][0]["display"], "BMSGPK");
        assert_eq!(composition["section"][0]["entry"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_hcert_without_model_is_error() {
        let result = map(CredentialFormat::Hcert, json!({ "1": "DE", "4": 1700000000 }));
        assert!(matches!(result, Err(MapError::Missing(_))));
    }

    #[test]
    fn test_shc_copies_fhir_resources() {
        let payload = json!({
            "iss": "https://spec.smarthealth.cards/examples/issuer",
            "vc": { "credentialSubject": { "fhirVersion": "4.0.1", "fhirBundle": {
                "resourceType": "Bundle",
                "type": "collection",
                "entry": [
                    { "fullUrl": "resource:0", "resource": { "resourceType": "Patient", "name": [{ "family": "Anyperson", "given": ["John"] }], "birthDate": "1951-01-20" } },
                    { "fullUrl": "resource:1", "resource": { "resourceType": "Immunization", "status": "completed", "vaccineCode": { "coding": [{ "system": "http://hl7.org/fhir/sid/cvx", "code": "207" }] }, "patient": { "reference": "resource:0" }, "occurrenceDateTime": "2021-01-01" } },
                    { "fullUrl": "resource:2", "resource": { "resourceType": "Immunization", "status": "completed", "vaccineCode": { "coding": [{ "system": "http://hl7.org/fhir/sid/cvx", "code": "207" }] }, "patient": { "reference": "resource:0" }, "occurrenceDateTime": "2021-01-29" } }
                ]
            } } }
        });

        let doc = map(CredentialFormat::Shc, payload).unwrap();
        let immunizations: Vec<&Value> = doc.resources("Immunization").collect();
        assert_eq!(immunizations.len(), 2);
        assert_eq!(immunizations[1]["patient"]["reference"], PATIENT_URL);
        assert_eq!(
            doc.composition().unwrap()["author"][0]["display"],
            "https://spec.smarthealth.cards/examples/issuer"
        );
        assert_eq!(doc.resources("Patient").next().unwrap()["birthDate"], "1951-01-20");
    }

    #[test]
    fn test_shc_without_patient_is_error() {
        let payload = json!({ "vc": { "credentialSubject": { "fhirBundle": { "entry": [] } } } });
        assert_eq!(
            map(CredentialFormat::Shc, payload),
            Err(MapError::Missing("Patient resource"))
        );
    }

    #[test]
    fn test_divoc() {
        let payload = json!({
            "issuer": "https://cowin.gov.in/",
            "credentialSubject": { "name": "Bhaya Mitra", "gender": "Male", "dob": "1956-12-15", "refId": "12346", "nationality": "Indian" },
            "evidence": [{
                "certificateId": "208222", "vaccine": "CoVax", "manufacturer": "Bharat Biotech",
                "batch": "MB3428BX", "date": "2021-02-22T11:53:21.542Z", "dose": 1, "totalDoses": 2,
                "icd11Code": "XM68M6",
                "facility": { "name": "ABC Medical Center", "address": { "addressCountry": "IN" } }
            }]
        });

        let doc = map(CredentialFormat::Divoc, payload).unwrap();
        let patient = doc.resources("Patient").next().unwrap();
        assert_eq!(patient["gender"], "male");
        assert_eq!(patient["identifier"][0]["value"], "12346");

        let immunization = doc.resources("Immunization").next().unwrap();
        assert_eq!(immunization["vaccineCode"]["text"], "CoVax");
        assert_eq!(immunization["lotNumber"], "MB3428BX");
        assert_eq!(immunization["location"]["display"], "ABC Medical Center");
        assert_eq!(doc.composition().unwrap()["identifier"]["value"], "208222");
    }

    #[test]
    fn test_icao() {
        let payload = json!({
            "data": {
                "hdr": { "t": "icao.vacc", "v": 1, "is": "UTO" },
                "msg": {
                    "uvci": "U32870",
                    "pid": { "n": "Smith Bill", "dob": "1990-01-02", "sex": "M", "i": "A1234567Z" },
                    "ve": [{
                        "des": "XM68M6", "nam": "Comirnaty", "dis": "RA01.0",
                        "vd": [
                            { "dvc": "2021-03-03", "seq": 1, "ctr": "UTO", "adm": "RIVM", "lot": "VC35679" },
                            { "dvc": "2021-03-24", "seq": 2, "ctr": "UTO", "adm": "RIVM", "lot": "VC87540" }
                        ]
                    }]
                }
            },
            "sig": { "alg": "ES256" }
        });

        let doc = map(CredentialFormat::Icao, payload).unwrap();
        assert_eq!(doc.resources("Immunization").count(), 2);
        assert_eq!(doc.resources("Patient").next().unwrap()["gender"], "male");
        let composition = doc.composition().unwrap();
        assert_eq!(composition["identifier"]["value"], "U32870");
        assert_eq!(composition["author"][0]["display"], "UTO");
        assert_eq!(composition["section"][0]["entry"][1]["reference"], "urn:ddcc:immunization:2");
    }
}
