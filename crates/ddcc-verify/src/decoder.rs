//! QR payload dispatch.

use std::fmt;
use std::sync::Arc;

use ddcc_trust::TrustResolver;
use tracing::debug;

use crate::codec::strip_prefix_ignore_case;
use crate::document::DocumentMapper;
use crate::status::VerificationResult;
use crate::verifier::{
    CredentialFormat, DivocVerifier, FormatVerifier, HcertVerifier, IcaoVerifier, ShcVerifier,
    VerifierContext,
};

/// How a route recognises its payloads. Matching ignores ASCII case.
#[derive(Debug, Clone, Copy)]
enum Marker {
    Prefix(&'static [&'static str]),
    Contains(&'static str),
}

impl Marker {
    fn matches(self, payload: &str) -> bool {
        match self {
            Self::Prefix(prefixes) => prefixes
                .iter()
                .any(|prefix| strip_prefix_ignore_case(payload, prefix).is_some()),
            Self::Contains(needle) => payload
                .to_ascii_uppercase()
                .contains(&needle.to_ascii_uppercase()),
        }
    }
}

/// Entry point: routes a raw QR payload to the verifier for its format.
///
/// Routes are tried in order and the first match wins; a payload that
/// matches no route is `NOT_SUPPORTED`.
pub struct QrDecoder {
    routes: Vec<(Marker, Box<dyn FormatVerifier>)>,
}

impl fmt::Debug for QrDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|(marker, v)| (marker, v.format())))
            .finish()
    }
}

impl QrDecoder {
    /// Decoder backed by `trust`, using the default mapper.
    pub fn new(trust: Arc<dyn TrustResolver>) -> Self {
        Self::with_context(VerifierContext::new(trust))
    }

    pub fn with_mapper(trust: Arc<dyn TrustResolver>, mapper: Arc<dyn DocumentMapper>) -> Self {
        Self::with_context(VerifierContext::new(trust).with_mapper(mapper))
    }

    pub fn with_context(context: VerifierContext) -> Self {
        let routes: Vec<(Marker, Box<dyn FormatVerifier>)> = vec![
            (
                Marker::Prefix(&["HC1:"]),
                Box::new(HcertVerifier::new(context.clone())),
            ),
            (
                Marker::Prefix(&["SHC:"]),
                Box::new(ShcVerifier::new(context.clone())),
            ),
            (
                Marker::Prefix(&["B64:", "PK"]),
                Box::new(DivocVerifier::new(context.clone())),
            ),
            (Marker::Contains("ICAO"), Box::new(IcaoVerifier::new(context))),
        ];
        Self { routes }
    }

    fn route(&self, payload: &str) -> Option<&dyn FormatVerifier> {
        self.routes
            .iter()
            .find(|(marker, _)| marker.matches(payload))
            .map(|(_, verifier)| verifier.as_ref())
    }

    /// Format `payload` would be routed to, without verifying it.
    pub fn detect(&self, payload: &str) -> Option<CredentialFormat> {
        self.route(payload).map(|verifier| verifier.format())
    }

    pub fn decode(&self, payload: &str) -> VerificationResult {
        match self.route(payload) {
            Some(verifier) => verifier.unpack_and_verify(payload),
            None => {
                debug!(len = payload.len(), "no verifier matches payload");
                VerificationResult::not_supported(payload)
            }
        }
    }
}
