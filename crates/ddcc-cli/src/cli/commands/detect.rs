//! `ddcc detect` - Report the format a payload would be routed to.

use anyhow::Result;
use ddcc_trust::{StaticDocumentResolver, TrustConfig, TrustRegistry};
use ddcc_verify::QrDecoder;
use std::sync::Arc;

use super::input::read_payload;
use crate::cli::args::DetectArgs;
use crate::exit_codes::{REJECTED, VERIFIED};

pub fn run(args: DetectArgs) -> Result<i32> {
    let payload = read_payload(args.payload.as_deref(), args.file.as_deref())?.unwrap_or_default();

    // Routing never consults trust, so an empty registry is enough.
    let registry = TrustRegistry::new(
        TrustConfig::default(),
        Arc::new(StaticDocumentResolver::new()),
    );
    match QrDecoder::new(Arc::new(registry)).detect(&payload) {
        Some(format) => {
            println!("{format}");
            Ok(VERIFIED)
        }
        None => {
            println!("not supported");
            Ok(REJECTED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(payload: &str) -> i32 {
        run(DetectArgs {
            payload: Some(payload.to_string()),
            file: None,
        })
        .unwrap()
    }

    #[test]
    fn test_detect_exit_codes() {
        assert_eq!(detect("HC1:6BF"), VERIFIED);
        assert_eq!(detect("shc:/56"), VERIFIED);
        assert_eq!(detect("https://example.com"), REJECTED);
    }
}
