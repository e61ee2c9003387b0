//! Fuzz target for the claims set builder.
//!
//! Builds claims from arbitrary issuers, audiences and attributes and checks
//! that registered claims are never overwritten, reserved attributes are never
//! released, and the result survives a JSON round trip.
//!
//! Run with:
//! cargo +nightly fuzz run fuzz_claims_builder -- -max_total_time=600

#![no_main]

use arbitrary::Arbitrary;
use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use tessera_core::{is_reserved_attribute, AttributeMap, AttributeValue};
use tessera_token::{ClaimsSet, REGISTERED_CLAIMS};

/// Arbitrary input for claims builder
#[derive(Arbitrary, Debug)]
struct ClaimsInput {
    issuer: String,
    subject: Option<String>,
    audience: Vec<String>,
    expiration: u32,
    attributes: Vec<(String, Vec<String>)>,
}

fuzz_target!(|input: ClaimsInput| {
    if input.issuer.len() > 1000 || input.attributes.len() > 64 {
        return;
    }

    let mut attributes = AttributeMap::new();
    for (name, values) in &input.attributes {
        attributes.insert(
            name.clone(),
            values.iter().map(|v| AttributeValue::from(v.as_str())).collect(),
        );
    }

    let Some(expiration) = Utc.timestamp_opt(i64::from(input.expiration), 0).single() else {
        return;
    };

    let mut builder = ClaimsSet::builder()
        .issuer(&input.issuer)
        .audience(input.audience.iter().cloned())
        .expiration_time(expiration)
        .attributes(&attributes);
    if let Some(ref sub) = input.subject {
        builder = builder.subject(sub);
    }

    let claims = match builder.build() {
        Ok(claims) => claims,
        Err(_) => {
            assert!(input.issuer.trim().is_empty());
            return;
        }
    };

    assert_eq!(claims.iss, input.issuer);
    assert_eq!(claims.sub, input.subject);
    for name in claims.attributes().keys() {
        assert!(!REGISTERED_CLAIMS.contains(&name.as_str()));
        assert!(!is_reserved_attribute(name));
    }

    let json = claims.to_json().expect("claims serialize");
    let parsed = ClaimsSet::from_json(&json).expect("claims parse back");
    assert_eq!(parsed, claims);
});
