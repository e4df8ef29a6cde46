//! Security response headers.
//!
//! Attached to every response by the HTTP layer. HSTS is only sent in
//! production where TLS is terminated in front of the service.

use axum::http::{HeaderName, HeaderValue};

use crate::config::Environment;

const BASE_HEADERS: &[(&str, &str)] = &[
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    ("permissions-policy", "geolocation=(), microphone=(), camera=(), payment=()"),
];

const HSTS: (&str, &str) = (
    "strict-transport-security",
    "max-age=31536000; includeSubDomains; preload",
);

/// Headers to attach for the given environment.
pub fn security_headers(environment: Environment) -> Vec<(HeaderName, HeaderValue)> {
    let mut pairs: Vec<(&str, &str)> = BASE_HEADERS.to_vec();
    if environment.is_production() {
        pairs.push(HSTS);
    }
    pairs
        .into_iter()
        .map(|(name, value)| {
            (
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            )
        })
        .collect()
}
