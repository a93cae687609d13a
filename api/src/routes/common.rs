//! Protocol objects built from configuration.

use chrono::Duration;
use services::token::TokenCodec;
use services::verification::{DeviceReusePolicy, VerificationEngine};

/// Token codec keyed by `ATTENDANCE_SECRET`.
///
/// The secret must be hex; a malformed value panics, which `main` provokes
/// at startup so a misconfigured deployment never serves requests.
pub fn token_codec() -> TokenCodec {
    let key = hex::decode(common::config::attendance_secret())
        .expect("ATTENDANCE_SECRET must be a hex string");
    TokenCodec::new(key, Duration::seconds(common::config::token_ttl_seconds()))
}

pub fn verification_engine() -> VerificationEngine {
    let policy = common::config::device_reuse_policy()
        .parse()
        .unwrap_or(DeviceReusePolicy::Flag);
    VerificationEngine::new(token_codec(), policy)
}
