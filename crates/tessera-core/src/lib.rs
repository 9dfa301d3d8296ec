//! # tessera-core
//!
//! Shared building blocks for the Tessera credential core:
//!
//! - [`Clock`]: injected time source. Nothing in Tessera reads the wall clock
//!   directly, so every expiry and TTL computation is deterministic under test.
//! - [`ErrorKind`]: the error taxonomy every crate maps its errors onto.
//! - [`config`]: YAML configuration for tenant policies, signing keys,
//!   testing tokens and event delivery.

pub mod clock;
pub mod config;
pub mod error;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    ConfigError, EventSinkKind, EventsConfig, KeySource, KeysConfig, SessionPolicy, TenantPolicy,
    TesseraConfig, TestingTokenConfig, TokenPolicy, VerificationPolicy,
};
pub use error::ErrorKind;
