//! Language metadata and verification channel resolution.
//!
//! # Architecture
//!
//! - `channel`: maps a language code to the out-of-band channel (if any) that
//!   must confirm a switch to it
//! - `registry`: display names for the languages the service knows about
//!
//! Language codes are plain strings throughout the service. A code missing
//! from the registry is still a valid target; it simply has no label and
//! resolves to no channel unless configured otherwise.

mod channel;
mod registry;

pub use channel::{Channel, ChannelResolver};
pub use registry::{LanguageInfo, LanguageRegistry};
