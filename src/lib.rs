//! Preferred-language settings guarded by one-time-password verification.
//!
//! Switching to a language configured for email or mobile verification issues
//! a six-digit code through the matching channel and only takes effect once
//! the code is confirmed. Any other language is applied immediately.

pub mod api;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod language;
pub mod notify;
pub mod otp;
pub mod retry;
pub mod security;
pub mod store;
