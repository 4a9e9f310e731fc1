//! One-time code generation.
//!
//! The coordinator only sees the [`OtpGenerator`] trait, so the randomness
//! source can be swapped (e.g. for a hardware RNG or a deterministic test
//! sequence) without touching the state machine.

use rand::Rng;

/// Smallest code that can be issued (six digits, no leading zero).
pub const OTP_MIN: u32 = 100_000;
/// Largest code that can be issued.
pub const OTP_MAX: u32 = 999_999;

/// Source of one-time codes.
pub trait OtpGenerator: Send + Sync {
    /// Produce a fresh six-digit numeric code.
    fn generate(&self) -> String;
}

/// Uniform draw from `OTP_MIN..=OTP_MAX` using the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomOtpGenerator;

impl OtpGenerator for RandomOtpGenerator {
    fn generate(&self) -> String {
        rand::thread_rng().gen_range(OTP_MIN..=OTP_MAX).to_string()
    }
}
