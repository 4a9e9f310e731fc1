//! Language change state machine.
//!
//! A user is either *stable* (no challenge) or has exactly one *pending*
//! challenge. `request_change` moves stable -> pending (or applies the change
//! directly when the target language needs no verification), and
//! `verify_change` moves pending -> stable on a correct, unexpired code.
//! Issuing a new challenge replaces the previous one. Expiry is only checked
//! when a code is submitted.

use crate::clock::{Clock, SystemClock};
use crate::language::{Channel, ChannelResolver, LanguageRegistry};
use crate::notify::{dispatch, Notification, NotificationSender};
use crate::otp::{OtpGenerator, RandomOtpGenerator};
use crate::retry::RetryConfig;
use crate::security::otp_matches;
use crate::store::{Challenge, UserRecord, UserStore};
use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Default lifetime of an issued code: five minutes.
pub const DEFAULT_OTP_TTL_SECS: i64 = 300;

/// Why a language change or verification was refused.
#[derive(Debug, Error)]
pub enum ChangeError {
    #[error("{0} is required")]
    InvalidArgument(&'static str),

    #[error("User not found")]
    NotFound(String),

    #[error("No pending language change")]
    NoPendingChallenge,

    #[error("OTP expired")]
    Expired,

    #[error("Invalid OTP")]
    CodeMismatch,

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Result of [`LanguageChangeCoordinator::request_change`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Target equals the current language; nothing happened.
    Unchanged { preferred_language: String },
    /// Target needs no verification and is now active.
    Applied { preferred_language: String },
    /// A code was issued and handed to the delivery transport.
    ChallengeIssued {
        channel: Channel,
        code: String,
        expires_at: DateTime<Utc>,
    },
}

impl ChangeOutcome {
    pub fn otp_required(&self) -> bool {
        matches!(self, ChangeOutcome::ChallengeIssued { .. })
    }
}

/// Result of a successful [`LanguageChangeCoordinator::verify_change`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub preferred_language: String,
}

/// Owns the pending-change state of every user and serializes operations
/// per user.
pub struct LanguageChangeCoordinator {
    store: Arc<dyn UserStore>,
    resolver: ChannelResolver,
    sender: Arc<dyn NotificationSender>,
    generator: Arc<dyn OtpGenerator>,
    clock: Arc<dyn Clock>,
    otp_ttl: Duration,
    delivery_retry: RetryConfig,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LanguageChangeCoordinator {
    /// Coordinator with a random code source, the wall clock and a
    /// five-minute code lifetime.
    pub fn new(
        store: Arc<dyn UserStore>,
        resolver: ChannelResolver,
        sender: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            store,
            resolver,
            sender,
            generator: Arc::new(RandomOtpGenerator),
            clock: Arc::new(SystemClock),
            otp_ttl: Duration::seconds(DEFAULT_OTP_TTL_SECS),
            delivery_retry: RetryConfig::otp_delivery(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn OtpGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_otp_ttl(mut self, ttl: Duration) -> Self {
        self.otp_ttl = ttl;
        self
    }

    pub fn with_delivery_retry(mut self, retry: RetryConfig) -> Self {
        self.delivery_retry = retry;
        self
    }

    pub fn resolver(&self) -> &ChannelResolver {
        &self.resolver
    }

    /// Current record for `user_id`.
    pub async fn profile(&self, user_id: &str) -> Result<UserRecord, ChangeError> {
        self.load(user_id).await
    }

    /// Ask to switch `user_id` to `target_language`.
    ///
    /// Languages without a verification channel are applied immediately.
    /// Otherwise a fresh code replaces any outstanding challenge and is sent
    /// in the background; the preferred language is left untouched until
    /// [`Self::verify_change`] succeeds.
    pub async fn request_change(
        &self,
        user_id: &str,
        target_language: &str,
    ) -> Result<ChangeOutcome, ChangeError> {
        require(user_id, "user id")?;
        require(target_language, "target language")?;
        self.load(user_id).await?;

        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;
        let current = self.load(user_id).await?;

        if current.preferred_language == target_language {
            debug!(
                "User {} already uses '{}', nothing to change",
                user_id, target_language
            );
            return Ok(ChangeOutcome::Unchanged {
                preferred_language: current.preferred_language,
            });
        }

        let Some(channel) = self.resolver.resolve(target_language) else {
            let mut next = current.clone();
            next.preferred_language = target_language.to_string();
            next.challenge = None;
            self.commit(&current, next).await?;

            info!(
                "[LANG CHANGE] User {} directly changed language to {}",
                user_id,
                label(target_language)
            );
            return Ok(ChangeOutcome::Applied {
                preferred_language: target_language.to_string(),
            });
        };

        let expires_at = self
            .clock
            .now()
            .checked_add_signed(self.otp_ttl)
            .ok_or_else(|| {
                ChangeError::Storage(anyhow!(
                    "code lifetime {} puts the expiry out of range",
                    self.otp_ttl
                ))
            })?;
        let code = self.generator.generate();

        if let Some(previous) = &current.challenge {
            debug!(
                "User {} replaces pending change to '{}'",
                user_id, previous.pending_language
            );
        }

        let mut next = current.clone();
        next.challenge = Some(Challenge {
            pending_language: target_language.to_string(),
            code: code.clone(),
            expires_at,
        });
        self.commit(&current, next).await?;

        let destination = match channel {
            Channel::Email => current.email.clone(),
            Channel::Mobile => current.mobile.clone(),
        };
        dispatch(
            Arc::clone(&self.sender),
            self.delivery_retry.clone(),
            Notification {
                channel,
                destination,
                code: code.clone(),
            },
        );

        info!(
            "[LANG CHANGE] OTP generated for user {} language {}, channel: {}",
            user_id,
            label(target_language),
            channel
        );

        Ok(ChangeOutcome::ChallengeIssued {
            channel,
            code,
            expires_at,
        })
    }

    /// Confirm the pending change for `user_id` with `submitted_code`.
    ///
    /// An expired or mismatched code leaves the challenge in place.
    pub async fn verify_change(
        &self,
        user_id: &str,
        submitted_code: &str,
    ) -> Result<Verified, ChangeError> {
        require(user_id, "user id")?;
        require(submitted_code, "code")?;
        self.load(user_id).await?;

        let lock = self.lock_for(user_id);
        let _guard = lock.lock().await;
        let current = self.load(user_id).await?;

        let Some(challenge) = &current.challenge else {
            return Err(ChangeError::NoPendingChallenge);
        };

        if challenge.is_expired_at(self.clock.now()) {
            warn!(
                "User {} submitted a code for '{}' after it expired at {}",
                user_id, challenge.pending_language, challenge.expires_at
            );
            return Err(ChangeError::Expired);
        }

        if !otp_matches(submitted_code, &challenge.code) {
            warn!("User {} submitted a wrong code", user_id);
            return Err(ChangeError::CodeMismatch);
        }

        let preferred_language = challenge.pending_language.clone();
        let mut next = current.clone();
        next.preferred_language = preferred_language.clone();
        next.challenge = None;
        self.commit(&current, next).await?;

        info!(
            "[LANG CHANGE] ✓ OTP verified, user {} language changed to {}",
            user_id,
            label(&preferred_language)
        );

        Ok(Verified { preferred_language })
    }

    async fn load(&self, user_id: &str) -> Result<UserRecord, ChangeError> {
        self.store
            .get(user_id)
            .await?
            .ok_or_else(|| ChangeError::NotFound(user_id.to_string()))
    }

    async fn commit(&self, current: &UserRecord, next: UserRecord) -> Result<(), ChangeError> {
        if self.store.compare_and_swap(current, next).await? {
            Ok(())
        } else {
            Err(ChangeError::Storage(anyhow!(
                "record for user {} was modified concurrently",
                current.id
            )))
        }
    }

    /// Per-user async lock; different users never share one.
    fn lock_for(&self, user_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(locks.entry(user_id.to_string()).or_default())
    }
}

fn require(value: &str, what: &'static str) -> Result<(), ChangeError> {
    if value.is_empty() {
        Err(ChangeError::InvalidArgument(what))
    } else {
        Ok(())
    }
}

/// `"French (fr)"` for catalogued languages, the bare code otherwise.
fn label(code: &str) -> String {
    match LanguageRegistry::get().get_by_code(code) {
        Some(info) => format!("{} ({})", info.name, info.code),
        None => code.to_string(),
    }
}
