//! OTP authentication state machine.
//!
//! Per identity the machine moves `Unauthenticated -> PendingVerification
//! (OTP issued) -> Verified`; resend re-enters `PendingVerification` and
//! sign-out returns to `Unauthenticated`. Every mutation is written through
//! the store so a restart resumes where the user left off.
//!
//! Codes are generated and checked locally. This is the state-machine shape
//! of an OTP flow, not a security boundary; a real deployment must issue and
//! verify codes on a trusted service.

use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::store::{AUTH_RECORD, Store};

/// Number of digits in a one-time code.
pub const OTP_LENGTH: usize = 6;
/// Codes expire this many minutes after issue.
pub const OTP_EXPIRY_MINUTES: i64 = 5;
/// Failed verification attempts allowed per issued code.
pub const MAX_OTP_ATTEMPTS: u32 = 3;
/// Seconds a user must wait between resends.
pub const RESEND_COOLDOWN_SECS: i64 = 60;

/// A live one-time code. Exactly one record exists per identity at a time;
/// issuing a new one discards the previous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub attempts: u32,
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub display_name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Persisted authentication record: identity, verified flag, and any live OTP.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthState {
    pub identity: Option<Identity>,
    pub verified: bool,
    pub otp: Option<OtpRecord>,
    pub otp_sent: bool,
    pub last_sent_at: Option<DateTime<Utc>>,
}

/// Derived view of where the user is in the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStage {
    Unauthenticated,
    PendingVerification,
    Verified,
}

/// Result of a verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    Verified,
    Rejected(OtpRejection),
}

/// Why a verification attempt was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpRejection {
    /// No code has been issued for this identity.
    NoOtpIssued,
    /// The code expired. Checked before attempt accounting, so an expired
    /// code never consumes an attempt.
    Expired,
    /// The attempt budget was already spent; the record is inert until a
    /// fresh code is issued.
    AttemptsExhausted,
    /// Wrong code; `remaining` attempts are left.
    Mismatch { remaining: u32 },
}

impl fmt::Display for OtpRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtpRejection::NoOtpIssued => write!(f, "No OTP found. Please request one."),
            OtpRejection::Expired => write!(f, "OTP has expired. Please request a new one."),
            OtpRejection::AttemptsExhausted => {
                write!(f, "Too many failed attempts. Please request a new OTP.")
            }
            OtpRejection::Mismatch { remaining } => {
                let noun = if *remaining == 1 { "attempt" } else { "attempts" };
                write!(f, "Invalid OTP. You have {remaining} {noun} left.")
            }
        }
    }
}

/// Result of a resend request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    /// A fresh code was issued (invalidating the old one) and the countdown
    /// restarted.
    Sent,
    /// The cooldown is still active; nothing was issued and the countdown is
    /// unchanged.
    CoolingDown { remaining_secs: i64 },
}

/// Delivery hook for issued codes.
///
/// There is no real delivery channel; implementations log or print the code.
pub trait OtpDelivery {
    fn deliver(&self, email: &str, code: &str);
}

/// Default delivery hook: logs the code at info level.
pub struct TracingDelivery;

impl OtpDelivery for TracingDelivery {
    fn deliver(&self, email: &str, code: &str) {
        tracing::info!(email, code, "mock OTP delivery");
    }
}

/// Authentication session bound to a store and a delivery hook.
///
/// All time-dependent operations take an explicit `now` (`*_at` variants) so
/// the state machine is deterministic under test; the plain wrappers use
/// `Utc::now()`.
pub struct AuthSession {
    state: AuthState,
    store: Store,
    delivery: Box<dyn OtpDelivery>,
}

impl AuthSession {
    /// Loads the persisted auth record (or starts unauthenticated).
    pub fn load(store: Store, delivery: Box<dyn OtpDelivery>) -> Self {
        let state = store.load(AUTH_RECORD).unwrap_or_default();
        Self {
            state,
            store,
            delivery,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.state.identity.as_ref()
    }

    pub fn is_verified(&self) -> bool {
        self.state.verified && self.state.identity.is_some()
    }

    pub fn stage(&self) -> AuthStage {
        match (&self.state.identity, self.state.verified) {
            (None, _) => AuthStage::Unauthenticated,
            (Some(_), true) => AuthStage::Verified,
            (Some(_), false) => AuthStage::PendingVerification,
        }
    }

    /// Signs in with the mocked external provider.
    ///
    /// The identity arrives unverified and with no code issued; the user
    /// confirms it and requests a code as a second step.
    ///
    /// # Errors
    /// Returns an error if the state cannot be persisted.
    pub fn login_with_provider(&mut self) -> Result<()> {
        self.state = AuthState {
            identity: Some(Identity {
                display_name: "Alex Johnson".to_string(),
                email: "alex.j@example.com".to_string(),
                avatar_url: Some(
                    "https://api.dicebear.com/8.x/initials/svg?seed=Alex%20Johnson".to_string(),
                ),
            }),
            ..AuthState::default()
        };
        self.persist()
    }

    /// Signs in with an email address and immediately issues a code.
    ///
    /// # Errors
    /// Returns an error if the state cannot be persisted.
    pub fn login_with_email(&mut self, email: &str) -> Result<()> {
        self.login_with_email_at(email, Utc::now())
    }

    /// See [`Self::login_with_email`].
    ///
    /// # Errors
    /// Returns an error if the state cannot be persisted.
    pub fn login_with_email_at(&mut self, email: &str, now: DateTime<Utc>) -> Result<()> {
        let display_name = email.split('@').next().unwrap_or(email).to_string();
        self.state = AuthState {
            identity: Some(Identity {
                display_name,
                email: email.to_string(),
                avatar_url: None,
            }),
            ..AuthState::default()
        };
        self.issue_at(now)
    }

    /// Issues a fresh code, replacing any live record.
    ///
    /// # Errors
    /// Returns an error if no identity is signed in or the state cannot be
    /// persisted.
    pub fn issue(&mut self) -> Result<()> {
        self.issue_at(Utc::now())
    }

    /// See [`Self::issue`].
    ///
    /// # Errors
    /// Returns an error if no identity is signed in or the state cannot be
    /// persisted.
    pub fn issue_at(&mut self, now: DateTime<Utc>) -> Result<()> {
        let Some(identity) = self.state.identity.as_ref() else {
            anyhow::bail!("no identity signed in; log in before requesting a code");
        };

        let code = generate_code();
        self.delivery.deliver(&identity.email, &code);

        self.state.otp = Some(OtpRecord {
            code,
            issued_at: now,
            expires_at: now + Duration::minutes(OTP_EXPIRY_MINUTES),
            attempts: 0,
        });
        self.state.otp_sent = true;
        self.state.last_sent_at = Some(now);
        self.persist()
    }

    /// Verifies a candidate code against the live record.
    ///
    /// Precedence: missing record, then expiry (never consumes an attempt),
    /// then exhausted attempts, then the code comparison itself.
    ///
    /// # Errors
    /// Returns an error if the state cannot be persisted.
    pub fn verify(&mut self, candidate: &str) -> Result<VerifyOutcome> {
        self.verify_at(candidate, Utc::now())
    }

    /// See [`Self::verify`].
    ///
    /// # Errors
    /// Returns an error if the state cannot be persisted.
    pub fn verify_at(&mut self, candidate: &str, now: DateTime<Utc>) -> Result<VerifyOutcome> {
        let Some(record) = self.state.otp.as_mut() else {
            return Ok(VerifyOutcome::Rejected(OtpRejection::NoOtpIssued));
        };

        if now > record.expires_at {
            return Ok(VerifyOutcome::Rejected(OtpRejection::Expired));
        }

        if record.attempts >= MAX_OTP_ATTEMPTS {
            return Ok(VerifyOutcome::Rejected(OtpRejection::AttemptsExhausted));
        }

        if candidate == record.code {
            self.state.verified = true;
            self.state.otp = None;
            self.persist()?;
            return Ok(VerifyOutcome::Verified);
        }

        record.attempts += 1;
        let remaining = MAX_OTP_ATTEMPTS - record.attempts;
        self.persist()?;
        Ok(VerifyOutcome::Rejected(OtpRejection::Mismatch { remaining }))
    }

    /// Requests a resend; a no-op while the 60-second cooldown is active.
    ///
    /// # Errors
    /// Returns an error if the state cannot be persisted.
    pub fn resend(&mut self) -> Result<ResendOutcome> {
        self.resend_at(Utc::now())
    }

    /// See [`Self::resend`].
    ///
    /// # Errors
    /// Returns an error if the state cannot be persisted.
    pub fn resend_at(&mut self, now: DateTime<Utc>) -> Result<ResendOutcome> {
        if let Some(last) = self.state.last_sent_at {
            let elapsed = (now - last).num_seconds();
            if elapsed < RESEND_COOLDOWN_SECS {
                return Ok(ResendOutcome::CoolingDown {
                    remaining_secs: RESEND_COOLDOWN_SECS - elapsed,
                });
            }
        }
        self.issue_at(now)?;
        Ok(ResendOutcome::Sent)
    }

    /// Signs out, discarding identity, OTP, and verification state.
    pub fn logout(&mut self) {
        self.state = AuthState::default();
        self.store.remove(AUTH_RECORD);
    }

    fn persist(&self) -> Result<()> {
        self.store.save(AUTH_RECORD, &self.state)
    }

    #[cfg(test)]
    fn live_code(&self) -> Option<&str> {
        self.state.otp.as_ref().map(|r| r.code.as_str())
    }

    #[cfg(test)]
    fn live_record(&self) -> Option<&OtpRecord> {
        self.state.otp.as_ref()
    }
}

/// Generates a uniformly random 6-digit code (no leading zero).
fn generate_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(100_000..1_000_000);
    n.to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    struct SilentDelivery;

    impl OtpDelivery for SilentDelivery {
        fn deliver(&self, _email: &str, _code: &str) {}
    }

    fn session(dir: &tempfile::TempDir) -> AuthSession {
        AuthSession::load(Store::at(dir.path()), Box::new(SilentDelivery))
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..50 {
            let code = generate_code();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn email_login_issues_code_and_enters_pending() {
        let dir = tempfile::tempdir().unwrap();
        let mut auth = session(&dir);

        auth.login_with_email_at("sam@example.com", t0()).unwrap();

        assert_eq!(auth.stage(), AuthStage::PendingVerification);
        assert_eq!(auth.identity().unwrap().display_name, "sam");
        let record = auth.live_record().unwrap();
        assert_eq!(record.attempts, 0);
        assert_eq!(
            record.expires_at,
            t0() + Duration::minutes(OTP_EXPIRY_MINUTES)
        );
    }

    #[test]
    fn provider_login_installs_unverified_identity_without_code() {
        let dir = tempfile::tempdir().unwrap();
        let mut auth = session(&dir);

        auth.login_with_provider().unwrap();

        assert_eq!(auth.stage(), AuthStage::PendingVerification);
        assert!(auth.live_record().is_none());
        assert_eq!(
            auth.verify_at("123456", t0()).unwrap(),
            VerifyOutcome::Rejected(OtpRejection::NoOtpIssued)
        );
    }

    #[test]
    fn correct_code_verifies_and_discards_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut auth = session(&dir);
        auth.login_with_email_at("sam@example.com", t0()).unwrap();
        let code = auth.live_code().unwrap().to_string();

        assert_eq!(auth.verify_at(&code, t0()).unwrap(), VerifyOutcome::Verified);
        assert_eq!(auth.stage(), AuthStage::Verified);
        assert!(auth.live_record().is_none());

        // The spent code cannot be replayed.
        assert_eq!(
            auth.verify_at(&code, t0()).unwrap(),
            VerifyOutcome::Rejected(OtpRejection::NoOtpIssued)
        );
    }

    #[test]
    fn expiry_is_checked_before_attempt_accounting() {
        let dir = tempfile::tempdir().unwrap();
        let mut auth = session(&dir);
        auth.login_with_email_at("sam@example.com", t0()).unwrap();
        let code = auth.live_code().unwrap().to_string();

        let late = t0() + Duration::minutes(OTP_EXPIRY_MINUTES) + Duration::seconds(1);
        assert_eq!(
            auth.verify_at("000000", late).unwrap(),
            VerifyOutcome::Rejected(OtpRejection::Expired)
        );
        // Even the correct code fails after expiry, and no attempt was spent.
        assert_eq!(
            auth.verify_at(&code, late).unwrap(),
            VerifyOutcome::Rejected(OtpRejection::Expired)
        );
        assert_eq!(auth.live_record().unwrap().attempts, 0);
    }

    #[test]
    fn mismatches_count_down_and_exhaust() {
        let dir = tempfile::tempdir().unwrap();
        let mut auth = session(&dir);
        auth.login_with_email_at("sam@example.com", t0()).unwrap();
        let code = auth.live_code().unwrap().to_string();
        let wrong = if code == "111111" { "222222" } else { "111111" };

        assert_eq!(
            auth.verify_at(wrong, t0()).unwrap(),
            VerifyOutcome::Rejected(OtpRejection::Mismatch { remaining: 2 })
        );
        assert_eq!(
            auth.verify_at(wrong, t0()).unwrap(),
            VerifyOutcome::Rejected(OtpRejection::Mismatch { remaining: 1 })
        );
        assert_eq!(
            auth.verify_at(wrong, t0()).unwrap(),
            VerifyOutcome::Rejected(OtpRejection::Mismatch { remaining: 0 })
        );

        // After three mismatches even the correct code is rejected.
        assert_eq!(
            auth.verify_at(&code, t0()).unwrap(),
            VerifyOutcome::Rejected(OtpRejection::AttemptsExhausted)
        );
        assert_eq!(auth.stage(), AuthStage::PendingVerification);
    }

    #[test]
    fn reissue_invalidates_previous_code() {
        let dir = tempfile::tempdir().unwrap();
        let mut auth = session(&dir);
        auth.login_with_email_at("sam@example.com", t0()).unwrap();
        let old_code = auth.live_code().unwrap().to_string();

        auth.issue_at(t0() + Duration::seconds(90)).unwrap();
        let new_code = auth.live_code().unwrap().to_string();

        let outcome = auth
            .verify_at(&old_code, t0() + Duration::seconds(91))
            .unwrap();
        if old_code == new_code {
            // 1-in-900000 collision: the "old" code is the live one.
            assert_eq!(outcome, VerifyOutcome::Verified);
        } else {
            assert_eq!(
                outcome,
                VerifyOutcome::Rejected(OtpRejection::Mismatch { remaining: 2 })
            );
        }
    }

    #[test]
    fn resend_inside_cooldown_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut auth = session(&dir);
        auth.login_with_email_at("sam@example.com", t0()).unwrap();
        let issued_at = auth.live_record().unwrap().issued_at;

        let outcome = auth.resend_at(t0() + Duration::seconds(30)).unwrap();
        assert_eq!(outcome, ResendOutcome::CoolingDown { remaining_secs: 30 });
        // No new code was generated and the countdown did not move.
        assert_eq!(auth.live_record().unwrap().issued_at, issued_at);
        assert_eq!(auth.state.last_sent_at, Some(t0()));

        let outcome = auth.resend_at(t0() + Duration::seconds(60)).unwrap();
        assert_eq!(outcome, ResendOutcome::Sent);
        assert_eq!(
            auth.live_record().unwrap().issued_at,
            t0() + Duration::seconds(60)
        );
    }

    #[test]
    fn mismatch_message_pluralizes_attempts() {
        assert_eq!(
            OtpRejection::Mismatch { remaining: 2 }.to_string(),
            "Invalid OTP. You have 2 attempts left."
        );
        assert_eq!(
            OtpRejection::Mismatch { remaining: 1 }.to_string(),
            "Invalid OTP. You have 1 attempt left."
        );
    }

    #[test]
    fn state_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let mut auth = session(&dir);
        auth.login_with_email_at("sam@example.com", t0()).unwrap();
        let code = auth.live_code().unwrap().to_string();
        drop(auth);

        let mut reloaded = session(&dir);
        assert_eq!(reloaded.stage(), AuthStage::PendingVerification);
        assert_eq!(
            reloaded.verify_at(&code, t0()).unwrap(),
            VerifyOutcome::Verified
        );
    }

    #[test]
    fn logout_discards_everything() {
        let dir = tempfile::tempdir().unwrap();
        let mut auth = session(&dir);
        auth.login_with_email_at("sam@example.com", t0()).unwrap();

        auth.logout();
        assert_eq!(auth.stage(), AuthStage::Unauthenticated);
        assert!(!dir.path().join("auth.json").exists());

        let reloaded = session(&dir);
        assert_eq!(reloaded.stage(), AuthStage::Unauthenticated);
    }
}
