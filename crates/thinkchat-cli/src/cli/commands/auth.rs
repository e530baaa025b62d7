//! Auth command handlers.

use anyhow::{Result, bail};
use thinkchat_core::auth::{AuthSession, AuthStage, OtpDelivery, ResendOutcome, VerifyOutcome};
use thinkchat_core::store::Store;

/// Prints issued codes to stdout in place of a real delivery channel.
struct StdoutDelivery;

impl OtpDelivery for StdoutDelivery {
    fn deliver(&self, email: &str, code: &str) {
        println!("[mock delivery] Verification code for {email}: {code}");
    }
}

fn session(store: &Store) -> AuthSession {
    AuthSession::load(store.clone(), Box::new(StdoutDelivery))
}

pub fn login_email(store: &Store, email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        bail!("'{email}' is not a valid email address");
    }

    let mut auth = session(store);
    auth.login_with_email(email)?;
    println!("A 6-digit code was sent to {email}.");
    println!("Run `thinkchat verify <CODE>` to finish signing in.");
    Ok(())
}

pub fn login_google(store: &Store) -> Result<()> {
    let mut auth = session(store);
    auth.login_with_provider()?;

    if let Some(identity) = auth.identity() {
        println!(
            "Signed in via Google as {} <{}>.",
            identity.display_name, identity.email
        );
    }

    // The provider identity still needs OTP confirmation.
    auth.issue()?;
    println!("Run `thinkchat verify <CODE>` to finish signing in.");
    Ok(())
}

pub fn verify(store: &Store, code: &str) -> Result<()> {
    let mut auth = session(store);
    match auth.verify(code)? {
        VerifyOutcome::Verified => {
            println!("You're in. Run `thinkchat` to start chatting.");
            Ok(())
        }
        VerifyOutcome::Rejected(rejection) => bail!("{rejection}"),
    }
}

pub fn resend(store: &Store) -> Result<()> {
    let mut auth = session(store);
    match auth.resend()? {
        ResendOutcome::Sent => {
            println!("A fresh code was sent. The previous code is no longer valid.");
            Ok(())
        }
        ResendOutcome::CoolingDown { remaining_secs } => {
            bail!("Please wait {remaining_secs}s before requesting another code")
        }
    }
}

pub fn logout(store: &Store) -> Result<()> {
    let mut auth = session(store);
    auth.logout();
    println!("Signed out.");
    Ok(())
}

pub fn whoami(store: &Store) -> Result<()> {
    let auth = session(store);
    match (auth.stage(), auth.identity()) {
        (AuthStage::Verified, Some(identity)) => {
            println!("{} <{}>", identity.display_name, identity.email);
            Ok(())
        }
        (AuthStage::PendingVerification, Some(identity)) => {
            println!(
                "{} <{}> (pending verification)",
                identity.display_name, identity.email
            );
            Ok(())
        }
        _ => bail!("Not signed in. Run `thinkchat login --email <EMAIL>` or `thinkchat login --google`"),
    }
}

/// Bails unless a verified identity is present.
pub fn require_verified(store: &Store) -> Result<()> {
    let auth = session(store);
    if auth.is_verified() {
        return Ok(());
    }
    bail!("Not signed in. Run `thinkchat login --email <EMAIL>` or `thinkchat login --google`")
}
