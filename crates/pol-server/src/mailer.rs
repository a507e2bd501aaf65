//! Delivery seam for password-reset codes.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("mail dispatch failed: {0}")]
pub struct MailError(pub String);

/// Sends a one-time reset code to a user's email address.
///
/// The binary owns an implementation behind `Arc<dyn OtpMailer>`; a deployment
/// with real SMTP wires its own, and tests inject a capturing one.
pub trait OtpMailer: Send + Sync {
  fn send_otp(&self, to: &str, otp: &str) -> Result<(), MailError>;
}

/// Logs the dispatch instead of sending mail. The code itself is only emitted
/// at DEBUG.
pub struct LogMailer;

impl OtpMailer for LogMailer {
  fn send_otp(&self, to: &str, otp: &str) -> Result<(), MailError> {
    tracing::info!(%to, "dispatching password-reset code");
    tracing::debug!(%otp, "reset code for local delivery");
    Ok(())
  }
}
