use time::Duration;
use tracing::info;

use crate::email::account::{PasswordChangedEmail, ResetPasswordEmail};
use crate::error::{NausError, NausResult};
use crate::state::AppState;
use crate::util::{current_time, generate_reset_token, hash_token, normalize_email, validate_password};

pub struct PasswordReset;

impl PasswordReset {
    /// Returned whether or not an account exists, so the response can't be
    /// used to discover which emails are registered.
    pub const REQUESTED_MESSAGE: &'static str =
        "If an account exists with that email, a password reset link has been sent.";
    pub const LIFETIME: Duration = Duration::hours(1);

    /// Emails a reset link to the account with the given email, if there is one.
    ///
    /// Only the hash of the token is stored; the plaintext only exists in the email.
    pub async fn request(email: &str, state: &AppState) -> NausResult<&'static str> {
        let email = normalize_email(email);
        let now = current_time();

        let mut tx = state.store.begin().await?;
        let credential = match tx.credential_with_email(&email).await? {
            Some(credential) if credential.is_active => credential,
            _ => return Ok(Self::REQUESTED_MESSAGE),
        };

        let token = generate_reset_token();
        let mut credential = credential;
        credential.reset_token_hash = Some(hash_token(&token));
        credential.reset_token_expires = Some(now + Self::LIFETIME);
        credential.updated_at = now;
        tx.save_credential(&credential).await?;
        tx.commit().await?;

        info!(credential = credential.id, "password reset requested");
        state
            .notifier
            .send(ResetPasswordEmail {
                name: format!("{} {}", credential.first_name, credential.last_name),
                email: credential.email.clone(),
                reset_link: state.frontend_link(&format!("/reset-password?token={}", token)),
            })
            .await;

        Ok(Self::REQUESTED_MESSAGE)
    }

    /// Sets a new password using a token from a reset email. Tokens work once.
    pub async fn redeem(token: &str, new_password: &str, state: &AppState) -> NausResult<()> {
        validate_password("password", new_password)?;
        let now = current_time();

        let mut tx = state.store.begin().await?;
        let mut credential = tx
            .credential_with_reset_token(&hash_token(token.trim()))
            .await?
            .ok_or_else(|| {
                NausError::validation("token", "Invalid or expired password reset token")
            })?;
        if credential
            .reset_token_expires
            .map_or(true, |expires| expires < now)
        {
            return Err(NausError::validation(
                "token",
                "Password reset token has expired. Please request another password reset.",
            ));
        }

        credential.password_hash = state.hasher.hash(new_password)?;
        credential.reset_token_hash = None;
        credential.reset_token_expires = None;
        credential.updated_at = now;
        tx.save_credential(&credential).await?;
        tx.commit().await?;

        info!(credential = credential.id, "password reset");
        state
            .notifier
            .send(PasswordChangedEmail {
                name: format!("{} {}", credential.first_name, credential.last_name),
                email: credential.email,
            })
            .await;

        Ok(())
    }
}
