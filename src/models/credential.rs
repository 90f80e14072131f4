use async_graphql::{InputObject, SimpleObject};
use sqlx::FromRow;
use time::OffsetDateTime;
use tracing::info;

use crate::auth::Principal;
use crate::email::account::{PasswordChangedEmail, WelcomeEmail};
use crate::error::{NausError, NausResult};
use crate::models::member::Member;
use crate::models::sequence::MembershipNumber;
use crate::state::AppState;
use crate::util::{current_time, normalize_email, require, validate_email, validate_password};

#[derive(sqlx::Type, Copy, Clone, Debug, PartialEq, Eq)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
pub enum CredentialRole {
    Member,
    Admin,
}

/// The login of a member. Administrators log in through [`Admin`](crate::models::admin::Admin).
#[derive(FromRow, Clone, Debug)]
pub struct Credential {
    pub id: i32,
    pub membership_number: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: CredentialRole,
    pub is_active: bool,
    pub last_login: Option<OffsetDateTime>,
    pub login_count: i32,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires: Option<OffsetDateTime>,
    pub email_verified: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct NewCredential {
    pub membership_number: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: CredentialRole,
}

/// The member behind the token of the current request.
#[derive(Clone, Debug)]
pub struct CurrentMember {
    pub credential: Credential,
    pub member: Member,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct LoginPayload {
    pub token: String,
    pub member: Member,
}

pub struct LoginSession {
    pub token: String,
    pub credential: Credential,
    pub member: Member,
}

#[derive(InputObject, Clone, Debug)]
pub struct NewAccount {
    pub email: String,
    pub membership_number: String,
    pub password: String,
}

#[derive(InputObject, Clone, Debug)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

impl PasswordChange {
    pub fn validate(&self) -> NausResult<()> {
        require("currentPassword", &self.current_password)?;
        validate_password("newPassword", &self.new_password)?;
        if self.new_password != self.confirm_password {
            return Err(NausError::validation(
                "confirmPassword",
                "New passwords do not match",
            ));
        }

        Ok(())
    }
}

impl Credential {
    pub const INVALID_LOGIN: &'static str = "Invalid email or password";

    /// Checks a member's email and password and issues a session token.
    pub async fn login(email: &str, password: &str, state: &AppState) -> NausResult<LoginSession> {
        let email = normalize_email(email);
        let invalid = || NausError::Unauthorized(Self::INVALID_LOGIN.to_owned());

        let mut tx = state.store.begin().await?;
        let credential = tx
            .credential_with_email(&email)
            .await?
            .filter(|credential| credential.role == CredentialRole::Member)
            .ok_or_else(invalid)?;
        if !state.hasher.verify(password, &credential.password_hash)? {
            return Err(invalid());
        }
        if !credential.is_active {
            return Err(NausError::Forbidden("Account is inactive".to_owned()));
        }

        let credential = tx
            .record_login(credential.id, current_time())
            .await?
            .ok_or_else(invalid)?;
        let member = tx
            .member_with_number(&credential.membership_number)
            .await?
            .ok_or_else(|| {
                NausError::not_found(format!(
                    "No member with membership number {}",
                    credential.membership_number
                ))
            })?;
        tx.commit().await?;

        let token = state.tokens.issue(&Principal::member(&credential))?;
        info!(credential = credential.id, logins = credential.login_count, "member logged in");

        Ok(LoginSession {
            token,
            credential,
            member,
        })
    }

    /// Creates a login for a member who doesn't have one yet.
    ///
    /// The email and membership number must both match the member record.
    pub async fn create_account(account: NewAccount, state: &AppState) -> NausResult<Member> {
        validate_email("email", &account.email)?;
        require("membershipNumber", &account.membership_number)?;
        validate_password("password", &account.password)?;
        let email = normalize_email(&account.email);
        let number =
            MembershipNumber::parse_opt(&account.membership_number).map(|number| number.to_string());
        let no_match = || {
            NausError::not_found("No member found with that email and membership number")
        };
        let password_hash = state.hasher.hash(&account.password)?;

        let now = current_time();
        let mut tx = state.store.begin().await?;
        let mut member = tx
            .member_with_email(&email)
            .await?
            .filter(|member| number.as_deref() == Some(member.membership_number.as_str()))
            .ok_or_else(no_match)?;
        if member.has_account {
            return Err(NausError::conflict(
                "An account already exists for this member",
            ));
        }
        if tx.credential_with_email(&email).await?.is_some() {
            return Err(NausError::conflict("An account with this email already exists"));
        }

        tx.insert_credential(
            &NewCredential {
                membership_number: member.membership_number.clone(),
                email: email.clone(),
                password_hash,
                first_name: member.details.first_name.clone(),
                last_name: member.details.last_name.clone(),
                role: CredentialRole::Member,
            },
            now,
        )
        .await?;
        member.has_account = true;
        member.account_created = Some(now.into());
        member.updated_at = now.into();
        tx.save_member(&member).await?;
        tx.commit().await?;

        info!(number = %member.membership_number, "member account created");
        state
            .notifier
            .send(WelcomeEmail {
                name: member.full_name(),
                email,
                membership_number: member.membership_number.clone(),
                temporary_password: None,
                login_url: state.frontend_link("/login"),
            })
            .await;

        Ok(member)
    }

    /// Returns whether the confirmation email was sent.
    pub async fn change_password(
        id: i32,
        change: PasswordChange,
        state: &AppState,
    ) -> NausResult<bool> {
        change.validate()?;

        let mut tx = state.store.begin().await?;
        let mut credential = tx
            .credential_with_id(id)
            .await?
            .ok_or_else(|| NausError::not_found("Account not found"))?;
        if !state
            .hasher
            .verify(&change.current_password, &credential.password_hash)?
        {
            return Err(NausError::Unauthorized(
                "Current password is incorrect".to_owned(),
            ));
        }

        credential.password_hash = state.hasher.hash(&change.new_password)?;
        credential.updated_at = current_time();
        tx.save_credential(&credential).await?;
        tx.commit().await?;

        Ok(state
            .notifier
            .send(PasswordChangedEmail {
                name: format!("{} {}", credential.first_name, credential.last_name),
                email: credential.email,
            })
            .await)
    }

    /// Loads the active member a token was issued to.
    pub async fn authenticate(id: i32, state: &AppState) -> NausResult<CurrentMember> {
        let unauthorized = || NausError::Unauthorized("Invalid or expired token".to_owned());

        let mut tx = state.store.begin().await?;
        let credential = tx
            .credential_with_id(id)
            .await?
            .filter(|credential| credential.is_active)
            .ok_or_else(unauthorized)?;
        let member = tx
            .member_with_number(&credential.membership_number)
            .await?
            .ok_or_else(unauthorized)?;

        Ok(CurrentMember { credential, member })
    }
}
