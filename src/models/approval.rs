//! Deciding on membership applications.
//!
//! Every decision is a single transaction over the application, member,
//! credential and sequence tables, gated by a conditional status update. The
//! resulting email is only sent after that transaction commits, and a failed
//! email never undoes the decision.

use async_graphql::SimpleObject;
use tracing::info;

use crate::email::application::{ApprovalEmail, RejectionEmail};
use crate::error::{NausError, NausResult};
use crate::models::application::{Application, ApplicationStatus, PaymentStatus, Review};
use crate::models::credential::{CredentialRole, NewCredential};
use crate::models::member::{MembershipType, NewMember};
use crate::models::sequence::allocate;
use crate::state::AppState;
use crate::store::{Store, Transaction};
use crate::util::{current_time, non_blank, temporary_password};

pub const DEFAULT_REJECTION_REASON: &str = "Application did not meet the required criteria";

#[derive(SimpleObject, Clone, Debug)]
pub struct ApprovalOutcome {
    pub membership_number: String,
    /// Whether the approval email with the temporary password went out
    pub email_sent: bool,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct ReviewOutcome {
    pub application: Application,
    /// Only set when the application was approved
    pub membership_number: Option<String>,
    pub email_sent: bool,
}

/// Loads an application that is still awaiting a decision.
async fn undecided_application(
    tx: &mut dyn Transaction,
    id: i32,
) -> NausResult<Application> {
    let application = tx
        .application_with_id(id)
        .await?
        .ok_or_else(|| NausError::not_found(format!("No application with id {}", id)))?;
    if !ApplicationStatus::AWAITING_DECISION.contains(&application.status) {
        return Err(already_decided(&application));
    }

    Ok(application)
}

fn already_decided(application: &Application) -> NausError {
    NausError::invalid_state(format!(
        "Application {} is {} and can no longer be reviewed",
        application.id,
        application.status.as_str()
    ))
}

/// Records the decision unless another reviewer got there first.
async fn transition(
    tx: &mut dyn Transaction,
    application: &Application,
    review: &Review,
) -> NausResult<()> {
    if tx
        .update_application_status(application.id, review, ApplicationStatus::AWAITING_DECISION)
        .await?
    {
        Ok(())
    } else {
        Err(already_decided(application))
    }
}

/// Approves an application, making the applicant a member with a login.
///
/// A member that already exists with the applicant's email keeps their
/// membership number; otherwise the next number for the current year is
/// allocated.
pub async fn approve(
    application_id: i32,
    reviewer: i32,
    notes: Option<String>,
    state: &AppState,
) -> NausResult<ApprovalOutcome> {
    let temporary_password = temporary_password();
    let password_hash = state.hasher.hash(&temporary_password)?;
    let now = current_time();

    let mut tx = state.store.begin().await?;
    let application = undecided_application(&mut *tx, application_id).await?;
    let review = Review {
        status: ApplicationStatus::Approved,
        reviewer: Some(reviewer),
        notes: non_blank(notes),
        reviewed_at: now,
    };
    transition(&mut *tx, &application, &review).await?;

    let email = application.details.email.clone();
    let existing_member = tx.member_with_email(&email).await?;
    let membership_number = match &existing_member {
        Some(member) => member.membership_number.clone(),
        None => allocate(now.year(), &mut *tx).await?.to_string(),
    };

    match existing_member {
        Some(mut member) => {
            member.has_account = true;
            member.account_created = Some(now.into());
            member.updated_at = now.into();
            tx.save_member(&member).await?;
        }
        None => {
            tx.insert_member(
                &NewMember {
                    membership_number: membership_number.clone(),
                    details: application.details.clone(),
                    mbbs_certificate: application.mbbs_certificate.clone(),
                    fellowship_certificate: application.fellowship_certificate.clone(),
                    membership_type: MembershipType::New,
                    has_account: true,
                    account_created: Some(now),
                },
                now,
            )
            .await?;
        }
    }

    match tx.credential_with_email(&email).await? {
        Some(mut credential) => {
            credential.membership_number = membership_number.clone();
            credential.password_hash = password_hash;
            credential.first_name = application.details.first_name.clone();
            credential.last_name = application.details.last_name.clone();
            credential.is_active = true;
            credential.updated_at = now;
            tx.save_credential(&credential).await?;
        }
        None => {
            tx.insert_credential(
                &NewCredential {
                    membership_number: membership_number.clone(),
                    email: email.clone(),
                    password_hash,
                    first_name: application.details.first_name.clone(),
                    last_name: application.details.last_name.clone(),
                    role: CredentialRole::Member,
                },
                now,
            )
            .await?;
        }
    }

    tx.attach_membership_number(application_id, &membership_number, now)
        .await?;
    tx.commit().await?;
    info!(
        application = application_id,
        reviewer,
        number = %membership_number,
        "application approved"
    );

    let email_sent = state
        .notifier
        .send(ApprovalEmail {
            name: application.details.full_name(),
            email,
            membership_number: membership_number.clone(),
            temporary_password,
            login_url: state.frontend_link("/login"),
        })
        .await;

    Ok(ApprovalOutcome {
        membership_number,
        email_sent,
    })
}

/// Rejects an application and revokes any login tied to its email.
///
/// Returns whether the rejection email was sent.
pub async fn reject(
    application_id: i32,
    reviewer: i32,
    notes: Option<String>,
    state: &AppState,
) -> NausResult<bool> {
    let notes = non_blank(notes);
    let now = current_time();

    let mut tx = state.store.begin().await?;
    let application = undecided_application(&mut *tx, application_id).await?;
    let review = Review {
        status: ApplicationStatus::Rejected,
        reviewer: Some(reviewer),
        notes: notes.clone(),
        reviewed_at: now,
    };
    transition(&mut *tx, &application, &review).await?;

    let email = &application.details.email;
    if let Some(mut credential) = tx.credential_with_email(email).await? {
        credential.is_active = false;
        credential.updated_at = now;
        tx.save_credential(&credential).await?;
    }
    if let Some(mut member) = tx.member_with_email(email).await? {
        member.has_account = false;
        member.updated_at = now.into();
        tx.save_member(&member).await?;
    }
    tx.commit().await?;
    info!(application = application_id, reviewer, "application rejected");

    Ok(state
        .notifier
        .send(RejectionEmail {
            name: application.details.full_name(),
            email: application.details.email.clone(),
            reason: notes.unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_owned()),
        })
        .await)
}

/// Flags a pending application as being looked at. No email is sent.
pub async fn mark_under_review(
    application_id: i32,
    reviewer: i32,
    notes: Option<String>,
    store: &dyn Store,
) -> NausResult<Application> {
    let mut tx = store.begin().await?;
    let application = tx
        .application_with_id(application_id)
        .await?
        .ok_or_else(|| NausError::not_found(format!("No application with id {}", application_id)))?;
    let review = Review {
        status: ApplicationStatus::UnderReview,
        reviewer: Some(reviewer),
        notes: non_blank(notes),
        reviewed_at: current_time(),
    };
    if !tx
        .update_application_status(application_id, &review, &[ApplicationStatus::Pending])
        .await?
    {
        return Err(already_decided(&application));
    }
    let application = tx
        .application_with_id(application_id)
        .await?
        .ok_or_else(|| NausError::not_found(format!("No application with id {}", application_id)))?;
    tx.commit().await?;

    Ok(application)
}

/// Dispatches an admin's decision to the matching workflow.
pub async fn review(
    application_id: i32,
    status: ApplicationStatus,
    reviewer: i32,
    notes: Option<String>,
    state: &AppState,
) -> NausResult<ReviewOutcome> {
    let (membership_number, email_sent) = match status {
        ApplicationStatus::Approved => {
            let outcome = approve(application_id, reviewer, notes, state).await?;
            (Some(outcome.membership_number), outcome.email_sent)
        }
        ApplicationStatus::Rejected => {
            let email_sent = reject(application_id, reviewer, notes, state).await?;
            (None, email_sent)
        }
        ApplicationStatus::UnderReview => {
            mark_under_review(application_id, reviewer, notes, &*state.store).await?;
            (None, false)
        }
        ApplicationStatus::Pending => {
            return Err(NausError::validation(
                "status",
                "An application cannot be moved back to pending",
            ));
        }
    };

    Ok(ReviewOutcome {
        application: Application::with_id(application_id, &*state.store).await?,
        membership_number,
        email_sent,
    })
}

/// Payment is tracked as a flag only.
pub async fn set_payment_status(
    application_id: i32,
    status: PaymentStatus,
    store: &dyn Store,
) -> NausResult<Application> {
    let mut tx = store.begin().await?;
    if !tx
        .set_payment_status(application_id, status, current_time())
        .await?
    {
        return Err(NausError::not_found(format!(
            "No application with id {}",
            application_id
        )));
    }
    let application = tx
        .application_with_id(application_id)
        .await?
        .ok_or_else(|| NausError::not_found(format!("No application with id {}", application_id)))?;
    tx.commit().await?;

    Ok(application)
}
