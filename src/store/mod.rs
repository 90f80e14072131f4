//! Persistence for applications, members, credentials, admins and the
//! membership sequence.
//!
//! All access goes through a [`Transaction`] obtained from a [`Store`]. A
//! transaction that is dropped without [`Transaction::commit`] is rolled back,
//! which is how every early return in a workflow aborts its writes.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::error::NausResult;
use crate::models::admin::{Admin, NewAdmin};
use crate::models::application::{Application, ApplicationStatus, NewApplicationRecord, PaymentStatus, Review};
use crate::models::credential::{Credential, NewCredential};
use crate::models::member::{Member, MemberFilter, NewMember};
use crate::models::PageRequest;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> NausResult<Box<dyn Transaction>>;
}

#[async_trait]
pub trait Transaction:
    ApplicationRecords + MemberRecords + CredentialRecords + AdminRecords + SequenceRecords + Send
{
    async fn commit(self: Box<Self>) -> NausResult<()>;
}

#[async_trait]
pub trait ApplicationRecords: Send {
    /// Fails with a conflict if the email already has an application.
    async fn insert_application(
        &mut self,
        record: &NewApplicationRecord,
        now: OffsetDateTime,
    ) -> NausResult<Application>;
    async fn application_with_id(&mut self, id: i32) -> NausResult<Option<Application>>;
    async fn application_with_email(&mut self, email: &str) -> NausResult<Option<Application>>;
    /// Newest first, optionally only those with the given status.
    async fn applications(
        &mut self,
        status: Option<ApplicationStatus>,
    ) -> NausResult<Vec<Application>>;
    /// Records the review, but only if the current status is one of `expected`.
    ///
    /// Returns whether a row was changed; this is the authority on whether a
    /// concurrent reviewer got there first.
    async fn update_application_status(
        &mut self,
        id: i32,
        review: &Review,
        expected: &[ApplicationStatus],
    ) -> NausResult<bool>;
    async fn attach_membership_number(
        &mut self,
        id: i32,
        number: &str,
        now: OffsetDateTime,
    ) -> NausResult<bool>;
    async fn set_payment_status(
        &mut self,
        id: i32,
        status: PaymentStatus,
        now: OffsetDateTime,
    ) -> NausResult<bool>;
    async fn delete_applications_for_number(&mut self, number: &str) -> NausResult<u64>;
}

#[async_trait]
pub trait MemberRecords: Send {
    async fn insert_member(&mut self, member: &NewMember, now: OffsetDateTime)
        -> NausResult<Member>;
    async fn member_with_id(&mut self, id: i32) -> NausResult<Option<Member>>;
    /// Like [`member_with_id`](Self::member_with_id), but locks the row until the
    /// transaction ends.
    async fn member_for_update(&mut self, id: i32) -> NausResult<Option<Member>>;
    async fn member_with_number(&mut self, number: &str) -> NausResult<Option<Member>>;
    async fn member_with_email(&mut self, email: &str) -> NausResult<Option<Member>>;
    /// One page of matching members and the total number of matches.
    async fn members(&mut self, filter: &MemberFilter) -> NausResult<(Vec<Member>, i64)>;
    /// Writes every mutable column of the member back.
    async fn save_member(&mut self, member: &Member) -> NausResult<()>;
    async fn delete_member(&mut self, id: i32) -> NausResult<bool>;
    /// The highest sequence among members numbered in `year`, in either format.
    async fn highest_member_sequence(&mut self, year: i32) -> NausResult<Option<i64>>;
}

#[async_trait]
pub trait CredentialRecords: Send {
    async fn insert_credential(
        &mut self,
        credential: &NewCredential,
        now: OffsetDateTime,
    ) -> NausResult<Credential>;
    async fn credential_with_id(&mut self, id: i32) -> NausResult<Option<Credential>>;
    async fn credential_with_email(&mut self, email: &str) -> NausResult<Option<Credential>>;
    async fn credential_with_number(&mut self, number: &str) -> NausResult<Option<Credential>>;
    async fn credential_with_reset_token(
        &mut self,
        token_hash: &str,
    ) -> NausResult<Option<Credential>>;
    async fn save_credential(&mut self, credential: &Credential) -> NausResult<()>;
    /// Bumps the login counter in place and returns the updated credential.
    async fn record_login(
        &mut self,
        id: i32,
        now: OffsetDateTime,
    ) -> NausResult<Option<Credential>>;
    async fn delete_credentials_for_number(&mut self, number: &str) -> NausResult<u64>;
}

#[async_trait]
pub trait AdminRecords: Send {
    async fn insert_admin(&mut self, admin: &NewAdmin, now: OffsetDateTime) -> NausResult<Admin>;
    async fn admin_with_id(&mut self, id: i32) -> NausResult<Option<Admin>>;
    async fn admin_with_email(&mut self, email: &str) -> NausResult<Option<Admin>>;
    async fn admins(
        &mut self,
        search: Option<&str>,
        page: PageRequest,
    ) -> NausResult<(Vec<Admin>, i64)>;
    async fn save_admin(&mut self, admin: &Admin) -> NausResult<()>;
    async fn record_admin_login(&mut self, id: i32, now: OffsetDateTime) -> NausResult<Option<Admin>>;
}

#[async_trait]
pub trait SequenceRecords: Send {
    /// Atomically advances the counter for `year`, or `None` if it has no row yet.
    async fn increment_sequence(&mut self, year: i32) -> NausResult<Option<i64>>;
    /// Creates the counter at `start`. If another transaction created it first,
    /// advances that row instead. Returns the value now held.
    async fn create_sequence(&mut self, year: i32, start: i64) -> NausResult<i64>;
    /// Ensures the counter is at least `floor`.
    async fn raise_sequence(&mut self, year: i32, floor: i64) -> NausResult<i64>;
}
