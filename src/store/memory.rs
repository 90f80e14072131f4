//! An in-process store for tests and local demos.
//!
//! A transaction holds the store's lock for its whole lifetime and works on a
//! copy of the data, which replaces the shared state on commit. Transactions
//! therefore run one at a time, and dropping one discards its writes.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{NausError, NausResult};
use crate::models::admin::{Admin, NewAdmin};
use crate::models::application::{
    Application, ApplicationStatus, NewApplicationRecord, PaymentStatus, Review,
};
use crate::models::credential::{Credential, NewCredential};
use crate::models::member::{Member, MemberFilter, MemberOrder, MemberStatus, NewMember};
use crate::models::sequence::MembershipNumber;
use crate::models::PageRequest;
use crate::store::{
    AdminRecords, ApplicationRecords, CredentialRecords, MemberRecords, SequenceRecords, Store,
    Transaction,
};

#[derive(Clone, Default)]
struct State {
    applications: Vec<Application>,
    members: Vec<Member>,
    credentials: Vec<Credential>,
    admins: Vec<Admin>,
    sequences: BTreeMap<i32, i64>,
    last_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> NausResult<Box<dyn Transaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();

        Ok(Box::new(MemoryTransaction { guard, working }))
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<State>,
    working: State,
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> NausResult<()> {
        let MemoryTransaction { mut guard, working } = *self;
        *guard = working;

        Ok(())
    }
}

fn paginate<T: Clone>(items: Vec<T>, page: PageRequest) -> (Vec<T>, i64) {
    let total = items.len() as i64;
    let page = items
        .into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(usize::try_from(page.limit).unwrap_or_default())
        .collect();

    (page, total)
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn member_matches(member: &Member, filter: &MemberFilter) -> bool {
    if let Some(search) = &filter.search {
        let details = &member.details;
        if ![
            &details.first_name,
            &details.last_name,
            &details.email,
            &member.membership_number,
        ]
        .iter()
        .any(|field| contains_ignore_case(field, search))
        {
            return false;
        }
    }

    filter
        .specialty
        .as_ref()
        .map_or(true, |specialty| &member.details.area_of_specialty == specialty)
        && filter.status.map_or(true, |status| {
            member.is_active == (status == MemberStatus::Active)
        })
        && filter
            .membership_type
            .map_or(true, |membership_type| member.membership_type == membership_type)
        && filter
            .has_account
            .map_or(true, |has_account| member.has_account == has_account)
        && (!filter.directory_only || (member.is_active && member.show_in_directory))
}

#[async_trait]
impl ApplicationRecords for MemoryTransaction {
    async fn insert_application(
        &mut self,
        record: &NewApplicationRecord,
        now: OffsetDateTime,
    ) -> NausResult<Application> {
        let state = &mut self.working;
        if state
            .applications
            .iter()
            .any(|application| application.details.email == record.details.email)
        {
            return Err(NausError::conflict(
                "An application with this email already exists",
            ));
        }

        let application = Application {
            id: state.next_id(),
            details: record.details.clone(),
            mbbs_certificate: record.mbbs_certificate.clone(),
            fellowship_certificate: record.fellowship_certificate.clone(),
            declaration: record.declaration,
            status: record.status,
            payment_status: PaymentStatus::NotPaid,
            reviewed_by: record.review.as_ref().and_then(|review| review.reviewer),
            reviewed_at: record.review.as_ref().map(|review| review.reviewed_at.into()),
            admin_notes: record.review.as_ref().and_then(|review| review.notes.clone()),
            membership_number: record.membership_number.clone(),
            created_at: now.into(),
            updated_at: now.into(),
        };
        state.applications.push(application.clone());

        Ok(application)
    }

    async fn application_with_id(&mut self, id: i32) -> NausResult<Option<Application>> {
        Ok(self
            .working
            .applications
            .iter()
            .find(|application| application.id == id)
            .cloned())
    }

    async fn application_with_email(&mut self, email: &str) -> NausResult<Option<Application>> {
        Ok(self
            .working
            .applications
            .iter()
            .find(|application| application.details.email == email)
            .cloned())
    }

    async fn applications(
        &mut self,
        status: Option<ApplicationStatus>,
    ) -> NausResult<Vec<Application>> {
        let mut applications: Vec<Application> = self
            .working
            .applications
            .iter()
            .filter(|application| status.map_or(true, |status| application.status == status))
            .cloned()
            .collect();
        applications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(applications)
    }

    async fn update_application_status(
        &mut self,
        id: i32,
        review: &Review,
        expected: &[ApplicationStatus],
    ) -> NausResult<bool> {
        match self
            .working
            .applications
            .iter_mut()
            .find(|application| application.id == id && expected.contains(&application.status))
        {
            Some(application) => {
                application.status = review.status;
                application.reviewed_by = review.reviewer;
                application.reviewed_at = Some(review.reviewed_at.into());
                application.admin_notes = review.notes.clone();
                application.updated_at = review.reviewed_at.into();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn attach_membership_number(
        &mut self,
        id: i32,
        number: &str,
        now: OffsetDateTime,
    ) -> NausResult<bool> {
        match self
            .working
            .applications
            .iter_mut()
            .find(|application| application.id == id)
        {
            Some(application) => {
                application.membership_number = Some(number.to_owned());
                application.updated_at = now.into();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_payment_status(
        &mut self,
        id: i32,
        status: PaymentStatus,
        now: OffsetDateTime,
    ) -> NausResult<bool> {
        match self
            .working
            .applications
            .iter_mut()
            .find(|application| application.id == id)
        {
            Some(application) => {
                application.payment_status = status;
                application.updated_at = now.into();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_applications_for_number(&mut self, number: &str) -> NausResult<u64> {
        let before = self.working.applications.len();
        self.working
            .applications
            .retain(|application| application.membership_number.as_deref() != Some(number));

        Ok((before - self.working.applications.len()) as u64)
    }
}

#[async_trait]
impl MemberRecords for MemoryTransaction {
    async fn insert_member(
        &mut self,
        member: &NewMember,
        now: OffsetDateTime,
    ) -> NausResult<Member> {
        let state = &mut self.working;
        if state.members.iter().any(|existing| {
            existing.details.email == member.details.email
                || MembershipNumber::same(&existing.membership_number, &member.membership_number)
        }) {
            return Err(NausError::conflict(
                "A member with this email or membership number already exists",
            ));
        }

        let member = Member {
            id: state.next_id(),
            membership_number: member.membership_number.clone(),
            details: member.details.clone(),
            mbbs_certificate: member.mbbs_certificate.clone(),
            fellowship_certificate: member.fellowship_certificate.clone(),
            profile_photo: None,
            is_active: true,
            membership_type: member.membership_type,
            has_account: member.has_account,
            account_created: member.account_created.map(Into::into),
            show_in_directory: true,
            joined_date: now.into(),
            created_at: now.into(),
            updated_at: now.into(),
        };
        state.members.push(member.clone());

        Ok(member)
    }

    async fn member_with_id(&mut self, id: i32) -> NausResult<Option<Member>> {
        Ok(self
            .working
            .members
            .iter()
            .find(|member| member.id == id)
            .cloned())
    }

    async fn member_for_update(&mut self, id: i32) -> NausResult<Option<Member>> {
        self.member_with_id(id).await
    }

    async fn member_with_number(&mut self, number: &str) -> NausResult<Option<Member>> {
        Ok(self
            .working
            .members
            .iter()
            .find(|member| MembershipNumber::same(&member.membership_number, number))
            .cloned())
    }

    async fn member_with_email(&mut self, email: &str) -> NausResult<Option<Member>> {
        Ok(self
            .working
            .members
            .iter()
            .find(|member| member.details.email == email)
            .cloned())
    }

    async fn members(&mut self, filter: &MemberFilter) -> NausResult<(Vec<Member>, i64)> {
        let mut members: Vec<Member> = self
            .working
            .members
            .iter()
            .filter(|member| member_matches(member, filter))
            .cloned()
            .collect();
        match filter.order {
            MemberOrder::Newest => {
                members.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
            MemberOrder::Name => members.sort_by(|a, b| {
                (&a.details.last_name, &a.details.first_name)
                    .cmp(&(&b.details.last_name, &b.details.first_name))
            }),
        }

        Ok(paginate(members, filter.page))
    }

    async fn save_member(&mut self, member: &Member) -> NausResult<()> {
        let members = &mut self.working.members;
        if members
            .iter()
            .any(|other| other.id != member.id && other.details.email == member.details.email)
        {
            return Err(NausError::conflict(
                "A member with this email already exists",
            ));
        }

        match members.iter_mut().find(|existing| existing.id == member.id) {
            Some(existing) => {
                *existing = member.clone();
                Ok(())
            }
            None => Err(NausError::not_found(format!("No member with id {}", member.id))),
        }
    }

    async fn delete_member(&mut self, id: i32) -> NausResult<bool> {
        let before = self.working.members.len();
        self.working.members.retain(|member| member.id != id);

        Ok(self.working.members.len() < before)
    }

    async fn highest_member_sequence(&mut self, year: i32) -> NausResult<Option<i64>> {
        Ok(self
            .working
            .members
            .iter()
            .filter_map(|member| MembershipNumber::parse_opt(&member.membership_number))
            .filter(|number| number.year() == year)
            .map(|number| number.sequence())
            .max())
    }
}

#[async_trait]
impl CredentialRecords for MemoryTransaction {
    async fn insert_credential(
        &mut self,
        credential: &NewCredential,
        now: OffsetDateTime,
    ) -> NausResult<Credential> {
        let state = &mut self.working;
        if state
            .credentials
            .iter()
            .any(|existing| existing.email == credential.email)
        {
            return Err(NausError::conflict("An account with this email already exists"));
        }

        let credential = Credential {
            id: state.next_id(),
            membership_number: credential.membership_number.clone(),
            email: credential.email.clone(),
            password_hash: credential.password_hash.clone(),
            first_name: credential.first_name.clone(),
            last_name: credential.last_name.clone(),
            role: credential.role,
            is_active: true,
            last_login: None,
            login_count: 0,
            reset_token_hash: None,
            reset_token_expires: None,
            email_verified: false,
            created_at: now,
            updated_at: now,
        };
        state.credentials.push(credential.clone());

        Ok(credential)
    }

    async fn credential_with_id(&mut self, id: i32) -> NausResult<Option<Credential>> {
        Ok(self
            .working
            .credentials
            .iter()
            .find(|credential| credential.id == id)
            .cloned())
    }

    async fn credential_with_email(&mut self, email: &str) -> NausResult<Option<Credential>> {
        Ok(self
            .working
            .credentials
            .iter()
            .find(|credential| credential.email == email)
            .cloned())
    }

    async fn credential_with_number(&mut self, number: &str) -> NausResult<Option<Credential>> {
        Ok(self
            .working
            .credentials
            .iter()
            .find(|credential| credential.membership_number == number)
            .cloned())
    }

    async fn credential_with_reset_token(
        &mut self,
        token_hash: &str,
    ) -> NausResult<Option<Credential>> {
        Ok(self
            .working
            .credentials
            .iter()
            .find(|credential| credential.reset_token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn save_credential(&mut self, credential: &Credential) -> NausResult<()> {
        let credentials = &mut self.working.credentials;
        if credentials
            .iter()
            .any(|other| other.id != credential.id && other.email == credential.email)
        {
            return Err(NausError::conflict("An account with this email already exists"));
        }

        match credentials
            .iter_mut()
            .find(|existing| existing.id == credential.id)
        {
            Some(existing) => {
                *existing = credential.clone();
                Ok(())
            }
            None => Err(NausError::not_found("Account not found")),
        }
    }

    async fn record_login(
        &mut self,
        id: i32,
        now: OffsetDateTime,
    ) -> NausResult<Option<Credential>> {
        Ok(self
            .working
            .credentials
            .iter_mut()
            .find(|credential| credential.id == id)
            .map(|credential| {
                credential.last_login = Some(now);
                credential.login_count += 1;
                credential.updated_at = now;
                credential.clone()
            }))
    }

    async fn delete_credentials_for_number(&mut self, number: &str) -> NausResult<u64> {
        let before = self.working.credentials.len();
        self.working
            .credentials
            .retain(|credential| credential.membership_number != number);

        Ok((before - self.working.credentials.len()) as u64)
    }
}

#[async_trait]
impl AdminRecords for MemoryTransaction {
    async fn insert_admin(&mut self, admin: &NewAdmin, now: OffsetDateTime) -> NausResult<Admin> {
        let state = &mut self.working;
        if state.admins.iter().any(|existing| existing.email == admin.email) {
            return Err(NausError::conflict("An admin with this email already exists"));
        }

        let admin = Admin {
            id: state.next_id(),
            email: admin.email.clone(),
            name: admin.name.clone(),
            role: admin.role,
            is_active: true,
            last_login: None,
            login_count: 0,
            created_at: now.into(),
            updated_at: now.into(),
            password_hash: admin.password_hash.clone(),
        };
        state.admins.push(admin.clone());

        Ok(admin)
    }

    async fn admin_with_id(&mut self, id: i32) -> NausResult<Option<Admin>> {
        Ok(self
            .working
            .admins
            .iter()
            .find(|admin| admin.id == id)
            .cloned())
    }

    async fn admin_with_email(&mut self, email: &str) -> NausResult<Option<Admin>> {
        Ok(self
            .working
            .admins
            .iter()
            .find(|admin| admin.email == email)
            .cloned())
    }

    async fn admins(
        &mut self,
        search: Option<&str>,
        page: PageRequest,
    ) -> NausResult<(Vec<Admin>, i64)> {
        let mut admins: Vec<Admin> = self
            .working
            .admins
            .iter()
            .filter(|admin| {
                search.map_or(true, |search| {
                    contains_ignore_case(&admin.name, search)
                        || contains_ignore_case(&admin.email, search)
                })
            })
            .cloned()
            .collect();
        admins.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(paginate(admins, page))
    }

    async fn save_admin(&mut self, admin: &Admin) -> NausResult<()> {
        let admins = &mut self.working.admins;
        if admins
            .iter()
            .any(|other| other.id != admin.id && other.email == admin.email)
        {
            return Err(NausError::conflict("An admin with this email already exists"));
        }

        match admins.iter_mut().find(|existing| existing.id == admin.id) {
            Some(existing) => {
                *existing = admin.clone();
                Ok(())
            }
            None => Err(NausError::not_found(format!("No admin with id {}", admin.id))),
        }
    }

    async fn record_admin_login(&mut self, id: i32, now: OffsetDateTime) -> NausResult<Option<Admin>> {
        Ok(self
            .working
            .admins
            .iter_mut()
            .find(|admin| admin.id == id)
            .map(|admin| {
                admin.last_login = Some(now.into());
                admin.login_count += 1;
                admin.updated_at = now.into();
                admin.clone()
            }))
    }
}

#[async_trait]
impl SequenceRecords for MemoryTransaction {
    async fn increment_sequence(&mut self, year: i32) -> NausResult<Option<i64>> {
        Ok(self.working.sequences.get_mut(&year).map(|current| {
            *current += 1;
            *current
        }))
    }

    async fn create_sequence(&mut self, year: i32, start: i64) -> NausResult<i64> {
        let current = self
            .working
            .sequences
            .entry(year)
            .and_modify(|current| *current += 1)
            .or_insert(start);

        Ok(*current)
    }

    async fn raise_sequence(&mut self, year: i32, floor: i64) -> NausResult<i64> {
        let current = self.working.sequences.entry(year).or_insert(floor);
        *current = (*current).max(floor);

        Ok(*current)
    }
}
