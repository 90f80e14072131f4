use async_graphql::{Enum, InputObject, MaybeUndefined, SimpleObject};
use sqlx::FromRow;
use time::OffsetDateTime;
use tracing::info;

use crate::email::account::WelcomeEmail;
use crate::error::{NausError, NausResult};
use crate::file::{FileKind, FileUpload};
use crate::models::application::{ApplicationStatus, NewApplicationRecord, Review};
use crate::models::credential::{CredentialRole, NewCredential};
use crate::models::sequence::{self, MembershipNumber};
use crate::models::{ApplicantDetails, GqlDateTime, PageRequest};
use crate::state::AppState;
use crate::store::{Store, Transaction};
use crate::util::{
    current_time, non_blank, normalize_email, page_count, require, temporary_password,
    validate_email,
};

#[derive(Enum, sqlx::Type, Copy, Clone, Debug, PartialEq, Eq)]
#[sqlx(type_name = "membership_type", rename_all = "snake_case")]
pub enum MembershipType {
    /// Joined before the online portal and was imported
    Existing,
    /// Joined through an approved application
    New,
}

#[derive(Enum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemberStatus {
    Active,
    Inactive,
}

#[derive(SimpleObject, FromRow, Clone, Debug)]
pub struct Member {
    pub id: i32,
    /// The member's unique membership number, e.g. `NAUS-2025007`
    pub membership_number: String,
    #[sqlx(flatten)]
    pub details: ApplicantDetails,
    pub mbbs_certificate: Option<String>,
    pub fellowship_certificate: Option<String>,
    pub profile_photo: Option<String>,
    pub is_active: bool,
    pub membership_type: MembershipType,
    /// Whether the member can log in
    pub has_account: bool,
    pub account_created: Option<GqlDateTime>,
    /// Whether the member is listed in the public directory
    pub show_in_directory: bool,
    pub joined_date: GqlDateTime,
    pub created_at: GqlDateTime,
    pub updated_at: GqlDateTime,
}

#[derive(Clone, Debug)]
pub struct NewMember {
    pub membership_number: String,
    pub details: ApplicantDetails,
    pub mbbs_certificate: Option<String>,
    pub fellowship_certificate: Option<String>,
    pub membership_type: MembershipType,
    pub has_account: bool,
    pub account_created: Option<OffsetDateTime>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MemberOrder {
    #[default]
    Newest,
    Name,
}

#[derive(Clone, Debug, Default)]
pub struct MemberFilter {
    pub search: Option<String>,
    pub specialty: Option<String>,
    pub status: Option<MemberStatus>,
    pub membership_type: Option<MembershipType>,
    pub has_account: Option<bool>,
    /// Only active members who opted into the directory
    pub directory_only: bool,
    pub order: MemberOrder,
    pub page: PageRequest,
}

#[derive(InputObject, Clone, Debug)]
pub struct MemberSearch {
    /// Matches first name, last name, email or membership number
    pub search: Option<String>,
    pub specialty: Option<String>,
    pub status: Option<MemberStatus>,
    pub membership_type: Option<MembershipType>,
    #[graphql(default = 1)]
    pub page: i64,
    #[graphql(default = 10)]
    pub limit: i64,
}

impl Default for MemberSearch {
    fn default() -> Self {
        MemberSearch {
            search: None,
            specialty: None,
            status: None,
            membership_type: None,
            page: 1,
            limit: 10,
        }
    }
}

impl From<MemberSearch> for MemberFilter {
    fn from(search: MemberSearch) -> Self {
        MemberFilter {
            search: non_blank(search.search),
            specialty: non_blank(search.specialty),
            status: search.status,
            membership_type: search.membership_type,
            page: PageRequest::new(search.page, search.limit),
            ..Default::default()
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct MemberPage {
    pub members: Vec<Member>,
    pub total_pages: i64,
    pub current_page: i64,
    pub total_members: i64,
}

/// The subset of a member that anyone may see.
#[derive(SimpleObject, Clone, Debug)]
pub struct PublicProfile {
    pub membership_number: String,
    pub full_name: String,
    pub area_of_specialty: String,
    pub current_practice: Option<String>,
    pub profile_photo: Option<String>,
    pub member_since: GqlDateTime,
}

impl From<&Member> for PublicProfile {
    fn from(member: &Member) -> Self {
        PublicProfile {
            membership_number: member.membership_number.clone(),
            full_name: member.details.full_name(),
            area_of_specialty: member.details.area_of_specialty.clone(),
            current_practice: member.details.current_practice.clone(),
            profile_photo: member.profile_photo.clone(),
            member_since: member.joined_date,
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct DirectoryPage {
    pub members: Vec<PublicProfile>,
    pub total_pages: i64,
    pub current_page: i64,
    pub total_members: i64,
}

/// The answer to "is this a real membership number?"
#[derive(SimpleObject, Clone, Debug)]
pub struct Verification {
    pub valid: bool,
    pub membership_number: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub member_since: Option<GqlDateTime>,
}

/// Changes to a member's profile. Absent fields are left untouched, and
/// nullable fields can be cleared by sending `null`.
#[derive(InputObject, Clone, Debug, Default)]
pub struct MemberUpdate {
    pub first_name: Option<String>,
    pub middle_name: MaybeUndefined<String>,
    pub last_name: Option<String>,
    pub area_of_specialty: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub street_address: MaybeUndefined<String>,
    pub permanent_address: MaybeUndefined<String>,
    pub mdcn_registration_number: MaybeUndefined<String>,
    pub year_qualified_mbbs: MaybeUndefined<String>,
    pub additional_qualification_mdcn: MaybeUndefined<String>,
    pub year_qualified_urologist: MaybeUndefined<String>,
    pub current_practice: MaybeUndefined<String>,
    pub next_of_kin_name: MaybeUndefined<String>,
    pub next_of_kin_phone: MaybeUndefined<String>,
    pub next_of_kin_email: MaybeUndefined<String>,
    pub fellowship_college: MaybeUndefined<String>,
    pub fwacs: Option<bool>,
    pub fmcs: Option<bool>,
    pub facs: Option<bool>,
    pub frcs: Option<bool>,
    pub others: Option<bool>,
    pub qualification_year: MaybeUndefined<String>,
    pub additional_qualification: MaybeUndefined<String>,
    pub residency_training: MaybeUndefined<String>,
    pub foreign_institution: MaybeUndefined<String>,
    pub conference_attended: MaybeUndefined<String>,
    /// Only admins may change these, so they never come from the profile form.
    #[graphql(skip)]
    pub membership_type: Option<MembershipType>,
    #[graphql(skip)]
    pub is_active: Option<bool>,
}

fn set<T: Clone>(target: &mut T, value: &Option<T>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

fn set_nullable(target: &mut Option<String>, value: &MaybeUndefined<String>) {
    match value {
        MaybeUndefined::Undefined => {}
        MaybeUndefined::Null => *target = None,
        MaybeUndefined::Value(value) => *target = non_blank(Some(value.clone())),
    }
}

impl MemberUpdate {
    fn nullable_fields(&self) -> [&MaybeUndefined<String>; 17] {
        [
            &self.middle_name,
            &self.street_address,
            &self.permanent_address,
            &self.mdcn_registration_number,
            &self.year_qualified_mbbs,
            &self.additional_qualification_mdcn,
            &self.year_qualified_urologist,
            &self.current_practice,
            &self.next_of_kin_name,
            &self.next_of_kin_phone,
            &self.next_of_kin_email,
            &self.fellowship_college,
            &self.qualification_year,
            &self.additional_qualification,
            &self.residency_training,
            &self.foreign_institution,
            &self.conference_attended,
        ]
    }

    pub fn is_empty(&self) -> bool {
        [
            &self.first_name,
            &self.last_name,
            &self.area_of_specialty,
            &self.phone_number,
            &self.email,
        ]
        .iter()
        .all(|value| value.is_none())
            && [self.fwacs, self.fmcs, self.facs, self.frcs, self.others, self.is_active]
                .iter()
                .all(Option::is_none)
            && self.membership_type.is_none()
            && self
                .nullable_fields()
                .iter()
                .all(|value| value.is_undefined())
    }

    pub fn validate(&self) -> NausResult<()> {
        if let Some(first_name) = &self.first_name {
            require("firstName", first_name)?;
        }
        if let Some(last_name) = &self.last_name {
            require("lastName", last_name)?;
        }
        if let Some(phone_number) = &self.phone_number {
            require("phoneNumber", phone_number)?;
        }
        if let Some(email) = &self.email {
            validate_email("email", email)?;
        }
        if let MaybeUndefined::Value(email) = &self.next_of_kin_email {
            validate_email("nextOfKinEmail", email)?;
        }

        Ok(())
    }

    /// Applies every supplied field to the member. Does not touch `updated_at`.
    pub fn apply(&self, member: &mut Member) {
        let details = &mut member.details;
        set(
            &mut details.first_name,
            &self.first_name.as_deref().map(|name| name.trim().to_owned()),
        );
        set_nullable(&mut details.middle_name, &self.middle_name);
        set(
            &mut details.last_name,
            &self.last_name.as_deref().map(|name| name.trim().to_owned()),
        );
        set(
            &mut details.area_of_specialty,
            &non_blank(self.area_of_specialty.clone()),
        );
        set(
            &mut details.phone_number,
            &self.phone_number.as_deref().map(|phone| phone.trim().to_owned()),
        );
        set(
            &mut details.email,
            &self.email.as_deref().map(normalize_email),
        );
        set_nullable(&mut details.street_address, &self.street_address);
        set_nullable(&mut details.permanent_address, &self.permanent_address);
        set_nullable(
            &mut details.mdcn_registration_number,
            &self.mdcn_registration_number,
        );
        set_nullable(&mut details.year_qualified_mbbs, &self.year_qualified_mbbs);
        set_nullable(
            &mut details.additional_qualification_mdcn,
            &self.additional_qualification_mdcn,
        );
        set_nullable(
            &mut details.year_qualified_urologist,
            &self.year_qualified_urologist,
        );
        set_nullable(&mut details.current_practice, &self.current_practice);
        set_nullable(&mut details.next_of_kin_name, &self.next_of_kin_name);
        set_nullable(&mut details.next_of_kin_phone, &self.next_of_kin_phone);
        set_nullable(&mut details.next_of_kin_email, &self.next_of_kin_email);
        set_nullable(&mut details.fellowship_college, &self.fellowship_college);
        set(&mut details.fwacs, &self.fwacs);
        set(&mut details.fmcs, &self.fmcs);
        set(&mut details.facs, &self.facs);
        set(&mut details.frcs, &self.frcs);
        set(&mut details.others, &self.others);
        set_nullable(&mut details.qualification_year, &self.qualification_year);
        set_nullable(
            &mut details.additional_qualification,
            &self.additional_qualification,
        );
        set_nullable(&mut details.residency_training, &self.residency_training);
        set_nullable(&mut details.foreign_institution, &self.foreign_institution);
        set_nullable(&mut details.conference_attended, &self.conference_attended);
        set(&mut member.membership_type, &self.membership_type);
        set(&mut member.is_active, &self.is_active);
    }
}

/// A member who joined before the portal existed, with the number they already hold.
#[derive(InputObject, Clone, Debug, Default)]
pub struct ExistingMember {
    /// Either `NAUS-YYYYNNN` or the legacy `YYYYNNN`
    pub membership_number: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub area_of_specialty: Option<String>,
    pub mdcn_registration_number: Option<String>,
    pub current_practice: Option<String>,
    pub fellowship_college: Option<String>,
    pub street_address: Option<String>,
}

impl ExistingMember {
    fn validate(&self) -> NausResult<MembershipNumber> {
        let number = MembershipNumber::parse(&self.membership_number)?;
        require("firstName", &self.first_name)?;
        require("lastName", &self.last_name)?;
        validate_email("email", &self.email)?;
        require("phoneNumber", &self.phone_number)?;

        Ok(number)
    }

    fn details(&self) -> ApplicantDetails {
        ApplicantDetails {
            first_name: self.first_name.trim().to_owned(),
            middle_name: non_blank(self.middle_name.clone()),
            last_name: self.last_name.trim().to_owned(),
            area_of_specialty: non_blank(self.area_of_specialty.clone())
                .unwrap_or_else(|| ApplicantDetails::DEFAULT_SPECIALTY.to_owned()),
            phone_number: self.phone_number.trim().to_owned(),
            email: normalize_email(&self.email),
            street_address: non_blank(self.street_address.clone()),
            mdcn_registration_number: non_blank(self.mdcn_registration_number.clone()),
            current_practice: non_blank(self.current_practice.clone()),
            fellowship_college: non_blank(self.fellowship_college.clone()),
            ..Default::default()
        }
    }
}

#[derive(SimpleObject, Clone, Debug)]
pub struct ImportOutcome {
    pub member: Member,
    /// Whether the welcome email with the temporary password went out
    pub email_sent: bool,
}

impl Member {
    pub fn full_name(&self) -> String {
        self.details.full_name()
    }

    pub async fn with_id(id: i32, store: &dyn Store) -> NausResult<Self> {
        Self::with_id_opt(id, store)
            .await?
            .ok_or_else(|| NausError::not_found(format!("No member with id {}", id)))
    }

    pub async fn with_id_opt(id: i32, store: &dyn Store) -> NausResult<Option<Self>> {
        let mut tx = store.begin().await?;
        tx.member_with_id(id).await
    }

    pub async fn with_number(number: &str, store: &dyn Store) -> NausResult<Self> {
        Self::with_number_opt(number, store).await?.ok_or_else(|| {
            NausError::not_found(format!("No member with membership number {}", number))
        })
    }

    /// Accepts the number in either historical format.
    pub async fn with_number_opt(number: &str, store: &dyn Store) -> NausResult<Option<Self>> {
        let number = match MembershipNumber::parse_opt(number) {
            Some(number) => number.to_string(),
            None => return Ok(None),
        };
        let mut tx = store.begin().await?;
        tx.member_with_number(&number).await
    }

    pub async fn with_email(email: &str, store: &dyn Store) -> NausResult<Self> {
        Self::with_email_opt(email, store)
            .await?
            .ok_or_else(|| NausError::not_found(format!("No member with email {}", email)))
    }

    pub async fn with_email_opt(email: &str, store: &dyn Store) -> NausResult<Option<Self>> {
        let mut tx = store.begin().await?;
        tx.member_with_email(&normalize_email(email)).await
    }

    pub async fn list(filter: MemberFilter, store: &dyn Store) -> NausResult<MemberPage> {
        let page = filter.page;
        let mut tx = store.begin().await?;
        let (members, total) = tx.members(&filter).await?;

        Ok(MemberPage {
            members,
            total_pages: page_count(total, page.limit),
            current_page: page.page,
            total_members: total,
        })
    }

    /// Up to 50 matches, ordered by name.
    pub async fn search(term: &str, store: &dyn Store) -> NausResult<Vec<Self>> {
        let filter = MemberFilter {
            search: non_blank(Some(term.to_owned())),
            order: MemberOrder::Name,
            page: PageRequest::new(1, 50),
            ..Default::default()
        };
        let mut tx = store.begin().await?;

        Ok(tx.members(&filter).await?.0)
    }

    pub async fn without_account(store: &dyn Store) -> NausResult<Vec<Self>> {
        let filter = MemberFilter {
            has_account: Some(false),
            order: MemberOrder::Name,
            page: PageRequest::new(1, PageRequest::MAX_LIMIT),
            ..Default::default()
        };
        let mut tx = store.begin().await?;

        Ok(tx.members(&filter).await?.0)
    }

    pub async fn directory(
        search: Option<String>,
        specialty: Option<String>,
        page: PageRequest,
        store: &dyn Store,
    ) -> NausResult<DirectoryPage> {
        let filter = MemberFilter {
            search: non_blank(search),
            specialty: non_blank(specialty),
            directory_only: true,
            order: MemberOrder::Name,
            page: page.normalized(),
            ..Default::default()
        };
        let page = Self::list(filter, store).await?;

        Ok(DirectoryPage {
            members: page.members.iter().map(PublicProfile::from).collect(),
            total_pages: page.total_pages,
            current_page: page.current_page,
            total_members: page.total_members,
        })
    }

    /// Hidden and inactive members are reported as missing.
    pub async fn public_profile(number: &str, store: &dyn Store) -> NausResult<PublicProfile> {
        Self::with_number_opt(number, store)
            .await?
            .filter(|member| member.is_active && member.show_in_directory)
            .map(|member| PublicProfile::from(&member))
            .ok_or_else(|| NausError::not_found(format!("No public profile for {}", number)))
    }

    pub async fn verify(number: &str, store: &dyn Store) -> NausResult<Verification> {
        let parsed = MembershipNumber::parse(number)?;
        let member = Self::with_number_opt(&parsed.to_string(), store).await?;

        Ok(match member {
            Some(member) => Verification {
                valid: true,
                full_name: Some(member.full_name()),
                is_active: member.is_active,
                member_since: Some(member.joined_date),
                membership_number: member.membership_number,
            },
            None => Verification {
                valid: false,
                membership_number: parsed.to_string(),
                full_name: None,
                is_active: false,
                member_since: None,
            },
        })
    }

    /// Applies a partial update. An email change must not collide with
    /// another member or account, and is mirrored onto the member's credential.
    pub async fn update(id: i32, update: MemberUpdate, state: &AppState) -> NausResult<Self> {
        update.validate()?;
        if update.is_empty() {
            return Err(NausError::validation("update", "No fields to update"));
        }

        let now = current_time();
        let mut tx = state.store.begin().await?;
        let mut member = tx
            .member_for_update(id)
            .await?
            .ok_or_else(|| NausError::not_found(format!("No member with id {}", id)))?;
        let previous = member.clone();
        update.apply(&mut member);

        if member.details.email != previous.details.email {
            let taken_by_member = tx
                .member_with_email(&member.details.email)
                .await?
                .map_or(false, |other| other.id != id);
            let taken_by_account = tx
                .credential_with_email(&member.details.email)
                .await?
                .map_or(false, |other| other.membership_number != member.membership_number);
            if taken_by_member || taken_by_account {
                return Err(NausError::conflict(
                    "Email is already in use by another member",
                ));
            }
        }

        member.updated_at = now.into();
        tx.save_member(&member).await?;
        sync_credential(&mut *tx, &previous, &member, now).await?;
        tx.commit().await?;

        info!(member = id, "member updated");
        Ok(member)
    }

    pub async fn toggle_active(id: i32, state: &AppState) -> NausResult<Self> {
        let now = current_time();
        let mut tx = state.store.begin().await?;
        let mut member = tx
            .member_for_update(id)
            .await?
            .ok_or_else(|| NausError::not_found(format!("No member with id {}", id)))?;
        let previous = member.clone();

        member.is_active = !member.is_active;
        member.updated_at = now.into();
        tx.save_member(&member).await?;
        sync_credential(&mut *tx, &previous, &member, now).await?;
        tx.commit().await?;

        info!(member = id, active = member.is_active, "member status toggled");
        Ok(member)
    }

    pub async fn set_directory_visibility(
        id: i32,
        visible: bool,
        store: &dyn Store,
    ) -> NausResult<Self> {
        let mut tx = store.begin().await?;
        let mut member = tx
            .member_for_update(id)
            .await?
            .ok_or_else(|| NausError::not_found(format!("No member with id {}", id)))?;

        member.show_in_directory = visible;
        member.updated_at = current_time().into();
        tx.save_member(&member).await?;
        tx.commit().await?;

        Ok(member)
    }

    /// Stores a new certificate or profile photo and drops the one it replaces.
    pub async fn attach_file(
        id: i32,
        kind: FileKind,
        upload: FileUpload,
        state: &AppState,
    ) -> NausResult<Self> {
        let file = upload.decode(kind)?;
        let reference = state.files.store(&file).await?;

        let result = async {
            let mut tx = state.store.begin().await?;
            let mut member = tx
                .member_for_update(id)
                .await?
                .ok_or_else(|| NausError::not_found(format!("No member with id {}", id)))?;
            let slot = match kind {
                FileKind::MbbsCertificate => &mut member.mbbs_certificate,
                FileKind::FellowshipCertificate => &mut member.fellowship_certificate,
                FileKind::ProfilePhoto => &mut member.profile_photo,
            };
            let replaced = slot.replace(reference.clone());

            member.updated_at = current_time().into();
            tx.save_member(&member).await?;
            tx.commit().await?;

            Ok::<_, NausError>((member, replaced))
        }
        .await;

        match result {
            Ok((member, replaced)) => {
                if let Some(replaced) = replaced {
                    state.files.discard_all(&[replaced]).await;
                }
                Ok(member)
            }
            Err(error) => {
                state.files.discard_all(&[reference]).await;
                Err(error)
            }
        }
    }

    /// Hard-deletes the member together with the credential and applications
    /// carrying the same membership number.
    pub async fn delete(id: i32, state: &AppState) -> NausResult<()> {
        let mut tx = state.store.begin().await?;
        let member = tx
            .member_for_update(id)
            .await?
            .ok_or_else(|| NausError::not_found(format!("No member with id {}", id)))?;

        let mut files: Vec<String> = [
            &member.mbbs_certificate,
            &member.fellowship_certificate,
            &member.profile_photo,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect();
        if let Some(application) = tx.application_with_email(&member.details.email).await? {
            if application.membership_number.as_deref() == Some(&member.membership_number) {
                files.extend(application.mbbs_certificate);
                files.extend(application.fellowship_certificate);
            }
        }
        files.sort();
        files.dedup();

        let credentials = tx
            .delete_credentials_for_number(&member.membership_number)
            .await?;
        let applications = tx
            .delete_applications_for_number(&member.membership_number)
            .await?;
        tx.delete_member(id).await?;
        tx.commit().await?;

        info!(
            member = id,
            number = %member.membership_number,
            credentials,
            applications,
            "member deleted"
        );
        state.files.discard_all(&files).await;

        Ok(())
    }

    /// Records a legacy member under the number they already hold, issues them
    /// an account and emails a temporary password.
    pub async fn import_existing(
        input: ExistingMember,
        reviewer: i32,
        state: &AppState,
    ) -> NausResult<ImportOutcome> {
        let number = input.validate()?;
        let details = input.details();
        let temporary_password = temporary_password();
        let password_hash = state.hasher.hash(&temporary_password)?;

        let now = current_time();
        let mut tx = state.store.begin().await?;
        if tx.member_with_email(&details.email).await?.is_some()
            || tx.credential_with_email(&details.email).await?.is_some()
            || tx.application_with_email(&details.email).await?.is_some()
        {
            return Err(NausError::conflict("A member with this email already exists"));
        }
        if tx.member_with_number(&number.to_string()).await?.is_some() {
            return Err(NausError::conflict(format!(
                "Membership number {} is already assigned",
                number
            )));
        }

        let member = tx
            .insert_member(
                &NewMember {
                    membership_number: number.to_string(),
                    details: details.clone(),
                    mbbs_certificate: None,
                    fellowship_certificate: None,
                    membership_type: MembershipType::Existing,
                    has_account: true,
                    account_created: Some(now),
                },
                now,
            )
            .await?;
        tx.insert_credential(
            &NewCredential {
                membership_number: member.membership_number.clone(),
                email: details.email.clone(),
                password_hash,
                first_name: details.first_name.clone(),
                last_name: details.last_name.clone(),
                role: CredentialRole::Member,
            },
            now,
        )
        .await?;
        tx.insert_application(
            &NewApplicationRecord {
                details,
                mbbs_certificate: None,
                fellowship_certificate: None,
                declaration: true,
                status: ApplicationStatus::Approved,
                membership_number: Some(member.membership_number.clone()),
                review: Some(Review {
                    status: ApplicationStatus::Approved,
                    reviewer: Some(reviewer),
                    notes: Some("Imported existing member".to_owned()),
                    reviewed_at: now,
                }),
            },
            now,
        )
        .await?;
        sequence::reserve(&number, &mut *tx).await?;
        tx.commit().await?;

        info!(number = %member.membership_number, "existing member imported");
        let email_sent = state
            .notifier
            .send(WelcomeEmail {
                name: member.full_name(),
                email: member.details.email.clone(),
                membership_number: member.membership_number.clone(),
                temporary_password: Some(temporary_password),
                login_url: state.frontend_link("/login"),
            })
            .await;

        Ok(ImportOutcome { member, email_sent })
    }
}

/// Mirrors identity and activity changes of a member onto their credential.
async fn sync_credential(
    tx: &mut dyn Transaction,
    previous: &Member,
    member: &Member,
    now: OffsetDateTime,
) -> NausResult<()> {
    let changed = previous.details.email != member.details.email
        || previous.details.first_name != member.details.first_name
        || previous.details.last_name != member.details.last_name
        || previous.is_active != member.is_active;
    if !changed {
        return Ok(());
    }

    if let Some(mut credential) = tx.credential_with_number(&member.membership_number).await? {
        credential.email = member.details.email.clone();
        credential.first_name = member.details.first_name.clone();
        credential.last_name = member.details.last_name.clone();
        if previous.is_active != member.is_active {
            credential.is_active = member.is_active;
        }
        credential.updated_at = now;
        tx.save_credential(&credential).await?;
    }

    Ok(())
}
