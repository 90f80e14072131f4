use async_trait::async_trait;
use sqlx::postgres::{PgArguments, PgPool};
use sqlx::query::Query;
use sqlx::{FromRow, Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::error::{NausError, NausResult};
use crate::models::admin::{Admin, NewAdmin};
use crate::models::application::{
    Application, ApplicationStatus, NewApplicationRecord, PaymentStatus, Review,
};
use crate::models::credential::{Credential, NewCredential};
use crate::models::member::{Member, MemberFilter, MemberOrder, MemberStatus, NewMember};
use crate::models::sequence::MembershipNumber;
use crate::models::{ApplicantDetails, PageRequest};
use crate::store::{
    AdminRecords, ApplicationRecords, CredentialRecords, MemberRecords, SequenceRecords, Store,
    Transaction,
};

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

const DETAIL_COLUMNS: [&str; 27] = [
    "first_name",
    "middle_name",
    "last_name",
    "area_of_specialty",
    "phone_number",
    "email",
    "street_address",
    "permanent_address",
    "mdcn_registration_number",
    "year_qualified_mbbs",
    "additional_qualification_mdcn",
    "year_qualified_urologist",
    "current_practice",
    "next_of_kin_name",
    "next_of_kin_phone",
    "next_of_kin_email",
    "fellowship_college",
    "fwacs",
    "fmcs",
    "facs",
    "frcs",
    "others",
    "qualification_year",
    "additional_qualification",
    "residency_training",
    "foreign_institution",
    "conference_attended",
];

const APPLICATION_COLUMNS: &str = "mbbs_certificate, fellowship_certificate, declaration, \
    status, payment_status, reviewed_by, reviewed_at, admin_notes, membership_number, \
    created_at, updated_at";
const MEMBER_COLUMNS: &str = "membership_number, mbbs_certificate, fellowship_certificate, \
    profile_photo, is_active, membership_type, has_account, account_created, \
    show_in_directory, joined_date, created_at, updated_at";
const CREDENTIAL_COLUMNS: &str = "id, membership_number, email, password_hash, first_name, \
    last_name, role, is_active, last_login, login_count, reset_token_hash, \
    reset_token_expires, email_verified, created_at, updated_at";
const ADMIN_COLUMNS: &str = "id, email, name, password_hash, role, is_active, last_login, \
    login_count, created_at, updated_at";

fn detail_columns() -> String {
    DETAIL_COLUMNS.join(", ")
}

fn select_applications() -> String {
    format!(
        "SELECT id, {}, {} FROM applications",
        detail_columns(),
        APPLICATION_COLUMNS
    )
}

fn select_members() -> String {
    format!(
        "SELECT id, {}, {} FROM members",
        detail_columns(),
        MEMBER_COLUMNS
    )
}

/// `$start, $start+1, ...` for `count` parameters.
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|index| format!("${}", index))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `first_name = $start, middle_name = $start+1, ...` for every detail column.
fn detail_assignments(start: usize) -> String {
    DETAIL_COLUMNS
        .iter()
        .enumerate()
        .map(|(offset, column)| format!("{} = ${}", column, start + offset))
        .collect::<Vec<_>>()
        .join(", ")
}

fn bind_details<'q>(query: PgQuery<'q>, details: &'q ApplicantDetails) -> PgQuery<'q> {
    query
        .bind(&details.first_name)
        .bind(&details.middle_name)
        .bind(&details.last_name)
        .bind(&details.area_of_specialty)
        .bind(&details.phone_number)
        .bind(&details.email)
        .bind(&details.street_address)
        .bind(&details.permanent_address)
        .bind(&details.mdcn_registration_number)
        .bind(&details.year_qualified_mbbs)
        .bind(&details.additional_qualification_mdcn)
        .bind(&details.year_qualified_urologist)
        .bind(&details.current_practice)
        .bind(&details.next_of_kin_name)
        .bind(&details.next_of_kin_phone)
        .bind(&details.next_of_kin_email)
        .bind(&details.fellowship_college)
        .bind(details.fwacs)
        .bind(details.fmcs)
        .bind(details.facs)
        .bind(details.frcs)
        .bind(details.others)
        .bind(&details.qualification_year)
        .bind(&details.additional_qualification)
        .bind(&details.residency_training)
        .bind(&details.foreign_institution)
        .bind(&details.conference_attended)
}

/// Replaces the generic conflict message for unique violations.
fn unique_violation(message: &'static str) -> impl FnOnce(sqlx::Error) -> NausError {
    move |err| match NausError::from(err) {
        NausError::Conflict(_) => NausError::conflict(message),
        other => other,
    }
}

/// A pattern matching `search` anywhere, with `LIKE` wildcards taken literally.
fn contains_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');

    pattern
}

fn push_admin_search(builder: &mut QueryBuilder<'_, Postgres>, search: Option<&str>) {
    if let Some(search) = search {
        let pattern = contains_pattern(search);
        builder
            .push(" WHERE name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern);
    }
}

/// Postgres-backed [`Store`] over a connection pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> NausResult<Box<dyn Transaction>> {
        let tx = self.pool.begin().await?;

        Ok(Box::new(PgTransaction { tx }))
    }
}

pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn commit(self: Box<Self>) -> NausResult<()> {
        self.tx.commit().await.map_err(Into::into)
    }
}

impl PgTransaction {
    async fn application_where(
        &mut self,
        condition: &str,
        value: &str,
    ) -> NausResult<Option<Application>> {
        let sql = format!("{} WHERE {} = $1", select_applications(), condition);

        sqlx::query_as::<_, Application>(&sql)
            .bind(value)
            .fetch_optional(&mut self.tx)
            .await
            .map_err(Into::into)
    }

    async fn member_where(&mut self, condition: &str, value: &str) -> NausResult<Option<Member>> {
        let sql = format!("{} WHERE {} = $1", select_members(), condition);

        sqlx::query_as::<_, Member>(&sql)
            .bind(value)
            .fetch_optional(&mut self.tx)
            .await
            .map_err(Into::into)
    }

    async fn credential_where(
        &mut self,
        condition: &str,
        value: &str,
    ) -> NausResult<Option<Credential>> {
        let sql = format!(
            "SELECT {} FROM users WHERE {} = $1",
            CREDENTIAL_COLUMNS, condition
        );

        sqlx::query_as::<_, Credential>(&sql)
            .bind(value)
            .fetch_optional(&mut self.tx)
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl ApplicationRecords for PgTransaction {
    async fn insert_application(
        &mut self,
        record: &NewApplicationRecord,
        now: OffsetDateTime,
    ) -> NausResult<Application> {
        let sql = format!(
            "INSERT INTO applications ({details}, mbbs_certificate, fellowship_certificate, \
                 declaration, status, membership_number, reviewed_by, reviewed_at, admin_notes, \
                 created_at, updated_at)
             VALUES ({values})
             RETURNING id, {details}, {columns}",
            details = detail_columns(),
            values = placeholders(1, DETAIL_COLUMNS.len() + 10),
            columns = APPLICATION_COLUMNS,
        );
        let review = record.review.as_ref();
        let row = bind_details(sqlx::query(&sql), &record.details)
            .bind(&record.mbbs_certificate)
            .bind(&record.fellowship_certificate)
            .bind(record.declaration)
            .bind(record.status)
            .bind(&record.membership_number)
            .bind(review.and_then(|review| review.reviewer))
            .bind(review.map(|review| review.reviewed_at))
            .bind(review.and_then(|review| review.notes.clone()))
            .bind(now)
            .bind(now)
            .fetch_one(&mut self.tx)
            .await
            .map_err(unique_violation("An application with this email already exists"))?;

        Ok(Application::from_row(&row)?)
    }

    async fn application_with_id(&mut self, id: i32) -> NausResult<Option<Application>> {
        let sql = format!("{} WHERE id = $1", select_applications());

        sqlx::query_as::<_, Application>(&sql)
            .bind(id)
            .fetch_optional(&mut self.tx)
            .await
            .map_err(Into::into)
    }

    async fn application_with_email(&mut self, email: &str) -> NausResult<Option<Application>> {
        self.application_where("email", email).await
    }

    async fn applications(
        &mut self,
        status: Option<ApplicationStatus>,
    ) -> NausResult<Vec<Application>> {
        let mut builder = QueryBuilder::<Postgres>::new(select_applications());
        if let Some(status) = status {
            builder.push(" WHERE status = ").push_bind(status);
        }
        builder.push(" ORDER BY created_at DESC, id DESC");

        builder
            .build_query_as::<Application>()
            .fetch_all(&mut self.tx)
            .await
            .map_err(Into::into)
    }

    async fn update_application_status(
        &mut self,
        id: i32,
        review: &Review,
        expected: &[ApplicationStatus],
    ) -> NausResult<bool> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE applications SET status = ");
        builder
            .push_bind(review.status)
            .push(", reviewed_by = ")
            .push_bind(review.reviewer)
            .push(", reviewed_at = ")
            .push_bind(review.reviewed_at)
            .push(", admin_notes = ")
            .push_bind(review.notes.clone())
            .push(", updated_at = ")
            .push_bind(review.reviewed_at)
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND status IN (");
        let mut statuses = builder.separated(", ");
        for status in expected {
            statuses.push_bind(*status);
        }
        builder.push(")");

        let result = builder.build().execute(&mut self.tx).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn attach_membership_number(
        &mut self,
        id: i32,
        number: &str,
        now: OffsetDateTime,
    ) -> NausResult<bool> {
        let result = sqlx::query(
            "UPDATE applications SET membership_number = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(number)
        .bind(now)
        .execute(&mut self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_payment_status(
        &mut self,
        id: i32,
        status: PaymentStatus,
        now: OffsetDateTime,
    ) -> NausResult<bool> {
        let result =
            sqlx::query("UPDATE applications SET payment_status = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(status)
                .bind(now)
                .execute(&mut self.tx)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_applications_for_number(&mut self, number: &str) -> NausResult<u64> {
        let result = sqlx::query("DELETE FROM applications WHERE membership_number = $1")
            .bind(number)
            .execute(&mut self.tx)
            .await?;

        Ok(result.rows_affected())
    }
}

fn push_member_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &MemberFilter) {
    builder.push(" WHERE TRUE");
    if let Some(search) = &filter.search {
        let pattern = contains_pattern(search);
        builder.push(" AND (");
        let mut any = builder.separated(" OR ");
        for column in ["first_name", "last_name", "email", "membership_number"] {
            any.push(column)
                .push_unseparated(" ILIKE ")
                .push_bind_unseparated(pattern.clone());
        }
        builder.push(")");
    }
    if let Some(specialty) = &filter.specialty {
        builder
            .push(" AND area_of_specialty = ")
            .push_bind(specialty.clone());
    }
    if let Some(status) = filter.status {
        builder
            .push(" AND is_active = ")
            .push_bind(status == MemberStatus::Active);
    }
    if let Some(membership_type) = filter.membership_type {
        builder
            .push(" AND membership_type = ")
            .push_bind(membership_type);
    }
    if let Some(has_account) = filter.has_account {
        builder.push(" AND has_account = ").push_bind(has_account);
    }
    if filter.directory_only {
        builder.push(" AND is_active AND show_in_directory");
    }
}

#[async_trait]
impl MemberRecords for PgTransaction {
    async fn insert_member(
        &mut self,
        member: &NewMember,
        now: OffsetDateTime,
    ) -> NausResult<Member> {
        let sql = format!(
            "INSERT INTO members (membership_number, {details}, mbbs_certificate, \
                 fellowship_certificate, membership_type, has_account, account_created, \
                 joined_date, created_at, updated_at)
             VALUES ({values})
             RETURNING id, {details}, {columns}",
            details = detail_columns(),
            values = placeholders(1, DETAIL_COLUMNS.len() + 9),
            columns = MEMBER_COLUMNS,
        );
        let query = sqlx::query(&sql).bind(&member.membership_number);
        let row = bind_details(query, &member.details)
            .bind(&member.mbbs_certificate)
            .bind(&member.fellowship_certificate)
            .bind(member.membership_type)
            .bind(member.has_account)
            .bind(member.account_created)
            .bind(now)
            .bind(now)
            .bind(now)
            .fetch_one(&mut self.tx)
            .await
            .map_err(unique_violation("A member with this email or membership number already exists"))?;

        Ok(Member::from_row(&row)?)
    }

    async fn member_with_id(&mut self, id: i32) -> NausResult<Option<Member>> {
        let sql = format!("{} WHERE id = $1", select_members());

        sqlx::query_as::<_, Member>(&sql)
            .bind(id)
            .fetch_optional(&mut self.tx)
            .await
            .map_err(Into::into)
    }

    async fn member_for_update(&mut self, id: i32) -> NausResult<Option<Member>> {
        let sql = format!("{} WHERE id = $1 FOR UPDATE", select_members());

        sqlx::query_as::<_, Member>(&sql)
            .bind(id)
            .fetch_optional(&mut self.tx)
            .await
            .map_err(Into::into)
    }

    async fn member_with_number(&mut self, number: &str) -> NausResult<Option<Member>> {
        let (prefixed, legacy) = match MembershipNumber::parse_opt(number) {
            Some(parsed) => (parsed.to_string(), parsed.legacy().to_owned()),
            None => (number.to_owned(), number.to_owned()),
        };
        let sql = format!(
            "{} WHERE membership_number IN ($1, $2)",
            select_members()
        );

        sqlx::query_as::<_, Member>(&sql)
            .bind(prefixed)
            .bind(legacy)
            .fetch_optional(&mut self.tx)
            .await
            .map_err(Into::into)
    }

    async fn member_with_email(&mut self, email: &str) -> NausResult<Option<Member>> {
        self.member_where("email", email).await
    }

    async fn members(&mut self, filter: &MemberFilter) -> NausResult<(Vec<Member>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM members");
        push_member_conditions(&mut count, filter);
        let (total,) = count
            .build_query_as::<(i64,)>()
            .fetch_one(&mut self.tx)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(select_members());
        push_member_conditions(&mut select, filter);
        select.push(match filter.order {
            MemberOrder::Newest => " ORDER BY created_at DESC, id DESC",
            MemberOrder::Name => " ORDER BY last_name, first_name, id",
        });
        select
            .push(" LIMIT ")
            .push_bind(filter.page.limit)
            .push(" OFFSET ")
            .push_bind(filter.page.offset());

        let members = select
            .build_query_as::<Member>()
            .fetch_all(&mut self.tx)
            .await?;

        Ok((members, total))
    }

    async fn save_member(&mut self, member: &Member) -> NausResult<()> {
        let sql = format!(
            "UPDATE members SET {}, mbbs_certificate = $29, fellowship_certificate = $30, \
                 profile_photo = $31, is_active = $32, membership_type = $33, \
                 has_account = $34, account_created = $35, show_in_directory = $36, \
                 updated_at = $37
             WHERE id = $1",
            detail_assignments(2),
        );
        let query = sqlx::query(&sql).bind(member.id);
        let result = bind_details(query, &member.details)
            .bind(&member.mbbs_certificate)
            .bind(&member.fellowship_certificate)
            .bind(&member.profile_photo)
            .bind(member.is_active)
            .bind(member.membership_type)
            .bind(member.has_account)
            .bind(member.account_created)
            .bind(member.show_in_directory)
            .bind(member.updated_at)
            .execute(&mut self.tx)
            .await
            .map_err(unique_violation("A member with this email already exists"))?;

        if result.rows_affected() == 0 {
            return Err(NausError::not_found(format!(
                "No member with id {}",
                member.id
            )));
        }

        Ok(())
    }

    async fn delete_member(&mut self, id: i32) -> NausResult<bool> {
        let result = sqlx::query("DELETE FROM members WHERE id = $1")
            .bind(id)
            .execute(&mut self.tx)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn highest_member_sequence(&mut self, year: i32) -> NausResult<Option<i64>> {
        let numbers: Vec<String> = sqlx::query_scalar(
            "SELECT membership_number FROM members
             WHERE membership_number LIKE $1 OR membership_number LIKE $2",
        )
        .bind(format!("{}{}%", MembershipNumber::PREFIX, year))
        .bind(format!("{}%", year))
        .fetch_all(&mut self.tx)
        .await?;

        Ok(numbers
            .iter()
            .filter_map(|number| MembershipNumber::parse_opt(number))
            .filter(|number| number.year() == year)
            .map(|number| number.sequence())
            .max())
    }
}

#[async_trait]
impl CredentialRecords for PgTransaction {
    async fn insert_credential(
        &mut self,
        credential: &NewCredential,
        now: OffsetDateTime,
    ) -> NausResult<Credential> {
        let sql = format!(
            "INSERT INTO users (membership_number, email, password_hash, first_name, last_name, \
                 role, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
             RETURNING {}",
            CREDENTIAL_COLUMNS
        );
        sqlx::query_as::<_, Credential>(&sql)
            .bind(&credential.membership_number)
            .bind(&credential.email)
            .bind(&credential.password_hash)
            .bind(&credential.first_name)
            .bind(&credential.last_name)
            .bind(credential.role)
            .bind(now)
            .fetch_one(&mut self.tx)
            .await
            .map_err(unique_violation("An account with this email already exists"))
    }

    async fn credential_with_id(&mut self, id: i32) -> NausResult<Option<Credential>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", CREDENTIAL_COLUMNS);

        sqlx::query_as::<_, Credential>(&sql)
            .bind(id)
            .fetch_optional(&mut self.tx)
            .await
            .map_err(Into::into)
    }

    async fn credential_with_email(&mut self, email: &str) -> NausResult<Option<Credential>> {
        self.credential_where("email", email).await
    }

    async fn credential_with_number(&mut self, number: &str) -> NausResult<Option<Credential>> {
        self.credential_where("membership_number", number).await
    }

    async fn credential_with_reset_token(
        &mut self,
        token_hash: &str,
    ) -> NausResult<Option<Credential>> {
        self.credential_where("reset_token_hash", token_hash).await
    }

    async fn save_credential(&mut self, credential: &Credential) -> NausResult<()> {
        let result = sqlx::query(
            "UPDATE users SET membership_number = $2, email = $3, password_hash = $4,
                 first_name = $5, last_name = $6, role = $7, is_active = $8,
                 reset_token_hash = $9, reset_token_expires = $10, email_verified = $11,
                 updated_at = $12
             WHERE id = $1",
        )
        .bind(credential.id)
        .bind(&credential.membership_number)
        .bind(&credential.email)
        .bind(&credential.password_hash)
        .bind(&credential.first_name)
        .bind(&credential.last_name)
        .bind(credential.role)
        .bind(credential.is_active)
        .bind(&credential.reset_token_hash)
        .bind(credential.reset_token_expires)
        .bind(credential.email_verified)
        .bind(credential.updated_at)
        .execute(&mut self.tx)
        .await
        .map_err(unique_violation("An account with this email already exists"))?;

        if result.rows_affected() == 0 {
            return Err(NausError::not_found("Account not found"));
        }

        Ok(())
    }

    async fn record_login(
        &mut self,
        id: i32,
        now: OffsetDateTime,
    ) -> NausResult<Option<Credential>> {
        let sql = format!(
            "UPDATE users SET last_login = $2, login_count = login_count + 1, updated_at = $2
             WHERE id = $1
             RETURNING {}",
            CREDENTIAL_COLUMNS
        );

        sqlx::query_as::<_, Credential>(&sql)
            .bind(id)
            .bind(now)
            .fetch_optional(&mut self.tx)
            .await
            .map_err(Into::into)
    }

    async fn delete_credentials_for_number(&mut self, number: &str) -> NausResult<u64> {
        let result = sqlx::query("DELETE FROM users WHERE membership_number = $1")
            .bind(number)
            .execute(&mut self.tx)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AdminRecords for PgTransaction {
    async fn insert_admin(&mut self, admin: &NewAdmin, now: OffsetDateTime) -> NausResult<Admin> {
        let sql = format!(
            "INSERT INTO admins (email, name, password_hash, role, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $5)
             RETURNING {}",
            ADMIN_COLUMNS
        );
        sqlx::query_as::<_, Admin>(&sql)
            .bind(&admin.email)
            .bind(&admin.name)
            .bind(&admin.password_hash)
            .bind(admin.role)
            .bind(now)
            .fetch_one(&mut self.tx)
            .await
            .map_err(unique_violation("An admin with this email already exists"))
    }

    async fn admin_with_id(&mut self, id: i32) -> NausResult<Option<Admin>> {
        let sql = format!("SELECT {} FROM admins WHERE id = $1", ADMIN_COLUMNS);

        sqlx::query_as::<_, Admin>(&sql)
            .bind(id)
            .fetch_optional(&mut self.tx)
            .await
            .map_err(Into::into)
    }

    async fn admin_with_email(&mut self, email: &str) -> NausResult<Option<Admin>> {
        let sql = format!("SELECT {} FROM admins WHERE email = $1", ADMIN_COLUMNS);

        sqlx::query_as::<_, Admin>(&sql)
            .bind(email)
            .fetch_optional(&mut self.tx)
            .await
            .map_err(Into::into)
    }

    async fn admins(
        &mut self,
        search: Option<&str>,
        page: PageRequest,
    ) -> NausResult<(Vec<Admin>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM admins");
        push_admin_search(&mut count, search);
        let (total,) = count
            .build_query_as::<(i64,)>()
            .fetch_one(&mut self.tx)
            .await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM admins", ADMIN_COLUMNS));
        push_admin_search(&mut select, search);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.offset());

        let admins = select
            .build_query_as::<Admin>()
            .fetch_all(&mut self.tx)
            .await?;

        Ok((admins, total))
    }

    async fn save_admin(&mut self, admin: &Admin) -> NausResult<()> {
        let result = sqlx::query(
            "UPDATE admins SET email = $2, name = $3, password_hash = $4, role = $5,
                 is_active = $6, updated_at = $7
             WHERE id = $1",
        )
        .bind(admin.id)
        .bind(&admin.email)
        .bind(&admin.name)
        .bind(&admin.password_hash)
        .bind(admin.role)
        .bind(admin.is_active)
        .bind(admin.updated_at)
        .execute(&mut self.tx)
        .await
        .map_err(unique_violation("An admin with this email already exists"))?;

        if result.rows_affected() == 0 {
            return Err(NausError::not_found(format!("No admin with id {}", admin.id)));
        }

        Ok(())
    }

    async fn record_admin_login(
        &mut self,
        id: i32,
        now: OffsetDateTime,
    ) -> NausResult<Option<Admin>> {
        let sql = format!(
            "UPDATE admins SET last_login = $2, login_count = login_count + 1, updated_at = $2
             WHERE id = $1
             RETURNING {}",
            ADMIN_COLUMNS
        );

        sqlx::query_as::<_, Admin>(&sql)
            .bind(id)
            .bind(now)
            .fetch_optional(&mut self.tx)
            .await
            .map_err(Into::into)
    }
}

#[async_trait]
impl SequenceRecords for PgTransaction {
    async fn increment_sequence(&mut self, year: i32) -> NausResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>(
            "UPDATE membership_sequence SET current_number = current_number + 1
             WHERE year = $1
             RETURNING current_number",
        )
        .bind(year)
        .fetch_optional(&mut self.tx)
        .await
        .map_err(Into::into)
    }

    async fn create_sequence(&mut self, year: i32, start: i64) -> NausResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO membership_sequence (year, current_number) VALUES ($1, $2)
             ON CONFLICT (year)
             DO UPDATE SET current_number = membership_sequence.current_number + 1
             RETURNING current_number",
        )
        .bind(year)
        .bind(start)
        .fetch_one(&mut self.tx)
        .await
        .map_err(Into::into)
    }

    async fn raise_sequence(&mut self, year: i32, floor: i64) -> NausResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO membership_sequence (year, current_number) VALUES ($1, $2)
             ON CONFLICT (year)
             DO UPDATE SET current_number = GREATEST(membership_sequence.current_number, $2)
             RETURNING current_number",
        )
        .bind(year)
        .bind(floor)
        .fetch_one(&mut self.tx)
        .await
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_numbered_from_the_start() {
        assert_eq!(placeholders(3, 3), "$3, $4, $5");
    }

    #[test]
    fn member_update_parameters_line_up() {
        let assignments = detail_assignments(2);

        assert!(assignments.starts_with("first_name = $2, "));
        assert!(assignments.ends_with("conference_attended = $28"));
    }

    #[test]
    fn search_patterns_match_wildcards_literally() {
        assert_eq!(contains_pattern("ada"), "%ada%");
        assert_eq!(contains_pattern("100%_a\\b"), "%100\\%\\_a\\\\b%");
    }
}
