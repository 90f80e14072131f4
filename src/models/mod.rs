use async_graphql::{InputObject, InputValueError, InputValueResult, Scalar, ScalarType, SimpleObject, Value};
use sqlx::FromRow;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

pub mod admin;
pub mod application;
pub mod approval;
pub mod contact;
pub mod credential;
pub mod member;
pub mod password_reset;
pub mod sequence;

#[derive(sqlx::Type, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[sqlx(transparent)]
pub struct GqlDateTime(pub OffsetDateTime);

#[Scalar]
impl ScalarType for GqlDateTime {
    fn parse(value: Value) -> InputValueResult<Self> {
        if let Value::String(date_str) = &value {
            if let Ok(date) = OffsetDateTime::parse(date_str, &Rfc3339) {
                return Ok(GqlDateTime(date));
            }
        }

        Err(InputValueError::expected_type(value))
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.format(&Rfc3339).unwrap_or_default())
    }
}

impl From<OffsetDateTime> for GqlDateTime {
    fn from(time: OffsetDateTime) -> Self {
        GqlDateTime(time)
    }
}

/// The applicant's identity and qualifications, shared by applications and members.
#[derive(SimpleObject, FromRow, Clone, Debug, Default, PartialEq)]
pub struct ApplicantDetails {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    /// Defaults to "General Surgery" when left blank
    pub area_of_specialty: String,
    pub phone_number: String,
    /// Always stored trimmed and lower-cased
    pub email: String,
    pub street_address: Option<String>,
    pub permanent_address: Option<String>,
    /// Registration number with the Medical and Dental Council of Nigeria
    pub mdcn_registration_number: Option<String>,
    pub year_qualified_mbbs: Option<String>,
    pub additional_qualification_mdcn: Option<String>,
    pub year_qualified_urologist: Option<String>,
    pub current_practice: Option<String>,
    pub next_of_kin_name: Option<String>,
    pub next_of_kin_phone: Option<String>,
    pub next_of_kin_email: Option<String>,
    pub fellowship_college: Option<String>,
    pub fwacs: bool,
    pub fmcs: bool,
    pub facs: bool,
    pub frcs: bool,
    pub others: bool,
    pub qualification_year: Option<String>,
    pub additional_qualification: Option<String>,
    pub residency_training: Option<String>,
    pub foreign_institution: Option<String>,
    pub conference_attended: Option<String>,
}

impl ApplicantDetails {
    pub const DEFAULT_SPECIALTY: &'static str = "General Surgery";

    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref() {
            Some(middle) if !middle.is_empty() => {
                format!("{} {} {}", self.first_name, middle, self.last_name)
            }
            _ => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

#[derive(InputObject, Clone, Copy, Debug)]
pub struct PageRequest {
    #[graphql(default = 1)]
    pub page: i64,
    #[graphql(default = 10)]
    pub limit: i64,
}

impl PageRequest {
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn normalized(self) -> Self {
        Self::new(self.page, self.limit)
    }

    /// Saturates instead of overflowing, so an absurd page is simply empty.
    pub fn offset(&self) -> i64 {
        (self.page.max(1) - 1).saturating_mul(self.limit.max(0))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, 10)
    }
}
