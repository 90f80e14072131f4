use async_graphql::{Enum, InputObject, SimpleObject};
use sqlx::FromRow;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::{NausError, NausResult};
use crate::file::{FileKind, FileUpload};
use crate::models::{ApplicantDetails, GqlDateTime};
use crate::state::AppState;
use crate::store::Store;
use crate::util::{current_time, non_blank, normalize_email, require, require_opt, validate_email};

#[derive(Enum, sqlx::Type, Copy, Clone, Debug, PartialEq, Eq)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    UnderReview,
}

impl ApplicationStatus {
    /// Statuses an admin may still decide on.
    pub const AWAITING_DECISION: &'static [ApplicationStatus] =
        &[ApplicationStatus::Pending, ApplicationStatus::UnderReview];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::UnderReview => "under_review",
        }
    }
}

#[derive(Enum, sqlx::Type, Copy, Clone, Debug, PartialEq, Eq)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    NotPaid,
}

#[derive(SimpleObject, FromRow, Clone, Debug)]
pub struct Application {
    pub id: i32,
    #[sqlx(flatten)]
    pub details: ApplicantDetails,
    /// Reference to the stored MBBS certificate
    pub mbbs_certificate: Option<String>,
    /// Reference to the stored fellowship certificate
    pub fellowship_certificate: Option<String>,
    pub declaration: bool,
    pub status: ApplicationStatus,
    pub payment_status: PaymentStatus,
    /// The id of the admin who reviewed the application
    pub reviewed_by: Option<i32>,
    pub reviewed_at: Option<GqlDateTime>,
    pub admin_notes: Option<String>,
    /// Only set once the application is approved
    pub membership_number: Option<String>,
    pub created_at: GqlDateTime,
    pub updated_at: GqlDateTime,
}

/// A status transition as recorded on the application.
#[derive(Clone, Debug)]
pub struct Review {
    pub status: ApplicationStatus,
    pub reviewer: Option<i32>,
    pub notes: Option<String>,
    pub reviewed_at: OffsetDateTime,
}

/// Everything needed to insert an application row.
#[derive(Clone, Debug)]
pub struct NewApplicationRecord {
    pub details: ApplicantDetails,
    pub mbbs_certificate: Option<String>,
    pub fellowship_certificate: Option<String>,
    pub declaration: bool,
    pub status: ApplicationStatus,
    pub membership_number: Option<String>,
    pub review: Option<Review>,
}

/// The membership application form as submitted by an applicant.
#[derive(InputObject, Clone, Debug, Default)]
pub struct NewApplication {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub area_of_specialty: Option<String>,
    pub phone_number: String,
    pub email: String,
    pub street_address: Option<String>,
    pub permanent_address: Option<String>,
    pub mdcn_registration_number: String,
    pub year_qualified_mbbs: String,
    pub additional_qualification_mdcn: String,
    pub year_qualified_urologist: String,
    pub current_practice: String,
    pub next_of_kin_name: String,
    pub next_of_kin_phone: String,
    pub next_of_kin_email: String,
    pub fellowship_college: String,
    #[graphql(default)]
    pub fwacs: bool,
    #[graphql(default)]
    pub fmcs: bool,
    #[graphql(default)]
    pub facs: bool,
    #[graphql(default)]
    pub frcs: bool,
    #[graphql(default)]
    pub others: bool,
    pub qualification_year: String,
    pub additional_qualification: String,
    pub residency_training: String,
    pub foreign_institution: Option<String>,
    pub conference_attended: Option<String>,
    pub declaration: bool,
    pub mbbs_certificate: Option<FileUpload>,
    pub fellowship_certificate: Option<FileUpload>,
}

impl NewApplication {
    pub fn validate(&self) -> NausResult<()> {
        require("firstName", &self.first_name)?;
        require("lastName", &self.last_name)?;
        validate_email("email", &self.email)?;
        require("phoneNumber", &self.phone_number)?;
        require("mdcnRegistrationNumber", &self.mdcn_registration_number)?;
        require("yearQualifiedMBBS", &self.year_qualified_mbbs)?;
        require(
            "additionalQualificationMDCN",
            &self.additional_qualification_mdcn,
        )?;
        require("yearQualifiedUrologist", &self.year_qualified_urologist)?;
        require("currentPractice", &self.current_practice)?;
        require("nextOfKinName", &self.next_of_kin_name)?;
        require("nextOfKinPhone", &self.next_of_kin_phone)?;
        validate_email("nextOfKinEmail", &self.next_of_kin_email)?;
        require("fellowshipCollege", &self.fellowship_college)?;
        require("qualificationYear", &self.qualification_year)?;
        require("additionalQualification", &self.additional_qualification)?;
        require("residencyTraining", &self.residency_training)?;
        require_opt(
            "mbbsCertificate",
            self.mbbs_certificate.as_ref().map(|file| file.content.as_str()),
        )?;
        require_opt(
            "fellowshipCertificate",
            self.fellowship_certificate
                .as_ref()
                .map(|file| file.content.as_str()),
        )?;

        if !self.declaration {
            return Err(NausError::validation(
                "declaration",
                "The declaration must be accepted",
            ));
        }

        Ok(())
    }

    fn details(&self) -> ApplicantDetails {
        let present = |value: &str| non_blank(Some(value.to_owned()));

        ApplicantDetails {
            first_name: self.first_name.trim().to_owned(),
            middle_name: non_blank(self.middle_name.clone()),
            last_name: self.last_name.trim().to_owned(),
            area_of_specialty: non_blank(self.area_of_specialty.clone())
                .unwrap_or_else(|| ApplicantDetails::DEFAULT_SPECIALTY.to_owned()),
            phone_number: self.phone_number.trim().to_owned(),
            email: normalize_email(&self.email),
            street_address: non_blank(self.street_address.clone()),
            permanent_address: non_blank(self.permanent_address.clone()),
            mdcn_registration_number: present(&self.mdcn_registration_number),
            year_qualified_mbbs: present(&self.year_qualified_mbbs),
            additional_qualification_mdcn: present(&self.additional_qualification_mdcn),
            year_qualified_urologist: present(&self.year_qualified_urologist),
            current_practice: present(&self.current_practice),
            next_of_kin_name: present(&self.next_of_kin_name),
            next_of_kin_phone: present(&self.next_of_kin_phone),
            next_of_kin_email: present(&self.next_of_kin_email),
            fellowship_college: present(&self.fellowship_college),
            fwacs: self.fwacs,
            fmcs: self.fmcs,
            facs: self.facs,
            frcs: self.frcs,
            others: self.others,
            qualification_year: present(&self.qualification_year),
            additional_qualification: present(&self.additional_qualification),
            residency_training: present(&self.residency_training),
            foreign_institution: non_blank(self.foreign_institution.clone()),
            conference_attended: non_blank(self.conference_attended.clone()),
        }
    }
}

impl Application {
    pub async fn with_id(id: i32, store: &dyn Store) -> NausResult<Self> {
        Self::with_id_opt(id, store)
            .await?
            .ok_or_else(|| NausError::not_found(format!("No application with id {}", id)))
    }

    pub async fn with_id_opt(id: i32, store: &dyn Store) -> NausResult<Option<Self>> {
        let mut tx = store.begin().await?;
        tx.application_with_id(id).await
    }

    pub async fn with_email(email: &str, store: &dyn Store) -> NausResult<Self> {
        let mut tx = store.begin().await?;
        tx.application_with_email(&normalize_email(email))
            .await?
            .ok_or_else(|| NausError::not_found(format!("No application for {}", email)))
    }

    /// Newest first.
    pub async fn all(status: Option<ApplicationStatus>, store: &dyn Store) -> NausResult<Vec<Self>> {
        let mut tx = store.begin().await?;
        tx.applications(status).await
    }

    /// Stores the certificates and records a new pending application.
    ///
    /// Fails with a conflict if the email already has an application. Stored
    /// certificates are removed again if the application can't be recorded.
    pub async fn submit(form: NewApplication, state: &AppState) -> NausResult<Self> {
        form.validate()?;
        let details = form.details();

        {
            let mut tx = state.store.begin().await?;
            if tx.application_with_email(&details.email).await?.is_some() {
                return Err(NausError::conflict(
                    "An application with this email already exists",
                ));
            }
        }

        let mut stored = Vec::new();
        let store_file = |upload: Option<&FileUpload>, kind: FileKind| {
            upload.map(|upload| upload.decode(kind)).transpose()
        };
        let mbbs = store_file(form.mbbs_certificate.as_ref(), FileKind::MbbsCertificate)?;
        let fellowship = store_file(
            form.fellowship_certificate.as_ref(),
            FileKind::FellowshipCertificate,
        )?;

        let mut references = [None, None];
        for (slot, file) in references.iter_mut().zip([mbbs, fellowship]) {
            if let Some(file) = file {
                match state.files.store(&file).await {
                    Ok(reference) => {
                        stored.push(reference.clone());
                        *slot = Some(reference);
                    }
                    Err(error) => {
                        state.files.discard_all(&stored).await;
                        return Err(error);
                    }
                }
            }
        }
        let [mbbs_certificate, fellowship_certificate] = references;

        let record = NewApplicationRecord {
            details,
            mbbs_certificate,
            fellowship_certificate,
            declaration: form.declaration,
            status: ApplicationStatus::Pending,
            membership_number: None,
            review: None,
        };

        let result = async {
            let mut tx = state.store.begin().await?;
            let application = tx.insert_application(&record, current_time()).await?;
            tx.commit().await?;

            Ok::<_, NausError>(application)
        }
        .await;

        match result {
            Ok(application) => {
                info!(
                    application = application.id,
                    email = %application.details.email,
                    "application submitted"
                );
                Ok(application)
            }
            Err(error) => {
                warn!(email = %record.details.email, "discarding certificates of failed application");
                state.files.discard_all(&stored).await;
                Err(error)
            }
        }
    }
}
