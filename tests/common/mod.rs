#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::Duration;

use naus::auth::{BcryptHasher, Tokener};
use naus::config::Config;
use naus::email::{Mailer, Notifier, OutgoingEmail};
use naus::error::{NausError, NausResult};
use naus::file::{FileStorage, FileUpload, UploadedFile};
use naus::models::admin::{Admin, AdminRole, NewAdmin};
use naus::models::application::{Application, NewApplication};
use naus::state::AppState;
use naus::store::{MemoryStore, Store};
use naus::util::current_time;

/// Keeps every delivered email for inspection.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, address: &str, kind: &str) -> Vec<OutgoingEmail> {
        self.sent()
            .into_iter()
            .filter(|email| email.to.address == address && email.kind == kind)
            .collect()
    }

    pub fn last_to(&self, address: &str, kind: &str) -> OutgoingEmail {
        self.sent_to(address, kind)
            .pop()
            .unwrap_or_else(|| panic!("no {} email was sent to {}", kind, address))
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn deliver(&self, email: &OutgoingEmail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

pub struct FailingMailer;

#[async_trait]
impl Mailer for FailingMailer {
    async fn deliver(&self, _email: &OutgoingEmail) -> anyhow::Result<()> {
        anyhow::bail!("mail server unreachable")
    }
}

#[derive(Default)]
pub struct MemoryFiles {
    files: Mutex<HashMap<String, Vec<u8>>>,
    counter: Mutex<u32>,
}

impl MemoryFiles {
    pub fn contains(&self, reference: &str) -> bool {
        self.files.lock().unwrap().contains_key(reference)
    }

    pub fn count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl FileStorage for MemoryFiles {
    async fn store(&self, file: &UploadedFile) -> NausResult<String> {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let reference = format!("/uploads/{}/{}.{}", file.kind.directory(), counter, file.extension);
        self.files
            .lock()
            .unwrap()
            .insert(reference.clone(), file.content.clone());

        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> NausResult<()> {
        self.files.lock().unwrap().remove(reference);
        Ok(())
    }
}

pub struct Harness {
    pub state: AppState,
    pub mailer: Arc<RecordingMailer>,
    pub files: Arc<MemoryFiles>,
}

pub fn config() -> Config {
    Config {
        database_url: "postgres://unused".to_owned(),
        database_max_connections: 1,
        port: 0,
        jwt_secret: "test_secret_key".to_owned(),
        jwt_ttl_hours: 24,
        mailgun_token: None,
        mailgun_domain: "mail.test".to_owned(),
        mail_from_name: "NAUS".to_owned(),
        mail_from_address: "no-reply@naus.test".to_owned(),
        contact_email: "secretariat@naus.test".to_owned(),
        frontend_url: "https://portal.naus.test".to_owned(),
        upload_dir: "./uploads".to_owned(),
        bcrypt_cost: 4,
        diagnostics: true,
    }
}

fn state_with(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, files: Arc<MemoryFiles>) -> AppState {
    let config = config();
    AppState {
        store,
        hasher: Arc::new(BcryptHasher::new(config.bcrypt_cost)),
        tokens: Tokener::new(&config.jwt_secret, Duration::hours(config.jwt_ttl_hours)),
        files,
        notifier: Notifier::new(mailer),
        config: Arc::new(config),
    }
}

pub fn harness() -> Harness {
    harness_with_store(Arc::new(MemoryStore::new()))
}

pub fn harness_with_store(store: Arc<dyn Store>) -> Harness {
    let mailer = Arc::new(RecordingMailer::default());
    let files = Arc::new(MemoryFiles::default());

    Harness {
        state: state_with(store, mailer.clone(), files.clone()),
        mailer,
        files,
    }
}

/// A harness whose emails all fail to send.
pub fn harness_without_mail() -> Harness {
    let files = Arc::new(MemoryFiles::default());
    let mut harness = harness();
    harness.state = state_with(
        Arc::new(MemoryStore::new()),
        Arc::new(FailingMailer),
        files.clone(),
    );
    harness.files = files;

    harness
}

pub fn pdf() -> FileUpload {
    FileUpload {
        name: "certificate.pdf".to_owned(),
        content: "data:application/pdf;base64,JVBERi0xLjQK".to_owned(),
    }
}

/// A complete application form for the given email.
pub fn application_form(email: &str) -> NewApplication {
    NewApplication {
        first_name: "Ada".to_owned(),
        middle_name: None,
        last_name: "Okafor".to_owned(),
        area_of_specialty: Some("Urology".to_owned()),
        phone_number: "+2348012345678".to_owned(),
        email: email.to_owned(),
        street_address: Some("12 Marina Road, Lagos".to_owned()),
        permanent_address: None,
        mdcn_registration_number: "MDCN/12345".to_owned(),
        year_qualified_mbbs: "2005".to_owned(),
        additional_qualification_mdcn: "FWACS".to_owned(),
        year_qualified_urologist: "2014".to_owned(),
        current_practice: "Lagos University Teaching Hospital".to_owned(),
        next_of_kin_name: "Chidi Okafor".to_owned(),
        next_of_kin_phone: "+2348098765432".to_owned(),
        next_of_kin_email: "chidi@example.com".to_owned(),
        fellowship_college: "West African College of Surgeons".to_owned(),
        fwacs: true,
        fmcs: false,
        facs: false,
        frcs: false,
        others: false,
        qualification_year: "2014".to_owned(),
        additional_qualification: "MSc Surgery".to_owned(),
        residency_training: "LUTH".to_owned(),
        foreign_institution: None,
        conference_attended: None,
        declaration: true,
        mbbs_certificate: Some(pdf()),
        fellowship_certificate: Some(pdf()),
    }
}

pub async fn submit(harness: &Harness, email: &str) -> Application {
    Application::submit(application_form(email), &harness.state)
        .await
        .unwrap()
}

pub async fn admin(harness: &Harness, email: &str, role: AdminRole) -> Admin {
    let store: &dyn Store = &*harness.state.store;
    let mut tx = store.begin().await.unwrap();
    let admin = tx
        .insert_admin(
            &NewAdmin {
                email: email.to_owned(),
                name: "Test Admin".to_owned(),
                password_hash: harness.state.hasher.hash("admin-password").unwrap(),
                role,
            },
            current_time(),
        )
        .await
        .unwrap();
    tx.commit().await.unwrap();

    admin
}

/// Pulls the temporary password out of a rendered approval or welcome email.
pub fn temporary_password(email: &OutgoingEmail) -> String {
    let start = email
        .html
        .find("<code class=\"temporary-password\">")
        .expect("email has no temporary password")
        + "<code class=\"temporary-password\">".len();
    let end = email.html[start..].find("</code>").unwrap() + start;

    email.html[start..end].trim().to_owned()
}

/// Pulls the reset token out of a rendered password reset email.
pub fn reset_token(email: &OutgoingEmail) -> String {
    let start = email.html.find("token=").expect("email has no reset link") + "token=".len();

    email.html[start..]
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect()
}

pub fn assert_validation(result: NausResult<impl std::fmt::Debug>, expected_field: &str) {
    match result {
        Err(NausError::Validation { field, .. }) => assert_eq!(field, expected_field),
        other => panic!("expected a validation error on {}, got {:?}", expected_field, other),
    }
}

/// Records a member directly, bypassing the application workflow.
pub async fn member_record(
    harness: &Harness,
    number: &str,
    email: &str,
    has_account: bool,
) -> naus::models::member::Member {
    use naus::models::member::{MembershipType, NewMember};
    use naus::models::ApplicantDetails;

    let store: &dyn Store = &*harness.state.store;
    let mut tx = store.begin().await.unwrap();
    let member = tx
        .insert_member(
            &NewMember {
                membership_number: number.to_owned(),
                details: ApplicantDetails {
                    first_name: "Bola".to_owned(),
                    last_name: "Adeyemi".to_owned(),
                    area_of_specialty: "Urology".to_owned(),
                    phone_number: "+2348011111111".to_owned(),
                    email: email.to_owned(),
                    current_practice: Some("UCH Ibadan".to_owned()),
                    ..Default::default()
                },
                mbbs_certificate: None,
                fellowship_certificate: None,
                membership_type: MembershipType::Existing,
                has_account,
                account_created: None,
            },
            current_time(),
        )
        .await
        .unwrap();
    tx.commit().await.unwrap();

    member
}
