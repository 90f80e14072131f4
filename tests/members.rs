mod common;

use async_graphql::MaybeUndefined;

use naus::error::NausError;
use naus::file::FileKind;
use naus::models::admin::AdminRole;
use naus::models::application::Application;
use naus::models::approval;
use naus::models::credential::{Credential, NewAccount};
use naus::models::member::{
    ExistingMember, Member, MemberFilter, MemberSearch, MemberStatus, MemberUpdate,
    MembershipType,
};
use naus::models::sequence::allocate;
use naus::models::PageRequest;
use naus::store::Store;
use naus::util::current_time;

use common::*;

async fn approved_member(harness: &Harness, email: &str) -> Member {
    let admin = admin(harness, &format!("admin-for-{}", email), AdminRole::SuperAdmin).await;
    let application = submit(harness, email).await;
    approval::approve(application.id, admin.id, None, &harness.state)
        .await
        .unwrap();

    Member::with_email(email, &*harness.state.store).await.unwrap()
}

fn existing(number: &str, email: &str) -> ExistingMember {
    ExistingMember {
        membership_number: number.to_owned(),
        first_name: "Emeka".to_owned(),
        last_name: "Nwosu".to_owned(),
        email: email.to_owned(),
        phone_number: "+2348033333333".to_owned(),
        current_practice: Some("UNTH Enugu".to_owned()),
        ..Default::default()
    }
}

#[tokio::test]
async fn partial_updates_leave_other_fields_alone() {
    let harness = harness();
    let member = member_record(&harness, "NAUS-2020001", "bola@example.com", false).await;

    let updated = Member::update(
        member.id,
        MemberUpdate {
            phone_number: Some(" +2348000000000 ".to_owned()),
            ..Default::default()
        },
        &harness.state,
    )
    .await
    .unwrap();

    assert_eq!(updated.details.phone_number, "+2348000000000");
    assert_eq!(updated.details.first_name, member.details.first_name);
    assert_eq!(updated.details.current_practice, member.details.current_practice);
    assert_eq!(updated.details.email, member.details.email);
}

#[tokio::test]
async fn nullable_fields_can_be_cleared() {
    let harness = harness();
    let member = member_record(&harness, "NAUS-2020001", "bola@example.com", false).await;

    let updated = Member::update(
        member.id,
        MemberUpdate {
            current_practice: MaybeUndefined::Null,
            ..Default::default()
        },
        &harness.state,
    )
    .await
    .unwrap();

    assert!(updated.details.current_practice.is_none());
}

#[tokio::test]
async fn empty_updates_are_rejected() {
    let harness = harness();
    let member = member_record(&harness, "NAUS-2020001", "bola@example.com", false).await;

    let result = Member::update(member.id, MemberUpdate::default(), &harness.state).await;

    assert_validation(result, "update");
}

#[tokio::test]
async fn email_changes_must_be_unique_and_reach_the_login() {
    let harness = harness();
    let member = approved_member(&harness, "first@example.com").await;
    member_record(&harness, "NAUS-2020001", "taken@example.com", false).await;

    let result = Member::update(
        member.id,
        MemberUpdate {
            email: Some("Taken@Example.com".to_owned()),
            ..Default::default()
        },
        &harness.state,
    )
    .await;
    assert!(matches!(result, Err(NausError::Conflict(_))));

    let updated = Member::update(
        member.id,
        MemberUpdate {
            email: Some("Renamed@Example.com".to_owned()),
            first_name: Some("Adaeze".to_owned()),
            ..Default::default()
        },
        &harness.state,
    )
    .await
    .unwrap();
    assert_eq!(updated.details.email, "renamed@example.com");

    let mut tx = harness.state.store.begin().await.unwrap();
    let credential = tx
        .credential_with_number(&member.membership_number)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(credential.email, "renamed@example.com");
    assert_eq!(credential.first_name, "Adaeze");
}

#[tokio::test]
async fn deactivated_members_cannot_log_in() {
    let harness = harness();
    let member = approved_member(&harness, "toggle@example.com").await;
    let password = temporary_password(&harness.mailer.last_to("toggle@example.com", "approval"));

    let member = Member::toggle_active(member.id, &harness.state).await.unwrap();
    assert!(!member.is_active);
    let login = Credential::login("toggle@example.com", &password, &harness.state).await;
    assert!(matches!(login, Err(NausError::Forbidden(_))));

    let member = Member::toggle_active(member.id, &harness.state).await.unwrap();
    assert!(member.is_active);
    assert!(Credential::login("toggle@example.com", &password, &harness.state)
        .await
        .is_ok());
}

#[tokio::test]
async fn deleting_a_member_removes_their_login_and_application() {
    let harness = harness();
    let member = approved_member(&harness, "gone@example.com").await;
    let bystander = submit(&harness, "bystander@example.com").await;
    let certificates = member.mbbs_certificate.clone().unwrap();
    assert!(harness.files.contains(&certificates));

    Member::delete(member.id, &harness.state).await.unwrap();

    let store: &dyn Store = &*harness.state.store;
    assert!(Member::with_id_opt(member.id, store).await.unwrap().is_none());
    assert!(matches!(
        Member::with_email("gone@example.com", store).await,
        Err(NausError::NotFound(_))
    ));
    assert!(matches!(
        Application::with_email("gone@example.com", store).await,
        Err(NausError::NotFound(_))
    ));
    let mut tx = store.begin().await.unwrap();
    assert!(tx
        .credential_with_email("gone@example.com")
        .await
        .unwrap()
        .is_none());
    assert!(tx
        .credential_with_number(&member.membership_number)
        .await
        .unwrap()
        .is_none());
    drop(tx);
    assert!(matches!(
        Credential::login("gone@example.com", "any-password", &harness.state).await,
        Err(NausError::Unauthorized(_))
    ));

    assert!(Application::with_id(bystander.id, store).await.is_ok());
    assert!(!harness.files.contains(&certificates));
    assert!(harness
        .files
        .contains(bystander.mbbs_certificate.as_deref().unwrap()));
}

#[tokio::test]
async fn deleting_a_missing_member_is_not_found() {
    let harness = harness();

    let result = Member::delete(99, &harness.state).await;

    assert!(matches!(result, Err(NausError::NotFound(_))));
}

#[tokio::test]
async fn replacing_a_certificate_discards_the_old_file() {
    let harness = harness();
    let member = member_record(&harness, "NAUS-2020001", "files@example.com", true).await;

    let first = Member::attach_file(member.id, FileKind::MbbsCertificate, pdf(), &harness.state)
        .await
        .unwrap()
        .mbbs_certificate
        .unwrap();
    let second = Member::attach_file(member.id, FileKind::MbbsCertificate, pdf(), &harness.state)
        .await
        .unwrap()
        .mbbs_certificate
        .unwrap();

    assert_ne!(first, second);
    assert!(!harness.files.contains(&first));
    assert!(harness.files.contains(&second));

    let mut photo = pdf();
    photo.name = "photo.pdf".to_owned();
    let result = Member::attach_file(member.id, FileKind::ProfilePhoto, photo, &harness.state).await;
    assert!(matches!(result, Err(NausError::Validation { .. })));
    assert_eq!(harness.files.count(), 1);
}

#[tokio::test]
async fn the_directory_only_lists_visible_active_members() {
    let harness = harness();
    let shown = member_record(&harness, "NAUS-2020001", "shown@example.com", true).await;
    let hidden = member_record(&harness, "NAUS-2020002", "hidden@example.com", true).await;
    let inactive = member_record(&harness, "NAUS-2020003", "inactive@example.com", true).await;
    Member::set_directory_visibility(hidden.id, false, &*harness.state.store)
        .await
        .unwrap();
    Member::toggle_active(inactive.id, &harness.state).await.unwrap();

    let page = Member::directory(None, None, PageRequest::new(1, 20), &*harness.state.store)
        .await
        .unwrap();

    assert_eq!(page.total_members, 1);
    assert_eq!(page.members[0].membership_number, shown.membership_number);
    assert_eq!(page.members[0].full_name, "Bola Adeyemi");

    let store = &*harness.state.store;
    assert!(Member::public_profile("NAUS-2020001", store).await.is_ok());
    assert!(matches!(
        Member::public_profile("NAUS-2020002", store).await,
        Err(NausError::NotFound(_))
    ));
    assert!(matches!(
        Member::public_profile("NAUS-2020003", store).await,
        Err(NausError::NotFound(_))
    ));
}

#[tokio::test]
async fn verification_accepts_either_number_format() {
    let harness = harness();
    member_record(&harness, "NAUS-2019004", "verify@example.com", false).await;
    let store = &*harness.state.store;

    let legacy = Member::verify("2019004", store).await.unwrap();
    assert!(legacy.valid);
    assert!(legacy.is_active);
    assert_eq!(legacy.membership_number, "NAUS-2019004");
    assert_eq!(legacy.full_name.as_deref(), Some("Bola Adeyemi"));

    let unknown = Member::verify("NAUS-2019005", store).await.unwrap();
    assert!(!unknown.valid);
    assert!(unknown.full_name.is_none());

    assert_validation(Member::verify("NAUS-20X9", store).await, "membershipNumber");
}

#[tokio::test]
async fn importing_a_legacy_member_keeps_their_number() {
    let harness = harness();
    let admin = admin(&harness, "importer@naus.test", AdminRole::MembershipAdmin).await;

    let outcome = Member::import_existing(
        existing("2018045", "Emeka@Example.com"),
        admin.id,
        &harness.state,
    )
    .await
    .unwrap();

    assert!(outcome.email_sent);
    let member = outcome.member;
    assert_eq!(member.membership_number, "NAUS-2018045");
    assert_eq!(member.membership_type, MembershipType::Existing);
    assert_eq!(member.details.email, "emeka@example.com");
    assert!(member.has_account);

    let application = Application::with_email("emeka@example.com", &*harness.state.store)
        .await
        .unwrap();
    assert_eq!(application.membership_number.as_deref(), Some("NAUS-2018045"));
    assert_eq!(application.reviewed_by, Some(admin.id));

    let password = temporary_password(&harness.mailer.last_to("emeka@example.com", "welcome"));
    let session = Credential::login("emeka@example.com", &password, &harness.state)
        .await
        .unwrap();
    assert_eq!(session.member.id, member.id);

    let mut tx = harness.state.store.begin().await.unwrap();
    assert_eq!(
        allocate(2018, &mut *tx).await.unwrap().to_string(),
        "NAUS-2018046"
    );
}

#[tokio::test]
async fn imports_cannot_reuse_a_number_or_email() {
    let harness = harness();
    let admin = admin(&harness, "importer@naus.test", AdminRole::MembershipAdmin).await;
    Member::import_existing(existing("NAUS-2018045", "emeka@example.com"), admin.id, &harness.state)
        .await
        .unwrap();

    let same_number =
        Member::import_existing(existing("2018045", "other@example.com"), admin.id, &harness.state)
            .await;
    let same_email =
        Member::import_existing(existing("2018046", "emeka@example.com"), admin.id, &harness.state)
            .await;

    assert!(matches!(same_number, Err(NausError::Conflict(_))));
    assert!(matches!(same_email, Err(NausError::Conflict(_))));
    assert_validation(
        Member::import_existing(existing("NAUS-18", "x@example.com"), admin.id, &harness.state)
            .await,
        "membershipNumber",
    );
}

#[tokio::test]
async fn imported_numbers_never_pull_the_sequence_behind_legacy_members() {
    let harness = harness();
    let admin = admin(&harness, "importer@naus.test", AdminRole::MembershipAdmin).await;
    let year = current_time().year();
    let legacy = member_record(&harness, &format!("{}004", year), "legacy@example.com", false).await;

    let imported = Member::import_existing(
        existing(&format!("{}003", year), "emeka@example.com"),
        admin.id,
        &harness.state,
    )
    .await
    .unwrap();
    assert_eq!(imported.member.membership_number, format!("NAUS-{}003", year));

    let clash = Member::import_existing(
        existing(&format!("NAUS-{}004", year), "other@example.com"),
        admin.id,
        &harness.state,
    )
    .await;
    assert!(matches!(clash, Err(NausError::Conflict(_))));

    let application = submit(&harness, "newcomer@example.com").await;
    let outcome = approval::approve(application.id, admin.id, None, &harness.state)
        .await
        .unwrap();
    assert_eq!(outcome.membership_number, format!("NAUS-{}005", year));

    let found = Member::with_number(&format!("NAUS-{}004", year), &*harness.state.store)
        .await
        .unwrap();
    assert_eq!(found.id, legacy.id);
}

#[tokio::test]
async fn existing_members_can_create_their_own_account() {
    let harness = harness();
    member_record(&harness, "NAUS-2019004", "self@example.com", false).await;
    let account = |number: &str| NewAccount {
        email: "Self@Example.com".to_owned(),
        membership_number: number.to_owned(),
        password: "my-password".to_owned(),
    };

    let wrong_number = Credential::create_account(account("NAUS-2019005"), &harness.state).await;
    assert!(matches!(wrong_number, Err(NausError::NotFound(_))));

    let member = Credential::create_account(account("2019004"), &harness.state)
        .await
        .unwrap();
    assert!(member.has_account);
    assert!(member.account_created.is_some());
    harness.mailer.last_to("self@example.com", "welcome");

    let again = Credential::create_account(account("NAUS-2019004"), &harness.state).await;
    assert!(matches!(again, Err(NausError::Conflict(_))));

    let session = Credential::login("self@example.com", "my-password", &harness.state)
        .await
        .unwrap();
    assert_eq!(session.member.membership_number, "NAUS-2019004");

    let unmatched = Member::without_account(&*harness.state.store).await.unwrap();
    assert!(unmatched.is_empty());
}

#[tokio::test]
async fn short_account_passwords_are_rejected() {
    let harness = harness();
    member_record(&harness, "NAUS-2019004", "short@example.com", false).await;

    let result = Credential::create_account(
        NewAccount {
            email: "short@example.com".to_owned(),
            membership_number: "NAUS-2019004".to_owned(),
            password: "abc".to_owned(),
        },
        &harness.state,
    )
    .await;

    assert_validation(result, "password");
}

#[tokio::test]
async fn member_lists_filter_and_paginate() {
    let harness = harness();
    let first = member_record(&harness, "NAUS-2020001", "one@example.com", true).await;
    member_record(&harness, "NAUS-2020002", "two@example.com", false).await;
    member_record(&harness, "NAUS-2020003", "three@example.com", false).await;
    Member::toggle_active(first.id, &harness.state).await.unwrap();
    let store = &*harness.state.store;

    let page = Member::list(
        MemberSearch {
            limit: 2,
            ..Default::default()
        }
        .into(),
        store,
    )
    .await
    .unwrap();
    assert_eq!(page.total_members, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.members.len(), 2);
    assert_eq!(page.members[0].membership_number, "NAUS-2020003");

    let inactive = Member::list(
        MemberSearch {
            status: Some(MemberStatus::Inactive),
            ..Default::default()
        }
        .into(),
        store,
    )
    .await
    .unwrap();
    assert_eq!(inactive.total_members, 1);
    assert_eq!(inactive.members[0].id, first.id);

    let searched = Member::list(
        MemberFilter {
            search: Some("TWO@".to_owned()),
            ..Default::default()
        },
        store,
    )
    .await
    .unwrap();
    assert_eq!(searched.total_members, 1);

    let by_number = Member::search("2020003", store).await.unwrap();
    assert_eq!(by_number.len(), 1);

    let without_account = Member::without_account(store).await.unwrap();
    assert_eq!(without_account.len(), 2);
}

#[tokio::test]
async fn pages_far_past_the_end_are_empty() {
    let harness = harness();
    member_record(&harness, "NAUS-2020001", "listed@example.com", false).await;

    let page = Member::directory(
        None,
        None,
        PageRequest {
            page: i64::MAX,
            limit: PageRequest::MAX_LIMIT,
        },
        &*harness.state.store,
    )
    .await
    .unwrap();

    assert!(page.members.is_empty());
    assert_eq!(page.total_members, 1);
}
