mod common;

use async_graphql::{Request, Response};
use serde_json::{json, Value};

use naus::graphql::build_schema;
use naus::models::admin::{Admin, AdminRole};
use naus::models::credential::{Credential, NewAccount};

use common::*;

async fn run(harness: &Harness, request: impl Into<Request>) -> Value {
    let response: Response = build_schema(harness.state.clone())
        .execute(request)
        .await;

    serde_json::to_value(&response).unwrap()
}

fn error_code(response: &Value) -> &str {
    response["errors"][0]["extensions"]["code"]
        .as_str()
        .unwrap_or_else(|| panic!("expected an error in {}", response))
}

#[tokio::test]
async fn admin_queries_need_an_admin() {
    let harness = harness();

    let response = run(&harness, "{ applications { id } }").await;

    assert_eq!(error_code(&response), "UNAUTHORIZED");
    assert_eq!(response["errors"][0]["extensions"]["statusCode"], json!(401));
}

#[tokio::test]
async fn permissions_follow_the_admin_role() {
    let harness = harness();
    submit(&harness, "applicant@example.com").await;
    let content = admin(&harness, "content@naus.test", AdminRole::ContentAdmin).await;
    let membership = admin(&harness, "members@naus.test", AdminRole::MembershipAdmin).await;

    let listed = run(
        &harness,
        Request::new("{ applications { details { email } status } }").data(content.clone()),
    )
    .await;
    assert_eq!(
        listed["data"]["applications"],
        json!([{ "details": { "email": "applicant@example.com" }, "status": "PENDING" }])
    );

    let denied = run(
        &harness,
        Request::new("mutation { approveApplication(id: 1) { membershipNumber } }")
            .data(content),
    )
    .await;
    assert_eq!(error_code(&denied), "FORBIDDEN");

    let admins = run(
        &harness,
        Request::new("{ admins { totalAdmins } }").data(membership),
    )
    .await;
    assert_eq!(error_code(&admins), "FORBIDDEN");
}

#[tokio::test]
async fn reviewers_can_approve_through_the_api() {
    let harness = harness();
    let application = submit(&harness, "api@example.com").await;
    let reviewer = admin(&harness, "members@naus.test", AdminRole::MembershipAdmin).await;

    let response = run(
        &harness,
        Request::new(format!(
            "mutation {{ reviewApplication(id: {}, status: APPROVED, notes: \"ok\") {{ \
             membershipNumber emailSent application {{ status reviewedBy }} }} }}",
            application.id
        ))
        .data(reviewer.clone()),
    )
    .await;

    let outcome = &response["data"]["reviewApplication"];
    assert!(outcome["membershipNumber"]
        .as_str()
        .unwrap()
        .starts_with("NAUS-"));
    assert_eq!(outcome["emailSent"], json!(true));
    assert_eq!(outcome["application"]["status"], json!("APPROVED"));
    assert_eq!(outcome["application"]["reviewedBy"], json!(reviewer.id));

    let again = run(
        &harness,
        Request::new(format!(
            "mutation {{ approveApplication(id: {}) {{ membershipNumber }} }}",
            application.id
        ))
        .data(reviewer),
    )
    .await;
    assert_eq!(error_code(&again), "INVALID_STATE");
}

#[tokio::test]
async fn verification_is_public() {
    let harness = harness();
    member_record(&harness, "NAUS-2019004", "public@example.com", false).await;

    let response = run(
        &harness,
        r#"{ verifyMembership(membershipNumber: "2019004") { valid fullName membershipNumber } }"#,
    )
    .await;

    assert_eq!(
        response["data"]["verifyMembership"],
        json!({ "valid": true, "fullName": "Bola Adeyemi", "membershipNumber": "NAUS-2019004" })
    );
}

#[tokio::test]
async fn validation_errors_name_the_field() {
    let harness = harness();

    let response = run(
        &harness,
        r#"{ verifyMembership(membershipNumber: "abc") { valid } }"#,
    )
    .await;

    assert_eq!(error_code(&response), "VALIDATION_ERROR");
    assert_eq!(
        response["errors"][0]["extensions"]["field"],
        json!("membershipNumber")
    );
}

#[tokio::test]
async fn members_see_their_own_profile() {
    let harness = harness();
    member_record(&harness, "NAUS-2019004", "me@example.com", false).await;
    Credential::create_account(
        NewAccount {
            email: "me@example.com".to_owned(),
            membership_number: "NAUS-2019004".to_owned(),
            password: "my-password".to_owned(),
        },
        &harness.state,
    )
    .await
    .unwrap();
    let session = Credential::login("me@example.com", "my-password", &harness.state)
        .await
        .unwrap();
    let current = Credential::authenticate(session.credential.id, &harness.state)
        .await
        .unwrap();

    let anonymous = run(&harness, "{ me { membershipNumber } }").await;
    assert_eq!(error_code(&anonymous), "UNAUTHORIZED");

    let response = run(
        &harness,
        Request::new("{ me { membershipNumber hasAccount } }").data(current.clone()),
    )
    .await;
    assert_eq!(
        response["data"]["me"],
        json!({ "membershipNumber": "NAUS-2019004", "hasAccount": true })
    );

    let hidden = run(
        &harness,
        Request::new("mutation { setDirectoryVisibility(visible: false) { showInDirectory } }")
            .data(current),
    )
    .await;
    assert_eq!(
        hidden["data"]["setDirectoryVisibility"]["showInDirectory"],
        json!(false)
    );
}

#[tokio::test]
async fn admins_cannot_delete_themselves_through_the_api() {
    let harness = harness();
    let root = admin(&harness, "root@naus.test", AdminRole::SuperAdmin).await;

    let response = run(
        &harness,
        Request::new(format!("mutation {{ deleteAdmin(id: {}) {{ id }} }}", root.id))
            .data(root.clone()),
    )
    .await;
    assert_eq!(error_code(&response), "FORBIDDEN");

    let current = run(
        &harness,
        Request::new("{ currentAdmin { email role } }").data(root.clone()),
    )
    .await;
    assert_eq!(
        current["data"]["currentAdmin"],
        json!({ "email": "root@naus.test", "role": "SUPER_ADMIN" })
    );
    assert!(Admin::authenticate(root.id, &*harness.state.store)
        .await
        .is_ok());
}

#[tokio::test]
async fn password_hashes_are_not_exposed() {
    let harness = harness();
    let root = admin(&harness, "root@naus.test", AdminRole::SuperAdmin).await;

    let response = run(
        &harness,
        Request::new("{ currentAdmin { passwordHash } }").data(root),
    )
    .await;

    assert!(response["errors"].is_array());
    assert!(response["data"].is_null());
}

#[tokio::test]
async fn contact_messages_reach_the_secretariat() {
    let harness = harness();

    let response = run(
        &harness,
        r#"mutation { contact(message: { name: "Visitor", email: "visitor@example.com", message: "Hello" }) }"#,
    )
    .await;

    assert_eq!(response["data"]["contact"], json!(true));
    let email = harness.mailer.last_to("secretariat@naus.test", "contact");
    assert!(email.html.contains("Hello"));
}
