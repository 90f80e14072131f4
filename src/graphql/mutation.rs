use async_graphql::{Context, ErrorExtensions, Object, Result, ResultExt};

use crate::error::NausError;
use crate::file::{FileKind, FileUpload};
use crate::graphql::guards::{AdminOnly, LoggedIn, Permission};
use crate::graphql::{app_state, current_admin, current_member, SUCCESS_MESSAGE};
use crate::models::admin::{
    Admin, AdminLoginPayload, AdminUpdate, CreatedAdmin, NewAdminForm,
};
use crate::models::application::{Application, ApplicationStatus, NewApplication, PaymentStatus};
use crate::models::approval::{self, ApprovalOutcome, ReviewOutcome};
use crate::models::contact::ContactMessage;
use crate::models::credential::{Credential, LoginPayload, NewAccount, PasswordChange};
use crate::models::member::{ExistingMember, ImportOutcome, Member, MemberUpdate, MembershipType};
use crate::models::password_reset::PasswordReset;

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Submits a membership application for review
    pub async fn submit_application(
        &self,
        ctx: &Context<'_>,
        form: NewApplication,
    ) -> Result<Application> {
        Application::submit(form, app_state(ctx)).await.extend()
    }

    /// Approves, rejects or starts reviewing an application
    #[graphql(guard = "Permission::REVIEW_APPLICATIONS")]
    pub async fn review_application(
        &self,
        ctx: &Context<'_>,
        id: i32,
        status: ApplicationStatus,
        notes: Option<String>,
    ) -> Result<ReviewOutcome> {
        let admin = current_admin(ctx)?;
        approval::review(id, status, admin.id, notes, app_state(ctx))
            .await
            .extend()
    }

    #[graphql(guard = "Permission::REVIEW_APPLICATIONS")]
    pub async fn approve_application(
        &self,
        ctx: &Context<'_>,
        id: i32,
        notes: Option<String>,
    ) -> Result<ApprovalOutcome> {
        let admin = current_admin(ctx)?;
        approval::approve(id, admin.id, notes, app_state(ctx))
            .await
            .extend()
    }

    /// Returns whether the rejection email was sent
    #[graphql(guard = "Permission::REVIEW_APPLICATIONS")]
    pub async fn reject_application(
        &self,
        ctx: &Context<'_>,
        id: i32,
        notes: Option<String>,
    ) -> Result<bool> {
        let admin = current_admin(ctx)?;
        approval::reject(id, admin.id, notes, app_state(ctx))
            .await
            .extend()
    }

    #[graphql(guard = "Permission::REVIEW_APPLICATIONS")]
    pub async fn set_payment_status(
        &self,
        ctx: &Context<'_>,
        id: i32,
        status: PaymentStatus,
    ) -> Result<Application> {
        approval::set_payment_status(id, status, &*app_state(ctx).store)
            .await
            .extend()
    }

    #[graphql(guard = "Permission::MANAGE_MEMBERS")]
    pub async fn update_member(
        &self,
        ctx: &Context<'_>,
        membership_number: String,
        mut update: MemberUpdate,
        membership_type: Option<MembershipType>,
        is_active: Option<bool>,
    ) -> Result<Member> {
        let state = app_state(ctx);
        let member = Member::with_number(&membership_number, &*state.store)
            .await
            .extend()?;
        update.membership_type = membership_type;
        update.is_active = is_active;

        Member::update(member.id, update, state).await.extend()
    }

    #[graphql(guard = "Permission::MANAGE_MEMBERS")]
    pub async fn toggle_member_active(
        &self,
        ctx: &Context<'_>,
        membership_number: String,
    ) -> Result<Member> {
        let state = app_state(ctx);
        let member = Member::with_number(&membership_number, &*state.store)
            .await
            .extend()?;

        Member::toggle_active(member.id, state).await.extend()
    }

    /// Deletes the member along with their login and applications
    #[graphql(guard = "Permission::MANAGE_MEMBERS")]
    pub async fn delete_member(
        &self,
        ctx: &Context<'_>,
        membership_number: String,
    ) -> Result<&'static str> {
        let state = app_state(ctx);
        let member = Member::with_number(&membership_number, &*state.store)
            .await
            .extend()?;
        Member::delete(member.id, state).await.extend()?;

        Ok(SUCCESS_MESSAGE)
    }

    #[graphql(guard = "Permission::MANAGE_MEMBERS")]
    pub async fn import_existing_member(
        &self,
        ctx: &Context<'_>,
        input: ExistingMember,
    ) -> Result<ImportOutcome> {
        let admin = current_admin(ctx)?;
        Member::import_existing(input, admin.id, app_state(ctx))
            .await
            .extend()
    }

    /// Creates a login for a member who joined before the portal
    pub async fn create_account(&self, ctx: &Context<'_>, account: NewAccount) -> Result<Member> {
        Credential::create_account(account, app_state(ctx))
            .await
            .extend()
    }

    /// Gets a login token on successful login
    pub async fn login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> Result<LoginPayload> {
        let session = Credential::login(&email, &password, app_state(ctx))
            .await
            .extend()?;

        Ok(LoginPayload {
            token: session.token,
            member: session.member,
        })
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn update_profile(&self, ctx: &Context<'_>, update: MemberUpdate) -> Result<Member> {
        let member = &current_member(ctx)?.member;
        let update = MemberUpdate {
            membership_type: None,
            is_active: None,
            ..update
        };

        Member::update(member.id, update, app_state(ctx))
            .await
            .extend()
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn upload_certificate(
        &self,
        ctx: &Context<'_>,
        kind: FileKind,
        file: FileUpload,
    ) -> Result<Member> {
        if !kind.is_certificate() {
            return Err(NausError::validation("kind", "Not a certificate").extend());
        }
        let member = &current_member(ctx)?.member;

        Member::attach_file(member.id, kind, file, app_state(ctx))
            .await
            .extend()
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn upload_profile_photo(&self, ctx: &Context<'_>, file: FileUpload) -> Result<Member> {
        let member = &current_member(ctx)?.member;

        Member::attach_file(member.id, FileKind::ProfilePhoto, file, app_state(ctx))
            .await
            .extend()
    }

    /// Lists or hides the member in the public directory
    #[graphql(guard = "LoggedIn")]
    pub async fn set_directory_visibility(
        &self,
        ctx: &Context<'_>,
        visible: bool,
    ) -> Result<Member> {
        let member = &current_member(ctx)?.member;

        Member::set_directory_visibility(member.id, visible, &*app_state(ctx).store)
            .await
            .extend()
    }

    #[graphql(guard = "LoggedIn")]
    pub async fn change_password(
        &self,
        ctx: &Context<'_>,
        change: PasswordChange,
    ) -> Result<&'static str> {
        let credential = &current_member(ctx)?.credential;
        Credential::change_password(credential.id, change, app_state(ctx))
            .await
            .extend()?;

        Ok(SUCCESS_MESSAGE)
    }

    /// Emails a password reset link, if the account exists
    pub async fn forgot_password(&self, ctx: &Context<'_>, email: String) -> Result<&'static str> {
        PasswordReset::request(&email, app_state(ctx))
            .await
            .extend()
    }

    pub async fn reset_password(
        &self,
        ctx: &Context<'_>,
        token: String,
        password: String,
    ) -> Result<&'static str> {
        PasswordReset::redeem(&token, &password, app_state(ctx))
            .await
            .extend()?;

        Ok(SUCCESS_MESSAGE)
    }

    /// Forwards a message to the secretariat. Returns whether it was sent
    pub async fn contact(&self, ctx: &Context<'_>, message: ContactMessage) -> Result<bool> {
        message.send(app_state(ctx)).await.extend()
    }

    pub async fn admin_login(
        &self,
        ctx: &Context<'_>,
        email: String,
        password: String,
    ) -> Result<AdminLoginPayload> {
        Admin::login(&email, &password, app_state(ctx))
            .await
            .extend()
    }

    #[graphql(guard = "Permission::MANAGE_ADMINS")]
    pub async fn create_admin(&self, ctx: &Context<'_>, form: NewAdminForm) -> Result<CreatedAdmin> {
        Admin::create(form, app_state(ctx)).await.extend()
    }

    #[graphql(guard = "Permission::MANAGE_ADMINS")]
    pub async fn update_admin(
        &self,
        ctx: &Context<'_>,
        id: i32,
        update: AdminUpdate,
    ) -> Result<Admin> {
        Admin::update(id, update, &*app_state(ctx).store)
            .await
            .extend()
    }

    /// Deactivates another admin
    #[graphql(guard = "Permission::MANAGE_ADMINS")]
    pub async fn delete_admin(&self, ctx: &Context<'_>, id: i32) -> Result<Admin> {
        let admin = current_admin(ctx)?;
        Admin::deactivate(id, admin.id, &*app_state(ctx).store)
            .await
            .extend()
    }

    /// Changes the logged in admin's own name or email
    #[graphql(guard = "AdminOnly")]
    pub async fn update_current_admin(
        &self,
        ctx: &Context<'_>,
        name: Option<String>,
        email: Option<String>,
    ) -> Result<Admin> {
        let admin = current_admin(ctx)?;
        let update = AdminUpdate {
            name,
            email,
            ..Default::default()
        };

        Admin::update(admin.id, update, &*app_state(ctx).store)
            .await
            .extend()
    }

    #[graphql(guard = "AdminOnly")]
    pub async fn change_admin_password(
        &self,
        ctx: &Context<'_>,
        change: PasswordChange,
    ) -> Result<&'static str> {
        let admin = current_admin(ctx)?;
        Admin::change_password(admin.id, change, app_state(ctx))
            .await
            .extend()?;

        Ok(SUCCESS_MESSAGE)
    }
}
