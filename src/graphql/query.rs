use async_graphql::{Context, Object, Result, ResultExt};

use crate::graphql::guards::{AdminOnly, LoggedIn, Permission};
use crate::graphql::{app_state, current_admin, current_member};
use crate::models::admin::{Admin, AdminPage};
use crate::models::application::{Application, ApplicationStatus};
use crate::models::member::{
    DirectoryPage, Member, MemberPage, MemberSearch, PublicProfile, Verification,
};
use crate::models::PageRequest;

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// The logged in member
    #[graphql(guard = "LoggedIn")]
    pub async fn me(&self, ctx: &Context<'_>) -> Result<Member> {
        Ok(current_member(ctx)?.member.clone())
    }

    /// The logged in admin
    #[graphql(guard = "AdminOnly")]
    pub async fn current_admin(&self, ctx: &Context<'_>) -> Result<Admin> {
        current_admin(ctx).cloned()
    }

    /// All applications, newest first
    #[graphql(guard = "Permission::VIEW_APPLICATIONS")]
    pub async fn applications(
        &self,
        ctx: &Context<'_>,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>> {
        Application::all(status, &*app_state(ctx).store)
            .await
            .extend()
    }

    #[graphql(guard = "Permission::VIEW_APPLICATIONS")]
    pub async fn application(&self, ctx: &Context<'_>, id: i32) -> Result<Application> {
        Application::with_id(id, &*app_state(ctx).store)
            .await
            .extend()
    }

    #[graphql(guard = "Permission::VIEW_APPLICATIONS")]
    pub async fn application_by_email(
        &self,
        ctx: &Context<'_>,
        email: String,
    ) -> Result<Application> {
        Application::with_email(&email, &*app_state(ctx).store)
            .await
            .extend()
    }

    #[graphql(guard = "Permission::VIEW_MEMBERS")]
    pub async fn members(
        &self,
        ctx: &Context<'_>,
        #[graphql(default)] filter: MemberSearch,
    ) -> Result<MemberPage> {
        Member::list(filter.into(), &*app_state(ctx).store)
            .await
            .extend()
    }

    /// Up to 50 members matching the term, ordered by name
    #[graphql(guard = "Permission::VIEW_MEMBERS")]
    pub async fn search_members(&self, ctx: &Context<'_>, term: String) -> Result<Vec<Member>> {
        Member::search(&term, &*app_state(ctx).store)
            .await
            .extend()
    }

    #[graphql(guard = "Permission::VIEW_MEMBERS")]
    pub async fn member(&self, ctx: &Context<'_>, membership_number: String) -> Result<Member> {
        Member::with_number(&membership_number, &*app_state(ctx).store)
            .await
            .extend()
    }

    #[graphql(guard = "Permission::VIEW_MEMBERS")]
    pub async fn member_by_email(&self, ctx: &Context<'_>, email: String) -> Result<Member> {
        Member::with_email(&email, &*app_state(ctx).store)
            .await
            .extend()
    }

    /// Members who have not created a login yet
    #[graphql(guard = "Permission::VIEW_MEMBERS")]
    pub async fn existing_members_without_account(
        &self,
        ctx: &Context<'_>,
    ) -> Result<Vec<Member>> {
        Member::without_account(&*app_state(ctx).store)
            .await
            .extend()
    }

    #[graphql(guard = "Permission::MANAGE_ADMINS")]
    pub async fn admins(
        &self,
        ctx: &Context<'_>,
        search: Option<String>,
        #[graphql(default)] page: PageRequest,
    ) -> Result<AdminPage> {
        Admin::list(search, page, &*app_state(ctx).store)
            .await
            .extend()
    }

    /// The public member directory
    pub async fn directory(
        &self,
        ctx: &Context<'_>,
        search: Option<String>,
        specialty: Option<String>,
        #[graphql(default = 1)] page: i64,
        #[graphql(default = 20)] limit: i64,
    ) -> Result<DirectoryPage> {
        Member::directory(
            search,
            specialty,
            PageRequest::new(page, limit),
            &*app_state(ctx).store,
        )
        .await
        .extend()
    }

    pub async fn public_profile(
        &self,
        ctx: &Context<'_>,
        membership_number: String,
    ) -> Result<PublicProfile> {
        Member::public_profile(&membership_number, &*app_state(ctx).store)
            .await
            .extend()
    }

    /// Checks whether a membership number belongs to a member
    pub async fn verify_membership(
        &self,
        ctx: &Context<'_>,
        membership_number: String,
    ) -> Result<Verification> {
        Member::verify(&membership_number, &*app_state(ctx).store)
            .await
            .extend()
    }
}
