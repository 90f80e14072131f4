use async_graphql::{Context, ErrorExtensions, Guard, Result};

use crate::error::NausError;
use crate::models::admin::Admin;
use crate::models::credential::CurrentMember;

pub struct LoggedIn;

#[async_trait::async_trait]
impl Guard for LoggedIn {
    async fn check(&self, ctx: &Context<'_>) -> Result<()> {
        if ctx.data_opt::<CurrentMember>().is_some() {
            Ok(())
        } else {
            Err(NausError::Unauthorized("User must be logged in".to_owned()).extend())
        }
    }
}

pub struct AdminOnly;

#[async_trait::async_trait]
impl Guard for AdminOnly {
    async fn check(&self, ctx: &Context<'_>) -> Result<()> {
        if ctx.data_opt::<Admin>().is_some() {
            Ok(())
        } else {
            Err(NausError::Unauthorized("Admin must be logged in".to_owned()).extend())
        }
    }
}

/// A capability an admin's role may grant.
pub struct Permission {
    name: &'static str,
}

impl Permission {
    const fn new(name: &'static str) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn granted_to(&self, admin: &Admin) -> bool {
        admin.is_active && admin.role.grants(self.name)
    }

    pub const VIEW_APPLICATIONS: Self = Self::new("view-applications");
    pub const REVIEW_APPLICATIONS: Self = Self::new("review-applications");

    pub const VIEW_MEMBERS: Self = Self::new("view-members");
    pub const MANAGE_MEMBERS: Self = Self::new("manage-members");

    pub const MANAGE_ADMINS: Self = Self::new("manage-admins");
}

#[async_trait::async_trait]
impl Guard for Permission {
    async fn check(&self, ctx: &Context<'_>) -> Result<()> {
        match ctx.data_opt::<Admin>() {
            Some(admin) if self.granted_to(admin) => Ok(()),
            Some(_) => Err(
                NausError::Forbidden(format!("Permission {} required", self.name)).extend(),
            ),
            None => Err(NausError::Unauthorized("Admin must be logged in".to_owned()).extend()),
        }
    }
}
