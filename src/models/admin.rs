use async_graphql::{Enum, InputObject, SimpleObject};
use sqlx::FromRow;
use tracing::info;

use crate::auth::Principal;
use crate::email::account::{AdminWelcomeEmail, PasswordChangedEmail};
use crate::error::{NausError, NausResult};
use crate::models::credential::PasswordChange;
use crate::models::{GqlDateTime, PageRequest};
use crate::state::AppState;
use crate::store::Store;
use crate::util::{
    current_time, non_blank, normalize_email, page_count, require, temporary_password,
    validate_email, validate_password,
};

#[derive(Enum, sqlx::Type, Copy, Clone, Debug, PartialEq, Eq)]
#[sqlx(type_name = "admin_role", rename_all = "snake_case")]
pub enum AdminRole {
    SuperAdmin,
    MembershipAdmin,
    ContentAdmin,
}

impl AdminRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminRole::SuperAdmin => "super_admin",
            AdminRole::MembershipAdmin => "membership_admin",
            AdminRole::ContentAdmin => "content_admin",
        }
    }

    /// The names of the permissions held by the role. Super admins hold every
    /// permission, so they aren't listed here.
    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            AdminRole::SuperAdmin => &[],
            AdminRole::MembershipAdmin => &[
                "view-applications",
                "review-applications",
                "view-members",
                "manage-members",
            ],
            AdminRole::ContentAdmin => &["view-applications", "view-members"],
        }
    }

    pub fn grants(&self, permission: &str) -> bool {
        *self == AdminRole::SuperAdmin || self.permissions().contains(&permission)
    }
}

#[derive(SimpleObject, FromRow, Clone, Debug)]
pub struct Admin {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub role: AdminRole,
    pub is_active: bool,
    pub last_login: Option<GqlDateTime>,
    pub login_count: i32,
    pub created_at: GqlDateTime,
    pub updated_at: GqlDateTime,

    #[graphql(skip)]
    pub password_hash: String,
}

#[derive(Clone, Debug)]
pub struct NewAdmin {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: AdminRole,
}

#[derive(InputObject, Clone, Debug)]
pub struct NewAdminForm {
    pub email: String,
    pub name: String,
    /// Generated and emailed to the new admin when left out
    pub password: Option<String>,
    pub role: Option<AdminRole>,
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct AdminUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<AdminRole>,
    pub is_active: Option<bool>,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct AdminLoginPayload {
    pub token: String,
    pub admin: Admin,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct AdminPage {
    pub admins: Vec<Admin>,
    pub total_pages: i64,
    pub current_page: i64,
    pub total_admins: i64,
}

#[derive(SimpleObject, Clone, Debug)]
pub struct CreatedAdmin {
    pub admin: Admin,
    pub email_sent: bool,
}

impl Admin {
    pub async fn with_id(id: i32, store: &dyn Store) -> NausResult<Self> {
        let mut tx = store.begin().await?;
        tx.admin_with_id(id)
            .await?
            .ok_or_else(|| NausError::not_found(format!("No admin with id {}", id)))
    }

    pub async fn login(email: &str, password: &str, state: &AppState) -> NausResult<AdminLoginPayload> {
        let email = normalize_email(email);
        let invalid = || NausError::Unauthorized("Invalid email or password".to_owned());

        let mut tx = state.store.begin().await?;
        let admin = tx.admin_with_email(&email).await?.ok_or_else(invalid)?;
        if !state.hasher.verify(password, &admin.password_hash)? {
            return Err(invalid());
        }
        if !admin.is_active {
            return Err(NausError::Forbidden("Account is inactive".to_owned()));
        }

        let admin = tx
            .record_admin_login(admin.id, current_time())
            .await?
            .ok_or_else(invalid)?;
        tx.commit().await?;

        let token = state.tokens.issue(&Principal::admin(&admin))?;
        info!(admin = admin.id, "admin logged in");

        Ok(AdminLoginPayload { token, admin })
    }

    /// Loads the active admin a token was issued to.
    pub async fn authenticate(id: i32, store: &dyn Store) -> NausResult<Self> {
        let mut tx = store.begin().await?;
        tx.admin_with_id(id)
            .await?
            .filter(|admin| admin.is_active)
            .ok_or_else(|| NausError::Unauthorized("Invalid or expired token".to_owned()))
    }

    pub async fn list(
        search: Option<String>,
        page: PageRequest,
        store: &dyn Store,
    ) -> NausResult<AdminPage> {
        let page = page.normalized();
        let search = non_blank(search);
        let mut tx = store.begin().await?;
        let (admins, total) = tx.admins(search.as_deref(), page).await?;

        Ok(AdminPage {
            admins,
            total_pages: page_count(total, page.limit),
            current_page: page.page,
            total_admins: total,
        })
    }

    pub async fn create(form: NewAdminForm, state: &AppState) -> NausResult<CreatedAdmin> {
        validate_email("email", &form.email)?;
        require("name", &form.name)?;
        let generated = form.password.is_none();
        let password = match form.password {
            Some(password) => {
                validate_password("password", &password)?;
                password
            }
            None => temporary_password(),
        };
        let role = form.role.unwrap_or(AdminRole::MembershipAdmin);
        let email = normalize_email(&form.email);

        let new_admin = NewAdmin {
            email: email.clone(),
            name: form.name.trim().to_owned(),
            password_hash: state.hasher.hash(&password)?,
            role,
        };

        let mut tx = state.store.begin().await?;
        if tx.admin_with_email(&email).await?.is_some() {
            return Err(NausError::conflict("An admin with this email already exists"));
        }
        let admin = tx.insert_admin(&new_admin, current_time()).await?;
        tx.commit().await?;

        info!(admin = admin.id, role = role.as_str(), "admin created");
        let email_sent = state
            .notifier
            .send(AdminWelcomeEmail {
                name: admin.name.clone(),
                email: admin.email.clone(),
                role: role.as_str().to_owned(),
                temporary_password: generated.then(|| password),
                login_url: state.frontend_link("/admin/login"),
            })
            .await;

        Ok(CreatedAdmin { admin, email_sent })
    }

    pub async fn update(id: i32, update: AdminUpdate, store: &dyn Store) -> NausResult<Self> {
        if let Some(email) = &update.email {
            validate_email("email", email)?;
        }
        if let Some(name) = &update.name {
            require("name", name)?;
        }

        let mut tx = store.begin().await?;
        let mut admin = tx
            .admin_with_id(id)
            .await?
            .ok_or_else(|| NausError::not_found(format!("No admin with id {}", id)))?;

        if let Some(email) = update.email.as_deref().map(normalize_email) {
            if email != admin.email {
                if tx.admin_with_email(&email).await?.is_some() {
                    return Err(NausError::conflict("Email is already in use by another admin"));
                }
                admin.email = email;
            }
        }
        if let Some(name) = update.name {
            admin.name = name.trim().to_owned();
        }
        if let Some(role) = update.role {
            admin.role = role;
        }
        if let Some(is_active) = update.is_active {
            admin.is_active = is_active;
        }

        admin.updated_at = current_time().into();
        tx.save_admin(&admin).await?;
        tx.commit().await?;

        Ok(admin)
    }

    /// Deactivates the admin. Their record stays for the review history.
    pub async fn deactivate(id: i32, acting_admin: i32, store: &dyn Store) -> NausResult<Self> {
        if id == acting_admin {
            return Err(NausError::Forbidden(
                "You cannot delete your own account".to_owned(),
            ));
        }

        let update = AdminUpdate {
            is_active: Some(false),
            ..Default::default()
        };
        let admin = Self::update(id, update, store).await?;
        info!(admin = id, by = acting_admin, "admin deactivated");

        Ok(admin)
    }

    /// Returns whether the confirmation email was sent.
    pub async fn change_password(
        id: i32,
        change: PasswordChange,
        state: &AppState,
    ) -> NausResult<bool> {
        change.validate()?;

        let mut tx = state.store.begin().await?;
        let mut admin = tx
            .admin_with_id(id)
            .await?
            .ok_or_else(|| NausError::not_found(format!("No admin with id {}", id)))?;
        if !state
            .hasher
            .verify(&change.current_password, &admin.password_hash)?
        {
            return Err(NausError::Unauthorized(
                "Current password is incorrect".to_owned(),
            ));
        }

        admin.password_hash = state.hasher.hash(&change.new_password)?;
        admin.updated_at = current_time().into();
        tx.save_admin(&admin).await?;
        tx.commit().await?;

        Ok(state
            .notifier
            .send(PasswordChangedEmail {
                name: admin.name,
                email: admin.email,
            })
            .await)
    }
}
