use askama::Template;

use crate::email::{Email, Recipient};

/// Sent when a member gets a login, either through self-service or an import.
#[derive(Template)]
#[template(path = "welcome.html")]
pub struct WelcomeEmail {
    pub name: String,
    pub email: String,
    pub membership_number: String,
    pub temporary_password: Option<String>,
    pub login_url: String,
}

impl Email for WelcomeEmail {
    fn kind(&self) -> &'static str {
        "welcome"
    }

    fn subject(&self) -> String {
        "Welcome to the NAUS Member Portal".to_owned()
    }

    fn recipient(&self) -> Recipient {
        Recipient::named(&self.name, &self.email)
    }
}

#[derive(Template)]
#[template(path = "reset-password.html")]
pub struct ResetPasswordEmail {
    pub name: String,
    pub email: String,
    pub reset_link: String,
}

impl Email for ResetPasswordEmail {
    fn kind(&self) -> &'static str {
        "password-reset"
    }

    fn subject(&self) -> String {
        "Reset Your NAUS Password".to_owned()
    }

    fn recipient(&self) -> Recipient {
        Recipient::named(&self.name, &self.email)
    }
}

#[derive(Template)]
#[template(path = "password-changed.html")]
pub struct PasswordChangedEmail {
    pub name: String,
    pub email: String,
}

impl Email for PasswordChangedEmail {
    fn kind(&self) -> &'static str {
        "password-changed"
    }

    fn subject(&self) -> String {
        "Your NAUS Password Was Changed".to_owned()
    }

    fn recipient(&self) -> Recipient {
        Recipient::named(&self.name, &self.email)
    }
}

#[derive(Template)]
#[template(path = "admin-welcome.html")]
pub struct AdminWelcomeEmail {
    pub name: String,
    pub email: String,
    pub role: String,
    pub temporary_password: Option<String>,
    pub login_url: String,
}

impl Email for AdminWelcomeEmail {
    fn kind(&self) -> &'static str {
        "admin-welcome"
    }

    fn subject(&self) -> String {
        "Your NAUS Admin Account".to_owned()
    }

    fn recipient(&self) -> Recipient {
        Recipient::named(&self.name, &self.email)
    }
}
