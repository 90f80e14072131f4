use askama::Template;

use crate::email::{Email, Recipient};

#[derive(Template)]
#[template(path = "approval.html")]
pub struct ApprovalEmail {
    pub name: String,
    pub email: String,
    pub membership_number: String,
    pub temporary_password: String,
    pub login_url: String,
}

impl Email for ApprovalEmail {
    fn kind(&self) -> &'static str {
        "approval"
    }

    fn subject(&self) -> String {
        "Your NAUS Membership Application Has Been Approved".to_owned()
    }

    fn recipient(&self) -> Recipient {
        Recipient::named(&self.name, &self.email)
    }
}

#[derive(Template)]
#[template(path = "rejection.html")]
pub struct RejectionEmail {
    pub name: String,
    pub email: String,
    pub reason: String,
}

impl Email for RejectionEmail {
    fn kind(&self) -> &'static str {
        "rejection"
    }

    fn subject(&self) -> String {
        "Update on Your NAUS Membership Application".to_owned()
    }

    fn recipient(&self) -> Recipient {
        Recipient::named(&self.name, &self.email)
    }
}
