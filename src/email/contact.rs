use askama::Template;

use crate::email::{Email, Recipient};

/// A message from the public contact form, forwarded to the secretariat.
#[derive(Template)]
#[template(path = "contact.html")]
pub struct ContactEmail {
    pub to: String,
    pub sender_name: String,
    pub sender_email: String,
    pub topic: String,
    pub message: String,
}

impl Email for ContactEmail {
    fn kind(&self) -> &'static str {
        "contact"
    }

    fn subject(&self) -> String {
        format!("Contact Form: {}", self.topic)
    }

    fn recipient(&self) -> Recipient {
        Recipient::address(&self.to)
    }
}
