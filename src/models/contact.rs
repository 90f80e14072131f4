use async_graphql::InputObject;

use crate::email::contact::ContactEmail;
use crate::error::NausResult;
use crate::state::AppState;
use crate::util::{non_blank, normalize_email, require, validate_email};

#[derive(InputObject, Clone, Debug)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: Option<String>,
    pub message: String,
}

impl ContactMessage {
    /// Forwards the message to the secretariat. Returns whether it was sent.
    pub async fn send(self, state: &AppState) -> NausResult<bool> {
        require("name", &self.name)?;
        validate_email("email", &self.email)?;
        require("message", &self.message)?;

        Ok(state
            .notifier
            .send(ContactEmail {
                to: state.config.contact_email.clone(),
                sender_name: self.name.trim().to_owned(),
                sender_email: normalize_email(&self.email),
                topic: non_blank(self.subject).unwrap_or_else(|| "General Inquiry".to_owned()),
                message: self.message.trim().to_owned(),
            })
            .await)
    }
}
