//! Notification orchestration: welcome mail and newsletter membership.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::auth::models::Account;
use crate::config::MailConfig;
use crate::errors::{Error, Result};
use crate::notifications::mail::MailProvider;
use crate::observability::metrics;

/// Service coordinating mail-provider side effects.
#[derive(Clone)]
pub struct NotificationService {
    mail: Arc<dyn MailProvider>,
    newsletter_list_id: String,
    welcome_template_id: i64,
}

impl NotificationService {
    pub fn new(mail: Arc<dyn MailProvider>, config: &MailConfig) -> Self {
        Self {
            mail,
            newsletter_list_id: config.newsletter_list_id.clone(),
            welcome_template_id: config.welcome_template_id,
        }
    }

    /// Send the welcome message to a freshly registered account.
    ///
    /// # Errors
    ///
    /// - `Validation` when the account has no email identifier
    /// - `Dependency` when the provider call fails
    #[instrument(skip(self, account), fields(account_id = %account.id))]
    pub async fn send_welcome_message(&self, account: &Account) -> Result<()> {
        let email = account
            .identifier
            .email
            .as_deref()
            .ok_or_else(|| Error::validation("Account has no email identifier"))?;

        self.mail
            .send_template(email, Some(&account.identifier.username), self.welcome_template_id)
            .await?;

        info!(account_id = %account.id, "welcome message sent");
        Ok(())
    }

    /// Subscribe an email address to the newsletter list, registering the
    /// contact first when the provider does not know it yet.
    #[instrument(skip(self), fields(email = %email))]
    pub async fn subscribe_to_newsletter(&self, email: &str) -> Result<()> {
        if self.mail.find_contact(email).await?.is_none() {
            self.mail.add_contact(email, None).await?;
        }

        let result = self.mail.subscribe_contact(email, &self.newsletter_list_id).await;
        metrics::record_mail_dispatch("subscribe", result.is_ok());
        result?;

        info!(email = %email, "subscribed to newsletter");
        Ok(())
    }

    /// Unsubscribe an email address from the newsletter list.
    ///
    /// # Errors
    ///
    /// - `Validation` when the address is not a known contact
    #[instrument(skip(self, reason), fields(email = %email))]
    pub async fn unsubscribe_from_newsletter(
        &self,
        email: &str,
        reason: Option<&str>,
    ) -> Result<()> {
        if self.mail.find_contact(email).await?.is_none() {
            return Err(Error::validation("Email is not registered in our lists"));
        }

        let result = self.mail.unsubscribe_contact(email, &self.newsletter_list_id).await;
        metrics::record_mail_dispatch("unsubscribe", result.is_ok());
        result?;

        info!(email = %email, reason = reason.unwrap_or("unspecified"), "unsubscribed from newsletter");
        Ok(())
    }
}
