//! Mail provider client.
//!
//! [`MailProvider`] is the seam the rest of the crate depends on; the
//! production implementation talks to a Mailjet-style REST API over HTTPS
//! with basic authentication. Provider failures surface as dependency
//! errors and are never allowed to abort a sign-up (see the credential
//! service's fire-and-forget dispatch).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::config::MailConfig;
use crate::errors::{Error, Result};

/// A contact known to the mail provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContactEnvelope {
    #[serde(rename = "Data", default)]
    data: Vec<Contact>,
}

/// Outbound mail operations used by the notification service.
#[async_trait]
pub trait MailProvider: Send + Sync {
    /// Look a contact up by email; `None` when unknown to the provider
    async fn find_contact(&self, email: &str) -> Result<Option<Contact>>;

    /// Register a new contact
    async fn add_contact(&self, email: &str, name: Option<&str>) -> Result<Contact>;

    /// Subscribe a contact to a list
    async fn subscribe_contact(&self, email: &str, list_id: &str) -> Result<()>;

    /// Unsubscribe a contact from a list
    async fn unsubscribe_contact(&self, email: &str, list_id: &str) -> Result<()>;

    /// Send a transactional template message
    async fn send_template(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        template_id: i64,
    ) -> Result<()>;
}

/// Mailjet REST client.
#[derive(Clone)]
pub struct MailjetClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    from_email: String,
    from_name: String,
}

impl MailjetClient {
    pub fn new(config: &MailConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            from_email: config.from_email.clone(),
            from_name: config.from_name.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.basic_auth(&self.api_key, Some(&self.api_secret))
    }

    async fn check_status(response: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::dependency(
                "mailjet",
                format!("{} failed with status {}", context, status.as_u16()),
            ))
        }
    }
}

#[async_trait]
impl MailProvider for MailjetClient {
    #[instrument(skip(self), fields(email = %email))]
    async fn find_contact(&self, email: &str) -> Result<Option<Contact>> {
        let response = self
            .request(self.http.get(self.url(&format!("/v3/REST/contact/{}", email))))
            .send()
            .await
            .map_err(|err| Error::dependency("mailjet", format!("contact lookup failed: {}", err)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let envelope: ContactEnvelope = Self::check_status(response, "contact lookup")
            .await?
            .json()
            .await
            .map_err(|err| {
                Error::dependency("mailjet", format!("contact lookup returned bad body: {}", err))
            })?;

        Ok(envelope.data.into_iter().next())
    }

    #[instrument(skip(self), fields(email = %email))]
    async fn add_contact(&self, email: &str, name: Option<&str>) -> Result<Contact> {
        let body = json!({
            "Email": email,
            "Name": name,
        });

        let response = self
            .request(self.http.post(self.url("/v3/REST/contact")).json(&body))
            .send()
            .await
            .map_err(|err| {
                Error::dependency("mailjet", format!("contact creation failed: {}", err))
            })?;

        let envelope: ContactEnvelope = Self::check_status(response, "contact creation")
            .await?
            .json()
            .await
            .map_err(|err| {
                Error::dependency("mailjet", format!("contact creation returned bad body: {}", err))
            })?;

        envelope
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::dependency("mailjet", "contact creation returned no contact"))
    }

    #[instrument(skip(self), fields(email = %email, list_id = %list_id))]
    async fn subscribe_contact(&self, email: &str, list_id: &str) -> Result<()> {
        let body = json!({
            "Email": email,
            "Action": "addforce",
        });

        let response = self
            .request(
                self.http
                    .post(self.url(&format!("/v3/REST/contactslist/{}/managecontact", list_id)))
                    .json(&body),
            )
            .send()
            .await
            .map_err(|err| Error::dependency("mailjet", format!("subscribe failed: {}", err)))?;

        Self::check_status(response, "subscribe").await?;
        debug!(email = %email, list_id = %list_id, "contact subscribed");
        Ok(())
    }

    #[instrument(skip(self), fields(email = %email, list_id = %list_id))]
    async fn unsubscribe_contact(&self, email: &str, list_id: &str) -> Result<()> {
        let body = json!({
            "Email": email,
            "Action": "unsub",
        });

        let response = self
            .request(
                self.http
                    .post(self.url(&format!("/v3/REST/contactslist/{}/managecontact", list_id)))
                    .json(&body),
            )
            .send()
            .await
            .map_err(|err| Error::dependency("mailjet", format!("unsubscribe failed: {}", err)))?;

        Self::check_status(response, "unsubscribe").await?;
        debug!(email = %email, list_id = %list_id, "contact unsubscribed");
        Ok(())
    }

    #[instrument(skip(self), fields(to = %to_email, template_id = template_id))]
    async fn send_template(
        &self,
        to_email: &str,
        to_name: Option<&str>,
        template_id: i64,
    ) -> Result<()> {
        let body = json!({
            "Messages": [{
                "From": {
                    "Email": self.from_email,
                    "Name": self.from_name,
                },
                "To": [{
                    "Email": to_email,
                    "Name": to_name,
                }],
                "TemplateID": template_id,
                "TemplateLanguage": true,
            }]
        });

        let response = self
            .request(self.http.post(self.url("/v3.1/send")).json(&body))
            .send()
            .await
            .map_err(|err| Error::dependency("mailjet", format!("send failed: {}", err)))?;

        Self::check_status(response, "send").await?;
        debug!(to = %to_email, template_id = template_id, "template message sent");
        Ok(())
    }
}
