use std::time::Duration;

use anyhow::Context;

use reqwest::Client;

use serde::Serialize;

use secrecy::Secret;

use url::Url;

use crate::domain::EmailAddress;
use crate::mailer::EmailSender;

const POSTMARK_TOKEN_HEADER: &str = "X-Postmark-Server-Token";

/// REST mail API client
#[derive(Debug)]
pub struct EmailClient {
    client: Client,
    sender: EmailAddress,

    api_send_email_url: Url,
    api_auth_token: Secret<String>,
}

impl EmailClient {
    pub fn new(
        sender: EmailAddress,
        api_timeout: Duration,
        api_base_url: Url,
        api_auth_token: Secret<String>,
    ) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(api_timeout).build()?;

        let api_send_email_url = api_base_url.join("email")?;

        Ok(Self {
            client,
            sender,
            api_send_email_url,
            api_auth_token,
        })
    }

    #[tracing::instrument(
        name = "Send an email via API",
        skip(self, email),
        fields(recipient = %email.recipient, subject = %email.subject)
    )]
    pub async fn send(&self, email: &Email) -> reqwest::Result<()> {
        use secrecy::ExposeSecret;

        let body = email.as_request(&self.sender);

        self.client
            .post(self.api_send_email_url.clone())
            .header(POSTMARK_TOKEN_HEADER, self.api_auth_token.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl EmailSender for EmailClient {
    async fn send_email(&self, email: &Email) -> anyhow::Result<()> {
        self.send(email)
            .await
            .map_err(reqwest::Error::without_url)
            .context("Mail API rejected the email")
    }
}

/// Rendered email addressed to one recipient
#[derive(Debug, Clone)]
pub struct Email {
    pub recipient: EmailAddress,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
}

impl Email {
    fn as_request<'e>(&'e self, sender: &'e EmailAddress) -> SendEmailRequest<'e> {
        SendEmailRequest {
            to: self.recipient.as_ref(),
            from: sender.as_ref(),
            subject: &self.subject,
            html_body: &self.html_body,
            text_body: &self.text_body,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    to: &'a str,
    from: &'a str,
    subject: &'a str,
    html_body: &'a str,
    text_body: &'a str,
}
