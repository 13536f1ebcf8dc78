use serde::Serialize;

use crate::config::MailProvider;

use super::NotifyError;

/// HTTP mail API that takes `{from, to, subject, html}` with a bearer key.
#[derive(Clone)]
pub struct ProviderNotifier {
    http: reqwest::Client,
    mail: MailProvider,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

impl ProviderNotifier {
    pub fn new(mail: MailProvider) -> Self {
        Self {
            http: reqwest::Client::new(),
            mail,
        }
    }

    pub(super) async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError> {
        let response = self
            .http
            .post(&self.mail.api_url)
            .bearer_auth(&self.mail.api_key)
            .json(&SendRequest {
                from: &self.mail.from,
                to: [to],
                subject,
                html,
            })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotifyError::Rejected { status, body })
    }
}
