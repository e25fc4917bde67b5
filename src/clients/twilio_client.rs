use async_trait::async_trait;
use serde::Deserialize;

use crate::config::TwilioSettings;
use crate::error::DeliveryError;
use crate::service::status_notifier::MessageSender;

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<u64>,
    message: String,
}

/// Sends WhatsApp messages through the Twilio Messages API.
pub struct TwilioSender {
    http: reqwest::Client,
    settings: TwilioSettings,
}

impl TwilioSender {
    pub fn new(http: reqwest::Client, settings: TwilioSettings) -> Self {
        Self { http, settings }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.account_sid
        )
    }
}

#[async_trait]
impl MessageSender for TwilioSender {
    async fn send_message(&self, recipient: &str, body: &str) -> Result<String, DeliveryError> {
        let from = format!("whatsapp:{}", self.settings.whatsapp_from);
        let to = format!("whatsapp:{}", recipient);
        let params = [("Body", body), ("From", from.as_str()), ("To", to.as_str())];

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.settings.account_sid, Some(&self.settings.auth_token))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiError>(&text) {
                Ok(ApiError {
                    code: Some(code),
                    message,
                }) => format!("{} (code {})", message, code),
                Ok(ApiError { message, .. }) => message,
                Err(_) => text,
            };
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessageResource = serde_json::from_str(&text)
            .map_err(|e| DeliveryError::Protocol(format!("{}\nRaw body: {}", e, text)))?;
        Ok(parsed.sid)
    }
}
