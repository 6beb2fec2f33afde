//! Alert mail through the Gmail API.

use base64::Engine;
use tracing::instrument;

use crate::error::NotifyError;
use crate::message::AlertMessage;

const GMAIL_API_BASE: &str = "https://gmail.googleapis.com";

pub struct GmailNotifier {
    client: reqwest::Client,
    access_token: String,
    from: String,
    to: String,
    base_url: String,
}

impl GmailNotifier {
    pub fn new(access_token: &str, from: &str, to: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            base_url: GMAIL_API_BASE.to_string(),
        }
    }

    #[cfg(test)]
    pub fn new_with_base_url(access_token: &str, from: &str, to: &str, base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::new(access_token, from, to)
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Build the RFC 2822 message, base64url encoded as the API expects.
    fn encode(&self, message: &AlertMessage) -> String {
        let raw = format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
            self.from, self.to, message.subject, message.body
        );
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    #[instrument(skip(self, message), fields(subject = %message.subject), level = "info")]
    pub async fn send_message(&self, message: &AlertMessage) -> Result<(), NotifyError> {
        let url = format!("{}/gmail/v1/users/me/messages/send", self.base_url);

        let body = serde_json::json!({
            "raw": self.encode(message),
        });

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("Email alert sent to {}", self.to);
            Ok(())
        } else if status.as_u16() == 401 {
            Err(NotifyError::TokenExpired)
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(NotifyError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(NotifyError::SendFailed(format!("{}: {}", status, text)))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> AlertMessage {
        AlertMessage {
            subject: "Weather Alert: Delhi Temperature Alert".to_string(),
            body: "The temperature in Delhi has exceeded 35°C.".to_string(),
        }
    }

    fn notifier(server: &MockServer, token: &str) -> GmailNotifier {
        GmailNotifier::new_with_base_url(token, "alerts@example.com", "ops@example.com", &server.uri())
    }

    #[test]
    fn test_encoded_message_has_headers() {
        let gmail = GmailNotifier::new("t", "alerts@example.com", "ops@example.com");
        let encoded = gmail.encode(&message());
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(encoded)
            .unwrap();
        let text = String::from_utf8(decoded).unwrap();

        assert!(text.starts_with("From: alerts@example.com\r\nTo: ops@example.com\r\n"));
        assert!(text.contains("Subject: Weather Alert: Delhi Temperature Alert\r\n"));
        assert!(text.ends_with("\r\n\r\nThe temperature in Delhi has exceeded 35°C."));
    }

    #[tokio::test]
    async fn test_send_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .and(header("Authorization", "Bearer test_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg1",
                "threadId": "thread1",
                "labelIds": ["SENT"]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = notifier(&server, "test_token").send_message(&message()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_token_expired() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = notifier(&server, "expired").send_message(&message()).await;
        assert!(matches!(result, Err(NotifyError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .respond_with(ResponseTemplate::new(429).append_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let result = notifier(&server, "token").send_message(&message()).await;
        assert!(matches!(result, Err(NotifyError::RateLimited(30))));
    }

    #[tokio::test]
    async fn test_bad_request() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid To header"))
            .mount(&server)
            .await;

        let result = notifier(&server, "token").send_message(&message()).await;
        match result {
            Err(NotifyError::SendFailed(msg)) => assert!(msg.contains("Invalid To header")),
            other => panic!("expected SendFailed, got {:?}", other),
        }
    }
}
