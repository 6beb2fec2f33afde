//! Notifier selection and the `AlertSink` implementation.

use heatwatch_core::{NotifierKind, NotifyConfig};
use heatwatch_engine::{AlertEvent, AlertSink};

use crate::error::NotifyError;
use crate::gmail::GmailNotifier;
use crate::message::AlertMessage;

/// Writes alerts to the log and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn deliver(&self, message: &AlertMessage) {
        tracing::warn!(subject = %message.subject, "{}", message.body);
    }
}

/// Alert delivery channel chosen at startup.
pub enum Notifier {
    Log(LogNotifier),
    Gmail(GmailNotifier),
}

impl Notifier {
    /// Build the configured notifier.
    ///
    /// Gmail requires sender, recipient and token; a missing one is an error
    /// rather than a silent fallback to logging.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        match config.kind {
            NotifierKind::Log => Ok(Self::Log(LogNotifier)),
            NotifierKind::Gmail => {
                let from = required(config.from.as_deref(), "notify.from")?;
                let to = required(config.to.as_deref(), "notify.to")?;
                let token = required(config.token.as_deref(), "notify.token")?;
                Ok(Self::Gmail(GmailNotifier::new(token, from, to)))
            }
        }
    }

    pub fn kind(&self) -> NotifierKind {
        match self {
            Self::Log(_) => NotifierKind::Log,
            Self::Gmail(_) => NotifierKind::Gmail,
        }
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, NotifyError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| NotifyError::NotConfigured(field.to_string()))
}

impl AlertSink for Notifier {
    type Error = NotifyError;

    async fn send(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        let message = AlertMessage::from_event(event);
        match self {
            Self::Log(log) => {
                log.deliver(&message);
                Ok(())
            }
            Self::Gmail(gmail) => gmail.send_message(&message).await,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::Utc;

    fn event() -> AlertEvent {
        AlertEvent {
            location: "Hyderabad".to_string(),
            temperature: 38.0,
            threshold: 35.0,
            consecutive: 2,
            sampled_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_config_is_log() {
        let notifier = Notifier::from_config(&NotifyConfig::default()).unwrap();
        assert_eq!(notifier.kind(), NotifierKind::Log);
    }

    #[test]
    fn test_gmail_requires_recipient() {
        let config = NotifyConfig {
            kind: NotifierKind::Gmail,
            from: Some("alerts@example.com".into()),
            to: None,
            token: Some("token".into()),
        };
        match Notifier::from_config(&config) {
            Err(NotifyError::NotConfigured(field)) => assert_eq!(field, "notify.to"),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("expected missing recipient"),
        }
    }

    #[test]
    fn test_gmail_from_config() {
        let config = NotifyConfig {
            kind: NotifierKind::Gmail,
            from: Some("alerts@example.com".into()),
            to: Some("ops@example.com".into()),
            token: Some("token".into()),
        };
        let notifier = Notifier::from_config(&config).unwrap();
        assert_eq!(notifier.kind(), NotifierKind::Gmail);
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let notifier = Notifier::Log(LogNotifier);
        assert!(notifier.send(&event()).await.is_ok());
    }
}
