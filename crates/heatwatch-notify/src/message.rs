//! Human-readable alert text shared by all notifiers.

use heatwatch_engine::AlertEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    pub fn from_event(event: &AlertEvent) -> Self {
        Self {
            subject: format!("Weather Alert: {} Temperature Alert", event.location),
            body: format!(
                "The temperature in {} has exceeded {}°C for {} consecutive updates. \
                 Current temperature: {:.2}°C",
                event.location, event.threshold, event.consecutive, event.temperature
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_message_mentions_location_threshold_and_temperature() {
        let event = AlertEvent {
            location: "Chennai".to_string(),
            temperature: 36.4,
            threshold: 35.0,
            consecutive: 2,
            sampled_at: Utc::now(),
        };

        let message = AlertMessage::from_event(&event);
        assert_eq!(message.subject, "Weather Alert: Chennai Temperature Alert");
        assert_eq!(
            message.body,
            "The temperature in Chennai has exceeded 35°C for 2 consecutive updates. \
             Current temperature: 36.40°C"
        );
    }
}
