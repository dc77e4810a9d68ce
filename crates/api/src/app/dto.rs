use serde::{Deserialize, Serialize};
use serde_json::json;

use fraudwatch_core::{
    AlertOutcome, Amount, DomainError, EventKind, StoredEvent, Timestamp, TransactionEvent, UserId,
};

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /event`. Unknown fields are rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EventRequest {
    pub amount: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub user_id: i64,
    pub t: i64,
}

impl EventRequest {
    /// Field checks follow body field order: `amount`, `type`, `user_id`, then `t`.
    /// The first failure wins.
    pub fn into_event(self) -> Result<TransactionEvent, String> {
        let amount = Amount::parse(&self.amount).map_err(|e| e.to_string())?;
        let kind: EventKind = self.kind.parse().map_err(validation_message)?;
        let user_id = UserId::new(self.user_id).map_err(validation_message)?;
        let occurred_at = Timestamp::new(self.t).map_err(validation_message)?;
        Ok(TransactionEvent::new(user_id, occurred_at, amount, kind))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EventListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub alert: bool,
    /// Ascending.
    pub alert_codes: Vec<i32>,
    pub user_id: i64,
}

impl EventResponse {
    pub fn new(user_id: UserId, outcome: &AlertOutcome) -> Self {
        Self {
            alert: outcome.alerted(),
            alert_codes: outcome.code_values(),
            user_id: user_id.get(),
        }
    }
}

pub fn event_to_json(event: &StoredEvent) -> serde_json::Value {
    json!({
        "event_id": event.event_id.to_string(),
        "user_id": event.user_id().get(),
        "t": event.occurred_at().seconds(),
        "amount": event.event.amount.to_string(),
        "type": event.event.kind.as_str(),
        "alert": event.outcome.alerted(),
        "alert_codes": event.outcome.code_values(),
        "recorded_at": event.recorded_at.to_rfc3339(),
    })
}

fn validation_message(err: DomainError) -> String {
    match err {
        DomainError::Validation(msg) => msg,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(amount: &str, kind: &str, user_id: i64, t: i64) -> EventRequest {
        EventRequest {
            amount: amount.to_owned(),
            kind: kind.to_owned(),
            user_id,
            t,
        }
    }

    #[test]
    fn valid_request_becomes_event() {
        let event = request("42.00", "deposit", 1, 10).into_event().unwrap();
        assert_eq!(event.kind, EventKind::Deposit);
        assert_eq!(event.amount.to_string(), "42.00");
        assert_eq!(event.user_id.get(), 1);
        assert_eq!(event.occurred_at.seconds(), 10);
    }

    #[test]
    fn amount_is_checked_before_everything_else() {
        let err = request("bad", "bogus", 0, 0).into_event().unwrap_err();
        assert_eq!(err, "amount should be to two decimal places");
        let err = request("-1.00", "bogus", 0, 0).into_event().unwrap_err();
        assert_eq!(err, "amount cannot be negative");
    }

    #[test]
    fn type_is_checked_before_identifiers() {
        let err = request("1.00", "bogus", 0, 0).into_event().unwrap_err();
        assert_eq!(err, "type must be one of: deposit, withdraw");
    }

    #[test]
    fn user_id_is_checked_before_t() {
        let err = request("1.00", "deposit", 0, 0).into_event().unwrap_err();
        assert_eq!(err, "user_id must be greater than 0");
        let err = request("1.00", "deposit", 1, -5).into_event().unwrap_err();
        assert_eq!(err, "t must be greater than 0");
    }

    #[test]
    fn amount_messages() {
        let err = request("10.5", "deposit", 1, 1).into_event().unwrap_err();
        assert_eq!(err, "amount should be to two decimal places");
        let err = request("-10.50", "deposit", 1, 1).into_event().unwrap_err();
        assert_eq!(err, "amount cannot be negative");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let body = r#"{"amount":"1.00","type":"deposit","user_id":1,"t":1,"extra":true}"#;
        assert!(serde_json::from_str::<EventRequest>(body).is_err());
    }

    #[test]
    fn response_shape() {
        let outcome = AlertOutcome::clear();
        let body = serde_json::to_value(EventResponse::new(UserId::new(3).unwrap(), &outcome))
            .unwrap();
        assert_eq!(body, json!({"alert": false, "alert_codes": [], "user_id": 3}));
    }
}
