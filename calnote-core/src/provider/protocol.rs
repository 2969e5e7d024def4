//! Defines the JSON protocol used between calnote and provider executables
//! over stdin/stdout.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::event::RawEvent;

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    FetchEvents,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
}

/// Request sent from calnote to a provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent from a provider to calnote.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success { data: T },
    Error { error: String },
}

/// List events inside a window, or changed since a sync token.
#[derive(Debug, Serialize, Deserialize)]
pub struct FetchEvents {
    /// Provider-specific config (e.g. calendar_id, database_id)
    #[serde(flatten)]
    pub provider_config: serde_json::Map<String, serde_json::Value>,
    pub from: String,
    pub to: String,
    pub page_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchEventsResponse {
    pub events: Vec<RawEvent>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl ProviderCommand for FetchEvents {
    type Response = FetchEventsResponse;
    fn command() -> Command {
        Command::FetchEvents
    }
}

/// Create a new event; the response carries the assigned identifier.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEvent {
    #[serde(flatten)]
    pub provider_config: serde_json::Map<String, serde_json::Value>,
    pub event: RawEvent,
}

impl ProviderCommand for CreateEvent {
    type Response = RawEvent;
    fn command() -> Command {
        Command::CreateEvent
    }
}

/// Replace an existing event.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEvent {
    #[serde(flatten)]
    pub provider_config: serde_json::Map<String, serde_json::Value>,
    pub event: RawEvent,
}

impl ProviderCommand for UpdateEvent {
    type Response = ();
    fn command() -> Command {
        Command::UpdateEvent
    }
}

/// Delete (calendar) or archive (document) an event.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEvent {
    #[serde(flatten)]
    pub provider_config: serde_json::Map<String, serde_json::Value>,
    pub event: RawEvent,
}

impl ProviderCommand for DeleteEvent {
    type Response = ();
    fn command() -> Command {
        Command::DeleteEvent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let mut provider_config = serde_json::Map::new();
        provider_config.insert("calendar_id".into(), "primary".into());

        let params = serde_json::to_value(FetchEvents {
            provider_config,
            from: "2024-01-01T00:00:00+00:00".into(),
            to: "2024-01-08T00:00:00+00:00".into(),
            page_size: 100,
            cursor: None,
        })
        .unwrap();
        let request = Request {
            command: FetchEvents::command(),
            params,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["command"], "fetch_events");
        assert_eq!(json["params"]["calendar_id"], "primary");
        assert_eq!(json["params"]["page_size"], 100);
        assert!(json["params"].get("cursor").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let ok: Response<FetchEventsResponse> = serde_json::from_str(
            r#"{"status":"success","data":{"events":[{"id":"g1","title":"[x] A","start":"2024-01-01"}],"next_cursor":"tok"}}"#,
        )
        .unwrap();
        match ok {
            Response::Success { data } => {
                assert_eq!(data.events[0].id, "g1");
                assert_eq!(data.next_cursor.as_deref(), Some("tok"));
            }
            Response::Error { .. } => panic!("expected success"),
        }

        let err: Response<()> =
            serde_json::from_str(r#"{"status":"error","error":"invalid_grant"}"#).unwrap();
        assert!(matches!(err, Response::Error { error } if error == "invalid_grant"));
    }

    #[test]
    fn test_unit_response_accepts_null_data() {
        let ok: Response<()> = serde_json::from_str(r#"{"status":"success","data":null}"#).unwrap();
        assert!(matches!(ok, Response::Success { .. }));
    }
}
