//! IPC protocol between `rptd` and `rptctl`
//!
//! Newline-delimited JSON over a Unix socket: one `Request` line in, one
//! `Response` line out, same `id`.

use crate::gate::{GatePolicy, SubmitOutcome};
use crate::types::{LogRecord, PipelineOutcome};
use serde::{Deserialize, Serialize};

/// IPC Request from client to daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub id: u64,
    pub method: Method,
}

/// IPC Response from daemon to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub result: Result<ResponseData, String>,
}

/// Request methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "params")]
pub enum Method {
    /// Health check
    Ping,

    /// Daemon status
    Status,

    /// Copy the current selection, translate it and paste it back
    Trigger,

    /// Translate text through the daemon's pipeline without touching the
    /// clipboard
    Translate { text: String },

    /// Change the style. Clears the cache when the style changes.
    SetStyle { style: String },

    /// Turn trigger handling on or off
    SetEnabled { enabled: bool },

    ClearCache,

    /// Newest log records first
    RecentLogs { limit: usize },
}

/// Response data variants
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ResponseData {
    Pong,

    Status(StatusData),

    /// What the gate did with a trigger
    Triggered(SubmitOutcome),

    /// Trigger ignored because translation is disabled
    Disabled,

    Translation(PipelineOutcome),

    StyleChanged { style: String, cache_cleared: bool },

    EnabledChanged { enabled: bool },

    CacheCleared,

    Logs(Vec<LogRecord>),
}

/// Daemon status information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusData {
    pub version: String,
    pub uptime_seconds: u64,
    pub style: String,
    pub enabled: bool,
    /// A run is in flight
    pub busy: bool,
    pub gate_policy: GatePolicy,
    pub split_lines: bool,
    pub runs_completed: u64,
    pub triggers_dropped: u64,
    /// `None` when the cache is disabled or unreadable
    pub cache_entries: Option<usize>,
    pub model: String,
    pub api_key_configured: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunStatus;

    #[test]
    fn test_request_wire_format() {
        let request = Request {
            id: 7,
            method: Method::Translate {
                text: "/me lari".to_string(),
            },
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"id":7,"method":{"type":"Translate","params":{"text":"/me lari"}}}"#
        );

        let ping = serde_json::to_string(&Request { id: 1, method: Method::Ping }).unwrap();
        assert_eq!(ping, r#"{"id":1,"method":{"type":"Ping"}}"#);
    }

    #[test]
    fn test_response_round_trip() {
        let responses = [
            Response {
                id: 3,
                result: Ok(ResponseData::Translation(PipelineOutcome {
                    output: "/me runs".to_string(),
                    status: RunStatus::CacheHit,
                })),
            },
            Response {
                id: 4,
                result: Ok(ResponseData::Triggered(SubmitOutcome::Queued)),
            },
            Response {
                id: 5,
                result: Err("style must not be empty".to_string()),
            },
        ];

        for response in responses {
            let json = serde_json::to_string(&response).unwrap();
            let back: Response = serde_json::from_str(&json).unwrap();
            assert_eq!(back, response);
        }
    }
}
