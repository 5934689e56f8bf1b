//! IPC protocol types and validation for cadence-daemon.
//!
//! This crate is shared by the daemon and its clients to prevent schema drift.
//! The daemon remains the authority on validation, but clients can reuse the
//! same types to construct valid requests. The counter and goal model lives in
//! [`model`] so both sides agree on field names and defaults.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod model;

pub use model::{
    clamped_add, DailyCounts, GoalSpec, Goals, GoalsPatch, Metric, Scope, Snapshot, TrackerState,
    WeeklyCounts,
};

pub const PROTOCOL_VERSION: u32 = 1;
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;
/// Largest delta a single bump may carry in either direction.
pub const MAX_BUMP_AMOUNT: i64 = 10_000;

/// Request kinds the daemon routes on. Unrecognized names deserialize to
/// [`Method::Unknown`] so the daemon can answer with a structured error
/// instead of dropping the request at the parse stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Bump,
    SetGoals,
    Reset,
    ExportSnapshot,
    ImportSnapshot,
    GetHealth,
    Unknown,
}

impl Method {
    pub fn from_name(name: &str) -> Self {
        match name {
            "get" => Method::Get,
            "bump" => Method::Bump,
            "set_goals" => Method::SetGoals,
            "reset" => Method::Reset,
            "export_snapshot" => Method::ExportSnapshot,
            "import_snapshot" => Method::ImportSnapshot,
            "get_health" => Method::GetHealth,
            _ => Method::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Bump => "bump",
            Method::SetGoals => "set_goals",
            Method::Reset => "reset",
            Method::ExportSnapshot => "export_snapshot",
            Method::ImportSnapshot => "import_snapshot",
            Method::GetHealth => "get_health",
            Method::Unknown => "unknown",
        }
    }
}

impl Serialize for Method {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Method {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Method::from_name(&raw))
    }
}

/// One request per connection, newline-terminated JSON. `params` is
/// method-specific and validated daemon-side by the `parse_*` helpers.
#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Request {
    pub protocol_version: u32,
    pub method: Method,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(method: Method, id: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION,
            method,
            id: Some(id.into()),
            params,
        }
    }
}

/// Reply envelope, echoing the request id. `data` is present exactly when
/// `ok` is true, `error` exactly when it is false.
#[derive(Debug, Serialize, Deserialize)]
pub struct Response {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl Response {
    pub fn ok(id: Option<String>, data: Value) -> Self {
        Self {
            id,
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(id: Option<String>, code: &str, message: impl Into<String>) -> Self {
        Self::error_with_info(id, ErrorInfo::new(code, message))
    }

    pub fn error_with_info(id: Option<String>, error: ErrorInfo) -> Self {
        Self {
            id,
            ok: false,
            data: None,
            error: Some(error),
        }
    }
}

/// Stable machine-readable code plus a free-form message. Clients branch
/// on the code; the message is for logs.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BumpParams {
    pub metric: String,
    pub amount: i64,
    pub scope: Scope,
}

impl BumpParams {
    pub fn validate(&self) -> Result<(), ErrorInfo> {
        if self.metric.trim().is_empty() {
            return Err(ErrorInfo::new("missing_field", "metric is required"));
        }
        if self.metric.len() > 64 {
            return Err(ErrorInfo::new(
                "invalid_metric",
                "metric must be 64 characters or fewer",
            ));
        }
        if self.amount.abs() > MAX_BUMP_AMOUNT {
            return Err(ErrorInfo::new(
                "invalid_amount",
                format!("amount must be within +/-{}", MAX_BUMP_AMOUNT),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetGoalsParams {
    pub goals: GoalsPatch,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportParams {
    pub data: Value,
}

pub fn parse_bump(params: Value) -> Result<BumpParams, ErrorInfo> {
    let parsed: BumpParams = serde_json::from_value(params)
        .map_err(|err| ErrorInfo::new("invalid_params", format!("bump params: {}", err)))?;
    parsed.validate()?;
    Ok(parsed)
}

pub fn parse_set_goals(params: Value) -> Result<GoalsPatch, ErrorInfo> {
    let parsed: SetGoalsParams = serde_json::from_value(params)
        .map_err(|err| ErrorInfo::new("invalid_params", format!("set_goals params: {}", err)))?;
    if parsed.goals.len() > 32 {
        return Err(ErrorInfo::new("invalid_params", "too many goal entries"));
    }
    Ok(parsed.goals)
}

/// Shape-checks an import payload: both `state` and `goals` must be present
/// before any field-level parsing, so a truncated backup is rejected up front.
pub fn parse_import(params: Value) -> Result<Snapshot, ErrorInfo> {
    let parsed: ImportParams = serde_json::from_value(params)
        .map_err(|err| ErrorInfo::new("invalid_params", format!("import params: {}", err)))?;
    let has_state = parsed.data.get("state").is_some();
    let has_goals = parsed.data.get("goals").is_some();
    if !has_state || !has_goals {
        return Err(ErrorInfo::new(
            "invalid_snapshot",
            "snapshot must include state and goals",
        ));
    }
    serde_json::from_value(parsed.data)
        .map_err(|err| ErrorInfo::new("invalid_snapshot", format!("snapshot is malformed: {}", err)))
}
