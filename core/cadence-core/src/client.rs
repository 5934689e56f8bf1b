//! Unix-socket client for the counter daemon.
//!
//! The daemon is the only writer of persisted state. Clients send one
//! newline-terminated JSON request per connection and read one response.
//! Transport failures surface as [`CoreError::DaemonUnavailable`] so callers
//! can tell "daemon not running" apart from a daemon-side refusal.

use std::env;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

use cadence_daemon_protocol::{
    ErrorInfo, Goals, GoalsPatch, Method, Metric, Request, Response, Scope, Snapshot,
    MAX_REQUEST_BYTES,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::{CoreError, Result};

/// Environment override for the daemon socket location.
pub const SOCKET_ENV: &str = "CADENCE_DAEMON_SOCKET";

const CADENCE_DIR_NAME: &str = ".cadence";
const SOCKET_NAME: &str = "daemon.sock";
const READ_TIMEOUT_MS: u64 = 600;
const WRITE_TIMEOUT_MS: u64 = 600;

/// Resolves the daemon socket path, honoring the `CADENCE_DAEMON_SOCKET`
/// override.
pub fn default_socket_path() -> Result<PathBuf> {
    if let Ok(path) = env::var(SOCKET_ENV) {
        return Ok(PathBuf::from(path));
    }
    let home = dirs::home_dir().ok_or(CoreError::HomeDirNotFound)?;
    Ok(home.join(CADENCE_DIR_NAME).join(SOCKET_NAME))
}

#[derive(Debug, Clone)]
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            socket_path: default_socket_path()?,
        })
    }

    pub fn with_socket_path(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Current counters and goals, with period turnover already applied
    /// daemon-side.
    pub fn fetch(&self) -> Result<Snapshot> {
        self.snapshot_call(Method::Get, None)
    }

    /// Applies a signed delta to one metric in one scope and returns the
    /// snapshot after the write.
    pub fn bump(&self, metric: &str, amount: i64, scope: Scope) -> Result<Snapshot> {
        let params = json!({ "metric": metric, "amount": amount, "scope": scope });
        self.snapshot_call(Method::Bump, Some(params))
    }

    /// Media is tracked per day and per week, so manual corrections move
    /// both counters in lockstep.
    pub fn adjust_media(&self, delta: i64) -> Result<Snapshot> {
        self.bump(Metric::Media.as_str(), delta, Scope::Daily)?;
        self.bump(Metric::Media.as_str(), delta, Scope::Weekly)
    }

    /// Submits a goal patch and returns the merged table the daemon now
    /// holds.
    pub fn set_goals(&self, patch: &GoalsPatch) -> Result<Goals> {
        let params = json!({ "goals": patch });
        let data = self.call(Method::SetGoals, Some(params))?;
        let goals = data.get("goals").cloned().ok_or_else(|| {
            CoreError::MalformedResponse("set_goals response missing goals".to_string())
        })?;
        serde_json::from_value(goals).map_err(|err| CoreError::Json {
            context: "parsing merged goals".to_string(),
            source: err,
        })
    }

    /// Replaces every metric's goal spec with the built-in defaults.
    pub fn restore_default_goals(&self) -> Result<Goals> {
        self.set_goals(&Goals::default().as_patch())
    }

    /// Zeroes all counters while leaving goals untouched.
    pub fn reset(&self) -> Result<Snapshot> {
        self.snapshot_call(Method::Reset, None)
    }

    /// The persisted state/goals pair exactly as stored, for backups.
    pub fn export_snapshot(&self) -> Result<Snapshot> {
        self.snapshot_call(Method::ExportSnapshot, None)
    }

    /// Replaces the daemon's state and goals wholesale with a previously
    /// exported snapshot.
    pub fn import_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let data = serde_json::to_value(snapshot).map_err(|err| CoreError::Json {
            context: "serializing snapshot for import".to_string(),
            source: err,
        })?;
        self.call(Method::ImportSnapshot, Some(json!({ "data": data })))?;
        Ok(())
    }

    /// Raw health payload (status, pid, daemon version).
    pub fn health(&self) -> Result<Value> {
        self.call(Method::GetHealth, None)
    }

    fn snapshot_call(&self, method: Method, params: Option<Value>) -> Result<Snapshot> {
        let data = self.call(method, params)?;
        serde_json::from_value(data).map_err(|err| CoreError::Json {
            context: format!("parsing {} response", method.as_str()),
            source: err,
        })
    }

    fn call(&self, method: Method, params: Option<Value>) -> Result<Value> {
        let request = Request::new(method, make_request_id(method), params);
        let response = self.send_request(&request)?;
        if response.ok {
            return response.data.ok_or_else(|| {
                CoreError::MalformedResponse(format!(
                    "{} response carried no data",
                    method.as_str()
                ))
            });
        }
        let error = response
            .error
            .unwrap_or_else(|| ErrorInfo::new("unknown_error", "daemon reported no detail"));
        Err(CoreError::Daemon {
            code: error.code,
            message: error.message,
        })
    }

    fn send_request(&self, request: &Request) -> Result<Response> {
        let mut stream = UnixStream::connect(&self.socket_path).map_err(|err| {
            CoreError::DaemonUnavailable(format!(
                "connect {}: {}",
                self.socket_path.display(),
                err
            ))
        })?;
        let _ = stream.set_read_timeout(Some(Duration::from_millis(READ_TIMEOUT_MS)));
        let _ = stream.set_write_timeout(Some(Duration::from_millis(WRITE_TIMEOUT_MS)));

        serde_json::to_writer(&mut stream, request).map_err(|err| CoreError::Json {
            context: "writing request".to_string(),
            source: err,
        })?;
        stream.write_all(b"\n").map_err(|err| CoreError::Io {
            context: "flushing request".to_string(),
            source: err,
        })?;
        stream.flush().ok();

        read_response(&mut stream)
    }
}

fn read_response(stream: &mut UnixStream) -> Result<Response> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buffer.extend_from_slice(&chunk[..n]);
                if buffer.len() > MAX_REQUEST_BYTES {
                    return Err(CoreError::MalformedResponse(
                        "response exceeded maximum size".to_string(),
                    ));
                }
                if chunk[..n].contains(&b'\n') {
                    break;
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                return Err(CoreError::DaemonUnavailable(
                    "timed out waiting for daemon response".to_string(),
                ));
            }
            Err(err) => {
                return Err(CoreError::Io {
                    context: "reading response".to_string(),
                    source: err,
                });
            }
        }
    }

    let line = match buffer.iter().position(|b| *b == b'\n') {
        Some(index) => &buffer[..index],
        None => buffer.as_slice(),
    };
    if line.is_empty() {
        return Err(CoreError::MalformedResponse(
            "daemon response was empty".to_string(),
        ));
    }

    serde_json::from_slice(line).map_err(|err| CoreError::Json {
        context: "parsing response".to_string(),
        source: err,
    })
}

fn make_request_id(method: Method) -> String {
    format!("{}-{}", method.as_str(), Utc::now().timestamp_millis())
}
