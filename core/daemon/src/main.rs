//! Cadence daemon entrypoint.
//!
//! A small, single-writer service that owns the posting-activity counters.
//! It listens on a Unix socket for newline-delimited JSON requests, applies
//! period turnover before touching state, and persists one JSON record with
//! atomic writes. A background sweep re-runs turnover hourly so counters
//! roll over even when no client calls in.

use fs_err as fs;
use std::env;
use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cadence_daemon_protocol::{
    parse_bump, parse_import, parse_set_goals, ErrorInfo, Method, Request, Response, Snapshot,
    MAX_REQUEST_BYTES, PROTOCOL_VERSION,
};
use serde_json::Value;

mod period;
mod store;

use period::PeriodKeys;
use store::Store;

const SOCKET_NAME: &str = "daemon.sock";
const STATE_FILE_NAME: &str = "state.json";
const READ_TIMEOUT_SECS: u64 = 2;
const READ_CHUNK_SIZE: usize = 4096;
const TURNOVER_SWEEP_INTERVAL_SECS: u64 = 60 * 60;

fn main() {
    init_logging();

    let socket_path = match daemon_socket_path() {
        Ok(path) => path,
        Err(err) => {
            error!(error = %err, "Failed to resolve daemon socket path");
            std::process::exit(1);
        }
    };

    if let Err(err) = prepare_socket(&socket_path) {
        error!(error = %err, path = %socket_path.display(), "Failed to prepare daemon socket");
        std::process::exit(1);
    }

    let listener = match UnixListener::bind(&socket_path) {
        Ok(listener) => listener,
        Err(err) => {
            error!(error = %err, path = %socket_path.display(), "Failed to bind daemon socket");
            std::process::exit(1);
        }
    };

    let state_path = match daemon_state_path() {
        Ok(path) => path,
        Err(err) => {
            error!(error = %err, "Failed to resolve daemon state path");
            std::process::exit(1);
        }
    };

    let store = Arc::new(Store::new(state_path));
    info!(path = %socket_path.display(), state = %store.path().display(), "Cadence daemon started");

    // Roll over anything that went stale while the daemon was down.
    match store.run_turnover(&PeriodKeys::current()) {
        Ok(true) => info!("Startup turnover reset stale counters"),
        Ok(false) => {}
        Err(err) => warn!(error = %err, "Startup turnover failed"),
    }

    spawn_turnover_sweep(Arc::clone(&store));

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let store = Arc::clone(&store);
                thread::spawn(|| handle_connection(stream, store));
            }
            Err(err) => {
                warn!(error = %err, "Failed to accept daemon connection");
            }
        }
    }
}

fn spawn_turnover_sweep(store: Arc<Store>) {
    thread::spawn(move || loop {
        thread::sleep(Duration::from_secs(TURNOVER_SWEEP_INTERVAL_SECS));
        match store.run_turnover(&PeriodKeys::current()) {
            Ok(true) => info!("Periodic turnover reset stale counters"),
            Ok(false) => {}
            Err(err) => warn!(error = %err, "Periodic turnover failed"),
        }
    });
}

fn init_logging() {
    let debug_enabled = env::var("CADENCE_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn daemon_socket_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or_else(|| "Home directory not found".to_string())?;
    Ok(home.join(".cadence").join(SOCKET_NAME))
}

fn daemon_state_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or_else(|| "Home directory not found".to_string())?;
    Ok(home.join(".cadence").join(STATE_FILE_NAME))
}

/// Creates the socket directory and clears any socket a previous daemon
/// instance left behind.
fn prepare_socket(socket_path: &Path) -> Result<(), String> {
    let parent = socket_path
        .parent()
        .ok_or_else(|| "Socket path has no parent".to_string())?;
    fs::create_dir_all(parent)
        .map_err(|err| format!("Failed to create socket directory: {}", err))?;
    if socket_path.exists() {
        fs::remove_file(socket_path)
            .map_err(|err| format!("Failed to remove stale socket: {}", err))?;
    }
    Ok(())
}

fn handle_connection(mut stream: UnixStream, store: Arc<Store>) {
    let request = match read_request(&mut stream) {
        Ok(request) => request,
        Err(err) => {
            warn!(code = %err.code, message = %err.message, "Failed to read request");
            let response = Response::error_with_info(None, err);
            let _ = write_response(&mut stream, response);
            return;
        }
    };

    tracing::debug!(method = ?request.method, id = ?request.id, "Daemon request received");
    let response = handle_request(request, store);
    let _ = write_response(&mut stream, response);
}

/// Reads until the first newline or EOF, bounded by the size cap and the
/// read timeout. Framing failures come back as protocol errors so the
/// client sees a structured refusal rather than a dropped connection.
fn read_request(stream: &mut UnixStream) -> Result<Request, ErrorInfo> {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(READ_TIMEOUT_SECS)));

    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    let body = loop {
        match stream.read(&mut chunk) {
            Ok(0) => break request_line(&buf),
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if buf.len() > MAX_REQUEST_BYTES {
                    return Err(ErrorInfo::new(
                        "request_too_large",
                        "request exceeded maximum size",
                    ));
                }
                if chunk[..n].contains(&b'\n') {
                    break request_line(&buf);
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                return Err(ErrorInfo::new("read_timeout", "request timed out"));
            }
            Err(err) => {
                return Err(ErrorInfo::new(
                    "read_error",
                    format!("failed to read request: {}", err),
                ));
            }
        }
    };

    if body.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(ErrorInfo::new("empty_request", "request body was empty"));
    }

    serde_json::from_slice(body).map_err(|err| {
        ErrorInfo::new(
            "invalid_json",
            format!("request was not valid JSON: {}", err),
        )
    })
}

/// First line of the buffer. One request per connection; anything after
/// the newline is ignored with a warning.
fn request_line(buffer: &[u8]) -> &[u8] {
    match buffer.iter().position(|b| *b == b'\n') {
        Some(index) => {
            let trailing = &buffer[index + 1..];
            if trailing.iter().any(|b| !b.is_ascii_whitespace()) {
                warn!("Extra bytes detected after newline; ignoring trailing data");
            }
            &buffer[..index]
        }
        None => buffer,
    }
}

fn handle_request(request: Request, store: Arc<Store>) -> Response {
    if request.protocol_version != PROTOCOL_VERSION {
        return Response::error(
            request.id,
            "protocol_mismatch",
            "unsupported protocol version",
        );
    }

    match request.method {
        Method::Get => match store.get(&PeriodKeys::current()) {
            Ok(snapshot) => snapshot_response(request.id, &snapshot),
            Err(err) => Response::error(request.id, "storage_error", err),
        },
        Method::Bump => {
            let params = match request.params {
                Some(params) => params,
                None => {
                    return Response::error(request.id, "invalid_params", "bump params are required")
                }
            };
            let bump = match parse_bump(params) {
                Ok(bump) => bump,
                Err(err) => return Response::error_with_info(request.id, err),
            };
            tracing::debug!(
                metric = %bump.metric,
                amount = bump.amount,
                scope = ?bump.scope,
                "Bump request"
            );
            match store.bump(&PeriodKeys::current(), &bump.metric, bump.amount, bump.scope) {
                Ok(snapshot) => snapshot_response(request.id, &snapshot),
                Err(err) => Response::error(request.id, "storage_error", err),
            }
        }
        Method::SetGoals => {
            let params = match request.params {
                Some(params) => params,
                None => {
                    return Response::error(
                        request.id,
                        "invalid_params",
                        "set_goals params are required",
                    )
                }
            };
            let patch = match parse_set_goals(params) {
                Ok(patch) => patch,
                Err(err) => return Response::error_with_info(request.id, err),
            };
            match store.set_goals(&PeriodKeys::current(), &patch) {
                Ok(goals) => match serde_json::to_value(&goals) {
                    Ok(value) => Response::ok(request.id, serde_json::json!({ "goals": value })),
                    Err(err) => Response::error(
                        request.id,
                        "serialization_error",
                        format!("Failed to serialize goals: {}", err),
                    ),
                },
                Err(err) => Response::error(request.id, "storage_error", err),
            }
        }
        Method::Reset => match store.reset(&PeriodKeys::current()) {
            Ok(snapshot) => snapshot_response(request.id, &snapshot),
            Err(err) => Response::error(request.id, "storage_error", err),
        },
        Method::ExportSnapshot => match store.export() {
            Ok(snapshot) => snapshot_response(request.id, &snapshot),
            Err(err) => Response::error(request.id, "storage_error", err),
        },
        Method::ImportSnapshot => {
            let params = match request.params {
                Some(params) => params,
                None => {
                    return Response::error(
                        request.id,
                        "invalid_params",
                        "import_snapshot params are required",
                    )
                }
            };
            let snapshot = match parse_import(params) {
                Ok(snapshot) => snapshot,
                Err(err) => return Response::error_with_info(request.id, err),
            };
            match store.import(snapshot) {
                Ok(()) => Response::ok(request.id, serde_json::json!({ "imported": true })),
                Err(err) => Response::error(request.id, "storage_error", err),
            }
        }
        Method::GetHealth => {
            let data = serde_json::json!({
                "status": "ok",
                "pid": std::process::id(),
                "version": env!("CARGO_PKG_VERSION"),
                "protocol_version": PROTOCOL_VERSION,
                "turnover_sweep_interval_secs": TURNOVER_SWEEP_INTERVAL_SECS,
            });
            Response::ok(request.id, data)
        }
        Method::Unknown => Response::error(request.id, "unknown_request", "unknown request kind"),
    }
}

fn snapshot_response(id: Option<String>, snapshot: &Snapshot) -> Response {
    match serde_json::to_value(snapshot) {
        Ok(value) => Response::ok(id, value),
        Err(err) => Response::error(
            id,
            "serialization_error",
            format!("Failed to serialize snapshot: {}", err),
        ),
    }
}

fn write_response(stream: &mut UnixStream, response: Response) -> std::io::Result<()> {
    serde_json::to_writer(&mut *stream, &response)?;
    stream.write_all(b"\n")?;
    stream.flush()?;
    Ok(())
}
