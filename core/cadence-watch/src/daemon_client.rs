//! Best-effort bump submission to the counter daemon.
//!
//! The daemon is the only writer. The sink wraps the shared client with a
//! single retry so a daemon restart between events loses at most nothing,
//! and an enablement switch so the watcher can run dark.

use std::env;
use std::time::Duration;

use cadence_core::DaemonClient;
use cadence_daemon_protocol::{Metric, Scope};

use crate::tracker::CounterSink;

/// Environment switch for sending to the daemon at all. Defaults to on.
pub const ENABLE_ENV: &str = "CADENCE_DAEMON_ENABLED";

const RETRY_DELAY_MS: u64 = 50;

pub fn daemon_enabled() -> bool {
    match env::var(ENABLE_ENV) {
        Ok(value) => matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"),
        Err(_) => true,
    }
}

pub struct DaemonSink {
    client: DaemonClient,
}

impl DaemonSink {
    pub fn from_env() -> Result<Self, String> {
        let client = DaemonClient::from_env().map_err(String::from)?;
        Ok(Self { client })
    }

    pub fn with_client(client: DaemonClient) -> Self {
        Self { client }
    }
}

impl CounterSink for DaemonSink {
    fn bump(&mut self, metric: Metric, amount: i64, scope: Scope) -> Result<(), String> {
        if !daemon_enabled() {
            return Err("Daemon disabled".to_string());
        }

        let send = |client: &DaemonClient| {
            client
                .bump(metric.as_str(), amount, scope)
                .map(|_| ())
                .map_err(String::from)
        };

        match send(&self.client) {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    metric = metric.as_str(),
                    "Failed to send bump to daemon, retrying"
                );
                std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS));
                send(&self.client).map_err(|retry_err| {
                    tracing::warn!(
                        error = %retry_err,
                        metric = metric.as_str(),
                        "Retry failed sending bump to daemon"
                    );
                    retry_err
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_daemon_protocol::{Request, Response, Snapshot};
    use std::io::{Read, Write};
    use std::os::unix::net::{UnixListener, UnixStream};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Restores the previous value of an env var when dropped. Tests touching
    /// the environment hold [`env_lock`] for their whole body.
    struct ScopedEnv {
        key: &'static str,
        saved: Option<String>,
    }

    impl ScopedEnv {
        fn set(key: &'static str, value: &str) -> Self {
            let saved = std::env::var(key).ok();
            std::env::set_var(key, value);
            ScopedEnv { key, saved }
        }

        fn unset(key: &'static str) -> Self {
            let saved = std::env::var(key).ok();
            std::env::remove_var(key);
            ScopedEnv { key, saved }
        }
    }

    impl Drop for ScopedEnv {
        fn drop(&mut self) {
            match self.saved.take() {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap()
    }

    fn temp_socket(tag: &str) -> std::path::PathBuf {
        let dir = std::path::Path::new("/tmp").join(format!(
            "cadence-watch-{}-{}",
            tag,
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or(Duration::from_millis(0))
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("daemon.sock")
    }

    fn read_request(stream: &mut UnixStream) -> Option<Request> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buffer.contains(&b'\n') {
            match stream.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                Err(_) => return None,
            }
        }
        let line = buffer.splitn(2, |b| *b == b'\n').next()?;
        serde_json::from_slice(line).ok()
    }

    fn respond(stream: &mut UnixStream, response: &Response) {
        let mut payload = serde_json::to_vec(response).unwrap();
        payload.push(b'\n');
        let _ = stream.write_all(&payload);
    }

    fn snapshot_data() -> serde_json::Value {
        serde_json::to_value(Snapshot::with_defaults()).unwrap()
    }

    #[test]
    fn bump_retries_after_daemon_error() {
        let _guard = env_lock();
        let _enabled = ScopedEnv::set(ENABLE_ENV, "1");

        let socket_path = temp_socket("retry");
        let listener = UnixListener::bind(&socket_path).unwrap();
        listener.set_nonblocking(true).unwrap();

        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);

        let server = std::thread::spawn(move || {
            let start = Instant::now();
            let mut handled = 0;
            while handled < 2 && start.elapsed() < Duration::from_secs(5) {
                match listener.accept() {
                    Ok((mut stream, _)) => {
                        handled += 1;
                        attempts_clone.fetch_add(1, Ordering::SeqCst);
                        let _ = read_request(&mut stream);
                        let response = if handled == 1 {
                            Response::error(None, "storage_error", "simulated")
                        } else {
                            Response::ok(None, snapshot_data())
                        };
                        respond(&mut stream, &response);
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        let mut sink = DaemonSink::with_client(DaemonClient::with_socket_path(&socket_path));
        let result = sink.bump(Metric::Tweets, 1, Scope::Daily);

        assert!(result.is_ok());
        server.join().unwrap();
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn bump_sends_wire_params() {
        let _guard = env_lock();
        let _enabled = ScopedEnv::set(ENABLE_ENV, "1");

        let socket_path = temp_socket("params");
        let listener = UnixListener::bind(&socket_path).unwrap();

        let captured = Arc::new(Mutex::new(None::<Request>));
        let captured_clone = Arc::clone(&captured);
        let server = std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let request = read_request(&mut stream);
                *captured_clone.lock().unwrap() = request;
                respond(&mut stream, &Response::ok(None, snapshot_data()));
            }
        });

        let mut sink = DaemonSink::with_client(DaemonClient::with_socket_path(&socket_path));
        sink.bump(Metric::Media, 1, Scope::Weekly).unwrap();
        server.join().unwrap();

        let request = captured.lock().unwrap().take().expect("captured request");
        let params = request.params.expect("params");
        assert_eq!(params["metric"], "media");
        assert_eq!(params["amount"], 1);
        assert_eq!(params["scope"], "weekly");
    }

    #[test]
    fn disabled_sink_fails_without_connecting() {
        let _guard = env_lock();
        let _disabled = ScopedEnv::set(ENABLE_ENV, "0");

        let mut sink =
            DaemonSink::with_client(DaemonClient::with_socket_path("/tmp/cadence-no-daemon.sock"));
        let err = sink.bump(Metric::Tweets, 1, Scope::Daily).unwrap_err();
        assert_eq!(err, "Daemon disabled");
    }

    #[test]
    fn enablement_defaults_on_without_env() {
        let _guard = env_lock();
        let _unset = ScopedEnv::unset(ENABLE_ENV);
        assert!(daemon_enabled());
    }

    #[test]
    fn enablement_respects_env_zero() {
        let _guard = env_lock();
        let _zero = ScopedEnv::set(ENABLE_ENV, "0");
        assert!(!daemon_enabled());
    }
}
