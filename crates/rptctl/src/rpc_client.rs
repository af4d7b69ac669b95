//! RPC Client - Unix socket client for communicating with the daemon

use anyhow::{Context, Result};
use rpt_common::config::RptConfig;
use rpt_common::ipc::{Method, Request, Response, ResponseData};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Default per-call timeout
const CALL_TIMEOUT: Duration = Duration::from_secs(5);

pub struct RpcClient {
    reader: BufReader<tokio::net::unix::OwnedReadHalf>,
    writer: tokio::net::unix::OwnedWriteHalf,
    /// Bound for `Translate`, which waits on the backend
    translate_timeout: Duration,
}

impl RpcClient {
    /// Discover socket path
    ///
    /// Priority:
    /// 1. Explicit --socket flag
    /// 2. `daemon.socket_path` from the config file
    /// 3. $RPT_SOCKET, then $XDG_RUNTIME_DIR/rpt/rptd.sock
    pub fn discover_socket_path(explicit_path: Option<&str>, config: &RptConfig) -> PathBuf {
        match explicit_path {
            Some(path) => PathBuf::from(path),
            None => config.daemon.resolved_socket_path(),
        }
    }

    /// Single attempt with a short timeout
    pub async fn connect_quick(path: &Path) -> Result<Self> {
        match tokio::time::timeout(Duration::from_millis(200), UnixStream::connect(path)).await {
            Ok(Ok(stream)) => Ok(Self::from_stream(stream)),
            Ok(Err(e)) => Err(anyhow::anyhow!("Daemon unavailable: {}", e)),
            Err(_) => Err(anyhow::anyhow!("Connection timeout")),
        }
    }

    /// Connect with a few retries, for commands that need the daemon
    pub async fn connect(path: &Path) -> Result<Self> {
        let max_retries = 5;
        let mut retry_delay = Duration::from_millis(50);

        for attempt in 0..max_retries {
            match tokio::time::timeout(Duration::from_millis(500), UnixStream::connect(path)).await
            {
                Ok(Ok(stream)) => return Ok(Self::from_stream(stream)),
                Ok(Err(e)) if attempt == max_retries - 1 => {
                    return Err(Self::socket_error_with_hint(path, e));
                }
                _ => {
                    tokio::time::sleep(retry_delay).await;
                    retry_delay = (retry_delay * 2).min(Duration::from_millis(400));
                }
            }
        }

        anyhow::bail!("Failed to connect to daemon at {}. Is rptd running?", path.display())
    }

    fn from_stream(stream: UnixStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self {
            reader: BufReader::new(reader),
            writer,
            translate_timeout: Duration::from_secs(70),
        }
    }

    /// Match the translate bound to the configured backend timeout
    pub fn with_translate_timeout(mut self, backend_timeout: Duration) -> Self {
        self.translate_timeout = backend_timeout + CALL_TIMEOUT;
        self
    }

    fn socket_error_with_hint(path: &Path, error: std::io::Error) -> anyhow::Error {
        use std::io::ErrorKind;

        let hint = match error.kind() {
            ErrorKind::NotFound => format!(
                "Socket not found at {}. Is rptd running?\nTry: rptd &",
                path.display()
            ),
            ErrorKind::PermissionDenied => format!(
                "Permission denied on {}. The socket belongs to another user.",
                path.display()
            ),
            ErrorKind::ConnectionRefused => format!(
                "Daemon not responding on {}.\nSocket exists but nothing is accepting connections; restart rptd.",
                path.display()
            ),
            _ => format!("Failed to connect to daemon at {}: {}", path.display(), error),
        };

        anyhow::Error::new(error).context(hint)
    }

    /// Send a request and wait for its response
    pub async fn call(&mut self, method: Method) -> Result<ResponseData> {
        let timeout = match &method {
            Method::Translate { .. } => self.translate_timeout,
            _ => CALL_TIMEOUT,
        };

        tokio::time::timeout(timeout, self.call_inner(method))
            .await
            .map_err(|_| anyhow::anyhow!("RPC call timed out after {:?}", timeout))?
    }

    async fn call_inner(&mut self, method: Method) -> Result<ResponseData> {
        let id = REQUEST_ID.fetch_add(1, Ordering::SeqCst);
        let request = Request { id, method };

        let request_json = serde_json::to_string(&request)? + "\n";
        self.writer
            .write_all(request_json.as_bytes())
            .await
            .context("Failed to send request")?;

        let mut line = String::new();
        let bytes_read = self
            .reader
            .read_line(&mut line)
            .await
            .context("Failed to read response")?;
        if bytes_read == 0 {
            anyhow::bail!("Daemon closed the connection");
        }

        let response: Response = serde_json::from_str(&line).context("Failed to parse response")?;

        if response.id != id {
            anyhow::bail!("Response ID mismatch");
        }

        response
            .result
            .map_err(|e| anyhow::anyhow!("RPC error: {}", e))
    }

    pub async fn ping(&mut self) -> Result<()> {
        self.call(Method::Ping).await?;
        Ok(())
    }
}
