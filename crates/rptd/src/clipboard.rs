//! Clipboard adapter
//!
//! Shells out to whatever clipboard tool the session has:
//! Wayland uses wl-clipboard, X11 uses xclip or xsel.
//! Failures never propagate: reads come back empty, writes are dropped.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Upper bound for one clipboard tool invocation
const TOOL_TIMEOUT: Duration = Duration::from_secs(2);

#[async_trait]
pub trait Clipboard: Send + Sync {
    /// Current clipboard text, empty on any failure
    async fn read_selection(&self) -> String;

    /// Replace the clipboard text. Failures are logged and swallowed.
    async fn write_result(&self, text: &str);
}

/// True when `XDG_SESSION_TYPE` names a Wayland session (default: X11)
pub fn is_wayland_session() -> bool {
    std::env::var("XDG_SESSION_TYPE")
        .map(|session| session.to_lowercase().contains("wayland"))
        .unwrap_or(false)
}

pub(crate) fn tool_available(name: &str) -> bool {
    which::which(name).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardTool {
    WlClipboard,
    Xclip,
    Xsel,
}

impl ClipboardTool {
    /// Pick a tool for the session. wl-clipboard needs both halves.
    pub fn detect(wayland: bool, available: impl Fn(&str) -> bool) -> Option<Self> {
        if wayland && available("wl-copy") && available("wl-paste") {
            Some(ClipboardTool::WlClipboard)
        } else if available("xclip") {
            Some(ClipboardTool::Xclip)
        } else if available("xsel") {
            Some(ClipboardTool::Xsel)
        } else {
            None
        }
    }

    pub fn read_command(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            ClipboardTool::WlClipboard => ("wl-paste", &["--no-newline"]),
            ClipboardTool::Xclip => ("xclip", &["-selection", "clipboard", "-o"]),
            ClipboardTool::Xsel => ("xsel", &["--clipboard", "--output"]),
        }
    }

    pub fn write_command(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            ClipboardTool::WlClipboard => ("wl-copy", &[]),
            ClipboardTool::Xclip => ("xclip", &["-selection", "clipboard", "-i"]),
            ClipboardTool::Xsel => ("xsel", &["--clipboard", "--input"]),
        }
    }
}

/// Clipboard backed by the desktop's command-line tools
pub struct SystemClipboard {
    tool: Option<ClipboardTool>,
}

impl SystemClipboard {
    pub fn new(tool: Option<ClipboardTool>) -> Self {
        Self { tool }
    }

    pub fn detect() -> Self {
        let wayland = is_wayland_session();
        let tool = ClipboardTool::detect(wayland, tool_available);
        match tool {
            Some(tool) => info!("[CLIPBOARD] Using {:?}", tool),
            None if wayland => warn!("[CLIPBOARD] Wayland session but wl-clipboard not found"),
            None => warn!("[CLIPBOARD] X11 session but neither xclip nor xsel found"),
        }
        Self::new(tool)
    }

    pub fn tool(&self) -> Option<ClipboardTool> {
        self.tool
    }
}

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn read_selection(&self) -> String {
        let Some(tool) = self.tool else {
            return String::new();
        };
        let (program, args) = tool.read_command();

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(TOOL_TIMEOUT, output).await {
            Ok(Ok(output)) if output.status.success() => {
                let text = String::from_utf8_lossy(&output.stdout).into_owned();
                debug!("[CLIPBOARD] Read {} chars", text.chars().count());
                text
            }
            Ok(Ok(output)) => {
                // Empty clipboards make some tools exit non-zero
                debug!("[CLIPBOARD] {} exited with {}", program, output.status);
                String::new()
            }
            Ok(Err(e)) => {
                warn!("[CLIPBOARD] Failed to run {}: {}", program, e);
                String::new()
            }
            Err(_) => {
                warn!("[CLIPBOARD] {} timed out", program);
                String::new()
            }
        }
    }

    async fn write_result(&self, text: &str) {
        let Some(tool) = self.tool else {
            warn!("[CLIPBOARD] No clipboard tool, result not written");
            return;
        };
        let (program, args) = tool.write_command();

        let write = async {
            let mut child = Command::new(program)
                .args(args)
                .stdin(Stdio::piped())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn()?;
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(text.as_bytes()).await?;
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>(status)
        };

        match tokio::time::timeout(TOOL_TIMEOUT, write).await {
            Ok(Ok(status)) if status.success() => {
                debug!("[CLIPBOARD] Wrote {} chars", text.chars().count())
            }
            Ok(Ok(status)) => warn!("[CLIPBOARD] {} exited with {}", program, status),
            Ok(Err(e)) => warn!("[CLIPBOARD] Failed to run {}: {}", program, e),
            Err(_) => warn!("[CLIPBOARD] {} timed out", program),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wayland_prefers_wl_clipboard() {
        let tool = ClipboardTool::detect(true, |_| true);
        assert_eq!(tool, Some(ClipboardTool::WlClipboard));
    }

    #[test]
    fn test_wayland_without_wl_copy_falls_back_to_x11_tools() {
        let tool = ClipboardTool::detect(true, |name| name == "wl-paste" || name == "xsel");
        assert_eq!(tool, Some(ClipboardTool::Xsel));
    }

    #[test]
    fn test_x11_ignores_wl_clipboard() {
        let tool = ClipboardTool::detect(false, |name| name.starts_with("wl-") || name == "xclip");
        assert_eq!(tool, Some(ClipboardTool::Xclip));
        assert_eq!(ClipboardTool::detect(false, |name| name.starts_with("wl-")), None);
    }

    #[test]
    fn test_xclip_targets_clipboard_selection() {
        let (program, args) = ClipboardTool::Xclip.read_command();
        assert_eq!(program, "xclip");
        assert_eq!(args, &["-selection", "clipboard", "-o"]);
    }

    #[tokio::test]
    async fn test_missing_tool_reads_empty() {
        let clipboard = SystemClipboard::new(None);
        assert_eq!(clipboard.read_selection().await, "");
        clipboard.write_result("ignored").await;
    }
}
