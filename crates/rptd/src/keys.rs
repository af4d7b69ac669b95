//! Key-injection adapter - simulated Ctrl+C / Ctrl+V
//!
//! `wtype` (Wayland), `xdotool` (X11) or `ydotool` (uinput, both).

use crate::clipboard::{is_wayland_session, tool_available};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

const TOOL_TIMEOUT: Duration = Duration::from_secs(2);

// Linux input event codes used by ydotool
const KEY_LEFTCTRL: u16 = 29;
const KEY_C: u16 = 46;
const KEY_V: u16 = 47;

#[async_trait]
pub trait KeyInjector: Send + Sync {
    async fn send_copy(&self);
    async fn send_paste(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTool {
    Wtype,
    Xdotool,
    Ydotool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chord {
    Copy,
    Paste,
}

impl KeyTool {
    pub fn detect(wayland: bool, available: impl Fn(&str) -> bool) -> Option<Self> {
        let order: &[KeyTool] = if wayland {
            &[KeyTool::Wtype, KeyTool::Ydotool]
        } else {
            &[KeyTool::Xdotool, KeyTool::Ydotool]
        };
        order.iter().copied().find(|tool| available(tool.program()))
    }

    pub fn program(&self) -> &'static str {
        match self {
            KeyTool::Wtype => "wtype",
            KeyTool::Xdotool => "xdotool",
            KeyTool::Ydotool => "ydotool",
        }
    }

    fn args(&self, chord: Chord) -> Vec<String> {
        let (letter, code) = match chord {
            Chord::Copy => ("c", KEY_C),
            Chord::Paste => ("v", KEY_V),
        };
        match self {
            KeyTool::Wtype => vec!["-M".into(), "ctrl".into(), letter.into(), "-m".into(), "ctrl".into()],
            KeyTool::Xdotool => vec![
                "key".into(),
                "--clearmodifiers".into(),
                format!("ctrl+{}", letter),
            ],
            KeyTool::Ydotool => vec![
                "key".into(),
                format!("{}:1", KEY_LEFTCTRL),
                format!("{}:1", code),
                format!("{}:0", code),
                format!("{}:0", KEY_LEFTCTRL),
            ],
        }
    }
}

/// Sends chords by running a key tool
pub struct CommandKeyInjector {
    tool: KeyTool,
}

impl CommandKeyInjector {
    pub fn new(tool: KeyTool) -> Self {
        Self { tool }
    }

    async fn send(&self, chord: Chord) {
        let program = self.tool.program();
        let status = Command::new(program)
            .args(self.tool.args(chord))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(TOOL_TIMEOUT, status).await {
            Ok(Ok(status)) if status.success() => debug!("[KEYS] Sent {:?}", chord),
            Ok(Ok(status)) => warn!("[KEYS] {} exited with {}", program, status),
            Ok(Err(e)) => warn!("[KEYS] Failed to run {}: {}", program, e),
            Err(_) => warn!("[KEYS] {} timed out", program),
        }
    }
}

#[async_trait]
impl KeyInjector for CommandKeyInjector {
    async fn send_copy(&self) {
        self.send(Chord::Copy).await;
    }

    async fn send_paste(&self) {
        self.send(Chord::Paste).await;
    }
}

/// Used when no key tool is installed; the user copies and pastes by hand
pub struct NoopKeyInjector;

#[async_trait]
impl KeyInjector for NoopKeyInjector {
    async fn send_copy(&self) {}
    async fn send_paste(&self) {}
}

pub fn detect_key_injector() -> Arc<dyn KeyInjector> {
    match KeyTool::detect(is_wayland_session(), tool_available) {
        Some(tool) => {
            info!("[KEYS] Using {}", tool.program());
            Arc::new(CommandKeyInjector::new(tool))
        }
        None => {
            warn!("[KEYS] No key tool found (wtype, xdotool, ydotool) - copy and paste manually");
            Arc::new(NoopKeyInjector)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_by_session() {
        assert_eq!(KeyTool::detect(true, |_| true), Some(KeyTool::Wtype));
        assert_eq!(KeyTool::detect(false, |_| true), Some(KeyTool::Xdotool));
        assert_eq!(
            KeyTool::detect(true, |name| name == "ydotool"),
            Some(KeyTool::Ydotool)
        );
        assert_eq!(KeyTool::detect(false, |name| name == "wtype"), None);
    }

    #[test]
    fn test_chord_arguments() {
        assert_eq!(
            KeyTool::Xdotool.args(Chord::Paste),
            vec!["key", "--clearmodifiers", "ctrl+v"]
        );
        assert_eq!(
            KeyTool::Wtype.args(Chord::Copy),
            vec!["-M", "ctrl", "c", "-m", "ctrl"]
        );
        assert_eq!(
            KeyTool::Ydotool.args(Chord::Copy),
            vec!["key", "29:1", "46:1", "46:0", "29:0"]
        );
    }
}
