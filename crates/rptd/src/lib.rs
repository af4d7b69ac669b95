//! RP Translator daemon library - exposes modules for testing.
//!
//! OS glue around `rpt_common`: clipboard and key-injection adapters, the
//! copy/translate/paste session, runtime state and the RPC server.

pub mod clipboard;
pub mod daemon;
pub mod keys;
pub mod server;
pub mod session;
pub mod state;
pub mod trigger;

pub use daemon::Daemon;
pub use state::DaemonState;
