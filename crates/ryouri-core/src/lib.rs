pub mod ai;
pub mod config;
pub mod error;
pub mod persona;
pub mod provider;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::ClaudeClient;
pub use config::Config;
pub use error::SendError;
pub use provider::{ChatProvider, SendRequest};
pub use session::{Sent, Session};
pub use state::{ChatRole, Conversation, Turn};
