pub mod config;
pub mod error;
pub mod types;

pub use error::{LyohaError, Result};
pub use types::{ChatId, Message, Role};
