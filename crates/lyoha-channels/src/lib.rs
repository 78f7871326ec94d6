//! Transport-neutral routing core.
//!
//! Incoming events pass the addressing filter, are turned into prompt
//! messages and handed to the [`Dispatcher`], which runs one worker per
//! conversation. Replies leave through a [`MessageSender`].

pub mod allow;
pub mod bot;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod sender;
pub mod trigger;
pub mod types;

pub use allow::AllowList;
pub use bot::ChatBot;
pub use dispatcher::{Dispatcher, Job};
pub use error::ChannelError;
pub use filter::Rejection;
pub use sender::MessageSender;
pub use trigger::TriggerSet;
pub use types::{ChatKind, IncomingEvent, Sender};
