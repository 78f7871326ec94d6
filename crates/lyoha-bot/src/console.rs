//! Operator console on stdin.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use lyoha_channels::ChatBot;
use lyoha_core::types::ChatId;

const ALLOW_USAGE: &str = "usage: allow <chat id>";
const DENY_USAGE: &str = "usage: deny <chat id>";
const MESSAGE_USAGE: &str = "usage: message <chat id> <text>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Allow(ChatId),
    Deny(ChatId),
    Message { chat_id: ChatId, text: String },
    Exit,
    Empty,
    Unknown(String),
    Usage(&'static str),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map(|(v, r)| (v, r.trim()))
            .unwrap_or((line, ""));

        match verb {
            "allow" => rest.parse().map(Self::Allow).unwrap_or(Self::Usage(ALLOW_USAGE)),
            "deny" => rest.parse().map(Self::Deny).unwrap_or(Self::Usage(DENY_USAGE)),
            "message" => {
                let Some((id, text)) = rest.split_once(char::is_whitespace) else {
                    return Self::Usage(MESSAGE_USAGE);
                };
                match (id.parse::<ChatId>(), text.trim()) {
                    (Ok(chat_id), text) if !text.is_empty() => Self::Message {
                        chat_id,
                        text: text.to_string(),
                    },
                    _ => Self::Usage(MESSAGE_USAGE),
                }
            }
            "exit" if rest.is_empty() => Self::Exit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// How the console loop ended.
#[derive(Debug, PartialEq, Eq)]
pub enum ConsoleEnd {
    /// Operator typed `exit`.
    Exit,
    /// stdin closed; the bot keeps running.
    Closed,
}

pub async fn run_console(bot: Arc<ChatBot>) -> std::io::Result<ConsoleEnd> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match ConsoleCommand::parse(&line) {
            ConsoleCommand::Allow(chat_id) => {
                bot.allow_chat(chat_id);
                println!("Allowed chat {chat_id}");
            }
            ConsoleCommand::Deny(chat_id) => {
                bot.disallow_chat(chat_id);
                println!("Disallowed chat {chat_id}");
            }
            ConsoleCommand::Message { chat_id, text } => {
                // Completion can take seconds; keep reading commands meanwhile.
                let bot = Arc::clone(&bot);
                tokio::spawn(async move {
                    if let Err(e) = bot.generate_and_send_message(chat_id, &text).await {
                        warn!(%chat_id, error = %e, "operator message failed");
                    }
                });
            }
            ConsoleCommand::Exit => return Ok(ConsoleEnd::Exit),
            ConsoleCommand::Empty => {}
            ConsoleCommand::Unknown(_) => println!("Unknown command"),
            ConsoleCommand::Usage(usage) => println!("{usage}"),
        }
    }

    info!("console input closed");
    Ok(ConsoleEnd::Closed)
}
