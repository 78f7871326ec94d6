use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{LyohaError, Result};
use crate::types::ChatId;

pub const DEFAULT_BOT_NAME: &str = "LyohaGPT";
pub const DEFAULT_MODEL: &str = "gpt-5-mini";
pub const DEFAULT_CONTEXT_SIZE: usize = 10;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Top-level config (lyoha.toml + LYOHA_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LyohaConfig {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub channels: ChannelsConfig,
}

/// Identity and addressing rules of the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Shown in the banner of every reply.
    #[serde(default = "default_bot_name")]
    pub name: String,
    /// Case-insensitive words that mark a message as addressed to the bot.
    #[serde(default = "default_trigger_words")]
    pub trigger_words: Vec<String>,
    /// Empty list means every conversation is eligible.
    #[serde(default)]
    pub allowed_chat_ids: Vec<ChatId>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            trigger_words: default_trigger_words(),
            allowed_chat_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Capacity of the per-conversation context window.
    #[serde(default = "default_context_size")]
    pub context_size: usize,
    /// Replaces the built-in persona instruction when set.
    pub system_prompt: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub empty_reply: EmptyReplyPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            context_size: default_context_size(),
            system_prompt: None,
            request_timeout_secs: default_request_timeout_secs(),
            empty_reply: EmptyReplyPolicy::default(),
        }
    }
}

/// What to do when the completion backend answers with empty text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReplyPolicy {
    /// Treat the empty text as a legitimate reply.
    #[default]
    Accept,
    /// Fail the completion.
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProvidersConfig {
    pub openai: Option<OpenAiProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiProviderConfig {
    pub api_key: String,
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelsConfig {
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
}

fn default_bot_name() -> String {
    DEFAULT_BOT_NAME.to_string()
}
fn default_trigger_words() -> Vec<String> {
    ["Леха", "Лёха", DEFAULT_BOT_NAME]
        .iter()
        .map(|w| w.to_string())
        .collect()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_context_size() -> usize {
    DEFAULT_CONTEXT_SIZE
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_openai_base_url() -> String {
    "https://api.openai.com".to_string()
}

impl LyohaConfig {
    /// Load config from a TOML file with LYOHA_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.lyoha/lyoha.toml
    ///
    /// A missing file is not an error: every section has defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::from_figment(
            Figment::new()
                .merge(Toml::file(&path))
                .merge(Env::prefixed("LYOHA_").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: LyohaConfig = figment
            .extract()
            .map_err(|e| LyohaError::Config(e.to_string()))?;
        Ok(config)
    }

    /// Reject values the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.bot.name.trim().is_empty() {
            return Err(LyohaError::InvalidConfiguration(
                "bot.name must not be empty".into(),
            ));
        }
        if self.bot.trigger_words.iter().all(|w| w.trim().is_empty()) {
            return Err(LyohaError::InvalidConfiguration(
                "bot.trigger_words must contain at least one non-empty word".into(),
            ));
        }
        if self.agent.context_size == 0 {
            return Err(LyohaError::InvalidConfiguration(
                "agent.context_size must be at least 1".into(),
            ));
        }
        if self.agent.request_timeout_secs == 0 {
            return Err(LyohaError::InvalidConfiguration(
                "agent.request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.lyoha/lyoha.toml", home)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> LyohaConfig {
        LyohaConfig::from_figment(Figment::from(Toml::string(toml))).unwrap()
    }

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse("");
        assert_eq!(cfg.bot.name, "LyohaGPT");
        assert_eq!(cfg.bot.trigger_words.len(), 3);
        assert!(cfg.bot.allowed_chat_ids.is_empty());
        assert_eq!(cfg.agent.context_size, 10);
        assert_eq!(cfg.agent.empty_reply, EmptyReplyPolicy::Accept);
        assert!(cfg.providers.openai.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn full_file_parses() {
        let cfg = parse(
            r#"
            [bot]
            name = "TestBot"
            trigger_words = ["Leha", "Lyoha"]
            allowed_chat_ids = [-318631037, 18866739]

            [agent]
            model = "gpt-4o-mini"
            context_size = 4
            empty_reply = "reject"

            [providers.openai]
            api_key = "sk-test"

            [channels.telegram]
            bot_token = "123:abc"
            "#,
        );
        assert_eq!(cfg.bot.name, "TestBot");
        assert_eq!(cfg.bot.allowed_chat_ids, vec![ChatId(-318_631_037), ChatId(18_866_739)]);
        assert_eq!(cfg.agent.context_size, 4);
        assert_eq!(cfg.agent.empty_reply, EmptyReplyPolicy::Reject);
        let openai = cfg.providers.openai.unwrap();
        assert_eq!(openai.base_url, "https://api.openai.com");
        assert_eq!(cfg.channels.telegram.unwrap().bot_token, "123:abc");
    }

    #[test]
    fn zero_context_size_is_invalid() {
        let cfg = parse("[agent]\ncontext_size = 0\n");
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, LyohaError::InvalidConfiguration(_)));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let cfg = LyohaConfig::load(path.to_str()).unwrap();
        assert!(cfg.bot.allowed_chat_ids.is_empty());
    }

    #[test]
    fn malformed_file_is_an_error_not_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lyoha.toml");
        std::fs::write(
            &path,
            "[bot]\nallowed_chat_ids = [100]\n[agent]\ncontext_size = \"ten\"\n",
        )
        .unwrap();

        let err = LyohaConfig::load(path.to_str()).unwrap_err();
        assert!(matches!(err, LyohaError::Config(_)));
    }

    #[test]
    fn blank_trigger_words_are_invalid() {
        let cfg = parse("[bot]\ntrigger_words = [\"  \", \"\"]\n");
        assert!(matches!(
            cfg.validate(),
            Err(LyohaError::InvalidConfiguration(_))
        ));
    }
}
