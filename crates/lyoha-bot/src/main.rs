use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use lyoha_agent::{ChatAssistant, CompletionAssistant, LlmProvider};
use lyoha_channels::{AllowList, ChatBot};
use lyoha_core::config::{LyohaConfig, TelegramConfig};
use lyoha_telegram::{TelegramAdapter, TelegramError, TelegramSender};

mod console;

use console::ConsoleEnd;

#[derive(Debug, Parser)]
#[command(name = "lyoha-bot", version, about = "Lyoha, a chat assistant for Telegram groups")]
struct Args {
    /// Path to lyoha.toml (falls back to LYOHA_CONFIG, then ~/.lyoha/lyoha.toml).
    #[arg(long)]
    config: Option<String>,

    /// Run without the stdin operator console; stop with Ctrl-C.
    #[arg(long)]
    no_console: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lyoha_bot=info,lyoha_channels=info,lyoha_agent=info,lyoha_telegram=info".into()
            }),
        )
        .init();

    let args = Args::parse();

    // load config: --config > LYOHA_CONFIG env > ~/.lyoha/lyoha.toml
    let config_path = args.config.or_else(|| std::env::var("LYOHA_CONFIG").ok());
    // Missing file yields defaults; a malformed one is fatal.
    let config = LyohaConfig::load(config_path.as_deref())?;
    config.validate()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("LYOHA_GIT_SHA"),
        name = %config.bot.name,
        model = %config.agent.model,
        "starting Lyoha"
    );

    let assistant: Arc<dyn ChatAssistant> = Arc::new(CompletionAssistant::from_config(
        build_provider(&config),
        &config.agent,
    ));

    let mut adapter = TelegramAdapter::new(&telegram_config(&config)?)?;
    let username = adapter.connect().await?;
    let sender = Arc::new(TelegramSender::new(adapter.bot()));

    let allow_list = Arc::new(AllowList::from_ids(
        config.bot.allowed_chat_ids.iter().copied(),
    ));
    if allow_list.is_empty() {
        info!("allow-list empty: every chat is eligible");
    } else {
        info!(chats = ?allow_list.snapshot(), "allow-list loaded");
    }

    let mut bot = ChatBot::new(
        &config.bot,
        config.agent.context_size,
        allow_list,
        assistant,
        sender,
    )?;
    if let Some(username) = username {
        bot = bot.with_bot_username(username);
    }
    let bot = Arc::new(bot);

    let transport = adapter.start(Arc::clone(&bot));

    if args.no_console {
        tokio::signal::ctrl_c().await?;
    } else {
        tokio::select! {
            end = console::run_console(Arc::clone(&bot)) => match end {
                Ok(ConsoleEnd::Exit) => {}
                Ok(ConsoleEnd::Closed) => tokio::signal::ctrl_c().await?,
                Err(e) => {
                    warn!(error = %e, "console failed; waiting for Ctrl-C");
                    tokio::signal::ctrl_c().await?;
                }
            },
            signal = tokio::signal::ctrl_c() => signal?,
        }
    }

    info!(
        active = bot.dispatcher().active_conversations(),
        "shutting down"
    );
    transport.stop().await;
    bot.shutdown().await;
    info!("bye");
    Ok(())
}

/// `[channels.telegram]`, else `TELEGRAM_BOT_TOKEN`.
fn telegram_config(config: &LyohaConfig) -> Result<TelegramConfig, TelegramError> {
    if let Some(ref telegram) = config.channels.telegram {
        return Ok(telegram.clone());
    }
    match std::env::var("TELEGRAM_BOT_TOKEN") {
        Ok(bot_token) if !bot_token.trim().is_empty() => Ok(TelegramConfig { bot_token }),
        _ => Err(TelegramError::NoToken),
    }
}

/// Build the completion backend from config.
///
/// `[providers.openai]` wins; otherwise `OPENAI_API_KEY` is used. With neither,
/// every completion fails and the failure is logged per conversation.
fn build_provider(config: &LyohaConfig) -> Box<dyn LlmProvider> {
    if let Some(ref openai) = config.providers.openai {
        info!("LLM provider: OpenAI ({})", openai.base_url);
        return Box::new(lyoha_agent::openai::OpenAiProvider::new(
            openai.api_key.clone(),
            Some(openai.base_url.clone()),
        ));
    }

    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            info!("LLM provider: OpenAI (from env)");
            Box::new(lyoha_agent::openai::OpenAiProvider::new(key, None))
        }
        _ => {
            warn!("No LLM provider configured; every completion will fail");
            Box::new(NullProvider)
        }
    }
}

/// Placeholder provider when no API key is available.
struct NullProvider;

#[async_trait::async_trait]
impl LlmProvider for NullProvider {
    fn name(&self) -> &str {
        "null"
    }
    async fn send(
        &self,
        _req: &lyoha_agent::ChatRequest,
    ) -> Result<lyoha_agent::ChatResponse, lyoha_agent::ProviderError> {
        Err(lyoha_agent::ProviderError::Unavailable(
            "no LLM provider configured; set providers.openai.api_key in lyoha.toml".into(),
        ))
    }
}
