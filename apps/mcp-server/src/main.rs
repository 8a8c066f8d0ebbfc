use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use wbb_core::{DingTalk, Mentions, PlatformKind, WeCom, WebhookPlatform};
use webhook_bot_bridge::{BotConfig, ToolServer, tools::split_list};

#[derive(Parser, Debug)]
#[command(author, version, about = "DingTalk and WeCom group robots as MCP tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum Platform {
    #[value(alias = "dingding")]
    Dingtalk,
    #[value(alias = "wework")]
    Wecom,
}

impl From<Platform> for PlatformKind {
    fn from(value: Platform) -> Self {
        match value {
            Platform::Dingtalk => PlatformKind::DingTalk,
            Platform::Wecom => PlatformKind::WeCom,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the robot tools over stdio
    Serve {
        #[arg(long, value_enum)]
        platform: Platform,
        /// Log payloads instead of posting them
        #[arg(long)]
        dry_run: bool,
    },
    /// Send a single text message and exit
    SendText {
        #[arg(long, value_enum)]
        platform: Platform,
        #[arg()]
        content: String,
        /// Comma separated mobile numbers to mention
        #[arg(long, default_value = "")]
        at_mobiles: String,
        /// Comma separated user ids to mention
        #[arg(long, default_value = "")]
        at_user_ids: String,
        #[arg(long)]
        at_all: bool,
        #[arg(long)]
        dry_run: bool,
    },
}

fn load_config(platform: Platform, dry_run: bool) -> Result<BotConfig> {
    let mut cfg = BotConfig::from_env(platform.into())?;
    cfg.dry_run |= dry_run;
    Ok(cfg)
}

async fn serve<P: WebhookPlatform + 'static>(cfg: &BotConfig, platform: P) -> Result<()> {
    let client = cfg.client(platform);
    info!(
        platform = %cfg.platform,
        dry_run = client.is_dry_run(),
        "serving robot tools on stdio"
    );
    ToolServer::new(client).serve_stdio().await
}

async fn send_text<P: WebhookPlatform>(
    cfg: &BotConfig,
    platform: P,
    content: String,
    mentions: Mentions,
) -> Result<()> {
    if let Err(err) = cfg.client(platform).send_text(content, mentions).await {
        bail!("failed to send text message: {err}");
    }
    println!("Text message sent successfully");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    wbb_telemetry::install("webhook-bot-bridge")?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { platform, dry_run } => {
            let cfg = load_config(platform, dry_run)?;
            match platform {
                Platform::Dingtalk => serve(&cfg, DingTalk).await,
                Platform::Wecom => serve(&cfg, WeCom).await,
            }
        }
        Commands::SendText {
            platform,
            content,
            at_mobiles,
            at_user_ids,
            at_all,
            dry_run,
        } => {
            let cfg = load_config(platform, dry_run)?;
            let mentions = Mentions {
                mobiles: split_list(&at_mobiles),
                user_ids: split_list(&at_user_ids),
                all: at_all,
            };
            match platform {
                Platform::Dingtalk => send_text(&cfg, DingTalk, content, mentions).await,
                Platform::Wecom => send_text(&cfg, WeCom, content, mentions).await,
            }
        }
    }
}
