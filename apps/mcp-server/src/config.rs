use std::time::Duration;

use anyhow::{Context, Result, bail};
use wbb_core::{Credentials, PlatformKind, WebhookClient, WebhookPlatform};
use wbb_core::platforms::{dingtalk::DINGTALK_API_BASE, wecom::WECOM_API_BASE};

const DRY_RUN_ENV: &str = "BOT_DRY_RUN";
const TIMEOUT_ENV: &str = "BOT_HTTP_TIMEOUT_SECS";

/// Robot configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub platform: PlatformKind,
    pub credentials: Credentials,
    pub dry_run: bool,
    pub timeout: Option<Duration>,
}

struct EnvNames {
    key: &'static str,
    secret: Option<&'static str>,
    api_base: &'static str,
    default_base: &'static str,
}

fn env_names(platform: PlatformKind) -> EnvNames {
    match platform {
        PlatformKind::DingTalk => EnvNames {
            key: "DINGDING_BOT_WEBHOOK_KEY",
            secret: Some("DINGDING_BOT_SIGN_KEY"),
            api_base: "DINGDING_BOT_API_BASE",
            default_base: DINGTALK_API_BASE,
        },
        PlatformKind::WeCom => EnvNames {
            key: "WECOM_BOT_WEBHOOK_KEY",
            secret: None,
            api_base: "WECOM_BOT_API_BASE",
            default_base: WECOM_API_BASE,
        },
    }
}

fn flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl BotConfig {
    pub fn from_env(platform: PlatformKind) -> Result<Self> {
        Self::from_lookup(platform, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(platform: PlatformKind, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let names = env_names(platform);
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let Some(access_token) = non_empty(names.key) else {
            bail!("{} environment variable is required", names.key);
        };
        let secret = names.secret.and_then(|key| non_empty(key));
        let base_url = non_empty(names.api_base).unwrap_or_else(|| names.default_base.to_string());
        let dry_run = lookup(DRY_RUN_ENV).map(|v| flag(&v)).unwrap_or(false);
        let timeout = match non_empty(TIMEOUT_ENV) {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{TIMEOUT_ENV} must be a whole number of seconds"))?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            platform,
            credentials: Credentials::new(base_url, access_token, secret),
            dry_run,
            timeout,
        })
    }

    /// Builds a client for `platform`, which must match the configured kind.
    pub fn client<P: WebhookPlatform>(&self, platform: P) -> WebhookClient<P> {
        debug_assert_eq!(platform.kind(), self.platform);
        let mut client =
            WebhookClient::new(platform, self.credentials.clone()).with_dry_run(self.dry_run);
        if let Some(timeout) = self.timeout {
            client = client.with_timeout(timeout);
        }
        client
    }
}
