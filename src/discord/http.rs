//! Blocking Discord REST client.
//!
//! Thin [`DiscordApi`] implementation over ureq. Every non-2xx response is
//! surfaced as [`Error::UpstreamApi`] carrying Discord's own error code when
//! the body parses, so the engine can distinguish "no access" from real
//! failures. No retries happen here; that is the caller's concern.

use std::sync::OnceLock;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{DiscordApi, LiveBan, LiveChannel, LiveGuild, LiveMember, LiveUser, BAN_PAGE_SIZE};
use crate::error::{Error, Result};

const API_BASE: &str = "https://discord.com/api/v10";

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: i64,
    message: String,
}

pub struct HttpDiscordApi {
    agent: ureq::Agent,
    token: String,
    bot_user: OnceLock<String>,
}

impl HttpDiscordApi {
    pub fn new(token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        HttpDiscordApi {
            agent,
            token: token.into(),
            bot_user: OnceLock::new(),
        }
    }

    fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        if self.token.is_empty() {
            return Err(Error::Config(
                "no bot token configured; set DISCORD_TOKEN or token in config.toml".to_string(),
            ));
        }

        let url = format!("{API_BASE}/{endpoint}");
        let response = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bot {}", self.token))
            .set("Content-Type", "application/json")
            .call();

        match response {
            Ok(body) => Ok(body.into_json()?),
            Err(ureq::Error::Status(status, body)) => {
                match body.into_json::<ApiErrorBody>() {
                    Ok(api_error) => Err(Error::upstream(api_error.code, api_error.message)),
                    Err(_) => Err(Error::upstream(0, format!("http status {status} from {url}"))),
                }
            }
            Err(transport) => Err(Error::upstream(0, transport.to_string())),
        }
    }
}

impl DiscordApi for HttpDiscordApi {
    fn fetch_guild(&self, guild_id: &str) -> Result<LiveGuild> {
        self.get(&format!("guilds/{guild_id}"))
    }

    fn fetch_channels(&self, guild_id: &str) -> Result<Vec<LiveChannel>> {
        self.get(&format!("guilds/{guild_id}/channels"))
    }

    fn fetch_member(&self, guild_id: &str, user_id: &str) -> Result<LiveMember> {
        self.get(&format!("guilds/{guild_id}/members/{user_id}"))
    }

    fn fetch_bans_page(&self, guild_id: &str, after: Option<&str>) -> Result<Vec<LiveBan>> {
        let mut endpoint = format!("guilds/{guild_id}/bans?limit={BAN_PAGE_SIZE}");
        if let Some(cursor) = after {
            endpoint.push_str(&format!("&after={cursor}"));
        }
        self.get(&endpoint)
    }

    fn bot_user_id(&self) -> Result<String> {
        if let Some(id) = self.bot_user.get() {
            return Ok(id.clone());
        }
        let user: LiveUser = self.get("users/@me")?;
        Ok(self.bot_user.get_or_init(|| user.id).clone())
    }
}
