//! The Discord-API collaborator seam.
//!
//! The engine is generic over [`DiscordApi`] so that captures can run against
//! the live API (see [`http`]) or a scripted double in tests. Wire types keep
//! Discord's shapes: permission bitfields arrive as base-10 strings and are
//! only parsed into integers during normalization.

pub mod http;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Discord serves bans in pages of up to 1000, cursored by the last seen
/// user id.
pub const BAN_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct LiveGuild {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<LiveRole>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveRole {
    pub id: String,
    pub name: Option<String>,
    #[serde(default)]
    pub color: i64,
    #[serde(default)]
    pub hoist: bool,
    #[serde(default)]
    pub position: i64,
    pub permissions: Option<String>,
    #[serde(default)]
    pub managed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveChannel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: i64,
    pub name: Option<String>,
    pub position: Option<i64>,
    pub topic: Option<String>,
    pub nsfw: Option<bool>,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub permission_overwrites: Vec<LiveOverwrite>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveOverwrite {
    /// Role or member id the overwrite targets.
    pub id: String,
    pub allow: Option<String>,
    pub deny: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveUser {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveMember {
    #[serde(default)]
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LiveBan {
    pub user: LiveUser,
    pub reason: Option<String>,
}

/// What the snapshot engine consumes from Discord. Implementations surface
/// error payloads as [`Error::UpstreamApi`]; the engine decides which of
/// those are recoverable.
pub trait DiscordApi {
    fn fetch_guild(&self, guild_id: &str) -> Result<LiveGuild>;
    fn fetch_channels(&self, guild_id: &str) -> Result<Vec<LiveChannel>>;
    fn fetch_member(&self, guild_id: &str, user_id: &str) -> Result<LiveMember>;
    /// One page of bans after the given user id cursor, oldest first.
    fn fetch_bans_page(&self, guild_id: &str, after: Option<&str>) -> Result<Vec<LiveBan>>;
    /// The bot's own user id, used to locate its role in the guild.
    fn bot_user_id(&self) -> Result<String>;
}

/// Drive ban pagination to completion. Terminates on a page shorter than
/// [`BAN_PAGE_SIZE`]; a cursor that fails to advance means the upstream is
/// looping and is treated as a fatal pagination error.
pub fn fetch_all_bans<A: DiscordApi + ?Sized>(api: &A, guild_id: &str) -> Result<Vec<LiveBan>> {
    let mut bans = Vec::new();
    let mut cursor: Option<String> = None;

    loop {
        let page = api.fetch_bans_page(guild_id, cursor.as_deref())?;
        let short_page = page.len() < BAN_PAGE_SIZE;
        let next_cursor = page.last().map(|ban| ban.user.id.clone());

        bans.extend(page);

        if short_page {
            return Ok(bans);
        }

        if next_cursor == cursor {
            return Err(Error::upstream(
                0,
                format!("ban pagination cursor did not advance past {cursor:?}"),
            ));
        }
        cursor = next_cursor;
    }
}
