//! Service configuration loaded via OrthoConfig.
//!
//! Values layer defaults, configuration files and `SANTA_*` environment
//! variables.

use std::env;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Deserializer, de};

use crate::domain::{AdminAllowList, ChatUserId, MaxAttempts};

/// Settings shared by every `santa` command.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "SANTA")]
pub struct SantaSettings {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Chat user ids allowed to reset the epoch, e.g. `SANTA_ADMIN_IDS=42,7`.
    #[serde(default, deserialize_with = "deserialize_chat_user_ids")]
    #[ortho_config(default = vec![], merge_strategy = "append")]
    pub admin_ids: Vec<i64>,
    /// Shuffle attempts before pairing gives up.
    #[ortho_config(default = 1000)]
    pub max_pairing_attempts: u32,
    /// Round commit timeout in milliseconds.
    #[ortho_config(default = 5000)]
    pub commit_timeout_ms: u64,
    /// Maximum pooled database connections.
    #[ortho_config(default = 10)]
    pub pool_max_size: u32,
}

/// A chat user id as it arrives from configuration layers.
///
/// Comma-separated environment values are split into strings, while
/// single values and files yield numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawChatUserId {
    Number(i64),
    Text(String),
}

fn deserialize_chat_user_ids<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<RawChatUserId>::deserialize(deserializer)?
        .into_iter()
        .filter_map(|raw| match raw {
            RawChatUserId::Number(id) => Some(Ok(id)),
            RawChatUserId::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| {
                    trimmed.parse::<i64>().map_err(|err| {
                        <D::Error as de::Error>::custom(format!(
                            "invalid chat user id `{trimmed}`: {err}"
                        ))
                    })
                })
            }
        })
        .collect()
}

impl SantaSettings {
    /// Configured database URL, falling back to `DATABASE_URL`.
    ///
    /// Blank values count as missing.
    pub fn database_url(&self) -> Option<String> {
        self.database_url
            .clone()
            .or_else(|| env::var("DATABASE_URL").ok())
            .filter(|url| !url.trim().is_empty())
    }

    /// Administrator allow-list; empty when unset.
    pub fn admins(&self) -> AdminAllowList {
        AdminAllowList::new(self.admin_ids.iter().copied().map(ChatUserId::new))
    }

    /// Pairing attempt ceiling; zero falls back to the default.
    pub fn max_pairing_attempts(&self) -> MaxAttempts {
        MaxAttempts::new(self.max_pairing_attempts).unwrap_or_default()
    }

    /// Round commit timeout.
    pub fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }

    /// Maximum pooled database connections.
    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size
    }
}
