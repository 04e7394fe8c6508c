use anyhow::{Context as _, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: u64,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Respuestas
    pub reply_retry_attempts: u32,
    pub reply_retry_delay: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_vars(|key| std::env::var(key).ok())?;

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Builds a configuration from an arbitrary variable lookup.
    ///
    /// `load` feeds it the process environment; tests feed it a map.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            // Discord
            discord_token: lookup("DISCORD_TOKEN").context("DISCORD_TOKEN no definido")?,
            application_id: lookup("APPLICATION_ID")
                .context("APPLICATION_ID no definido")?
                .parse()
                .context("APPLICATION_ID inválido")?,
            guild_id: lookup("GUILD_ID").and_then(|s| s.parse().ok()),

            // Respuestas
            reply_retry_attempts: match lookup("REPLY_RETRY_ATTEMPTS") {
                Some(val) if !val.trim().is_empty() => val
                    .trim()
                    .parse()
                    .context("REPLY_RETRY_ATTEMPTS inválido")?,
                _ => defaults.reply_retry_attempts,
            },
            reply_retry_delay: match lookup("REPLY_RETRY_DELAY") {
                Some(val) if !val.trim().is_empty() => humantime::parse_duration(val.trim())
                    .context("REPLY_RETRY_DELAY inválido (ej: 250ms, 1s)")?,
                _ => defaults.reply_retry_delay,
            },
        };

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Token must not be empty
    /// - Application ID must be non-zero
    /// - At most 10 reply retries
    /// - Retry delay must be non-zero
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("DISCORD_TOKEN must not be empty");
        }

        if self.application_id == 0 {
            anyhow::bail!("APPLICATION_ID must be non-zero");
        }

        if self.reply_retry_attempts > 10 {
            anyhow::bail!(
                "Reply retry attempts cannot exceed 10, got: {}",
                self.reply_retry_attempts
            );
        }

        if self.reply_retry_delay.is_zero() {
            anyhow::bail!("Reply retry delay must be greater than 0");
        }

        Ok(())
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// Excludes the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            Replies: {} retries, {} base delay",
            self.application_id,
            self.guild_id.map_or("global".to_string(), |id| id.to_string()),
            self.reply_retry_attempts,
            humantime::format_duration(self.reply_retry_delay),
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            application_id: 0,
            guild_id: None,

            // Reply defaults
            reply_retry_attempts: 3,
            reply_retry_delay: Duration::from_millis(250),
        }
    }
}
