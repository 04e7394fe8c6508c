use anyhow::Result;
use async_trait::async_trait;
use serenity::{
    builder::{CreateInteractionResponse, CreateInteractionResponseMessage},
    http::{Http, HttpError},
    model::application::CommandInteraction,
};
use std::{fmt::Debug, future::Future, sync::Arc, time::Duration};
use tracing::warn;

use crate::config::Config;

/// Textos fijos de respuesta
pub mod messages {
    pub const NOTHING_PLAYING: &str = "❌ No hay nada reproduciéndose actualmente";
    pub const PAUSED: &str = "⏸️ Reproducción pausada";
    pub const RESUMED: &str = "▶️ Reproducción reanudada";
    pub const EXITED: &str = "👋 Cola eliminada y desconectado del canal de voz";
    pub const NOT_IN_VOICE: &str = "❌ Debes estar en un canal de voz";
    pub const MISSING_QUERY: &str = "❌ Debes indicar una canción o URL";
    pub const GUILD_ONLY: &str = "❌ Este comando solo funciona en servidores";
    pub const GENERIC_FAILURE: &str = "❌ Algo salió mal al ejecutar el comando";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    pub ephemeral: bool,
}

impl Reply {
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }
}

/// Sends the single reply of an invocation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Responder: Send + Sync {
    async fn send(&self, reply: &Reply) -> Result<()>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            attempts: config.reply_retry_attempts,
            base_delay: config.reply_retry_delay,
        }
    }

    /// Exponential backoff with up to 25% jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.base_delay.saturating_mul(1u32 << attempt.min(16));
        let jitter_cap = (base.as_millis() as u64 / 4).max(1);
        base + Duration::from_millis(fastrand::u64(0..jitter_cap))
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// policy's retries are used up. `attempts` counts retries after the first try.
pub async fn retry<T, E, F, Fut>(
    policy: RetryPolicy,
    is_transient: impl Fn(&E) -> bool,
    mut op: F,
) -> Result<T, E>
where
    E: Debug,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.attempts && is_transient(&e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "🔁 Reintento {} de {} en {:?} tras error: {:?}",
                    attempt + 1,
                    policy.attempts,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// 429 y errores 5xx se reintentan
pub fn is_transient_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}

fn is_transient(error: &serenity::Error) -> bool {
    match error {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
            is_transient_status(response.status_code.as_u16())
        }
        serenity::Error::Http(HttpError::Request(_)) => true,
        _ => false,
    }
}

/// Responds to a slash-command interaction, retrying transient failures.
pub struct InteractionResponder {
    http: Arc<Http>,
    interaction: CommandInteraction,
    retry: RetryPolicy,
}

impl InteractionResponder {
    pub fn new(http: Arc<Http>, interaction: CommandInteraction, retry: RetryPolicy) -> Self {
        Self {
            http,
            interaction,
            retry,
        }
    }
}

#[async_trait]
impl Responder for InteractionResponder {
    async fn send(&self, reply: &Reply) -> Result<()> {
        let (http, interaction) = (&self.http, &self.interaction);

        retry(self.retry, is_transient, move || {
            let response = CreateInteractionResponse::Message(
                CreateInteractionResponseMessage::new()
                    .content(reply.content.clone())
                    .ephemeral(reply.ephemeral),
            );
            interaction.create_response(http, response)
        })
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "No se pudo responder a /{}: {}",
                interaction.data.name,
                e
            )
        })
    }
}
