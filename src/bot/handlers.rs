use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    audio::queue::QueueLookup,
    bot::{
        commands::{Command, CommandContext, CommandHandler},
        reply::{messages, Reply},
    },
};

pub fn play_command() -> Command {
    Command::new("play", "Reproduce una canción o la agrega a la cola", Play).string_option(
        "query",
        "URL o término de búsqueda",
        true,
    )
}

pub fn pause_command() -> Command {
    Command::new("pause", "Pausa la reproducción actual", Pause)
}

pub fn resume_command() -> Command {
    Command::new("resume", "Reanuda la reproducción pausada", Resume)
}

pub fn exit_command() -> Command {
    Command::new("exit", "Detiene la música y sale del canal de voz", Exit)
}

pub struct Pause;

#[async_trait]
impl CommandHandler for Pause {
    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Reply> {
        let QueueLookup::Active(queue) = ctx.queues.get_queue(ctx.guild_id) else {
            return Ok(Reply::ephemeral(messages::NOTHING_PLAYING));
        };

        if queue.is_paused().await? {
            debug!("⏸️ Guild {} ya estaba en pausa", ctx.guild_id);
        } else {
            queue.set_paused(true).await?;
        }

        Ok(Reply::public(messages::PAUSED))
    }
}

pub struct Resume;

#[async_trait]
impl CommandHandler for Resume {
    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Reply> {
        let QueueLookup::Active(queue) = ctx.queues.get_queue(ctx.guild_id) else {
            return Ok(Reply::ephemeral(messages::NOTHING_PLAYING));
        };

        if queue.is_paused().await? {
            queue.set_paused(false).await?;
        } else {
            debug!("▶️ Guild {} no estaba en pausa", ctx.guild_id);
        }

        Ok(Reply::public(messages::RESUMED))
    }
}

pub struct Exit;

#[async_trait]
impl CommandHandler for Exit {
    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Reply> {
        let QueueLookup::Active(queue) = ctx.queues.get_queue(ctx.guild_id) else {
            return Ok(Reply::ephemeral(messages::NOTHING_PLAYING));
        };

        queue.destroy().await?;
        Ok(Reply::public(messages::EXITED))
    }
}

pub struct Play;

#[async_trait]
impl CommandHandler for Play {
    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Reply> {
        let Some(query) = ctx
            .option("query")
            .map(str::trim)
            .filter(|q| !q.is_empty())
        else {
            return Ok(Reply::ephemeral(messages::MISSING_QUERY));
        };

        let Some(channel_id) = ctx.voice_channel else {
            return Ok(Reply::ephemeral(messages::NOT_IN_VOICE));
        };

        let queue = match ctx.queues.get_queue(ctx.guild_id) {
            QueueLookup::Active(queue) => queue,
            QueueLookup::NoQueue => {
                info!(
                    "🆕 Creando cola para guild {} (pedido por {})",
                    ctx.guild_id, ctx.user_id
                );
                ctx.queues.create_queue(ctx.guild_id, channel_id).await?
            }
        };

        let track = queue.enqueue(query).await?;

        let duration = track
            .duration
            .map(|d| format!(" ({})", format_duration(d)))
            .unwrap_or_default();

        let content = if track.position <= 1 {
            format!("🎵 Reproduciendo: **{}**{}", track.title, duration)
        } else {
            format!(
                "➕ Agregado a la cola: **{}**{} en la posición {}",
                track.title, duration, track.position
            )
        };

        Ok(Reply::public(content))
    }
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
