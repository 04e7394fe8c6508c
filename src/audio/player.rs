use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serenity::model::id::{ChannelId, GuildId};
use songbird::{
    error::JoinError,
    input::{Compose, YoutubeDl},
    tracks::PlayMode,
    Call, Songbird,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use crate::audio::queue::{EnqueuedTrack, GuildQueue, QueueAccessor, QueueLookup};

type Sessions = Arc<DashMap<GuildId, Arc<SongbirdQueue>>>;

/// Songbird-backed queue accessor.
///
/// Songbird owns one `Call` per guild; this keeps one [`SongbirdQueue`]
/// handle per call.
pub struct AudioPlayer {
    manager: Arc<Songbird>,
    http: reqwest::Client,
    queues: Sessions,
}

impl AudioPlayer {
    pub fn new(manager: Arc<Songbird>) -> Self {
        Self {
            manager,
            http: reqwest::Client::new(),
            queues: Arc::new(DashMap::new()),
        }
    }

    /// Tears down the guild's call after the bot was disconnected from voice
    /// without going through `/exit`.
    ///
    /// Safe to call when songbird no longer holds a call for the guild.
    pub async fn release(&self, guild_id: GuildId) -> Result<()> {
        teardown(&self.manager, &self.queues, guild_id).await?;
        info!("🧹 Sesión liberada para guild {}", guild_id);
        Ok(())
    }

    fn forget(&self, guild_id: GuildId) {
        if self.queues.remove(&guild_id).is_some() {
            debug!("🧹 Sesión olvidada para guild {}", guild_id);
        }
    }

    fn session_for(&self, guild_id: GuildId, call: Arc<Mutex<Call>>) -> Arc<SongbirdQueue> {
        let mut entry = self
            .queues
            .entry(guild_id)
            .or_insert_with(|| Arc::new(self.new_session(guild_id, call.clone())));

        // Songbird pudo haber recreado la llamada
        if !Arc::ptr_eq(&entry.call, &call) {
            *entry = Arc::new(self.new_session(guild_id, call));
        }

        entry.clone()
    }

    fn new_session(&self, guild_id: GuildId, call: Arc<Mutex<Call>>) -> SongbirdQueue {
        SongbirdQueue {
            guild_id,
            call,
            manager: self.manager.clone(),
            http: self.http.clone(),
            sessions: self.queues.clone(),
        }
    }
}

#[async_trait]
impl QueueAccessor for AudioPlayer {
    fn get_queue(&self, guild_id: GuildId) -> QueueLookup {
        match self.manager.get(guild_id) {
            Some(call) => QueueLookup::Active(self.session_for(guild_id, call)),
            None => {
                self.forget(guild_id);
                QueueLookup::NoQueue
            }
        }
    }

    async fn create_queue(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn GuildQueue>> {
        let session = self.session_for(guild_id, self.manager.get_or_insert(guild_id));

        if let Err(e) = session.connect(channel_id).await {
            // No dejar una llamada sin conexión registrada
            if let Err(cleanup) = self.release(guild_id).await {
                warn!("⚠️ No se pudo liberar guild {}: {:?}", guild_id, cleanup);
            }
            return Err(e);
        }

        Ok(session)
    }
}

/// Stops the builtin queue, drops the cached handle and removes the call.
async fn teardown(manager: &Songbird, sessions: &Sessions, guild_id: GuildId) -> Result<()> {
    if let Some(call) = manager.get(guild_id) {
        call.lock().await.queue().stop();
    }

    sessions.remove(&guild_id);

    match manager.remove(guild_id).await {
        Ok(()) | Err(JoinError::NoCall) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Handle over a guild's songbird `Call` and its built-in track queue.
pub struct SongbirdQueue {
    guild_id: GuildId,
    call: Arc<Mutex<Call>>,
    manager: Arc<Songbird>,
    http: reqwest::Client,
    sessions: Sessions,
}

#[async_trait]
impl GuildQueue for SongbirdQueue {
    async fn is_paused(&self) -> Result<bool> {
        let current = {
            let call = self.call.lock().await;
            call.queue().current()
        };

        let Some(track) = current else {
            return Ok(false);
        };

        // Una pista ya finalizada no está en pausa
        Ok(track
            .get_info()
            .await
            .map(|info| info.playing == PlayMode::Pause)
            .unwrap_or(false))
    }

    async fn set_paused(&self, paused: bool) -> Result<()> {
        let call = self.call.lock().await;
        if paused {
            call.queue().pause()?;
            info!("⏸️ Reproducción pausada en guild {}", self.guild_id);
        } else {
            call.queue().resume()?;
            info!("▶️ Reproducción reanudada en guild {}", self.guild_id);
        }
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        teardown(&self.manager, &self.sessions, self.guild_id).await?;
        info!("👋 Cola destruida y desconectado en guild {}", self.guild_id);
        Ok(())
    }

    async fn connect(&self, channel_id: ChannelId) -> Result<()> {
        self.manager
            .join(self.guild_id, channel_id)
            .await
            .map_err(|e| anyhow::anyhow!("Error al conectar al canal de voz: {}", e))?;

        info!("🔊 Conectado al canal {} en guild {}", channel_id, self.guild_id);
        Ok(())
    }

    async fn enqueue(&self, query: &str) -> Result<EnqueuedTrack> {
        let mut source = if is_direct_url(query) {
            YoutubeDl::new(self.http.clone(), query.to_string())
        } else {
            YoutubeDl::new_search(self.http.clone(), query.to_string())
        };

        let metadata = match source.aux_metadata().await {
            Ok(metadata) => Some(metadata),
            Err(e) => {
                warn!("⚠️ Sin metadatos para '{}': {:?}", query, e);
                None
            }
        };

        let position = {
            let mut call = self.call.lock().await;
            call.enqueue_input(source.into()).await;
            call.queue().len()
        };

        let title = metadata
            .as_ref()
            .and_then(|m| m.title.clone())
            .unwrap_or_else(|| query.to_string());

        info!("➕ Agregado a la cola de guild {}: {}", self.guild_id, title);

        Ok(EnqueuedTrack {
            title,
            duration: metadata.and_then(|m| m.duration),
            position,
        })
    }
}

/// http(s) URLs load directly, everything else goes through search.
pub fn is_direct_url(query: &str) -> bool {
    Url::parse(query.trim())
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}
