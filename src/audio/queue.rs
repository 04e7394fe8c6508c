use anyhow::Result;
use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId};
use std::{sync::Arc, time::Duration};

/// Track accepted by a guild queue.
#[derive(Debug, Clone, PartialEq)]
pub struct EnqueuedTrack {
    pub title: String,
    pub duration: Option<Duration>,
    /// 1-based position in the queue (1 = playing now)
    pub position: usize,
}

/// Narrow capability over a guild's playback session.
///
/// Handlers only talk to this trait; the songbird adapter lives in
/// [`crate::audio::player`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GuildQueue: Send + Sync {
    async fn is_paused(&self) -> Result<bool>;

    async fn set_paused(&self, paused: bool) -> Result<()>;

    /// Stops playback, leaves the voice channel and forgets the session.
    async fn destroy(&self) -> Result<()>;

    /// Joins `channel_id` with this session's call.
    async fn connect(&self, channel_id: ChannelId) -> Result<()>;

    /// Loads a URL or search query and appends it to the queue.
    async fn enqueue(&self, query: &str) -> Result<EnqueuedTrack>;
}

/// Result of looking up a guild's session.
pub enum QueueLookup {
    Active(Arc<dyn GuildQueue>),
    NoQueue,
}

#[cfg(test)]
impl QueueLookup {
    pub fn is_active(&self) -> bool {
        matches!(self, QueueLookup::Active(_))
    }
}

/// Per-guild registry of playback sessions.
#[async_trait]
pub trait QueueAccessor: Send + Sync {
    fn get_queue(&self, guild_id: GuildId) -> QueueLookup;

    /// Joins `channel_id` and registers a new session for the guild.
    async fn create_queue(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<Arc<dyn GuildQueue>>;
}

/// In-memory sessions for handler and dispatcher tests.
#[cfg(test)]
pub mod memory {
    use super::*;
    use dashmap::DashMap;
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    };

    #[derive(Default, Clone)]
    pub struct MemoryQueues {
        sessions: Arc<DashMap<GuildId, Arc<MemoryQueue>>>,
    }

    impl MemoryQueues {
        pub fn new() -> Self {
            Self::default()
        }

        /// Starts a session as if a track were already playing.
        pub fn start(&self, guild_id: GuildId) -> Arc<MemoryQueue> {
            let queue = Arc::new(MemoryQueue {
                guild_id,
                sessions: self.sessions.clone(),
                paused: AtomicBool::new(false),
                channel: Mutex::new(None),
                tracks: Mutex::new(Vec::new()),
            });
            self.sessions.insert(guild_id, queue.clone());
            queue
        }

        pub fn session(&self, guild_id: GuildId) -> Option<Arc<MemoryQueue>> {
            self.sessions.get(&guild_id).map(|q| q.clone())
        }
    }

    #[async_trait]
    impl QueueAccessor for MemoryQueues {
        fn get_queue(&self, guild_id: GuildId) -> QueueLookup {
            match self.session(guild_id) {
                Some(queue) => QueueLookup::Active(queue),
                None => QueueLookup::NoQueue,
            }
        }

        async fn create_queue(
            &self,
            guild_id: GuildId,
            channel_id: ChannelId,
        ) -> Result<Arc<dyn GuildQueue>> {
            let queue = self.start(guild_id);
            queue.connect(channel_id).await?;
            Ok(queue)
        }
    }

    pub struct MemoryQueue {
        guild_id: GuildId,
        sessions: Arc<DashMap<GuildId, Arc<MemoryQueue>>>,
        paused: AtomicBool,
        channel: Mutex<Option<ChannelId>>,
        tracks: Mutex<Vec<String>>,
    }

    impl MemoryQueue {
        pub fn paused(&self) -> bool {
            self.paused.load(Ordering::SeqCst)
        }

        pub fn channel(&self) -> Option<ChannelId> {
            *self.channel.lock().unwrap()
        }

        pub fn tracks(&self) -> Vec<String> {
            self.tracks.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GuildQueue for MemoryQueue {
        async fn is_paused(&self) -> Result<bool> {
            Ok(self.paused())
        }

        async fn set_paused(&self, paused: bool) -> Result<()> {
            self.paused.store(paused, Ordering::SeqCst);
            Ok(())
        }

        async fn destroy(&self) -> Result<()> {
            self.sessions.remove(&self.guild_id);
            Ok(())
        }

        async fn connect(&self, channel_id: ChannelId) -> Result<()> {
            *self.channel.lock().unwrap() = Some(channel_id);
            Ok(())
        }

        async fn enqueue(&self, query: &str) -> Result<EnqueuedTrack> {
            let mut tracks = self.tracks.lock().unwrap();
            tracks.push(query.to_string());
            Ok(EnqueuedTrack {
                title: query.to_string(),
                duration: None,
                position: tracks.len(),
            })
        }
    }
}
