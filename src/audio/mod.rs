//! # Audio Module
//!
//! Per-guild playback sessions for the bot.
//!
//! Audio decoding, streaming and the track queue itself belong to songbird.
//! This module only exposes the pieces the command handlers need:
//!
//! ### [`queue`] - Queue Capability
//! - [`queue::GuildQueue`]: pause flag, destroy, connect, enqueue
//! - [`queue::QueueLookup`]: `Active` or `NoQueue`
//! - [`queue::QueueAccessor`]: lookup and creation by guild id
//!
//! ### [`player`] - Songbird Adapter
//! - [`player::AudioPlayer`] implements the accessor over a `Songbird` manager
//! - One cached handle per guild `Call`
//!
//! ## Example Usage
//!
//! ```text
//! let guild_id = GuildId::new(123456789);
//!
//! if let QueueLookup::Active(queue) = player.get_queue(guild_id) {
//!     queue.set_paused(true).await?;
//! }
//! ```
//!
//! On a voice disconnect outside `/exit`, [`player::AudioPlayer::release`]
//! stops the queue and removes the guild's call from songbird.

pub mod player;
pub mod queue;
