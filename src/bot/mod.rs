//! # Bot Module
//!
//! Discord side of the bot: command registration, interaction routing and
//! voice-state cleanup.
//!
//! ## Architecture
//!
//! [`JukeboxBot`] implements Serenity's [`EventHandler`] trait. It owns:
//!
//! - The immutable [`commands::CommandRegistry`]
//! - A [`dispatch::Dispatcher`] bound to the songbird [`AudioPlayer`]
//! - The reply retry policy from [`Config`]
//!
//! Each interaction becomes an [`dispatch::Invocation`] and gets exactly one
//! reply through a [`reply::InteractionResponder`].

use anyhow::Result;
use serenity::{
    all::{ChannelId, CommandInteraction, Context, EventHandler, GuildId, Interaction, Ready, UserId, VoiceState},
    async_trait,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, error, info, warn};

pub mod commands;
pub mod dispatch;
pub mod handlers;
pub mod reply;

use crate::{audio::player::AudioPlayer, config::Config};
use commands::CommandRegistry;
use dispatch::{Dispatcher, Invocation, Outcome};
use reply::{InteractionResponder, RetryPolicy};

/// Main Discord event handler.
pub struct JukeboxBot {
    /// Bot configuration loaded from environment variables
    config: Arc<Config>,
    registry: Arc<CommandRegistry>,
    dispatcher: Dispatcher,
    /// Songbird-backed queue accessor, also used for voice cleanup
    player: Arc<AudioPlayer>,
}

impl JukeboxBot {
    pub fn new(config: Config, registry: CommandRegistry, player: Arc<AudioPlayer>) -> Self {
        let registry = Arc::new(registry);
        let dispatcher = Dispatcher::new(registry.clone(), player.clone());

        Self {
            config: Arc::new(config),
            registry,
            dispatcher,
            player,
        }
    }

    /// Registers slash commands with Discord.
    ///
    /// Guild commands (when `GUILD_ID` is set) propagate in about a second;
    /// global commands can take up to an hour.
    async fn register_commands(&self, ctx: &Context) -> Result<()> {
        info!(
            "📝 Registrando comandos slash: {}",
            self.registry.names().collect::<Vec<_>>().join(", ")
        );

        match self.config.guild_id {
            Some(guild_id) => {
                let guild_id = GuildId::new(guild_id);

                // Verificar que el bot esté en la guild
                if !ctx.cache.guilds().contains(&guild_id) {
                    warn!("⚠️ El bot no está en la guild especificada: {}", guild_id);
                    return Ok(());
                }

                commands::register_guild_commands(ctx, guild_id, &self.registry)
                    .await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos de guild: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos de guild. Verifica que el bot tenga permisos de 'applications.commands' en la guild.")
                    })?;
                info!("✅ Comandos de guild registrados para: {}", guild_id);
            }
            None => {
                commands::register_global_commands(ctx, &self.registry)
                    .await
                    .map_err(|e| {
                        error!("❌ Error registrando comandos globales: {:?}", e);
                        anyhow::anyhow!("No se pudieron registrar comandos globales. Verifica que el bot tenga permisos de 'applications.commands'.")
                    })?;
                info!("✅ Comandos globales registrados");
            }
        }

        Ok(())
    }

    fn invocation(ctx: &Context, command: &CommandInteraction) -> Invocation {
        let options = command
            .data
            .options
            .iter()
            .filter_map(|opt| {
                opt.value
                    .as_str()
                    .map(|value| (opt.name.clone(), value.to_string()))
            })
            .collect::<HashMap<_, _>>();

        let voice_channel = command
            .guild_id
            .and_then(|guild_id| user_voice_channel(ctx, guild_id, command.user.id));

        Invocation {
            command: command.data.name.clone(),
            guild_id: command.guild_id,
            user_id: command.user.id,
            voice_channel,
            options,
        }
    }
}

#[async_trait]
impl EventHandler for JukeboxBot {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🤖 {} está en línea!", ready.user.name);
        info!("📊 Conectado a {} servidores", ready.guilds.len());

        if let Err(e) = self.register_commands(&ctx).await {
            error!("Error al registrar comandos: {:?}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Command(command) = interaction else {
            return;
        };

        info!(
            "📝 Comando /{} usado por {} en guild {:?}",
            command.data.name, command.user.name, command.guild_id
        );

        let invocation = Self::invocation(&ctx, &command);
        let responder = InteractionResponder::new(
            ctx.http.clone(),
            command,
            RetryPolicy::from_config(&self.config),
        );

        if let Outcome::Failed(e) = self.dispatcher.dispatch(&invocation, &responder).await {
            debug!("Invocación /{} terminó con error: {}", invocation.command, e);
        }
    }

    /// Releases the guild's call when the bot is disconnected from voice.
    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let current_user_id = ctx.cache.current_user().id;
        if new.user_id != current_user_id || old.is_none() || new.channel_id.is_some() {
            return;
        }

        if let Some(guild_id) = new.guild_id {
            info!("🔌 Bot desconectado en guild {}", guild_id);
            if let Err(e) = self.player.release(guild_id).await {
                error!("❌ Error liberando la sesión de guild {}: {:?}", guild_id, e);
            }
        }
    }
}

/// Canal de voz actual del usuario según la caché
fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    let guild = guild_id.to_guild_cached(&ctx.cache)?;
    guild
        .voice_states
        .get(&user_id)
        .and_then(|voice_state| voice_state.channel_id)
}
