use serenity::model::id::GuildId;
use thiserror::Error;

use crate::bot::reply::messages;

/// Failures caught at the dispatcher boundary.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Comando no registrado: /{0}")]
    UnregisteredCommand(String),

    #[error("Comando /{command} usado fuera de un servidor")]
    GuildOnly { command: String },

    #[error("Fallo en /{command} (guild {guild_id}): {source:#}")]
    HandlerFault {
        command: String,
        guild_id: GuildId,
        source: anyhow::Error,
    },
}

impl DispatchError {
    /// Mensaje visible para el usuario
    pub fn user_message(&self) -> &'static str {
        match self {
            DispatchError::GuildOnly { .. } => messages::GUILD_ONLY,
            DispatchError::UnregisteredCommand(_) | DispatchError::HandlerFault { .. } => {
                messages::GENERIC_FAILURE
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Comando duplicado en el registro: /{0}")]
    Duplicate(&'static str),
}
