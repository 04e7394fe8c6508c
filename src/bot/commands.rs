use anyhow::Result;
use async_trait::async_trait;
use serenity::{
    builder::{CreateCommand, CreateCommandOption},
    model::{
        application::CommandOptionType,
        id::{ChannelId, GuildId, UserId},
    },
    prelude::Context,
};
use std::collections::{BTreeMap, HashMap};

use crate::{audio::queue::QueueAccessor, bot::reply::Reply, error::RegistryError};

/// Everything a handler gets to see about one invocation.
pub struct CommandContext<'a> {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub voice_channel: Option<ChannelId>,
    pub options: &'a HashMap<String, String>,
    pub queues: &'a dyn QueueAccessor,
}

impl CommandContext<'_> {
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn execute(&self, ctx: &CommandContext<'_>) -> Result<Reply>;
}

#[derive(Debug, Clone, Copy)]
pub struct OptionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

pub struct Command {
    pub name: &'static str,
    pub description: &'static str,
    pub options: Vec<OptionSpec>,
    pub handler: Box<dyn CommandHandler>,
}

impl Command {
    pub fn new(
        name: &'static str,
        description: &'static str,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        Self {
            name,
            description,
            options: Vec::new(),
            handler: Box::new(handler),
        }
    }

    pub fn string_option(
        mut self,
        name: &'static str,
        description: &'static str,
        required: bool,
    ) -> Self {
        self.options.push(OptionSpec {
            name,
            description,
            required,
        });
        self
    }

    /// Definición del slash command para Discord
    pub fn definition(&self) -> CreateCommand {
        self.options.iter().fold(
            CreateCommand::new(self.name).description(self.description),
            |command, option| {
                command.add_option(
                    CreateCommandOption::new(
                        CommandOptionType::String,
                        option.name,
                        option.description,
                    )
                    .required(option.required),
                )
            },
        )
    }
}

/// Immutable name -> command table, built once at startup.
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Command>,
}

impl CommandRegistry {
    pub fn new(commands: Vec<Command>) -> Result<Self, RegistryError> {
        let mut table = BTreeMap::new();
        for command in commands {
            let name = command.name;
            if table.insert(name, command).is_some() {
                return Err(RegistryError::Duplicate(name));
            }
        }

        Ok(Self { commands: table })
    }

    /// play, pause, resume, exit
    pub fn standard() -> Result<Self, RegistryError> {
        use crate::bot::handlers;

        Self::new(vec![
            handlers::play_command(),
            handlers::pause_command(),
            handlers::resume_command(),
            handlers::exit_command(),
        ])
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    pub fn definitions(&self) -> Vec<CreateCommand> {
        self.commands.values().map(Command::definition).collect()
    }
}

/// Registra comandos globales
pub async fn register_global_commands(ctx: &Context, registry: &CommandRegistry) -> Result<()> {
    for command in registry.definitions() {
        ctx.http.create_global_command(&command).await?;
    }

    Ok(())
}

/// Registra comandos para una guild específica (desarrollo)
pub async fn register_guild_commands(
    ctx: &Context,
    guild_id: GuildId,
    registry: &CommandRegistry,
) -> Result<()> {
    guild_id
        .set_commands(&ctx.http, registry.definitions())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Silent;

    #[async_trait]
    impl CommandHandler for Silent {
        async fn execute(&self, _ctx: &CommandContext<'_>) -> Result<Reply> {
            Ok(Reply::public("ok"))
        }
    }

    #[test]
    fn test_standard_registry() {
        let registry = CommandRegistry::standard().unwrap();

        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["exit", "pause", "play", "resume"]
        );
        assert_eq!(registry.definitions().len(), registry.names().count());
        assert!(registry.get("pause").is_some());
        assert!(registry.get("skip").is_none());
    }

    #[test]
    fn test_play_has_required_query() {
        let registry = CommandRegistry::standard().unwrap();
        let play = registry.get("play").unwrap();

        assert_eq!(play.options.len(), 1);
        assert_eq!(play.options[0].name, "query");
        assert!(play.options[0].required);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = CommandRegistry::new(vec![
            Command::new("pause", "a", Silent),
            Command::new("pause", "b", Silent),
        ]);

        assert!(matches!(result, Err(RegistryError::Duplicate("pause"))));
    }
}
