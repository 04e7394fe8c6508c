use futures::FutureExt;
use serenity::model::id::{ChannelId, GuildId, UserId};
use std::{collections::HashMap, panic::AssertUnwindSafe, sync::Arc};
use tracing::{debug, error, warn};

use crate::{
    audio::queue::QueueAccessor,
    bot::{
        commands::{CommandContext, CommandRegistry},
        reply::{Reply, Responder},
    },
    error::DispatchError,
};

/// One inbound slash-command invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: String,
    pub guild_id: Option<GuildId>,
    pub user_id: UserId,
    /// Canal de voz del usuario al momento de invocar
    pub voice_channel: Option<ChannelId>,
    pub options: HashMap<String, String>,
}

#[derive(Debug)]
pub enum Outcome {
    Completed,
    /// Already logged and answered with a failure reply.
    Failed(DispatchError),
}

/// Routes invocations to registered handlers.
///
/// Every invocation gets exactly one reply; handler errors and panics stop
/// here.
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    queues: Arc<dyn QueueAccessor>,
}

impl Dispatcher {
    pub fn new(registry: Arc<CommandRegistry>, queues: Arc<dyn QueueAccessor>) -> Self {
        Self { registry, queues }
    }

    pub async fn dispatch(&self, invocation: &Invocation, responder: &dyn Responder) -> Outcome {
        let (reply, outcome) = match self.run(invocation).await {
            Ok(reply) => (reply, Outcome::Completed),
            Err(err) => {
                report(&err);
                (Reply::ephemeral(err.user_message()), Outcome::Failed(err))
            }
        };

        if let Err(e) = responder.send(&reply).await {
            error!(
                "📭 No se pudo responder a /{} en guild {:?}: {:?}",
                invocation.command, invocation.guild_id, e
            );
        }

        outcome
    }

    async fn run(&self, invocation: &Invocation) -> Result<Reply, DispatchError> {
        let command = self
            .registry
            .get(&invocation.command)
            .ok_or_else(|| DispatchError::UnregisteredCommand(invocation.command.clone()))?;

        let guild_id = invocation.guild_id.ok_or_else(|| DispatchError::GuildOnly {
            command: invocation.command.clone(),
        })?;

        let ctx = CommandContext {
            guild_id,
            user_id: invocation.user_id,
            voice_channel: invocation.voice_channel,
            options: &invocation.options,
            queues: self.queues.as_ref(),
        };

        debug!("▶️ Ejecutando /{} en guild {}", command.name, guild_id);

        let result = AssertUnwindSafe(command.handler.execute(&ctx))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(anyhow::anyhow!("El handler entró en pánico")));

        result.map_err(|source| DispatchError::HandlerFault {
            command: invocation.command.clone(),
            guild_id,
            source,
        })
    }
}

fn report(err: &DispatchError) {
    match err {
        DispatchError::UnregisteredCommand(name) => {
            error!("⚙️ Error de configuración: /{} no está registrado", name);
        }
        DispatchError::GuildOnly { command } => {
            warn!("🚫 /{} usado fuera de un servidor", command);
        }
        DispatchError::HandlerFault {
            command,
            guild_id,
            source,
        } => {
            error!(
                "❌ Error en /{} (guild {}): {:?}",
                command, guild_id, source
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        audio::queue::{memory::MemoryQueues, GuildQueue, MockGuildQueue, QueueLookup},
        bot::{
            commands::{Command, CommandHandler},
            reply::{messages, MockResponder},
        },
    };
    use anyhow::Result;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    fn guild() -> GuildId {
        GuildId::new(42)
    }

    fn invocation(command: &str, guild_id: Option<GuildId>) -> Invocation {
        Invocation {
            command: command.to_string(),
            guild_id,
            user_id: UserId::new(7),
            voice_channel: None,
            options: HashMap::new(),
        }
    }

    fn expect_reply(responder: &mut MockResponder, expected: Reply) {
        responder
            .expect_send()
            .withf(move |reply| *reply == expected)
            .times(1)
            .returning(|_| Ok(()));
    }

    /// Accessor that always hands out the same queue.
    struct Fixed(Arc<dyn GuildQueue>);

    #[async_trait]
    impl QueueAccessor for Fixed {
        fn get_queue(&self, _guild_id: GuildId) -> QueueLookup {
            QueueLookup::Active(self.0.clone())
        }

        async fn create_queue(
            &self,
            _guild_id: GuildId,
            _channel_id: ChannelId,
        ) -> Result<Arc<dyn GuildQueue>> {
            Ok(self.0.clone())
        }
    }

    struct Panics;

    #[async_trait]
    impl CommandHandler for Panics {
        async fn execute(&self, _ctx: &CommandContext<'_>) -> Result<Reply> {
            panic!("boom");
        }
    }

    fn standard(queues: Arc<dyn QueueAccessor>) -> Dispatcher {
        Dispatcher::new(Arc::new(CommandRegistry::standard().unwrap()), queues)
    }

    #[tokio::test]
    async fn test_pause_roundtrip() {
        let queues = MemoryQueues::new();
        let session = queues.start(guild());
        let dispatcher = standard(Arc::new(queues.clone()));

        let mut responder = MockResponder::new();
        expect_reply(&mut responder, Reply::public(messages::PAUSED));

        let outcome = dispatcher
            .dispatch(&invocation("pause", Some(guild())), &responder)
            .await;

        assert!(matches!(outcome, Outcome::Completed));
        assert!(session.paused());
    }

    #[tokio::test]
    async fn test_unregistered_command_replies_generic_failure() {
        let dispatcher = standard(Arc::new(MemoryQueues::new()));

        let mut responder = MockResponder::new();
        expect_reply(&mut responder, Reply::ephemeral(messages::GENERIC_FAILURE));

        let outcome = dispatcher
            .dispatch(&invocation("skip", Some(guild())), &responder)
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed(DispatchError::UnregisteredCommand(ref name)) if name == "skip"
        ));
    }

    #[tokio::test]
    async fn test_guild_only() {
        let dispatcher = standard(Arc::new(MemoryQueues::new()));

        let mut responder = MockResponder::new();
        expect_reply(&mut responder, Reply::ephemeral(messages::GUILD_ONLY));

        let outcome = dispatcher
            .dispatch(&invocation("pause", None), &responder)
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed(DispatchError::GuildOnly { .. })
        ));
    }

    #[tokio::test]
    async fn test_handler_fault_is_contained() {
        let mut queue = MockGuildQueue::new();
        queue
            .expect_is_paused()
            .times(2)
            .returning(|| Err(anyhow::anyhow!("player caído")));
        let dispatcher = standard(Arc::new(Fixed(Arc::new(queue))));

        // Una respuesta genérica por invocación, y el dispatcher sigue sirviendo
        for command in ["pause", "resume"] {
            let mut responder = MockResponder::new();
            expect_reply(&mut responder, Reply::ephemeral(messages::GENERIC_FAILURE));

            let outcome = dispatcher
                .dispatch(&invocation(command, Some(guild())), &responder)
                .await;

            match outcome {
                Outcome::Failed(DispatchError::HandlerFault {
                    command: name,
                    guild_id,
                    ..
                }) => {
                    assert_eq!(name, command);
                    assert_eq!(guild_id, guild());
                }
                other => panic!("unexpected outcome: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let registry = CommandRegistry::new(vec![Command::new("boom", "explota", Panics)]).unwrap();
        let dispatcher = Dispatcher::new(Arc::new(registry), Arc::new(MemoryQueues::new()));

        let mut responder = MockResponder::new();
        expect_reply(&mut responder, Reply::ephemeral(messages::GENERIC_FAILURE));

        let outcome = dispatcher
            .dispatch(&invocation("boom", Some(guild())), &responder)
            .await;

        assert!(matches!(
            outcome,
            Outcome::Failed(DispatchError::HandlerFault { .. })
        ));
    }

    #[tokio::test]
    async fn test_reply_failure_does_not_escape() {
        let dispatcher = standard(Arc::new(MemoryQueues::new()));

        let mut responder = MockResponder::new();
        responder
            .expect_send()
            .times(1)
            .returning(|_| Err(anyhow::anyhow!("429")));

        let outcome = dispatcher
            .dispatch(&invocation("resume", Some(guild())), &responder)
            .await;

        assert!(matches!(outcome, Outcome::Completed));
    }
}
