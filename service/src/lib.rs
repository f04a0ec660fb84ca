use config::Config;
use fanout::{
    ConnectionRegistry, FanOutEngine, InMemoryLog, InMemoryMembership, LogAppender,
    MembershipResolver, SubscriptionService,
};
use log::info;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod config;
pub mod logging;

/// Build the fan-out core described by `config`.
///
/// Returns the shared state handed to the HTTP layer together with the
/// engine, which the caller spawns. The engine stops once every
/// [`LogAppender`] clone (including the one in the state) is dropped.
pub fn init_fanout(config: Config) -> Result<(AppState, FanOutEngine<InMemoryLog>), fanout::Error> {
    let fanout_config = config.fanout_config();
    info!(
        "Fan-out config: topic={}, queue_capacity={}, overflow_policy={}, \
         echo_policy={}, dedup_window={}",
        config.messages_topic(),
        fanout_config.queue_capacity,
        fanout_config.overflow_policy,
        fanout_config.echo_policy,
        fanout_config.dedup_window,
    );

    let directory = config.membership_directory()?;
    info!("Membership directory lists {} users", directory.user_count());

    let registry = Arc::new(ConnectionRegistry::new());
    let membership: Arc<dyn MembershipResolver> =
        Arc::new(InMemoryMembership::with_directory(directory));
    let (appender, log) = fanout::in_memory(config.messages_topic());

    let engine = FanOutEngine::new(
        log,
        Arc::clone(&registry),
        Arc::clone(&membership),
        fanout_config,
    );

    Ok((AppState::new(config, registry, membership, appender), engine))
}

// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub registry: Arc<ConnectionRegistry>,
    pub membership: Arc<dyn MembershipResolver>,
    pub subscriptions: SubscriptionService,
    pub log_appender: LogAppender,
    /// Cancelled once the process begins shutting down; live sessions are
    /// derived from it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        app_config: Config,
        registry: Arc<ConnectionRegistry>,
        membership: Arc<dyn MembershipResolver>,
        log_appender: LogAppender,
    ) -> Self {
        let subscriptions = SubscriptionService::new(
            Arc::clone(&registry),
            Arc::clone(&membership),
            &app_config.fanout_config(),
        );

        Self {
            config: app_config,
            registry,
            membership,
            subscriptions,
            log_appender,
            shutdown: CancellationToken::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use fanout::Draft;

    #[tokio::test]
    async fn test_init_fanout_wires_engine_to_state() {
        let config = Config::parse_from(["chat_fanout"]);
        let (state, engine) = init_fanout(config).unwrap();
        let position = state.log_appender.commit_position();

        state.membership.add_participant("c1", "u1").await.unwrap();
        let message = Draft {
            chat_id: "c1".to_string(),
            sender_id: "u1".to_string(),
            text: "hello".to_string(),
        }
        .into_message();
        state.log_appender.append_message(&message).unwrap();

        let handle = tokio::spawn(engine.run());
        drop(state);
        handle.await.unwrap();

        assert_eq!(position.get(), 1);
    }

    #[test]
    fn test_init_fanout_rejects_missing_seed() {
        let config = Config::parse_from([
            "chat_fanout",
            "--membership-seed",
            "/definitely/not/here.json",
        ]);

        assert!(init_fanout(config).is_err());
    }
}
