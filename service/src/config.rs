use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use fanout::{EchoPolicy, FanOutConfig, OverflowPolicy, StaticDirectory};
use log::LevelFilter;
use std::path::PathBuf;

const DEFAULT_QUEUE_CAPACITY: usize = fanout::config::DEFAULT_QUEUE_CAPACITY;
const DEFAULT_DEDUP_WINDOW: usize = fanout::config::DEFAULT_DEDUP_WINDOW;

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Capacity of each live session's delivery queue
    #[arg(long, env, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// What to do when a recipient's delivery queue is full: drop the new
    /// message for that recipient, or disconnect the slow recipient.
    #[arg(
        long,
        env,
        default_value_t = OverflowPolicy::DropNewest,
        value_parser = clap::builder::PossibleValuesParser::new(["drop-newest", "disconnect"])
            .map(|s| s.parse::<OverflowPolicy>().unwrap()),
    )]
    pub overflow_policy: OverflowPolicy,

    /// Whether a message is delivered back to its own sender's live session
    #[arg(
        long,
        env,
        default_value_t = EchoPolicy::SkipSender,
        value_parser = clap::builder::PossibleValuesParser::new(["skip-sender", "include-sender"])
            .map(|s| s.parse::<EchoPolicy>().unwrap()),
    )]
    pub echo_policy: EchoPolicy,

    /// Number of recently fanned-out message ids remembered to suppress
    /// redelivered records (0 disables suppression)
    #[arg(long, env, default_value_t = DEFAULT_DEDUP_WINDOW)]
    pub dedup_window: usize,

    /// Name of the log topic carrying chat messages
    #[arg(long, env, default_value = fanout::MESSAGES_TOPIC)]
    messages_topic: String,

    /// Path to a JSON file mapping user ids to the chats they are joined to
    /// on first connect. Uses the built-in table when not set.
    #[arg(long, env)]
    membership_seed: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn messages_topic(&self) -> &str {
        &self.messages_topic
    }

    /// Delivery settings for the fan-out core.
    pub fn fanout_config(&self) -> FanOutConfig {
        FanOutConfig::default()
            .queue_capacity(self.queue_capacity)
            .overflow_policy(self.overflow_policy)
            .echo_policy(self.echo_policy)
            .dedup_window(self.dedup_window)
    }

    /// The membership bootstrap table: the seed file if one is configured,
    /// otherwise the built-in table.
    pub fn membership_directory(&self) -> Result<StaticDirectory, fanout::Error> {
        match self.membership_seed {
            Some(ref path) => StaticDirectory::from_json_file(path),
            None => Ok(StaticDirectory::reference()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["chat_fanout"]);

        assert_eq!(config.port, 4000);
        assert_eq!(config.interface.as_deref(), Some("127.0.0.1"));
        assert_eq!(config.messages_topic(), "messages");

        let fanout = config.fanout_config();
        assert_eq!(fanout.queue_capacity, 500);
        assert_eq!(fanout.overflow_policy, OverflowPolicy::DropNewest);
        assert_eq!(fanout.echo_policy, EchoPolicy::SkipSender);
        assert_eq!(fanout.dedup_window, 1024);
    }

    #[test]
    fn test_policy_flags() {
        let config = Config::parse_from([
            "chat_fanout",
            "--overflow-policy",
            "disconnect",
            "--echo-policy",
            "include-sender",
            "--queue-capacity",
            "8",
            "--dedup-window",
            "0",
        ]);

        let fanout = config.fanout_config();
        assert_eq!(fanout.overflow_policy, OverflowPolicy::Disconnect);
        assert_eq!(fanout.echo_policy, EchoPolicy::IncludeSender);
        assert_eq!(fanout.queue_capacity, 8);
        assert_eq!(fanout.dedup_window, 0);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result = Config::try_parse_from(["chat_fanout", "--overflow-policy", "drop-oldest"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_directory_defaults_to_reference_table() {
        let config = Config::parse_from(["chat_fanout"]);

        let directory = config.membership_directory().unwrap();

        assert_eq!(directory.user_count(), 2);
        assert_eq!(directory.chats_for("user1").len(), 3);
    }

    #[test]
    fn test_missing_seed_file_is_an_error() {
        let config = Config::parse_from([
            "chat_fanout",
            "--membership-seed",
            "/definitely/not/here.json",
        ]);

        assert!(matches!(
            config.membership_directory(),
            Err(fanout::Error::Input(_))
        ));
    }
}
