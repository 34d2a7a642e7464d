//! Orchestrator configuration
//!
//! Everything the binary wires together is described by one TOML file. Every
//! section is optional; an absent file or section falls back to the stock
//! topology below.
//!
//! ```toml
//! topic = "MicroServiceOrchestratorTopic"
//!
//! [producer]
//! attribute_fields = ["eventType"]
//!
//! [[queues]]
//! name = "QueueA"
//! max_receive_count = 2
//! dead_letter_queue = "DeadLetterQueue"
//!
//! [[queues]]
//! name = "DeadLetterQueue"
//!
//! [[subscriptions]]
//! queue = "QueueA"
//! filter = { eventType = ["typeA"] }
//!
//! [[consumers]]
//! group = "ConsumerA"
//! queue = "QueueA"
//!
//! [runner]
//! batch_size = 10
//! handler_timeout_ms = 30000
//!
//! [alarm]
//! threshold = 1
//! window_ticks = 1
//! tick_interval_ms = 60000
//! ```

use crate::alarm::api::AlarmConfig;
use crate::consumer::api::{RunnerConfig, RunnerError};
use crate::core::error_handling::ContextualError;
use crate::core::validation::{validate_name, validate_positive, ValidationError};
use crate::producer::api::DEFAULT_ATTRIBUTE_FIELDS;
use crate::queue::api::QueueConfig;
use crate::topic::api::FilterPolicy;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TOPIC: &str = "MicroServiceOrchestratorTopic";
pub const DEFAULT_DEAD_LETTER_QUEUE: &str = "DeadLetterQueue";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Failed to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl ContextualError for ConfigError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, ConfigError::Invalid(_))
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            ConfigError::Invalid(e) => Some(e.message()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProducerSettings {
    /// Top-level event fields copied into message attributes
    pub attribute_fields: Vec<String>,
}

impl Default for ProducerSettings {
    fn default() -> Self {
        Self {
            attribute_fields: DEFAULT_ATTRIBUTE_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionSettings {
    pub queue: String,
    #[serde(default)]
    pub filter: Option<FilterPolicy>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsumerSettings {
    pub group: String,
    pub queue: String,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub handler_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    pub topic: String,
    pub producer: ProducerSettings,
    pub queues: Vec<QueueConfig>,
    pub subscriptions: Vec<SubscriptionSettings>,
    pub consumers: Vec<ConsumerSettings>,
    /// Defaults for every consumer; per-consumer fields override them
    pub runner: RunnerConfig,
    pub alarm: AlarmConfig,
}

impl Default for OrchestratorConfig {
    /// Three filtered queues, one consumer each; only QueueA dead-letters
    fn default() -> Self {
        let queues = vec![
            QueueConfig::new("QueueA")
                .with_max_receive_count(2)
                .with_dead_letter_queue(DEFAULT_DEAD_LETTER_QUEUE),
            QueueConfig::new("QueueB"),
            QueueConfig::new("QueueC"),
            QueueConfig::new(DEFAULT_DEAD_LETTER_QUEUE),
        ];
        let subscriptions = [("QueueA", "typeA"), ("QueueB", "typeB"), ("QueueC", "typeC")]
            .into_iter()
            .map(|(queue, event_type)| SubscriptionSettings {
                queue: queue.to_string(),
                filter: Some(FilterPolicy::new().allow("eventType", [event_type])),
            })
            .collect();
        let consumers = [("ConsumerA", "QueueA"), ("ConsumerB", "QueueB"), ("ConsumerC", "QueueC")]
            .into_iter()
            .map(|(group, queue)| ConsumerSettings {
                group: group.to_string(),
                queue: queue.to_string(),
                batch_size: None,
                handler_timeout_ms: None,
            })
            .collect();

        Self {
            topic: DEFAULT_TOPIC.to_string(),
            producer: ProducerSettings::default(),
            queues,
            subscriptions,
            consumers,
            runner: RunnerConfig::default(),
            alarm: AlarmConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Location used when no `--config-file` is given
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("Orchestrator").join("orchestrator.toml"))
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load and validate the configuration
    ///
    /// An explicit path must exist. Without one, the default location is
    /// used if present and the built-in topology otherwise. Returns the file
    /// actually read alongside the configuration.
    pub async fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                Some(path.to_path_buf())
            }
            None => Self::default_path().filter(|path| path.exists()),
        };

        let config = match &path {
            Some(path) => {
                log::debug!("Loading configuration from {}", path.display());
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ConfigError::Read {
                        path: path.clone(),
                        source,
                    })?;
                Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
                    path: path.clone(),
                    source,
                })?
            }
            None => {
                log::debug!("No configuration file found; using built-in defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok((config, path))
    }

    /// Runner settings for one consumer, with its overrides applied
    pub fn runner_config_for(&self, consumer: &ConsumerSettings) -> RunnerConfig {
        let mut config = self.runner.clone();
        if let Some(batch_size) = consumer.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(timeout_ms) = consumer.handler_timeout_ms {
            config.handler_timeout = Duration::from_millis(timeout_ms);
        }
        config
    }

    /// Queues other queues redirect exhausted messages to
    pub fn dead_letter_queue_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .queues
            .iter()
            .filter_map(|queue| queue.dead_letter_queue.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        names.sort();
        names
    }

    /// Check numeric bounds and every cross-reference between sections
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_name("topic", &self.topic)?;
        for field in &self.producer.attribute_fields {
            validate_name("producer.attribute_fields", field)?;
        }

        let mut queues: HashMap<&str, &QueueConfig> = HashMap::new();
        for queue in &self.queues {
            queue.validate()?;
            if queues.insert(queue.name.as_str(), queue).is_some() {
                return Err(ValidationError::new(format!(
                    "Queue '{}' is defined more than once",
                    queue.name
                )));
            }
        }
        for queue in &self.queues {
            if let Some(target) = &queue.dead_letter_queue {
                if !queues.contains_key(target.as_str()) {
                    return Err(ValidationError::new(format!(
                        "Queue '{}' names unknown dead-letter queue '{}'",
                        queue.name, target
                    )));
                }
            }
        }

        for subscription in &self.subscriptions {
            if !queues.contains_key(subscription.queue.as_str()) {
                return Err(ValidationError::new(format!(
                    "Subscription targets unknown queue '{}'",
                    subscription.queue
                )));
            }
            if let Some(filter) = &subscription.filter {
                filter.validate().map_err(|e| {
                    ValidationError::new(format!(
                        "Invalid filter for queue '{}': {}",
                        subscription.queue, e
                    ))
                })?;
            }
        }

        self.runner.validate().map_err(|e| match e {
            RunnerError::InvalidConfiguration { message } => ValidationError::new(message),
            other => ValidationError::new(other.to_string()),
        })?;

        let mut groups = HashSet::new();
        let mut consumed = HashSet::new();
        for consumer in &self.consumers {
            validate_name("consumers.group", &consumer.group)?;
            let Some(queue) = queues.get(consumer.queue.as_str()) else {
                return Err(ValidationError::new(format!(
                    "Consumer '{}' reads unknown queue '{}'",
                    consumer.group, consumer.queue
                )));
            };
            if !groups.insert(consumer.group.as_str()) {
                return Err(ValidationError::new(format!(
                    "Consumer group '{}' is defined more than once",
                    consumer.group
                )));
            }
            if !consumed.insert(consumer.queue.as_str()) {
                return Err(ValidationError::new(format!(
                    "Queue '{}' has more than one consumer",
                    consumer.queue
                )));
            }
            if let Some(batch_size) = consumer.batch_size {
                validate_positive(&format!("consumers.{}.batch_size", consumer.group), batch_size)?;
            }
            if let Some(timeout_ms) = consumer.handler_timeout_ms {
                validate_positive(
                    &format!("consumers.{}.handler_timeout_ms", consumer.group),
                    timeout_ms,
                )?;
            }

            let timeout = self.runner_config_for(consumer).handler_timeout;
            if timeout > queue.visibility_timeout {
                log::warn!(
                    "Consumer '{}' handler timeout {:?} exceeds the visibility timeout {:?} of queue '{}'; slow messages may be redelivered while still processing",
                    consumer.group,
                    timeout,
                    queue.visibility_timeout,
                    queue.name
                );
            }
        }

        self.alarm.validate()?;
        Ok(())
    }
}
