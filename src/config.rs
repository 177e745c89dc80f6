//! Configuration for framed client connections.

/// Default maximum size of one outbound chunk (4 KB).
pub const DEFAULT_SEND_CHUNK_SIZE: usize = 4 * 1024;

/// Default size of the reusable receive buffer (12 KB).
pub const DEFAULT_RECEIVE_CHUNK_SIZE: usize = 12 * 1024;

/// Default cap on a reassembled inbound message (64 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024 * 1024;

/// What the receive loop does when an observer returns an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ObserverFailurePolicy {
    /// The first observer error terminates the receive loop.
    ///
    /// Subscriber defects then show up as connection loss.
    #[default]
    Propagate,
    /// Observer errors are logged and the loop keeps running.
    Isolate,
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Maximum size of one outbound chunk in bytes.
    ///
    /// Payloads larger than this are split; only the last chunk is final.
    ///
    /// Default: 4 KB
    pub send_chunk_size: usize,

    /// Size of the reusable buffer handed to each transport receive.
    ///
    /// Default: 12 KB
    pub receive_chunk_size: usize,

    /// Maximum size of a reassembled inbound message.
    ///
    /// This is a hardening limit on top of plain reassembly: a message that
    /// grows past it ends the receive loop with
    /// [`Error::MessageTooLarge`](crate::Error::MessageTooLarge) instead of
    /// being accumulated up to its final chunk. Set it to `usize::MAX` for
    /// unbounded reassembly.
    ///
    /// Default: 64 MB
    pub max_message_size: usize,

    /// Description sent with the graceful close on disconnect.
    ///
    /// Default: empty
    pub close_reason: String,

    /// Observer failure handling in the receive loop.
    ///
    /// Default: [`ObserverFailurePolicy::Propagate`]
    pub observer_failure_policy: ObserverFailurePolicy,

    /// Request headers passed to the transport when connecting.
    pub headers: Vec<(String, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            send_chunk_size: DEFAULT_SEND_CHUNK_SIZE,
            receive_chunk_size: DEFAULT_RECEIVE_CHUNK_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            close_reason: String::new(),
            observer_failure_policy: ObserverFailurePolicy::default(),
            headers: Vec::new(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the outbound chunk size. Zero is clamped to 1.
    #[must_use]
    pub const fn with_send_chunk_size(mut self, size: usize) -> Self {
        self.send_chunk_size = if size == 0 { 1 } else { size };
        self
    }

    /// Set the receive buffer size. Zero is clamped to 1.
    #[must_use]
    pub const fn with_receive_chunk_size(mut self, size: usize) -> Self {
        self.receive_chunk_size = if size == 0 { 1 } else { size };
        self
    }

    /// Set the maximum reassembled message size. `usize::MAX` disables the limit.
    #[must_use]
    pub const fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// Set the description sent with the graceful close.
    #[must_use]
    pub fn with_close_reason(mut self, reason: impl Into<String>) -> Self {
        self.close_reason = reason.into();
        self
    }

    /// Set the observer failure policy.
    #[must_use]
    pub const fn with_observer_failure_policy(mut self, policy: ObserverFailurePolicy) -> Self {
        self.observer_failure_policy = policy;
        self
    }

    /// Add a request header.
    #[must_use]
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(key, value);
        self
    }

    /// Add or replace a request header. Keys compare case-insensitively.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&key))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.send_chunk_size, 4096);
        assert_eq!(config.receive_chunk_size, 12 * 1024);
        assert_eq!(config.max_message_size, 64 * 1024 * 1024);
        assert_eq!(config.observer_failure_policy, ObserverFailurePolicy::Propagate);
        assert!(config.headers.is_empty());
        assert!(config.close_reason.is_empty());
    }

    #[test]
    fn test_config_builder() {
        let config = Config::new()
            .with_send_chunk_size(16)
            .with_receive_chunk_size(32)
            .with_max_message_size(1024)
            .with_close_reason("shutting down")
            .with_observer_failure_policy(ObserverFailurePolicy::Isolate);

        assert_eq!(config.send_chunk_size, 16);
        assert_eq!(config.receive_chunk_size, 32);
        assert_eq!(config.max_message_size, 1024);
        assert_eq!(config.close_reason, "shutting down");
        assert_eq!(config.observer_failure_policy, ObserverFailurePolicy::Isolate);
    }

    #[test]
    fn test_zero_chunk_sizes_clamped() {
        let config = Config::new()
            .with_send_chunk_size(0)
            .with_receive_chunk_size(0);
        assert_eq!(config.send_chunk_size, 1);
        assert_eq!(config.receive_chunk_size, 1);
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut config = Config::new().with_header("Authorization", "Bot a");
        config.set_header("authorization", "Bot b");
        config.set_header("User-Agent", "wsframe");

        assert_eq!(
            config.headers,
            vec![
                ("Authorization".to_string(), "Bot b".to_string()),
                ("User-Agent".to_string(), "wsframe".to_string()),
            ]
        );
    }
}
