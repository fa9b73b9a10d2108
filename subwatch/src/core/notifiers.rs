/*!
Notification channels for newly discovered subdomains
*/

use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use super::BoxError;
use super::config::{NotifierConfig, NotifierPlugin, TerminalFormat};
use super::subdomain::SubdomainSet;

/// Discord rejects message content longer than this many characters
pub const MAX_CHUNK_CHARS: usize = 2000;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for notification plugins
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Name of the notifier
    fn name(&self) -> &'static str;

    /// Deliver a human readable message
    async fn notify(&self, message: &str) -> Result<(), BoxError>;
}

/// Build the summary sent for a non-empty delta
pub fn format_new_subdomains(delta: &SubdomainSet) -> String {
    let mut message = format!(
        "[Subdomain Monitor] {} new subdomains discovered:\n",
        delta.len()
    );
    message.push_str(&delta.to_lines());
    message
}

/// Split into pieces of at most `max_chars` characters, in order. Splits fall on character
/// boundaries only, words may be cut.
pub fn chunk_message(message: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = message;

    while !rest.is_empty() {
        let split_at = rest
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(split_at);
        chunks.push(chunk);
        rest = tail;
    }

    chunks
}

/// Fans a message out to every configured notifier
pub struct NotificationManager {
    notifiers: Vec<Box<dyn Notifier>>,
}

impl NotificationManager {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>) -> Self {
        Self { notifiers }
    }

    pub fn from_config(configs: &[NotifierConfig]) -> Result<Self, BoxError> {
        let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

        for config in configs {
            if !config.enabled {
                continue;
            }

            let notifier: Box<dyn Notifier> = match &config.plugin {
                NotifierPlugin::Webhook { url } => Box::new(WebhookNotifier::new(url.clone())?),
                NotifierPlugin::Terminal { format } => Box::new(TerminalNotifier::new(*format)),
            };
            notifiers.push(notifier);
        }

        info!("Initialized notification manager with {} notifiers", notifiers.len());
        Ok(Self { notifiers })
    }

    pub fn is_empty(&self) -> bool {
        self.notifiers.is_empty()
    }

    /// Best effort: a failing notifier is logged and the others still run. With no
    /// notifiers configured this does nothing.
    pub async fn notify(&self, message: &str) -> usize {
        let mut delivered = 0;
        for notifier in &self.notifiers {
            match notifier.notify(message).await {
                Ok(()) => delivered += 1,
                Err(e) => error!("Notifier {} failed: {}", notifier.name(), e),
            }
        }
        delivered
    }
}

/// Posts `{"content": ...}` payloads, Discord webhook style
pub struct WebhookNotifier {
    url: String,
    client: reqwest::Client,
    max_chunk_chars: usize,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Result<Self, BoxError> {
        let client = reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self {
            url,
            client,
            max_chunk_chars: MAX_CHUNK_CHARS,
        })
    }

    pub fn with_max_chunk_chars(mut self, max_chunk_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars;
        self
    }

    async fn send_chunk(&self, chunk: &str) -> Result<(), BoxError> {
        let response = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "content": chunk }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(format!("Webhook delivery failed: {}", response.status()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "Webhook"
    }

    async fn notify(&self, message: &str) -> Result<(), BoxError> {
        let chunks = chunk_message(message, self.max_chunk_chars);
        let total = chunks.len();
        let mut failed = Vec::new();

        for (index, chunk) in chunks.into_iter().enumerate() {
            if let Err(e) = self.send_chunk(chunk).await {
                warn!("Webhook chunk {}/{} failed: {}", index + 1, total, e);
                failed.push(index + 1);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(format!("{} of {} chunks failed: {:?}", failed.len(), total, failed).into())
        }
    }
}

/// Prints the message to stdout
pub struct TerminalNotifier {
    format: TerminalFormat,
}

impl TerminalNotifier {
    pub fn new(format: TerminalFormat) -> Self {
        Self { format }
    }

    fn render(&self, message: &str) -> String {
        match self.format {
            TerminalFormat::Plain => message.to_string(),
            TerminalFormat::Colored => {
                let mut lines = message.lines();
                let header = lines.next().unwrap_or_default();
                let mut out = format!("\x1b[31m🚨 {header}\x1b[0m");
                for line in lines {
                    out.push_str(&format!("\n\x1b[36m  + {line}\x1b[0m"));
                }
                out
            }
        }
    }
}

#[async_trait]
impl Notifier for TerminalNotifier {
    fn name(&self) -> &'static str {
        "Terminal"
    }

    async fn notify(&self, message: &str) -> Result<(), BoxError> {
        println!("{}", self.render(message));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::core::normalizer::Normalizer;

    #[test]
    fn chunks_at_the_limit_in_order() {
        let message: String = ('a'..='z').cycle().take(4500).collect();
        let chunks = chunk_message(&message, 2000);

        let lengths: Vec<_> = chunks.iter().map(|c| c.chars().count()).collect();
        assert_eq!(lengths, vec![2000, 2000, 500]);
        assert_eq!(chunks.concat(), message);
    }

    #[test]
    fn short_and_empty_messages() {
        assert_eq!(chunk_message("hello", 2000), vec!["hello"]);
        assert!(chunk_message("", 2000).is_empty());
    }

    #[test]
    fn never_splits_a_code_point() {
        let message = "é".repeat(5);
        let chunks = chunk_message(&message, 2);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn message_lists_only_the_delta() {
        let delta = Normalizer::default().collect_lines(["c.example.com"]);
        let message = format_new_subdomains(&delta);
        assert!(message.starts_with("[Subdomain Monitor] 1 new subdomains discovered:\n"));
        assert!(message.contains("c.example.com"));
        assert!(!message.contains("a.example.com"));
    }

    struct Recorder {
        messages: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Notifier for Recorder {
        fn name(&self) -> &'static str {
            "Recorder"
        }

        async fn notify(&self, message: &str) -> Result<(), BoxError> {
            self.messages.lock().unwrap().push(message.to_string());
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl Notifier for Broken {
        fn name(&self) -> &'static str {
            "Broken"
        }

        async fn notify(&self, _message: &str) -> Result<(), BoxError> {
            Err("channel down".into())
        }
    }

    #[tokio::test]
    async fn broken_notifier_does_not_block_others() {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let manager = NotificationManager::new(vec![
            Box::new(Broken),
            Box::new(Recorder {
                messages: messages.clone(),
            }),
        ]);

        assert_eq!(manager.notify("hello").await, 1);
        assert_eq!(*messages.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn unconfigured_manager_is_a_no_op() {
        let manager = NotificationManager::from_config(&[]).unwrap();
        assert!(manager.is_empty());
        assert_eq!(manager.notify("hello").await, 0);
    }

    #[test]
    fn disabled_notifiers_are_skipped() {
        let configs = vec![NotifierConfig {
            plugin: NotifierPlugin::Terminal {
                format: TerminalFormat::Plain,
            },
            enabled: false,
        }];
        assert!(NotificationManager::from_config(&configs).unwrap().is_empty());
    }

    #[test]
    fn colored_output_marks_each_name() {
        let rendered = TerminalNotifier::new(TerminalFormat::Colored)
            .render("[Subdomain Monitor] 1 new subdomains discovered:\nc.example.com\n");
        assert!(rendered.contains("🚨 [Subdomain Monitor]"));
        assert!(rendered.contains("+ c.example.com"));
    }
}
