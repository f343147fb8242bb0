use anyhow::Context;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

/// Delivery channel for run outcomes.
#[async_trait]
pub trait Notifier {
    async fn notify(&self, title: &str, message: &str) -> anyhow::Result<()>;
}

/// Fallback when no push channel is configured: the outcome only lands in the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, message: &str) -> anyhow::Result<()> {
        info!(title = %title, "{}", message);
        Ok(())
    }
}

/// Hands the notification to an external program as `<cmd> <title> <message>`.
#[derive(Debug)]
pub struct CommandNotifier {
    program: String,
}

impl CommandNotifier {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl Notifier for CommandNotifier {
    async fn notify(&self, title: &str, message: &str) -> anyhow::Result<()> {
        let output = Command::new(&self.program)
            .arg(title)
            .arg(message)
            .output()
            .await
            .with_context(|| format!("failed to spawn notifier {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("notifier stderr: {}", stderr.trim());
            return Err(anyhow::anyhow!(
                "notifier {} exited with {}",
                self.program,
                output.status
            ));
        }
        info!("通知已发送: {}", title);
        Ok(())
    }
}

/// Picks the command notifier when one is configured, the log otherwise.
pub fn from_config(config: &crate::Config) -> Box<dyn Notifier + Send + Sync> {
    match &config.notify_cmd {
        Some(cmd) => Box::new(CommandNotifier::new(cmd.clone())),
        None => Box::new(LogNotifier),
    }
}

#[async_trait]
impl<N: Notifier + Send + Sync + ?Sized> Notifier for Box<N> {
    async fn notify(&self, title: &str, message: &str) -> anyhow::Result<()> {
        (**self).notify(title, message).await
    }
}
