use crate::router::CommandRouter;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

/// Long-lived connection from the session to the relay hub
///
/// Transport failures are never fatal: the client waits `reconnect_delay` and
/// dials again, indefinitely.
pub struct ControlClient {
    url: String,
    reconnect_delay: Duration,
    router: CommandRouter,
}

impl ControlClient {
    pub fn new(url: impl Into<String>, reconnect_delay: Duration, router: CommandRouter) -> Self {
        Self {
            url: url.into(),
            reconnect_delay,
            router,
        }
    }

    pub async fn run(&self) {
        loop {
            match self.connect_once().await {
                Ok(()) => tracing::warn!("Control channel {} closed", self.url),
                Err(e) => tracing::error!("Control channel {} failed: {}", self.url, e),
            }
            tracing::info!("Reconnecting in {:?}", self.reconnect_delay);
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn connect_once(&self) -> anyhow::Result<()> {
        let (stream, _) = connect_async(self.url.as_str()).await?;
        tracing::info!("Connected to {}", self.url);

        let (mut write, mut read) = stream.split();

        while let Some(msg) = read.next().await {
            match msg? {
                Message::Text(text) => {
                    if let Some(reply) = self.router.handle(&text).await {
                        write.send(Message::Text(reply)).await?;
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        Ok(())
    }
}
