//! Relay hub: every text frame from one client goes to all the others
//!
//! The hub accepts WebSocket upgrades on any path.

use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use warp::ws::{Message, WebSocket};
use warp::Filter;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct RelayHub {
    tx: broadcast::Sender<(usize, String)>,
    next_client: Arc<AtomicUsize>,
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            next_client: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn routes(
        &self,
    ) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let hub = self.clone();
        warp::ws()
            .and(warp::addr::remote())
            .and(warp::any().map(move || hub.clone()))
            .map(|ws: warp::ws::Ws, peer: Option<SocketAddr>, hub: RelayHub| {
                ws.on_upgrade(move |socket| hub.handle_client(socket, peer))
            })
    }

    /// Bind `addr` and return the bound address with the serving future
    pub fn bind(
        &self,
        addr: SocketAddr,
    ) -> Result<(SocketAddr, impl Future<Output = ()> + 'static), warp::Error> {
        let (bound, server) = warp::serve(self.routes()).try_bind_ephemeral(addr)?;
        tracing::info!("Relay listening on ws://{}", bound);
        Ok((bound, server))
    }

    async fn handle_client(self, ws: WebSocket, peer: Option<SocketAddr>) {
        let client = self.next_client.fetch_add(1, Ordering::Relaxed);
        let peer = peer.map_or_else(|| "unknown".to_string(), |p| p.to_string());
        tracing::info!("Client {} connected from {}", client, peer);

        let (mut ws_tx, mut ws_rx) = ws.split();
        let mut rx = self.tx.subscribe();

        let forward = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok((from, _)) if from == client => continue,
                    Ok((_, text)) => {
                        if ws_tx.send(Message::text(text)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Client {} missed {} messages", client, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        while let Some(result) = ws_rx.next().await {
            match result {
                Ok(msg) if msg.is_close() => break,
                Ok(msg) => {
                    if let Ok(text) = msg.to_str() {
                        // No receivers just means nobody else is connected
                        let _ = self.tx.send((client, text.to_string()));
                    }
                }
                Err(e) => {
                    tracing::debug!("Client {} socket error: {}", client, e);
                    break;
                }
            }
        }

        forward.abort();
        tracing::info!("Client {} ({}) disconnected", client, peer);
    }
}
