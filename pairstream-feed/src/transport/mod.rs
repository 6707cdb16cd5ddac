//! Websocket fan-out for feed frames.
//!
//! Frames flow through a broadcast channel with one receiver per connected
//! subscriber. A subscriber that falls more than the channel capacity
//! behind skips ahead to the oldest retained frame instead of stalling the
//! producer.

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::error::{FeedError, FeedResult};
use pairstream_core::wire::codec;

/// Destination for encoded feed frames
#[async_trait]
pub trait FeedSink: Send + Sync {
    /// Publish one frame, returning how many subscribers received it
    async fn publish(&self, frame: String) -> FeedResult<usize>;
}

/// Encode a wire message and hand it to the sink
pub async fn publish_json<T: Serialize>(sink: &dyn FeedSink, message: &T) -> FeedResult<usize> {
    let frame = codec::encode(message)?;
    sink.publish(frame).await
}

/// Publisher configuration
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Listen address for subscriber connections
    pub bind_addr: String,
    /// Frames buffered per subscriber before lagging peers skip ahead
    pub buffer_size: usize,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5562".to_string(), // Feature feed port
            buffer_size: 1024,
        }
    }
}

/// Publisher counters
#[derive(Debug, Clone, Default)]
pub struct PublisherMetrics {
    pub frames_published: u64,
    pub peers_connected: u64,
    pub peers_disconnected: u64,
}

/// Websocket publisher that fans every frame out to all subscribers
pub struct WsFeedPublisher {
    local_addr: SocketAddr,
    frames: broadcast::Sender<String>,
    peers: Arc<DashMap<SocketAddr, u64>>,
    metrics: Arc<RwLock<PublisherMetrics>>,
    accept_task: Option<JoinHandle<()>>,
}

impl WsFeedPublisher {
    /// Bind the listen socket and start accepting subscribers
    pub async fn bind(config: PublisherConfig) -> FeedResult<Self> {
        let listener = TcpListener::bind(&config.bind_addr)
            .await
            .map_err(|err| FeedError::Bind {
                addr: config.bind_addr.clone(),
                message: err.to_string(),
            })?;
        let local_addr = listener.local_addr().map_err(|err| FeedError::Bind {
            addr: config.bind_addr.clone(),
            message: err.to_string(),
        })?;

        let (frames, _) = broadcast::channel(config.buffer_size.max(1));
        let peers = Arc::new(DashMap::new());
        let metrics = Arc::new(RwLock::new(PublisherMetrics::default()));

        let accept_task = tokio::spawn(accept_loop(
            listener,
            frames.clone(),
            Arc::clone(&peers),
            Arc::clone(&metrics),
        ));

        info!("📡 Feed publisher listening on ws://{}", local_addr);
        Ok(Self {
            local_addr,
            frames,
            peers,
            metrics,
            accept_task: Some(accept_task),
        })
    }

    /// Address the listener actually bound, useful when binding port 0
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Subscribers currently attached to the frame channel
    pub fn subscriber_count(&self) -> usize {
        self.frames.receiver_count()
    }

    /// Frames delivered so far, per connected peer
    pub fn peer_deliveries(&self) -> Vec<(SocketAddr, u64)> {
        self.peers
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    pub fn metrics(&self) -> PublisherMetrics {
        self.metrics.read().clone()
    }

    /// Stop accepting subscribers and release the port
    pub async fn shutdown(mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
            let _ = task.await;
        }
        info!("📡 Feed publisher on ws://{} shut down", self.local_addr);
    }
}

impl Drop for WsFeedPublisher {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl FeedSink for WsFeedPublisher {
    async fn publish(&self, frame: String) -> FeedResult<usize> {
        // send only errors when no subscriber is attached
        let delivered = self.frames.send(frame).unwrap_or(0);
        self.metrics.write().frames_published += 1;
        Ok(delivered)
    }
}

async fn accept_loop(
    listener: TcpListener,
    frames: broadcast::Sender<String>,
    peers: Arc<DashMap<SocketAddr, u64>>,
    metrics: Arc<RwLock<PublisherMetrics>>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let receiver = frames.subscribe();
                tokio::spawn(serve_peer(
                    stream,
                    peer,
                    receiver,
                    Arc::clone(&peers),
                    Arc::clone(&metrics),
                ));
            }
            Err(err) => {
                warn!("Failed to accept subscriber: {}", err);
            }
        }
    }
}

async fn serve_peer(
    stream: TcpStream,
    peer: SocketAddr,
    mut receiver: broadcast::Receiver<String>,
    peers: Arc<DashMap<SocketAddr, u64>>,
    metrics: Arc<RwLock<PublisherMetrics>>,
) {
    let websocket = match tokio_tungstenite::accept_async(stream).await {
        Ok(websocket) => websocket,
        Err(err) => {
            warn!("Websocket handshake with {} failed: {}", peer, err);
            return;
        }
    };

    peers.insert(peer, 0);
    metrics.write().peers_connected += 1;
    info!("🔌 Subscriber connected: {}", peer);

    let (mut sink, mut incoming) = websocket.split();
    loop {
        tokio::select! {
            frame = receiver.recv() => match frame {
                Ok(frame) => {
                    if sink.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                    if let Some(mut delivered) = peers.get_mut(&peer) {
                        *delivered += 1;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Subscriber {} lagged, skipped {} frames", peer, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            message = incoming.next() => match message {
                Some(Ok(Message::Close(_))) | None => break,
                // Subscribers are listen-only; anything except close is ignored
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }

    let _ = sink.close().await;
    peers.remove(&peer);
    metrics.write().peers_disconnected += 1;
    info!("🔌 Subscriber disconnected: {}", peer);
}
