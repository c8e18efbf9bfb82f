//! Work-item delivery.
//!
//! Items arrive as bare id strings on a fan-out channel: every subscriber
//! sees every message, and nothing is acknowledged or redelivered.

use std::{future::Future, pin::Pin};

use futures::{Stream, StreamExt as _};
use redis::AsyncCommands as _;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::Result;

/// A source of item ids.
pub trait Subscription: Send {
  /// The next id, or `None` once the channel is closed.
  fn next_item(
    &mut self,
  ) -> impl Future<Output = Result<Option<String>>> + Send + '_;
}

// ─── Redis ───────────────────────────────────────────────────────────────────

pub struct RedisSubscription {
  messages: Pin<Box<dyn Stream<Item = redis::Msg> + Send>>,
}

impl RedisSubscription {
  pub async fn connect(url: &str, channel: &str) -> Result<Self> {
    let client = redis::Client::open(url)?;
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.subscribe(channel).await?;
    info!(channel, "subscribed");
    Ok(Self { messages: Box::pin(pubsub.into_on_message()) })
  }
}

impl Subscription for RedisSubscription {
  async fn next_item(&mut self) -> Result<Option<String>> {
    while let Some(msg) = self.messages.next().await {
      match msg.get_payload::<String>() {
        Ok(item_id) => return Ok(Some(item_id)),
        Err(e) => warn!(
          channel = msg.get_channel_name(),
          error = %e,
          "dropping undecodable message"
        ),
      }
    }
    Ok(None)
  }
}

/// Publishes item ids to a Redis channel.
pub struct RedisPublisher {
  conn:    redis::aio::MultiplexedConnection,
  channel: String,
}

impl RedisPublisher {
  pub async fn connect(url: &str, channel: &str) -> Result<Self> {
    let client = redis::Client::open(url)?;
    let conn = client.get_multiplexed_async_connection().await?;
    Ok(Self { conn, channel: channel.to_owned() })
  }

  /// Returns the number of subscribers that received the id.
  pub async fn publish(&mut self, item_id: &str) -> Result<usize> {
    let receivers: usize = self.conn.publish(&self.channel, item_id).await?;
    Ok(receivers)
  }
}

// ─── In-process ──────────────────────────────────────────────────────────────

/// An in-process channel with the same fan-out semantics.
#[derive(Clone)]
pub struct BroadcastQueue {
  sender: broadcast::Sender<String>,
}

impl BroadcastQueue {
  pub fn new(capacity: usize) -> Self {
    let (sender, _) = broadcast::channel(capacity);
    Self { sender }
  }

  pub fn subscribe(&self) -> BroadcastSubscription {
    BroadcastSubscription { receiver: self.sender.subscribe() }
  }

  /// Returns the number of subscribers that received the id.
  pub fn publish(&self, item_id: impl Into<String>) -> usize {
    self.sender.send(item_id.into()).unwrap_or(0)
  }
}

pub struct BroadcastSubscription {
  receiver: broadcast::Receiver<String>,
}

impl Subscription for BroadcastSubscription {
  async fn next_item(&mut self) -> Result<Option<String>> {
    loop {
      match self.receiver.recv().await {
        Ok(item_id) => return Ok(Some(item_id)),
        Err(broadcast::error::RecvError::Lagged(missed)) => {
          warn!(missed, "subscriber lagged, messages dropped");
        }
        Err(broadcast::error::RecvError::Closed) => return Ok(None),
      }
    }
  }
}
