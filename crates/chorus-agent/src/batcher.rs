//! Token batching over the broadcast channel
//!
//! Publishing every token individually swamps the channel, so tokens are
//! buffered up to a character budget and flushed as one `TokenBatch`. A
//! failed publish is retried with exponential backoff; once the retry
//! ceiling is hit the batcher degrades to per-token publishing so tokens
//! are not silently lost behind a flaky channel.

use std::time::Duration;

use crate::events::AgentEvent;
use crate::traits::Broadcast;

const BACKOFF_BASE: Duration = Duration::from_millis(100);

pub struct TokenBatcher<'a> {
    broadcast: &'a dyn Broadcast,
    batch_size: usize,
    max_retries: u32,
    tokens: Vec<String>,
    buffered_chars: usize,
    degraded: bool,
}

impl<'a> TokenBatcher<'a> {
    pub fn new(broadcast: &'a dyn Broadcast, batch_size: usize, max_retries: u32) -> Self {
        Self {
            broadcast,
            batch_size,
            max_retries,
            tokens: Vec::new(),
            buffered_chars: 0,
            degraded: false,
        }
    }

    /// Buffer a token, flushing when the character budget is reached
    pub async fn push(&mut self, token: &str) {
        self.buffered_chars += token.chars().count();
        self.tokens.push(token.to_owned());

        if self.degraded || self.buffered_chars >= self.batch_size {
            self.flush().await;
        }
    }

    /// Publish everything buffered so far
    pub async fn flush(&mut self) {
        if self.tokens.is_empty() {
            return;
        }
        let tokens = std::mem::take(&mut self.tokens);
        self.buffered_chars = 0;

        if self.degraded {
            self.publish_individually(tokens).await;
            return;
        }

        let batch = AgentEvent::TokenBatch {
            text: tokens.concat(),
        };
        for attempt in 0..=self.max_retries {
            match self.broadcast.send(&batch).await {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "token batch publish failed");
                    if attempt < self.max_retries {
                        tokio::time::sleep(BACKOFF_BASE * 2u32.pow(attempt)).await;
                    }
                }
            }
        }

        tracing::warn!("publish retries exhausted, degrading to per-token sends");
        self.degraded = true;
        self.publish_individually(tokens).await;
    }

    async fn publish_individually(&self, tokens: Vec<String>) {
        for token in tokens {
            if let Err(e) = self.broadcast.send(&AgentEvent::TokenBatch { text: token }).await {
                tracing::warn!(error = %e, "per-token publish failed");
            }
        }
    }
}
