//! Links waiting for the user to press "Download".
//!
//! Entries live in a bounded TTL cache keyed by a short random token that
//! travels in the button payload. Taking an entry removes it, so a button
//! can only be redeemed once.

use crate::core::config;
use crate::download::source::MediaInfo;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::time::Duration;
use teloxide::types::ChatId;
use uuid::Uuid;

/// Token length in the callback payload (callback data is capped at 64 bytes)
const TOKEN_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub url: String,
    pub chat_id: ChatId,
    pub preview: MediaInfo,
    pub created_at: DateTime<Utc>,
}

impl PendingRequest {
    pub fn new(url: impl Into<String>, chat_id: ChatId, preview: MediaInfo) -> Self {
        Self {
            url: url.into(),
            chat_id,
            preview,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone)]
pub struct PendingRequests {
    cache: Cache<String, PendingRequest>,
}

impl PendingRequests {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(config::pending::MAX_ENTRIES)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Stores the request and returns its token.
    pub async fn insert(&self, request: PendingRequest) -> String {
        loop {
            let token = new_token();
            if !self.cache.contains_key(&token) {
                self.cache.insert(token.clone(), request).await;
                return token;
            }
        }
    }

    /// Removes and returns the entry if it exists and belongs to `chat_id`.
    ///
    /// An entry owned by another chat is left in place.
    pub async fn take(&self, token: &str, chat_id: ChatId) -> Option<PendingRequest> {
        let entry = self.cache.get(token).await?;
        if entry.chat_id != chat_id {
            log::warn!("Chat {} tried to redeem a confirmation owned by {}", chat_id, entry.chat_id);
            return None;
        }
        self.cache.remove(token).await
    }
}

fn new_token() -> String {
    Uuid::new_v4().simple().to_string()[..TOKEN_LEN].to_string()
}
