// File: src/cache/activity_log.rs

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::trace;
use porygonbot_common::models::{
    ActivityMessage, ActivityRedemption, ActivityRetention, ChatterActivityRecord,
};

/// Per-chatter recent activity, keyed by lowercased login. Lives only in memory.
pub struct ActivityLog {
    records: DashMap<String, ChatterActivityRecord>,
    retention: ActivityRetention,
}

impl ActivityLog {
    pub fn new(retention: ActivityRetention) -> Self {
        Self {
            records: DashMap::new(),
            retention,
        }
    }

    pub fn retention(&self) -> &ActivityRetention {
        &self.retention
    }

    pub fn record_message(
        &self,
        username: &str,
        channel: &str,
        content: &str,
        timestamp: DateTime<Utc>,
    ) {
        let key = username.to_lowercase();
        {
            let mut entry = self
                .records
                .entry(key.clone())
                .or_insert_with(|| ChatterActivityRecord::new(key.clone(), timestamp));
            entry.messages.push(ActivityMessage {
                content: content.to_string(),
                channel: channel.to_string(),
                timestamp,
            });
            if timestamp > entry.last_seen {
                entry.last_seen = timestamp;
            }
            if let Some(max) = self.retention.max_messages_per_user {
                trim_front(&mut entry.messages, max);
            }
        }
        trace!("activity: message from {} in {}", key, channel);
        self.evict_idle(timestamp);
    }

    pub fn record_redemption(
        &self,
        username: &str,
        channel: &str,
        reward_title: &str,
        user_input: Option<&str>,
        timestamp: DateTime<Utc>,
    ) {
        let key = username.to_lowercase();
        {
            let mut entry = self
                .records
                .entry(key.clone())
                .or_insert_with(|| ChatterActivityRecord::new(key.clone(), timestamp));
            entry.redemptions.push(ActivityRedemption {
                reward_title: reward_title.to_string(),
                user_input: user_input.map(str::to_string),
                channel: channel.to_string(),
                timestamp,
            });
            if timestamp > entry.last_seen {
                entry.last_seen = timestamp;
            }
            if let Some(max) = self.retention.max_redemptions_per_user {
                trim_front(&mut entry.redemptions, max);
            }
        }
        self.evict_idle(timestamp);
    }

    pub fn get(&self, username: &str) -> Option<ChatterActivityRecord> {
        self.records
            .get(&username.to_lowercase())
            .map(|r| r.value().clone())
    }

    /// All chatters, most recently seen first.
    pub fn snapshot(&self) -> Vec<ChatterActivityRecord> {
        let mut all: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then_with(|| a.username.cmp(&b.username)));
        all
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn evict_idle(&self, now: DateTime<Utc>) {
        if let Some(max_idle) = self.retention.max_idle_seconds {
            let cutoff = now - Duration::seconds(max_idle);
            self.records.retain(|_, rec| rec.last_seen >= cutoff);
        }
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(ActivityRetention::default())
    }
}

fn trim_front<T>(items: &mut Vec<T>, max: usize) {
    if items.len() > max {
        let excess = items.len() - max;
        items.drain(..excess);
    }
}
