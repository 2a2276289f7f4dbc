//! Per-location forecast cache in the `weather_cache` table

use super::KnowledgeError;
use super::store::KnowledgeStore;
use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

/// A cached forecast and when it was fetched
#[derive(Debug, Clone)]
pub struct CachedWeather {
    pub data: serde_json::Value,
    pub fetched_at: DateTime<Utc>,
}

impl CachedWeather {
    /// True while younger than `ttl_secs`; a TTL of zero is never fresh
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl_secs: u64) -> bool {
        if ttl_secs == 0 {
            return false;
        }
        let age = now.signed_duration_since(self.fetched_at).num_seconds();
        age >= 0 && (age as u64) < ttl_secs
    }
}

impl KnowledgeStore {
    pub fn get_weather(&self, location: &str) -> Result<Option<CachedWeather>, KnowledgeError> {
        let row: Option<(String, i64)> = self
            .conn
            .query_row(
                "SELECT data, timestamp FROM weather_cache WHERE location = ?1",
                [location],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((data, timestamp)) = row else {
            return Ok(None);
        };

        // Unreadable rows behave like a miss and get overwritten on the next fetch
        let Ok(data) = serde_json::from_str(&data) else {
            tracing::warn!(location = %location, "Discarding unreadable weather cache row");
            return Ok(None);
        };
        let Some(fetched_at) = DateTime::from_timestamp(timestamp, 0) else {
            return Ok(None);
        };

        Ok(Some(CachedWeather { data, fetched_at }))
    }

    pub fn put_weather(
        &mut self,
        location: &str,
        data: &serde_json::Value,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), KnowledgeError> {
        self.conn.execute(
            "INSERT INTO weather_cache (location, data, timestamp) VALUES (?1, ?2, ?3)
             ON CONFLICT(location) DO UPDATE SET
                data = excluded.data,
                timestamp = excluded.timestamp",
            (location, data.to_string(), fetched_at.timestamp()),
        )?;
        Ok(())
    }
}
