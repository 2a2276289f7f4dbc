//! Knowledge base: SQLite store, in-memory mirror and encoder

use super::KnowledgeError;
use super::ranking::{ScoredRecord, rank};
use super::seed::SeedFile;
use super::store::{KnowledgeRecord, KnowledgeStore, NewKnowledge};
use crate::providers::EmbeddingDriver;
use chrono::Utc;
use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

/// Default additive score for records tagged with the query's location
pub const DEFAULT_LOCATION_BOOST: f32 = 0.3;

pub struct KnowledgeBase {
    store: Mutex<KnowledgeStore>,
    records: RwLock<Vec<KnowledgeRecord>>,
    embedder: Arc<dyn EmbeddingDriver>,
    location_boost: f32,
}

impl KnowledgeBase {
    /// Open the store and load every existing record into memory
    pub fn open(path: &Path, embedder: Arc<dyn EmbeddingDriver>) -> Result<Self, KnowledgeError> {
        let store = KnowledgeStore::open(path)?;
        let records = store.load_all()?;

        tracing::info!(
            path = %path.display(),
            items = records.len(),
            "Loaded knowledge base"
        );

        Ok(Self {
            store: Mutex::new(store),
            records: RwLock::new(records),
            embedder,
            location_boost: DEFAULT_LOCATION_BOOST,
        })
    }

    pub fn with_location_boost(mut self, boost: f32) -> Self {
        self.location_boost = boost;
        self
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Embed, persist, then mirror one record
    pub async fn add_knowledge(
        &self,
        content: &str,
        category: &str,
        location: &str,
        language: &str,
    ) -> Result<KnowledgeRecord, KnowledgeError> {
        let embedding = self.embedder.embed_one(content).await?;
        let record = NewKnowledge {
            content: content.to_string(),
            embedding,
            category: category.to_string(),
            location: location.to_string(),
            language: language.to_string(),
        };
        self.append(&[record]).map(|mut stored| stored.remove(0))
    }

    /// Nearest records for `query`, boosted for `location`
    pub async fn search(
        &self,
        query: &str,
        location: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredRecord>, KnowledgeError> {
        if self.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed_one(query).await?;

        let records = self.records.read().map_err(|_| KnowledgeError::Poisoned)?;
        let results = rank(&records, &query_embedding, location, self.location_boost, top_k);

        tracing::debug!(
            location = %location,
            scanned = records.len(),
            returned = results.len(),
            "Knowledge search"
        );

        Ok(results)
    }

    /// Store every seed document; returns how many were added
    pub async fn seed(&self, seed: &SeedFile) -> Result<usize, KnowledgeError> {
        let documents = seed.documents();
        if documents.is_empty() {
            return Ok(0);
        }

        let texts: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        let embeddings = self.embedder.embed(&texts).await?;

        let records: Vec<NewKnowledge> = documents
            .into_iter()
            .zip(embeddings)
            .map(|(doc, embedding)| NewKnowledge {
                content: doc.content,
                embedding,
                category: doc.category.to_string(),
                location: doc.location,
                language: "en".to_string(),
            })
            .collect();

        let added = self.append(&records)?.len();
        tracing::info!(items = added, "Seeded knowledge base");
        Ok(added)
    }

    /// Seed only when the database holds no records yet
    pub async fn seed_if_empty(&self, seed: &SeedFile) -> Result<usize, KnowledgeError> {
        let stored = self.stored_count()?;
        if stored > 0 {
            tracing::debug!(items = stored, "Knowledge base already populated, skipping seed");
            return Ok(0);
        }
        self.seed(seed).await
    }

    /// Row count in the database, as opposed to the in-memory mirror
    pub fn stored_count(&self) -> Result<usize, KnowledgeError> {
        let store = self.store.lock().map_err(|_| KnowledgeError::Poisoned)?;
        store.count()
    }

    /// A cached forecast younger than `ttl_secs`
    pub fn cached_weather(
        &self,
        location: &str,
        ttl_secs: u64,
    ) -> Result<Option<serde_json::Value>, KnowledgeError> {
        if ttl_secs == 0 {
            return Ok(None);
        }
        let store = self.store.lock().map_err(|_| KnowledgeError::Poisoned)?;
        Ok(store
            .get_weather(location)?
            .filter(|cached| cached.is_fresh(Utc::now(), ttl_secs))
            .map(|cached| cached.data))
    }

    pub fn cache_weather(
        &self,
        location: &str,
        forecast: &serde_json::Value,
    ) -> Result<(), KnowledgeError> {
        let mut store = self.store.lock().map_err(|_| KnowledgeError::Poisoned)?;
        store.put_weather(location, forecast, Utc::now())
    }

    fn append(&self, new_records: &[NewKnowledge]) -> Result<Vec<KnowledgeRecord>, KnowledgeError> {
        let stored = {
            let mut store = self.store.lock().map_err(|_| KnowledgeError::Poisoned)?;
            new_records
                .iter()
                .map(|r| store.insert(r))
                .collect::<Result<Vec<_>, _>>()?
        };

        self.records
            .write()
            .map_err(|_| KnowledgeError::Poisoned)?
            .extend(stored.iter().cloned());

        Ok(stored)
    }
}
