//! SQLite row store for knowledge records

use super::KnowledgeError;
use super::schema::init_schema;
use rusqlite::Connection;
use serde::Serialize;
use std::path::Path;

/// A stored knowledge record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeRecord {
    pub id: i64,
    pub content: String,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub category: String,
    pub location: String,
    pub language: String,
    pub created_at: String,
}

/// A record before it has been stored
#[derive(Debug, Clone)]
pub struct NewKnowledge {
    pub content: String,
    pub embedding: Vec<f32>,
    pub category: String,
    pub location: String,
    pub language: String,
}

/// Append-only knowledge storage
pub struct KnowledgeStore {
    pub(super) conn: Connection,
}

impl KnowledgeStore {
    /// Open or create the knowledge database (`:memory:` for a private in-memory one)
    pub fn open(path: &Path) -> Result<Self, KnowledgeError> {
        let conn = Connection::open(path).map_err(|source| KnowledgeError::Open {
            path: path.display().to_string(),
            source,
        })?;

        init_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Append one record
    pub fn insert(&mut self, record: &NewKnowledge) -> Result<KnowledgeRecord, KnowledgeError> {
        let now = chrono::Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO knowledge_base (content, embedding, category, location, language, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            (
                &record.content,
                embedding_to_bytes(&record.embedding),
                &record.category,
                &record.location,
                &record.language,
                &now,
            ),
        )?;

        Ok(KnowledgeRecord {
            id: self.conn.last_insert_rowid(),
            content: record.content.clone(),
            embedding: Some(record.embedding.clone()),
            category: record.category.clone(),
            location: record.location.clone(),
            language: record.language.clone(),
            created_at: now,
        })
    }

    /// All records in insertion order
    pub fn load_all(&self) -> Result<Vec<KnowledgeRecord>, KnowledgeError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, embedding, category, location, language, created_at
             FROM knowledge_base
             ORDER BY id ASC",
        )?;

        let records = stmt
            .query_map([], |row| {
                let blob: Option<Vec<u8>> = row.get(2)?;
                Ok(KnowledgeRecord {
                    id: row.get(0)?,
                    content: row.get(1)?,
                    embedding: blob.and_then(|b| embedding_from_bytes(&b)),
                    category: row.get(3)?,
                    location: row.get(4)?,
                    language: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn count(&self) -> Result<usize, KnowledgeError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM knowledge_base", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &val in embedding {
        bytes.extend_from_slice(&val.to_le_bytes());
    }
    bytes
}

/// Decode a little-endian f32 blob; empty or ragged blobs carry no embedding
fn embedding_from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
