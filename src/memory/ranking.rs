//! Brute-force similarity ranking

use super::store::KnowledgeRecord;

/// A record with its similarity score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: KnowledgeRecord,
    pub score: f32,
}

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Score every comparable record against `query` and return the best `top_k`.
///
/// Records tagged with `location` (case-insensitive) get `boost` added.
/// Records without an embedding, or with one of a different length, are
/// skipped. Equal scores rank the later-inserted record first.
pub fn rank(
    records: &[KnowledgeRecord],
    query: &[f32],
    location: &str,
    boost: f32,
    top_k: usize,
) -> Vec<ScoredRecord> {
    let location = location.trim().to_lowercase();

    let mut scored: Vec<(usize, f32)> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let embedding = record.embedding.as_deref()?;
            if embedding.len() != query.len() {
                return None;
            }
            let mut score = dot(embedding, query);
            if record.location.trim().to_lowercase() == location {
                score += boost;
            }
            Some((index, score))
        })
        .collect();

    scored.sort_by(|(ia, sa), (ib, sb)| sb.total_cmp(sa).then(ib.cmp(ia)));

    scored
        .into_iter()
        .take(top_k)
        .map(|(index, score)| ScoredRecord {
            record: records[index].clone(),
            score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64, location: &str, embedding: Option<Vec<f32>>) -> KnowledgeRecord {
        KnowledgeRecord {
            id,
            content: format!("record {id}"),
            embedding,
            category: "crop_guidance".into(),
            location: location.into(),
            language: "en".into(),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_orders_by_descending_score() {
        let records = vec![
            record(1, "general", Some(vec![0.1, 0.0])),
            record(2, "general", Some(vec![0.9, 0.0])),
            record(3, "general", Some(vec![0.5, 0.0])),
        ];
        let ranked = rank(&records, &[1.0, 0.0], "delhi", 0.3, 10);
        let ids: Vec<i64> = ranked.iter().map(|s| s.record.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_location_boost_is_exact_and_case_insensitive() {
        let records = vec![
            record(1, "Punjab", Some(vec![0.5, 0.0])),
            record(2, "delhi", Some(vec![0.5, 0.0])),
        ];
        let ranked = rank(&records, &[1.0, 0.0], "PUNJAB", 0.3, 10);
        assert_eq!(ranked[0].record.id, 1);
        assert!((ranked[0].score - ranked[1].score - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_ties_prefer_later_insertion() {
        let records = vec![
            record(1, "general", Some(vec![1.0])),
            record(2, "general", Some(vec![1.0])),
            record(3, "general", Some(vec![1.0])),
        ];
        let ids: Vec<i64> = rank(&records, &[1.0], "delhi", 0.3, 2)
            .iter()
            .map(|s| s.record.id)
            .collect();
        assert_eq!(ids, vec![3, 2]);
    }

    #[test]
    fn test_skips_missing_and_mismatched_embeddings() {
        let records = vec![
            record(1, "delhi", None),
            record(2, "delhi", Some(vec![1.0, 0.0, 0.0])),
            record(3, "delhi", Some(vec![0.2, 0.1])),
        ];
        let ranked = rank(&records, &[1.0, 0.0], "delhi", 0.3, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].record.id, 3);
    }

    #[test]
    fn test_top_k_truncates() {
        let records: Vec<_> = (1..=5)
            .map(|i| record(i, "general", Some(vec![i as f32])))
            .collect();
        assert_eq!(rank(&records, &[1.0], "x", 0.3, 3).len(), 3);
        assert!(rank(&records, &[1.0], "x", 0.3, 0).is_empty());
    }
}
