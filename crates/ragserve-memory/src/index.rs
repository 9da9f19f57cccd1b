use ragserve_core::{RagError, RagResult};
use std::cmp::Ordering;

/// A single ranked match returned by [`SimilarityIndex::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Insertion position of the document (its permanent identity).
    pub position: usize,
    /// The stored document text.
    pub document: String,
    /// Cosine similarity to the query, in `[-1, 1]`.
    pub score: f32,
}

/// Exact nearest-neighbour index under cosine similarity.
///
/// Documents and vectors are stored side by side; position `i` in one always
/// corresponds to position `i` in the other. Vectors are normalised to unit
/// length when inserted, so search reduces to a dot product per stored entry.
/// Brute force is deliberate: the corpus is small and results must be exact.
#[derive(Debug, Clone)]
pub struct SimilarityIndex {
    dimension: usize,
    documents: Vec<String>,
    vectors: Vec<Vec<f32>>,
}

impl SimilarityIndex {
    /// Create an empty index for `dimension`-wide vectors.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            documents: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// Vector width accepted by this index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Whether nothing has been inserted yet.
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Stored documents in insertion order.
    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    /// Append documents with their vectors.
    ///
    /// Fails without touching the index if the counts disagree or any vector
    /// has the wrong width.
    pub fn add_documents(
        &mut self,
        documents: Vec<String>,
        mut vectors: Vec<Vec<f32>>,
    ) -> RagResult<()> {
        if documents.len() != vectors.len() {
            return Err(RagError::DimensionMismatch {
                expected: documents.len(),
                actual: vectors.len(),
            });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        for v in &mut vectors {
            normalize(v);
        }

        self.documents.extend(documents);
        self.vectors.extend(vectors);
        debug_assert_eq!(self.documents.len(), self.vectors.len());

        Ok(())
    }

    /// Return the `min(k, len)` stored documents most similar to `query`,
    /// best first. Equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> RagResult<Vec<SearchHit>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, dot(&query, v).clamp(-1.0, 1.0)))
            .collect();

        // Stable sort keeps earlier insertions ahead on ties.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(position, score)| SearchHit {
                position,
                document: self.documents[position].clone(),
                score,
            })
            .collect())
    }
}

/// Scale `v` to unit L2 norm in place. Zero vectors are left untouched.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Inner product of two equal-width vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn docs(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        let index = SimilarityIndex::new(3);
        assert!(index.search(&[1.0, 0.0, 0.0], 5).unwrap().is_empty());
    }

    #[test]
    fn test_add_count_mismatch() {
        let mut index = SimilarityIndex::new(2);
        let err = index
            .add_documents(docs(&["a", "b"]), vec![vec![1.0, 0.0]])
            .unwrap_err();
        assert!(matches!(
            err,
            RagError::DimensionMismatch {
                expected: 2,
                actual: 1
            }
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_add_width_mismatch_leaves_index_untouched() {
        let mut index = SimilarityIndex::new(2);
        let err = index
            .add_documents(docs(&["a", "b"]), vec![vec![1.0, 0.0], vec![1.0]])
            .unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));
        assert_eq!(index.len(), 0);
        assert!(index.documents().is_empty());
    }

    #[test]
    fn test_vectors_are_normalized_on_insert() {
        let mut index = SimilarityIndex::new(2);
        index
            .add_documents(docs(&["a"]), vec![vec![3.0, 4.0]])
            .unwrap();
        let hits = index.search(&[3.0, 4.0], 1).unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_search_ranks_and_caps_at_len() {
        let mut index = SimilarityIndex::new(3);
        index
            .add_documents(
                docs(&["far", "close", "mid"]),
                vec![
                    vec![0.0, 0.0, 1.0],
                    vec![0.9, 0.1, 0.0],
                    vec![0.5, 0.5, 0.0],
                ],
            )
            .unwrap();

        let hits = index.search(&[1.0, 0.0, 0.0], 10).unwrap();
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].document, "close");
        assert_eq!(hits[1].document, "mid");
        assert_eq!(hits[2].document, "far");
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut index = SimilarityIndex::new(2);
        index
            .add_documents(
                docs(&["first", "second", "third"]),
                vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![0.0, 1.0]],
            )
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits[0].position, 0);
        assert_eq!(hits[1].position, 1);
        assert_eq!(hits[0].score, hits[1].score);
    }

    #[test]
    fn test_search_zero_k() {
        let mut index = SimilarityIndex::new(1);
        index.add_documents(docs(&["a"]), vec![vec![1.0]]).unwrap();
        assert!(index.search(&[1.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_search_wrong_query_width() {
        let mut index = SimilarityIndex::new(2);
        index
            .add_documents(docs(&["a"]), vec![vec![1.0, 0.0]])
            .unwrap();
        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 1),
            Err(RagError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_opposite_vectors_score_negative_one() {
        let mut index = SimilarityIndex::new(2);
        index
            .add_documents(docs(&["neg"]), vec![vec![-1.0, 0.0]])
            .unwrap();
        let hits = index.search(&[1.0, 0.0], 1).unwrap();
        assert!((hits[0].score + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut v = vec![0.3, -1.2, 4.5, 0.01];
        normalize(&mut v);
        let once = v.clone();
        normalize(&mut v);
        for (a, b) in once.iter().zip(v.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_normalize_zero_vector() {
        let mut v = vec![0.0; 4];
        normalize(&mut v);
        assert_eq!(v, vec![0.0; 4]);
    }
}
