//! Property tests for semantic index search ordering.

use std::sync::Arc;

use proptest::prelude::*;
use serene_rag::mock::HashEmbeddingProvider;
use serene_rag::{Chunk, EmbeddingProvider, SemanticIndex, cosine_similarity};

fn arb_chunk() -> impl Strategy<Value = Chunk> {
    ("[a-z]{3,8}", "[a-z ]{5,40}").prop_map(|(id, text)| Chunk::from_text(id, text))
}

/// *For any* set of chunks in a [`SemanticIndex`], a search returns at most
/// `top_k` results ordered by descending cosine similarity, each scored
/// against the query's own embedding.
mod prop_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            chunks in proptest::collection::vec(arb_chunk(), 1..20),
            query in "[a-z ]{1,30}",
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, query_vector, stored) = rt.block_on(async {
                let embedder = Arc::new(HashEmbeddingProvider::new(DIM));
                let index = SemanticIndex::new(embedder.clone());
                index.add(&chunks).await.unwrap();
                let results = index.search(&query, top_k).await.unwrap();
                let query_vector = embedder.embed(&query).await.unwrap();
                (results, query_vector, index.len().await)
            });

            prop_assert_eq!(stored, chunks.len());
            prop_assert_eq!(results.len(), top_k.min(chunks.len()));

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }

            let rt = tokio::runtime::Runtime::new().unwrap();
            for result in &results {
                let vector =
                    rt.block_on(HashEmbeddingProvider::new(DIM).embed(&result.chunk.text)).unwrap();
                let expected = cosine_similarity(&vector, &query_vector);
                prop_assert!((result.score - expected).abs() < 1e-5);
            }
        }
    }
}

#[tokio::test]
async fn identical_text_ranks_first() {
    let index = SemanticIndex::new(Arc::new(HashEmbeddingProvider::default()));
    index
        .add(&[
            Chunk::from_text("sleep", "Regular sleep supports a stable mood."),
            Chunk::from_text("breathing", "Deep breathing reduces anxiety."),
            Chunk::from_text("walks", "Short walks outside can lift energy."),
        ])
        .await
        .unwrap();

    let results = index.search("Deep breathing reduces anxiety.", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk.id, "breathing");
    assert!((results[0].score - 1.0).abs() < 1e-5);
}

#[tokio::test]
async fn concurrent_searches_share_the_index() {
    let index = Arc::new(SemanticIndex::new(Arc::new(HashEmbeddingProvider::default())));
    index.add(&[Chunk::from_text("breathing", "Deep breathing reduces anxiety.")]).await.unwrap();

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let index = Arc::clone(&index);
            tokio::spawn(async move { index.search(&format!("calm down {i}"), 4).await })
        })
        .collect();

    for handle in handles {
        let results = handle.await.unwrap().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "breathing");
    }
}
