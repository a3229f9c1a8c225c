//! Property tests for chunk geometry and ingestion.

use std::sync::Arc;

use proptest::prelude::*;
use serene_rag::mock::HashEmbeddingProvider;
use serene_rag::{Chunker, Document, FixedSizeChunker, RagConfig, RecursiveChunker, initialize};

/// Chunk size and an overlap strictly smaller than it.
fn arb_geometry() -> impl Strategy<Value = (usize, usize)> {
    (2usize..120).prop_flat_map(|size| (Just(size), 0..size))
}

fn expected_count(len: usize, size: usize, overlap: usize) -> usize {
    match len {
        0 => 0,
        l if l <= size => 1,
        l => (l - overlap).div_ceil(size - overlap),
    }
}

fn prefix(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

fn suffix(text: &str, n: usize) -> String {
    let len = text.chars().count();
    text.chars().skip(len.saturating_sub(n)).collect()
}

/// *For any* text of `L` characters and valid `(C, O)`, fixed-size chunking
/// yields `ceil((L - O) / (C - O))` chunks of at most `C` characters, with
/// exactly `O` characters shared by consecutive chunks.
mod prop_fixed_geometry {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn count_length_and_overlap(
            text in "[a-zA-Z .,éü\n]{0,800}",
            (size, overlap) in arb_geometry(),
        ) {
            let chunker = FixedSizeChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&Document::new("doc", text.clone()));
            let len = text.chars().count();

            prop_assert_eq!(chunks.len(), expected_count(len, size, overlap));

            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert!(!chunk.text.is_empty());
                prop_assert!(chunk.char_len() <= size);
                prop_assert_eq!(chunk.index, i);
                prop_assert_eq!(&chunk.id, &format!("doc_{i}"));
            }

            for pair in chunks.windows(2) {
                prop_assert_eq!(suffix(&pair[0].text, overlap), prefix(&pair[1].text, overlap));
            }
        }

        #[test]
        fn chunks_reassemble_the_document(
            text in "[a-z \n]{1,600}",
            (size, overlap) in arb_geometry(),
        ) {
            let chunker = FixedSizeChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&Document::new("doc", text.clone()));

            let mut rebuilt = chunks[0].text.clone();
            for chunk in &chunks[1..] {
                rebuilt.extend(chunk.text.chars().skip(overlap));
            }
            prop_assert_eq!(rebuilt, text);
        }

        #[test]
        fn chunking_is_deterministic(
            text in "[a-z .\n]{0,400}",
            (size, overlap) in arb_geometry(),
        ) {
            let chunker = FixedSizeChunker::new(size, overlap).unwrap();
            let document = Document::new("doc", text);
            prop_assert_eq!(chunker.chunk(&document), chunker.chunk(&document));
        }
    }
}

/// *For any* text, recursive chunks are non-empty, within the size limit,
/// and appear in document order.
mod prop_recursive_bounds {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_fit_and_keep_order(
            text in "([a-z]{1,12}[ .!?\n]{1,3}){0,80}",
            (size, overlap) in arb_geometry(),
        ) {
            let chunker = RecursiveChunker::new(size, overlap).unwrap();
            let chunks = chunker.chunk(&Document::new("doc", text.clone()));

            if text.trim().is_empty() {
                prop_assert!(chunks.is_empty());
            }
            let mut last_start = 0;
            for chunk in &chunks {
                prop_assert!(!chunk.text.trim().is_empty());
                prop_assert!(chunk.char_len() <= size);
                prop_assert!(text.contains(&chunk.text));
                prop_assert!(chunk.start >= last_start);
                last_start = chunk.start;
            }
        }
    }
}

#[test]
fn default_geometry_on_a_long_document() {
    let text = "a".repeat(2600);
    let chunker = FixedSizeChunker::new(1000, 200).unwrap();
    let chunks = chunker.chunk(&Document::new("long", text));
    // Windows start at 0, 800, 1600; the third reaches the end.
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[2].start, 1600);
    assert_eq!(chunks[2].char_len(), 1000);
}

#[tokio::test]
async fn ingesting_a_corpus_indexes_every_chunk() {
    let config = RagConfig::builder().chunk_size(40).chunk_overlap(10).build().unwrap();
    let documents = vec![
        Document::new("breathing", "Deep breathing reduces anxiety. Slow exhales calm the body."),
        Document::new("empty", ""),
        Document::new("sleep", "Regular sleep supports mood."),
    ];

    let first =
        initialize(&documents, &config, Arc::new(HashEmbeddingProvider::default())).await.unwrap();
    let second =
        initialize(&documents, &config, Arc::new(HashEmbeddingProvider::default())).await.unwrap();

    let chunker = FixedSizeChunker::new(40, 10).unwrap();
    let expected: usize = documents.iter().map(|d| chunker.chunk(d).len()).sum();
    assert_eq!(first.len().await, expected);
    assert_eq!(first.chunks().await, second.chunks().await);
}
