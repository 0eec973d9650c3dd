// Tests for the transcript store: append/clear atomicity and seeding.

use lecture_bridge::transcript::{TimedSegment, TimedWord, TranscriptStore};

#[tokio::test]
async fn append_clears_the_interim_caption() {
    let store = TranscriptStore::new();
    store.set_interim("in progress".to_string()).await;

    store.append_final("committed".to_string(), 0.95).await;

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].text, "committed");
    assert!(snapshot.items[0].is_final);
    assert!(snapshot.items[0].timestamp.is_some());
    assert_eq!(snapshot.interim, "");
}

#[tokio::test]
async fn items_get_unique_ids() {
    let store = TranscriptStore::new();
    store.append_final("one".to_string(), 1.0).await;
    store.append_final("two".to_string(), 1.0).await;

    let snapshot = store.snapshot().await;
    assert_ne!(snapshot.items[0].id, snapshot.items[1].id);
}

#[tokio::test]
async fn clear_empties_everything() {
    let store = TranscriptStore::new();
    store.append_final("one".to_string(), 1.0).await;
    store.set_interim("two".to_string()).await;

    store.clear().await;

    let snapshot = store.snapshot().await;
    assert!(snapshot.items.is_empty());
    assert_eq!(snapshot.interim, "");
    assert!(snapshot.timed_words.is_empty());
}

#[tokio::test]
async fn seeding_splits_into_sentences() {
    let store = TranscriptStore::new();
    store.set_interim("stale".to_string()).await;

    store
        .seed_plain("First sentence. Second one! A third? And a trailing fragment")
        .await;

    let snapshot = store.snapshot().await;
    let texts: Vec<&str> = snapshot.items.iter().map(|i| i.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "First sentence.",
            "Second one!",
            "A third?",
            "And a trailing fragment"
        ]
    );
    assert_eq!(snapshot.interim, "");
}

#[tokio::test]
async fn seeding_unpunctuated_text_yields_one_item() {
    let store = TranscriptStore::new();
    store.seed_plain("just a fragment with no terminator").await;

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].text, "just a fragment with no terminator");
}

#[tokio::test]
async fn timed_seeding_keeps_word_timings() {
    let store = TranscriptStore::new();
    let words = vec![
        TimedWord {
            word: "hello".to_string(),
            start: 0.0,
            end: 0.4,
        },
        TimedWord {
            word: "world".to_string(),
            start: 0.4,
            end: 0.9,
        },
    ];
    let segments = vec![TimedSegment {
        transcript: "hello world".to_string(),
        words: words.clone(),
    }];

    store.seed_timed("hello world", words, segments).await;

    let snapshot = store.snapshot().await;
    assert_eq!(snapshot.items.len(), 1);
    assert_eq!(snapshot.items[0].text, "hello world");
    assert_eq!(snapshot.timed_words.len(), 2);
    assert_eq!(snapshot.timed_segments.len(), 1);
}
