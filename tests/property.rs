//! Property-based tests for message framing.
//!
//! Whatever the chunk sizes on either side, a message sent in chunks comes
//! back as exactly one message with the same bytes and kind.

mod harness;

use harness::{URI, client_with, echo_client};
use proptest::prelude::*;
use wsframe::connection::{ChunkSplitter, MessageAccumulator};
use wsframe::{Config, MessageKind};

fn kind_strategy() -> impl Strategy<Value = MessageKind> {
    prop_oneof![Just(MessageKind::Binary), Just(MessageKind::Text)]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    // =========================================================================
    // Property 1: splitter output covers the payload exactly once
    // =========================================================================
    #[test]
    fn test_splitter_covers_payload(
        payload in prop::collection::vec(any::<u8>(), 0..2000),
        chunk_size in 1usize..300,
    ) {
        let splitter = ChunkSplitter::new(&payload, chunk_size);
        let expected_count = splitter.chunk_count();
        let chunks: Vec<_> = splitter.collect();

        prop_assert_eq!(chunks.len(), expected_count);
        prop_assert!(chunks.iter().all(|c| c.data.len() <= chunk_size));
        prop_assert_eq!(chunks.iter().filter(|c| c.end_of_message).count(), 1);
        prop_assert!(chunks.last().is_some_and(|c| c.end_of_message));

        let joined: Vec<u8> = chunks.iter().flat_map(|c| c.data.iter().copied()).collect();
        prop_assert_eq!(joined, payload);
    }

    // =========================================================================
    // Property 2: accumulator rebuilds what the splitter produced
    // =========================================================================
    #[test]
    fn test_accumulator_rebuilds_split_message(
        payload in prop::collection::vec(any::<u8>(), 0..2000),
        chunk_size in 1usize..300,
        kind in kind_strategy(),
    ) {
        let mut accumulator = MessageAccumulator::new(payload.len().max(1));
        let mut completed = Vec::new();

        for chunk in ChunkSplitter::new(&payload, chunk_size) {
            if let Some(done) = accumulator.push(chunk.data, kind, chunk.end_of_message).unwrap() {
                completed.push((done, accumulator.message().to_vec()));
                accumulator.reset();
            }
        }

        prop_assert_eq!(completed.len(), 1);
        prop_assert_eq!(completed[0].0, kind);
        prop_assert_eq!(&completed[0].1, &payload);
        prop_assert!(!accumulator.is_assembling());
    }

    // =========================================================================
    // Property 3: oversized messages are always rejected
    // =========================================================================
    #[test]
    fn test_accumulator_enforces_limit(
        max in 1usize..500,
        extra in 1usize..100,
        chunk_size in 1usize..64,
    ) {
        let payload = vec![0u8; max + extra];
        let mut accumulator = MessageAccumulator::new(max);

        let rejected = ChunkSplitter::new(&payload, chunk_size)
            .map(|c| accumulator.push(c.data, MessageKind::Binary, c.end_of_message))
            .any(|r| r.is_err());
        prop_assert!(rejected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    // =========================================================================
    // Property 4: end-to-end echo through the client
    // =========================================================================
    #[test]
    fn test_client_echo_roundtrip(
        payload in prop::collection::vec(any::<u8>(), 0..5000),
        send_chunk in 1usize..700,
        receive_chunk in 1usize..700,
    ) {
        let config = Config::new()
            .with_send_chunk_size(send_chunk)
            .with_receive_chunk_size(receive_chunk);

        let (received, sent_chunks) = runtime().block_on(async {
            let (client, peer, recorder) = echo_client(config).await;
            client.send_binary(&payload).await.unwrap();
            recorder.wait_for(1).await;
            client.disconnect().await;
            (recorder.binary(), peer.sent().len())
        });

        prop_assert_eq!(sent_chunks, payload.len().div_ceil(send_chunk).max(1));
        prop_assert_eq!(received, vec![payload]);
    }

    // =========================================================================
    // Property 5: text survives arbitrary chunk boundaries
    // =========================================================================
    #[test]
    fn test_client_text_split_inside_code_points(
        text in "\\PC{0,200}",
        receive_chunk in 1usize..8,
    ) {
        let received = runtime().block_on(async {
            let (client, peer) = client_with(Config::new().with_receive_chunk_size(receive_chunk));
            let recorder = harness::Recorder::new();
            client.subscribe_text(recorder.clone());
            client.connect(URI).await.unwrap();

            peer.send_text(&text);
            recorder.wait_for(1).await;
            client.disconnect().await;
            recorder.text()
        });

        prop_assert_eq!(received, vec![text]);
    }
}
