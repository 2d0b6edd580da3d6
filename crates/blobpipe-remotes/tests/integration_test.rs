//! Integration tests for pipe-backed transfers.
//!
//! Every test drives the push side and the fetch side from different threads,
//! the way a caller has to.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use blobpipe_core::{with_label, CommitOpt, Descriptor, Digest, Info, MediaType};
use blobpipe_remotes::{
    copy, open, ContentWriter, CopyConfig, Fetcher, PipeResolver, Pusher, RemotesError, Resolved,
    Resolver, StaticResolver,
};
use proptest::prelude::*;

const PAYLOAD: &[u8; 10] = b"0123456789";

/// Descriptor `img:v1` resolves to in these tests.
fn image_descriptor() -> Descriptor {
    Descriptor::for_bytes(MediaType::layer_gzip(), PAYLOAD)
}

fn image_resolver() -> StaticResolver {
    StaticResolver::new().with_reference("img:v1", image_descriptor())
}

/// Resolver that always fails and counts its calls.
#[derive(Default)]
struct FailingResolver {
    calls: AtomicUsize,
}

#[async_trait]
impl Resolver for FailingResolver {
    async fn resolve(&self, reference: &str) -> blobpipe_remotes::Result<Resolved> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RemotesError::resolution(reference, "registry unreachable"))
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

#[tokio::test]
async fn test_push_commit_then_fetch_yields_payload() {
    let desc = image_descriptor();
    let (fetcher, mut pusher) = open(image_resolver(), "img:v1").await.unwrap();

    let push_desc = desc.clone();
    let writer = thread::spawn(move || {
        let content = pusher.push(&push_desc).unwrap();
        content.write_all(PAYLOAD).unwrap();
        content
            .commit(10, push_desc.digest.clone(), &[])
            .unwrap();
        pusher
    });

    let mut stream = fetcher.fetch(&desc).unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).unwrap();
    let pusher = writer.join().unwrap();

    assert_eq!(out, PAYLOAD);
    assert_eq!(pusher.digest(), desc.digest);

    let status = pusher.status().unwrap();
    assert_eq!(status.total, 10);
    assert_eq!(status.offset, 10);
    assert_eq!(status.expected, desc.digest);

    let mut buf = [0u8; 1];
    assert_eq!(stream.read(&mut buf).unwrap(), 0);
}

#[tokio::test]
async fn test_failing_commit_option_keeps_reader_blocked() {
    let (fetcher, mut pusher) = open(image_resolver(), "img:v1").await.unwrap();
    let mut stream = fetcher.fetch(fetcher.descriptor()).unwrap();

    let (tx, rx) = mpsc::channel();
    let reader = thread::spawn(move || {
        let mut buf = [0u8; 16];
        let n = stream.read(&mut buf).unwrap();
        tx.send(n).unwrap();
    });

    let failing: CommitOpt = Box::new(|_info: &mut Info| {
        Err(blobpipe_core::Error::InvalidLabel {
            key: "any".to_string(),
            reason: "always fails".to_string(),
        })
    });
    let err = pusher
        .commit(10, image_descriptor().digest, &[failing])
        .unwrap_err();
    assert!(matches!(err, RemotesError::CommitOption { .. }));
    assert!(pusher.digest().is_empty());

    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    pusher.close().unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 0);
    reader.join().unwrap();
}

#[tokio::test]
async fn test_commit_labels_become_annotations() {
    let (fetcher, mut pusher) = open(image_resolver(), "img:v1").await.unwrap();
    let mut stream = fetcher.fetch(fetcher.descriptor()).unwrap();
    let reader = thread::spawn(move || {
        let mut out = Vec::new();
        stream.read_to_end(&mut out).unwrap();
        out
    });

    pusher.push(&image_descriptor()).unwrap();
    pusher.write_all(PAYLOAD).unwrap();
    pusher
        .commit(
            10,
            image_descriptor().digest,
            &[with_label("org.opencontainers.image.title", "layer.tar.gz")],
        )
        .unwrap();

    assert_eq!(reader.join().unwrap(), PAYLOAD);
    assert_eq!(
        pusher.descriptor().annotation("org.opencontainers.image.title"),
        Some("layer.tar.gz")
    );
}

#[tokio::test]
async fn test_resolution_error_propagates_unchanged() {
    let resolver = Arc::new(FailingResolver::default());

    let err = open(Arc::clone(&resolver), "img:v1").await.unwrap_err();
    match err {
        RemotesError::Resolution { reference, reason } => {
            assert_eq!(reference, "img:v1");
            assert_eq!(reason, "registry unreachable");
        }
        other => panic!("expected resolution error, got {other:?}"),
    }
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pusher_without_fetcher_is_detected() {
    let bridge = PipeResolver::new(image_resolver());
    assert!(matches!(
        bridge.pusher("img:v1"),
        Err(RemotesError::Precondition { .. })
    ));
}

#[tokio::test]
async fn test_truncate_never_succeeds() {
    let (_fetcher, mut pusher) = open(image_resolver(), "img:v1").await.unwrap();
    pusher.push(&image_descriptor()).unwrap();
    let before = pusher.status().unwrap();

    assert!(matches!(
        pusher.truncate(0),
        Err(RemotesError::NotSupported { .. })
    ));
    assert!(matches!(
        pusher.truncate(10),
        Err(RemotesError::NotSupported { .. })
    ));
    assert_eq!(pusher.status().unwrap(), before);
    assert_eq!(pusher.descriptor(), &image_descriptor());
}

#[tokio::test]
async fn test_close_twice_neither_panics_nor_blocks() {
    let (fetcher, mut pusher) = open(image_resolver(), "img:v1").await.unwrap();

    assert!(pusher.close().is_ok());
    assert!(pusher.close().is_ok());

    let mut out = Vec::new();
    fetcher
        .fetch(fetcher.descriptor())
        .unwrap()
        .read_to_end(&mut out)
        .unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_write_after_commit_fails() {
    let (fetcher, mut pusher) = open(image_resolver(), "img:v1").await.unwrap();
    let _stream = fetcher.fetch(fetcher.descriptor()).unwrap();

    pusher.commit(0, Digest::empty(), &[]).unwrap();
    let err = pusher.write(b"late").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    assert_eq!(pusher.status().unwrap().total, 0);
}

#[tokio::test]
async fn test_copy_between_two_pipes() {
    let desc = image_descriptor();

    // Upstream pipe: a producer thread pushes the payload.
    let (source, mut producer) = open(image_resolver(), "img:v1").await.unwrap();
    // Downstream pipe: copy() pushes into it, a consumer thread reads it.
    let (sink, mut destination) = open(image_resolver(), "img:v1").await.unwrap();

    let produce_desc = desc.clone();
    let producer = thread::spawn(move || {
        let content = producer.push(&produce_desc).unwrap();
        for chunk in PAYLOAD.chunks(3) {
            content.write_all(chunk).unwrap();
        }
        content
            .commit(10, produce_desc.digest.clone(), &[])
            .unwrap();
    });

    let mut downstream = sink.fetch(&desc).unwrap();
    let consumer = thread::spawn(move || {
        let mut out = Vec::new();
        downstream.read_to_end(&mut out).unwrap();
        out
    });

    let copied = copy(
        &source,
        &desc,
        &mut destination,
        &CopyConfig::default().with_buffer_size(4),
    )
    .unwrap();

    producer.join().unwrap();
    assert_eq!(consumer.join().unwrap(), PAYLOAD);
    assert_eq!(copied.digest, desc.digest);
    assert_eq!(copied.size, 10);
    assert_eq!(destination.digest(), desc.digest);
}

#[tokio::test]
async fn test_copy_aborts_downstream_on_corrupt_source() {
    let desc = image_descriptor();
    let (source, mut producer) = open(image_resolver(), "img:v1").await.unwrap();
    let (sink, mut destination) = open(image_resolver(), "img:v1").await.unwrap();

    let producer = thread::spawn(move || {
        let content = producer.push(&image_descriptor()).unwrap();
        content.write_all(b"9876543210").unwrap();
        content.close().unwrap();
    });

    let mut downstream = sink.fetch(&desc).unwrap();
    let consumer = thread::spawn(move || {
        let mut out = Vec::new();
        downstream.read_to_end(&mut out).map(|_| out)
    });

    let err = copy(&source, &desc, &mut destination, &CopyConfig::default()).unwrap_err();
    assert!(matches!(err, RemotesError::DigestMismatch { .. }));

    producer.join().unwrap();
    let downstream_err = consumer.join().unwrap().unwrap_err();
    assert_eq!(downstream_err.kind(), std::io::ErrorKind::BrokenPipe);
    assert!(destination.digest().is_empty());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn written_bytes_arrive_intact_and_in_order(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..256), 0..16),
        read_size in 1usize..64,
    ) {
        let rt = runtime();
        let (fetcher, mut pusher) = rt.block_on(open(image_resolver(), "img:v1")).unwrap();
        let expected: Vec<u8> = chunks.concat();
        let size = expected.len() as u64;

        let writer = thread::spawn(move || {
            for chunk in &chunks {
                pusher.write_all(chunk).unwrap();
            }
            pusher.commit(size, Digest::empty(), &[]).unwrap();
            pusher.status().unwrap()
        });

        let mut stream = fetcher.fetch(fetcher.descriptor()).unwrap();
        let mut out = Vec::new();
        let mut buf = vec![0u8; read_size];
        loop {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }

        let status = writer.join().unwrap();
        prop_assert_eq!(out, expected);
        prop_assert_eq!(status.total, size);
        prop_assert_eq!(status.offset, size);
    }
}
