// This software is provided for non-commercial use only.
// Commercial use is strictly prohibited.
// If you use, modify, or redistribute this software, you must provide proper attribution to the original author.
// (c) 2026 Onur Tuna. All rights reserved.

use std::sync::Arc;

use tschan::channel::MIN_MAX_SEGMENT_SIZE;
use tschan::{Channel, ChannelConfig, FakeClock, FindOutcome, StoreError};

fn open_rw(dir: &std::path::Path, clock: Arc<FakeClock>, config: ChannelConfig) -> Channel {
    Channel::open(dir, "ch", false, config, clock).unwrap()
}

#[test]
fn append_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(0));
    let ch = open_rw(dir.path(), clock.clone(), ChannelConfig::default());

    let i0 = ch.append(100, b"hello").unwrap();
    let i1 = ch.append(200, b"world!").unwrap();
    assert_eq!(i0, 0);
    assert_eq!(i1, 1);

    let mut buf = [0u8; 5];
    let (n, time) = ch.read(i0, Some(&mut buf)).unwrap();
    assert_eq!(n, 5);
    assert_eq!(time, 100);
    assert_eq!(&buf, b"hello");

    let (size, time) = ch.read(i1, None).unwrap();
    assert_eq!(size, 6);
    assert_eq!(time, 200);

    assert_eq!(ch.range().unwrap(), (0, 1));
}

#[test]
fn rejects_out_of_order_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(0));
    let ch = open_rw(dir.path(), clock, ChannelConfig::default());

    ch.append(100, b"a").unwrap();
    let err = ch.append(50, b"b").unwrap_err();
    assert!(matches!(err, StoreError::OutOfOrderTime));
    // channel stays usable after a rejected append
    let idx = ch.append(150, b"c").unwrap();
    assert_eq!(idx, 1);
}

#[test]
fn rejects_equal_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(0));
    let ch = open_rw(dir.path(), clock, ChannelConfig::default());

    let idx = ch.append(500, b"a").unwrap();
    assert_eq!(idx, 0);
    let err = ch.append(500, b"b").unwrap_err();
    assert!(matches!(err, StoreError::OutOfOrderTime));
    let idx = ch.append(501, b"c").unwrap();
    assert_eq!(idx, 1);
}

#[test]
fn rolls_over_to_a_new_segment_when_size_exceeded() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(0));
    let config = ChannelConfig {
        max_segment_size: 1024 * 1024,
        retention_time: i64::MAX,
        retention_size: u64::MAX,
        ..ChannelConfig::default()
    };
    let ch = open_rw(dir.path(), clock.clone(), config);

    let payload = vec![0xABu8; 200_000];
    for i in 0..8 {
        ch.append(i * 10 + 1, &payload).unwrap();
    }
    let times = ch.segment_creation_times();
    assert!(times.len() >= 2, "expected a rollover to have occurred, got {} segments", times.len());
    let (begin, end) = ch.range().unwrap();
    assert_eq!(end - begin + 1, 8);
}

#[test]
fn evicts_oldest_segment_once_retention_size_exceeded() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(0));
    let config = ChannelConfig {
        max_segment_size: MIN_MAX_SEGMENT_SIZE,
        retention_time: i64::MAX,
        retention_size: MIN_MAX_SEGMENT_SIZE,
    };
    let ch = open_rw(dir.path(), clock.clone(), config);

    let payload = vec![0x11u8; 200_000];
    let mut first_index = None;
    for i in 0..20 {
        let idx = ch.append(i * 10 + 1, &payload).unwrap();
        if first_index.is_none() {
            first_index = Some(idx);
        }
        clock.advance(1);
    }

    let first_index = first_index.unwrap();
    // the first record's segment should have been evicted by now
    let err = ch.read(first_index, None).unwrap_err();
    assert!(matches!(err, StoreError::NotFound));

    let (begin, _end) = ch.range().unwrap();
    assert!(begin > first_index);
}

#[test]
fn find_bisects_to_the_correct_record() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(0));
    let ch = open_rw(dir.path(), clock, ChannelConfig::default());

    for i in 0..50 {
        ch.append(i * 100, format!("rec-{i}").as_bytes()).unwrap();
    }

    match ch.find(2500).unwrap() {
        FindOutcome::Exact { index, time } => {
            assert_eq!(time, 2500);
            assert_eq!(index, 25);
        }
        other => panic!("expected Exact, got {other:?}"),
    }

    match ch.find(2550).unwrap() {
        FindOutcome::Between { left, right } => {
            assert_eq!(left.0, 25);
            assert_eq!(right.0, 26);
        }
        other => panic!("expected Between, got {other:?}"),
    }

    match ch.find(-10).unwrap() {
        FindOutcome::Before { right } => assert_eq!(right.0, 0),
        other => panic!("expected Before, got {other:?}"),
    }

    match ch.find(1_000_000).unwrap() {
        FindOutcome::After { left } => assert_eq!(left.0, 49),
        other => panic!("expected After, got {other:?}"),
    }
}

#[test]
fn reopening_an_existing_channel_forces_read_only() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(0));
    {
        let ch = open_rw(dir.path(), clock.clone(), ChannelConfig::default());
        ch.append(10, b"one").unwrap();
        ch.append(20, b"two").unwrap();
        ch.finalize().unwrap();
    }

    let reopened = Channel::open(dir.path(), "ch", false, ChannelConfig::default(), clock).unwrap();
    assert!(!reopened.is_writable());
    assert_eq!(reopened.range().unwrap(), (0, 1));
    let err = reopened.append(30, b"three").unwrap_err();
    assert!(matches!(err, StoreError::ReadOnly));

    let (size, time) = reopened.read(1, None).unwrap();
    assert_eq!(size, 3);
    assert_eq!(time, 20);
}

#[test]
fn empty_channel_reports_empty() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(FakeClock::new(0));
    let ch = open_rw(dir.path(), clock, ChannelConfig::default());
    assert!(matches!(ch.range().unwrap_err(), StoreError::Empty));
    assert!(matches!(ch.find(0).unwrap_err(), StoreError::Empty));
}
