//! Integration tests for berrymed-oximeter.
//!
//! These tests run whole streams through splitter, decoder, reader and sinks.

use berrymed_oximeter::codec::{JsonCodec, MsgPackCodec};
use berrymed_oximeter::protocol::{build_stream, chunks, frame_candidates, Packet};
use berrymed_oximeter::sink::{FnSink, JsonLinesSink, MsgPackSink};
use berrymed_oximeter::transport::{ChannelSource, ReaderSource};
use berrymed_oximeter::{shutdown_channel, BitOrder, Decoder, Framing, PulseReader, Sample};
use bytes::Bytes;
use chrono::Utc;
use std::time::Duration;

fn sample(i: u8) -> Sample {
    Sample {
        signal_strength: i % 16,
        has_signal: i % 2 == 0,
        probe_unplugged: false,
        pulse_beep: i % 5 == 0,
        pleth: i.wrapping_mul(7) % 128,
        bargraph: i % 16,
        no_finger: false,
        pulse_research: i % 3 == 0,
        pulse_rate: 50u8.wrapping_add(i.wrapping_mul(3)),
        spo2: 85 + i % 15,
        timestamp: Utc::now(),
    }
}

fn encoded(order: BitOrder, n: u8) -> Vec<Packet> {
    (0..n)
        .map(|i| Packet::encode(&sample(i), order).unwrap())
        .collect()
}

/// Compare everything but the decode timestamp.
fn same_fields(a: &Sample, b: &Sample) -> bool {
    Sample {
        timestamp: b.timestamp,
        ..*a
    } == *b
}

/// Documented splitting example.
#[test]
fn test_reference_split_example() {
    let data = [0x2, 0x1, 0x3, 0x2, 0x1, 0x3, 0x2, 0x1, 0x3];
    let groups: Vec<Vec<u8>> = chunks(&data, |b| b == 3).map(<[u8]>::to_vec).collect();
    assert_eq!(
        groups,
        vec![vec![2, 1], vec![3, 2, 1], vec![3, 2, 1], vec![3]]
    );
}

/// Synced stream: every packet is recovered with its fields.
#[test]
fn test_stream_decodes_every_packet() {
    for order in [BitOrder::SyncFirst, BitOrder::SyncLast] {
        let pkts = encoded(order, 40);
        let stream = build_stream(&pkts);
        let decoder = Decoder::new(order);

        let decoded: Vec<Sample> = frame_candidates(&stream, order)
            .map(|g| decoder.decode(g).unwrap())
            .collect();

        assert_eq!(decoded.len(), 40);
        for (i, s) in decoded.iter().enumerate() {
            assert!(same_fields(&sample(i as u8), s), "{order:?} packet {i}");
        }
    }
}

/// Groups concatenate back to the delivery regardless of alignment.
#[test]
fn test_split_preserves_bytes() {
    let stream = build_stream(&encoded(BitOrder::SyncFirst, 10));
    for start in 0..7 {
        let slice = &stream[start..];
        let joined: Vec<u8> = frame_candidates(slice, BitOrder::SyncFirst)
            .flatten()
            .copied()
            .collect();
        assert_eq!(joined, slice);
    }
}

/// Notifications of 18 bytes that do not line up with packets.
#[test]
fn test_misaligned_notifications() {
    let pkts = encoded(BitOrder::SyncFirst, 30);
    let stream = build_stream(&pkts);
    // Start mid-packet, as a freshly subscribed client would
    let stream = stream.slice(2..);

    let mut per_delivery = PulseReader::default();
    let mut carry_over = PulseReader::builder().framing(Framing::CarryOver).build();
    let mut a: Vec<Sample> = Vec::new();
    let mut b: Vec<Sample> = Vec::new();

    for chunk in stream.chunks(18) {
        per_delivery.process(chunk, &mut a).unwrap();
        carry_over.process(chunk, &mut b).unwrap();
    }
    carry_over.finish(&mut b).unwrap();

    // Carry-over loses only the leading partial packet
    assert_eq!(b.len(), 29);
    for (s, i) in b.iter().zip(1u8..) {
        assert!(same_fields(&sample(i), s));
    }

    // Per-delivery loses every packet cut by a delivery edge
    assert!(a.len() < b.len());
    assert!(per_delivery.stats().framing_mismatches > 0);
    assert_eq!(per_delivery.stats().samples, a.len() as u64);
}

/// Reading with the other convention does not yield the same samples.
#[test]
fn test_bit_orders_are_not_interoperable() {
    let pkts = encoded(BitOrder::SyncFirst, 20);
    let stream = build_stream(&pkts);

    let mut right = PulseReader::builder().bit_order(BitOrder::SyncFirst).build();
    let mut wrong = PulseReader::builder().bit_order(BitOrder::SyncLast).build();
    let mut a: Vec<Sample> = Vec::new();
    let mut b: Vec<Sample> = Vec::new();

    right.process(&stream, &mut a).unwrap();
    wrong.process(&stream, &mut b).unwrap();

    assert_eq!(a.len(), 20);
    let matching = b
        .iter()
        .zip(0u8..)
        .filter(|(s, i)| same_fields(&sample(*i), s))
        .count();
    assert!(matching < 20);
}

/// Pulse rate crosses the 7-bit boundary through the carry bit.
#[test]
fn test_pulse_rate_above_127() {
    let mut s = sample(0);
    s.pulse_rate = 183;
    let packet = Packet::encode(&s, BitOrder::SyncFirst).unwrap();
    let decoded = Decoder::new(BitOrder::SyncFirst)
        .decode(packet.as_ref())
        .unwrap();
    assert_eq!(decoded.pulse_rate, 183);
}

/// Capture file → reader → JSON lines.
#[tokio::test]
async fn test_capture_to_json_lines() {
    let stream = build_stream(&encoded(BitOrder::SyncFirst, 12));
    let mut source = ReaderSource::new(&stream[..]);
    let mut sink = JsonLinesSink::new(Vec::new());
    let mut reader = PulseReader::builder()
        .framing(Framing::CarryOver)
        .poll_interval(Duration::ZERO)
        .build();

    let (_handle, signal) = shutdown_channel();
    let stats = reader.run(&mut source, &mut sink, signal).await.unwrap();

    assert_eq!(stats.samples, 12);
    assert_eq!(stats.bytes, 60);
    assert_eq!(sink.written(), 12);

    let out = sink.into_inner();
    let lines: Vec<Sample> = out
        .split(|&b| b == b'\n')
        .filter(|l| !l.is_empty())
        .map(|l| JsonCodec::decode(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 12);
    assert!(same_fields(&sample(11), &lines[11]));
}

/// Capture file → reader → MessagePack stream, cut mid-packet.
#[tokio::test]
async fn test_capture_to_msgpack() {
    let stream = build_stream(&encoded(BitOrder::SyncLast, 9));
    let mut source = ReaderSource::with_read_size(&stream[..], 7);
    let mut sink = MsgPackSink::new(Vec::new());
    let mut reader = PulseReader::builder()
        .bit_order(BitOrder::SyncLast)
        .framing(Framing::CarryOver)
        .poll_interval(Duration::ZERO)
        .build();

    let (_handle, signal) = shutdown_channel();
    let stats = reader.run(&mut source, &mut sink, signal).await.unwrap();
    assert_eq!(stats.samples, 9);
    assert_eq!(stats.framing_mismatches, 0);

    let out = sink.into_inner();
    let mut rest = &out[..];
    for i in 0..9u8 {
        let s: Sample = MsgPackCodec::decode_from(&mut rest).unwrap();
        assert!(same_fields(&sample(i), &s), "sample {i}");
    }
    assert!(rest.is_empty());
}

/// Notification callback → channel → reader → closure sink.
#[tokio::test]
async fn test_notification_channel_pipeline() {
    let (tx, mut source) = ChannelSource::new();
    let stream = build_stream(&encoded(BitOrder::SyncFirst, 8));

    let producer = tokio::spawn(async move {
        for chunk in stream.chunks(5) {
            tx.send(Bytes::copy_from_slice(chunk)).await.unwrap();
        }
    });

    let mut rates = Vec::new();
    let (_handle, signal) = shutdown_channel();
    let stats = {
        let mut sink = FnSink(|s: Sample| rates.push(s.pulse_rate));
        let mut reader = PulseReader::builder()
            .poll_interval(Duration::ZERO)
            .build();
        reader.run(&mut source, &mut sink, signal).await.unwrap()
    };
    producer.await.unwrap();

    assert_eq!(stats.samples, 8);
    let expected: Vec<u8> = (0..8).map(|i| sample(i).pulse_rate).collect();
    assert_eq!(rates, expected);
}
