// Rolling history buffer: FIFO eviction and ordering

use dataview::history::HistoryBuffer;

#[test]
fn capacity_five_keeps_last_five_in_order() {
    let mut buf = HistoryBuffer::new(5);
    for (i, v) in [10.0, 20.0, 30.0, 40.0, 50.0, 60.0].into_iter().enumerate() {
        buf.append(v, i as u64);
    }
    assert_eq!(buf.values(), vec![20.0, 30.0, 40.0, 50.0, 60.0]);
    let timestamps: Vec<u64> = buf.snapshot().iter().map(|s| s.timestamp).collect();
    assert_eq!(timestamps, vec![1, 2, 3, 4, 5]);
}

#[test]
fn length_never_exceeds_capacity() {
    let mut buf = HistoryBuffer::new(4);
    for i in 0..100u64 {
        buf.append(i as f64, i);
        assert!(buf.len() <= 4);
    }
    assert_eq!(buf.len(), 4);
    assert_eq!(buf.values(), vec![96.0, 97.0, 98.0, 99.0]);
}

#[test]
fn below_capacity_keeps_everything() {
    let mut buf = HistoryBuffer::new(60);
    buf.append(1.5, 100);
    buf.append(2.5, 200);
    assert_eq!(buf.len(), 2);
    assert_eq!(buf.capacity(), 60);
    assert_eq!(buf.latest().map(|s| s.value), Some(2.5));
}

#[test]
fn empty_buffer_has_no_latest() {
    let buf = HistoryBuffer::new(3);
    assert!(buf.is_empty());
    assert!(buf.latest().is_none());
    assert!(buf.snapshot().is_empty());
}
