//! Expiration is re-checked on every resolution

use crate::common::*;
use std::time::Duration;

#[test]
fn memoized_image_flips_to_omitted_at_boundary() {
    let h = Harness::enabled(TtlDescriptor::hours(1));
    let lsn = h.committed_update(b"k", 100, b"old", b"new");
    let mut item = h.log_item(lsn);

    assert!(h.resolve(&mut item).before_image().is_some());
    assert!(item.memo().is_some());

    // one microsecond before expiry the memo is still served
    h.advance(HOUR - Duration::from_micros(1));
    assert!(h.resolve(&mut item).before_image().is_some());

    h.advance(Duration::from_micros(1));
    let record = h.resolve(&mut item);
    assert!(record.before_image().is_none());
    assert!(item.memo().unwrap().image.is_none());

    // later resolutions stay omitted
    h.advance(HOUR);
    assert!(h.resolve(&mut item).before_image().is_none());
}

#[test]
fn fresh_item_after_expiry_skips_store_lookup() {
    let h = Harness::enabled(TtlDescriptor::hours(1));
    let lsn = h.committed_update(b"k", 100, b"old", b"new");
    h.advance(HOUR);

    let mut item = h.log_item(lsn);
    assert!(h.resolve(&mut item).before_image().is_none());
    assert!(item.memo().is_none());
}

#[test]
fn ttl_rounds_up_to_whole_unit() {
    let h = Harness::enabled(TtlDescriptor::hours(1));
    // capture half an hour into an hour: expires at the next hour after +1h
    h.advance(HOUR / 2);
    let lsn = h.committed_update(b"k", 100, b"old", b"new");

    h.advance(HOUR);
    let mut item = h.log_item(lsn);
    assert!(h.resolve(&mut item).before_image().is_some());

    h.advance(HOUR / 2);
    assert!(h.resolve(&mut item).before_image().is_none());
}

#[test]
fn store_read_honours_expiry_without_wire_record() {
    let h = Harness::enabled(TtlDescriptor::days(1));
    h.committed_update(b"k", 100, b"old", b"new");
    let store = h.coordinator.store();
    assert!(store.get(Lsn::new(100), None).unwrap().is_some());

    h.advance(HOUR * 24);
    assert!(store.get(Lsn::new(100), None).unwrap().is_none());
}
