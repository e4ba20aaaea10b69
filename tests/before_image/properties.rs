//! Property tests over capture and resolution

use crate::common::*;
use proptest::prelude::*;
use std::time::Duration;

fn updates() -> impl Strategy<Value = Vec<(Vec<u8>, Vec<u8>)>> {
    prop::collection::vec(
        (
            prop::collection::vec(any::<u8>(), 0..64),
            prop::collection::vec(any::<u8>(), 0..64),
        ),
        1..24,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn every_capture_is_retrievable(updates in updates()) {
        let h = Harness::enabled(TtlDescriptor::days(1));
        for (i, (old, new)) in updates.iter().enumerate() {
            let key = format!("key-{i}");
            h.committed_update(key.as_bytes(), 10 + i as u64, old, new);
        }

        let stats = h.coordinator.stats(false);
        prop_assert_eq!(stats.records, updates.len() as u64);
        prop_assert_eq!(stats.by_update, updates.len() as u64);

        for (i, (old, _)) in updates.iter().enumerate() {
            let bytes = h.coordinator.store().get(Lsn::new(10 + i as u64), None).unwrap();
            let payload = BeforeImagePayload::unmarshal(bytes.as_deref()).unwrap().unwrap();
            prop_assert_eq!(payload.image(), Some(old.as_slice()));
            prop_assert_eq!(payload.modification_time(), START);
        }
    }

    #[test]
    fn image_ships_only_before_expiry(hours in 1u32..48, elapsed_secs in 0u64..(72 * 3_600)) {
        let h = Harness::enabled(TtlDescriptor::hours(hours));
        let lsn = h.committed_update(b"k", 5, b"old", b"new");
        h.advance(Duration::from_secs(elapsed_secs));

        let mut item = h.log_item(lsn);
        let record = h.resolve(&mut item);
        let live = elapsed_secs < u64::from(hours) * 3_600;
        prop_assert_eq!(record.before_image().is_some(), live);
        prop_assert_eq!(item.memo().is_some(), live);
    }
}
