use std::sync::OnceLock;

use proptest::prelude::*;
use tunesmith_core::{
    Engine, GeneratedTrack,
    fixtures::{demo_config, demo_options, demo_track},
    persistence::{load_track, save_track},
};

fn fixture_track() -> &'static GeneratedTrack {
    static TRACK: OnceLock<GeneratedTrack> = OnceLock::new();
    TRACK.get_or_init(|| {
        let result = Engine::new(demo_config())
            .generate(&demo_options(), &mut |_: u8| {})
            .expect("demo generation should succeed")
            .into_result()
            .expect("demo generation should complete");
        demo_track(&result)
    })
}

fn no_panic_load(path: &std::path::Path) -> bool {
    std::panic::catch_unwind(|| {
        let _ = load_track(path);
    })
    .is_ok()
}

#[test]
fn saved_track_loads_back_unchanged() {
    let temp = tempfile::tempdir().expect("tempdir should be creatable");
    let path = temp.path().join("nested").join("demo.tunesmith.json");
    save_track(&path, fixture_track()).expect("saving fixture track should work");

    let loaded = load_track(&path).expect("loading fixture track should work");
    assert_eq!(&loaded, fixture_track());
    assert_eq!(loaded.title, "Night Drive");
    assert_eq!(loaded.waveform.len(), 100);
    assert_eq!(loaded.theme.as_deref(), Some("night drive"));
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn random_track_bytes_do_not_panic(raw in prop::collection::vec(any::<u8>(), 0..4096)) {
        let temp = tempfile::tempdir().expect("tempdir should be creatable");
        let path = temp.path().join("corrupt_random.tunesmith.json");
        std::fs::write(&path, raw).expect("writing random payload should work");
        prop_assert!(no_panic_load(&path));
    }

    #[test]
    fn truncated_track_payloads_do_not_panic(prefix_len in 0usize..8192usize) {
        let temp = tempfile::tempdir().expect("tempdir should be creatable");
        let path = temp.path().join("corrupt_truncated.tunesmith.json");
        save_track(&path, fixture_track()).expect("saving fixture track should work");

        let mut payload = std::fs::read(&path).expect("reading saved track should work");
        let truncated_len = prefix_len.min(payload.len());
        payload.truncate(truncated_len);
        std::fs::write(&path, payload).expect("writing truncated payload should work");

        prop_assert!(no_panic_load(&path));
    }

    #[test]
    fn mutated_track_payloads_do_not_panic(index in 0usize..8192usize, delta in any::<u8>()) {
        let temp = tempfile::tempdir().expect("tempdir should be creatable");
        let path = temp.path().join("corrupt_mutated.tunesmith.json");
        save_track(&path, fixture_track()).expect("saving fixture track should work");

        let mut payload = std::fs::read(&path).expect("reading saved track should work");
        if !payload.is_empty() {
            let target = index % payload.len();
            payload[target] ^= delta.max(1);
        }
        std::fs::write(&path, payload).expect("writing mutated payload should work");

        prop_assert!(no_panic_load(&path));
    }
}
