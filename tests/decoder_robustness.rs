mod common;

use common::*;
use petrify::*;
use proptest::prelude::*;

fn replay_bytes(bytes: &[u8]) -> Result<(), ReplayError> {
    let mut rerecorder = Rerecorder::new();
    let mut replayer = Replayer::new();
    let result = replayer.parse(&mut rerecorder, &mut NullResolver, bytes);
    rerecorder.finish();
    result
}

proptest! {
    // Guards against panics on corrupted/truncated inputs; not a substitute
    // for coverage-guided fuzzing.
    #[test]
    fn replay_never_panics_on_arbitrary_bytes(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
        let _ = replay_bytes(&data);
    }

    #[test]
    fn replay_never_panics_on_truncated_documents(cut in 0usize..4096) {
        let mut recorder = Recorder::new();
        record_graphics_fixture(&recorder, 0x100);
        recorder.finish();
        let doc = recorder.serialize().unwrap();

        let cut = cut.min(doc.len());
        let _ = replay_bytes(&doc[..cut]);
    }

    #[test]
    fn inspect_never_panics_on_arbitrary_bytes(data in proptest::collection::vec(any::<u8>(), 0..2048)) {
        let _ = inspect_document(&data);
    }
}

#[test]
fn full_document_replays_cleanly() {
    let mut recorder = Recorder::new();
    record_graphics_fixture(&recorder, 0x100);
    recorder.finish();
    let doc = recorder.serialize().unwrap();
    replay_bytes(&doc).unwrap();
}
