mod common;

use std::thread;

use common::*;
use petrify::*;

/// Distinct sampler contents, indexed by `i % DISTINCT`.
const DISTINCT: u64 = 32;

fn sampler_variant(index: u64) -> SamplerCreateInfo {
    SamplerCreateInfo {
        mag_filter: (index % 2) as u32,
        min_filter: ((index / 2) % 2) as u32,
        mipmap_mode: ((index / 4) % 2) as u32,
        address_mode_u: ((index / 8) % 4) as u32,
        max_lod: index as f32,
        ..Default::default()
    }
}

#[test]
fn concurrent_producers_deduplicate_by_content() {
    const THREADS: u64 = 4;
    const PER_THREAD: u64 = 2500;

    let mut recorder = Recorder::new();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let recorder = &recorder;
            scope.spawn(move || {
                for i in 0..PER_THREAD {
                    let serial = t * PER_THREAD + i;
                    let handle = ObjectId(1 + serial);
                    recorder
                        .record_sampler(handle, &sampler_variant(serial % DISTINCT))
                        .unwrap();
                }
            });
        }
    });

    recorder.finish();

    // Store size equals the number of distinct contents.
    let index = store_index(&recorder);
    assert_eq!(index.samplers.len(), DISTINCT as usize);

    // Every submitted handle maps to the hash of its content.
    let expected: Vec<Hash> = (0..DISTINCT)
        .map(|variant| {
            recorder
                .get_hash_for_sampler(ObjectId(1 + variant))
                .unwrap()
        })
        .collect();
    for serial in 0..THREADS * PER_THREAD {
        let hash = recorder.get_hash_for_sampler(ObjectId(1 + serial)).unwrap();
        assert_eq!(hash, expected[(serial % DISTINCT) as usize]);
    }
}

#[test]
fn worker_persists_closure_documents() {
    let dir = tempfile::tempdir().unwrap();

    let mut recorder = Recorder::new();
    recorder.set_serialization_path(dir.path());
    let ids = record_graphics_fixture(&recorder, 0x100);
    recorder.finish();

    let pipeline_hash = recorder
        .get_hash_for_graphics_pipeline(ids.pipeline)
        .unwrap();
    let vertex_hash = recorder
        .get_hash_for_shader_module(ids.vertex_module)
        .unwrap();

    let pipeline_path = dir.path().join(format!("{pipeline_hash:016X}.json"));
    let vertex_path = dir.path().join(format!("{vertex_hash:016X}.json"));
    assert!(pipeline_path.exists(), "missing {}", pipeline_path.display());
    assert!(vertex_path.exists(), "missing {}", vertex_path.display());

    // The on-disk pipeline document is a replayable closure.
    let bytes = std::fs::read(&pipeline_path).unwrap();
    let mut rerecorder = Rerecorder::new();
    let mut replayer = Replayer::new();
    replayer
        .parse(&mut rerecorder, &mut NullResolver, &bytes)
        .unwrap();
    rerecorder.finish();

    let replayed_pipeline = rerecorder.last_graphics_pipeline.unwrap();
    assert_eq!(
        pipeline_hash,
        rerecorder
            .recorder
            .get_hash_for_graphics_pipeline(replayed_pipeline)
            .unwrap()
    );
}

#[test]
fn without_serialization_path_nothing_is_written() {
    let dir = tempfile::tempdir().unwrap();

    let mut recorder = Recorder::new();
    record_graphics_fixture(&recorder, 0x100);
    recorder.finish();

    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
