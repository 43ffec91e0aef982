mod common;

use common::*;
use petrify::*;
use pretty_assertions::assert_eq;

#[test]
fn sampler_hash_survives_serialize_and_replay() {
    let mut recorder = Recorder::new();
    recorder
        .record_sampler(ObjectId(1), &sampler_fixture())
        .unwrap();
    recorder.finish();
    let original = recorder.get_hash_for_sampler(ObjectId(1)).unwrap();

    let document = recorder.serialize().unwrap();

    let mut rerecorder = Rerecorder::new();
    let mut replayer = Replayer::new();
    replayer
        .parse(&mut rerecorder, &mut NullResolver, &document)
        .unwrap();
    rerecorder.finish();

    let replayed = rerecorder
        .recorder
        .get_hash_for_sampler(ObjectId(1))
        .unwrap();
    assert_eq!(original, replayed);
}

#[test]
fn full_graphics_store_round_trips() {
    let mut recorder = Recorder::new();
    let ids = record_graphics_fixture(&recorder, 0x100);
    recorder.finish();

    let document = recorder.serialize().unwrap();

    let mut rerecorder = Rerecorder::new();
    let mut replayer = Replayer::new();
    replayer
        .parse(&mut rerecorder, &mut NullResolver, &document)
        .unwrap();
    rerecorder.finish();

    // Every object kind must land on the same content hashes after a full
    // serialize -> parse -> re-record cycle.
    assert_eq!(store_index(&recorder), store_index(&rerecorder.recorder));

    let original = recorder
        .get_hash_for_graphics_pipeline(ids.pipeline)
        .unwrap();
    let replayed_pipeline = rerecorder.last_graphics_pipeline.unwrap();
    let replayed = rerecorder
        .recorder
        .get_hash_for_graphics_pipeline(replayed_pipeline)
        .unwrap();
    assert_eq!(original, replayed);
}

#[test]
fn depth_bounds_do_not_affect_hash_under_dynamic_state() {
    let recorder = Recorder::new();
    let ids = record_graphics_fixture(&recorder, 0x100);

    let make_pipeline = |min_bounds: f32| {
        let mut info = graphics_pipeline_fixture(
            ids.pipeline_layout,
            ids.render_pass,
            ids.vertex_module,
            ids.fragment_module,
        );
        info.dynamic = Some(DynamicStateInfo {
            flags: 0,
            dynamic_states: vec![dynamic_state::DEPTH_BOUNDS],
        });
        if let Some(ds) = &mut info.depth_stencil {
            ds.depth_bounds_test_enable = 1;
            ds.min_depth_bounds = min_bounds;
        }
        info
    };

    recorder
        .record_graphics_pipeline(ObjectId(0x200), &make_pipeline(0.0))
        .unwrap();
    recorder
        .record_graphics_pipeline(ObjectId(0x201), &make_pipeline(0.5))
        .unwrap();

    let mut recorder = recorder;
    recorder.finish();

    assert_eq!(
        recorder
            .get_hash_for_graphics_pipeline(ObjectId(0x200))
            .unwrap(),
        recorder
            .get_hash_for_graphics_pipeline(ObjectId(0x201))
            .unwrap()
    );
}

#[test]
fn disabled_blend_attachment_fields_do_not_affect_hash() {
    let recorder = Recorder::new();
    let ids = record_graphics_fixture(&recorder, 0x100);

    let make_pipeline = |factor: u32, mask: u32| {
        let mut info = graphics_pipeline_fixture(
            ids.pipeline_layout,
            ids.render_pass,
            ids.vertex_module,
            ids.fragment_module,
        );
        info.color_blend = Some(ColorBlendState {
            attachments: vec![ColorBlendAttachment {
                blend_enable: 0,
                src_color_blend_factor: factor,
                color_write_mask: mask,
                ..Default::default()
            }],
            ..Default::default()
        });
        info
    };

    recorder
        .record_graphics_pipeline(ObjectId(0x300), &make_pipeline(2, 0xf))
        .unwrap();
    recorder
        .record_graphics_pipeline(ObjectId(0x301), &make_pipeline(9, 0x1))
        .unwrap();

    let mut recorder = recorder;
    recorder.finish();

    assert_eq!(
        recorder
            .get_hash_for_graphics_pipeline(ObjectId(0x300))
            .unwrap(),
        recorder
            .get_hash_for_graphics_pipeline(ObjectId(0x301))
            .unwrap()
    );

    // Two semantically identical pipelines insert one store entry.
    assert_eq!(store_index(&recorder).graphics_pipelines.len(), 2);
}

#[test]
fn swapping_immutable_sampler_changes_set_layout_hash() {
    let mut recorder = Recorder::new();
    recorder
        .record_sampler(ObjectId(1), &sampler_fixture())
        .unwrap();
    let other_sampler = SamplerCreateInfo {
        border_color: 2,
        ..sampler_fixture()
    };
    recorder.record_sampler(ObjectId(2), &other_sampler).unwrap();
    recorder
        .record_set_layout(ObjectId(3), &set_layout_fixture(ObjectId(1)))
        .unwrap();
    recorder
        .record_set_layout(ObjectId(4), &set_layout_fixture(ObjectId(2)))
        .unwrap();
    recorder.finish();

    assert_ne!(
        recorder.get_hash_for_set_layout(ObjectId(3)).unwrap(),
        recorder.get_hash_for_set_layout(ObjectId(4)).unwrap()
    );
}

#[test]
fn graphics_closure_replays_against_an_empty_resolver() {
    let mut recorder = Recorder::new();
    let ids = record_graphics_fixture(&recorder, 0x100);
    recorder.finish();

    let hash = recorder
        .get_hash_for_graphics_pipeline(ids.pipeline)
        .unwrap();
    let closure = recorder.serialize_graphics_pipeline(hash).unwrap();

    // Self-contained: every dependency is in the document, including stage
    // modules, so replay needs nothing from outside.
    let mut rerecorder = Rerecorder::new();
    let mut replayer = Replayer::new();
    replayer
        .parse(&mut rerecorder, &mut NullResolver, &closure)
        .unwrap();
    rerecorder.finish();

    let replayed_pipeline = rerecorder.last_graphics_pipeline.unwrap();
    assert_eq!(
        hash,
        rerecorder
            .recorder
            .get_hash_for_graphics_pipeline(replayed_pipeline)
            .unwrap()
    );

    let index = inspect_document(&closure).unwrap();
    assert_eq!(index.graphics_pipelines.len(), 1);
    assert_eq!(index.shader_modules.len(), 2);
    assert_eq!(index.render_passes.len(), 1);
    assert_eq!(index.pipeline_layouts.len(), 1);
    assert_eq!(index.set_layouts.len(), 1);
    assert_eq!(index.samplers.len(), 1);
}

#[test]
fn null_set_layout_references_round_trip() {
    let mut recorder = Recorder::new();
    recorder
        .record_sampler(ObjectId(1), &sampler_fixture())
        .unwrap();
    recorder
        .record_set_layout(ObjectId(2), &set_layout_fixture(ObjectId(1)))
        .unwrap();
    let layout = PipelineLayoutCreateInfo {
        set_layouts: vec![ObjectId::NULL, ObjectId(2)],
        ..Default::default()
    };
    recorder.record_pipeline_layout(ObjectId(3), &layout).unwrap();
    recorder.finish();
    let original = recorder.get_hash_for_pipeline_layout(ObjectId(3)).unwrap();

    let document = recorder.serialize().unwrap();
    let mut rerecorder = Rerecorder::new();
    let mut replayer = Replayer::new();
    replayer
        .parse(&mut rerecorder, &mut NullResolver, &document)
        .unwrap();
    rerecorder.finish();

    assert!(store_index(&rerecorder.recorder)
        .pipeline_layouts
        .contains(&original));
}
