#![allow(dead_code)]

use std::collections::HashMap;

use petrify::*;

/// Scenario fixture: LINEAR mag filter, NEAREST min filter, 16x anisotropy,
/// LESS compare, everything else zero.
pub fn sampler_fixture() -> SamplerCreateInfo {
    SamplerCreateInfo {
        mag_filter: 1,
        min_filter: 0,
        max_anisotropy: 16.0,
        compare_enable: 1,
        compare_op: 1,
        ..Default::default()
    }
}

pub fn shader_module_fixture(seed: u32) -> ShaderModuleCreateInfo {
    ShaderModuleCreateInfo {
        flags: 0,
        code: vec![0x0723_0203, seed, seed.wrapping_mul(0x9e37), 0x0001_0000],
        extension: None,
    }
}

pub fn set_layout_fixture(sampler: ObjectId) -> SetLayoutCreateInfo {
    SetLayoutCreateInfo {
        flags: 0,
        bindings: vec![
            SetLayoutBinding {
                binding: 0,
                descriptor_type: 6, // uniform buffer
                descriptor_count: 1,
                stage_flags: 0x11,
                immutable_samplers: None,
            },
            SetLayoutBinding {
                binding: 1,
                descriptor_type: descriptor_type::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 1,
                stage_flags: 0x10,
                immutable_samplers: Some(vec![sampler]),
            },
        ],
        extension: None,
    }
}

pub fn pipeline_layout_fixture(set_layout: ObjectId) -> PipelineLayoutCreateInfo {
    PipelineLayoutCreateInfo {
        flags: 0,
        set_layouts: vec![set_layout],
        push_constant_ranges: vec![PushConstantRange {
            stage_flags: 0x11,
            offset: 0,
            size: 16,
        }],
        extension: None,
    }
}

pub fn render_pass_fixture() -> RenderPassCreateInfo {
    RenderPassCreateInfo {
        flags: 0,
        attachments: vec![
            AttachmentDescription {
                format: 44, // B8G8R8A8_UNORM
                samples: 1,
                load_op: 1,
                store_op: 0,
                final_layout: 2,
                ..Default::default()
            },
            AttachmentDescription {
                format: 126, // D32_SFLOAT
                samples: 1,
                load_op: 1,
                store_op: 1,
                final_layout: 3,
                ..Default::default()
            },
        ],
        dependencies: vec![SubpassDependency {
            src_subpass: u32::MAX,
            dst_subpass: 0,
            src_stage_mask: 0x400,
            dst_stage_mask: 0x400,
            dst_access_mask: 0x100,
            ..Default::default()
        }],
        subpasses: vec![SubpassDescription {
            pipeline_bind_point: 0,
            color_attachments: vec![AttachmentReference {
                attachment: 0,
                layout: 2,
            }],
            depth_stencil_attachment: Some(AttachmentReference {
                attachment: 1,
                layout: 3,
            }),
            ..Default::default()
        }],
        extension: None,
    }
}

/// A graphics pipeline exercising every optional sub-state except
/// tessellation.
pub fn graphics_pipeline_fixture(
    layout: ObjectId,
    render_pass: ObjectId,
    vertex_module: ObjectId,
    fragment_module: ObjectId,
) -> GraphicsPipelineCreateInfo {
    GraphicsPipelineCreateInfo {
        flags: 0,
        layout,
        render_pass,
        subpass: 0,
        stages: vec![
            ShaderStageInfo {
                stage: 0x1, // vertex
                module: vertex_module,
                name: "main".to_owned(),
                ..Default::default()
            },
            ShaderStageInfo {
                stage: 0x10, // fragment
                module: fragment_module,
                name: "main".to_owned(),
                specialization: Some(SpecializationInfo {
                    map_entries: vec![SpecializationMapEntry {
                        constant_id: 0,
                        offset: 0,
                        size: 4,
                    }],
                    data: vec![1, 0, 0, 0],
                }),
                ..Default::default()
            },
        ],
        vertex_input: Some(VertexInputState {
            flags: 0,
            bindings: vec![VertexInputBinding {
                binding: 0,
                stride: 16,
                input_rate: 0,
            }],
            attributes: vec![VertexInputAttribute {
                location: 0,
                binding: 0,
                format: 109,
                offset: 0,
            }],
        }),
        input_assembly: Some(InputAssemblyState {
            topology: 3,
            ..Default::default()
        }),
        viewport: Some(ViewportState {
            flags: 0,
            viewport_count: 1,
            scissor_count: 1,
            viewports: Some(vec![Viewport {
                width: 1280.0,
                height: 720.0,
                max_depth: 1.0,
                ..Default::default()
            }]),
            scissors: Some(vec![ScissorRect {
                x: 0,
                y: 0,
                width: 1280,
                height: 720,
            }]),
        }),
        rasterization: Some(RasterizationState {
            polygon_mode: 0,
            cull_mode: 2,
            front_face: 1,
            line_width: 1.0,
            ..Default::default()
        }),
        multisample: Some(MultisampleState {
            rasterization_samples: 4,
            sample_mask: Some(vec![0xffff_ffff]),
            ..Default::default()
        }),
        depth_stencil: Some(DepthStencilState {
            depth_test_enable: 1,
            depth_write_enable: 1,
            depth_compare_op: 1,
            max_depth_bounds: 1.0,
            ..Default::default()
        }),
        color_blend: Some(ColorBlendState {
            flags: 0,
            logic_op_enable: 0,
            logic_op: 0,
            attachments: vec![ColorBlendAttachment {
                blend_enable: 1,
                src_color_blend_factor: blend_factor::CONSTANT_COLOR,
                dst_color_blend_factor: 1,
                color_blend_op: 0,
                src_alpha_blend_factor: 1,
                dst_alpha_blend_factor: 0,
                alpha_blend_op: 0,
                color_write_mask: 0xf,
            }],
            blend_constants: [0.25, 0.5, 0.75, 1.0],
        }),
        dynamic: Some(DynamicStateInfo {
            flags: 0,
            dynamic_states: vec![dynamic_state::LINE_WIDTH],
        }),
        tessellation: None,
        base_pipeline: ObjectId::NULL,
        base_pipeline_index: 0,
        extension: None,
    }
}

/// Handles used by [`record_graphics_fixture`].
pub struct GraphicsFixtureIds {
    pub sampler: ObjectId,
    pub set_layout: ObjectId,
    pub pipeline_layout: ObjectId,
    pub vertex_module: ObjectId,
    pub fragment_module: ObjectId,
    pub render_pass: ObjectId,
    pub pipeline: ObjectId,
}

/// Record a complete graphics pipeline with all of its dependencies.
pub fn record_graphics_fixture(recorder: &Recorder, base: u64) -> GraphicsFixtureIds {
    let ids = GraphicsFixtureIds {
        sampler: ObjectId(base + 1),
        set_layout: ObjectId(base + 2),
        pipeline_layout: ObjectId(base + 3),
        vertex_module: ObjectId(base + 4),
        fragment_module: ObjectId(base + 5),
        render_pass: ObjectId(base + 6),
        pipeline: ObjectId(base + 7),
    };

    recorder
        .record_sampler(ids.sampler, &sampler_fixture())
        .unwrap();
    recorder
        .record_set_layout(ids.set_layout, &set_layout_fixture(ids.sampler))
        .unwrap();
    recorder
        .record_pipeline_layout(ids.pipeline_layout, &pipeline_layout_fixture(ids.set_layout))
        .unwrap();
    recorder
        .record_shader_module(ids.vertex_module, &shader_module_fixture(0x0dd5))
        .unwrap();
    recorder
        .record_shader_module(ids.fragment_module, &shader_module_fixture(0xf00d))
        .unwrap();
    recorder
        .record_render_pass(ids.render_pass, &render_pass_fixture())
        .unwrap();
    recorder
        .record_graphics_pipeline(
            ids.pipeline,
            &graphics_pipeline_fixture(
                ids.pipeline_layout,
                ids.render_pass,
                ids.vertex_module,
                ids.fragment_module,
            ),
        )
        .unwrap();

    ids
}

/// A state creator that re-records every replayed object into a second
/// recorder, handing out sequential handles. Round-trip tests compare the
/// second recorder's store against the first.
pub struct Rerecorder {
    pub recorder: Recorder,
    next: u64,
    pub last_graphics_pipeline: Option<ObjectId>,
    pub last_compute_pipeline: Option<ObjectId>,
}

impl Rerecorder {
    pub fn new() -> Self {
        Self {
            recorder: Recorder::new(),
            next: 0,
            last_graphics_pipeline: None,
            last_compute_pipeline: None,
        }
    }

    fn fresh(&mut self) -> ObjectId {
        self.next += 1;
        ObjectId(self.next)
    }

    pub fn finish(&mut self) {
        self.recorder.finish();
    }
}

impl StateCreator for Rerecorder {
    fn enqueue_create_sampler(
        &mut self,
        _hash: Hash,
        info: &SamplerCreateInfo,
    ) -> Result<ObjectId, CreatorRejection> {
        let id = self.fresh();
        self.recorder
            .record_sampler(id, info)
            .map_err(|_| CreatorRejection)?;
        Ok(id)
    }

    fn enqueue_create_set_layout(
        &mut self,
        _hash: Hash,
        info: &SetLayoutCreateInfo,
    ) -> Result<ObjectId, CreatorRejection> {
        let id = self.fresh();
        self.recorder
            .record_set_layout(id, info)
            .map_err(|_| CreatorRejection)?;
        Ok(id)
    }

    fn enqueue_create_pipeline_layout(
        &mut self,
        _hash: Hash,
        info: &PipelineLayoutCreateInfo,
    ) -> Result<ObjectId, CreatorRejection> {
        let id = self.fresh();
        self.recorder
            .record_pipeline_layout(id, info)
            .map_err(|_| CreatorRejection)?;
        Ok(id)
    }

    fn enqueue_create_shader_module(
        &mut self,
        _hash: Hash,
        info: &ShaderModuleCreateInfo,
    ) -> Result<ObjectId, CreatorRejection> {
        let id = self.fresh();
        self.recorder
            .record_shader_module(id, info)
            .map_err(|_| CreatorRejection)?;
        Ok(id)
    }

    fn enqueue_create_render_pass(
        &mut self,
        _hash: Hash,
        info: &RenderPassCreateInfo,
    ) -> Result<ObjectId, CreatorRejection> {
        let id = self.fresh();
        self.recorder
            .record_render_pass(id, info)
            .map_err(|_| CreatorRejection)?;
        Ok(id)
    }

    fn enqueue_create_compute_pipeline(
        &mut self,
        _hash: Hash,
        info: &ComputePipelineCreateInfo,
    ) -> Result<ObjectId, CreatorRejection> {
        let id = self.fresh();
        self.recorder
            .record_compute_pipeline(id, info)
            .map_err(|_| CreatorRejection)?;
        self.last_compute_pipeline = Some(id);
        Ok(id)
    }

    fn enqueue_create_graphics_pipeline(
        &mut self,
        _hash: Hash,
        info: &GraphicsPipelineCreateInfo,
    ) -> Result<ObjectId, CreatorRejection> {
        let id = self.fresh();
        self.recorder
            .record_graphics_pipeline(id, info)
            .map_err(|_| CreatorRejection)?;
        self.last_graphics_pipeline = Some(id);
        Ok(id)
    }
}

/// Resolver backed by an in-memory map of documents.
pub struct MapResolver(pub HashMap<Hash, Vec<u8>>);

impl Resolver for MapResolver {
    fn resolve(&mut self, hash: Hash) -> Option<Vec<u8>> {
        self.0.get(&hash).cloned()
    }
}

/// Index the recorder's full store.
pub fn store_index(recorder: &Recorder) -> DocumentIndex {
    inspect_document(&recorder.serialize().unwrap()).unwrap()
}
