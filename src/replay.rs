//! Replay: walk a serialized document in dependency order and drive a
//! caller-supplied [`StateCreator`] to materialize fresh runtime handles.
//!
//! Sections are processed strictly in the order shader modules, samplers,
//! set layouts, pipeline layouts, render passes, compute pipelines,
//! graphics pipelines, with a `wait_enqueue` barrier after each section so
//! downstream sections only ever reference ready handles. References to
//! pipelines or shader modules that are absent from the current document are
//! fetched through the [`Resolver`] and parsed recursively into the same
//! handle tables.

use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Map, Value};

use crate::error::{CreatorRejection, ObjectKind, ReplayError};
use crate::json::hex_to_hash;
use crate::types::*;
use crate::FORMAT_VERSION;

/// Receives one `enqueue_create_*` call per replayed object.
///
/// Implementations may defer actual creation; `wait_enqueue` is the barrier
/// after which every handle returned by the preceding calls must be usable.
/// Returning `Err(CreatorRejection)` aborts the replay.
pub trait StateCreator {
    fn enqueue_create_sampler(
        &mut self,
        hash: Hash,
        info: &SamplerCreateInfo,
    ) -> Result<ObjectId, CreatorRejection>;

    fn enqueue_create_set_layout(
        &mut self,
        hash: Hash,
        info: &SetLayoutCreateInfo,
    ) -> Result<ObjectId, CreatorRejection>;

    fn enqueue_create_pipeline_layout(
        &mut self,
        hash: Hash,
        info: &PipelineLayoutCreateInfo,
    ) -> Result<ObjectId, CreatorRejection>;

    fn enqueue_create_shader_module(
        &mut self,
        hash: Hash,
        info: &ShaderModuleCreateInfo,
    ) -> Result<ObjectId, CreatorRejection>;

    fn enqueue_create_render_pass(
        &mut self,
        hash: Hash,
        info: &RenderPassCreateInfo,
    ) -> Result<ObjectId, CreatorRejection>;

    fn enqueue_create_compute_pipeline(
        &mut self,
        hash: Hash,
        info: &ComputePipelineCreateInfo,
    ) -> Result<ObjectId, CreatorRejection>;

    fn enqueue_create_graphics_pipeline(
        &mut self,
        hash: Hash,
        info: &GraphicsPipelineCreateInfo,
    ) -> Result<ObjectId, CreatorRejection>;

    /// Announces that the document carries no objects of a kind, allowing
    /// implementations to short-circuit.
    fn set_num_samplers(&mut self, _count: usize) {}
    fn set_num_set_layouts(&mut self, _count: usize) {}
    fn set_num_pipeline_layouts(&mut self, _count: usize) {}
    fn set_num_shader_modules(&mut self, _count: usize) {}
    fn set_num_render_passes(&mut self, _count: usize) {}
    fn set_num_compute_pipelines(&mut self, _count: usize) {}
    fn set_num_graphics_pipelines(&mut self, _count: usize) {}

    /// Barrier: block until every object enqueued so far is created.
    fn wait_enqueue(&mut self) {}
}

/// Fetches documents for objects referenced but not present in the current
/// document. `None` means "not found", which is fatal while satisfying a
/// forward reference.
pub trait Resolver {
    fn resolve(&mut self, hash: Hash) -> Option<Vec<u8>>;
}

/// A resolver that never finds anything. Replaying a self-contained closure
/// against it must succeed.
pub struct NullResolver;

impl Resolver for NullResolver {
    fn resolve(&mut self, _hash: Hash) -> Option<Vec<u8>> {
        None
    }
}

fn as_map<'a>(value: &'a Value, what: &'static str) -> Result<&'a Map<String, Value>, ReplayError> {
    value.as_object().ok_or(ReplayError::Parse(what))
}

fn req<'a>(map: &'a Map<String, Value>, key: &'static str) -> Result<&'a Value, ReplayError> {
    map.get(key).ok_or(ReplayError::Field(key))
}

fn req_u32(map: &Map<String, Value>, key: &'static str) -> Result<u32, ReplayError> {
    req(map, key)?
        .as_u64()
        .and_then(|v| u32::try_from(v).ok())
        .ok_or(ReplayError::Field(key))
}

fn req_u64(map: &Map<String, Value>, key: &'static str) -> Result<u64, ReplayError> {
    req(map, key)?.as_u64().ok_or(ReplayError::Field(key))
}

fn req_i32(map: &Map<String, Value>, key: &'static str) -> Result<i32, ReplayError> {
    req(map, key)?
        .as_i64()
        .and_then(|v| i32::try_from(v).ok())
        .ok_or(ReplayError::Field(key))
}

fn req_f32(map: &Map<String, Value>, key: &'static str) -> Result<f32, ReplayError> {
    req(map, key)?
        .as_f64()
        .map(|v| v as f32)
        .ok_or(ReplayError::Field(key))
}

fn req_str<'a>(map: &'a Map<String, Value>, key: &'static str) -> Result<&'a str, ReplayError> {
    req(map, key)?.as_str().ok_or(ReplayError::Field(key))
}

fn req_hash(map: &Map<String, Value>, key: &'static str) -> Result<Hash, ReplayError> {
    hex_to_hash(req_str(map, key)?)
}

fn opt_array<'a>(
    map: &'a Map<String, Value>,
    key: &'static str,
) -> Result<Option<&'a Vec<Value>>, ReplayError> {
    match map.get(key) {
        None => Ok(None),
        Some(v) => v.as_array().map(Some).ok_or(ReplayError::Field(key)),
    }
}

fn decode_u32_array(values: &[Value], key: &'static str) -> Result<Vec<u32>, ReplayError> {
    values
        .iter()
        .map(|v| {
            v.as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .ok_or(ReplayError::Field(key))
        })
        .collect()
}

fn decode_sampler(o: &Map<String, Value>) -> Result<SamplerCreateInfo, ReplayError> {
    Ok(SamplerCreateInfo {
        flags: req_u32(o, "flags")?,
        mag_filter: req_u32(o, "magFilter")?,
        min_filter: req_u32(o, "minFilter")?,
        mipmap_mode: req_u32(o, "mipmapMode")?,
        address_mode_u: req_u32(o, "addressModeU")?,
        address_mode_v: req_u32(o, "addressModeV")?,
        address_mode_w: req_u32(o, "addressModeW")?,
        mip_lod_bias: req_f32(o, "mipLodBias")?,
        anisotropy_enable: req_u32(o, "anisotropyEnable")?,
        max_anisotropy: req_f32(o, "maxAnisotropy")?,
        compare_enable: req_u32(o, "compareEnable")?,
        compare_op: req_u32(o, "compareOp")?,
        min_lod: req_f32(o, "minLod")?,
        max_lod: req_f32(o, "maxLod")?,
        border_color: req_u32(o, "borderColor")?,
        unnormalized_coordinates: req_u32(o, "unnormalizedCoordinates")?,
        extension: None,
    })
}

fn decode_attachment_reference(value: &Value) -> Result<AttachmentReference, ReplayError> {
    let o = as_map(value, "attachment reference must be an object")?;
    Ok(AttachmentReference {
        attachment: req_u32(o, "attachment")?,
        layout: req_u32(o, "layout")?,
    })
}

fn decode_attachment_references(values: &[Value]) -> Result<Vec<AttachmentReference>, ReplayError> {
    values.iter().map(decode_attachment_reference).collect()
}

fn decode_specialization(value: &Value) -> Result<SpecializationInfo, ReplayError> {
    let o = as_map(value, "specialization info must be an object")?;
    let data_size = req_u64(o, "dataSize")?;
    let data = STANDARD.decode(req_str(o, "data")?)?;
    if data.len() as u64 != data_size {
        return Err(ReplayError::Parse(
            "specialization data length does not match dataSize",
        ));
    }

    let mut map_entries = Vec::new();
    if let Some(entries) = opt_array(o, "mapEntries")? {
        for entry in entries {
            let e = as_map(entry, "map entry must be an object")?;
            map_entries.push(SpecializationMapEntry {
                constant_id: req_u32(e, "constantID")?,
                offset: req_u32(e, "offset")?,
                size: req_u64(e, "size")?,
            });
        }
    }

    Ok(SpecializationInfo { map_entries, data })
}

fn decode_vertex_input(value: &Value) -> Result<VertexInputState, ReplayError> {
    let o = as_map(value, "vertex input state must be an object")?;
    let mut state = VertexInputState {
        flags: req_u32(o, "flags")?,
        ..Default::default()
    };
    if let Some(attributes) = opt_array(o, "attributes")? {
        for attr in attributes {
            let a = as_map(attr, "vertex attribute must be an object")?;
            state.attributes.push(VertexInputAttribute {
                location: req_u32(a, "location")?,
                binding: req_u32(a, "binding")?,
                format: req_u32(a, "format")?,
                offset: req_u32(a, "offset")?,
            });
        }
    }
    if let Some(bindings) = opt_array(o, "bindings")? {
        for binding in bindings {
            let b = as_map(binding, "vertex binding must be an object")?;
            state.bindings.push(VertexInputBinding {
                binding: req_u32(b, "binding")?,
                stride: req_u32(b, "stride")?,
                input_rate: req_u32(b, "inputRate")?,
            });
        }
    }
    Ok(state)
}

fn decode_input_assembly(value: &Value) -> Result<InputAssemblyState, ReplayError> {
    let o = as_map(value, "input assembly state must be an object")?;
    Ok(InputAssemblyState {
        flags: req_u32(o, "flags")?,
        topology: req_u32(o, "topology")?,
        primitive_restart_enable: req_u32(o, "primitiveRestartEnable")?,
    })
}

fn decode_tessellation(value: &Value) -> Result<TessellationState, ReplayError> {
    let o = as_map(value, "tessellation state must be an object")?;
    Ok(TessellationState {
        flags: req_u32(o, "flags")?,
        patch_control_points: req_u32(o, "patchControlPoints")?,
    })
}

fn decode_viewport_state(value: &Value) -> Result<ViewportState, ReplayError> {
    let o = as_map(value, "viewport state must be an object")?;
    let mut state = ViewportState {
        flags: req_u32(o, "flags")?,
        viewport_count: req_u32(o, "viewportCount")?,
        scissor_count: req_u32(o, "scissorCount")?,
        viewports: None,
        scissors: None,
    };
    if let Some(viewports) = opt_array(o, "viewports")? {
        let mut decoded = Vec::with_capacity(viewports.len());
        for viewport in viewports {
            let v = as_map(viewport, "viewport must be an object")?;
            decoded.push(Viewport {
                x: req_f32(v, "x")?,
                y: req_f32(v, "y")?,
                width: req_f32(v, "width")?,
                height: req_f32(v, "height")?,
                min_depth: req_f32(v, "minDepth")?,
                max_depth: req_f32(v, "maxDepth")?,
            });
        }
        state.viewports = Some(decoded);
    }
    if let Some(scissors) = opt_array(o, "scissors")? {
        let mut decoded = Vec::with_capacity(scissors.len());
        for scissor in scissors {
            let s = as_map(scissor, "scissor must be an object")?;
            decoded.push(ScissorRect {
                x: req_i32(s, "x")?,
                y: req_i32(s, "y")?,
                width: req_u32(s, "width")?,
                height: req_u32(s, "height")?,
            });
        }
        state.scissors = Some(decoded);
    }
    Ok(state)
}

fn decode_rasterization(value: &Value) -> Result<RasterizationState, ReplayError> {
    let o = as_map(value, "rasterization state must be an object")?;
    Ok(RasterizationState {
        flags: req_u32(o, "flags")?,
        depth_clamp_enable: req_u32(o, "depthClampEnable")?,
        rasterizer_discard_enable: req_u32(o, "rasterizerDiscardEnable")?,
        polygon_mode: req_u32(o, "polygonMode")?,
        cull_mode: req_u32(o, "cullMode")?,
        front_face: req_u32(o, "frontFace")?,
        depth_bias_enable: req_u32(o, "depthBiasEnable")?,
        depth_bias_constant_factor: req_f32(o, "depthBiasConstantFactor")?,
        depth_bias_clamp: req_f32(o, "depthBiasClamp")?,
        depth_bias_slope_factor: req_f32(o, "depthBiasSlopeFactor")?,
        line_width: req_f32(o, "lineWidth")?,
    })
}

fn decode_multisample(value: &Value) -> Result<MultisampleState, ReplayError> {
    let o = as_map(value, "multisample state must be an object")?;
    Ok(MultisampleState {
        flags: req_u32(o, "flags")?,
        rasterization_samples: req_u32(o, "rasterizationSamples")?,
        sample_shading_enable: req_u32(o, "sampleShadingEnable")?,
        min_sample_shading: req_f32(o, "minSampleShading")?,
        sample_mask: opt_array(o, "sampleMask")?
            .map(|mask| decode_u32_array(mask, "sampleMask"))
            .transpose()?,
        alpha_to_coverage_enable: req_u32(o, "alphaToCoverageEnable")?,
        alpha_to_one_enable: req_u32(o, "alphaToOneEnable")?,
    })
}

fn decode_stencil(value: &Value) -> Result<StencilOpState, ReplayError> {
    let o = as_map(value, "stencil op state must be an object")?;
    Ok(StencilOpState {
        fail_op: req_u32(o, "failOp")?,
        pass_op: req_u32(o, "passOp")?,
        depth_fail_op: req_u32(o, "depthFailOp")?,
        compare_op: req_u32(o, "compareOp")?,
        compare_mask: req_u32(o, "compareMask")?,
        write_mask: req_u32(o, "writeMask")?,
        reference: req_u32(o, "reference")?,
    })
}

fn decode_depth_stencil(value: &Value) -> Result<DepthStencilState, ReplayError> {
    let o = as_map(value, "depth stencil state must be an object")?;
    Ok(DepthStencilState {
        flags: req_u32(o, "flags")?,
        depth_test_enable: req_u32(o, "depthTestEnable")?,
        depth_write_enable: req_u32(o, "depthWriteEnable")?,
        depth_compare_op: req_u32(o, "depthCompareOp")?,
        depth_bounds_test_enable: req_u32(o, "depthBoundsTestEnable")?,
        stencil_test_enable: req_u32(o, "stencilTestEnable")?,
        front: decode_stencil(req(o, "front")?)?,
        back: decode_stencil(req(o, "back")?)?,
        min_depth_bounds: req_f32(o, "minDepthBounds")?,
        max_depth_bounds: req_f32(o, "maxDepthBounds")?,
    })
}

fn decode_color_blend(value: &Value) -> Result<ColorBlendState, ReplayError> {
    let o = as_map(value, "color blend state must be an object")?;
    let constants = req(o, "blendConstants")?
        .as_array()
        .ok_or(ReplayError::Field("blendConstants"))?;
    if constants.len() != 4 {
        return Err(ReplayError::Parse("blendConstants must have 4 entries"));
    }
    let mut blend_constants = [0.0f32; 4];
    for (slot, value) in blend_constants.iter_mut().zip(constants) {
        *slot = value
            .as_f64()
            .ok_or(ReplayError::Field("blendConstants"))? as f32;
    }

    let mut state = ColorBlendState {
        flags: req_u32(o, "flags")?,
        logic_op_enable: req_u32(o, "logicOpEnable")?,
        logic_op: req_u32(o, "logicOp")?,
        blend_constants,
        ..Default::default()
    };
    if let Some(attachments) = opt_array(o, "attachments")? {
        for attachment in attachments {
            let a = as_map(attachment, "blend attachment must be an object")?;
            state.attachments.push(ColorBlendAttachment {
                blend_enable: req_u32(a, "blendEnable")?,
                src_color_blend_factor: req_u32(a, "srcColorBlendFactor")?,
                dst_color_blend_factor: req_u32(a, "dstColorBlendFactor")?,
                color_blend_op: req_u32(a, "colorBlendOp")?,
                src_alpha_blend_factor: req_u32(a, "srcAlphaBlendFactor")?,
                dst_alpha_blend_factor: req_u32(a, "dstAlphaBlendFactor")?,
                alpha_blend_op: req_u32(a, "alphaBlendOp")?,
                color_write_mask: req_u32(a, "colorWriteMask")?,
            });
        }
    }
    Ok(state)
}

fn decode_dynamic(value: &Value) -> Result<DynamicStateInfo, ReplayError> {
    let o = as_map(value, "dynamic state must be an object")?;
    Ok(DynamicStateInfo {
        flags: req_u32(o, "flags")?,
        dynamic_states: opt_array(o, "dynamicState")?
            .map(|values| decode_u32_array(values, "dynamicState"))
            .transpose()?
            .unwrap_or_default(),
    })
}

/// Drives a [`StateCreator`] from serialized documents, accumulating the
/// `hash -> created handle` tables across `parse` calls so that one replayer
/// can consume a whole store document by document.
#[derive(Default)]
pub struct Replayer {
    samplers: HashMap<Hash, ObjectId>,
    set_layouts: HashMap<Hash, ObjectId>,
    pipeline_layouts: HashMap<Hash, ObjectId>,
    shader_modules: HashMap<Hash, ObjectId>,
    render_passes: HashMap<Hash, ObjectId>,
    compute_pipelines: HashMap<Hash, ObjectId>,
    graphics_pipelines: HashMap<Hash, ObjectId>,
}

impl Replayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one document and replay every object in it that has not been
    /// replayed already.
    pub fn parse(
        &mut self,
        creator: &mut dyn StateCreator,
        resolver: &mut dyn Resolver,
        bytes: &[u8],
    ) -> Result<(), ReplayError> {
        let doc: Value = serde_json::from_slice(bytes)?;
        let root = as_map(&doc, "document root must be an object")?;

        let version = req_u64(root, "version")?;
        if version != u64::from(FORMAT_VERSION) {
            return Err(ReplayError::UnsupportedVersion(version));
        }

        match root.get("shaderModules") {
            Some(section) => self.parse_shader_modules(creator, section)?,
            None => creator.set_num_shader_modules(0),
        }
        match root.get("samplers") {
            Some(section) => self.parse_samplers(creator, section)?,
            None => creator.set_num_samplers(0),
        }
        match root.get("setLayouts") {
            Some(section) => self.parse_set_layouts(creator, section)?,
            None => creator.set_num_set_layouts(0),
        }
        match root.get("pipelineLayouts") {
            Some(section) => self.parse_pipeline_layouts(creator, section)?,
            None => creator.set_num_pipeline_layouts(0),
        }
        match root.get("renderPasses") {
            Some(section) => self.parse_render_passes(creator, section)?,
            None => creator.set_num_render_passes(0),
        }
        match root.get("computePipelines") {
            Some(section) => self.parse_compute_pipelines(creator, resolver, section)?,
            None => creator.set_num_compute_pipelines(0),
        }
        match root.get("graphicsPipelines") {
            Some(section) => self.parse_graphics_pipelines(creator, resolver, section)?,
            None => creator.set_num_graphics_pipelines(0),
        }

        Ok(())
    }

    fn sampler_id(&self, hash: Hash) -> Result<ObjectId, ReplayError> {
        if hash == 0 {
            return Ok(ObjectId::NULL);
        }
        self.samplers
            .get(&hash)
            .copied()
            .ok_or(ReplayError::UnresolvedReference {
                kind: ObjectKind::Sampler,
                hash,
            })
    }

    fn set_layout_id(&self, hash: Hash) -> Result<ObjectId, ReplayError> {
        if hash == 0 {
            return Ok(ObjectId::NULL);
        }
        self.set_layouts
            .get(&hash)
            .copied()
            .ok_or(ReplayError::UnresolvedReference {
                kind: ObjectKind::SetLayout,
                hash,
            })
    }

    fn pipeline_layout_id(&self, hash: Hash) -> Result<ObjectId, ReplayError> {
        if hash == 0 {
            return Ok(ObjectId::NULL);
        }
        self.pipeline_layouts
            .get(&hash)
            .copied()
            .ok_or(ReplayError::UnresolvedReference {
                kind: ObjectKind::PipelineLayout,
                hash,
            })
    }

    fn render_pass_id(&self, hash: Hash) -> Result<ObjectId, ReplayError> {
        if hash == 0 {
            return Ok(ObjectId::NULL);
        }
        self.render_passes
            .get(&hash)
            .copied()
            .ok_or(ReplayError::UnresolvedReference {
                kind: ObjectKind::RenderPass,
                hash,
            })
    }

    /// A shader-module reference from a pipeline: use the table, or fetch
    /// the module's document through the resolver and parse it recursively.
    fn resolve_module(
        &mut self,
        creator: &mut dyn StateCreator,
        resolver: &mut dyn Resolver,
        hash: Hash,
    ) -> Result<ObjectId, ReplayError> {
        if hash == 0 {
            return Ok(ObjectId::NULL);
        }
        if let Some(&id) = self.shader_modules.get(&hash) {
            return Ok(id);
        }
        let missing = || ReplayError::UnresolvedReference {
            kind: ObjectKind::ShaderModule,
            hash,
        };
        let Some(bytes) = resolver.resolve(hash) else {
            return Err(missing());
        };
        self.parse(creator, resolver, &bytes)?;
        self.shader_modules.get(&hash).copied().ok_or_else(missing)
    }

    fn resolve_base_pipeline(
        &mut self,
        creator: &mut dyn StateCreator,
        resolver: &mut dyn Resolver,
        kind: ObjectKind,
        hash: Hash,
    ) -> Result<ObjectId, ReplayError> {
        // The base pipeline may still be in flight in the current section.
        creator.wait_enqueue();

        let table = match kind {
            ObjectKind::ComputePipeline => &self.compute_pipelines,
            _ => &self.graphics_pipelines,
        };
        if let Some(&id) = table.get(&hash) {
            return Ok(id);
        }
        let missing = || ReplayError::UnresolvedReference { kind, hash };
        let Some(bytes) = resolver.resolve(hash) else {
            return Err(missing());
        };
        self.parse(creator, resolver, &bytes)?;
        let table = match kind {
            ObjectKind::ComputePipeline => &self.compute_pipelines,
            _ => &self.graphics_pipelines,
        };
        table.get(&hash).copied().ok_or_else(missing)
    }

    fn parse_shader_modules(
        &mut self,
        creator: &mut dyn StateCreator,
        section: &Value,
    ) -> Result<(), ReplayError> {
        let map = as_map(section, "shaderModules section must be an object")?;
        for (key, entry) in map {
            let hash = hex_to_hash(key)?;
            if self.shader_modules.contains_key(&hash) {
                continue;
            }
            let o = as_map(entry, "shader module entry must be an object")?;
            let flags = req_u32(o, "flags")?;
            let code_size = req_u64(o, "codeSize")?;
            let bytes = STANDARD.decode(req_str(o, "code")?)?;
            if bytes.len() as u64 != code_size || code_size % 4 != 0 {
                return Err(ReplayError::Parse(
                    "shader code length does not match codeSize",
                ));
            }
            let code = bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect();

            let info = ShaderModuleCreateInfo {
                flags,
                code,
                extension: None,
            };
            let id = creator
                .enqueue_create_shader_module(hash, &info)
                .map_err(|_| ReplayError::CreatorRejected {
                    kind: ObjectKind::ShaderModule,
                    hash,
                })?;
            self.shader_modules.insert(hash, id);
        }
        creator.wait_enqueue();
        Ok(())
    }

    fn parse_samplers(
        &mut self,
        creator: &mut dyn StateCreator,
        section: &Value,
    ) -> Result<(), ReplayError> {
        let map = as_map(section, "samplers section must be an object")?;
        for (key, entry) in map {
            let hash = hex_to_hash(key)?;
            if self.samplers.contains_key(&hash) {
                continue;
            }
            let o = as_map(entry, "sampler entry must be an object")?;
            let info = decode_sampler(o)?;
            let id = creator.enqueue_create_sampler(hash, &info).map_err(|_| {
                ReplayError::CreatorRejected {
                    kind: ObjectKind::Sampler,
                    hash,
                }
            })?;
            self.samplers.insert(hash, id);
        }
        creator.wait_enqueue();
        Ok(())
    }

    fn parse_set_layouts(
        &mut self,
        creator: &mut dyn StateCreator,
        section: &Value,
    ) -> Result<(), ReplayError> {
        let map = as_map(section, "setLayouts section must be an object")?;
        for (key, entry) in map {
            let hash = hex_to_hash(key)?;
            if self.set_layouts.contains_key(&hash) {
                continue;
            }
            let o = as_map(entry, "descriptor set layout entry must be an object")?;
            let mut info = SetLayoutCreateInfo {
                flags: req_u32(o, "flags")?,
                ..Default::default()
            };

            if let Some(bindings) = opt_array(o, "bindings")? {
                for binding in bindings {
                    let b = as_map(binding, "binding must be an object")?;
                    let mut decoded = SetLayoutBinding {
                        binding: req_u32(b, "binding")?,
                        descriptor_type: req_u32(b, "descriptorType")?,
                        descriptor_count: req_u32(b, "descriptorCount")?,
                        stage_flags: req_u32(b, "stageFlags")?,
                        immutable_samplers: None,
                    };
                    if let Some(samplers) = opt_array(b, "immutableSamplers")? {
                        let mut ids = Vec::with_capacity(samplers.len());
                        for sampler in samplers {
                            let sampler_hash = hex_to_hash(
                                sampler
                                    .as_str()
                                    .ok_or(ReplayError::Field("immutableSamplers"))?,
                            )?;
                            ids.push(self.sampler_id(sampler_hash)?);
                        }
                        decoded.immutable_samplers = Some(ids);
                    }
                    info.bindings.push(decoded);
                }
            }

            let id = creator
                .enqueue_create_set_layout(hash, &info)
                .map_err(|_| ReplayError::CreatorRejected {
                    kind: ObjectKind::SetLayout,
                    hash,
                })?;
            self.set_layouts.insert(hash, id);
        }
        creator.wait_enqueue();
        Ok(())
    }

    fn parse_pipeline_layouts(
        &mut self,
        creator: &mut dyn StateCreator,
        section: &Value,
    ) -> Result<(), ReplayError> {
        let map = as_map(section, "pipelineLayouts section must be an object")?;
        for (key, entry) in map {
            let hash = hex_to_hash(key)?;
            if self.pipeline_layouts.contains_key(&hash) {
                continue;
            }
            let o = as_map(entry, "pipeline layout entry must be an object")?;
            let mut info = PipelineLayoutCreateInfo {
                flags: req_u32(o, "flags")?,
                ..Default::default()
            };

            if let Some(ranges) = opt_array(o, "pushConstantRanges")? {
                for range in ranges {
                    let r = as_map(range, "push constant range must be an object")?;
                    info.push_constant_ranges.push(PushConstantRange {
                        stage_flags: req_u32(r, "stageFlags")?,
                        offset: req_u32(r, "offset")?,
                        size: req_u32(r, "size")?,
                    });
                }
            }

            if let Some(layouts) = opt_array(o, "setLayouts")? {
                for layout in layouts {
                    let layout_hash =
                        hex_to_hash(layout.as_str().ok_or(ReplayError::Field("setLayouts"))?)?;
                    info.set_layouts.push(self.set_layout_id(layout_hash)?);
                }
            }

            let id = creator
                .enqueue_create_pipeline_layout(hash, &info)
                .map_err(|_| ReplayError::CreatorRejected {
                    kind: ObjectKind::PipelineLayout,
                    hash,
                })?;
            self.pipeline_layouts.insert(hash, id);
        }
        creator.wait_enqueue();
        Ok(())
    }

    fn parse_render_passes(
        &mut self,
        creator: &mut dyn StateCreator,
        section: &Value,
    ) -> Result<(), ReplayError> {
        let map = as_map(section, "renderPasses section must be an object")?;
        for (key, entry) in map {
            let hash = hex_to_hash(key)?;
            if self.render_passes.contains_key(&hash) {
                continue;
            }
            let o = as_map(entry, "render pass entry must be an object")?;
            let mut info = RenderPassCreateInfo {
                flags: req_u32(o, "flags")?,
                ..Default::default()
            };

            if let Some(attachments) = opt_array(o, "attachments")? {
                for attachment in attachments {
                    let a = as_map(attachment, "attachment must be an object")?;
                    info.attachments.push(AttachmentDescription {
                        flags: req_u32(a, "flags")?,
                        format: req_u32(a, "format")?,
                        samples: req_u32(a, "samples")?,
                        load_op: req_u32(a, "loadOp")?,
                        store_op: req_u32(a, "storeOp")?,
                        stencil_load_op: req_u32(a, "stencilLoadOp")?,
                        stencil_store_op: req_u32(a, "stencilStoreOp")?,
                        initial_layout: req_u32(a, "initialLayout")?,
                        final_layout: req_u32(a, "finalLayout")?,
                    });
                }
            }

            if let Some(dependencies) = opt_array(o, "dependencies")? {
                for dependency in dependencies {
                    let d = as_map(dependency, "subpass dependency must be an object")?;
                    info.dependencies.push(SubpassDependency {
                        src_subpass: req_u32(d, "srcSubpass")?,
                        dst_subpass: req_u32(d, "dstSubpass")?,
                        src_stage_mask: req_u32(d, "srcStageMask")?,
                        dst_stage_mask: req_u32(d, "dstStageMask")?,
                        src_access_mask: req_u32(d, "srcAccessMask")?,
                        dst_access_mask: req_u32(d, "dstAccessMask")?,
                        dependency_flags: req_u32(d, "dependencyFlags")?,
                    });
                }
            }

            if let Some(subpasses) = opt_array(o, "subpasses")? {
                for subpass in subpasses {
                    let s = as_map(subpass, "subpass must be an object")?;
                    let mut decoded = SubpassDescription {
                        flags: req_u32(s, "flags")?,
                        pipeline_bind_point: req_u32(s, "pipelineBindPoint")?,
                        ..Default::default()
                    };
                    if let Some(refs) = opt_array(s, "inputAttachments")? {
                        decoded.input_attachments = decode_attachment_references(refs)?;
                    }
                    if let Some(refs) = opt_array(s, "colorAttachments")? {
                        decoded.color_attachments = decode_attachment_references(refs)?;
                    }
                    if let Some(refs) = opt_array(s, "resolveAttachments")? {
                        decoded.resolve_attachments = Some(decode_attachment_references(refs)?);
                    }
                    if let Some(ds) = s.get("depthStencilAttachment") {
                        decoded.depth_stencil_attachment = Some(decode_attachment_reference(ds)?);
                    }
                    if let Some(preserves) = opt_array(s, "preserveAttachments")? {
                        decoded.preserve_attachments =
                            decode_u32_array(preserves, "preserveAttachments")?;
                    }
                    info.subpasses.push(decoded);
                }
            }

            let id = creator
                .enqueue_create_render_pass(hash, &info)
                .map_err(|_| ReplayError::CreatorRejected {
                    kind: ObjectKind::RenderPass,
                    hash,
                })?;
            self.render_passes.insert(hash, id);
        }
        creator.wait_enqueue();
        Ok(())
    }

    fn decode_stage(
        &mut self,
        creator: &mut dyn StateCreator,
        resolver: &mut dyn Resolver,
        value: &Value,
    ) -> Result<ShaderStageInfo, ReplayError> {
        let o = as_map(value, "shader stage must be an object")?;
        let module_hash = req_hash(o, "module")?;
        Ok(ShaderStageInfo {
            flags: req_u32(o, "flags")?,
            stage: req_u32(o, "stage")?,
            module: self.resolve_module(creator, resolver, module_hash)?,
            name: req_str(o, "name")?.to_owned(),
            specialization: o
                .get("specializationInfo")
                .map(decode_specialization)
                .transpose()?,
            extension: None,
        })
    }

    fn parse_compute_pipelines(
        &mut self,
        creator: &mut dyn StateCreator,
        resolver: &mut dyn Resolver,
        section: &Value,
    ) -> Result<(), ReplayError> {
        let map = as_map(section, "computePipelines section must be an object")?;
        for (key, entry) in map {
            let hash = hex_to_hash(key)?;
            if self.compute_pipelines.contains_key(&hash) {
                continue;
            }
            let o = as_map(entry, "compute pipeline entry must be an object")?;

            let base_hash = req_hash(o, "basePipelineHandle")?;
            let base_pipeline = if base_hash != 0 {
                self.resolve_base_pipeline(
                    creator,
                    resolver,
                    ObjectKind::ComputePipeline,
                    base_hash,
                )?
            } else {
                ObjectId::NULL
            };

            let layout_hash = req_hash(o, "layout")?;
            let info = ComputePipelineCreateInfo {
                flags: req_u32(o, "flags")?,
                layout: self.pipeline_layout_id(layout_hash)?,
                base_pipeline,
                base_pipeline_index: req_i32(o, "basePipelineIndex")?,
                stage: self.decode_stage(creator, resolver, req(o, "stage")?)?,
                extension: None,
            };

            let id = creator
                .enqueue_create_compute_pipeline(hash, &info)
                .map_err(|_| ReplayError::CreatorRejected {
                    kind: ObjectKind::ComputePipeline,
                    hash,
                })?;
            self.compute_pipelines.insert(hash, id);
        }
        creator.wait_enqueue();
        Ok(())
    }

    fn parse_graphics_pipelines(
        &mut self,
        creator: &mut dyn StateCreator,
        resolver: &mut dyn Resolver,
        section: &Value,
    ) -> Result<(), ReplayError> {
        let map = as_map(section, "graphicsPipelines section must be an object")?;
        for (key, entry) in map {
            let hash = hex_to_hash(key)?;
            if self.graphics_pipelines.contains_key(&hash) {
                continue;
            }
            let o = as_map(entry, "graphics pipeline entry must be an object")?;

            let base_hash = req_hash(o, "basePipelineHandle")?;
            let base_pipeline = if base_hash != 0 {
                self.resolve_base_pipeline(
                    creator,
                    resolver,
                    ObjectKind::GraphicsPipeline,
                    base_hash,
                )?
            } else {
                ObjectId::NULL
            };

            let layout_hash = req_hash(o, "layout")?;
            let render_pass_hash = req_hash(o, "renderPass")?;

            let mut info = GraphicsPipelineCreateInfo {
                flags: req_u32(o, "flags")?,
                layout: self.pipeline_layout_id(layout_hash)?,
                render_pass: self.render_pass_id(render_pass_hash)?,
                subpass: req_u32(o, "subpass")?,
                base_pipeline,
                base_pipeline_index: req_i32(o, "basePipelineIndex")?,
                ..Default::default()
            };

            if let Some(stages) = opt_array(o, "stages")? {
                for stage in stages {
                    let decoded = self.decode_stage(creator, resolver, stage)?;
                    info.stages.push(decoded);
                }
            }

            if let Some(v) = o.get("vertexInputState") {
                info.vertex_input = Some(decode_vertex_input(v)?);
            }
            if let Some(v) = o.get("inputAssemblyState") {
                info.input_assembly = Some(decode_input_assembly(v)?);
            }
            if let Some(v) = o.get("tessellationState") {
                info.tessellation = Some(decode_tessellation(v)?);
            }
            if let Some(v) = o.get("viewportState") {
                info.viewport = Some(decode_viewport_state(v)?);
            }
            if let Some(v) = o.get("rasterizationState") {
                info.rasterization = Some(decode_rasterization(v)?);
            }
            if let Some(v) = o.get("multisampleState") {
                info.multisample = Some(decode_multisample(v)?);
            }
            if let Some(v) = o.get("depthStencilState") {
                info.depth_stencil = Some(decode_depth_stencil(v)?);
            }
            if let Some(v) = o.get("colorBlendState") {
                info.color_blend = Some(decode_color_blend(v)?);
            }
            if let Some(v) = o.get("dynamicState") {
                info.dynamic = Some(decode_dynamic(v)?);
            }

            let id = creator
                .enqueue_create_graphics_pipeline(hash, &info)
                .map_err(|_| ReplayError::CreatorRejected {
                    kind: ObjectKind::GraphicsPipeline,
                    hash,
                })?;
            self.graphics_pipelines.insert(hash, id);
        }
        creator.wait_enqueue();
        Ok(())
    }
}
