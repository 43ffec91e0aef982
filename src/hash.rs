//! Canonical per-kind content hashes.
//!
//! Each function feeds the hasher in a fixed field order. Reference fields
//! are resolved to the referent's content hash through the store's handle
//! tables, so a hash never depends on runtime handle values. An absent
//! optional sub-structure feeds `u32(0)`; a present one starts with its
//! flags.
//!
//! Graphics pipelines additionally honor the dynamic-state rules: a field
//! the runtime is allowed to ignore under an active dynamic state must not
//! influence the hash, otherwise two pipelines that are identical under
//! dynamic state would miss each other in the store.

use crate::error::{ObjectKind, RecordError};
use crate::hasher::Hasher;
use crate::store::{
    ComputePipelineState, GraphicsPipelineState, ShaderModuleState, ShaderStageState,
    SpecializationState, Store,
};
use crate::types::*;

pub(crate) fn sampler_hash(info: &SamplerCreateInfo) -> Hash {
    let mut h = Hasher::new();
    h.u32(info.flags);
    h.f32(info.max_anisotropy);
    h.f32(info.mip_lod_bias);
    h.f32(info.min_lod);
    h.f32(info.max_lod);
    h.u32(info.min_filter);
    h.u32(info.mag_filter);
    h.u32(info.mipmap_mode);
    h.u32(info.compare_enable);
    h.u32(info.compare_op);
    h.u32(info.anisotropy_enable);
    h.u32(info.address_mode_u);
    h.u32(info.address_mode_v);
    h.u32(info.address_mode_w);
    h.u32(info.border_color);
    h.u32(info.unnormalized_coordinates);
    h.finish()
}

pub(crate) fn set_layout_hash(
    store: &Store,
    info: &SetLayoutCreateInfo,
) -> Result<Hash, RecordError> {
    let mut h = Hasher::new();
    h.u32(info.bindings.len() as u32);
    h.u32(info.flags);
    for binding in &info.bindings {
        h.u32(binding.binding);
        h.u32(binding.descriptor_count);
        h.u32(binding.descriptor_type);
        h.u32(binding.stage_flags);

        if let Some(samplers) = &binding.immutable_samplers {
            if takes_immutable_samplers(binding.descriptor_type) {
                for &sampler in samplers {
                    h.u64(store.hash_for(ObjectKind::Sampler, sampler)?);
                }
            }
        }
    }
    Ok(h.finish())
}

pub(crate) fn pipeline_layout_hash(
    store: &Store,
    info: &PipelineLayoutCreateInfo,
) -> Result<Hash, RecordError> {
    let mut h = Hasher::new();
    h.u32(info.set_layouts.len() as u32);
    for &layout in &info.set_layouts {
        if layout.is_null() {
            h.u32(0);
        } else {
            h.u64(store.hash_for(ObjectKind::SetLayout, layout)?);
        }
    }

    h.u32(info.push_constant_ranges.len() as u32);
    for range in &info.push_constant_ranges {
        h.u32(range.stage_flags);
        h.u32(range.size);
        h.u32(range.offset);
    }

    h.u32(info.flags);
    Ok(h.finish())
}

pub(crate) fn shader_module_hash(store: &Store, state: &ShaderModuleState) -> Hash {
    let mut h = Hasher::new();
    h.le_words(store.arena.get(state.code));
    h.u32(state.flags);
    h.finish()
}

fn hash_attachment(h: &mut Hasher, att: &AttachmentDescription) {
    h.u32(att.flags);
    h.u32(att.initial_layout);
    h.u32(att.final_layout);
    h.u32(att.format);
    h.u32(att.load_op);
    h.u32(att.store_op);
    h.u32(att.stencil_load_op);
    h.u32(att.stencil_store_op);
    h.u32(att.samples);
}

fn hash_dependency(h: &mut Hasher, dep: &SubpassDependency) {
    h.u32(dep.dependency_flags);
    h.u32(dep.dst_access_mask);
    h.u32(dep.src_access_mask);
    h.u32(dep.src_subpass);
    h.u32(dep.dst_subpass);
    h.u32(dep.src_stage_mask);
    h.u32(dep.dst_stage_mask);
}

fn hash_subpass(h: &mut Hasher, subpass: &SubpassDescription) {
    h.u32(subpass.flags);
    h.u32(subpass.color_attachments.len() as u32);
    h.u32(subpass.input_attachments.len() as u32);
    h.u32(subpass.preserve_attachments.len() as u32);
    h.u32(subpass.pipeline_bind_point);

    for &preserve in &subpass.preserve_attachments {
        h.u32(preserve);
    }
    for color in &subpass.color_attachments {
        h.u32(color.attachment);
        h.u32(color.layout);
    }
    for input in &subpass.input_attachments {
        h.u32(input.attachment);
        h.u32(input.layout);
    }
    // Resolve attachments are omitted entirely when absent, not padded.
    if let Some(resolves) = &subpass.resolve_attachments {
        for resolve in resolves {
            h.u32(resolve.attachment);
            h.u32(resolve.layout);
        }
    }
    match &subpass.depth_stencil_attachment {
        Some(ds) => {
            h.u32(ds.attachment);
            h.u32(ds.layout);
        }
        None => h.u32(0),
    }
}

pub(crate) fn render_pass_hash(info: &RenderPassCreateInfo) -> Hash {
    let mut h = Hasher::new();
    h.u32(info.attachments.len() as u32);
    h.u32(info.dependencies.len() as u32);
    h.u32(info.subpasses.len() as u32);

    for att in &info.attachments {
        hash_attachment(&mut h, att);
    }
    for dep in &info.dependencies {
        hash_dependency(&mut h, dep);
    }
    for subpass in &info.subpasses {
        hash_subpass(&mut h, subpass);
    }
    h.finish()
}

fn hash_specialization(h: &mut Hasher, store: &Store, spec: &SpecializationState) {
    h.bytes(store.arena.get(spec.data));
    h.u64(spec.data_size);
    h.u32(spec.map_entries.len() as u32);
    for entry in &spec.map_entries {
        h.u32(entry.offset);
        h.u64(entry.size);
        h.u32(entry.constant_id);
    }
}

pub(crate) fn compute_pipeline_hash(
    store: &Store,
    info: &ComputePipelineState,
) -> Result<Hash, RecordError> {
    let mut h = Hasher::new();
    h.u64(store.hash_for(ObjectKind::PipelineLayout, info.layout)?);
    h.u32(info.flags);

    if info.base_pipeline.is_null() {
        h.u32(0);
    } else {
        h.u64(store.hash_for(ObjectKind::ComputePipeline, info.base_pipeline)?);
        h.s32(info.base_pipeline_index);
    }

    h.u64(store.hash_for(ObjectKind::ShaderModule, info.stage.module)?);
    h.string(&info.stage.name);
    h.u32(info.stage.flags);
    h.u32(info.stage.stage);

    match &info.stage.specialization {
        Some(spec) => hash_specialization(&mut h, store, spec),
        None => h.u32(0),
    }
    Ok(h.finish())
}

/// Which fields the dynamic-state array excludes from the hash.
#[derive(Default, Clone, Copy)]
struct DynamicExclusions {
    viewport: bool,
    scissor: bool,
    line_width: bool,
    depth_bias: bool,
    blend_constants: bool,
    depth_bounds: bool,
    stencil_compare: bool,
    stencil_write_mask: bool,
    stencil_reference: bool,
}

impl DynamicExclusions {
    fn collect(info: &DynamicStateInfo) -> Self {
        let mut ex = Self::default();
        for &state in &info.dynamic_states {
            match state {
                dynamic_state::VIEWPORT => ex.viewport = true,
                dynamic_state::SCISSOR => ex.scissor = true,
                dynamic_state::LINE_WIDTH => ex.line_width = true,
                dynamic_state::DEPTH_BIAS => ex.depth_bias = true,
                dynamic_state::BLEND_CONSTANTS => ex.blend_constants = true,
                dynamic_state::DEPTH_BOUNDS => ex.depth_bounds = true,
                dynamic_state::STENCIL_COMPARE_MASK => ex.stencil_compare = true,
                dynamic_state::STENCIL_WRITE_MASK => ex.stencil_write_mask = true,
                dynamic_state::STENCIL_REFERENCE => ex.stencil_reference = true,
                _ => {}
            }
        }
        ex
    }
}

fn hash_depth_stencil(h: &mut Hasher, ds: &DepthStencilState, ex: DynamicExclusions) {
    h.u32(ds.flags);
    h.u32(ds.depth_bounds_test_enable);
    h.u32(ds.depth_compare_op);
    h.u32(ds.depth_test_enable);
    h.u32(ds.depth_write_enable);
    h.u32(ds.front.compare_op);
    h.u32(ds.front.depth_fail_op);
    h.u32(ds.front.fail_op);
    h.u32(ds.front.pass_op);
    h.u32(ds.back.compare_op);
    h.u32(ds.back.depth_fail_op);
    h.u32(ds.back.fail_op);
    h.u32(ds.back.pass_op);
    h.u32(ds.stencil_test_enable);

    if !ex.depth_bounds && ds.depth_bounds_test_enable != 0 {
        h.f32(ds.min_depth_bounds);
        h.f32(ds.max_depth_bounds);
    }

    if ds.stencil_test_enable != 0 {
        if !ex.stencil_compare {
            h.u32(ds.front.compare_mask);
            h.u32(ds.back.compare_mask);
        }
        if !ex.stencil_reference {
            h.u32(ds.front.reference);
            h.u32(ds.back.reference);
        }
        if !ex.stencil_write_mask {
            h.u32(ds.front.write_mask);
            h.u32(ds.back.write_mask);
        }
    }
}

fn hash_rasterization(h: &mut Hasher, rs: &RasterizationState, ex: DynamicExclusions) {
    h.u32(rs.flags);
    h.u32(rs.cull_mode);
    h.u32(rs.depth_clamp_enable);
    h.u32(rs.front_face);
    h.u32(rs.rasterizer_discard_enable);
    h.u32(rs.polygon_mode);
    h.u32(rs.depth_bias_enable);

    if rs.depth_bias_enable != 0 && !ex.depth_bias {
        h.f32(rs.depth_bias_clamp);
        h.f32(rs.depth_bias_slope_factor);
        h.f32(rs.depth_bias_constant_factor);
    }

    if !ex.line_width {
        h.f32(rs.line_width);
    }
}

fn hash_multisample(h: &mut Hasher, ms: &MultisampleState) {
    h.u32(ms.flags);
    h.u32(ms.alpha_to_coverage_enable);
    h.u32(ms.alpha_to_one_enable);
    h.f32(ms.min_sample_shading);
    h.u32(ms.rasterization_samples);
    h.u32(ms.sample_shading_enable);
    match &ms.sample_mask {
        Some(mask) => {
            for &word in mask {
                h.u32(word);
            }
        }
        None => h.u32(0),
    }
}

fn hash_viewport(h: &mut Hasher, vp: &ViewportState, ex: DynamicExclusions) {
    h.u32(vp.flags);
    h.u32(vp.scissor_count);
    h.u32(vp.viewport_count);

    if !ex.scissor {
        for scissor in vp.scissors.as_deref().unwrap_or(&[]) {
            h.s32(scissor.x);
            h.s32(scissor.y);
            h.u32(scissor.width);
            h.u32(scissor.height);
        }
    }

    if !ex.viewport {
        for viewport in vp.viewports.as_deref().unwrap_or(&[]) {
            h.f32(viewport.x);
            h.f32(viewport.y);
            h.f32(viewport.width);
            h.f32(viewport.height);
            h.f32(viewport.min_depth);
            h.f32(viewport.max_depth);
        }
    }
}

fn hash_vertex_input(h: &mut Hasher, vi: &VertexInputState) {
    h.u32(vi.flags);
    h.u32(vi.attributes.len() as u32);
    h.u32(vi.bindings.len() as u32);

    for attr in &vi.attributes {
        h.u32(attr.offset);
        h.u32(attr.binding);
        h.u32(attr.format);
        h.u32(attr.location);
    }
    for binding in &vi.bindings {
        h.u32(binding.binding);
        h.u32(binding.input_rate);
        h.u32(binding.stride);
    }
}

fn uses_blend_constants(factor: u32) -> bool {
    factor == blend_factor::CONSTANT_COLOR || factor == blend_factor::CONSTANT_ALPHA
}

fn hash_color_blend(h: &mut Hasher, cb: &ColorBlendState, ex: DynamicExclusions) {
    h.u32(cb.flags);
    h.u32(cb.attachments.len() as u32);
    h.u32(cb.logic_op_enable);
    h.u32(cb.logic_op);

    let mut need_blend_constants = false;
    for att in &cb.attachments {
        h.u32(att.blend_enable);
        if att.blend_enable != 0 {
            h.u32(att.color_write_mask);
            h.u32(att.alpha_blend_op);
            h.u32(att.color_blend_op);
            h.u32(att.dst_alpha_blend_factor);
            h.u32(att.src_alpha_blend_factor);
            h.u32(att.dst_color_blend_factor);
            h.u32(att.src_color_blend_factor);

            need_blend_constants |= uses_blend_constants(att.src_color_blend_factor)
                || uses_blend_constants(att.dst_color_blend_factor)
                || uses_blend_constants(att.src_alpha_blend_factor)
                || uses_blend_constants(att.dst_alpha_blend_factor);
        } else {
            // A disabled attachment contributes nothing beyond the zero:
            // the remaining fields are ignored by the runtime.
            h.u32(0);
        }
    }

    if need_blend_constants && !ex.blend_constants {
        for &constant in &cb.blend_constants {
            h.f32(constant);
        }
    }
}

fn hash_stage(h: &mut Hasher, store: &Store, stage: &ShaderStageState) -> Result<(), RecordError> {
    h.u32(stage.flags);
    h.string(&stage.name);
    h.u32(stage.stage);
    h.u64(store.hash_for(ObjectKind::ShaderModule, stage.module)?);
    match &stage.specialization {
        Some(spec) => hash_specialization(h, store, spec),
        None => h.u32(0),
    }
    Ok(())
}

pub(crate) fn graphics_pipeline_hash(
    store: &Store,
    info: &GraphicsPipelineState,
) -> Result<Hash, RecordError> {
    let mut h = Hasher::new();
    h.u32(info.flags);

    if !info.base_pipeline.is_null() {
        h.u64(store.hash_for(ObjectKind::GraphicsPipeline, info.base_pipeline)?);
        h.s32(info.base_pipeline_index);
    }

    h.u64(store.hash_for(ObjectKind::PipelineLayout, info.layout)?);
    h.u64(store.hash_for(ObjectKind::RenderPass, info.render_pass)?);
    h.u32(info.subpass);
    h.u32(info.stages.len() as u32);

    let mut ex = DynamicExclusions::default();
    match &info.dynamic {
        Some(dynamic) => {
            h.u32(dynamic.dynamic_states.len() as u32);
            h.u32(dynamic.flags);
            for &state in &dynamic.dynamic_states {
                h.u32(state);
            }
            ex = DynamicExclusions::collect(dynamic);
        }
        None => h.u32(0),
    }

    match &info.depth_stencil {
        Some(ds) => hash_depth_stencil(&mut h, ds, ex),
        None => h.u32(0),
    }

    match &info.input_assembly {
        Some(ia) => {
            h.u32(ia.flags);
            h.u32(ia.primitive_restart_enable);
            h.u32(ia.topology);
        }
        None => h.u32(0),
    }

    match &info.rasterization {
        Some(rs) => hash_rasterization(&mut h, rs, ex),
        None => h.u32(0),
    }

    match &info.multisample {
        Some(ms) => hash_multisample(&mut h, ms),
        None => h.u32(0),
    }

    match &info.viewport {
        Some(vp) => hash_viewport(&mut h, vp, ex),
        None => h.u32(0),
    }

    match &info.vertex_input {
        Some(vi) => hash_vertex_input(&mut h, vi),
        None => h.u32(0),
    }

    match &info.color_blend {
        Some(cb) => hash_color_blend(&mut h, cb, ex),
        None => h.u32(0),
    }

    match &info.tessellation {
        Some(tess) => {
            h.u32(tess.flags);
            h.u32(tess.patch_control_points);
        }
        None => h.u32(0),
    }

    for stage in &info.stages {
        hash_stage(&mut h, store, stage)?;
    }

    Ok(h.finish())
}
