//! Document encoding: stored descriptors to the on-disk JSON schema.
//!
//! Object references are emitted as uppercase 16-hex-digit strings of the
//! referent's content hash, with `"0000000000000000"` standing for null.
//! Shader code and specialization data are base64 (code as little-endian
//! 32-bit words), accompanied by exact byte lengths. Enum fields keep their
//! numeric API values.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Map, Value};

use crate::arena::ScratchArena;
use crate::error::{ObjectKind, RecordError, ReplayError};
use crate::store::{
    ComputePipelineState, GraphicsPipelineState, ShaderModuleState, ShaderStageState,
    SpecializationState, Store,
};
use crate::types::*;
use crate::FORMAT_VERSION;

pub(crate) fn hash_to_hex(hash: Hash) -> String {
    format!("{hash:016X}")
}

pub(crate) fn hex_to_hash(s: &str) -> Result<Hash, ReplayError> {
    if s.is_empty() || s.len() > 16 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ReplayError::Parse("hash string must be 1..=16 hex digits"));
    }
    Hash::from_str_radix(s, 16).map_err(|_| ReplayError::Parse("invalid hash string"))
}

/// Reference fields hold content hashes once the worker has remapped the
/// stored copy; serialize them in the same form as map keys.
fn ref_str(id: ObjectId) -> String {
    hash_to_hex(id.0)
}

pub(crate) fn sampler_value(info: &SamplerCreateInfo) -> Value {
    json!({
        "flags": info.flags,
        "minFilter": info.min_filter,
        "magFilter": info.mag_filter,
        "maxAnisotropy": info.max_anisotropy,
        "compareOp": info.compare_op,
        "anisotropyEnable": info.anisotropy_enable,
        "mipmapMode": info.mipmap_mode,
        "addressModeU": info.address_mode_u,
        "addressModeV": info.address_mode_v,
        "addressModeW": info.address_mode_w,
        "borderColor": info.border_color,
        "unnormalizedCoordinates": info.unnormalized_coordinates,
        "compareEnable": info.compare_enable,
        "mipLodBias": info.mip_lod_bias,
        "minLod": info.min_lod,
        "maxLod": info.max_lod,
    })
}

pub(crate) fn set_layout_value(info: &SetLayoutCreateInfo) -> Value {
    let bindings: Vec<Value> = info
        .bindings
        .iter()
        .map(|b| {
            let mut binding = json!({
                "descriptorType": b.descriptor_type,
                "descriptorCount": b.descriptor_count,
                "stageFlags": b.stage_flags,
                "binding": b.binding,
            });
            if let Some(samplers) = &b.immutable_samplers {
                binding["immutableSamplers"] =
                    Value::Array(samplers.iter().map(|&s| json!(ref_str(s))).collect());
            }
            binding
        })
        .collect();

    json!({
        "flags": info.flags,
        "bindings": bindings,
    })
}

pub(crate) fn pipeline_layout_value(info: &PipelineLayoutCreateInfo) -> Value {
    json!({
        "flags": info.flags,
        "pushConstantRanges": info.push_constant_ranges.iter().map(|r| json!({
            "stageFlags": r.stage_flags,
            "size": r.size,
            "offset": r.offset,
        })).collect::<Vec<_>>(),
        "setLayouts": info.set_layouts.iter().map(|&l| json!(ref_str(l))).collect::<Vec<_>>(),
    })
}

pub(crate) fn shader_module_value(arena: &ScratchArena, state: &ShaderModuleState) -> Value {
    json!({
        "flags": state.flags,
        "codeSize": state.code_size,
        "code": STANDARD.encode(arena.get(state.code)),
    })
}

fn attachment_reference_value(att: &AttachmentReference) -> Value {
    json!({
        "attachment": att.attachment,
        "layout": att.layout,
    })
}

pub(crate) fn render_pass_value(info: &RenderPassCreateInfo) -> Value {
    let mut pass = Map::new();
    pass.insert("flags".to_owned(), json!(info.flags));

    if !info.dependencies.is_empty() {
        let deps: Vec<Value> = info
            .dependencies
            .iter()
            .map(|d| {
                json!({
                    "dependencyFlags": d.dependency_flags,
                    "dstAccessMask": d.dst_access_mask,
                    "srcAccessMask": d.src_access_mask,
                    "dstStageMask": d.dst_stage_mask,
                    "srcStageMask": d.src_stage_mask,
                    "dstSubpass": d.dst_subpass,
                    "srcSubpass": d.src_subpass,
                })
            })
            .collect();
        pass.insert("dependencies".to_owned(), Value::Array(deps));
    }

    if !info.attachments.is_empty() {
        let attachments: Vec<Value> = info
            .attachments
            .iter()
            .map(|a| {
                json!({
                    "flags": a.flags,
                    "format": a.format,
                    "finalLayout": a.final_layout,
                    "initialLayout": a.initial_layout,
                    "loadOp": a.load_op,
                    "storeOp": a.store_op,
                    "samples": a.samples,
                    "stencilLoadOp": a.stencil_load_op,
                    "stencilStoreOp": a.stencil_store_op,
                })
            })
            .collect();
        pass.insert("attachments".to_owned(), Value::Array(attachments));
    }

    let subpasses: Vec<Value> = info
        .subpasses
        .iter()
        .map(|sub| {
            let mut s = Map::new();
            s.insert("flags".to_owned(), json!(sub.flags));
            s.insert(
                "pipelineBindPoint".to_owned(),
                json!(sub.pipeline_bind_point),
            );
            if !sub.preserve_attachments.is_empty() {
                s.insert(
                    "preserveAttachments".to_owned(),
                    json!(sub.preserve_attachments),
                );
            }
            if !sub.input_attachments.is_empty() {
                s.insert(
                    "inputAttachments".to_owned(),
                    Value::Array(
                        sub.input_attachments
                            .iter()
                            .map(attachment_reference_value)
                            .collect(),
                    ),
                );
            }
            if !sub.color_attachments.is_empty() {
                s.insert(
                    "colorAttachments".to_owned(),
                    Value::Array(
                        sub.color_attachments
                            .iter()
                            .map(attachment_reference_value)
                            .collect(),
                    ),
                );
            }
            if let Some(resolves) = &sub.resolve_attachments {
                s.insert(
                    "resolveAttachments".to_owned(),
                    Value::Array(resolves.iter().map(attachment_reference_value).collect()),
                );
            }
            if let Some(ds) = &sub.depth_stencil_attachment {
                s.insert(
                    "depthStencilAttachment".to_owned(),
                    attachment_reference_value(ds),
                );
            }
            Value::Object(s)
        })
        .collect();
    pass.insert("subpasses".to_owned(), Value::Array(subpasses));

    Value::Object(pass)
}

fn specialization_value(arena: &ScratchArena, spec: &SpecializationState) -> Value {
    json!({
        "dataSize": spec.data_size,
        "data": STANDARD.encode(arena.get(spec.data)),
        "mapEntries": spec.map_entries.iter().map(|e| json!({
            "offset": e.offset,
            "size": e.size,
            "constantID": e.constant_id,
        })).collect::<Vec<_>>(),
    })
}

fn stage_value(arena: &ScratchArena, stage: &ShaderStageState) -> Value {
    let mut s = Map::new();
    s.insert("flags".to_owned(), json!(stage.flags));
    s.insert("name".to_owned(), json!(stage.name));
    s.insert("module".to_owned(), json!(ref_str(stage.module)));
    s.insert("stage".to_owned(), json!(stage.stage));
    if let Some(spec) = &stage.specialization {
        s.insert(
            "specializationInfo".to_owned(),
            specialization_value(arena, spec),
        );
    }
    Value::Object(s)
}

pub(crate) fn compute_pipeline_value(arena: &ScratchArena, info: &ComputePipelineState) -> Value {
    json!({
        "flags": info.flags,
        "layout": ref_str(info.layout),
        "basePipelineHandle": ref_str(info.base_pipeline),
        "basePipelineIndex": info.base_pipeline_index,
        "stage": stage_value(arena, &info.stage),
    })
}

pub(crate) fn graphics_pipeline_value(arena: &ScratchArena, info: &GraphicsPipelineState) -> Value {
    let mut p = Map::new();
    p.insert("flags".to_owned(), json!(info.flags));
    p.insert(
        "basePipelineHandle".to_owned(),
        json!(ref_str(info.base_pipeline)),
    );
    p.insert(
        "basePipelineIndex".to_owned(),
        json!(info.base_pipeline_index),
    );
    p.insert("layout".to_owned(), json!(ref_str(info.layout)));
    p.insert("renderPass".to_owned(), json!(ref_str(info.render_pass)));
    p.insert("subpass".to_owned(), json!(info.subpass));

    if let Some(tess) = &info.tessellation {
        p.insert(
            "tessellationState".to_owned(),
            json!({
                "flags": tess.flags,
                "patchControlPoints": tess.patch_control_points,
            }),
        );
    }

    if let Some(dynamic) = &info.dynamic {
        p.insert(
            "dynamicState".to_owned(),
            json!({
                "flags": dynamic.flags,
                "dynamicState": dynamic.dynamic_states,
            }),
        );
    }

    if let Some(ms) = &info.multisample {
        let mut m = Map::new();
        m.insert("flags".to_owned(), json!(ms.flags));
        m.insert(
            "rasterizationSamples".to_owned(),
            json!(ms.rasterization_samples),
        );
        m.insert(
            "sampleShadingEnable".to_owned(),
            json!(ms.sample_shading_enable),
        );
        m.insert("minSampleShading".to_owned(), json!(ms.min_sample_shading));
        m.insert("alphaToOneEnable".to_owned(), json!(ms.alpha_to_one_enable));
        m.insert(
            "alphaToCoverageEnable".to_owned(),
            json!(ms.alpha_to_coverage_enable),
        );
        if let Some(mask) = &ms.sample_mask {
            m.insert("sampleMask".to_owned(), json!(mask));
        }
        p.insert("multisampleState".to_owned(), Value::Object(m));
    }

    if let Some(vi) = &info.vertex_input {
        p.insert(
            "vertexInputState".to_owned(),
            json!({
                "flags": vi.flags,
                "attributes": vi.attributes.iter().map(|a| json!({
                    "location": a.location,
                    "binding": a.binding,
                    "offset": a.offset,
                    "format": a.format,
                })).collect::<Vec<_>>(),
                "bindings": vi.bindings.iter().map(|b| json!({
                    "binding": b.binding,
                    "stride": b.stride,
                    "inputRate": b.input_rate,
                })).collect::<Vec<_>>(),
            }),
        );
    }

    if let Some(rs) = &info.rasterization {
        p.insert(
            "rasterizationState".to_owned(),
            json!({
                "flags": rs.flags,
                "depthBiasConstantFactor": rs.depth_bias_constant_factor,
                "depthBiasSlopeFactor": rs.depth_bias_slope_factor,
                "depthBiasClamp": rs.depth_bias_clamp,
                "depthBiasEnable": rs.depth_bias_enable,
                "depthClampEnable": rs.depth_clamp_enable,
                "polygonMode": rs.polygon_mode,
                "rasterizerDiscardEnable": rs.rasterizer_discard_enable,
                "frontFace": rs.front_face,
                "lineWidth": rs.line_width,
                "cullMode": rs.cull_mode,
            }),
        );
    }

    if let Some(ia) = &info.input_assembly {
        p.insert(
            "inputAssemblyState".to_owned(),
            json!({
                "flags": ia.flags,
                "topology": ia.topology,
                "primitiveRestartEnable": ia.primitive_restart_enable,
            }),
        );
    }

    if let Some(cb) = &info.color_blend {
        p.insert(
            "colorBlendState".to_owned(),
            json!({
                "flags": cb.flags,
                "logicOp": cb.logic_op,
                "logicOpEnable": cb.logic_op_enable,
                "blendConstants": cb.blend_constants,
                "attachments": cb.attachments.iter().map(|a| json!({
                    "dstAlphaBlendFactor": a.dst_alpha_blend_factor,
                    "srcAlphaBlendFactor": a.src_alpha_blend_factor,
                    "dstColorBlendFactor": a.dst_color_blend_factor,
                    "srcColorBlendFactor": a.src_color_blend_factor,
                    "colorWriteMask": a.color_write_mask,
                    "alphaBlendOp": a.alpha_blend_op,
                    "colorBlendOp": a.color_blend_op,
                    "blendEnable": a.blend_enable,
                })).collect::<Vec<_>>(),
            }),
        );
    }

    if let Some(vp) = &info.viewport {
        let mut v = Map::new();
        v.insert("flags".to_owned(), json!(vp.flags));
        v.insert("viewportCount".to_owned(), json!(vp.viewport_count));
        v.insert("scissorCount".to_owned(), json!(vp.scissor_count));
        if let Some(viewports) = &vp.viewports {
            v.insert(
                "viewports".to_owned(),
                Value::Array(
                    viewports
                        .iter()
                        .map(|view| {
                            json!({
                                "x": view.x,
                                "y": view.y,
                                "width": view.width,
                                "height": view.height,
                                "minDepth": view.min_depth,
                                "maxDepth": view.max_depth,
                            })
                        })
                        .collect(),
                ),
            );
        }
        if let Some(scissors) = &vp.scissors {
            v.insert(
                "scissors".to_owned(),
                Value::Array(
                    scissors
                        .iter()
                        .map(|s| {
                            json!({
                                "x": s.x,
                                "y": s.y,
                                "width": s.width,
                                "height": s.height,
                            })
                        })
                        .collect(),
                ),
            );
        }
        p.insert("viewportState".to_owned(), Value::Object(v));
    }

    if let Some(ds) = &info.depth_stencil {
        let stencil = |state: &StencilOpState| {
            json!({
                "compareOp": state.compare_op,
                "writeMask": state.write_mask,
                "reference": state.reference,
                "compareMask": state.compare_mask,
                "passOp": state.pass_op,
                "failOp": state.fail_op,
                "depthFailOp": state.depth_fail_op,
            })
        };
        p.insert(
            "depthStencilState".to_owned(),
            json!({
                "flags": ds.flags,
                "stencilTestEnable": ds.stencil_test_enable,
                "maxDepthBounds": ds.max_depth_bounds,
                "minDepthBounds": ds.min_depth_bounds,
                "depthBoundsTestEnable": ds.depth_bounds_test_enable,
                "depthWriteEnable": ds.depth_write_enable,
                "depthTestEnable": ds.depth_test_enable,
                "depthCompareOp": ds.depth_compare_op,
                "front": stencil(&ds.front),
                "back": stencil(&ds.back),
            }),
        );
    }

    p.insert(
        "stages".to_owned(),
        Value::Array(info.stages.iter().map(|s| stage_value(arena, s)).collect()),
    );

    Value::Object(p)
}

fn document(sections: Vec<(&'static str, Map<String, Value>)>) -> Value {
    let mut doc = Map::new();
    doc.insert("version".to_owned(), json!(FORMAT_VERSION));
    for (name, section) in sections {
        doc.insert(name.to_owned(), Value::Object(section));
    }
    Value::Object(doc)
}

/// The entire current store as one document.
pub(crate) fn full_document(store: &Store) -> Value {
    let mut samplers = Map::new();
    for (&hash, info) in &store.samplers {
        samplers.insert(hash_to_hex(hash), sampler_value(info));
    }
    let mut set_layouts = Map::new();
    for (&hash, info) in &store.set_layouts {
        set_layouts.insert(hash_to_hex(hash), set_layout_value(info));
    }
    let mut pipeline_layouts = Map::new();
    for (&hash, info) in &store.pipeline_layouts {
        pipeline_layouts.insert(hash_to_hex(hash), pipeline_layout_value(info));
    }
    let mut shader_modules = Map::new();
    for (&hash, state) in &store.shader_modules {
        shader_modules.insert(hash_to_hex(hash), shader_module_value(&store.arena, state));
    }
    let mut render_passes = Map::new();
    for (&hash, info) in &store.render_passes {
        render_passes.insert(hash_to_hex(hash), render_pass_value(info));
    }
    let mut compute_pipelines = Map::new();
    for (&hash, state) in &store.compute_pipelines {
        compute_pipelines.insert(
            hash_to_hex(hash),
            compute_pipeline_value(&store.arena, state),
        );
    }
    let mut graphics_pipelines = Map::new();
    for (&hash, state) in &store.graphics_pipelines {
        graphics_pipelines.insert(
            hash_to_hex(hash),
            graphics_pipeline_value(&store.arena, state),
        );
    }

    document(vec![
        ("samplers", samplers),
        ("setLayouts", set_layouts),
        ("pipelineLayouts", pipeline_layouts),
        ("shaderModules", shader_modules),
        ("renderPasses", render_passes),
        ("computePipelines", compute_pipelines),
        ("graphicsPipelines", graphics_pipelines),
    ])
}

/// Add a pipeline layout plus its set layouts and their immutable samplers.
fn add_layout_closure(
    store: &Store,
    layout: ObjectId,
    pipeline_layouts: &mut Map<String, Value>,
    set_layouts: &mut Map<String, Value>,
    samplers: &mut Map<String, Value>,
) -> Result<(), RecordError> {
    if layout.is_null() {
        return Ok(());
    }
    let layout_info =
        store
            .pipeline_layouts
            .get(&layout.0)
            .ok_or(RecordError::UnknownHash {
                kind: ObjectKind::PipelineLayout,
                hash: layout.0,
            })?;
    pipeline_layouts.insert(hash_to_hex(layout.0), pipeline_layout_value(layout_info));

    for &set_layout in &layout_info.set_layouts {
        if set_layout.is_null() || set_layouts.contains_key(&hash_to_hex(set_layout.0)) {
            continue;
        }
        let set_layout_info =
            store
                .set_layouts
                .get(&set_layout.0)
                .ok_or(RecordError::UnknownHash {
                    kind: ObjectKind::SetLayout,
                    hash: set_layout.0,
                })?;
        set_layouts.insert(hash_to_hex(set_layout.0), set_layout_value(set_layout_info));

        for binding in &set_layout_info.bindings {
            let Some(immutable) = &binding.immutable_samplers else {
                continue;
            };
            for &sampler in immutable {
                if sampler.is_null() || samplers.contains_key(&hash_to_hex(sampler.0)) {
                    continue;
                }
                let sampler_info =
                    store
                        .samplers
                        .get(&sampler.0)
                        .ok_or(RecordError::UnknownHash {
                            kind: ObjectKind::Sampler,
                            hash: sampler.0,
                        })?;
                samplers.insert(hash_to_hex(sampler.0), sampler_value(sampler_info));
            }
        }
    }
    Ok(())
}

/// A graphics pipeline together with its transitive dependencies: layout,
/// set layouts, immutable samplers, render pass and stage modules.
pub(crate) fn graphics_closure(store: &Store, hash: Hash) -> Result<Value, RecordError> {
    let pipe = store
        .graphics_pipelines
        .get(&hash)
        .ok_or(RecordError::UnknownHash {
            kind: ObjectKind::GraphicsPipeline,
            hash,
        })?;

    let mut samplers = Map::new();
    let mut set_layouts = Map::new();
    let mut pipeline_layouts = Map::new();
    let mut shader_modules = Map::new();
    let mut render_passes = Map::new();
    let mut graphics_pipelines = Map::new();

    graphics_pipelines.insert(
        hash_to_hex(hash),
        graphics_pipeline_value(&store.arena, pipe),
    );

    add_layout_closure(
        store,
        pipe.layout,
        &mut pipeline_layouts,
        &mut set_layouts,
        &mut samplers,
    )?;

    if !pipe.render_pass.is_null() {
        let pass = store
            .render_passes
            .get(&pipe.render_pass.0)
            .ok_or(RecordError::UnknownHash {
                kind: ObjectKind::RenderPass,
                hash: pipe.render_pass.0,
            })?;
        render_passes.insert(hash_to_hex(pipe.render_pass.0), render_pass_value(pass));
    }

    for stage in &pipe.stages {
        if stage.module.is_null() || shader_modules.contains_key(&hash_to_hex(stage.module.0)) {
            continue;
        }
        let module = store
            .shader_modules
            .get(&stage.module.0)
            .ok_or(RecordError::UnknownHash {
                kind: ObjectKind::ShaderModule,
                hash: stage.module.0,
            })?;
        shader_modules.insert(
            hash_to_hex(stage.module.0),
            shader_module_value(&store.arena, module),
        );
    }

    Ok(document(vec![
        ("samplers", samplers),
        ("setLayouts", set_layouts),
        ("pipelineLayouts", pipeline_layouts),
        ("shaderModules", shader_modules),
        ("renderPasses", render_passes),
        ("graphicsPipelines", graphics_pipelines),
    ]))
}

/// A compute pipeline with its layout closure. Shader-module bodies are not
/// embedded: modules are persisted standalone by hash, and replay fetches
/// them through the resolver.
pub(crate) fn compute_closure(store: &Store, hash: Hash) -> Result<Value, RecordError> {
    let pipe = store
        .compute_pipelines
        .get(&hash)
        .ok_or(RecordError::UnknownHash {
            kind: ObjectKind::ComputePipeline,
            hash,
        })?;

    let mut samplers = Map::new();
    let mut set_layouts = Map::new();
    let mut pipeline_layouts = Map::new();
    let mut compute_pipelines = Map::new();

    compute_pipelines.insert(hash_to_hex(hash), compute_pipeline_value(&store.arena, pipe));

    add_layout_closure(
        store,
        pipe.layout,
        &mut pipeline_layouts,
        &mut set_layouts,
        &mut samplers,
    )?;

    Ok(document(vec![
        ("samplers", samplers),
        ("setLayouts", set_layouts),
        ("pipelineLayouts", pipeline_layouts),
        ("computePipelines", compute_pipelines),
    ]))
}

/// A single shader module as a standalone document.
pub(crate) fn shader_module_document(store: &Store, hash: Hash) -> Result<Value, RecordError> {
    let module = store
        .shader_modules
        .get(&hash)
        .ok_or(RecordError::UnknownHash {
            kind: ObjectKind::ShaderModule,
            hash,
        })?;

    let mut shader_modules = Map::new();
    shader_modules.insert(hash_to_hex(hash), shader_module_value(&store.arena, module));

    Ok(document(vec![("shaderModules", shader_modules)]))
}
