//! The recorder's private storage: stored descriptor forms, the per-kind
//! content stores and handle tables, the deep-copy constructors, and the
//! post-hash handle remap.
//!
//! Deep copy turns a caller-supplied descriptor into a self-contained clone:
//! structured arrays are cloned, the two bulk blobs (shader code,
//! specialization data) move into the arena, and extension chains are
//! rejected. Reference fields keep the caller's runtime handles until the
//! worker has hashed the copy; `remap_*` then rewrites them to the
//! referents' content hashes so serialization never sees a live handle.

use std::collections::HashMap;

use crate::arena::{BlobRef, ScratchArena};
use crate::error::{ObjectKind, RecordError};
use crate::types::*;

/// Stored form of a shader module: code lives in the arena as little-endian
/// words.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ShaderModuleState {
    pub flags: u32,
    /// Exact byte length of the code blob.
    pub code_size: u64,
    pub code: BlobRef,
}

#[derive(Clone, Debug)]
pub(crate) struct SpecializationState {
    pub map_entries: Vec<SpecializationMapEntry>,
    pub data_size: u64,
    pub data: BlobRef,
}

#[derive(Clone, Debug)]
pub(crate) struct ShaderStageState {
    pub flags: u32,
    pub stage: u32,
    pub module: ObjectId,
    pub name: String,
    pub specialization: Option<SpecializationState>,
}

#[derive(Clone, Debug)]
pub(crate) struct ComputePipelineState {
    pub flags: u32,
    pub layout: ObjectId,
    pub base_pipeline: ObjectId,
    pub base_pipeline_index: i32,
    pub stage: ShaderStageState,
}

#[derive(Clone, Debug)]
pub(crate) struct GraphicsPipelineState {
    pub flags: u32,
    pub layout: ObjectId,
    pub render_pass: ObjectId,
    pub subpass: u32,
    pub base_pipeline: ObjectId,
    pub base_pipeline_index: i32,
    pub stages: Vec<ShaderStageState>,
    pub vertex_input: Option<VertexInputState>,
    pub input_assembly: Option<InputAssemblyState>,
    pub tessellation: Option<TessellationState>,
    pub viewport: Option<ViewportState>,
    pub rasterization: Option<RasterizationState>,
    pub multisample: Option<MultisampleState>,
    pub depth_stencil: Option<DepthStencilState>,
    pub color_blend: Option<ColorBlendState>,
    pub dynamic: Option<DynamicStateInfo>,
}

/// One content store (`hash -> descriptor`) and one handle table
/// (`handle -> hash`) per object kind, plus the arena backing every blob.
#[derive(Default)]
pub(crate) struct Store {
    pub arena: ScratchArena,

    pub samplers: HashMap<Hash, SamplerCreateInfo>,
    pub set_layouts: HashMap<Hash, SetLayoutCreateInfo>,
    pub pipeline_layouts: HashMap<Hash, PipelineLayoutCreateInfo>,
    pub shader_modules: HashMap<Hash, ShaderModuleState>,
    pub render_passes: HashMap<Hash, RenderPassCreateInfo>,
    pub compute_pipelines: HashMap<Hash, ComputePipelineState>,
    pub graphics_pipelines: HashMap<Hash, GraphicsPipelineState>,

    pub sampler_ids: HashMap<ObjectId, Hash>,
    pub set_layout_ids: HashMap<ObjectId, Hash>,
    pub pipeline_layout_ids: HashMap<ObjectId, Hash>,
    pub shader_module_ids: HashMap<ObjectId, Hash>,
    pub render_pass_ids: HashMap<ObjectId, Hash>,
    pub compute_pipeline_ids: HashMap<ObjectId, Hash>,
    pub graphics_pipeline_ids: HashMap<ObjectId, Hash>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn id_table(&self, kind: ObjectKind) -> &HashMap<ObjectId, Hash> {
        match kind {
            ObjectKind::Sampler => &self.sampler_ids,
            ObjectKind::SetLayout => &self.set_layout_ids,
            ObjectKind::PipelineLayout => &self.pipeline_layout_ids,
            ObjectKind::ShaderModule => &self.shader_module_ids,
            ObjectKind::RenderPass => &self.render_pass_ids,
            ObjectKind::ComputePipeline => &self.compute_pipeline_ids,
            ObjectKind::GraphicsPipeline => &self.graphics_pipeline_ids,
        }
    }

    /// The content hash previously assigned to `id`.
    pub fn hash_for(&self, kind: ObjectKind, id: ObjectId) -> Result<Hash, RecordError> {
        self.id_table(kind)
            .get(&id)
            .copied()
            .ok_or(RecordError::UnregisteredHandle { kind, id })
    }
}

fn reject_extension(
    extension: Option<ExtensionPtr>,
    kind: ObjectKind,
) -> Result<(), RecordError> {
    if extension.is_some() {
        Err(RecordError::UnsupportedExtension { kind })
    } else {
        Ok(())
    }
}

pub(crate) fn copy_sampler(info: &SamplerCreateInfo) -> Result<SamplerCreateInfo, RecordError> {
    reject_extension(info.extension, ObjectKind::Sampler)?;
    Ok(SamplerCreateInfo {
        extension: None,
        ..*info
    })
}

pub(crate) fn copy_set_layout(
    info: &SetLayoutCreateInfo,
) -> Result<SetLayoutCreateInfo, RecordError> {
    reject_extension(info.extension, ObjectKind::SetLayout)?;
    let bindings = info
        .bindings
        .iter()
        .map(|b| SetLayoutBinding {
            binding: b.binding,
            descriptor_type: b.descriptor_type,
            descriptor_count: b.descriptor_count,
            stage_flags: b.stage_flags,
            // Immutable samplers only exist for sampler-bearing descriptor
            // types; anything else is normalized away so the hash, the
            // remap and the serializer agree on presence.
            immutable_samplers: if takes_immutable_samplers(b.descriptor_type) {
                b.immutable_samplers.clone()
            } else {
                None
            },
        })
        .collect();
    Ok(SetLayoutCreateInfo {
        flags: info.flags,
        bindings,
        extension: None,
    })
}

pub(crate) fn copy_pipeline_layout(
    info: &PipelineLayoutCreateInfo,
) -> Result<PipelineLayoutCreateInfo, RecordError> {
    reject_extension(info.extension, ObjectKind::PipelineLayout)?;
    Ok(PipelineLayoutCreateInfo {
        flags: info.flags,
        set_layouts: info.set_layouts.clone(),
        push_constant_ranges: info.push_constant_ranges.clone(),
        extension: None,
    })
}

pub(crate) fn copy_shader_module(
    arena: &mut ScratchArena,
    info: &ShaderModuleCreateInfo,
) -> Result<ShaderModuleState, RecordError> {
    reject_extension(info.extension, ObjectKind::ShaderModule)?;
    let mut bytes = Vec::with_capacity(info.code.len() * 4);
    for word in &info.code {
        bytes.extend_from_slice(&word.to_le_bytes());
    }
    let code = arena.alloc_bytes(&bytes, 4);
    Ok(ShaderModuleState {
        flags: info.flags,
        code_size: code.len() as u64,
        code,
    })
}

pub(crate) fn copy_render_pass(
    info: &RenderPassCreateInfo,
) -> Result<RenderPassCreateInfo, RecordError> {
    reject_extension(info.extension, ObjectKind::RenderPass)?;
    Ok(RenderPassCreateInfo {
        flags: info.flags,
        attachments: info.attachments.clone(),
        dependencies: info.dependencies.clone(),
        subpasses: info.subpasses.clone(),
        extension: None,
    })
}

fn copy_specialization(
    arena: &mut ScratchArena,
    info: &SpecializationInfo,
) -> SpecializationState {
    let data = arena.alloc_bytes(&info.data, 1);
    SpecializationState {
        map_entries: info.map_entries.clone(),
        data_size: data.len() as u64,
        data,
    }
}

fn copy_stage(
    arena: &mut ScratchArena,
    info: &ShaderStageInfo,
    kind: ObjectKind,
) -> Result<ShaderStageState, RecordError> {
    reject_extension(info.extension, kind)?;
    Ok(ShaderStageState {
        flags: info.flags,
        stage: info.stage,
        module: info.module,
        name: info.name.clone(),
        specialization: info
            .specialization
            .as_ref()
            .map(|s| copy_specialization(arena, s)),
    })
}

pub(crate) fn copy_compute_pipeline(
    arena: &mut ScratchArena,
    info: &ComputePipelineCreateInfo,
) -> Result<ComputePipelineState, RecordError> {
    reject_extension(info.extension, ObjectKind::ComputePipeline)?;
    Ok(ComputePipelineState {
        flags: info.flags,
        layout: info.layout,
        base_pipeline: info.base_pipeline,
        base_pipeline_index: info.base_pipeline_index,
        stage: copy_stage(arena, &info.stage, ObjectKind::ComputePipeline)?,
    })
}

pub(crate) fn copy_graphics_pipeline(
    arena: &mut ScratchArena,
    info: &GraphicsPipelineCreateInfo,
) -> Result<GraphicsPipelineState, RecordError> {
    reject_extension(info.extension, ObjectKind::GraphicsPipeline)?;
    let stages = info
        .stages
        .iter()
        .map(|s| copy_stage(arena, s, ObjectKind::GraphicsPipeline))
        .collect::<Result<Vec<_>, _>>()?;

    // The runtime only reads `ceil(samples / 32)` sample-mask words; keep
    // exactly that many so the hash and the document agree.
    let multisample = info.multisample.as_ref().map(|ms| {
        let words = ms.rasterization_samples.div_ceil(32) as usize;
        MultisampleState {
            sample_mask: ms
                .sample_mask
                .as_ref()
                .map(|mask| mask.iter().copied().take(words).collect()),
            ..ms.clone()
        }
    });

    Ok(GraphicsPipelineState {
        flags: info.flags,
        layout: info.layout,
        render_pass: info.render_pass,
        subpass: info.subpass,
        base_pipeline: info.base_pipeline,
        base_pipeline_index: info.base_pipeline_index,
        stages,
        vertex_input: info.vertex_input.clone(),
        input_assembly: info.input_assembly,
        tessellation: info.tessellation,
        viewport: info.viewport.clone(),
        rasterization: info.rasterization,
        multisample,
        depth_stencil: info.depth_stencil,
        color_blend: info.color_blend.clone(),
        dynamic: info.dynamic.clone(),
    })
}

pub(crate) fn remap_set_layout(
    store: &Store,
    info: &mut SetLayoutCreateInfo,
) -> Result<(), RecordError> {
    for binding in &mut info.bindings {
        if let Some(samplers) = &mut binding.immutable_samplers {
            for id in samplers {
                *id = ObjectId(store.hash_for(ObjectKind::Sampler, *id)?);
            }
        }
    }
    Ok(())
}

pub(crate) fn remap_pipeline_layout(
    store: &Store,
    info: &mut PipelineLayoutCreateInfo,
) -> Result<(), RecordError> {
    for id in &mut info.set_layouts {
        if !id.is_null() {
            *id = ObjectId(store.hash_for(ObjectKind::SetLayout, *id)?);
        }
    }
    Ok(())
}

fn remap_stage(store: &Store, stage: &mut ShaderStageState) -> Result<(), RecordError> {
    stage.module = ObjectId(store.hash_for(ObjectKind::ShaderModule, stage.module)?);
    Ok(())
}

pub(crate) fn remap_compute_pipeline(
    store: &Store,
    info: &mut ComputePipelineState,
) -> Result<(), RecordError> {
    remap_stage(store, &mut info.stage)?;
    if !info.base_pipeline.is_null() {
        info.base_pipeline =
            ObjectId(store.hash_for(ObjectKind::ComputePipeline, info.base_pipeline)?);
    }
    info.layout = ObjectId(store.hash_for(ObjectKind::PipelineLayout, info.layout)?);
    Ok(())
}

pub(crate) fn remap_graphics_pipeline(
    store: &Store,
    info: &mut GraphicsPipelineState,
) -> Result<(), RecordError> {
    info.render_pass = ObjectId(store.hash_for(ObjectKind::RenderPass, info.render_pass)?);
    info.layout = ObjectId(store.hash_for(ObjectKind::PipelineLayout, info.layout)?);
    if !info.base_pipeline.is_null() {
        info.base_pipeline =
            ObjectId(store.hash_for(ObjectKind::GraphicsPipeline, info.base_pipeline)?);
    }
    for stage in &mut info.stages {
        remap_stage(store, stage)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_chains_are_rejected() {
        let info = SamplerCreateInfo {
            extension: Some(ExtensionPtr(0xdead_beef)),
            ..Default::default()
        };
        let err = copy_sampler(&info).unwrap_err();
        assert!(matches!(
            err,
            RecordError::UnsupportedExtension {
                kind: ObjectKind::Sampler
            }
        ));
    }

    #[test]
    fn stage_extension_chains_are_rejected() {
        let info = ComputePipelineCreateInfo {
            stage: ShaderStageInfo {
                extension: Some(ExtensionPtr(1)),
                ..Default::default()
            },
            ..Default::default()
        };
        let mut arena = ScratchArena::new();
        assert!(copy_compute_pipeline(&mut arena, &info).is_err());
    }

    #[test]
    fn shader_code_is_stored_little_endian() {
        let mut arena = ScratchArena::new();
        let state = copy_shader_module(
            &mut arena,
            &ShaderModuleCreateInfo {
                flags: 0,
                code: vec![0x0723_0203, 0xdead_beef],
                extension: None,
            },
        )
        .unwrap();
        assert_eq!(state.code_size, 8);
        assert_eq!(
            arena.get(state.code),
            &[0x03, 0x02, 0x23, 0x07, 0xef, 0xbe, 0xad, 0xde]
        );
    }

    #[test]
    fn immutable_samplers_are_dropped_for_other_descriptor_types() {
        let info = SetLayoutCreateInfo {
            flags: 0,
            bindings: vec![SetLayoutBinding {
                binding: 0,
                descriptor_type: 6, // not a sampler-bearing type
                descriptor_count: 1,
                stage_flags: 1,
                immutable_samplers: Some(vec![ObjectId(77)]),
            }],
            extension: None,
        };
        let copied = copy_set_layout(&info).unwrap();
        assert!(copied.bindings[0].immutable_samplers.is_none());
    }

    #[test]
    fn sample_mask_is_trimmed_to_word_count() {
        let mut arena = ScratchArena::new();
        let info = GraphicsPipelineCreateInfo {
            multisample: Some(MultisampleState {
                rasterization_samples: 4,
                sample_mask: Some(vec![0xffff, 0x1234, 0x5678]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let state = copy_graphics_pipeline(&mut arena, &info).unwrap();
        let ms = state.multisample.unwrap();
        assert_eq!(ms.sample_mask, Some(vec![0xffff]));
    }

    #[test]
    fn remap_requires_registered_handles() {
        let store = Store::new();
        let mut info = SetLayoutCreateInfo {
            bindings: vec![SetLayoutBinding {
                descriptor_type: descriptor_type::SAMPLER,
                descriptor_count: 1,
                immutable_samplers: Some(vec![ObjectId(5)]),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(matches!(
            remap_set_layout(&store, &mut info),
            Err(RecordError::UnregisteredHandle {
                kind: ObjectKind::Sampler,
                ..
            })
        ));
    }

    #[test]
    fn remap_rewrites_handles_to_hashes() {
        let mut store = Store::new();
        store.sampler_ids.insert(ObjectId(5), 0xabcd);
        let mut info = SetLayoutCreateInfo {
            bindings: vec![SetLayoutBinding {
                descriptor_type: descriptor_type::COMBINED_IMAGE_SAMPLER,
                descriptor_count: 1,
                immutable_samplers: Some(vec![ObjectId(5)]),
                ..Default::default()
            }],
            ..Default::default()
        };
        remap_set_layout(&store, &mut info).unwrap();
        assert_eq!(
            info.bindings[0].immutable_samplers,
            Some(vec![ObjectId(0xabcd)])
        );
    }
}
