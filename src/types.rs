//! The descriptor model: owned creation-state trees for the seven object
//! kinds, plus the opaque identifier types that tie them together.
//!
//! Enum-valued fields are carried as their raw numeric API values; the
//! recorder interprets only the handful of values exposed as constants at
//! the bottom of this module (descriptor types eligible for immutable
//! samplers, dynamic-state identifiers, constant blend factors). Everything
//! else is hashed and serialized opaquely.

use std::fmt;

/// 64-bit content hash of a descriptor. Zero denotes "no object".
pub type Hash = u64;

/// Opaque 64-bit object identifier.
///
/// On the record path this is the runtime handle as submitted by the caller.
/// After the worker deduplicates a descriptor, the reference fields of the
/// stored copy are rewritten in place so that the same 64 bits hold the
/// referent's content hash. During replay the fields hold freshly created
/// handles returned by the state creator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub const NULL: ObjectId = ObjectId(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Opaque pointer value of an attached extension-struct chain.
///
/// The recorder supports no extensions: any descriptor carrying `Some`
/// fails to record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExtensionPtr(pub u64);

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SamplerCreateInfo {
    pub flags: u32,
    pub mag_filter: u32,
    pub min_filter: u32,
    pub mipmap_mode: u32,
    pub address_mode_u: u32,
    pub address_mode_v: u32,
    pub address_mode_w: u32,
    pub mip_lod_bias: f32,
    pub anisotropy_enable: u32,
    pub max_anisotropy: f32,
    pub compare_enable: u32,
    pub compare_op: u32,
    pub min_lod: f32,
    pub max_lod: f32,
    pub border_color: u32,
    pub unnormalized_coordinates: u32,
    pub extension: Option<ExtensionPtr>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetLayoutBinding {
    pub binding: u32,
    pub descriptor_type: u32,
    pub descriptor_count: u32,
    pub stage_flags: u32,
    /// One sampler reference per descriptor. Only meaningful when
    /// `descriptor_type` is one of the sampler-bearing descriptor types.
    pub immutable_samplers: Option<Vec<ObjectId>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetLayoutCreateInfo {
    pub flags: u32,
    pub bindings: Vec<SetLayoutBinding>,
    pub extension: Option<ExtensionPtr>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PushConstantRange {
    pub stage_flags: u32,
    pub offset: u32,
    pub size: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineLayoutCreateInfo {
    pub flags: u32,
    /// `ObjectId::NULL` entries are preserved as null references.
    pub set_layouts: Vec<ObjectId>,
    pub push_constant_ranges: Vec<PushConstantRange>,
    pub extension: Option<ExtensionPtr>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShaderModuleCreateInfo {
    pub flags: u32,
    /// Shader code as 32-bit words.
    pub code: Vec<u32>,
    pub extension: Option<ExtensionPtr>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttachmentDescription {
    pub flags: u32,
    pub format: u32,
    pub samples: u32,
    pub load_op: u32,
    pub store_op: u32,
    pub stencil_load_op: u32,
    pub stencil_store_op: u32,
    pub initial_layout: u32,
    pub final_layout: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SubpassDependency {
    pub src_subpass: u32,
    pub dst_subpass: u32,
    pub src_stage_mask: u32,
    pub dst_stage_mask: u32,
    pub src_access_mask: u32,
    pub dst_access_mask: u32,
    pub dependency_flags: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AttachmentReference {
    pub attachment: u32,
    pub layout: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubpassDescription {
    pub flags: u32,
    pub pipeline_bind_point: u32,
    pub input_attachments: Vec<AttachmentReference>,
    pub color_attachments: Vec<AttachmentReference>,
    /// When present, must be one entry per color attachment.
    pub resolve_attachments: Option<Vec<AttachmentReference>>,
    pub depth_stencil_attachment: Option<AttachmentReference>,
    pub preserve_attachments: Vec<u32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPassCreateInfo {
    pub flags: u32,
    pub attachments: Vec<AttachmentDescription>,
    pub dependencies: Vec<SubpassDependency>,
    pub subpasses: Vec<SubpassDescription>,
    pub extension: Option<ExtensionPtr>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpecializationMapEntry {
    pub constant_id: u32,
    pub offset: u32,
    pub size: u64,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpecializationInfo {
    pub map_entries: Vec<SpecializationMapEntry>,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShaderStageInfo {
    pub flags: u32,
    /// Single stage bit (vertex, fragment, compute, ...).
    pub stage: u32,
    pub module: ObjectId,
    /// Entry point name.
    pub name: String,
    pub specialization: Option<SpecializationInfo>,
    pub extension: Option<ExtensionPtr>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexInputBinding {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VertexInputAttribute {
    pub location: u32,
    pub binding: u32,
    pub format: u32,
    pub offset: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VertexInputState {
    pub flags: u32,
    pub bindings: Vec<VertexInputBinding>,
    pub attributes: Vec<VertexInputAttribute>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputAssemblyState {
    pub flags: u32,
    pub topology: u32,
    pub primitive_restart_enable: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TessellationState {
    pub flags: u32,
    pub patch_control_points: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Viewport and scissor counts are independent of the body arrays: when the
/// corresponding dynamic state is active the runtime ignores the bodies, so
/// callers may omit them while still declaring a count.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewportState {
    pub flags: u32,
    pub viewport_count: u32,
    pub scissor_count: u32,
    pub viewports: Option<Vec<Viewport>>,
    pub scissors: Option<Vec<ScissorRect>>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RasterizationState {
    pub flags: u32,
    pub depth_clamp_enable: u32,
    pub rasterizer_discard_enable: u32,
    pub polygon_mode: u32,
    pub cull_mode: u32,
    pub front_face: u32,
    pub depth_bias_enable: u32,
    pub depth_bias_constant_factor: f32,
    pub depth_bias_clamp: f32,
    pub depth_bias_slope_factor: f32,
    pub line_width: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultisampleState {
    pub flags: u32,
    pub rasterization_samples: u32,
    pub sample_shading_enable: u32,
    pub min_sample_shading: f32,
    /// `ceil(rasterization_samples / 32)` mask words when present.
    pub sample_mask: Option<Vec<u32>>,
    pub alpha_to_coverage_enable: u32,
    pub alpha_to_one_enable: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StencilOpState {
    pub fail_op: u32,
    pub pass_op: u32,
    pub depth_fail_op: u32,
    pub compare_op: u32,
    pub compare_mask: u32,
    pub write_mask: u32,
    pub reference: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DepthStencilState {
    pub flags: u32,
    pub depth_test_enable: u32,
    pub depth_write_enable: u32,
    pub depth_compare_op: u32,
    pub depth_bounds_test_enable: u32,
    pub stencil_test_enable: u32,
    pub front: StencilOpState,
    pub back: StencilOpState,
    pub min_depth_bounds: f32,
    pub max_depth_bounds: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ColorBlendAttachment {
    pub blend_enable: u32,
    pub src_color_blend_factor: u32,
    pub dst_color_blend_factor: u32,
    pub color_blend_op: u32,
    pub src_alpha_blend_factor: u32,
    pub dst_alpha_blend_factor: u32,
    pub alpha_blend_op: u32,
    pub color_write_mask: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorBlendState {
    pub flags: u32,
    pub logic_op_enable: u32,
    pub logic_op: u32,
    pub attachments: Vec<ColorBlendAttachment>,
    pub blend_constants: [f32; 4],
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DynamicStateInfo {
    pub flags: u32,
    pub dynamic_states: Vec<u32>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ComputePipelineCreateInfo {
    pub flags: u32,
    pub layout: ObjectId,
    pub base_pipeline: ObjectId,
    pub base_pipeline_index: i32,
    pub stage: ShaderStageInfo,
    pub extension: Option<ExtensionPtr>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphicsPipelineCreateInfo {
    pub flags: u32,
    pub layout: ObjectId,
    pub render_pass: ObjectId,
    pub subpass: u32,
    pub base_pipeline: ObjectId,
    pub base_pipeline_index: i32,
    pub stages: Vec<ShaderStageInfo>,
    pub vertex_input: Option<VertexInputState>,
    pub input_assembly: Option<InputAssemblyState>,
    pub tessellation: Option<TessellationState>,
    pub viewport: Option<ViewportState>,
    pub rasterization: Option<RasterizationState>,
    pub multisample: Option<MultisampleState>,
    pub depth_stencil: Option<DepthStencilState>,
    pub color_blend: Option<ColorBlendState>,
    pub dynamic: Option<DynamicStateInfo>,
    pub extension: Option<ExtensionPtr>,
}

/// Descriptor types whose immutable-sampler arrays are honored.
pub mod descriptor_type {
    pub const SAMPLER: u32 = 0;
    pub const COMBINED_IMAGE_SAMPLER: u32 = 1;
}

/// Dynamic-state identifiers that exclude fields from the content hash.
pub mod dynamic_state {
    pub const VIEWPORT: u32 = 0;
    pub const SCISSOR: u32 = 1;
    pub const LINE_WIDTH: u32 = 2;
    pub const DEPTH_BIAS: u32 = 3;
    pub const BLEND_CONSTANTS: u32 = 4;
    pub const DEPTH_BOUNDS: u32 = 5;
    pub const STENCIL_COMPARE_MASK: u32 = 6;
    pub const STENCIL_WRITE_MASK: u32 = 7;
    pub const STENCIL_REFERENCE: u32 = 8;
}

/// Blend factors that make an attachment depend on the blend constants.
pub mod blend_factor {
    pub const CONSTANT_COLOR: u32 = 10;
    pub const CONSTANT_ALPHA: u32 = 12;
}

/// Whether a binding of this descriptor type carries immutable samplers.
pub(crate) fn takes_immutable_samplers(ty: u32) -> bool {
    ty == descriptor_type::SAMPLER || ty == descriptor_type::COMBINED_IMAGE_SAMPLER
}
