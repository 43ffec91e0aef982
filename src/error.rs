use std::fmt;

use thiserror::Error;

use crate::types::{Hash, ObjectId};

/// The seven object kinds tracked by the recorder and replayer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Sampler,
    SetLayout,
    PipelineLayout,
    ShaderModule,
    RenderPass,
    ComputePipeline,
    GraphicsPipeline,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Sampler => "sampler",
            ObjectKind::SetLayout => "descriptor set layout",
            ObjectKind::PipelineLayout => "pipeline layout",
            ObjectKind::ShaderModule => "shader module",
            ObjectKind::RenderPass => "render pass",
            ObjectKind::ComputePipeline => "compute pipeline",
            ObjectKind::GraphicsPipeline => "graphics pipeline",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors surfaced on the record path.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("{kind} create info carries an extension chain, which is not supported")]
    UnsupportedExtension { kind: ObjectKind },

    #[error("{kind} handle {id} has not been recorded")]
    UnregisteredHandle { kind: ObjectKind, id: ObjectId },

    #[error("no {kind} with hash {hash:016X} in the store")]
    UnknownHash { kind: ObjectKind, hash: Hash },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by `Replayer::parse` and document inspection.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("malformed document: {0}")]
    Parse(&'static str),

    #[error("missing or invalid field `{0}`")]
    Field(&'static str),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u64),

    #[error("unresolved {kind} reference {hash:016X}")]
    UnresolvedReference { kind: ObjectKind, hash: Hash },

    #[error("{kind} {hash:016X} rejected by the state creator")]
    CreatorRejected { kind: ObjectKind, hash: Hash },
}

/// Returned by `StateCreator` implementations to abort a replay.
#[derive(Debug, Error)]
#[error("object creation rejected")]
pub struct CreatorRejection;
