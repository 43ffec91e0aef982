//! Lightweight document inspection: enumerate what a serialized document
//! contains without driving a state creator.

use serde_json::{Map, Value};

use crate::error::ReplayError;
use crate::json::hex_to_hash;
use crate::types::Hash;
use crate::FORMAT_VERSION;

/// Index of one serialized document: format version plus the content
/// hashes present per object kind, sorted ascending.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DocumentIndex {
    pub version: u32,
    pub samplers: Vec<Hash>,
    pub set_layouts: Vec<Hash>,
    pub pipeline_layouts: Vec<Hash>,
    pub shader_modules: Vec<Hash>,
    pub render_passes: Vec<Hash>,
    pub compute_pipelines: Vec<Hash>,
    pub graphics_pipelines: Vec<Hash>,
}

fn section_hashes(root: &Map<String, Value>, key: &'static str) -> Result<Vec<Hash>, ReplayError> {
    let Some(section) = root.get(key) else {
        return Ok(Vec::new());
    };
    let map = section
        .as_object()
        .ok_or(ReplayError::Parse("section must be an object"))?;
    let mut hashes = map
        .keys()
        .map(|key| hex_to_hash(key))
        .collect::<Result<Vec<_>, _>>()?;
    hashes.sort_unstable();
    Ok(hashes)
}

/// Parse a document far enough to list its contents. Rejects documents
/// whose `version` does not match the compiled-in format version.
pub fn inspect_document(bytes: &[u8]) -> Result<DocumentIndex, ReplayError> {
    let doc: Value = serde_json::from_slice(bytes)?;
    let root = doc
        .as_object()
        .ok_or(ReplayError::Parse("document root must be an object"))?;

    let version = root
        .get("version")
        .and_then(Value::as_u64)
        .ok_or(ReplayError::Field("version"))?;
    if version != u64::from(FORMAT_VERSION) {
        return Err(ReplayError::UnsupportedVersion(version));
    }

    Ok(DocumentIndex {
        version: version as u32,
        samplers: section_hashes(root, "samplers")?,
        set_layouts: section_hashes(root, "setLayouts")?,
        pipeline_layouts: section_hashes(root, "pipelineLayouts")?,
        shader_modules: section_hashes(root, "shaderModules")?,
        render_passes: section_hashes(root, "renderPasses")?,
        compute_pipelines: section_hashes(root, "computePipelines")?,
        graphics_pipelines: section_hashes(root, "graphicsPipelines")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_indexes_as_empty() {
        let index = inspect_document(br#"{"version": 1}"#).unwrap();
        assert_eq!(index.version, 1);
        assert!(index.samplers.is_empty());
        assert!(index.graphics_pipelines.is_empty());
    }

    #[test]
    fn hashes_are_listed_sorted() {
        let index = inspect_document(
            br#"{
                "version": 1,
                "samplers": {
                    "00000000000000FF": {},
                    "0000000000000001": {}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(index.samplers, vec![0x01, 0xff]);
    }

    #[test]
    fn version_mismatch_is_rejected() {
        assert!(matches!(
            inspect_document(br#"{"version": 7}"#),
            Err(ReplayError::UnsupportedVersion(7))
        ));
    }
}
