//! The recorder: host-facing `record_*` calls deep-copy descriptors and
//! enqueue them; one background worker hashes, deduplicates, remaps handle
//! references to content hashes, and persists per-root closure documents.
//!
//! `record_*` never waits on the worker; it only takes the two mutexes long
//! enough to copy and enqueue. The worker is the sole writer of the store
//! and the handle tables, and both live behind one mutex so host-thread
//! reads (`get_hash_for_*`, `serialize*`) are safe against concurrent
//! worker writes. Worker-side failures are logged and the worker moves on;
//! nothing is retried.

use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use crate::error::{ObjectKind, RecordError};
use crate::json::{self, hash_to_hex};
use crate::store::{self, ComputePipelineState, GraphicsPipelineState, ShaderModuleState, Store};
use crate::hash;
use crate::types::*;

/// One queued record. The variant tag doubles as the structure-type
/// discriminant the worker dispatches on.
enum WorkItem {
    Sampler {
        id: ObjectId,
        info: SamplerCreateInfo,
    },
    SetLayout {
        id: ObjectId,
        info: SetLayoutCreateInfo,
    },
    PipelineLayout {
        id: ObjectId,
        info: PipelineLayoutCreateInfo,
    },
    ShaderModule {
        id: ObjectId,
        state: ShaderModuleState,
    },
    RenderPass {
        id: ObjectId,
        info: RenderPassCreateInfo,
    },
    ComputePipeline {
        id: ObjectId,
        state: ComputePipelineState,
    },
    GraphicsPipeline {
        id: ObjectId,
        state: GraphicsPipelineState,
    },
    /// Drain sentinel; the worker exits when it pops this.
    End,
}

struct Shared {
    store: Mutex<Store>,
    queue: Mutex<VecDeque<WorkItem>>,
    ready: Condvar,
    /// Serialization path, guarded separately so disk writes never hold up
    /// the store.
    output: Mutex<Option<PathBuf>>,
}

/// Records the creation-time state graph of pipeline objects into a
/// content-addressed store.
///
/// Each `record_*` call deep-copies the descriptor and returns immediately;
/// a background worker computes content hashes, deduplicates, and writes
/// closure documents for shader modules and pipelines to
/// `<serialization_path>/<HASH16>.json`.
pub struct Recorder {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Recorder {
    pub fn new() -> Self {
        let shared = Arc::new(Shared {
            store: Mutex::new(Store::new()),
            queue: Mutex::new(VecDeque::new()),
            ready: Condvar::new(),
            output: Mutex::new(None),
        });
        let worker_shared = Arc::clone(&shared);
        let worker = thread::spawn(move || worker_loop(&worker_shared));
        Self {
            shared,
            worker: Some(worker),
        }
    }

    fn push(&self, item: WorkItem) {
        let mut queue = self.shared.queue.lock().unwrap();
        queue.push_back(item);
        self.shared.ready.notify_one();
    }

    pub fn record_sampler(
        &self,
        id: ObjectId,
        info: &SamplerCreateInfo,
    ) -> Result<(), RecordError> {
        let info = store::copy_sampler(info)?;
        self.push(WorkItem::Sampler { id, info });
        Ok(())
    }

    pub fn record_set_layout(
        &self,
        id: ObjectId,
        info: &SetLayoutCreateInfo,
    ) -> Result<(), RecordError> {
        let info = store::copy_set_layout(info)?;
        self.push(WorkItem::SetLayout { id, info });
        Ok(())
    }

    pub fn record_pipeline_layout(
        &self,
        id: ObjectId,
        info: &PipelineLayoutCreateInfo,
    ) -> Result<(), RecordError> {
        let info = store::copy_pipeline_layout(info)?;
        self.push(WorkItem::PipelineLayout { id, info });
        Ok(())
    }

    pub fn record_shader_module(
        &self,
        id: ObjectId,
        info: &ShaderModuleCreateInfo,
    ) -> Result<(), RecordError> {
        let state = {
            let mut store = self.shared.store.lock().unwrap();
            store::copy_shader_module(&mut store.arena, info)?
        };
        self.push(WorkItem::ShaderModule { id, state });
        Ok(())
    }

    pub fn record_render_pass(
        &self,
        id: ObjectId,
        info: &RenderPassCreateInfo,
    ) -> Result<(), RecordError> {
        let info = store::copy_render_pass(info)?;
        self.push(WorkItem::RenderPass { id, info });
        Ok(())
    }

    pub fn record_compute_pipeline(
        &self,
        id: ObjectId,
        info: &ComputePipelineCreateInfo,
    ) -> Result<(), RecordError> {
        let state = {
            let mut store = self.shared.store.lock().unwrap();
            store::copy_compute_pipeline(&mut store.arena, info)?
        };
        self.push(WorkItem::ComputePipeline { id, state });
        Ok(())
    }

    pub fn record_graphics_pipeline(
        &self,
        id: ObjectId,
        info: &GraphicsPipelineCreateInfo,
    ) -> Result<(), RecordError> {
        let state = {
            let mut store = self.shared.store.lock().unwrap();
            store::copy_graphics_pipeline(&mut store.arena, info)?
        };
        self.push(WorkItem::GraphicsPipeline { id, state });
        Ok(())
    }

    /// Enqueue the drain sentinel. Returns as soon as it is queued; the
    /// worker exits after processing everything ahead of it.
    pub fn record_end(&self) {
        self.push(WorkItem::End);
    }

    /// Drain the queue and join the worker. After this returns, every
    /// record submitted so far is reflected in the store and the handle
    /// tables. Also invoked on drop.
    pub fn finish(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.record_end();
            let _ = worker.join();
        }
    }

    pub fn get_hash_for_sampler(&self, id: ObjectId) -> Result<Hash, RecordError> {
        self.lookup(ObjectKind::Sampler, id)
    }

    pub fn get_hash_for_set_layout(&self, id: ObjectId) -> Result<Hash, RecordError> {
        self.lookup(ObjectKind::SetLayout, id)
    }

    pub fn get_hash_for_pipeline_layout(&self, id: ObjectId) -> Result<Hash, RecordError> {
        self.lookup(ObjectKind::PipelineLayout, id)
    }

    pub fn get_hash_for_shader_module(&self, id: ObjectId) -> Result<Hash, RecordError> {
        self.lookup(ObjectKind::ShaderModule, id)
    }

    pub fn get_hash_for_render_pass(&self, id: ObjectId) -> Result<Hash, RecordError> {
        self.lookup(ObjectKind::RenderPass, id)
    }

    pub fn get_hash_for_compute_pipeline(&self, id: ObjectId) -> Result<Hash, RecordError> {
        self.lookup(ObjectKind::ComputePipeline, id)
    }

    pub fn get_hash_for_graphics_pipeline(&self, id: ObjectId) -> Result<Hash, RecordError> {
        self.lookup(ObjectKind::GraphicsPipeline, id)
    }

    fn lookup(&self, kind: ObjectKind, id: ObjectId) -> Result<Hash, RecordError> {
        self.shared.store.lock().unwrap().hash_for(kind, id)
    }

    /// Directory for subsequent closure writes. Until this is called the
    /// worker records and deduplicates but skips persistence.
    pub fn set_serialization_path(&self, path: impl Into<PathBuf>) {
        *self.shared.output.lock().unwrap() = Some(path.into());
    }

    /// The entire current store as one document.
    pub fn serialize(&self) -> Result<Vec<u8>, RecordError> {
        let store = self.shared.store.lock().unwrap();
        let doc = json::full_document(&store);
        Ok(serde_json::to_vec_pretty(&doc)?)
    }

    /// A graphics pipeline together with its transitive dependencies.
    pub fn serialize_graphics_pipeline(&self, hash: Hash) -> Result<Vec<u8>, RecordError> {
        let store = self.shared.store.lock().unwrap();
        let doc = json::graphics_closure(&store, hash)?;
        Ok(serde_json::to_vec_pretty(&doc)?)
    }

    /// A compute pipeline with its layout closure. The stage's shader
    /// module is referenced by hash only; replay fetches it through the
    /// resolver.
    pub fn serialize_compute_pipeline(&self, hash: Hash) -> Result<Vec<u8>, RecordError> {
        let store = self.shared.store.lock().unwrap();
        let doc = json::compute_closure(&store, hash)?;
        Ok(serde_json::to_vec_pretty(&doc)?)
    }

    /// A single shader module as a standalone document.
    pub fn serialize_shader_module(&self, hash: Hash) -> Result<Vec<u8>, RecordError> {
        let store = self.shared.store.lock().unwrap();
        let doc = json::shader_module_document(&store, hash)?;
        Ok(serde_json::to_vec_pretty(&doc)?)
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.finish();
    }
}

fn worker_loop(shared: &Shared) {
    loop {
        let item = {
            let mut queue = shared.queue.lock().unwrap();
            loop {
                if let Some(item) = queue.pop_front() {
                    break item;
                }
                queue = shared.ready.wait(queue).unwrap();
            }
        };

        if matches!(item, WorkItem::End) {
            return;
        }
        if let Err(err) = process_item(shared, item) {
            error!("record worker: {err}");
        }
    }
}

fn process_item(shared: &Shared, item: WorkItem) -> Result<(), RecordError> {
    match item {
        WorkItem::End => Ok(()),

        WorkItem::Sampler { id, info } => {
            let mut store = shared.store.lock().unwrap();
            let hash = hash::sampler_hash(&info);
            store.sampler_ids.insert(id, hash);
            store.samplers.entry(hash).or_insert(info);
            Ok(())
        }

        WorkItem::SetLayout { id, mut info } => {
            let mut store = shared.store.lock().unwrap();
            let hash = hash::set_layout_hash(&store, &info)?;
            store.set_layout_ids.insert(id, hash);
            if !store.set_layouts.contains_key(&hash) {
                store::remap_set_layout(&store, &mut info)?;
                store.set_layouts.insert(hash, info);
            }
            Ok(())
        }

        WorkItem::PipelineLayout { id, mut info } => {
            let mut store = shared.store.lock().unwrap();
            let hash = hash::pipeline_layout_hash(&store, &info)?;
            store.pipeline_layout_ids.insert(id, hash);
            if !store.pipeline_layouts.contains_key(&hash) {
                store::remap_pipeline_layout(&store, &mut info)?;
                store.pipeline_layouts.insert(hash, info);
            }
            Ok(())
        }

        WorkItem::RenderPass { id, info } => {
            let mut store = shared.store.lock().unwrap();
            let hash = hash::render_pass_hash(&info);
            store.render_pass_ids.insert(id, hash);
            store.render_passes.entry(hash).or_insert(info);
            Ok(())
        }

        WorkItem::ShaderModule { id, state } => {
            let (hash, bytes) = {
                let mut store = shared.store.lock().unwrap();
                let hash = hash::shader_module_hash(&store, &state);
                store.shader_module_ids.insert(id, hash);
                if store.shader_modules.contains_key(&hash) {
                    return Ok(());
                }
                store.shader_modules.insert(hash, state);
                let doc = json::shader_module_document(&store, hash)?;
                (hash, serde_json::to_vec_pretty(&doc)?)
            };
            write_document(shared, hash, &bytes);
            Ok(())
        }

        WorkItem::ComputePipeline { id, mut state } => {
            let (hash, bytes) = {
                let mut store = shared.store.lock().unwrap();
                let hash = hash::compute_pipeline_hash(&store, &state)?;
                store.compute_pipeline_ids.insert(id, hash);
                if store.compute_pipelines.contains_key(&hash) {
                    return Ok(());
                }
                store::remap_compute_pipeline(&store, &mut state)?;
                store.compute_pipelines.insert(hash, state);
                let doc = json::compute_closure(&store, hash)?;
                (hash, serde_json::to_vec_pretty(&doc)?)
            };
            write_document(shared, hash, &bytes);
            Ok(())
        }

        WorkItem::GraphicsPipeline { id, mut state } => {
            let (hash, bytes) = {
                let mut store = shared.store.lock().unwrap();
                let hash = hash::graphics_pipeline_hash(&store, &state)?;
                store.graphics_pipeline_ids.insert(id, hash);
                if store.graphics_pipelines.contains_key(&hash) {
                    return Ok(());
                }
                store::remap_graphics_pipeline(&store, &mut state)?;
                store.graphics_pipelines.insert(hash, state);
                let doc = json::graphics_closure(&store, hash)?;
                (hash, serde_json::to_vec_pretty(&doc)?)
            };
            write_document(shared, hash, &bytes);
            Ok(())
        }
    }
}

fn write_document(shared: &Shared, hash: Hash, bytes: &[u8]) {
    let output = shared.output.lock().unwrap();
    match output.as_ref() {
        Some(dir) => {
            let path = dir.join(format!("{}.json", hash_to_hex(hash)));
            if let Err(err) = fs::write(&path, bytes) {
                error!("failed to write {}: {err}", path.display());
            }
        }
        None => debug!(
            "no serialization path set, skipping write of {}",
            hash_to_hex(hash)
        ),
    }
}
