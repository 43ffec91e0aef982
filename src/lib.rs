//! Content-addressed recording and replay of pipeline-object creation
//! state.
//!
//! A [`Recorder`] ingests live creation descriptors (samplers, descriptor
//! set layouts, pipeline layouts, shader modules, render passes, compute
//! and graphics pipelines), assigns each a canonical 64-bit content hash,
//! deduplicates by hash, and serializes dependency closures to a
//! content-addressed JSON store. A [`Replayer`] consumes those documents on
//! another process, driver or machine and drives a caller-supplied
//! [`StateCreator`] to rebuild the object graph in dependency order,
//! resolving cross-document references through a [`Resolver`].
//!
//! Content hashes are stable across runs and machines: they never depend on
//! memory addresses, map iteration order, or fields that an active dynamic
//! state tells the runtime to ignore. Two semantically identical pipelines
//! always collide in the store, which is what makes the output usable for
//! offline pipeline compilation, cache pre-warming and crash reproduction.

mod arena;
mod error;
mod hash;
mod hasher;
mod inspect;
mod json;
mod record;
mod replay;
mod store;
mod types;

pub use crate::error::{CreatorRejection, ObjectKind, RecordError, ReplayError};
pub use crate::inspect::{inspect_document, DocumentIndex};
pub use crate::record::Recorder;
pub use crate::replay::{NullResolver, Replayer, Resolver, StateCreator};
pub use crate::types::*;

/// On-disk document format version. Documents with any other `version` are
/// rejected.
pub const FORMAT_VERSION: u32 = 1;
