//! debslim-core - curation and republishing of Debian-style package indexes.
//!
//! The library turns a full archive index (hundreds of thousands of
//! stanzas) into a bounded, ranked, dependency-closed subset and republishes
//! the filtered tree through a content-addressed object store:
//!
//! 1. [`index`] parses compressed or plain Packages blobs into entries.
//! 2. [`popcon`] loads the external popularity signal.
//! 3. [`curate`] selects the primary set under a [`policy::CurationPolicy`]
//!    and resolves its bounded dependency closure; the union is persisted
//!    as the allow-list.
//! 4. [`filter`] projects raw index files down to the allow-list, stanza by
//!    stanza, preserving original bytes and order.
//! 5. [`publish`] reconciles an object store to exactly match the filtered
//!    tree, including `by-hash` content-addressed aliases.
//!
//! Each run recomputes the curated set and the published tree from scratch;
//! there is no incremental state to maintain or resume.

pub mod curate;
pub mod depends;
pub mod filter;
pub mod index;
pub mod policy;
pub mod popcon;
pub mod publish;

pub use curate::{CuratedSet, curate, resolve_dependencies, select_primary};
pub use filter::{FilterJob, FilterStats, filter_file, filter_index, load_allow_list, run_batch};
pub use index::{Codec, Entry, IndexError, PackageIndex};
pub use policy::CurationPolicy;
pub use publish::{LocalObject, PublishReport, Publisher, collect_tree};
