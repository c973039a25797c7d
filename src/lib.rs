//! Round-tripping editor for iSCSI Enterprise Target configuration files
//!
//! This library reads `ietd.conf` (and the `initiators.allow` /
//! `targets.allow` ACL files), lets callers add and remove targets, options,
//! LUNs, credentials and ACL entries, and writes the file back. Comments and
//! blank lines stay exactly where they were.
//!
//! Storage goes through the [`StorageBackend`] trait; [`FileBackend`] and
//! [`MemoryBackend`] are provided.
//!
//! # Example
//!
//! ```no_run
//! use iet_config::{ConfigStore, LunSpec};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = ConfigStore::open("/etc/iet/ietd.conf")?;
//!
//! let mut target = store.target("iqn.2025-12.local:storage.disk1");
//! target.add_target(store.document_mut())?;
//! target.add_lun(
//!     store.document_mut(),
//!     &LunSpec::new("/dev/vg0/disk1").io_type("blockio"),
//! )?;
//! target.add_incoming_user(store.document_mut(), "joe", "secretsecret")?;
//!
//! store.write()?;
//! # Ok(())
//! # }
//! ```

pub mod acl;
pub mod auth;
pub mod backend;
pub mod document;
pub mod error;
pub mod global;
pub mod lun;
pub mod procfs;
pub mod store;
pub mod target;

pub use acl::AclEngine;
pub use auth::{ChapCredentials, CredentialKind};
pub use backend::{FileBackend, MemoryBackend, StorageBackend};
pub use document::{Document, Line, LineId, LineKind, Placement};
pub use error::{IetError, IetResult};
pub use global::GlobalOptions;
pub use lun::{Lun, LunSpec};
pub use procfs::ProcParser;
pub use store::{ConfigStore, ConfigStoreBuilder};
pub use target::TargetEngine;

/// Version of this library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
