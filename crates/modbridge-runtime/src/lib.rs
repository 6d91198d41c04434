//! # modbridge-runtime
//!
//! Discovery side of the modbridge add-on bridge.
//!
//! This crate provides:
//! - The module image format and its metadata-only reader
//! - The bridge contract (capability interface + opt-in tag)
//! - Active profile resolution for third-party mod managers
//! - Source directory discovery from well-known paths
//!
//! ## Module Images
//!
//! Add-ons ship as module images (`.bmod`). Each image starts with a
//! metadata section listing the types it defines, their interfaces, and
//! their tags. Discovery reads that section and nothing else; no code from
//! an add-on runs until the host explicitly activates it.

pub mod contract;
pub mod error;
pub mod image;
pub mod profile;
pub mod sources;

pub use contract::{BridgeContract, BRIDGE_CAPABILITY, BRIDGE_SENTINEL, DESCRIPTION_TAG};
pub use error::{RuntimeError, RuntimeResult};
pub use image::{ModuleImage, ModuleMetadata, TypeRecord, MODULE_EXTENSION};
pub use profile::{resolve_active_profile, ProfileCandidate};
pub use sources::{
    module_files, EnvFallback, ManagerLayout, SourceDirectory, SourceKind, SourceLayout,
    DEFAULT_PLUGIN_SUBPATH,
};
