//! # modbridge-api
//!
//! Bridge API for add-ons discovered outside the host's own module system.
//!
//! This crate connects module discovery in `modbridge-runtime` to live
//! objects. It provides:
//!
//! - The [`Bridge`] trait and the [`BridgeCatalog`] of factories
//! - Metadata-only module inspection
//! - The [`ModuleRegistry`] of inspected files
//! - Lifecycle dispatch (activation and teardown)
//! - The [`BridgeHost`] session tying them together
//!
//! ## Writing a Bridge
//!
//! An add-on type implements [`Bridge`], lists `modbridge.Bridge` among its
//! interfaces in the module metadata, and tags itself with
//! `description = "bridge"`. The host registers a factory for the type
//! name; discovery does the rest.

pub mod bridge;
pub mod dispatch;
pub mod host;
pub mod inspector;
pub mod registry;
pub mod scanner;

pub use bridge::{Bridge, BridgeCatalog, BridgeFactory, BridgeInstance};
pub use dispatch::{activate_all, deactivate_all, DispatchFailure, DispatchReport};
pub use host::BridgeHost;
pub use inspector::{BridgeDescriptor, ModuleInspector};
pub use registry::{ModuleEntry, ModuleRegistry};
pub use scanner::{ScanReport, Scanner};
