//! Out-of-process plugin runtime for Ridgeline.
//!
//! Data-source plugins are standalone executables that speak a
//! newline-delimited JSON protocol over standard I/O, with series
//! payloads carried as raw little-endian binary frames. This crate owns
//! everything on the host side of that boundary: discovering plugin
//! executables, probing them for metadata, running half-duplex call
//! sessions against them, relaying plugin-initiated configuration forms
//! to the embedding application, and keeping the registry of sources
//! with its single active plugin.
//!
//! The wire types themselves live in [`ridgeline_protocol`]; this crate
//! adds the stateful machinery.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use ridgeline_host::{Discovery, IpcPlugin, NoopDialogHost, PluginManager, SeriesBridge};
//!
//! # fn main() -> Result<(), ridgeline_host::HostError> {
//! // Registration only catalogues the discovered executables; each
//! // plugin's subprocess is spawned when it is activated.
//! let manager = Arc::new(PluginManager::new());
//! for descriptor in Discovery::new().scan_dir(Path::new("plugins")) {
//!     manager.register(Arc::new(IpcPlugin::new(descriptor)))?;
//! }
//! if let Some(name) = manager.active_name() {
//!     manager.activate(&name, None, &mut NoopDialogHost)?;
//! }
//! let bridge = SeriesBridge::new(Arc::clone(&manager));
//! let frame = bridge.fetch(None, "s0", None)?;
//! println!("{} points", frame.point_count());
//! # Ok(())
//! # }
//! ```

pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod form;
pub mod registry;
pub mod series;
pub mod session;
pub mod source;

pub use self::descriptor::{HOST_API_VERSION, PluginDescriptor};
pub use self::discovery::{DEFAULT_PROBE_TIMEOUT, Discovery, METADATA_FLAG};
pub use self::error::HostError;
pub use self::form::{DialogHost, NoopDialogHost};
pub use self::registry::{PluginFilePattern, PluginHandle, PluginManager, PluginMetadata};
pub use self::series::SeriesBridge;
pub use self::session::{FormChannel, PluginSession};
pub use self::source::{DataSource, IpcPlugin};
