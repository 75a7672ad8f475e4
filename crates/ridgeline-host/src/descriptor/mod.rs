//! Descriptions of discovered plugin executables.

use std::path::{Path, PathBuf};

use ridgeline_protocol::FilePattern;

/// The protocol API version this host speaks. Registration rejects
/// plugins reporting any other version.
pub const HOST_API_VERSION: u32 = 1;

/// A plugin executable that answered the metadata probe.
///
/// A descriptor says where the plugin lives and what it claims to open;
/// nothing has been initialised yet, and no process is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDescriptor {
    name: String,
    executable: PathBuf,
    patterns: Vec<FilePattern>,
}

impl PluginDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        executable: impl Into<PathBuf>,
        patterns: Vec<FilePattern>,
    ) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            patterns,
        }
    }

    /// The plugin's display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path to the plugin executable.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// File types the plugin claims to open.
    #[must_use]
    pub fn patterns(&self) -> &[FilePattern] {
        &self.patterns
    }
}
