//! The data source abstraction and its out-of-process implementation.
//!
//! [`DataSource`] is the seam between the registry and whatever produces
//! chart data: an external plugin process, or an in-process source an
//! embedding application registers directly. [`IpcPlugin`] is the
//! canonical implementation. Construction is inert; the subprocess is
//! spawned on the first call that needs it, and closing drops the
//! session so a later call starts a fresh one. The session sits behind a
//! mutex so a shared handle can serve calls while the half-duplex
//! protocol still sees them one at a time.

use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use ridgeline_protocol::{
    BinaryFrame, ChartConfig, FilePattern, PluginInfo, SeriesConfig, StorageLayout,
};

use crate::descriptor::{HOST_API_VERSION, PluginDescriptor};
use crate::error::HostError;
use crate::form::DialogHost;
use crate::session::PluginSession;

/// A provider of chart configuration and series data.
///
/// Methods take `&self` so sources can be shared behind `Arc`;
/// implementations serialise access internally. The identity accessors
/// (`name`, `version`, `patterns`) must answer without contacting any
/// subprocess: the registry catalogues sources before anything runs.
pub trait DataSource: Send + Sync {
    /// The source's display name.
    fn name(&self) -> &str;

    /// The protocol API version the source implements.
    fn version(&self) -> u32;

    /// File types the source claims to open. Empty when the source is
    /// not a file loader.
    fn patterns(&self) -> &[FilePattern];

    /// Queries the source's live identity and protocol version.
    ///
    /// # Errors
    ///
    /// Fails when the source cannot be reached.
    fn info(&self) -> Result<PluginInfo, HostError>;

    /// Initialises the source, relaying any form exchange to `dialog`.
    ///
    /// # Errors
    ///
    /// Fails when initialisation fails or the user cancels a form.
    fn initialize(&self, args: Option<&str>, dialog: &mut dyn DialogHost)
    -> Result<Value, HostError>;

    /// Fetches the chart configuration.
    ///
    /// # Errors
    ///
    /// Fails when the source cannot produce a configuration.
    fn chart_config(&self, args: Option<&str>) -> Result<ChartConfig, HostError>;

    /// Fetches the list of available series.
    ///
    /// # Errors
    ///
    /// Fails when the source cannot produce the list.
    fn series_config(&self) -> Result<Vec<SeriesConfig>, HostError>;

    /// Fetches one series as a binary frame. `preferred` is a layout
    /// hint; the frame reports the layout actually used.
    ///
    /// # Errors
    ///
    /// Fails when the series does not exist or cannot be produced.
    fn series_data(
        &self,
        series_id: &str,
        preferred: Option<StorageLayout>,
    ) -> Result<BinaryFrame, HostError>;

    /// Releases the source's resources. Closing twice is a no-op.
    ///
    /// # Errors
    ///
    /// Fails when shutdown itself fails.
    fn close(&self) -> Result<(), HostError>;
}

/// A data source backed by an external plugin process.
pub struct IpcPlugin {
    name: String,
    descriptor: Option<PluginDescriptor>,
    session: Mutex<Option<PluginSession>>,
}

impl IpcPlugin {
    /// Wraps a discovered executable without starting it. The process
    /// is spawned when the first protocol call arrives.
    #[must_use]
    pub fn new(descriptor: PluginDescriptor) -> Self {
        Self {
            name: descriptor.name().to_owned(),
            descriptor: Some(descriptor),
            session: Mutex::new(None),
        }
    }

    /// Wraps an already running session, taking its name.
    ///
    /// There is no executable to respawn, so after `close` every call
    /// fails with [`HostError::SessionClosed`].
    #[must_use]
    pub fn from_session(session: PluginSession) -> Self {
        Self {
            name: session.name().to_owned(),
            descriptor: None,
            session: Mutex::new(Some(session)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<PluginSession>>, HostError> {
        // A poisoned lock means a panic mid-call; the stream position is
        // unknowable, so the session is treated as gone.
        self.session.lock().map_err(|_| HostError::SessionClosed {
            name: self.name.clone(),
        })
    }

    fn closed(&self) -> HostError {
        HostError::SessionClosed {
            name: self.name.clone(),
        }
    }

    /// Runs one protocol call, spawning the subprocess first when none
    /// is live.
    fn call<R>(
        &self,
        op: impl FnOnce(&mut PluginSession) -> Result<R, HostError>,
    ) -> Result<R, HostError> {
        let mut guard = self.lock()?;
        if guard.is_none() {
            let descriptor = self.descriptor.as_ref().ok_or_else(|| self.closed())?;
            *guard = Some(PluginSession::spawn(
                descriptor.name(),
                descriptor.executable(),
                &[],
            )?);
        }
        let session = guard.as_mut().ok_or_else(|| self.closed())?;
        op(session)
    }
}

impl DataSource for IpcPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u32 {
        HOST_API_VERSION
    }

    fn patterns(&self) -> &[FilePattern] {
        self.descriptor
            .as_ref()
            .map_or(&[], PluginDescriptor::patterns)
    }

    fn info(&self) -> Result<PluginInfo, HostError> {
        self.call(PluginSession::info)
    }

    fn initialize(
        &self,
        args: Option<&str>,
        dialog: &mut dyn DialogHost,
    ) -> Result<Value, HostError> {
        self.call(|session| session.initialize(args, dialog))
    }

    fn chart_config(&self, args: Option<&str>) -> Result<ChartConfig, HostError> {
        self.call(|session| session.chart_config(args))
    }

    fn series_config(&self) -> Result<Vec<SeriesConfig>, HostError> {
        self.call(PluginSession::series_config)
    }

    fn series_data(
        &self,
        series_id: &str,
        preferred: Option<StorageLayout>,
    ) -> Result<BinaryFrame, HostError> {
        self.call(|session| session.series_data(series_id, preferred))
    }

    fn close(&self) -> Result<(), HostError> {
        let mut guard = self.lock()?;
        guard.take().map_or(Ok(()), |mut session| session.close())
    }
}

impl std::fmt::Debug for IpcPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpcPlugin")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
