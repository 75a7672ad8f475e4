//! Dialog capability for plugin-initiated configuration forms.
//!
//! A plugin may ask for user input while its `initialize` call is
//! outstanding. The session relays each request to whichever
//! [`DialogHost`] the caller supplied, so the runtime itself stays free
//! of UI concerns; a headless embedding passes [`NoopDialogHost`].

use ridgeline_protocol::{FormAnswer, ShowFormRequest};

use crate::error::HostError;
use crate::session::FormChannel;

/// Presents plugin configuration forms to the user.
///
/// Implementations own all presentation policy, including how often live
/// edits are forwarded through the [`FormChannel`]; the channel itself
/// admits one notification at a time, so a host that debounces keystrokes
/// simply calls [`FormChannel::send_change`] less often.
pub trait DialogHost {
    /// Shows a form and blocks until the user submits or dismisses it.
    ///
    /// When [`ShowFormRequest::handle_form_change`] is set, the
    /// implementation should forward field edits through `channel` and
    /// apply the updates the plugin sends back.
    ///
    /// # Errors
    ///
    /// Returns an error when the form cannot be presented or the channel
    /// fails mid-exchange.
    fn show_form(
        &mut self,
        request: &ShowFormRequest,
        channel: &mut FormChannel<'_>,
    ) -> Result<FormAnswer, HostError>;
}

/// A dialog host for headless embeddings: every form is submitted
/// immediately with its initial field values.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDialogHost;

impl DialogHost for NoopDialogHost {
    fn show_form(
        &mut self,
        request: &ShowFormRequest,
        _channel: &mut FormChannel<'_>,
    ) -> Result<FormAnswer, HostError> {
        Ok(FormAnswer::Submitted(
            request.data().cloned().unwrap_or_default(),
        ))
    }
}
