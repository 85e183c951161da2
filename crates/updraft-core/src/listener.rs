use crate::changelog::ChangeLog;

/// Callback surface both sessions report through, owned by the embedding
/// application (a dialog, a status bar, a console front-end).
///
/// For one operation exactly one terminal callback fires:
/// [`on_update_available`](Self::on_update_available) or
/// [`on_update_error`](Self::on_update_error) for a check,
/// [`on_update_download_finished`](Self::on_update_download_finished) or
/// [`on_update_error`](Self::on_update_error) for a download. The one
/// exception mirrors the download contract: a finished download whose
/// installer fails to start reports the finish and then the launch error.
pub trait UpdateStatusListener: Send + Sync {
    /// An empty changelog means no update is available.
    fn on_update_available(&self, changelog: ChangeLog);

    /// `percent` is in `0..=100` and never decreases within one download.
    fn on_update_download_progress(&self, percent: f32);

    fn on_update_download_finished(&self);

    fn on_update_error(&self, message: String);
}
