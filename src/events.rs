use photo_model::PhotoId;

/// Requests handled by the paging task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerCommand {
    /// Drop the current session and load the first page again.
    Refresh,
    /// Append the next page if nothing is in flight.
    LoadMore,
    /// Re-issue whichever load last failed.
    Retry,
}

/// One-shot instructions from the gallery controller to its rendering layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCommand {
    ScrollTo { index: usize },
    /// Transient, non-blocking error notice (e.g. a toast).
    ShowError { message: String },
}

/// Navigation requested by a grid tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    OpenDetail { photo_id: PhotoId, index: usize },
}
