//! Keep-alive seam: holds the host process awake while tracking runs and
//! carries the current status summary.

/// Something that keeps monitoring alive and shows its status.
pub trait KeepAlive: Send + Sync {
    /// Acquires the keep-alive with an initial summary.
    fn acquire(&self, summary: &str) -> Box<dyn KeepAliveHandle>;
}

/// An acquired keep-alive. Released explicitly when monitoring ends.
pub trait KeepAliveHandle: Send + Sync {
    /// Replaces the displayed summary.
    fn update(&self, summary: &str);

    fn release(self: Box<Self>);
}
