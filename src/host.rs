//! Seams to the host terminal application.
//!
//! The host owns every terminal: it creates and destroys panes, runs the
//! event loop, and delivers content-change notifications. This add-on only
//! observes panes and writes trigger responses into a pane's input stream,
//! through the traits below.

use anyhow::Result;

/// Identifies a terminal pane for the lifetime of the host process.
pub type TerminalId = u64;

/// Token returned by [`TerminalHost::subscribe`]; the host uses it to tear
/// the subscription down together with the pane. This add-on only stores it.
pub type WatchHandle = u64;

/// One terminal pane, borrowed from the host.
pub trait TerminalPane {
    fn id(&self) -> TerminalId;

    /// Row of the cursor within the visible grid.
    fn cursor_row(&self) -> usize;

    /// Width of the visible grid in columns.
    fn column_count(&self) -> usize;

    /// Text between two (row, column) coordinates of the visible grid.
    fn text_range(
        &self,
        start_row: usize,
        start_col: usize,
        end_row: usize,
        end_col: usize,
    ) -> String;

    /// Write bytes to the pane's input stream, as if typed by the user.
    fn write_input(&self, bytes: &[u8]) -> Result<()>;
}

/// The host's view of its live terminals plus the change-subscription
/// primitive. Injected into the watch manager so tests can drive it with a
/// fake pane set and synthetic notifications.
pub trait TerminalHost {
    type Pane: TerminalPane;

    /// Current live pane set. Panes appear here as soon as the host creates
    /// them (including splits opened after start-up).
    fn terminals(&self) -> Vec<Self::Pane>;

    /// Register for content-change notifications on one pane. The host
    /// delivers them by calling the watch manager back on its event-loop
    /// thread.
    fn subscribe(&self, id: TerminalId) -> WatchHandle;
}
