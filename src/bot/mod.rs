/// Delivery pipeline: download, countdown, send
pub mod delivery;
/// Command, message, and callback handlers
pub mod handlers;
/// Dialogue state for the download conversation
pub mod state;
