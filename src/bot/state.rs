use serde::{Deserialize, Serialize};

/// Represents the current position of a chat in the download conversation
///
/// One value lives per chat in `InMemStorage`, so the pending URL is owned
/// by exactly one session and a second link cannot enter the pipeline while
/// a format choice is still outstanding.
#[derive(Clone, Serialize, Deserialize, Default)]
pub enum State {
    /// Initial state, nothing requested yet
    #[default]
    Start,
    /// Greeting sent, waiting for a media link
    AwaitingLink,
    /// Link accepted, waiting for the audio/video choice
    AwaitingFormat {
        /// The validated URL the user sent
        url: String,
    },
}
