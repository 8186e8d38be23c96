//! Texts the bot posts on pull requests.

pub const BUILD_ACK: &str = "As you wish, sir.";
pub const STOPPED_MESSAGE: &str = "The build for this pull request was stopped.";
pub const SUCCESS_DESCRIPTION: &str = "The Jenkins job for this pull request succeeded.";
pub const FAILURE_DESCRIPTION: &str = "The Jenkins job for this pull request failed.";

/// Comments the bot itself writes. They can mention the bot's name in a
/// build link and must never be read back as commands.
const OWN_COMMENTS: [&str; 4] = [
    BUILD_ACK,
    STOPPED_MESSAGE,
    SUCCESS_DESCRIPTION,
    FAILURE_DESCRIPTION,
];

pub fn is_own_comment(body: &str) -> bool {
    let body = body.trim_start();
    OWN_COMMENTS.iter().any(|text| body.starts_with(text))
}
