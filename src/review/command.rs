use super::messages;
use super::types::IssueComment;

const BOT_NAME: &str = "woodhouse";

/// Instructions users can leave for the bot in a PR comment.
///
/// A comment counts when, ignoring case, it mentions the verb and then the
/// bot's name somewhere after it, e.g. "please go build this, Woodhouse".
/// The bot's own comments never count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Build,
    Stop,
}

impl Command {
    fn verb(self) -> &'static str {
        match self {
            Command::Build => "go",
            Command::Stop => "stop",
        }
    }

    pub fn matches(self, body: &str) -> bool {
        if messages::is_own_comment(body) {
            return false;
        }
        let body = body.to_lowercase();
        match body.find(self.verb()) {
            Some(pos) => body[pos + self.verb().len()..].contains(BOT_NAME),
            None => false,
        }
    }

    /// First comment carrying this command, if any.
    pub fn find(self, comments: &[IssueComment]) -> Option<&IssueComment> {
        comments.iter().find(|comment| self.matches(&comment.body))
    }
}
