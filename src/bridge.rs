//! Command bridge shared by interactive chat bots.
//!
//! Bots relay commands typed in a channel to an executor and post the output
//! back. The notification core does not call these traits; they live here so
//! bots and the core agree on one definition.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Chat platform a command arrived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommPlatform {
    Slack,
    Mattermost,
    Teams,
    Discord,
}

impl fmt::Display for CommPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommPlatform::Slack => "slack",
            CommPlatform::Mattermost => "mattermost",
            CommPlatform::Teams => "teams",
            CommPlatform::Discord => "discord",
        };
        f.write_str(name)
    }
}

/// Runs one command and renders its output as text.
pub trait Executor: Send {
    fn execute(&self) -> String;
}

/// Creates executors for incoming chat commands.
pub trait ExecutorFactory: Send + Sync {
    /// `is_auth_channel` is true when the command came from the channel the
    /// bot is configured for; executors may refuse privileged commands
    /// elsewhere.
    fn new_default(
        &self,
        platform: CommPlatform,
        is_auth_channel: bool,
        command: &str,
    ) -> Box<dyn Executor>;
}
