use parlor_types::ChannelId;

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Channels,
    History,
    Join(ChannelId),
    Create(String),
    Rename(ChannelId, String),
    Remove(ChannelId),
    Say(String),
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command /{0}, try /help")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

pub const HELP: &str = "\
/channels              list channels
/history               show messages in the current channel
/join <id>             switch channel
/create <name>         add a channel
/rename <id> <name>    rename a channel
/remove <id>           remove a channel
/quit                  leave
anything else is sent to the current channel";

impl Command {
    /// `None` for blank lines.
    pub fn parse(line: &str) -> Option<Result<Self, ParseError>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Ok(Self::Say(line.to_string())));
        };

        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let args = args.trim();
        let parsed = match name {
            "channels" => Ok(Self::Channels),
            "history" => Ok(Self::History),
            "help" => Ok(Self::Help),
            "quit" | "exit" => Ok(Self::Quit),
            "join" => channel_id(args).map(Self::Join).ok_or(ParseError::Usage("/join <id>")),
            "create" if !args.is_empty() => Ok(Self::Create(args.to_string())),
            "create" => Err(ParseError::Usage("/create <name>")),
            "rename" => args
                .split_once(char::is_whitespace)
                .and_then(|(id, name)| Some(Self::Rename(channel_id(id)?, name.trim().to_string())))
                .ok_or(ParseError::Usage("/rename <id> <name>")),
            "remove" => channel_id(args).map(Self::Remove).ok_or(ParseError::Usage("/remove <id>")),
            other => Err(ParseError::Unknown(other.to_string())),
        };
        Some(parsed)
    }
}

fn channel_id(arg: &str) -> Option<ChannelId> {
    arg.trim_start_matches('#').parse().ok()
}
