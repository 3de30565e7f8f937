use parlor_store::{Outcome, Store};
use parlor_types::{Channel, Message};

pub fn channel_line(channel: &Channel, current: bool) -> String {
    let marker = if current { '*' } else { ' ' };
    let lock = if channel.removable { "" } else { " (default)" };
    format!("{} #{} {}{}", marker, channel.id, channel.name, lock)
}

pub fn message_line(message: &Message) -> String {
    format!("{}: {}", message.author, message.text)
}

pub fn channel_list(store: &Store) -> Vec<String> {
    let current = store.current_channel_id();
    store
        .channels()
        .map(|c| channel_line(c, Some(c.id) == current))
        .collect()
}

pub fn history(store: &Store) -> Vec<String> {
    match store.current_channel() {
        Some(channel) => std::iter::once(format!("-- #{} {} --", channel.id, channel.name))
            .chain(store.messages_in(channel.id).into_iter().map(message_line))
            .collect(),
        None => vec!["no channel selected".into()],
    }
}

/// What to print for a store change, if anything. Only messages in the
/// current channel are shown inline.
pub fn render(outcome: &Outcome, store: &Store) -> Option<String> {
    match outcome {
        Outcome::MessageInserted(id) => {
            let message = store.message(*id)?;
            (Some(message.channel_id) == store.current_channel_id()).then(|| message_line(message))
        }
        Outcome::ChannelInserted(id) => store.channel(*id).map(|c| format!("+ channel #{} {}", c.id, c.name)),
        Outcome::ChannelRenamed { id, previous } => store
            .channel(*id)
            .map(|c| format!("~ channel #{} {} is now {}", id, previous, c.name)),
        Outcome::ChannelRemoved(removal) | Outcome::ChannelRetired(removal) => {
            let mut line = format!("- channel #{} {}", removal.channel.id, removal.channel.name);
            if let Some(channel) = removal.reselected.and_then(|id| store.channel(id)) {
                line.push_str(&format!(", now in #{} {}", channel.id, channel.name));
            }
            Some(line)
        }
        Outcome::ChannelRestored(id) => store.channel(*id).map(|c| format!("! channel #{} {} restored", c.id, c.name)),
        Outcome::ChannelDisplaced { id, by, reselected } => {
            let mut line = format!("~ channel #{} hidden, #{} now holds its name", id, by);
            if let Some(channel) = reselected.and_then(|id| store.channel(id)) {
                line.push_str(&format!(", now in #{} {}", channel.id, channel.name));
            }
            Some(line)
        }
        Outcome::ChannelReinstated(id) => store.channel(*id).map(|c| format!("+ channel #{} {} is back", c.id, c.name)),
        Outcome::ChannelSelected(_) => Some(history(store).join("\n")),
        Outcome::Reset => Some("-- resynced with server --".into()),
        Outcome::RemovalConfirmed(_) | Outcome::Unchanged(_) => None,
    }
}
