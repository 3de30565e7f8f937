use std::collections::{BTreeMap, BTreeSet, HashMap};

use parlor_types::{Channel, ChannelId, Message, MessageId, Snapshot};

/// Every state transition the store accepts. Local submits and push events
/// both go through these, so whichever path sees an entity first wins and the
/// other one lands as a no-op.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    InsertChannel(Channel),
    RenameChannel { id: ChannelId, name: String },
    /// Authoritative removal (server push). Also settles a pending removal.
    RemoveChannel(ChannelId),
    /// Optimistic removal: hides the channel but keeps a tombstone so the
    /// removal can be reverted if the server refuses it.
    RetireChannel(ChannelId),
    ConfirmRemoval(ChannelId),
    RevertRemoval(ChannelId),
    InsertMessage(Message),
    SelectChannel(ChannelId),
    /// Replace everything with a fresh server snapshot.
    Reset(Snapshot),
}

/// A channel taken out of the live view, with the messages that went with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Removal {
    pub channel: Channel,
    pub messages: Vec<Message>,
    /// Set when the removed channel was the current one.
    pub reselected: Option<ChannelId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    ChannelInserted(ChannelId),
    ChannelRenamed { id: ChannelId, previous: String },
    ChannelRemoved(Removal),
    ChannelRetired(Removal),
    RemovalConfirmed(ChannelId),
    ChannelRestored(ChannelId),
    /// `id` was hidden because `by` now holds its name. It comes back once
    /// its own rename (or removal) arrives.
    ChannelDisplaced {
        id: ChannelId,
        by: ChannelId,
        reselected: Option<ChannelId>,
    },
    ChannelReinstated(ChannelId),
    MessageInserted(MessageId),
    ChannelSelected(ChannelId),
    Reset,
    Unchanged(Noop),
}

/// Why an action left the store untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum Noop {
    DuplicateChannel(ChannelId),
    DuplicateMessage(MessageId),
    UnknownChannel(ChannelId),
    /// The server already removed this id; ids are never reused.
    Removed(ChannelId),
    SameName(ChannelId),
    PendingRemoval(ChannelId),
    NoTombstone(ChannelId),
    AlreadySelected(ChannelId),
}

impl Outcome {
    pub fn is_change(&self) -> bool {
        !matches!(self, Outcome::Unchanged(_))
    }
}

/// Normalized, deduplicated view of channels and messages for one session.
#[derive(Debug, Clone, Default)]
pub struct Store {
    channels: BTreeMap<ChannelId, Channel>,
    messages: BTreeMap<MessageId, Message>,
    current_channel_id: Option<ChannelId>,
    tombstones: HashMap<ChannelId, Removal>,
    /// Channels whose name was taken over by a newer server change. Events
    /// for the same server state can arrive in any order, so the old holder
    /// waits here until its own rename lands.
    displaced: BTreeMap<ChannelId, Channel>,
    removed: BTreeSet<ChannelId>,
    /// Side effects of the last `apply`, drained by [`Store::take_followups`].
    followups: Vec<Outcome>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut store = Self::new();
        store.reset(snapshot);
        store
    }

    pub fn apply(&mut self, action: Action) -> Outcome {
        let outcome = match action {
            Action::InsertChannel(channel) => self.insert_channel(channel),
            Action::RenameChannel { id, name } => self.rename_channel(id, name),
            Action::RemoveChannel(id) => self.remove_channel(id),
            Action::RetireChannel(id) => self.retire_channel(id),
            Action::ConfirmRemoval(id) => self.confirm_removal(id),
            Action::RevertRemoval(id) => self.revert_removal(id),
            Action::InsertMessage(message) => self.insert_message(message),
            Action::SelectChannel(id) => self.select_channel(id),
            Action::Reset(snapshot) => {
                self.reset(snapshot);
                Outcome::Reset
            }
        };
        if outcome.is_change() {
            self.reinstate_displaced();
        }
        outcome
    }

    /// Changes the last actions caused besides their own outcome, in order.
    pub fn take_followups(&mut self) -> Vec<Outcome> {
        std::mem::take(&mut self.followups)
    }

    // -- Reducers --

    fn insert_channel(&mut self, channel: Channel) -> Outcome {
        let id = channel.id;
        if self.tombstones.contains_key(&id) {
            return Outcome::Unchanged(Noop::PendingRemoval(id));
        }
        if self.channels.contains_key(&id) || self.displaced.contains_key(&id) {
            return Outcome::Unchanged(Noop::DuplicateChannel(id));
        }
        if self.removed.contains(&id) {
            return Outcome::Unchanged(Noop::Removed(id));
        }
        if let Some(holder) = self.holder_of(&channel.name, None) {
            self.displace(holder, id);
        }

        self.channels.insert(id, channel);
        if self.current_channel_id.is_none() {
            self.current_channel_id = Some(id);
        }
        Outcome::ChannelInserted(id)
    }

    fn rename_channel(&mut self, id: ChannelId, name: String) -> Outcome {
        if let Some(tombstone) = self.tombstones.get_mut(&id) {
            // Keep the tombstone current so a revert restores the latest name.
            tombstone.channel.name = name;
            return Outcome::Unchanged(Noop::PendingRemoval(id));
        }
        if let Some(channel) = self.displaced.get_mut(&id) {
            if channel.name == name {
                return Outcome::Unchanged(Noop::SameName(id));
            }
            let previous = std::mem::replace(&mut channel.name, name);
            return Outcome::ChannelRenamed { id, previous };
        }
        let Some(unchanged) = self.channels.get(&id).map(|c| c.name == name) else {
            return Outcome::Unchanged(Noop::UnknownChannel(id));
        };
        if unchanged {
            return Outcome::Unchanged(Noop::SameName(id));
        }
        if let Some(holder) = self.holder_of(&name, Some(id)) {
            self.displace(holder, id);
        }

        match self.channels.get_mut(&id) {
            Some(channel) => {
                let previous = std::mem::replace(&mut channel.name, name);
                Outcome::ChannelRenamed { id, previous }
            }
            None => Outcome::Unchanged(Noop::UnknownChannel(id)),
        }
    }

    fn remove_channel(&mut self, id: ChannelId) -> Outcome {
        // Also covers a removal that overtakes the channel's creation.
        self.removed.insert(id);
        if self.tombstones.remove(&id).is_some() {
            self.purge_messages(id);
            return Outcome::RemovalConfirmed(id);
        }
        if let Some(channel) = self.displaced.remove(&id) {
            return Outcome::ChannelRemoved(Removal {
                channel,
                messages: self.drain_messages(id),
                reselected: None,
            });
        }
        match self.take_channel(id) {
            Some(removal) => Outcome::ChannelRemoved(removal),
            None => Outcome::Unchanged(Noop::UnknownChannel(id)),
        }
    }

    fn retire_channel(&mut self, id: ChannelId) -> Outcome {
        if self.tombstones.contains_key(&id) {
            return Outcome::Unchanged(Noop::PendingRemoval(id));
        }
        let Some(removal) = self.take_channel(id) else {
            return Outcome::Unchanged(Noop::UnknownChannel(id));
        };
        self.tombstones.insert(id, removal.clone());
        Outcome::ChannelRetired(removal)
    }

    fn confirm_removal(&mut self, id: ChannelId) -> Outcome {
        if self.tombstones.remove(&id).is_none() {
            return Outcome::Unchanged(Noop::NoTombstone(id));
        }
        self.removed.insert(id);
        // Messages pushed while the removal was in flight go too.
        self.purge_messages(id);
        Outcome::RemovalConfirmed(id)
    }

    fn revert_removal(&mut self, id: ChannelId) -> Outcome {
        let Some(removal) = self.tombstones.remove(&id) else {
            return Outcome::Unchanged(Noop::NoTombstone(id));
        };
        for message in removal.messages {
            self.messages.entry(message.id).or_insert(message);
        }
        // The server still has the channel, but another one took its name
        // meanwhile. Keep it aside until its rename arrives.
        if let Some(holder) = self.holder_of(&removal.channel.name, Some(id)) {
            self.displaced.insert(id, removal.channel);
            return Outcome::ChannelDisplaced {
                id,
                by: holder,
                reselected: None,
            };
        }

        self.channels.insert(id, removal.channel);
        if self.current_channel_id.is_none() {
            self.current_channel_id = Some(id);
        }
        Outcome::ChannelRestored(id)
    }

    fn insert_message(&mut self, message: Message) -> Outcome {
        let id = message.id;
        if self.messages.contains_key(&id) {
            return Outcome::Unchanged(Noop::DuplicateMessage(id));
        }
        // The channel may not have arrived yet; forward references are kept.
        self.messages.insert(id, message);
        Outcome::MessageInserted(id)
    }

    fn select_channel(&mut self, id: ChannelId) -> Outcome {
        if !self.channels.contains_key(&id) {
            return Outcome::Unchanged(Noop::UnknownChannel(id));
        }
        if self.current_channel_id == Some(id) {
            return Outcome::Unchanged(Noop::AlreadySelected(id));
        }
        self.current_channel_id = Some(id);
        Outcome::ChannelSelected(id)
    }

    fn reset(&mut self, snapshot: Snapshot) {
        let mut pending = std::mem::take(&mut self.tombstones);

        self.channels = snapshot.channels.into_iter().map(|c| (c.id, c)).collect();
        self.messages = snapshot.messages.into_iter().map(|m| (m.id, m)).collect();

        // A pending removal survives only if the server still has the channel.
        pending.retain(|id, _| self.channels.contains_key(id));
        for (id, removal) in pending.iter_mut() {
            if let Some(channel) = self.channels.remove(id) {
                removal.channel = channel;
            }
            removal.messages = self.drain_messages(*id);
        }
        self.tombstones = pending;
        self.displaced.clear();
        self.followups.clear();
        self.removed.retain(|id| !self.channels.contains_key(id) && !self.tombstones.contains_key(id));

        self.current_channel_id = snapshot
            .current_channel_id
            .filter(|id| self.channels.contains_key(id))
            .or_else(|| self.default_channel_id());
    }

    // -- Helpers --

    fn take_channel(&mut self, id: ChannelId) -> Option<Removal> {
        let channel = self.channels.remove(&id)?;
        let messages = self.drain_messages(id);
        let reselected = if self.current_channel_id == Some(id) {
            self.current_channel_id = self.default_channel_id();
            self.current_channel_id
        } else {
            None
        };
        Some(Removal {
            channel,
            messages,
            reselected,
        })
    }

    /// Hide the live channel `id` because `by` is taking its name.
    fn displace(&mut self, id: ChannelId, by: ChannelId) {
        let Some(channel) = self.channels.remove(&id) else {
            return;
        };
        let reselected = if self.current_channel_id == Some(id) {
            self.current_channel_id = self.default_channel_id();
            self.current_channel_id
        } else {
            None
        };
        self.displaced.insert(id, channel);
        self.followups.push(Outcome::ChannelDisplaced { id, by, reselected });
    }

    fn reinstate_displaced(&mut self) {
        let ids: Vec<ChannelId> = self.displaced.keys().copied().collect();
        for id in ids {
            let free = self
                .displaced
                .get(&id)
                .is_some_and(|c| self.holder_of(&c.name, None).is_none());
            if !free {
                continue;
            }
            if let Some(channel) = self.displaced.remove(&id) {
                self.channels.insert(id, channel);
                if self.current_channel_id.is_none() {
                    self.current_channel_id = Some(id);
                }
                self.followups.push(Outcome::ChannelReinstated(id));
            }
        }
    }

    fn drain_messages(&mut self, channel_id: ChannelId) -> Vec<Message> {
        let ids: Vec<MessageId> = self
            .messages
            .values()
            .filter(|m| m.channel_id == channel_id)
            .map(|m| m.id)
            .collect();
        ids.iter().filter_map(|id| self.messages.remove(id)).collect()
    }

    fn purge_messages(&mut self, channel_id: ChannelId) {
        self.messages.retain(|_, m| m.channel_id != channel_id);
    }

    fn holder_of(&self, name: &str, except: Option<ChannelId>) -> Option<ChannelId> {
        self.channels
            .values()
            .find(|c| c.name == name && Some(c.id) != except)
            .map(|c| c.id)
    }

    /// First non-removable channel, else the lowest id.
    fn default_channel_id(&self) -> Option<ChannelId> {
        self.channels
            .values()
            .find(|c| !c.removable)
            .or_else(|| self.channels.values().next())
            .map(|c| c.id)
    }

    // -- Selectors --

    /// Channels in id order.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(&id)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.values().map(|c| c.name.as_str()).collect()
    }

    /// Whether `name` belongs to a channel other than `except`, live or
    /// displaced.
    pub fn name_taken(&self, name: &str, except: Option<ChannelId>) -> bool {
        self.holder_of(name, except).is_some()
            || self
                .displaced
                .values()
                .any(|c| c.name == name && Some(c.id) != except)
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.get(&id)
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Messages of one channel in server (id) order.
    pub fn messages_in(&self, channel_id: ChannelId) -> Vec<&Message> {
        self.messages
            .values()
            .filter(|m| m.channel_id == channel_id)
            .collect()
    }

    pub fn current_channel_id(&self) -> Option<ChannelId> {
        self.current_channel_id
    }

    pub fn current_channel(&self) -> Option<&Channel> {
        self.current_channel_id.and_then(|id| self.channels.get(&id))
    }

    pub fn is_pending_removal(&self, id: ChannelId) -> bool {
        self.tombstones.contains_key(&id)
    }

    pub fn is_displaced(&self, id: ChannelId) -> bool {
        self.displaced.contains_key(&id)
    }
}
