use parlor_store::Store;
use parlor_types::ChannelId;

use crate::error::ValidationError;

pub const DEFAULT_NAME_MAX: usize = 20;

/// Channel name checks run against the live store right before a submit.
#[derive(Debug, Clone, Copy)]
pub struct NameRules {
    pub max_len: usize,
}

impl Default for NameRules {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_NAME_MAX,
        }
    }
}

impl NameRules {
    /// Returns the trimmed name. `own` is the channel being renamed, whose
    /// current name does not count as taken.
    pub fn check(&self, store: &Store, name: &str, own: Option<ChannelId>) -> Result<String, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        let len = name.chars().count();
        if len > self.max_len {
            return Err(ValidationError::NameTooLong { len, max: self.max_len });
        }
        if store.name_taken(name, own) {
            return Err(ValidationError::NameTaken(name.to_string()));
        }
        Ok(name.to_string())
    }
}

/// A channel that exists and may be renamed or removed.
pub fn check_mutable(store: &Store, id: ChannelId) -> Result<(), ValidationError> {
    if store.is_pending_removal(id) {
        return Err(ValidationError::RemovalPending(id));
    }
    match store.channel(id) {
        None => Err(ValidationError::UnknownChannel(id)),
        Some(channel) if !channel.removable => Err(ValidationError::Locked(id)),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlor_types::{Channel, Snapshot};

    fn store() -> Store {
        Store::from_snapshot(Snapshot {
            channels: vec![
                Channel { id: ChannelId(1), name: "general".into(), removable: false },
                Channel { id: ChannelId(2), name: "random".into(), removable: true },
            ],
            messages: vec![],
            current_channel_id: Some(ChannelId(1)),
        })
    }

    #[test]
    fn trims_and_accepts_fresh_name() {
        assert_eq!(NameRules::default().check(&store(), "  ops ", None).unwrap(), "ops");
    }

    #[test]
    fn rejects_empty_long_and_taken() {
        let rules = NameRules { max_len: 6 };
        let s = store();
        assert_eq!(rules.check(&s, "   ", None), Err(ValidationError::EmptyName));
        assert_eq!(
            rules.check(&s, "abcdefg", None),
            Err(ValidationError::NameTooLong { len: 7, max: 6 })
        );
        assert_eq!(rules.check(&s, "random", None), Err(ValidationError::NameTaken("random".into())));
    }

    #[test]
    fn own_name_is_not_taken() {
        assert!(NameRules::default().check(&store(), "random", Some(ChannelId(2))).is_ok());
    }

    #[test]
    fn default_channel_is_locked() {
        let s = store();
        assert_eq!(check_mutable(&s, ChannelId(1)), Err(ValidationError::Locked(ChannelId(1))));
        assert_eq!(check_mutable(&s, ChannelId(9)), Err(ValidationError::UnknownChannel(ChannelId(9))));
        assert!(check_mutable(&s, ChannelId(2)).is_ok());
    }
}
