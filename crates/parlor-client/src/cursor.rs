/// Position in the server's push stream.
///
/// Servers that keep an event log stamp every frame with a monotonic `seq`.
/// The cursor remembers the last one applied so a reconnect can ask for a
/// replay, and notices when frames were skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct Cursor {
    last: Option<u64>,
    /// No sequenced frame seen yet on the current connection.
    fresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// First sequenced frame seen on this session.
    First,
    Next,
    /// Already applied; skip it.
    Duplicate,
    /// Frames between `expected` and `got` were lost.
    Gap { expected: u64, got: u64 },
    /// A new connection started below the cursor: the server lost its log.
    Restarted { last: u64, got: u64 },
    /// The server does not sequence its frames.
    Unsequenced,
}

impl Cursor {
    pub fn last(&self) -> Option<u64> {
        self.last
    }

    /// Call on every new connection, before its first frame.
    pub fn reconnected(&mut self) {
        self.fresh = true;
    }

    pub fn observe(&mut self, seq: Option<u64>) -> Check {
        let Some(seq) = seq else {
            return Check::Unsequenced;
        };
        let fresh = std::mem::replace(&mut self.fresh, false);
        let check = match self.last {
            None => Check::First,
            Some(last) if fresh && seq < last => Check::Restarted { last, got: seq },
            Some(last) if seq <= last => return Check::Duplicate,
            Some(last) if seq == last + 1 => Check::Next,
            Some(last) => Check::Gap {
                expected: last + 1,
                got: seq,
            },
        };
        self.last = Some(seq);
        check
    }

    /// Push URL asking the server to replay everything after the cursor.
    pub fn resume_url(&self, url: &str) -> String {
        match self.last {
            Some(seq) => {
                let sep = if url.contains('?') { '&' } else { '?' };
                format!("{}{}since={}", url, sep, seq)
            }
            None => url.to_string(),
        }
    }
}
