//-
// Copyright (c) 2026, Jason Lingle
//
// This file is part of Thimble.
//
// Thimble is free software: you can  redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Thimble is distributed  in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Thimble. If not, see <http://www.gnu.org/licenses/>.

//! The message index.
//!
//! The index maps message ids to their location and flags, and keeps a reverse
//! map from location to id. The two maps are only ever mutated together
//! through the methods below.
//!
//! The durable form is a single CBOR document written atomically.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::prelude::*;
use log::debug;
use serde::{Deserialize, Serialize};

use super::model::*;
use crate::support::error::Error;
use crate::support::file_ops;

#[derive(Deserialize, Serialize, Clone, Debug)]
struct IndexData {
    /// The last id that was handed out.
    last_id: u64,
    messages: BTreeMap<MessageId, Message>,
    time_created: DateTime<Utc>,
}

impl Default for IndexData {
    fn default() -> Self {
        IndexData {
            last_id: MessageId::FIRST.0 - 1,
            messages: BTreeMap::new(),
            time_created: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MessageIndex {
    data: IndexData,
    by_path: HashMap<PathBuf, MessageId>,
}

impl MessageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index stored at `path`.
    ///
    /// A missing file yields an empty index.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if io::ErrorKind::NotFound == e.kind() => {
                debug!("No index at {}, starting empty", path.display());
                return Ok(Self::new());
            },
            Err(e) => return Err(e.into()),
        };

        let data: IndexData = serde_cbor::from_slice(&data)?;
        let by_path = data
            .messages
            .values()
            .map(|m| (m.path.clone(), m.id))
            .collect();
        Ok(MessageIndex { data, by_path })
    }

    /// Atomically write the index to `path`.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let serialised = serde_cbor::to_vec(&self.data)?;
        let tmp = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        file_ops::spit(tmp, path, 0o600, &serialised)?;
        Ok(())
    }

    /// Add a message located at `path`, returning its new id.
    ///
    /// `None` for `flags` gives the message the default flags. A `\Recent`
    /// among the flags is not stored but forces the message to be recent.
    ///
    /// Fails with `PathInUse` if another message already lives at `path`.
    pub fn add(
        &mut self,
        path: PathBuf,
        flags: Option<Vec<String>>,
        recent: bool,
    ) -> Result<MessageId, Error> {
        if self.by_path.contains_key(&path) {
            return Err(Error::PathInUse);
        }

        let (flags, recent) = match flags {
            None => (
                DEFAULT_FLAGS.iter().map(|&f| f.to_owned()).collect(),
                recent,
            ),
            Some(flags) => {
                let (flags, saw_recent) = normalise_flags(&flags);
                (flags, recent || saw_recent)
            },
        };

        self.data.last_id += 1;
        let id = MessageId(self.data.last_id);
        self.by_path.insert(path.clone(), id);
        self.data.messages.insert(
            id,
            Message {
                id,
                path,
                flags,
                recent,
            },
        );
        Ok(id)
    }

    /// Remove the message with the given id from the index.
    pub fn remove(&mut self, id: MessageId) -> Result<Message, Error> {
        let message = self.data.messages.remove(&id).ok_or(Error::NxMessage)?;
        self.by_path.remove(&message.path);
        Ok(message)
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.data.messages.get(&id)
    }

    pub fn id_by_path(&self, path: &Path) -> Option<MessageId> {
        self.by_path.get(path).copied()
    }

    /// Return the ids of all messages carrying any of `flags`, in ascending
    /// order.
    pub fn ids_by_flags<S: AsRef<str>>(&self, flags: &[S]) -> Vec<MessageId> {
        self.data
            .messages
            .values()
            .filter(|m| flags.iter().any(|f| m.has_flag(f.as_ref())))
            .map(|m| m.id)
            .collect()
    }

    /// Return the flags of the given message, with `\Recent` appended if the
    /// message is recent. Unknown ids have no flags.
    pub fn flags_by_id(&self, id: MessageId) -> Vec<String> {
        let message = match self.data.messages.get(&id) {
            Some(m) => m,
            None => return Vec::new(),
        };

        let mut flags = message.flags.clone();
        if message.recent {
            flags.push(RECENT.to_owned());
        }
        flags
    }

    /// Replace the stored flags of the given message.
    ///
    /// The message stops being recent. Returns whether the message exists.
    pub fn set_flags_by_id<S: AsRef<str>>(
        &mut self,
        id: MessageId,
        flags: &[S],
    ) -> bool {
        match self.data.messages.get_mut(&id) {
            Some(message) => {
                message.flags = normalise_flags(flags).0;
                message.recent = false;
                true
            },
            None => false,
        }
    }

    /// Move the given message to a new location.
    ///
    /// Returns whether the message was moved, which it is not if it does not
    /// exist or if a different message already lives at `path`.
    pub fn set_path_by_id(&mut self, id: MessageId, path: PathBuf) -> bool {
        if self.by_path.get(&path).map_or(false, |&owner| owner != id) {
            return false;
        }

        let message = match self.data.messages.get_mut(&id) {
            Some(m) => m,
            None => return false,
        };

        self.by_path.remove(&message.path);
        self.by_path.insert(path.clone(), id);
        message.path = path;
        true
    }

    /// The id the next added message will receive.
    pub fn next_id(&self) -> MessageId {
        MessageId(self.data.last_id).next()
    }

    pub fn len(&self) -> usize {
        self.data.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.messages.is_empty()
    }

    pub fn time_created(&self) -> DateTime<Utc> {
        self.data.time_created
    }
}
