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

//! The message store.
//!
//! A `MailStore` consists of one default storage, which is authoritative for
//! message ids, flags and sequence numbers, plus any number of mirror
//! storages. Every change to message content or the folder tree is replayed
//! onto each mirror, addressing messages by their path relative to the
//! storage root.

pub mod directory;
pub mod index;
pub mod model;

use std::path::Path;

use log::{error, warn};

pub use self::directory::DirectoryStorage;
pub use self::model::{Message, MessageId};
use crate::support::error::Error;
use crate::support::system_config::{StorageKind, SystemConfig};

#[derive(Debug)]
pub struct MailStore {
    default: DirectoryStorage,
    mirrors: Vec<DirectoryStorage>,
}

impl MailStore {
    pub fn new(default: DirectoryStorage) -> Self {
        MailStore {
            default,
            mirrors: Vec::new(),
        }
    }

    /// Open every storage named by `config`, resolving relative paths
    /// against `root`.
    pub fn from_config(config: &SystemConfig, root: &Path) -> Result<Self, Error> {
        let mut store = MailStore::new(DirectoryStorage::open(
            config.storage.resolve(root),
            config.storage.kind,
        )?);
        for mirror in &config.mirror {
            store.add_mirror(DirectoryStorage::open(
                mirror.resolve(root),
                mirror.kind,
            )?);
        }

        Ok(store)
    }

    pub fn add_mirror(&mut self, storage: DirectoryStorage) {
        self.mirrors.push(storage);
    }

    pub fn default_storage(&self) -> &DirectoryStorage {
        &self.default
    }

    pub fn mirrors(&self) -> &[DirectoryStorage] {
        &self.mirrors
    }

    /// Add a message to `folder` in every storage.
    ///
    /// `None` for `flags` gives the message the default flags. Returns the id
    /// the default storage assigned.
    pub fn add_message(
        &mut self,
        folder: &str,
        body: &[u8],
        flags: Option<Vec<String>>,
        recent: bool,
    ) -> Result<MessageId, Error> {
        let id = self.default.add_mail(folder, body, flags.clone(), recent)?;
        self.replicate_add(id, body, flags, recent);
        Ok(id)
    }

    fn replicate_add(
        &mut self,
        id: MessageId,
        body: &[u8],
        flags: Option<Vec<String>>,
        recent: bool,
    ) {
        if self.mirrors.is_empty() {
            return;
        }

        let relative = match self.default.relative_path(id) {
            Some(r) => r,
            None => return,
        };

        for mirror in &mut self.mirrors {
            if let Err(e) =
                mirror.add_mail_at(&relative, body, flags.clone(), recent)
            {
                warn!(
                    "Failed to mirror message {} into {}: {}",
                    id,
                    mirror.root().display(),
                    e
                );
            }
        }
    }

    /// Remove the given message from every storage.
    pub fn remove_message(&mut self, id: MessageId) -> Result<Message, Error> {
        let relative = self.default.relative_path(id);
        let message = self.default.remove_mail(id)?;

        if let Some(relative) = relative {
            for mirror in &mut self.mirrors {
                if let Err(e) = mirror.remove_mail_at(&relative) {
                    warn!(
                        "Failed to remove mirrored message {} from {}: {}",
                        id,
                        mirror.root().display(),
                        e
                    );
                }
            }
        }

        Ok(message)
    }

    pub fn remove_message_by_seq(
        &mut self,
        seq: usize,
        folder: &str,
    ) -> Result<Option<Message>, Error> {
        match self.default.id_by_seq(seq, folder)? {
            Some(id) => self.remove_message(id).map(Some),
            None => Ok(None),
        }
    }

    /// Copy the given message into `dst` in every storage.
    pub fn copy_message(
        &mut self,
        id: MessageId,
        dst: &str,
    ) -> Result<Option<MessageId>, Error> {
        let copy = match self.default.copy_mail_by_id(id, dst)? {
            Some(copy) => copy,
            None => return Ok(None),
        };

        let body = self.default.plain_mail_by_id(copy)?;
        self.replicate_add(copy, &body, None, true);
        Ok(Some(copy))
    }

    pub fn copy_message_by_seq(
        &mut self,
        seq: usize,
        folder: &str,
        dst: &str,
    ) -> Result<Option<MessageId>, Error> {
        match self.default.id_by_seq(seq, folder)? {
            Some(id) => self.copy_message(id, dst),
            None => Ok(None),
        }
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.default.message(id)
    }

    pub fn message_body(&self, id: MessageId) -> Result<Vec<u8>, Error> {
        self.default.plain_mail_by_id(id)
    }

    /// Create `folder` in every storage.
    ///
    /// Returns whether the default storage did not have it yet.
    pub fn create_folder(&mut self, folder: &str) -> Result<bool, Error> {
        let created = self.default.create_folder(folder)?;
        for mirror in &self.mirrors {
            mirror.create_folder(folder)?;
        }
        Ok(created)
    }

    pub fn folder_exists(&self, folder: &str) -> bool {
        self.default.folder_exists(folder)
    }

    /// Search the folder tree of the default storage.
    ///
    /// The result is sorted. Searching for `INBOX` from the root lists every
    /// folder below INBOX.
    pub fn folders(
        &self,
        base: &str,
        pattern: &str,
        recursive: bool,
    ) -> Result<Vec<String>, Error> {
        let mut folders = if base.is_empty() && "INBOX" == pattern {
            self.default.folders("INBOX", "*", true)?
        } else {
            self.default.folders(base, pattern, recursive)?
        };
        folders.sort();
        Ok(folders)
    }

    /// The messages of `folder` in sequence number order.
    pub fn folder_messages(
        &self,
        folder: &str,
    ) -> Result<Vec<MessageId>, Error> {
        self.default.folder_messages(folder)
    }

    pub fn count<S: AsRef<str>>(
        &self,
        folder: &str,
        flags: &[S],
    ) -> Result<usize, Error> {
        self.default.count(folder, flags)
    }

    pub fn seq_by_id(&self, id: MessageId) -> Result<usize, Error> {
        self.default.seq_by_id(id)
    }

    pub fn id_by_seq(
        &self,
        seq: usize,
        folder: &str,
    ) -> Result<Option<MessageId>, Error> {
        self.default.id_by_seq(seq, folder)
    }

    pub fn ids_by_flags<S: AsRef<str>>(&self, flags: &[S]) -> Vec<MessageId> {
        self.default.ids_by_flags(flags)
    }

    pub fn flags_by_id(&self, id: MessageId) -> Vec<String> {
        self.default.flags_by_id(id)
    }

    pub fn set_flags_by_id<S: AsRef<str>>(
        &mut self,
        id: MessageId,
        flags: &[S],
    ) -> bool {
        self.default.set_flags_by_id(id, flags)
    }

    pub fn flags_by_seq(
        &self,
        seq: usize,
        folder: &str,
    ) -> Result<Vec<String>, Error> {
        self.default.flags_by_seq(seq, folder)
    }

    pub fn set_flags_by_seq<S: AsRef<str>>(
        &mut self,
        seq: usize,
        folder: &str,
        flags: &[S],
    ) -> Result<bool, Error> {
        self.default.set_flags_by_seq(seq, folder, flags)
    }

    pub fn next_message_id(&self) -> MessageId {
        self.default.next_msg_id()
    }

    /// Persist every storage.
    ///
    /// Normal storages have their index saved; temporary storages are
    /// deleted. Failures are logged and do not stop the remaining storages
    /// from being handled.
    pub fn shutdown(&self) {
        for storage in std::iter::once(&self.default).chain(&self.mirrors) {
            let result = match storage.kind() {
                StorageKind::Normal => storage.save(),
                StorageKind::Temp => storage.destroy(),
            };

            if let Err(e) = result {
                error!(
                    "Failed to shut down storage {}: {}",
                    storage.root().display(),
                    e
                );
            }
        }
    }
}
