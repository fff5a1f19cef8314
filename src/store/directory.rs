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

//! Directory-backed storage.
//!
//! A storage is a directory tree rooted at some path `P`. The logical folder
//! `INBOX` is `P` itself; any other folder `a.b.c` is the directory `P/a/b/c`.
//! Each message is a file named `mail_<id>.eml` directly inside its folder's
//! directory, with the id zero-padded to 32 digits, so that the lexicographic
//! order of paths within a folder is also the id order.
//!
//! The message index of the storage lives beside it, in `P.idx`, and is
//! saved after every change. An open storage holds an exclusive `flock` on
//! `P.lock`, so only one process at a time can use it.
//!
//! Sequence numbers are never stored. Every query that needs one lists the
//! folder anew.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use nix::errno::Errno;
use nix::fcntl::{flock, FlockArg};
use regex::Regex;

use super::index::MessageIndex;
use super::model::*;
use crate::support::error::Error;
use crate::support::file_ops::{self, IgnoreKinds};
use crate::support::safe_name::is_safe_name;
use crate::support::system_config::StorageKind;

/// The maximum directory depth explored by a folder search.
pub const MAX_FOLDER_DEPTH: u32 = 100;

const MESSAGE_EXTENSION: &str = "eml";

#[derive(Debug)]
pub struct DirectoryStorage {
    root: PathBuf,
    index_path: PathBuf,
    lock_path: PathBuf,
    kind: StorageKind,
    index: MessageIndex,
    // Closing the file releases the lock
    _lock: fs::File,
}

impl DirectoryStorage {
    /// Open the storage rooted at `root`, creating the directory if needed and
    /// loading its index.
    ///
    /// Fails with `StorageLocked` if another `DirectoryStorage` (in this or
    /// any other process) has the same storage open.
    pub fn open(root: PathBuf, kind: StorageKind) -> Result<Self, Error> {
        fs::create_dir_all(&root)?;
        let lock_path = sibling_path(&root, ".lock");
        let lock = lock_file(&lock_path)?;
        let index_path = index_path_for(&root);
        let index = MessageIndex::load(&index_path)?;
        info!(
            "Opened {:?} storage at {} with {} message(s)",
            kind,
            root.display(),
            index.len()
        );

        Ok(DirectoryStorage {
            root,
            index_path,
            lock_path,
            kind,
            index,
            _lock: lock,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    /// Map a logical folder name to its directory.
    ///
    /// `INBOX` (in any case) and the empty name are the storage root. Empty
    /// parts of the name are skipped, so `a..b.` is the same as `a.b`, but a
    /// name made only of separators, like `..`, names nothing and is
    /// rejected.
    pub fn folder_path(&self, folder: &str) -> Result<PathBuf, Error> {
        if folder.is_empty() || folder.eq_ignore_ascii_case("INBOX") {
            return Ok(self.root.clone());
        }

        let mut path = self.root.clone();
        let mut parts = 0;
        for part in folder.split('.').filter(|p| !p.is_empty()) {
            if !is_safe_name(part) {
                return Err(Error::UnsafeName);
            }
            path.push(part);
            parts += 1;
        }

        if 0 == parts {
            return Err(Error::UnsafeName);
        }

        Ok(path)
    }

    pub fn folder_exists(&self, folder: &str) -> bool {
        self.folder_path(folder)
            .map(|p| p.is_dir())
            .unwrap_or(false)
    }

    /// Create the given folder and any missing parents.
    ///
    /// Returns `false` if the folder already existed.
    pub fn create_folder(&self, folder: &str) -> Result<bool, Error> {
        let path = self.folder_path(folder)?;
        if path.exists() {
            return Ok(false);
        }

        fs::create_dir_all(&path)?;
        debug!("Created folder {} at {}", folder, path.display());
        Ok(true)
    }

    /// Find folders below `base` whose directory name matches the glob
    /// `pattern`.
    ///
    /// `*` and `%` match any run of characters within one name, `?` matches
    /// any single character. With `recursive`, the whole tree below `base` is
    /// searched, otherwise only its direct children. The returned names are
    /// full logical names relative to the storage root, in no particular
    /// order.
    pub fn folders(
        &self,
        base: &str,
        pattern: &str,
        recursive: bool,
    ) -> Result<Vec<String>, Error> {
        let base_path = self.folder_path(base)?;
        let matcher = glob_regex(pattern)?;
        let mut found = Vec::new();
        self.search_folders(&base_path, &matcher, recursive, 0, &mut found)?;
        Ok(found)
    }

    fn search_folders(
        &self,
        dir: &Path,
        matcher: &Regex,
        recursive: bool,
        level: u32,
        found: &mut Vec<String>,
    ) -> Result<(), Error> {
        if level >= MAX_FOLDER_DEPTH {
            return Err(Error::MaxFolderDepth);
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if io::ErrorKind::NotFound == e.kind() => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(_) => continue,
            };
            if !is_safe_name(&name) {
                continue;
            }

            let path = entry.path();
            if matcher.is_match(&name) {
                if let Some(logical) = self.logical_name(&path) {
                    found.push(logical);
                }
            }

            if recursive {
                self.search_folders(
                    &path,
                    matcher,
                    recursive,
                    level + 1,
                    found,
                )?;
            }
        }

        Ok(())
    }

    fn logical_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()?;
        Some(parts.join("."))
    }

    /// List the indexed messages of `folder`, in sequence number order.
    ///
    /// Files in the folder that the index does not know about are not
    /// messages and are skipped. A missing folder has no messages.
    pub fn folder_messages(
        &self,
        folder: &str,
    ) -> Result<Vec<MessageId>, Error> {
        let path = self.folder_path(folder)?;
        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(e) if io::ErrorKind::NotFound == e.kind() => {
                return Ok(Vec::new())
            },
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if Some(MESSAGE_EXTENSION) == path.extension().and_then(|e| e.to_str())
                && entry.file_type()?.is_file()
            {
                paths.push(path);
            }
        }
        paths.sort();

        Ok(paths
            .iter()
            .filter_map(|p| self.index.id_by_path(p))
            .collect())
    }

    /// Count the messages in `folder` carrying all of `flags`.
    pub fn count<S: AsRef<str>>(
        &self,
        folder: &str,
        flags: &[S],
    ) -> Result<usize, Error> {
        Ok(self
            .folder_messages(folder)?
            .into_iter()
            .filter_map(|id| self.index.get(id))
            .filter(|m| flags.iter().all(|f| m.has_flag(f.as_ref())))
            .count())
    }

    /// Add a new message with content `body` to `folder`.
    pub fn add_mail(
        &mut self,
        folder: &str,
        body: &[u8],
        flags: Option<Vec<String>>,
        recent: bool,
    ) -> Result<MessageId, Error> {
        let mut path = self.folder_path(folder)?;
        path.push(message_file_name(self.index.next_id()));
        self.write_message(path, body, flags, recent)
    }

    /// Add a new message at the given location relative to the storage root.
    ///
    /// This is how mirrors replicate messages, so that a message has the same
    /// relative path in every storage regardless of the ids each one assigns.
    pub fn add_mail_at(
        &mut self,
        relative: &Path,
        body: &[u8],
        flags: Option<Vec<String>>,
        recent: bool,
    ) -> Result<MessageId, Error> {
        let path = self.root.join(relative);
        if !path.starts_with(&self.root)
            || relative.is_absolute()
            || relative
                .components()
                .any(|c| std::path::Component::ParentDir == c)
        {
            return Err(Error::UnsafeName);
        }

        self.write_message(path, body, flags, recent)
    }

    fn write_message(
        &mut self,
        path: PathBuf,
        body: &[u8],
        flags: Option<Vec<String>>,
        recent: bool,
    ) -> Result<MessageId, Error> {
        // Refuse before touching the file so the indexed content survives
        if self.index.id_by_path(&path).is_some() {
            return Err(Error::PathInUse);
        }

        let dir = path.parent().ok_or(Error::UnsafeName)?.to_owned();
        fs::create_dir_all(&dir)?;
        file_ops::spit(&dir, &path, 0o640, body)?;

        let id = self.index.add(path, flags, recent)?;
        self.persist()?;
        debug!("Added message {} to {}", id, dir.display());
        Ok(id)
    }

    /// Remove the given message from the index and delete its file.
    pub fn remove_mail(&mut self, id: MessageId) -> Result<Message, Error> {
        let message = self.index.remove(id)?;
        fs::remove_file(&message.path).ignore_not_found()?;
        self.persist()?;
        debug!("Removed message {}", id);
        Ok(message)
    }

    /// Remove the message at the given location relative to the storage
    /// root, if there is one.
    pub fn remove_mail_at(
        &mut self,
        relative: &Path,
    ) -> Result<Option<Message>, Error> {
        match self.index.id_by_path(&self.root.join(relative)) {
            Some(id) => self.remove_mail(id).map(Some),
            None => Ok(None),
        }
    }

    /// Return the location of the given message relative to the storage
    /// root.
    pub fn relative_path(&self, id: MessageId) -> Option<PathBuf> {
        self.index
            .get(id)
            .and_then(|m| m.path.strip_prefix(&self.root).ok())
            .map(Path::to_owned)
    }

    /// Copy the given message into `dst` as a new message with default flags.
    ///
    /// Unknown and empty messages are not copied.
    pub fn copy_mail_by_id(
        &mut self,
        id: MessageId,
        dst: &str,
    ) -> Result<Option<MessageId>, Error> {
        let body = self.plain_mail_by_id(id)?;
        if body.is_empty() {
            return Ok(None);
        }

        self.add_mail(dst, &body, None, true).map(Some)
    }

    pub fn copy_mail_by_seq(
        &mut self,
        seq: usize,
        folder: &str,
        dst: &str,
    ) -> Result<Option<MessageId>, Error> {
        match self.id_by_seq(seq, folder)? {
            Some(id) => self.copy_mail_by_id(id, dst),
            None => Ok(None),
        }
    }

    /// Read the content of the given message.
    ///
    /// Unknown messages and messages whose file has gone missing are empty.
    pub fn plain_mail_by_id(&self, id: MessageId) -> Result<Vec<u8>, Error> {
        let message = match self.index.get(id) {
            Some(m) => m,
            None => return Ok(Vec::new()),
        };

        match fs::read(&message.path) {
            Ok(data) => Ok(data),
            Err(e) if io::ErrorKind::NotFound == e.kind() => {
                warn!(
                    "Message {} is indexed but {} is missing",
                    id,
                    message.path.display()
                );
                Ok(Vec::new())
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Return the 1-based sequence number of the given message within its
    /// folder, or 0 if it is unknown.
    pub fn seq_by_id(&self, id: MessageId) -> Result<usize, Error> {
        let message = match self.index.get(id) {
            Some(m) => m,
            None => return Ok(0),
        };

        let folder = message
            .path
            .parent()
            .and_then(|p| self.logical_name(p))
            .unwrap_or_default();

        Ok(self
            .folder_messages(&folder)?
            .into_iter()
            .position(|i| i == id)
            .map_or(0, |ix| ix + 1))
    }

    /// Resolve a 1-based sequence number within `folder`.
    pub fn id_by_seq(
        &self,
        seq: usize,
        folder: &str,
    ) -> Result<Option<MessageId>, Error> {
        if 0 == seq {
            return Ok(None);
        }

        Ok(self.folder_messages(folder)?.get(seq - 1).copied())
    }

    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.index.get(id)
    }

    pub fn ids_by_flags<S: AsRef<str>>(&self, flags: &[S]) -> Vec<MessageId> {
        self.index.ids_by_flags(flags)
    }

    pub fn flags_by_id(&self, id: MessageId) -> Vec<String> {
        self.index.flags_by_id(id)
    }

    pub fn set_flags_by_id<S: AsRef<str>>(
        &mut self,
        id: MessageId,
        flags: &[S],
    ) -> bool {
        let changed = self.index.set_flags_by_id(id, flags);
        if changed {
            if let Err(e) = self.persist() {
                warn!(
                    "Failed to save index {} after flag change: {}",
                    self.index_path.display(),
                    e
                );
            }
        }
        changed
    }

    pub fn flags_by_seq(
        &self,
        seq: usize,
        folder: &str,
    ) -> Result<Vec<String>, Error> {
        Ok(self
            .id_by_seq(seq, folder)?
            .map(|id| self.index.flags_by_id(id))
            .unwrap_or_default())
    }

    pub fn set_flags_by_seq<S: AsRef<str>>(
        &mut self,
        seq: usize,
        folder: &str,
        flags: &[S],
    ) -> Result<bool, Error> {
        Ok(match self.id_by_seq(seq, folder)? {
            Some(id) => {
                self.index.set_flags_by_id(id, flags);
                self.persist()?;
                true
            },
            None => false,
        })
    }

    pub fn next_msg_id(&self) -> MessageId {
        self.index.next_id()
    }

    /// Write the index to its durable form.
    pub fn save(&self) -> Result<(), Error> {
        self.index.save(&self.index_path)?;
        debug!("Saved index {}", self.index_path.display());
        Ok(())
    }

    /// Save the index of a normal storage. Temporary ones are never read
    /// back.
    fn persist(&self) -> Result<(), Error> {
        match self.kind {
            StorageKind::Normal => self.save(),
            StorageKind::Temp => Ok(()),
        }
    }

    /// Remove the storage directory, its index and its lock file from the
    /// file system.
    pub fn destroy(&self) -> Result<(), Error> {
        fs::remove_dir_all(&self.root).ignore_not_found()?;
        fs::remove_file(&self.index_path).ignore_not_found()?;
        fs::remove_file(&self.lock_path).ignore_not_found()?;
        info!("Removed temporary storage {}", self.root.display());
        Ok(())
    }
}

fn index_path_for(root: &Path) -> PathBuf {
    sibling_path(root, ".idx")
}

fn sibling_path(root: &Path, suffix: &str) -> PathBuf {
    // Path::components() normalises away any trailing separator
    let root: PathBuf = root.components().collect();
    let mut name = OsString::from(root.as_os_str());
    name.push(suffix);
    name.into()
}

/// Open `path` and take an exclusive, non-blocking `flock` on it.
fn lock_file(path: &Path) -> Result<fs::File, Error> {
    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .mode(0o600)
        .open(path)?;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(()) => Ok(file),
        Err(e) if Errno::EWOULDBLOCK == e => {
            warn!("{} is already locked", path.display());
            Err(Error::StorageLocked)
        },
        Err(e) => Err(e.into()),
    }
}

fn message_file_name(id: MessageId) -> String {
    format!("mail_{:032}.{}", id.0, MESSAGE_EXTENSION)
}

/// Compile a folder search pattern into an anchored regex.
pub fn glob_regex(pattern: &str) -> Result<Regex, Error> {
    let mut rx = String::with_capacity(pattern.len() + 8);
    rx.push('^');
    for ch in pattern.chars() {
        match ch {
            '*' | '%' => rx.push_str(".*"),
            '?' => rx.push('.'),
            ch => {
                let mut buf = [0u8; 4];
                rx.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
            },
        }
    }
    rx.push('$');

    Regex::new(&rx).map_err(|_| Error::BadPattern)
}
