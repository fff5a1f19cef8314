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

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The system-wide configuration for Thimble.
///
/// This is stored in a file named `thimble.toml` under the Thimble system
/// root, which is typically `/usr/local/etc/thimble` or `/etc/thimble`.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// Options for the listening socket and the dispatcher loop.
    #[serde(default)]
    pub server: ServerConfig,

    /// The default storage, which owns the authoritative message index.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Additional storages which receive a copy of every change made to the
    /// default storage.
    #[serde(default)]
    pub mirror: Vec<StorageConfig>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// The address to bind to.
    pub listen: String,

    /// The TCP port to bind to.
    pub port: u16,

    /// How long, in milliseconds, the dispatcher waits for socket readiness
    /// before running another iteration of its loop.
    pub poll_interval_ms: u32,

    /// The maximum number of bytes a client may send without a line
    /// separator. A client exceeding this is disconnected.
    pub max_line_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            listen: "127.0.0.1".to_owned(),
            port: 20143,
            poll_interval_ms: 10,
            max_line_length: 65536,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Index is saved on shutdown.
    Normal,
    /// Directory and index are deleted on shutdown.
    Temp,
}

impl Default for StorageKind {
    fn default() -> Self {
        StorageKind::Normal
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// The root directory of the storage. Relative paths are interpreted
    /// relative to the system root.
    pub path: PathBuf,
    pub kind: StorageKind,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            path: "maildata".into(),
            kind: StorageKind::Normal,
        }
    }
}

impl StorageConfig {
    /// Return the storage path, resolved against `root` if relative.
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(&self.path)
    }
}
