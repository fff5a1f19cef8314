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

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const ANSWERED: &str = "\\Answered";
pub const FLAGGED: &str = "\\Flagged";
pub const DELETED: &str = "\\Deleted";
pub const SEEN: &str = "\\Seen";
pub const DRAFT: &str = "\\Draft";
/// Not a stored flag. It is derived from `Message::recent` whenever flags are
/// reported, and stripped whenever flags are written.
pub const RECENT: &str = "\\Recent";

/// The flags announced by `SELECT`.
pub const FLAG_VOCABULARY: &[&str] = &[ANSWERED, FLAGGED, DELETED, SEEN, DRAFT];

/// The flags a message receives when it is added without explicit flags.
pub const DEFAULT_FLAGS: &[&str] = &[SEEN];

pub fn is_recent_flag(flag: &str) -> bool {
    flag.eq_ignore_ascii_case(RECENT)
}

/// The stable identity of a message, surfaced to clients as its UID.
///
/// Ids are assigned strictly sequentially from `MessageId::FIRST` and are
/// never reused within one storage.
#[derive(
    Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl MessageId {
    pub const FIRST: Self = MessageId(100001);

    pub fn next(self) -> Self {
        MessageId(self.0 + 1)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "MessageId({})", self.0)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message as tracked by the index.
///
/// The body itself lives at `path`; the index only knows where.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub path: PathBuf,
    /// Stored flags, in insertion order, case preserved, without duplicates.
    /// Never contains `\Recent`.
    pub flags: Vec<String>,
    /// Whether the message has been added since its folder was last opened.
    pub recent: bool,
}

impl Message {
    pub fn has_flag(&self, flag: &str) -> bool {
        if is_recent_flag(flag) {
            self.recent
        } else {
            self.flags.iter().any(|f| f == flag)
        }
    }
}

/// Collapse duplicate flags and drop `\Recent`, keeping first occurrences in
/// order.
///
/// Returns the cleaned list and whether a `\Recent` was present.
pub fn normalise_flags<S: AsRef<str>>(flags: &[S]) -> (Vec<String>, bool) {
    let mut out = Vec::<String>::with_capacity(flags.len());
    let mut saw_recent = false;
    for flag in flags {
        let flag = flag.as_ref();
        if is_recent_flag(flag) {
            saw_recent = true;
        } else if !out.iter().any(|f| f == flag) {
            out.push(flag.to_owned());
        }
    }

    (out, saw_recent)
}
