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
use std::net::SocketAddr;

/// Tracks text that should be included in at the start of every log statement
/// concerning one connection.
#[derive(Clone, Debug)]
pub struct LogPrefix {
    protocol: String,
    connection: Option<u64>,
    peer: Option<SocketAddr>,
    user: Option<String>,
}

impl LogPrefix {
    pub fn new(protocol: String) -> Self {
        LogPrefix {
            protocol,
            connection: None,
            peer: None,
            user: None,
        }
    }

    pub fn for_connection(id: u64, peer: Option<SocketAddr>) -> Self {
        LogPrefix {
            protocol: "imap".to_owned(),
            connection: Some(id),
            peer,
            user: None,
        }
    }

    pub fn set_user(&mut self, user: String) {
        self.user = Some(sanitise(user));
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.protocol)?;
        if let Some(connection) = self.connection {
            write!(f, "#{}", connection)?;
        }
        if let Some(ref peer) = self.peer {
            write!(f, "@{}", peer)?;
        }
        if let Some(ref user) = self.user {
            write!(f, "[{}]", user)?;
        }

        Ok(())
    }
}

fn sanitise(mut s: String) -> String {
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(64) {
        s.truncate(truncate_len);
    }

    s
}
