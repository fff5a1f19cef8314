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

//! Implements the IMAP protocol, specifically that which is not sensitive to
//! the socket handling.
//!
//! This module is split into several submodules for manageability, but is
//! best thought of as one single module.

macro_rules! map_error {
    ($this:expr) => {{
        let log_prefix = &$this.log_prefix;
        move |e| catch_all_error_handling(log_prefix, e)
    }};

    ($this:expr, $($($kind:ident)|+ => ($cond:ident, $prefix:expr),)+) => {{
        let log_prefix = &$this.log_prefix;
        move |e| match e {
            $($(Error::$kind)|* => r::Response::cond(
                r::RespCondType::$cond,
                None,
                format!("{}{}", $prefix, e),
            ),)*
            e => catch_all_error_handling(log_prefix, e),
        }
    }};
}

mod auth;
mod commands;
mod defs;
mod mailboxes;
mod messages;

pub use self::defs::{AuthStep, CommandProcessor, SendResponse, SessionState};
