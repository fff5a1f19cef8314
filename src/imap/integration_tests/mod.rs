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

//! The integration tests are "full-stack" tests which run the real dispatcher
//! on a loopback socket and talk to it over TCP, with as little "reaching
//! under the covers" as possible.
//!
//! Each test gets its own system root and its own server thread, listening on
//! a port chosen by the OS. Dropping the `Setup` shuts the server down.

mod defs;

mod auth;
mod first_contact;
mod mailboxes;
mod messages;
mod shutdown;
