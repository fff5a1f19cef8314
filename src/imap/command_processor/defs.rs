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

use std::borrow::Cow;

use log::error;

pub(super) use crate::imap::response_writer as r;
pub(super) use crate::imap::syntax as s;
use crate::support::{error::Error, log_prefix::LogPrefix};

pub(super) static CAPABILITIES: &[&str] = &["IMAP4rev1", "AUTH=PLAIN"];

pub(super) static GREETING: &str = "IMAP4rev1 Service Ready";

/// The state of one IMAP session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    NotAuthenticated,
    /// An `AUTHENTICATE` exchange is in progress.
    Authenticating {
        /// The tag of the `AUTHENTICATE` command, used for the final response.
        tag: String,
        /// The mechanism as the client spelled it.
        mechanism: String,
        step: AuthStep,
        /// Where to return to if the client cancels the exchange.
        previous: Box<SessionState>,
    },
    Authenticated,
    Selected(String),
    LoggedOut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthStep {
    /// The client has been invited to send its credentials.
    AwaitingCredentials,
    /// The credentials were received; the next line completes the exchange.
    AwaitingConfirmation,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        match *self {
            SessionState::Authenticated | SessionState::Selected(_) => true,
            _ => false,
        }
    }

    pub fn selected(&self) -> Option<&str> {
        match *self {
            SessionState::Selected(ref folder) => Some(folder),
            _ => None,
        }
    }
}

/// Receives command lines, drives the session state machine, and emits
/// responses.
///
/// The processor does not own the message store; it is lent one for each
/// command, since all sessions of the server share it.
pub struct CommandProcessor {
    pub(super) log_prefix: LogPrefix,
    pub(super) state: SessionState,
}

/// Used just for the convenient `?` operator. We mostly don't distinguish `Ok`
/// from `Err` --- the contained value is sent down the wire.
pub(super) type CmdResult = Result<r::Response, r::Response>;

/// Return value from an operation that can either succeed with a value, or
/// fail with an IMAP response.
pub(super) type PartialResult<T> = Result<T, r::Response>;

/// Callback used to send untagged responses and continuation requests as they
/// become available.
pub type SendResponse<'a> = &'a mut dyn FnMut(r::ResponseLine);

impl CommandProcessor {
    pub fn new(log_prefix: LogPrefix) -> Self {
        CommandProcessor {
            log_prefix,
            state: SessionState::NotAuthenticated,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    pub fn logged_out(&self) -> bool {
        SessionState::LoggedOut == self.state
    }

    pub fn log_prefix(&self) -> &LogPrefix {
        &self.log_prefix
    }

    /// Fail with `NO "<command> failure"` unless the session is
    /// authenticated.
    pub(super) fn require_auth(&self, command: &str) -> PartialResult<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(no(format!("{} failure", command.to_lowercase())))
        }
    }
}

pub(super) fn ok(quip: impl Into<Cow<'static, str>>) -> r::Response {
    r::Response::cond(r::RespCondType::Ok, None, quip)
}

pub(super) fn no(quip: impl Into<Cow<'static, str>>) -> r::Response {
    r::Response::cond(r::RespCondType::No, None, quip)
}

pub(super) fn bad(quip: impl Into<Cow<'static, str>>) -> r::Response {
    r::Response::cond(r::RespCondType::Bad, None, quip)
}

pub(super) fn arguments_invalid() -> r::Response {
    bad("arguments invalid")
}

/// Send an untagged response through `sender`.
pub(super) fn send_untagged(
    sender: &mut dyn FnMut(r::ResponseLine),
    response: r::Response,
) {
    sender(r::ResponseLine::untagged(response));
}

#[cfg(not(test))]
pub(super) fn catch_all_error_handling(
    log_prefix: &LogPrefix,
    e: Error,
) -> r::Response {
    error!("{} Unhandled internal error: {}", log_prefix, e);
    r::Response::cond(
        r::RespCondType::No,
        Some(r::RespTextCode::ServerBug),
        "Unexpected error; check server logs for details",
    )
}

#[cfg(test)]
pub(super) fn catch_all_error_handling(
    log_prefix: &LogPrefix,
    e: Error,
) -> r::Response {
    error!("{} Unhandled internal error: {}", log_prefix, e);
    panic!("{} Unhandled internal error: {}", log_prefix, e);
}
