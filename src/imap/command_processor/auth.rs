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

//! Authentication.
//!
//! Credentials are accepted without being checked against anything; any
//! client completing `LOGIN` or `AUTHENTICATE PLAIN` is authenticated. The
//! identity the client claims is only used for logging.

use std::mem;

use log::{debug, info};

use super::commands::tag_of;
use super::defs::*;

impl CommandProcessor {
    pub(super) fn cmd_authenticate(
        &mut self,
        tag: &str,
        mechanism: Option<String>,
        sender: SendResponse<'_>,
    ) -> Option<r::ResponseLine> {
        let mechanism = mechanism.unwrap_or_default();
        debug!("{} authenticate: \"{}\"", self.log_prefix, mechanism);

        if !mechanism.eq_ignore_ascii_case("PLAIN") {
            let quip = if mechanism.is_empty() {
                "Unsupported authentication mechanism".to_owned()
            } else {
                format!("{} Unsupported authentication mechanism", mechanism)
            };
            return Some(r::ResponseLine {
                tag: tag_of(tag),
                response: no(quip),
            });
        }

        let previous = mem::replace(&mut self.state, SessionState::LoggedOut);
        let previous = match previous {
            // A restarted exchange resumes from where the first one did
            SessionState::Authenticating { previous, .. } => previous,
            previous => Box::new(previous),
        };
        self.state = SessionState::Authenticating {
            tag: tag.to_owned(),
            mechanism,
            step: AuthStep::AwaitingCredentials,
            previous,
        };
        sender(r::ResponseLine::untagged(r::Response::Continuation));
        None
    }

    /// Handle a line received while an `AUTHENTICATE` exchange is in
    /// progress.
    pub(super) fn auth_continuation(
        &mut self,
        raw: &str,
        sender: SendResponse<'_>,
    ) -> Option<r::ResponseLine> {
        let (tag, mechanism, step, previous) =
            match mem::replace(&mut self.state, SessionState::LoggedOut) {
                SessionState::Authenticating {
                    tag,
                    mechanism,
                    step,
                    previous,
                } => (tag, mechanism, step, previous),
                other => {
                    self.state = other;
                    return None;
                },
            };

        if "*" == raw.trim() {
            debug!("{} AUTHENTICATE aborted", self.log_prefix);
            self.state = *previous;
            return Some(r::ResponseLine {
                tag: tag_of(&tag),
                response: bad("AUTHENTICATE aborted"),
            });
        }

        match step {
            AuthStep::AwaitingCredentials => {
                if let Some(user) = plain_identity(raw) {
                    self.log_prefix.set_user(user);
                }
                self.state = SessionState::Authenticating {
                    tag,
                    mechanism,
                    step: AuthStep::AwaitingConfirmation,
                    previous,
                };
                sender(r::ResponseLine::untagged(r::Response::Continuation));
                None
            },

            AuthStep::AwaitingConfirmation => {
                info!("{} Authenticated via {}", self.log_prefix, mechanism);
                self.state = SessionState::Authenticated;
                Some(r::ResponseLine {
                    tag: tag_of(&tag),
                    response: ok(format!(
                        "{} authentication successful",
                        mechanism
                    )),
                })
            },
        }
    }

    pub(super) fn cmd_log_in(
        &mut self,
        user: Option<String>,
        pass: Option<String>,
    ) -> CmdResult {
        let user = user.filter(|u| !u.is_empty());
        let has_pass = pass.map_or(false, |p| !p.is_empty());

        match user {
            Some(user) if has_pass => {
                self.log_prefix.set_user(user);
                info!("{} Logged in", self.log_prefix);
                self.state = SessionState::Authenticated;
                Ok(ok("LOGIN completed"))
            },
            _ => Err(arguments_invalid()),
        }
    }
}

/// Extract the authentication identity from a base64-encoded SASL PLAIN
/// response (`authzid NUL authcid NUL passwd`).
///
/// Anything that does not decode is ignored.
fn plain_identity(raw: &str) -> Option<String> {
    let decoded = base64::decode(raw.trim()).ok()?;
    let mut parts = decoded.split(|&b| 0 == b);
    let authzid = parts.next()?;
    let authcid = parts.next()?;
    parts.next()?;

    let identity = if authcid.is_empty() { authzid } else { authcid };
    if identity.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(identity).into_owned())
    }
}
