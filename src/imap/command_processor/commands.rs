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

use log::{debug, info};

use super::defs::*;
use crate::store::MailStore;

impl CommandProcessor {
    /// Return the greeting line to send to the client.
    pub fn greet(&self) -> r::ResponseLine {
        r::ResponseLine::untagged(ok(GREETING))
    }

    /// Handle one command line (without its line ending).
    ///
    /// `sender` is called with untagged responses and continuation requests
    /// as they are produced.
    ///
    /// Returns the final, tagged response, or `None` if the command is
    /// waiting for a continuation line.
    pub fn handle_line(
        &mut self,
        raw: &str,
        store: &mut MailStore,
        sender: SendResponse<'_>,
    ) -> Option<r::ResponseLine> {
        let line = s::CommandLine::parse(raw);
        let command = s::Command::from_line(&line);

        if let SessionState::Authenticating { .. } = self.state {
            if s::Command::Unknown == command {
                return self.auth_continuation(raw, sender);
            }
        }

        debug!(
            "{} >{}< >{}< >\"{}\"<",
            self.log_prefix,
            line.tag,
            line.command,
            line.args.join("\" \"")
        );

        let res = match command {
            s::Command::Capability => self.cmd_capability(sender),
            s::Command::Noop => self.cmd_noop(),
            s::Command::Logout => self.cmd_log_out(sender),
            s::Command::Authenticate { mechanism } => {
                return self.cmd_authenticate(&line.tag, mechanism, sender);
            },
            s::Command::Login { user, pass } => self.cmd_log_in(user, pass),
            s::Command::Select { mailbox } => {
                self.cmd_select(&line.command, mailbox, store, sender)
            },
            s::Command::Create { mailbox } => {
                self.cmd_create(&line.command, mailbox, store)
            },
            s::Command::List { reference, pattern } => {
                self.cmd_list(&line.command, reference, pattern, store, sender)
            },
            s::Command::Lsub { reference, pattern } => {
                self.cmd_lsub(&line.command, reference, pattern)
            },
            s::Command::Uid {
                subcommand,
                range,
                items,
            } => self.cmd_uid(
                &line.command,
                subcommand,
                range,
                items,
                store,
                sender,
            ),
            s::Command::Unknown => self.cmd_unknown(&line),
        };

        let response = match res {
            Ok(res) => res,
            Err(res) => res,
        };

        Some(r::ResponseLine {
            tag: tag_of(&line.tag),
            response,
        })
    }

    fn cmd_capability(&mut self, sender: SendResponse<'_>) -> CmdResult {
        send_untagged(sender, r::Response::Capability(CAPABILITIES));
        Ok(ok("CAPABILITY completed"))
    }

    fn cmd_noop(&mut self) -> CmdResult {
        Ok(ok("NOOP completed"))
    }

    fn cmd_log_out(&mut self, sender: SendResponse<'_>) -> CmdResult {
        info!("{} Logging out", self.log_prefix);
        send_untagged(
            sender,
            r::Response::cond(
                r::RespCondType::Bye,
                None,
                "IMAP4rev1 Server logging out",
            ),
        );
        self.state = SessionState::LoggedOut;
        Ok(ok("LOGOUT completed"))
    }

    fn cmd_unknown(&mut self, line: &s::CommandLine) -> CmdResult {
        let quip = format!(
            "Not implemented: \"{}\" \"{}\" >\"{}\"<",
            line.tag,
            line.command,
            line.args.join("\" \"")
        );
        debug!("{} {}", self.log_prefix, quip);
        Err(bad(quip))
    }
}

/// Map a client tag to the tag of its response; a missing tag becomes `*`.
pub(super) fn tag_of(tag: &str) -> Option<String> {
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_owned())
    }
}
