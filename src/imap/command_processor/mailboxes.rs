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

use log::info;

use super::defs::*;
use crate::store::{directory::glob_regex, model, MailStore};
use crate::support::error::Error;

impl CommandProcessor {
    pub(super) fn cmd_select(
        &mut self,
        command: &str,
        mailbox: Option<String>,
        store: &mut MailStore,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.require_auth(command)?;
        let mailbox = nonempty(mailbox)?;

        if !store.folder_exists(&mailbox) {
            self.state = SessionState::Authenticated;
            return Err(no(format!("\"{}\" no such mailbox", mailbox)));
        }

        let ids = store.folder_messages(&mailbox).map_err(map_error!(self))?;
        let recent = ids
            .iter()
            .filter(|&&id| store.message(id).map_or(false, |m| m.recent))
            .copied()
            .collect::<Vec<_>>();
        let first_recent = ids
            .iter()
            .position(|id| recent.contains(id))
            .map_or(0, |ix| ix + 1);

        send_untagged(sender, r::Response::Exists(ids.len()));
        send_untagged(sender, r::Response::Recent(recent.len()));
        send_untagged(
            sender,
            r::Response::cond(
                r::RespCondType::Ok,
                Some(r::RespTextCode::Unseen(first_recent)),
                format!("Message {} is first unseen", first_recent),
            ),
        );
        send_untagged(
            sender,
            r::Response::Flags(
                model::FLAG_VOCABULARY
                    .iter()
                    .map(|&f| Cow::Borrowed(f))
                    .collect(),
            ),
        );
        send_untagged(
            sender,
            r::Response::cond(
                r::RespCondType::Ok,
                Some(r::RespTextCode::PermanentFlags(vec![
                    Cow::Borrowed(model::DELETED),
                    Cow::Borrowed(model::SEEN),
                    Cow::Borrowed("\\*"),
                ])),
                "Limited",
            ),
        );

        // Opening the mailbox is what makes its messages no longer recent
        for id in recent {
            let flags = store
                .message(id)
                .map(|m| m.flags.clone())
                .unwrap_or_default();
            store.set_flags_by_id(id, &flags);
        }

        info!("{} Selected {}", self.log_prefix, mailbox);
        self.state = SessionState::Selected(mailbox);
        Ok(r::Response::cond(
            r::RespCondType::Ok,
            Some(r::RespTextCode::ReadWrite),
            "SELECT completed",
        ))
    }

    pub(super) fn cmd_create(
        &mut self,
        command: &str,
        mailbox: Option<String>,
        store: &mut MailStore,
    ) -> CmdResult {
        self.require_auth(command)?;
        let mailbox = nonempty(mailbox)?;

        let created = store.create_folder(&mailbox).map_err(map_error! {
            self,
            UnsafeName => (No, "create failure: "),
        })?;
        if created {
            info!("{} Created {}", self.log_prefix, mailbox);
        }

        Ok(ok("CREATE completed"))
    }

    /// `LIST [reference] pattern`.
    ///
    /// A dotted pattern searches below the folder named by its prefix, so
    /// `Archive.%` lists the direct children of `Archive`. A pattern
    /// containing `*` searches the whole subtree.
    pub(super) fn cmd_list(
        &mut self,
        command: &str,
        reference: Option<String>,
        pattern: Option<String>,
        store: &mut MailStore,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.require_auth(command)?;
        let (reference, pattern) = match pattern {
            Some(pattern) => (reference.unwrap_or_default(), Some(pattern)),
            None => (String::new(), reference),
        };
        let pattern = nonempty(pattern)?;

        let list = |name: String| r::Response::List { name };

        if pattern.eq_ignore_ascii_case("INBOX") {
            send_untagged(sender, list("INBOX".to_owned()));
            return Ok(ok("LIST completed"));
        }

        let (base, leaf) = match pattern.rfind('.') {
            Some(dot) => (
                join_folder(&reference, &pattern[..dot]),
                &pattern[dot + 1..],
            ),
            None => (reference, pattern.as_str()),
        };

        let mut listed_inbox = false;
        if base.is_empty() || base.eq_ignore_ascii_case("INBOX") {
            let matcher = glob_regex(leaf).map_err(map_error! {
                self,
                BadPattern => (Bad, ""),
            })?;
            if matcher.is_match("INBOX") {
                send_untagged(sender, list("INBOX".to_owned()));
                listed_inbox = true;
            }
        }

        let folders = store
            .folders(&base, leaf, pattern.contains('*'))
            .map_err(map_error! {
                self,
                UnsafeName | MaxFolderDepth => (No, "list failure: "),
                BadPattern => (Bad, ""),
            })?;
        for folder in folders {
            if listed_inbox && folder.eq_ignore_ascii_case("INBOX") {
                continue;
            }
            send_untagged(sender, list(folder));
        }

        Ok(ok("LIST completed"))
    }

    /// `LSUB` succeeds without listing anything; there are no subscriptions.
    pub(super) fn cmd_lsub(
        &mut self,
        command: &str,
        reference: Option<String>,
        pattern: Option<String>,
    ) -> CmdResult {
        self.require_auth(command)?;
        nonempty(pattern.or(reference))?;
        Ok(ok("LSUB completed"))
    }
}

fn nonempty(arg: Option<String>) -> PartialResult<String> {
    arg.filter(|a| !a.is_empty()).ok_or_else(arguments_invalid)
}

fn join_folder(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_owned()
    } else if child.is_empty() {
        parent.to_owned()
    } else {
        format!("{}.{}", parent, child)
    }
}
