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

use log::debug;

use super::defs::*;
use crate::store::MailStore;
use crate::support::error::Error;

impl CommandProcessor {
    /// `UID <subcommand> <range> [items]`.
    ///
    /// Only `FETCH` does anything. It always reports every message of the
    /// selected mailbox; the range is validated but does not narrow the
    /// result.
    pub(super) fn cmd_uid(
        &mut self,
        command: &str,
        subcommand: Option<String>,
        range: Option<String>,
        items: Option<String>,
        store: &mut MailStore,
        sender: SendResponse<'_>,
    ) -> CmdResult {
        self.require_auth(command)?;
        let subcommand = subcommand
            .filter(|s| !s.is_empty())
            .ok_or_else(arguments_invalid)?;
        let raw_range =
            range.filter(|r| !r.is_empty()).ok_or_else(arguments_invalid)?;

        let range = s::SeqRange::parse(&raw_range).ok_or_else(|| {
            bad(format!(
                "Invalid minimum sequence number: \"{}\"",
                s::SeqRange::min_text(&raw_range)
            ))
        })?;

        let ids = match self.state.selected() {
            Some(folder) => {
                store.folder_messages(folder).map_err(map_error!(self))?
            },
            None => Vec::new(),
        };
        if ids.is_empty() {
            return Err(bad("No messages in selected mailbox"));
        }

        let items = match items {
            Some(items) => {
                s::parse_parenthesized_list(&items).map_err(map_error! {
                    self,
                    ParseDepthExceeded => (Bad, ""),
                })?
            },
            None => Vec::new(),
        };

        debug!(
            "{} UID {} over {:?} of {} message(s)",
            self.log_prefix,
            subcommand,
            range,
            ids.len()
        );

        match subcommand.to_lowercase().as_str() {
            "fetch" => {
                for (ix, &id) in ids.iter().enumerate() {
                    let mut atts = Vec::new();
                    for item in &items {
                        let wants_flags = item
                            .as_atom()
                            .map_or(false, |a| "flags" == a.to_lowercase());
                        if wants_flags {
                            atts.push(r::FetchAtt::Flags(
                                store.flags_by_id(id),
                            ));
                        }
                    }
                    atts.push(r::FetchAtt::Uid(id));

                    send_untagged(
                        sender,
                        r::Response::Fetch {
                            seqnum: ix + 1,
                            atts,
                        },
                    );
                }

                Ok(ok("UID FETCH completed"))
            },
            "copy" => Err(bad("Copy not implemented")),
            "store" => Err(bad("Store not implemented")),
            _ => Err(arguments_invalid()),
        }
    }
}
