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

use lazy_static::lazy_static;
use regex::Regex;

use super::defs::*;
use crate::store::model;
use crate::support::system_config::SystemConfig;

lazy_static! {
    static ref FETCH_LINE: Regex =
        Regex::new(r"^\* ([0-9]+) FETCH \((?:FLAGS \(([^)]*)\) )?UID ([0-9]+)\)$")
            .unwrap();
}

fn set_up_inbox() -> Setup {
    set_up_with(SystemConfig::default(), |store| {
        store.add_message("INBOX", b"first", None, true).unwrap();
        store
            .add_message(
                "INBOX",
                b"second",
                Some(vec![model::FLAGGED.to_owned()]),
                true,
            )
            .unwrap();
        store.add_message("INBOX", b"third", None, false).unwrap();
        store.add_message("Elsewhere", b"other", None, true).unwrap();
    })
}

/// Parse a FETCH line into (seqnum, flags, uid).
fn parse_fetch(line: &str) -> (usize, Option<String>, u64) {
    let captures = FETCH_LINE
        .captures(line)
        .unwrap_or_else(|| panic!("Not a FETCH line: {:?}", line));
    (
        captures[1].parse().unwrap(),
        captures.get(2).map(|m| m.as_str().to_owned()),
        captures[3].parse().unwrap(),
    )
}

#[test]
fn select_reports_recent_messages() {
    let setup = set_up_inbox();
    let mut client = setup.connect();
    client.log_in();

    let responses = client.command("s SELECT INBOX");
    assert_eq!("* 3 EXISTS", responses[0]);
    assert_eq!("* 2 RECENT", responses[1]);
    assert_eq!("* OK [UNSEEN 1] Message 1 is first unseen", responses[2]);

    // The first SELECT used up recency
    let responses = client.command("s SELECT INBOX");
    assert_eq!("* 3 EXISTS", responses[0]);
    assert_eq!("* 0 RECENT", responses[1]);
}

#[test]
fn uid_fetch_flags() {
    let setup = set_up_inbox();
    let mut client = setup.connect();
    client.log_in();
    client.command("s SELECT INBOX");

    let responses = client.command("f UID FETCH 1:3 (FLAGS)");
    assert_eq!(4, responses.len());
    assert_eq!("f OK UID FETCH completed", responses[3]);

    let fetched = responses[..3]
        .iter()
        .map(|line| parse_fetch(line))
        .collect::<Vec<_>>();
    assert_eq!(
        vec![
            (1, Some("\\Seen".to_owned()), 100001),
            (2, Some("\\Flagged".to_owned()), 100002),
            (3, Some("\\Seen".to_owned()), 100003),
        ],
        fetched
    );

    let responses = client.command("f UID FETCH 1:*");
    let fetched = responses[..3]
        .iter()
        .map(|line| parse_fetch(line))
        .collect::<Vec<_>>();
    assert_eq!(
        vec![(1, None, 100001), (2, None, 100002), (3, None, 100003)],
        fetched
    );
}

#[test]
fn uid_errors() {
    let setup = set_up_inbox();
    let mut client = setup.connect();
    client.log_in();

    assert_eq!(
        vec!["f BAD No messages in selected mailbox"],
        client.command("f UID FETCH 1:3 (FLAGS)")
    );

    client.command("s SELECT INBOX");
    assert_eq!(
        vec!["f BAD Invalid minimum sequence number: \"0\""],
        client.command("f UID FETCH 0:3 (FLAGS)")
    );
    assert_eq!(
        vec!["f BAD Copy not implemented"],
        client.command("f UID COPY 1:3 Elsewhere")
    );
    assert_eq!(
        vec!["f BAD Store not implemented"],
        client.command("f UID STORE 1 FLAGS (\\Seen)")
    );
    assert_eq!(
        vec!["f BAD arguments invalid"],
        client.command("f UID FETCH")
    );
}
