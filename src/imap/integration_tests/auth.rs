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

use super::defs::*;

#[test]
fn authenticate_plain() {
    let setup = set_up();
    let mut client = setup.connect();

    client.send("a1 AUTHENTICATE PLAIN");
    client.expect_line("+");
    client.send(&base64::encode(b"\0azure\0hunter2"));
    client.expect_line("+");
    client.send("");
    client.expect_line("a1 OK PLAIN authentication successful");

    assert_eq!(
        vec![
            "* 0 EXISTS",
            "* 0 RECENT",
            "* OK [UNSEEN 0] Message 0 is first unseen",
            "* FLAGS (\\Answered \\Flagged \\Deleted \\Seen \\Draft)",
            "* OK [PERMANENTFLAGS (\\Deleted \\Seen \\*)] Limited",
            "s OK [READ-WRITE] SELECT completed",
        ],
        client.command("s SELECT INBOX")
    );
}

#[test]
fn authenticate_cancelled() {
    let setup = set_up();
    let mut client = setup.connect();

    client.send("a1 AUTHENTICATE plain");
    client.expect_line("+");
    client.send("*");
    client.expect_line("a1 BAD AUTHENTICATE aborted");

    assert_eq!(vec!["s NO select failure"], client.command("s SELECT INBOX"));
}

#[test]
fn unsupported_mechanism() {
    let setup = set_up();
    let mut client = setup.connect();

    assert_eq!(
        vec!["a1 NO XOAUTH2 Unsupported authentication mechanism"],
        client.command("a1 AUTHENTICATE XOAUTH2")
    );
}

#[test]
fn log_in() {
    let setup = set_up();
    let mut client = setup.connect();

    assert_eq!(
        vec!["c NO create failure"],
        client.command("c CREATE Stuff")
    );
    assert_eq!(
        vec!["L BAD arguments invalid"],
        client.command("L LOGIN azure")
    );
    client.log_in();
    assert_eq!(vec!["c OK CREATE completed"], client.command("c CREATE Stuff"));
}
