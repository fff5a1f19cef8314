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
fn greeting_capability_logout() {
    let setup = set_up();
    let mut client = setup.connect();

    assert_eq!(
        vec!["* CAPABILITY IMAP4rev1 AUTH=PLAIN", "1 OK CAPABILITY completed"],
        client.command("1 CAPABILITY")
    );
    assert_eq!(vec!["2 OK NOOP completed"], client.command("2 noop"));
    assert_eq!(
        vec!["* BYE IMAP4rev1 Server logging out", "3 OK LOGOUT completed"],
        client.command("3 LOGOUT")
    );
    client.expect_eof();
}

#[test]
fn two_commands_in_one_write() {
    let setup = set_up();
    let mut client = setup.connect();

    client.write_raw(b"a NOOP\r\nb CAPABILITY\r\n");
    client.expect_line("a OK NOOP completed");
    client.expect_line("* CAPABILITY IMAP4rev1 AUTH=PLAIN");
    client.expect_line("b OK CAPABILITY completed");
}

#[test]
fn command_split_across_writes() {
    let setup = set_up();
    let mut client = setup.connect();

    client.write_raw(b"a NO");
    std::thread::sleep(std::time::Duration::from_millis(50));
    client.write_raw(b"OP\nb NOOP\r\n");
    client.expect_line("a OK NOOP completed");
    client.expect_line("b OK NOOP completed");
}

#[test]
fn unknown_command() {
    let setup = set_up();
    let mut client = setup.connect();

    assert_eq!(
        vec!["x BAD Not implemented: \"x\" \"STATUS\" >\"INBOX\" \"(MESSAGES)\"<"],
        client.command("x STATUS INBOX (MESSAGES)")
    );
}

#[test]
fn overlong_line_disconnects() {
    let setup = set_up();
    let mut client = setup.connect();

    // Exactly one byte too many, so that the server has read everything
    // before it hangs up
    client.write_raw(&vec![b'x'; TEST_MAX_LINE_LENGTH + 1]);
    client.expect_line("* BYE Command line too long");
    client.expect_eof();

    // Other clients are unaffected
    let mut client = setup.connect();
    assert_eq!(vec!["a OK NOOP completed"], client.command("a NOOP"));
}

#[test]
fn many_clients() {
    let setup = set_up();
    let mut clients = (0..8).map(|_| setup.connect()).collect::<Vec<_>>();

    for (ix, client) in clients.iter_mut().enumerate() {
        client.send(&format!("c{} NOOP", ix));
    }
    for (ix, client) in clients.iter_mut().enumerate().rev() {
        client.expect_line(&format!("c{} OK NOOP completed", ix));
    }
}
