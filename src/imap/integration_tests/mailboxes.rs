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
fn create_and_list() {
    let setup = set_up();
    let mut client = setup.connect();
    client.log_in();

    for folder in &["Projects.Thimble", "Projects.Other", "Receipts"] {
        assert_eq!(
            vec!["c OK CREATE completed"],
            client.command(&format!("c CREATE {}", folder))
        );
    }
    assert!(setup.root().join("maildata/Projects/Thimble").is_dir());

    assert_eq!(
        vec![
            "* LIST () \".\" INBOX",
            "* LIST () \".\" Projects",
            "* LIST () \".\" Projects.Other",
            "* LIST () \".\" Projects.Thimble",
            "* LIST () \".\" Receipts",
            "l OK LIST completed",
        ],
        client.command("l LIST \"\" *")
    );
    assert_eq!(
        vec![
            "* LIST () \".\" Projects.Other",
            "* LIST () \".\" Projects.Thimble",
            "l OK LIST completed",
        ],
        client.command("l LIST Projects %")
    );
    assert_eq!(
        vec!["l OK LSUB completed"],
        client.command("l LSUB \"\" *")
    );
}

#[test]
fn select_missing_then_empty() {
    let setup = set_up();
    let mut client = setup.connect();
    client.log_in();

    assert_eq!(
        vec!["s NO \"Nowhere\" no such mailbox"],
        client.command("s SELECT Nowhere")
    );

    client.command("c CREATE Empty");
    let responses = client.command("s SELECT Empty");
    assert_eq!("* 0 EXISTS", responses[0]);
    assert_eq!("* 0 RECENT", responses[1]);
    assert_eq!("* OK [UNSEEN 0] Message 0 is first unseen", responses[2]);
    assert_eq!("s OK [READ-WRITE] SELECT completed", responses[5]);
}

#[test]
fn unsafe_names_rejected() {
    let setup = set_up();
    let mut client = setup.connect();
    client.log_in();

    assert_eq!(
        vec!["c NO create failure: Unsafe mailbox name"],
        client.command("c CREATE ../escape")
    );
    assert!(!setup.root().join("escape").exists());
}
