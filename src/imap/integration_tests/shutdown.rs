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
use crate::store::DirectoryStorage;
use crate::support::error::Error;
use crate::support::system_config::*;

#[test]
fn clients_told_goodbye() {
    let mut setup = set_up();
    let mut idle = setup.connect();
    let mut busy = setup.connect();
    busy.log_in();

    setup.shut_down();
    idle.expect_line("* BYE Server shutdown");
    idle.expect_eof();
    busy.expect_line("* BYE Server shutdown");
    busy.expect_eof();
}

#[test]
fn index_saved_and_temp_storage_removed() {
    let mut config = SystemConfig::default();
    config.mirror.push(StorageConfig {
        path: "scratch".into(),
        kind: StorageKind::Temp,
    });

    let mut setup = set_up_with(config, |store| {
        store.add_message("INBOX", b"hello", None, true).unwrap();
    });
    assert!(setup.root().join("scratch").is_dir());

    let mut client = setup.connect();
    client.log_in();
    client.command("s SELECT INBOX");

    setup.shut_down();

    assert!(setup.root().join("maildata.idx").is_file());
    assert!(!setup.root().join("scratch").exists());
    assert!(!setup.root().join("scratch.idx").exists());
    assert!(!setup.root().join("scratch.lock").exists());

    // The reopened storage remembers the message, and that SELECT cleared
    // its recency
    let reopened = DirectoryStorage::open(
        setup.root().join("maildata"),
        StorageKind::Normal,
    )
    .unwrap();
    let ids = reopened.folder_messages("INBOX").unwrap();
    assert_eq!(1, ids.len());
    assert_eq!(vec!["\\Seen"], reopened.flags_by_id(ids[0]));
}

#[test]
fn store_held_until_shutdown() {
    let mut setup = set_up();
    let mut client = setup.connect();
    client.log_in();

    assert_matches!(
        Err(Error::StorageLocked),
        DirectoryStorage::open(
            setup.root().join("maildata"),
            StorageKind::Normal,
        )
    );

    setup.shut_down();
    client.expect_line("* BYE Server shutdown");
    DirectoryStorage::open(setup.root().join("maildata"), StorageKind::Normal)
        .unwrap();
}
