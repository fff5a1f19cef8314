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

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::{error, info};

use super::main::DeliverSubcommand;
use crate::store::{model, MailStore, MessageId};
use crate::support::{error::Error, sysexits::*, system_config::SystemConfig};

pub(super) fn deliver(
    system_config: SystemConfig,
    cmd: DeliverSubcommand,
    root: PathBuf,
) {
    let mut store = match open_store(&system_config, &root) {
        Ok(store) => store,
        Err(exit) => exit.exit(),
    };

    if cmd.create {
        if let Err(e) = store.create_folder(&cmd.folder) {
            fatal!(EX_CANTCREAT, "Failed to create {}: {}", cmd.folder, e);
        }
    } else if !store.folder_exists(&cmd.folder) {
        fatal!(EX_CANTCREAT, "{}: Non-existent folder", cmd.folder);
    }

    let result = run_delivery(
        &cmd,
        cmd.inputs.iter().cloned(),
        io::stdin().lock(),
        StoreTarget {
            store: &mut store,
            folder: &cmd.folder,
        },
    );

    // Whatever was delivered before a failure must still be indexed
    store.shutdown();

    if let Err(exit) = result {
        exit.exit();
    }
}

/// Open the message store, failing with a temporary error if a server or
/// another delivery holds it, so that the MTA retries later.
fn open_store(
    system_config: &SystemConfig,
    root: &Path,
) -> Result<MailStore, Sysexit> {
    MailStore::from_config(system_config, root).map_err(|e| {
        error!("Unable to open message store: {}", e);
        match e {
            Error::StorageLocked => EX_TEMPFAIL,
            _ => EX_CANTCREAT,
        }
    })
}

trait DeliveryTarget {
    fn deliver(
        &mut self,
        flags: Option<Vec<String>>,
        data: &[u8],
    ) -> Result<MessageId, Error>;
}

struct StoreTarget<'a> {
    store: &'a mut MailStore,
    folder: &'a str,
}

impl DeliveryTarget for StoreTarget<'_> {
    fn deliver(
        &mut self,
        flags: Option<Vec<String>>,
        data: &[u8],
    ) -> Result<MessageId, Error> {
        self.store.add_message(self.folder, data, flags, true)
    }
}

fn run_delivery(
    cmd: &DeliverSubcommand,
    items: impl Iterator<Item = PathBuf>,
    mut stdin: impl Read,
    mut target: impl DeliveryTarget,
) -> Result<(), Sysexit> {
    for item in items {
        match deliver_single(cmd, &item, &mut stdin, &mut target) {
            Ok(id) => info!("Delivered {} as {}", item.display(), id),
            Err(e) => {
                error!("Unable to process {}: {}", item.display(), e);
                return Err(match e {
                    Error::Io(e) if io::ErrorKind::NotFound == e.kind() => {
                        EX_NOINPUT
                    },
                    Error::Io(_) => EX_IOERR,
                    _ => EX_SOFTWARE,
                });
            },
        }
    }

    Ok(())
}

fn deliver_single(
    cmd: &DeliverSubcommand,
    item: &Path,
    stdin: &mut impl Read,
    target: &mut impl DeliveryTarget,
) -> Result<MessageId, Error> {
    let data = if Path::new("-") == item {
        let mut data = Vec::new();
        stdin.read_to_end(&mut data)?;
        data
    } else {
        fs::read(item)?
    };

    let mut flags = cmd.flag.clone();
    if cmd.maildir_flags {
        flags.extend(
            extract_maildir_flags(item).into_iter().map(str::to_owned),
        );
    }

    // No flags at all means the store's defaults
    let flags = if flags.is_empty() { None } else { Some(flags) };
    target.deliver(flags, &normalise_line_endings(data))
}

/// Read the flags from the info part of a maildir file name, i.e. the
/// letters following `:2,`.
fn extract_maildir_flags(path: &Path) -> Vec<&'static str> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let info = match name.rfind(":2,") {
        Some(ix) => &name[ix + 3..],
        None => return Vec::new(),
    };

    info.chars()
        .filter_map(|ch| match ch {
            'D' => Some(model::DRAFT),
            'F' => Some(model::FLAGGED),
            'R' => Some(model::ANSWERED),
            'S' => Some(model::SEEN),
            'T' => Some(model::DELETED),
            _ => None,
        })
        .collect()
}

/// Convert UNIX line endings to DOS line endings.
///
/// The first line ending decides: if it is a bare LF, every bare LF becomes
/// CRLF; otherwise the content is left exactly as it is, since it may contain
/// binary data after the headers.
fn normalise_line_endings(data: Vec<u8>) -> Vec<u8> {
    let first_lf = match memchr::memchr(b'\n', &data) {
        Some(ix) => ix,
        None => return data,
    };
    if first_lf > 0 && b'\r' == data[first_lf - 1] {
        return data;
    }

    let mut converted = Vec::with_capacity(data.len() + data.len() / 32);
    let mut start = 0;
    for ix in memchr::memchr_iter(b'\n', &data) {
        converted.extend_from_slice(&data[start..ix]);
        if ix == 0 || b'\r' != data[ix - 1] {
            converted.push(b'\r');
        }
        converted.push(b'\n');
        start = ix + 1;
    }
    converted.extend_from_slice(&data[start..]);
    converted
}

#[cfg(test)]
mod test {
    use std::iter;

    use proptest::prelude::*;
    use tempfile::TempDir;

    use super::*;
    use crate::store::DirectoryStorage;
    use crate::support::system_config::StorageKind;

    fn command(flag: Vec<String>, maildir_flags: bool) -> DeliverSubcommand {
        DeliverSubcommand {
            common: Default::default(),
            folder: "INBOX".to_owned(),
            create: false,
            flag,
            maildir_flags,
            inputs: vec![],
        }
    }

    #[test]
    fn test_extract_maildir_flags() {
        fn extract(s: &str) -> Vec<&'static str> {
            extract_maildir_flags(Path::new(s))
        }

        assert!(extract("foo/bar").is_empty());
        assert!(extract("").is_empty());
        assert!(extract("-").is_empty());

        assert!(extract("foo.2RS").is_empty());
        assert!(extract("cur:2,/msg").is_empty());

        assert_eq!(vec![model::ANSWERED], extract("foo:2,R"));
        assert_eq!(vec![model::SEEN], extract("1600000000.M1P2.host:2,S"));
        assert_eq!(
            vec![
                model::ANSWERED,
                model::FLAGGED,
                model::SEEN,
                model::DELETED,
                model::DRAFT
            ],
            extract("foo/bar:2,RFSxTDy")
        );
    }

    #[test]
    fn line_ending_normalisation() {
        fn norm(s: &str) -> String {
            String::from_utf8(normalise_line_endings(s.as_bytes().to_vec()))
                .unwrap()
        }

        assert_eq!("", norm(""));
        assert_eq!("no line ending", norm("no line ending"));
        assert_eq!("a\r\nb\r\nc\r\n", norm("a\nb\nc\n"));
        // The first line ending decides; a CRLF one means no conversion
        assert_eq!("a\r\nb\nc", norm("a\r\nb\nc"));
        assert_eq!("\r\nbody\r\n", norm("\nbody\n"));
        assert_eq!("Header\r\nmore\r\ntext", norm("Header\nmore\r\ntext"));
        assert_eq!(
            "Header\r\n\r\nbinary\ncontent",
            norm("Header\r\n\r\nbinary\ncontent")
        );
    }

    proptest! {
        #[test]
        fn dos_input_is_verbatim(
            prelude in "[a-z]{0,32}",
            content in "[a-f\r\n\t]{0,100}",
        ) {
            let input = format!("{}\r\n{}", prelude, content);
            let output = normalise_line_endings(input.clone().into_bytes());
            prop_assert_eq!(input.as_bytes(), &output[..]);
        }

        #[test]
        fn unix_conversion_preserves_content(
            prelude in "[a-z]{0,32}",
            content in "[a-f\r\n\t]{0,100}",
        ) {
            let input = format!("{}\n{}", prelude, content);
            let output = normalise_line_endings(input.clone().into_bytes());
            let output = String::from_utf8(output).unwrap();
            prop_assert_eq!(input.replace('\r', ""), output.replace('\r', ""));
            prop_assert_eq!(
                input.matches('\n').count(),
                output.matches("\r\n").count()
            );
        }
    }

    #[derive(Debug, Default)]
    struct MockTarget {
        delivered: Vec<(Option<Vec<String>>, String)>,
    }

    impl DeliveryTarget for &mut MockTarget {
        fn deliver(
            &mut self,
            flags: Option<Vec<String>>,
            data: &[u8],
        ) -> Result<MessageId, Error> {
            self.delivered
                .push((flags, String::from_utf8_lossy(data).into_owned()));
            Ok(MessageId(MessageId::FIRST.0 + self.delivered.len() as u64))
        }
    }

    #[test]
    fn deliver_unix_from_stdin() {
        let flags = vec![model::ANSWERED.to_owned(), "plugh".to_owned()];
        let mut target = MockTarget::default();

        run_delivery(
            &command(flags.clone(), false),
            iter::once(PathBuf::from("-")),
            b"This is a message.\nFoo bar baz.\n" as &[u8],
            &mut target,
        )
        .unwrap();

        assert_eq!(
            vec![(
                Some(flags),
                "This is a message.\r\nFoo bar baz.\r\n".to_owned()
            )],
            target.delivered
        );
    }

    #[test]
    fn deliver_multiple_from_maildir() {
        let tmpdir = TempDir::new().unwrap();
        let path_a = tmpdir.path().join("a:2,D");
        let path_b = tmpdir.path().join("b:2,RT");
        let path_c = tmpdir.path().join("c");
        fs::write(&path_a, b"DOS\r\nContent").unwrap();
        fs::write(&path_b, b"UNIX\nContent").unwrap();
        fs::write(&path_c, b"plain").unwrap();

        let mut target = MockTarget::default();
        run_delivery(
            &command(vec![], true),
            vec![path_a, path_b, path_c].into_iter(),
            b"" as &[u8],
            &mut target,
        )
        .unwrap();

        assert_eq!(
            vec![
                (
                    Some(vec![model::DRAFT.to_owned()]),
                    "DOS\r\nContent".to_owned()
                ),
                (
                    Some(vec![
                        model::ANSWERED.to_owned(),
                        model::DELETED.to_owned()
                    ]),
                    "UNIX\r\nContent".to_owned()
                ),
                (None, "plain".to_owned()),
            ],
            target.delivered
        );
    }

    #[test]
    fn missing_input() {
        let tmpdir = TempDir::new().unwrap();
        let mut target = MockTarget::default();
        assert_eq!(
            Err(EX_NOINPUT),
            run_delivery(
                &command(vec![], false),
                iter::once(tmpdir.path().join("nx")),
                b"" as &[u8],
                &mut target,
            )
        );
        assert!(target.delivered.is_empty());
    }

    #[test]
    fn deliver_into_store() {
        crate::init_test_log();

        let tmpdir = TempDir::new().unwrap();
        let mut store = MailStore::new(
            DirectoryStorage::open(
                tmpdir.path().join("maildata"),
                StorageKind::Normal,
            )
            .unwrap(),
        );

        run_delivery(
            &command(vec![], false),
            iter::once(PathBuf::from("-")),
            b"Subject: hi\n\nhello\n" as &[u8],
            StoreTarget {
                store: &mut store,
                folder: "INBOX",
            },
        )
        .unwrap();

        let ids = store.folder_messages("INBOX").unwrap();
        assert_eq!(1, ids.len());
        assert_eq!(
            b"Subject: hi\r\n\r\nhello\r\n".to_vec(),
            store.message_body(ids[0]).unwrap()
        );
        assert_eq!(
            vec![model::SEEN, model::RECENT],
            store.flags_by_id(ids[0])
        );
    }

    #[test]
    fn busy_store_is_a_temporary_failure() {
        crate::init_test_log();

        let tmpdir = TempDir::new().unwrap();
        let config = SystemConfig::default();
        let held = open_store(&config, tmpdir.path()).unwrap();

        assert_matches!(Err(EX_TEMPFAIL), open_store(&config, tmpdir.path()));

        drop(held);
        open_store(&config, tmpdir.path()).unwrap();
    }
}
