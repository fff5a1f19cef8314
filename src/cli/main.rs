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
use std::io;
use std::mem;
use std::path::{Path, PathBuf};

use log::error;
use structopt::StructOpt;

use crate::store::MailStore;
use crate::support::error::Error;
use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Run the IMAP server until interrupted.
    ///
    /// All clients are handled by one thread. SIGINT or SIGTERM shuts the
    /// server down cleanly: every client is told goodbye, message indices
    /// are saved, and temporary storages are deleted.
    Serve(ServeSubcommand),
    Deliver(DeliverSubcommand),
    /// List the folders of the configured store.
    Folders(FoldersSubcommand),
}

impl Command {
    fn common_options(&mut self) -> CommonOptions {
        match *self {
            Command::Serve(ref mut c) => mem::take(&mut c.common),
            Command::Deliver(ref mut c) => mem::take(&mut c.common),
            Command::Folders(ref mut c) => mem::take(&mut c.common),
        }
    }
}

#[derive(StructOpt, Default)]
pub(super) struct CommonOptions {
    /// The directory containing `thimble.toml` etc
    /// [default: /etc/thimble or /usr/local/etc/thimble]
    #[structopt(long, parse(from_os_str))]
    root: Option<PathBuf>,
}

#[derive(StructOpt)]
pub(super) struct ServeSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// Listen on this address instead of the one in `thimble.toml`.
    #[structopt(long)]
    pub(super) listen: Option<String>,

    /// Listen on this port instead of the one in `thimble.toml`.
    #[structopt(long)]
    pub(super) port: Option<u16>,
}

/// Deliver or import mail.
///
/// By default, this reads one message from standard input and adds it to
/// the INBOX of the configured store, with the default flags.
///
/// If the first line of an input ends with a UNIX line ending, all line
/// feeds in that input are converted into DOS line endings. If the first
/// line ends with a DOS line ending, the input is passed through
/// bit-for-bit.
///
/// A maildir can be imported by passing all its files to this command:
///
/// ls Maildir/cur/* | xargs -d'\n' thimble deliver --maildir-flags
///
/// The server must not be running on the same storage at the same time,
/// since it rewrites the message index when it shuts down.
#[derive(StructOpt)]
pub(super) struct DeliverSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// Deliver to this folder.
    #[structopt(short, long, default_value = "INBOX")]
    pub(super) folder: String,

    /// Create the destination folder if it does not already exist.
    #[structopt(short, long)]
    pub(super) create: bool,

    /// Give the delivered message(s) this flag (e.g., '\Flagged'). Can be
    /// passed multiple times.
    #[structopt(long, number_of_values(1))]
    pub(super) flag: Vec<String>,

    /// Extract maildir-style flags from the file name(s).
    #[structopt(long)]
    pub(super) maildir_flags: bool,

    /// The files to import/deliver. "-" reads from stdin.
    #[structopt(parse(from_os_str), default_value = "-")]
    pub(super) inputs: Vec<PathBuf>,
}

#[derive(StructOpt)]
pub(super) struct FoldersSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// Only list folders matching this pattern. `*` matches anything, `?`
    /// any one character.
    #[structopt(default_value = "*")]
    pub(super) pattern: String,
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let mut cmd = Command::from_clap(&match Command::clap().get_matches_safe()
    {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        },
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        },
    });

    let root = find_root(cmd.common_options());
    let system_config = load_system_config(&root);
    init_log(&root);

    match cmd {
        Command::Serve(cmd) => super::serve::serve(system_config, cmd, root),
        Command::Deliver(cmd) => {
            super::deliver::deliver(system_config, cmd, root)
        },
        Command::Folders(cmd) => folders(system_config, cmd, root),
    }
}

fn find_root(common: CommonOptions) -> PathBuf {
    common.root.unwrap_or_else(|| {
        if Path::new("/etc/thimble/thimble.toml").is_file() {
            "/etc/thimble".to_owned().into()
        } else if Path::new("/usr/local/etc/thimble/thimble.toml").is_file() {
            "/usr/local/etc/thimble".to_owned().into()
        } else {
            eprintln!(
                "Neither /etc/thimble nor /usr/local/etc/thimble looks like\n\
                 the Thimble root; use --root=/path/to/thimble if your\n\
                 installation is elsewhere."
            );
            EX_CONFIG.exit()
        }
    })
}

/// Load `thimble.toml` from `root`. An explicit root without the file runs
/// on the defaults.
fn load_system_config(root: &Path) -> SystemConfig {
    let system_config_path = root.join("thimble.toml");
    let system_config_toml = match fs::read(&system_config_path) {
        Ok(data) => data,
        Err(e) if io::ErrorKind::NotFound == e.kind() => {
            return SystemConfig::default()
        },
        Err(e) => {
            eprintln!(
                "Error reading '{}': {}",
                system_config_path.display(),
                e
            );
            EX_CONFIG.exit()
        },
    };

    match toml::from_slice(&system_config_toml) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Error in config file at '{}': {}",
                system_config_path.display(),
                e
            );
            EX_CONFIG.exit()
        },
    }
}

fn init_log(root: &Path) {
    if Ok(true) == nix::unistd::isatty(2) {
        // Running interactively; ignore logging configuration and just write
        // to stderr.
        crate::init_simple_log();
        return;
    }

    // log4rs *or* syslog; there is no maintained log4rs syslog appender.
    //
    // Nothing is logging yet, so failures here can only go to stderr.
    let log_config_file = root.join("logging.toml");
    if log_config_file.is_file() {
        if let Err(e) = log4rs::init_file(
            &log_config_file,
            log4rs::config::Deserializers::new(),
        ) {
            eprintln!(
                "Failed to initialise logging from '{}': {}",
                log_config_file.display(),
                e
            );
            EX_CONFIG.exit();
        }
    } else {
        let formatter = syslog::Formatter3164 {
            facility: syslog::Facility::LOG_MAIL,
            hostname: None,
            process: env!("CARGO_PKG_NAME").to_owned(),
            pid: nix::unistd::getpid().as_raw(),
        };

        let logger = match syslog::unix(formatter) {
            Ok(logger) => logger,
            Err(e) => {
                eprintln!("Failed to connect to syslog: {}", e);
                EX_OSERR.exit()
            },
        };

        if let Err(e) =
            log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
        {
            eprintln!("Failed to initialise logging: {}", e);
            EX_SOFTWARE.exit();
        }
        log::set_max_level(log::LevelFilter::Info);
    }
}

fn folders(system_config: SystemConfig, cmd: FoldersSubcommand, root: PathBuf) {
    let store = match MailStore::from_config(&system_config, &root) {
        Ok(store) => store,
        Err(e @ Error::StorageLocked) => {
            fatal!(EX_TEMPFAIL, "Unable to open message store: {}", e)
        },
        Err(e) => fatal!(EX_NOINPUT, "Unable to open message store: {}", e),
    };

    match store.folders("", &cmd.pattern, true) {
        Ok(folders) => {
            for folder in folders {
                println!("{}", folder);
            }
        },
        Err(e) => fatal!(EX_USAGE, "Unable to list folders: {}", e),
    }
}
