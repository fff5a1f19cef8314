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

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lazy_static::lazy_static;
use log::{error, info};
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

use super::main::ServeSubcommand;
use crate::imap::server::Server;
use crate::store::MailStore;
use crate::support::error::Error;
use crate::support::system_config::SystemConfig;

lazy_static! {
    /// Set by SIGINT/SIGTERM; polled by the dispatcher once per iteration.
    static ref SHUTDOWN: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
}

extern "C" fn request_shutdown(_: nix::libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

pub(super) fn serve(
    mut system_config: SystemConfig,
    cmd: ServeSubcommand,
    root: PathBuf,
) {
    if let Some(listen) = cmd.listen {
        system_config.server.listen = listen;
    }
    if let Some(port) = cmd.port {
        system_config.server.port = port;
    }

    let store = match MailStore::from_config(&system_config, &root) {
        Ok(store) => store,
        Err(e @ Error::StorageLocked) => {
            fatal!(EX_TEMPFAIL, "Unable to open message store: {}", e)
        },
        Err(e) => fatal!(EX_CANTCREAT, "Unable to open message store: {}", e),
    };

    // Force initialisation before any handler can observe it
    let shutdown = Arc::clone(&SHUTDOWN);
    install_signal_handlers();

    let mut server =
        match Server::bind(&system_config.server, store, shutdown) {
            Ok(server) => server,
            Err(e) => fatal!(
                EX_OSERR,
                "Unable to listen on {}:{}: {}",
                system_config.server.listen,
                system_config.server.port,
                e
            ),
        };

    if let Err(e) = server.run() {
        fatal!(EX_OSERR, "Server stopped abnormally: {}", e);
    }

    info!("Server shut down");
}

fn install_signal_handlers() {
    let action = SigAction::new(
        SigHandler::Handler(request_shutdown),
        SaFlags::empty(),
        SigSet::empty(),
    );

    for &sig in &[Signal::SIGINT, Signal::SIGTERM] {
        // Safe since the handler only stores to an atomic
        if let Err(e) = unsafe { signal::sigaction(sig, &action) } {
            fatal!(EX_OSERR, "Unable to install {} handler: {}", sig, e);
        }
    }
}
