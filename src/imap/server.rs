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

//! The dispatcher.
//!
//! One thread owns the listening socket, every connection, and the message
//! store. Each iteration of the loop makes a single `poll()` call over all
//! sockets, then accepts at most one client and performs at most one read
//! per readable connection. Since nothing else touches the store, no locking
//! is needed.

use std::collections::BTreeMap;
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info, warn};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};

use super::connection::Connection;
use crate::store::MailStore;
use crate::support::{
    error::Error, log_prefix::LogPrefix, system_config::ServerConfig,
};

pub struct Server {
    listener: TcpListener,
    /// Every live connection, keyed by connection id.
    connections: BTreeMap<u64, Connection<TcpStream>>,
    next_connection_id: u64,
    store: MailStore,
    poll_interval_ms: i32,
    max_line_length: usize,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind the listening socket described by `config`.
    ///
    /// The server stops once `shutdown` becomes true.
    pub fn bind(
        config: &ServerConfig,
        store: MailStore,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, Error> {
        let listener = TcpListener::bind((config.listen.as_str(), config.port))?;
        listener.set_nonblocking(true)?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            connections: BTreeMap::new(),
            next_connection_id: 1,
            store,
            poll_interval_ms: config.poll_interval_ms.min(i32::MAX as u32)
                as i32,
            max_line_length: config.max_line_length,
            shutdown,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve clients until shutdown is requested, then say goodbye to every
    /// client and persist the store.
    ///
    /// Only a failure of the `poll()` call itself ends the loop early; errors
    /// on individual sockets just drop that connection.
    pub fn run(&mut self) -> Result<(), Error> {
        let mut result = Ok(());
        while !self.shutdown.load(Ordering::SeqCst) {
            if let Err(e) = self.run_once() {
                error!("Dispatcher failed: {}", e);
                result = Err(e);
                break;
            }
        }

        self.shut_down();
        result
    }

    /// Run one iteration of the loop: wait for readiness (at most the poll
    /// interval), then service what became ready.
    pub fn run_once(&mut self) -> Result<(), Error> {
        let ids = self.connections.keys().copied().collect::<Vec<_>>();

        let mut fds = Vec::with_capacity(ids.len() + 1);
        fds.push(PollFd::new(self.listener.as_raw_fd(), PollFlags::POLLIN));
        for id in &ids {
            let connection = &self.connections[id];
            // A closing connection reads nothing more, so input it will never
            // consume must not wake the loop
            let mut events = if connection.is_closing() {
                PollFlags::empty()
            } else {
                PollFlags::POLLIN
            };
            if connection.wants_write() {
                events |= PollFlags::POLLOUT;
            }
            fds.push(PollFd::new(connection.stream().as_raw_fd(), events));
        }

        match poll(&mut fds, self.poll_interval_ms) {
            Ok(0) | Err(Errno::EINTR) => return Ok(()),
            Ok(_) => (),
            Err(e) => return Err(e.into()),
        }

        let ready = fds
            .iter()
            .map(|fd| fd.revents().unwrap_or_else(PollFlags::empty))
            .collect::<Vec<_>>();

        if ready[0].contains(PollFlags::POLLIN) {
            self.accept();
        }

        for (&id, &events) in ids.iter().zip(&ready[1..]) {
            if events.is_empty() {
                continue;
            }

            let connection = match self.connections.get_mut(&id) {
                Some(c) => c,
                None => continue,
            };

            let result = if events.contains(PollFlags::POLLNVAL) {
                Err(Error::Io(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "Socket no longer valid",
                )))
            } else if connection.is_closing() {
                if events.intersects(PollFlags::POLLHUP | PollFlags::POLLERR) {
                    Err(Error::Io(io::Error::new(
                        io::ErrorKind::ConnectionAborted,
                        "Peer went away before the final responses were sent",
                    )))
                } else {
                    connection.flush()
                }
            } else if events.intersects(
                PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR,
            ) {
                connection
                    .receive(&mut self.store)
                    .and_then(|()| connection.flush())
            } else {
                connection.flush()
            };

            if let Err(e) = result {
                warn!("{} Dropping connection: {}", connection.log_prefix(), e);
                self.connections.remove(&id);
            } else if connection.is_finished() {
                info!("{} Connection closed", connection.log_prefix());
                self.connections.remove(&id);
            }
        }

        Ok(())
    }

    fn accept(&mut self) {
        let (stream, peer) = match self.listener.accept() {
            Ok(accepted) => accepted,
            Err(e)
                if io::ErrorKind::WouldBlock == e.kind()
                    || io::ErrorKind::Interrupted == e.kind() =>
            {
                return
            },
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                return;
            },
        };

        let id = self.next_connection_id;
        self.next_connection_id += 1;
        let log_prefix = LogPrefix::for_connection(id, Some(peer));

        if let Err(e) = stream.set_nonblocking(true) {
            warn!("{} Unable to make socket non-blocking: {}", log_prefix, e);
            return;
        }

        info!("{} Accepted connection", log_prefix);
        let mut connection =
            Connection::new(id, stream, log_prefix, self.max_line_length);
        if let Err(e) = connection.flush() {
            warn!("{} Dropping connection: {}", connection.log_prefix(), e);
            return;
        }

        self.connections.insert(connection.id(), connection);
    }

    /// Send `BYE` to every client, close every connection, then persist the
    /// store.
    fn shut_down(&mut self) {
        info!(
            "Shutting down; closing {} connection(s)",
            self.connections.len()
        );

        for (_, mut connection) in std::mem::take(&mut self.connections) {
            connection.bye("Server shutdown");
            // Best effort; the client may already be gone
            if let Err(e) = connection.flush() {
                warn!(
                    "{} Failed to send shutdown notice: {}",
                    connection.log_prefix(),
                    e
                );
            }
        }

        self.store.shutdown();
    }
}
