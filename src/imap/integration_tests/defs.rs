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

use std::io::{self, BufRead, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use regex::Regex;
use tempfile::TempDir;

use crate::imap::server::Server;
use crate::store::MailStore;
use crate::support::system_config::*;

/// Lines longer than this without a line ending get the client disconnected.
pub const TEST_MAX_LINE_LENGTH: usize = 1024;

pub struct Setup {
    root: TempDir,
    addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    server: Option<JoinHandle<()>>,
}

pub fn set_up() -> Setup {
    set_up_with(SystemConfig::default(), |_| ())
}

/// Start a server with the given configuration, after letting `populate`
/// prepare the store.
///
/// The listening address in `config` is replaced with an ephemeral loopback
/// port.
pub fn set_up_with(
    mut config: SystemConfig,
    populate: impl FnOnce(&mut MailStore),
) -> Setup {
    crate::init_test_log();

    config.server = ServerConfig {
        listen: "127.0.0.1".to_owned(),
        port: 0,
        max_line_length: TEST_MAX_LINE_LENGTH,
        ..ServerConfig::default()
    };

    let root = TempDir::new().unwrap();
    let mut store = MailStore::from_config(&config, root.path()).unwrap();
    populate(&mut store);

    let shutdown = Arc::new(AtomicBool::new(false));
    let mut server =
        Server::bind(&config.server, store, Arc::clone(&shutdown)).unwrap();
    let addr = server.local_addr().unwrap();
    let handle = thread::spawn(move || server.run().unwrap());

    Setup {
        root,
        addr,
        shutdown,
        server: Some(handle),
    }
}

impl Setup {
    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Connect to the server and consume the greeting.
    pub fn connect(&self) -> Client {
        let mut client = self.connect_raw();
        client.expect_line("* OK IMAP4rev1 Service Ready");
        client
    }

    pub fn connect_raw(&self) -> Client {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        Client {
            reader: io::BufReader::new(stream.try_clone().unwrap()),
            writer: stream,
        }
    }

    /// Request shutdown and wait for the server to finish it.
    pub fn shut_down(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(server) = self.server.take() {
            server.join().unwrap();
        }
    }
}

impl Drop for Setup {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(server) = self.server.take() {
            // Don't double-panic if the test already failed
            let _ = server.join();
        }
    }
}

pub struct Client {
    reader: io::BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    /// Send `data` verbatim.
    pub fn write_raw(&mut self, data: &[u8]) {
        self.writer.write_all(data).unwrap();
    }

    /// Send one line, adding the line ending.
    pub fn send(&mut self, line: &str) {
        self.write_raw(format!("{}\r\n", line).as_bytes());
    }

    /// Read one line, without its line ending, or `None` at end of stream.
    pub fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            // A server that resets the connection after closing is also done
            Err(e) if io::ErrorKind::ConnectionReset == e.kind() => None,
            Ok(_) => {
                assert!(
                    line.ends_with("\r\n"),
                    "Line not terminated by CRLF: {:?}",
                    line
                );
                line.truncate(line.len() - 2);
                Some(line)
            },
            Err(e) => panic!("Failed to read from server: {}", e),
        }
    }

    pub fn expect_line(&mut self, expected: &str) {
        assert_eq!(Some(expected), self.read_line().as_deref());
    }

    pub fn expect_like(&mut self, pattern: &str) -> String {
        let line = self.read_line().expect("Unexpected end of stream");
        assert!(
            Regex::new(pattern).unwrap().is_match(&line),
            "Expected\n\
             match: {:?}\n\
             Got:   {:?}\n",
            pattern,
            line
        );
        line
    }

    pub fn expect_eof(&mut self) {
        assert_eq!(None, self.read_line());
    }

    /// Send `line` and collect every response line up to and including the
    /// tagged one.
    pub fn command(&mut self, line: &str) -> Vec<String> {
        let tag = format!("{} ", line.split(' ').next().unwrap_or(""));
        self.send(line);

        let mut responses = Vec::new();
        loop {
            let response = self.read_line().expect("Unexpected end of stream");
            let done = response.starts_with(&tag);
            responses.push(response);
            if done {
                return responses;
            }
        }
    }

    pub fn log_in(&mut self) {
        assert_eq!(
            vec!["L OK LOGIN completed"],
            self.command("L LOGIN azure hunter2")
        );
    }
}
