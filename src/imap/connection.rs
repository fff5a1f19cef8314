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

//! One client session: assembles lines from the socket, feeds them to the
//! command processor, and buffers the responses until the socket accepts
//! them.
//!
//! Nothing here ever blocks. `receive()` performs at most one read, and
//! `flush()` writes only as much as the socket takes without blocking.

use std::borrow::Cow;
use std::io::{self, Read, Write};

use log::{debug, info, warn};

use super::command_processor::CommandProcessor;
use super::response_writer as r;
use crate::store::MailStore;
use crate::support::{error::Error, log_prefix::LogPrefix};

const READ_SIZE: usize = 4096;

pub struct Connection<S> {
    id: u64,
    stream: S,
    processor: CommandProcessor,
    /// Bytes received but not yet part of a complete line.
    inbound: Vec<u8>,
    /// Bytes not yet accepted by the socket.
    outbound: Vec<u8>,
    max_line_length: usize,
    /// Set once nothing more will be read from the client. The connection is
    /// finished once the outbound buffer has drained.
    closing: bool,
}

impl<S: Read + Write> Connection<S> {
    /// Set up a new connection and queue its greeting.
    pub fn new(
        id: u64,
        stream: S,
        log_prefix: LogPrefix,
        max_line_length: usize,
    ) -> Self {
        let processor = CommandProcessor::new(log_prefix);
        let mut this = Connection {
            id,
            stream,
            inbound: Vec::new(),
            outbound: Vec::new(),
            max_line_length,
            closing: false,
            processor,
        };
        let greeting = this.processor.greet();
        this.queue(&greeting);
        this
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn log_prefix(&self) -> &LogPrefix {
        self.processor.log_prefix()
    }

    /// Whether there is output waiting for the socket to become writable.
    pub fn wants_write(&self) -> bool {
        !self.outbound.is_empty()
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    /// Whether the connection can be dropped.
    pub fn is_finished(&self) -> bool {
        self.closing && self.outbound.is_empty()
    }

    /// Perform one read from the socket and handle every complete line it
    /// yields.
    ///
    /// A read that would block is not an error. End of stream marks the
    /// connection finished.
    pub fn receive(&mut self, store: &mut MailStore) -> Result<(), Error> {
        if self.closing {
            return Ok(());
        }

        let mut buf = [0u8; READ_SIZE];
        match self.stream.read(&mut buf) {
            Ok(0) => {
                info!("{} Connection closed by peer", self.log_prefix());
                self.closing = true;
                // Nobody left to read it
                self.outbound.clear();
                Ok(())
            },
            Ok(n) => {
                self.consume(&buf[..n], store);
                Ok(())
            },
            Err(e)
                if io::ErrorKind::WouldBlock == e.kind()
                    || io::ErrorKind::Interrupted == e.kind() =>
            {
                Ok(())
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Add `data` to the inbound buffer and handle every complete line, in
    /// order.
    ///
    /// Both CRLF and bare LF end a line. Lines after a `LOGOUT` are
    /// discarded.
    pub fn consume(&mut self, data: &[u8], store: &mut MailStore) {
        self.inbound.extend_from_slice(data);

        let mut start = 0;
        while !self.closing {
            let end = match memchr::memchr(b'\n', &self.inbound[start..]) {
                Some(ix) => start + ix,
                None => break,
            };

            let mut line = &self.inbound[start..end];
            if line.ends_with(b"\r") {
                line = &line[..line.len() - 1];
            }
            let line = String::from_utf8_lossy(line).into_owned();
            start = end + 1;

            self.handle_line(&line, store);
        }

        if self.closing {
            self.inbound.clear();
            return;
        }

        self.inbound.drain(..start);
        if self.inbound.len() > self.max_line_length {
            warn!(
                "{} {} ({} bytes buffered); disconnecting",
                self.log_prefix(),
                Error::CommandLineTooLong,
                self.inbound.len()
            );
            self.inbound.clear();
            self.bye(Error::CommandLineTooLong.to_string());
        }
    }

    fn handle_line(&mut self, line: &str, store: &mut MailStore) {
        let log_prefix = self.processor.log_prefix().to_string();
        let outbound = &mut self.outbound;
        let mut sender = |response: r::ResponseLine| {
            debug!("{} <<< {}", log_prefix, response);
            response.write_to(outbound);
        };

        if let Some(last) =
            self.processor.handle_line(line, store, &mut sender)
        {
            sender(last);
        }

        if self.processor.logged_out() {
            self.closing = true;
        }
    }

    /// Send an untagged `BYE` and stop reading from the client.
    pub fn bye(&mut self, quip: impl Into<Cow<'static, str>>) {
        let line = r::ResponseLine::untagged(r::Response::cond(
            r::RespCondType::Bye,
            None,
            quip,
        ));
        self.queue(&line);
        self.closing = true;
    }

    fn queue(&mut self, line: &r::ResponseLine) {
        debug!("{} <<< {}", self.log_prefix(), line);
        line.write_to(&mut self.outbound);
    }

    /// Write as much of the outbound buffer as the socket takes without
    /// blocking.
    pub fn flush(&mut self) -> Result<(), Error> {
        while !self.outbound.is_empty() {
            match self.stream.write(&self.outbound) {
                Ok(0) => {
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "Socket accepted no data",
                    )))
                },
                Ok(n) => {
                    self.outbound.drain(..n);
                },
                Err(e) if io::ErrorKind::WouldBlock == e.kind() => break,
                Err(e) if io::ErrorKind::Interrupted == e.kind() => (),
                Err(e) => return Err(e.into()),
            }
        }

        Ok(())
    }
}
