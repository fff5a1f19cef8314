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

//! The response model and its wire format.
//!
//! Every response is one line. Status responses look like
//! `<tag-or-*> <STATUS>[ [<code>]] <text>`; data responses are always
//! untagged.

use std::borrow::Cow;
use std::fmt;

use crate::store::MessageId;

pub const LINE_SEPARATOR: &[u8] = b"\r\n";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RespCondType {
    Ok,
    No,
    Bad,
    Bye,
    Preauth,
}

impl RespCondType {
    pub fn as_str(self) -> &'static str {
        match self {
            RespCondType::Ok => "OK",
            RespCondType::No => "NO",
            RespCondType::Bad => "BAD",
            RespCondType::Bye => "BYE",
            RespCondType::Preauth => "PREAUTH",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RespTextCode {
    ReadWrite,
    Unseen(usize),
    PermanentFlags(Vec<Cow<'static, str>>),
    ServerBug,
}

impl fmt::Display for RespTextCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RespTextCode::ReadWrite => write!(f, "READ-WRITE"),
            RespTextCode::Unseen(n) => write!(f, "UNSEEN {}", n),
            RespTextCode::PermanentFlags(ref flags) => {
                write!(f, "PERMANENTFLAGS (")?;
                write_joined(f, flags)?;
                write!(f, ")")
            },
            RespTextCode::ServerBug => write!(f, "SERVERBUG"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CondResponse {
    pub cond: RespCondType,
    pub code: Option<RespTextCode>,
    pub quip: Cow<'static, str>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchAtt {
    Flags(Vec<String>),
    Uid(MessageId),
}

impl fmt::Display for FetchAtt {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FetchAtt::Flags(ref flags) => {
                write!(f, "FLAGS (")?;
                write_joined(f, flags)?;
                write!(f, ")")
            },
            FetchAtt::Uid(uid) => write!(f, "UID {}", uid),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    Cond(CondResponse),
    Capability(&'static [&'static str]),
    Exists(usize),
    Recent(usize),
    Flags(Vec<Cow<'static, str>>),
    Fetch { seqnum: usize, atts: Vec<FetchAtt> },
    List { name: String },
    /// A `+` continuation request.
    Continuation,
}

impl Response {
    pub fn cond(
        cond: RespCondType,
        code: Option<RespTextCode>,
        quip: impl Into<Cow<'static, str>>,
    ) -> Self {
        Response::Cond(CondResponse {
            cond,
            code,
            quip: quip.into(),
        })
    }
}

/// A full response line, including its tag.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseLine {
    /// `None` for untagged responses.
    pub tag: Option<String>,
    pub response: Response,
}

impl ResponseLine {
    pub fn untagged(response: Response) -> Self {
        ResponseLine {
            tag: None,
            response,
        }
    }

    /// Append the wire form of this line, including the line separator, to
    /// `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.to_string().as_bytes());
        out.extend_from_slice(LINE_SEPARATOR);
    }
}

impl fmt::Display for ResponseLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Response::Continuation = self.response {
            return write!(f, "+");
        }

        write!(f, "{} ", self.tag.as_deref().unwrap_or("*"))?;
        match self.response {
            Response::Cond(ref cr) => {
                write!(f, "{}", cr.cond.as_str())?;
                if let Some(ref code) = cr.code {
                    write!(f, " [{}]", code)?;
                }
                write!(f, " {}", cr.quip)
            },
            Response::Capability(caps) => {
                write!(f, "CAPABILITY")?;
                for cap in caps {
                    write!(f, " {}", cap)?;
                }
                Ok(())
            },
            Response::Exists(n) => write!(f, "{} EXISTS", n),
            Response::Recent(n) => write!(f, "{} RECENT", n),
            Response::Flags(ref flags) => {
                write!(f, "FLAGS (")?;
                write_joined(f, flags)?;
                write!(f, ")")
            },
            Response::Fetch { seqnum, ref atts } => {
                write!(f, "{} FETCH (", seqnum)?;
                write_joined(f, atts)?;
                write!(f, ")")
            },
            Response::List { ref name } => {
                write!(f, "LIST () \".\" ")?;
                write_mailbox_name(f, name)
            },
            Response::Continuation => Ok(()),
        }
    }
}

fn write_joined<T: fmt::Display>(
    f: &mut fmt::Formatter,
    items: &[T],
) -> fmt::Result {
    for (ix, item) in items.iter().enumerate() {
        if ix > 0 {
            write!(f, " ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_mailbox_name(f: &mut fmt::Formatter, name: &str) -> fmt::Result {
    let needs_quotes = name.is_empty()
        || name
            .chars()
            .any(|c| matches!(c, ' ' | '"' | '\\' | '(' | ')' | '{'));
    if !needs_quotes {
        return write!(f, "{}", name);
    }

    write!(f, "\"")?;
    for ch in name.chars() {
        if '"' == ch || '\\' == ch {
            write!(f, "\\")?;
        }
        write!(f, "{}", ch)?;
    }
    write!(f, "\"")
}
