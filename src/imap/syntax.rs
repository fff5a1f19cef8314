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

//! Code for taking IMAP command lines apart.
//!
//! The grammar understood here is deliberately loose. A command line is a tag,
//! a command keyword, and a list of arguments separated by single spaces.
//! Arguments may be double-quoted to include spaces; there is no escaping
//! within quotes. Parenthesised lists are only interpreted on request, since
//! only a few arguments can contain them.
//!
//! The quote handling works on space-separated words rather than characters,
//! which gives it some idiosyncrasies:
//!
//! - A word that starts with `"` opens a quoted argument, which extends
//!   through the first later word that starts or ends with `"`.
//!
//! - Runs of spaces outside quotes do not produce empty arguments, but `""`
//!   does.
//!
//! - A quote that is never closed runs to the end of the line.
//!
//! - A word ending in `"` with no open quote has the quote removed and is
//!   joined onto the previous argument.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::digit1,
    combinator::{map, map_opt, opt},
    sequence::preceded,
    IResult,
};

use crate::support::error::Error;

/// The maximum nesting of parenthesised lists.
pub const MAX_LIST_DEPTH: u32 = 100;

/// A command line split into its parts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    pub tag: String,
    pub command: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Split a raw command line (without line ending).
    ///
    /// The tag and command are the first two words, taken verbatim. A missing
    /// tag or command is the empty string.
    pub fn parse(raw: &str) -> Self {
        let mut rest = raw;
        let tag = next_word(&mut rest).to_owned();
        let command = next_word(&mut rest).to_owned();
        CommandLine {
            tag,
            command,
            args: split_args(rest),
        }
    }

    pub fn arg(&self, ix: usize) -> Option<&str> {
        self.args.get(ix).map(String::as_str)
    }
}

fn next_word<'a>(rest: &mut &'a str) -> &'a str {
    let s = rest.trim_start_matches(' ');
    match s.find(' ') {
        Some(end) => {
            *rest = &s[end + 1..];
            &s[..end]
        },
        None => {
            *rest = "";
            s
        },
    }
}

/// Split `raw` into arguments, honouring double-quoted spans.
pub fn split_args(raw: &str) -> Vec<String> {
    let mut slots: Vec<Vec<&str>> = Vec::new();
    // Whether continuation words go into the last slot. Dropping an empty
    // word outside quotes "uses up" a slot without creating it, so a
    // following continuation starts a new one.
    let mut cursor_on_last = false;
    let mut in_quote = false;

    for word in raw.split(' ') {
        let mut begins = false;
        let mut ends = false;
        if !word.is_empty() {
            let first_quote = word.starts_with('"');
            let last_quote = word.len() > 1 && word.ends_with('"');
            if in_quote {
                if first_quote || last_quote {
                    in_quote = false;
                    ends = true;
                }
            } else {
                if first_quote {
                    in_quote = true;
                    begins = true;
                }
                if last_quote {
                    in_quote = false;
                    ends = true;
                }
            }
        }

        let (text, new_slot) = match (begins, ends) {
            (true, false) => (&word[1..], true),
            (true, true) => (&word[1..word.len() - 1], true),
            (false, true) => (drop_last_char(word), false),
            (false, false) => (word, !in_quote),
        };

        if new_slot {
            if !text.is_empty() || begins {
                slots.push(vec![text]);
                cursor_on_last = true;
            } else {
                cursor_on_last = false;
            }
        } else if cursor_on_last {
            if let Some(last) = slots.last_mut() {
                last.push(text);
            }
        } else {
            slots.push(vec![text]);
            cursor_on_last = true;
        }
    }

    slots.into_iter().map(|parts| parts.join(" ")).collect()
}

fn drop_last_char(s: &str) -> &str {
    match s.char_indices().next_back() {
        Some((ix, _)) => &s[..ix],
        None => s,
    }
}

/// An element of a parenthesised list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    Atom(String),
    List(Vec<Token>),
}

impl Token {
    pub fn as_atom(&self) -> Option<&str> {
        match *self {
            Token::Atom(ref s) => Some(s),
            Token::List(_) => None,
        }
    }
}

/// Parse a parenthesised list such as `(FLAGS UID)`.
///
/// One leading `(` and one trailing `)` are removed if present. A nested list
/// is taken to extend from its `(` to the *last* `)` of the remaining text,
/// so sibling lists like `(A) (B)` do not nest the way one would expect:
/// `((A) (B))` yields a single list containing `A)`, an empty list, and `B`.
pub fn parse_parenthesized_list(raw: &str) -> Result<Vec<Token>, Error> {
    parse_list_at(raw, 0)
}

enum Piece {
    Text(String),
    List(Vec<Token>),
}

fn parse_list_at(raw: &str, depth: u32) -> Result<Vec<Token>, Error> {
    if depth >= MAX_LIST_DEPTH {
        return Err(Error::ParseDepthExceeded);
    }

    let mut raw = raw;
    if raw.starts_with('(') {
        raw = &raw[1..];
    }
    if raw.ends_with(')') {
        raw = &raw[..raw.len() - 1];
    }

    let mut pieces = Vec::<Piece>::new();
    let mut text_open = false;
    while let Some(ch) = raw.chars().next() {
        if '(' == ch {
            let end = match raw.rfind(')') {
                Some(end) if end >= 1 => end,
                _ => 0,
            };
            pieces.push(Piece::List(parse_list_at(&raw[..=end], depth + 1)?));
            raw = &raw[end + 1..];
            text_open = false;
        } else {
            if !text_open {
                pieces.push(Piece::Text(String::new()));
                text_open = true;
            }
            if let Some(Piece::Text(ref mut text)) = pieces.last_mut() {
                text.push(ch);
            }
            raw = &raw[ch.len_utf8()..];
        }
    }

    let mut tokens = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Text(text) => {
                tokens.extend(split_args(&text).into_iter().map(Token::Atom))
            },
            Piece::List(list) => tokens.push(Token::List(list)),
        }
    }
    Ok(tokens)
}

/// The upper end of a sequence range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SeqBound {
    Number(u32),
    /// `*`
    Last,
}

/// A parsed `<min>[:<max>]` sequence range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SeqRange {
    pub min: u32,
    pub max: Option<SeqBound>,
}

impl SeqRange {
    /// Parse a sequence range.
    ///
    /// Returns `None` if the minimum is missing, unparsable, or zero.
    /// Anything after the range is ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        match seq_range(raw) {
            Ok((_, range)) if range.min > 0 => Some(range),
            _ => None,
        }
    }

    /// Return the text a client gave as the minimum of the range.
    pub fn min_text(raw: &str) -> &str {
        raw.split(':').next().unwrap_or(raw)
    }
}

fn number(i: &str) -> IResult<&str, u32> {
    map_opt(digit1, |s: &str| s.parse::<u32>().ok())(i)
}

fn seq_bound(i: &str) -> IResult<&str, SeqBound> {
    alt((map(tag("*"), |_| SeqBound::Last), map(number, SeqBound::Number)))(i)
}

fn seq_range(i: &str) -> IResult<&str, SeqRange> {
    let (i, min) = number(i)?;
    let (i, max) = opt(preceded(tag(":"), seq_bound))(i)?;
    Ok((i, SeqRange { min, max }))
}

/// A command, identified by its (case-insensitive) keyword.
///
/// Arguments are carried along as given; whether they are acceptable depends
/// on the session state and is decided by the command processor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Capability,
    Noop,
    Logout,
    Authenticate {
        mechanism: Option<String>,
    },
    Login {
        user: Option<String>,
        pass: Option<String>,
    },
    Select {
        mailbox: Option<String>,
    },
    Create {
        mailbox: Option<String>,
    },
    List {
        reference: Option<String>,
        pattern: Option<String>,
    },
    Lsub {
        reference: Option<String>,
        pattern: Option<String>,
    },
    Uid {
        subcommand: Option<String>,
        range: Option<String>,
        items: Option<String>,
    },
    Unknown,
}

impl Command {
    pub fn from_line(line: &CommandLine) -> Self {
        let arg = |ix: usize| line.arg(ix).map(str::to_owned);
        let command = line.command.as_str();

        if command.eq_ignore_ascii_case("CAPABILITY") {
            Command::Capability
        } else if command.eq_ignore_ascii_case("NOOP") {
            Command::Noop
        } else if command.eq_ignore_ascii_case("LOGOUT") {
            Command::Logout
        } else if command.eq_ignore_ascii_case("AUTHENTICATE") {
            Command::Authenticate { mechanism: arg(0) }
        } else if command.eq_ignore_ascii_case("LOGIN") {
            Command::Login {
                user: arg(0),
                pass: arg(1),
            }
        } else if command.eq_ignore_ascii_case("SELECT") {
            Command::Select { mailbox: arg(0) }
        } else if command.eq_ignore_ascii_case("CREATE") {
            Command::Create { mailbox: arg(0) }
        } else if command.eq_ignore_ascii_case("LIST") {
            Command::List {
                reference: arg(0),
                pattern: arg(1),
            }
        } else if command.eq_ignore_ascii_case("LSUB") {
            Command::Lsub {
                reference: arg(0),
                pattern: arg(1),
            }
        } else if command.eq_ignore_ascii_case("UID") {
            Command::Uid {
                subcommand: arg(0),
                range: arg(1),
                items: arg(2),
            }
        } else {
            Command::Unknown
        }
    }
}
