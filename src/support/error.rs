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

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No such message")]
    NxMessage,
    #[error("Unsafe mailbox name")]
    UnsafeName,
    #[error("Another message already has this path")]
    PathInUse,
    #[error("Storage is in use by another process")]
    StorageLocked,
    #[error("Parenthesised list nested too deeply")]
    ParseDepthExceeded,
    #[error("Folder hierarchy nested too deeply")]
    MaxFolderDepth,
    #[error("Invalid folder pattern")]
    BadPattern,
    #[error("Command line too long")]
    CommandLineTooLong,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Nix(#[from] nix::Error),
    #[error(transparent)]
    Cbor(#[from] serde_cbor::error::Error),
}
