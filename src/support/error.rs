//-
// Copyright (c) 2026, The notmuch-imap developers
//
// This file is part of notmuch-imap.
//
// notmuch-imap is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// notmuch-imap is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with notmuch-imap. If not, see <http://www.gnu.org/licenses/>.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported operation")]
    UnsupportedOperation,
    #[error("No such mailbox")]
    NxMailbox,
    #[error("No such message")]
    NxMessage,
    #[error("Unsafe mailbox or folder name")]
    UnsafeName,
    #[error("Non-existent non-keyword flag")]
    NxFlag,
    #[error("Search criterion not supported by the index: {0}")]
    UnsupportedSearch(String),
    #[error("UID space exhausted")]
    MailboxFull,
    #[error("Gave up allocating a unique message file name")]
    GaveUpInsertion,
    #[error("Backing store failure: {0}")]
    Store(String),
    #[error("Failed to persist UID table: {0}")]
    UidMapWrite(#[source] io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Cbor(#[from] serde_cbor::error::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
