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

//! The interface to the mail index.
//!
//! The index itself (a notmuch database, in production) lives outside this
//! crate. Everything here talks to it only through these traits, opening a
//! short-lived session per operation: read-only for the read paths,
//! read-write for mutations.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::prelude::*;
use log::warn;

use crate::support::error::Error;

/// Relative to the store root, the file whose modification time advances
/// whenever the index is written.
pub const FRESHNESS_SIGNAL: &str = ".notmuch/xapian/flintlock";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

/// One message as the index knows it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredMessage {
    /// The index's stable identifier, in practice the `Message-ID`.
    pub id: String,
    /// The message file. When a message has several files, the first one.
    pub path: PathBuf,
    /// The date the index sorts by.
    pub date: DateTime<FixedOffset>,
    pub tags: BTreeSet<String>,
}

pub trait Store: Send + Sync {
    /// The root of the maildir hierarchy.
    fn root(&self) -> &Path;

    fn open(&self, mode: OpenMode)
        -> Result<Box<dyn StoreSession + '_>, Error>;

    /// A value which changes whenever anything in the index may have.
    fn freshness(&self) -> io::Result<SystemTime> {
        fs::metadata(self.root().join(FRESHNESS_SIGNAL))?.modified()
    }
}

/// An open session on the index.
///
/// Queries use the index's own query language. Results are sorted oldest
/// first, which is also the order of the mailbox's message list.
pub trait StoreSession {
    fn query(&self, query: &str) -> Result<Vec<StoredMessage>, Error>;
    fn count(&self, query: &str) -> Result<usize, Error>;

    /// Index a message file, returning its ID.
    ///
    /// Adding a file whose message is already indexed just attaches the file
    /// to the existing message.
    fn add_message(&mut self, path: &Path) -> Result<String, Error>;
    fn find_message(&self, id: &str) -> Result<Option<StoredMessage>, Error>;
    fn find_message_by_path(
        &self,
        path: &Path,
    ) -> Result<Option<StoredMessage>, Error>;
    /// Detach `path` from its message, dropping the message once it has no
    /// files left. If the file still exists, the store disposes of it.
    fn remove_message(&mut self, path: &Path) -> Result<(), Error>;

    fn remove_all_tags(&mut self, id: &str) -> Result<(), Error>;
    fn add_tag(&mut self, id: &str, tag: &str) -> Result<(), Error>;

    /// Replace the tags of `id` with exactly `tags`.
    ///
    /// Index backends with an atomic primitive (freezing the message, say)
    /// should override this. The default removes everything and adds the
    /// new tags back one by one; a failure part way through leaves the
    /// message with only some of its tags, which is logged.
    fn rewrite_tags(
        &mut self,
        id: &str,
        tags: &BTreeSet<String>,
    ) -> Result<(), Error> {
        self.remove_all_tags(id)?;
        for tag in tags {
            if let Err(e) = self.add_tag(id, tag) {
                warn!(
                    "Tags of {} only partially rewritten (failed at {}): {}",
                    id, tag, e
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// Rename the message's files so their maildir flags match its tags,
    /// returning the new path of the first file.
    fn tags_to_maildir_flags(&mut self, id: &str) -> Result<PathBuf, Error>;
}
