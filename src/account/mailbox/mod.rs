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

//! Support for working with a single mailbox.
//!
//! A mailbox is a saved index query plus a maildir folder. The query decides
//! which messages the mailbox contains; the folder is where messages
//! appended or moved into the mailbox are written. Several mailboxes may
//! share a folder (`INBOX` and `Unread` may both live at the store root), and
//! one message may appear in several mailboxes at once.
//!
//! ## State
//!
//! Each mailbox keeps an in-memory snapshot of its messages, sorted by UID,
//! along with the message, recent and unseen counts. A message's sequence
//! number is simply its position in that list and is never stored.
//!
//! The snapshot is rebuilt from scratch whenever the index may have changed.
//! The index bumps the modification time of its lock file on every write, so
//! comparing that against the value seen at the last rebuild tells us
//! whether anything could be different. If the lock file cannot be read, the
//! mailbox always rebuilds.
//!
//! Rebuilding runs the query, assigns UIDs through the mailbox's UID table
//! (see `uid_map`), and derives flags from the maildir file names, which the
//! index keeps in sync with its tags.
//!
//! ## Locking
//!
//! All state sits behind one mutex which every operation holds for its whole
//! duration, since even reads may rebuild. The UID table has its own mutex
//! because it is shared by every session with the mailbox open; it is always
//! taken after the mailbox lock.
//!
//! `MOVE` only locks the source. The destination is told to drop its
//! snapshot through an atomic flag, which it notices the next time it is
//! locked.
//!
//! ## About the layout of this module
//!
//! This module is collectively a single abstraction, i.e., it should be
//! thought of as one large rust file. It is simply split apart because it's
//! unwieldy otherwise.

// Basic struct definitions and snapshot management
mod defs;
pub use defs::Mailbox;

// IMAP commands
mod expunge; // EXPUNGE, UID EXPUNGE
mod fetch; // FETCH, UID FETCH
mod flags; // STORE, UID STORE
mod messages; // APPEND
mod relocate; // MOVE, UID MOVE, COPY, UID COPY
mod search; // SEARCH, UID SEARCH
mod select; // SELECT, EXAMINE, STATUS, LIST
