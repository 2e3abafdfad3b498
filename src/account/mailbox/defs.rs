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

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering::SeqCst};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::SystemTime;

use chrono::prelude::*;

use crate::account::account::Namespace;
use crate::account::flag_map::MaildirFlags;
use crate::account::model::*;
use crate::account::store::Store;
use crate::account::uid_map::{table_file_name, UidMapCache, UidMapper};
use crate::support::system_config::MailboxConfig;

/// One mailbox, shared by everything in a session that refers to it.
pub struct Mailbox {
    pub(super) log_prefix: String,
    pub(super) name: String,
    pub(super) query: String,
    /// Absolute path of the maildir folder.
    pub(super) folder: PathBuf,
    pub(super) attributes: Vec<MailboxAttribute>,
    pub(super) store: Arc<dyn Store>,
    pub(super) uid_maps: Arc<UidMapCache>,
    pub(super) uid_map_path: PathBuf,
    /// Used to find other mailboxes by name, e.g. the destination of a
    /// `MOVE`.
    pub(super) namespace: Weak<Namespace>,
    /// Set by `expire()`; consumed under the state lock.
    pub(super) expired: AtomicBool,
    pub(super) state: Mutex<MailboxState>,
}

#[derive(Default)]
pub(super) struct MailboxState {
    pub(super) snapshot: Option<Snapshot>,
    /// The freshness signal observed by the last rebuild, if it could be
    /// read.
    pub(super) last_refreshed: Option<SystemTime>,
}

pub(super) struct Snapshot {
    /// Sorted by UID.
    pub(super) messages: Vec<Message>,
    pub(super) total: usize,
    pub(super) recent: usize,
    pub(super) unseen: usize,
    pub(super) uid_map: Arc<Mutex<UidMapper>>,
}

#[derive(Clone, Debug)]
pub(super) struct Message {
    pub(super) id: String,
    pub(super) uid: Uid,
    pub(super) date: DateTime<FixedOffset>,
    pub(super) size: u64,
    pub(super) path: PathBuf,
    pub(super) flags: MaildirFlags,
    /// Whether the message carried the `new` tag when loaded.
    pub(super) recent: bool,
}

pub(super) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding either lock cannot leave the state inconsistent
    // in a way that matters more than refusing all further access would.
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Mailbox {
    pub(crate) fn new(
        user: &str,
        name: &str,
        config: &MailboxConfig,
        store: Arc<dyn Store>,
        uid_maps: Arc<UidMapCache>,
        uid_map_dir: PathBuf,
        namespace: Weak<Namespace>,
    ) -> Self {
        let folder = match config.folder(name) {
            "" => store.root().to_owned(),
            f => store.root().join(f),
        };

        Mailbox {
            log_prefix: format!("{}:{}", user, name),
            name: name.to_owned(),
            query: config.query.clone(),
            folder,
            attributes: config.attributes.clone(),
            uid_map_path: uid_map_dir.join(table_file_name(name)),
            store,
            uid_maps,
            namespace,
            expired: AtomicBool::new(false),
            state: Mutex::new(MailboxState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the log prefix used for messages regarding this mailbox.
    pub fn log_prefix(&self) -> &str {
        &self.log_prefix
    }

    /// Drop the cached snapshot before the next operation.
    ///
    /// This does not take the state lock, so it is safe to call from an
    /// operation on another mailbox.
    pub fn expire(&self) {
        self.expired.store(true, SeqCst);
    }

    /// Wrap `q` so that it only matches messages in this mailbox.
    pub(super) fn scoped(&self, q: &str) -> String {
        format!("({}) and ({})", self.query, q)
    }
}

impl Snapshot {
    /// The first message without `\Seen`, if any.
    pub(super) fn first_unseen(&self) -> Option<Seqnum> {
        self.messages
            .iter()
            .position(|m| !m.flags.contains(MaildirFlags::SEEN))
            .map(Seqnum::from_index)
    }

    /// Insert `message` in UID order, unless its UID is already present.
    pub(super) fn insert(&mut self, message: Message) -> bool {
        match self
            .messages
            .binary_search_by_key(&message.uid, |m| m.uid)
        {
            Ok(_) => false,
            Err(ix) => {
                self.account_added(&message);
                self.messages.insert(ix, message);
                true
            }
        }
    }

    /// Remove every message for which `f` returns true, preserving the order
    /// of the rest.
    ///
    /// Returns the removed messages with their former sequence numbers.
    pub(super) fn remove_where(
        &mut self,
        mut f: impl FnMut(Seqnum, &Message) -> bool,
    ) -> Vec<(Seqnum, Message)> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.messages.len());
        for (ix, message) in self.messages.drain(..).enumerate() {
            let seqnum = Seqnum::from_index(ix);
            if f(seqnum, &message) {
                removed.push((seqnum, message));
            } else {
                kept.push(message);
            }
        }
        self.messages = kept;

        for &(_, ref message) in &removed {
            self.total = self.total.saturating_sub(1);
            if message.recent {
                self.recent = self.recent.saturating_sub(1);
            }
            if !message.flags.contains(MaildirFlags::SEEN) {
                self.unseen = self.unseen.saturating_sub(1);
            }
        }

        removed
    }

    fn account_added(&mut self, message: &Message) {
        self.total += 1;
        if message.recent {
            self.recent += 1;
        }
        if !message.flags.contains(MaildirFlags::SEEN) {
            self.unseen += 1;
        }
    }

    /// Adjust the unseen count for a message whose flags went from `old` to
    /// `new`.
    pub(super) fn account_flags_changed(
        &mut self,
        old: MaildirFlags,
        new: MaildirFlags,
    ) {
        match (
            old.contains(MaildirFlags::SEEN),
            new.contains(MaildirFlags::SEEN),
        ) {
            (true, false) => self.unseen += 1,
            (false, true) => self.unseen = self.unseen.saturating_sub(1),
            _ => (),
        }
    }
}
