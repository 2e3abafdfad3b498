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

//! The persistent mapping from index message IDs to IMAP UIDs.
//!
//! The index identifies messages by an opaque, stable string. IMAP needs
//! small integers that only ever grow. Each mailbox gets one table mapping
//! the former to the latter, along with the next UID to hand out and the
//! UID validity epoch the table belongs to.
//!
//! Tables are plain CBOR files, rewritten atomically on every flush. They
//! are small enough (one short string and an integer per message) that
//! incremental persistence is not worth the complexity.
//!
//! If a table is missing, a new epoch starts. If it exists but cannot be
//! read, there is no way to know which UIDs clients have already seen, so
//! the table is discarded and a new epoch started with a UID validity
//! strictly greater than the old one, if the old one can be recovered at
//! all. Clients then resynchronise from scratch.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{error, info, warn};
use serde::{Deserialize, Serialize};

use super::model::Uid;
use crate::support::error::Error;
use crate::support::file_ops;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
struct UidTable {
    #[serde(rename = "v")]
    uid_validity: u32,
    #[serde(rename = "n")]
    next_uid: Uid,
    #[serde(rename = "i")]
    ids: HashMap<String, Uid>,
}

// Only the epoch is needed to recover from a table whose body is damaged.
#[derive(Deserialize)]
struct UidTableHeader {
    #[serde(rename = "v")]
    uid_validity: u32,
}

#[derive(Debug)]
pub struct UidMapper {
    path: PathBuf,
    table: UidTable,
    dirty: bool,
}

impl UidMapper {
    /// Load the table at `path`, or start a new epoch if that is not
    /// possible.
    ///
    /// This never fails. Damage is logged and repaired by starting over; the
    /// repaired table is only written on the next `flush()`.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if io::ErrorKind::NotFound == e.kind() => {
                let mapper = Self::fresh(path, None);
                info!(
                    "{} Starting new UID validity epoch {}",
                    mapper.path.display(),
                    mapper.table.uid_validity
                );
                return mapper;
            }
            Err(e) => {
                error!(
                    "{} Unreadable UID table, regenerating: {}",
                    path.display(),
                    e
                );
                return Self::fresh(path, None);
            }
        };

        match serde_cbor::from_slice::<UidTable>(&data) {
            Ok(table) if Self::is_consistent(&table) => UidMapper {
                path,
                table,
                dirty: false,
            },
            Ok(_) => {
                error!(
                    "{} UID table is inconsistent, regenerating",
                    path.display()
                );
                let prev = serde_cbor::from_slice::<UidTableHeader>(&data)
                    .ok()
                    .map(|h| h.uid_validity);
                Self::fresh(path, prev)
            }
            Err(e) => {
                let prev = serde_cbor::from_slice::<UidTableHeader>(&data)
                    .ok()
                    .map(|h| h.uid_validity);
                error!(
                    "{} Corrupt UID table, regenerating \
                     (previous UID validity {:?}): {}",
                    path.display(),
                    prev,
                    e
                );
                Self::fresh(path, prev)
            }
        }
    }

    fn fresh(path: PathBuf, previous_uid_validity: Option<u32>) -> Self {
        let now = now_secs();
        let uid_validity = match previous_uid_validity {
            Some(prev) => now.max(prev.wrapping_add(1)),
            None => now,
        };

        UidMapper {
            path,
            table: UidTable {
                uid_validity,
                next_uid: Uid::MIN,
                ids: HashMap::new(),
            },
            // A regenerated table must reach disk even if nothing is added,
            // or the next process would start yet another epoch.
            dirty: true,
        }
    }

    fn is_consistent(table: &UidTable) -> bool {
        table.ids.values().all(|&uid| uid < table.next_uid)
    }

    /// Return the UID of `id`, allocating the next one if it has none.
    ///
    /// No I/O happens here; call `flush()` to persist new assignments.
    pub fn find_or_add(&mut self, id: &str) -> Result<Uid, Error> {
        if let Some(&uid) = self.table.ids.get(id) {
            return Ok(uid);
        }

        let uid = self.table.next_uid;
        // UID u32::MAX is never handed out since there would be no valid
        // UIDNEXT after it.
        let next = uid.next().ok_or(Error::MailboxFull)?;
        self.table.next_uid = next;
        self.table.ids.insert(id.to_owned(), uid);
        self.dirty = true;
        Ok(uid)
    }

    /// Forget `id`. Its UID is never reissued.
    pub fn remove(&mut self, id: &str) {
        if self.table.ids.remove(id).is_some() {
            self.dirty = true;
        }
    }

    pub fn get(&self, id: &str) -> Option<Uid> {
        self.table.ids.get(id).copied()
    }

    pub fn next_uid(&self) -> Uid {
        self.table.next_uid
    }

    pub fn uid_validity(&self) -> u32 {
        self.table.uid_validity
    }

    /// Durably write the table if anything changed since the last flush.
    ///
    /// On failure the in-memory state is kept as-is and stays dirty, so a
    /// later flush retries the write.
    pub fn flush(&mut self) -> Result<(), Error> {
        if !self.dirty {
            return Ok(());
        }

        let data = serde_cbor::to_vec(&self.table)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(Error::UidMapWrite)?;
        }
        file_ops::spit(&self.path, 0o600, &data)
            .map_err(Error::UidMapWrite)?;
        self.dirty = false;
        Ok(())
    }
}

fn now_secs() -> u32 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    // Zero is a legal but suspicious epoch; clocks before 1970 or after 2106
    // are not worth accommodating beyond not panicking.
    (secs as u32).max(1)
}

/// Escape a mailbox name into a file name for its UID table.
///
/// Alphanumerics, `-` and `_` pass through; everything else becomes `%XX`
/// per UTF-8 byte, so distinct names never collide.
pub fn table_file_name(mailbox: &str) -> String {
    let mut ret = String::with_capacity(mailbox.len() + 5);
    for &b in mailbox.as_bytes() {
        if b.is_ascii_alphanumeric() || b'-' == b || b'_' == b {
            ret.push(b as char);
        } else {
            ret.push_str(&format!("%{:02X}", b));
        }
    }
    ret.push_str(".cbor");
    ret
}

/// The process-wide set of loaded UID tables.
///
/// Every session of every user shares the same in-memory table for a given
/// path, so two sessions never hand out the same UID.
#[derive(Debug, Default)]
pub struct UidMapCache {
    tables: Mutex<HashMap<PathBuf, Arc<Mutex<UidMapper>>>>,
}

impl UidMapCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared table for `path`, loading it on first use.
    pub fn get(&self, path: &Path) -> Arc<Mutex<UidMapper>> {
        let mut tables = match self.tables.lock() {
            Ok(t) => t,
            Err(poisoned) => {
                warn!("UID table cache lock poisoned; continuing");
                poisoned.into_inner()
            }
        };

        Arc::clone(tables.entry(path.to_owned()).or_insert_with(|| {
            Arc::new(Mutex::new(UidMapper::load(path.to_owned())))
        }))
    }
}
