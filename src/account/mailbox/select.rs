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

use std::fs;
use std::sync::atomic::Ordering::SeqCst;

use log::{debug, error, warn};

use super::defs::*;
use crate::account::flag_map::{MaildirFlags, TAG_NEW, TAG_UNREAD};
use crate::account::model::*;
use crate::account::store::OpenMode;
use crate::support::error::Error;

impl Mailbox {
    /// Return the snapshot, rebuilding it first if it may be out of date.
    pub(super) fn refresh<'a>(
        &self,
        state: &'a mut MailboxState,
    ) -> Result<&'a mut Snapshot, Error> {
        if self.expired.swap(false, SeqCst) {
            state.snapshot = None;
        }

        let signal = match self.store.freshness() {
            Ok(signal) => Some(signal),
            Err(e) => {
                warn!(
                    "{} Can't read index freshness, assuming stale: {}",
                    self.log_prefix, e
                );
                None
            }
        };

        let fresh = match (state.last_refreshed, signal) {
            (Some(last), Some(now)) => now <= last,
            _ => false,
        };

        let snapshot = match state.snapshot.take() {
            Some(snapshot) if fresh => snapshot,
            _ => {
                state.last_refreshed = None;
                let snapshot = self.rebuild()?;
                state.last_refreshed = signal;
                snapshot
            }
        };

        Ok(state.snapshot.insert(snapshot))
    }

    fn rebuild(&self) -> Result<Snapshot, Error> {
        debug!("{} Rebuilding snapshot", self.log_prefix);

        let session = self.store.open(OpenMode::ReadOnly)?;
        let total = session.count(&self.query)?;
        let recent = session.count(&self.scoped(&format!("tag:{}", TAG_NEW)))?;
        let unseen =
            session.count(&self.scoped(&format!("tag:{}", TAG_UNREAD)))?;
        let stored = session.query(&self.query)?;
        drop(session);

        let uid_map = self.uid_maps.get(&self.uid_map_path);
        let mut messages = Vec::with_capacity(stored.len());
        {
            let mut mapper = lock(&uid_map);
            for sm in stored {
                let md = match fs::metadata(&sm.path) {
                    Ok(md) => md,
                    Err(e) => {
                        warn!(
                            "{} Skipping {}, can't stat {}: {}",
                            self.log_prefix,
                            sm.id,
                            sm.path.display(),
                            e
                        );
                        continue;
                    }
                };

                let flags = sm
                    .path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(MaildirFlags::from_filename)
                    .unwrap_or_else(MaildirFlags::empty);

                messages.push(Message {
                    uid: mapper.find_or_add(&sm.id)?,
                    recent: sm.tags.contains(TAG_NEW),
                    id: sm.id,
                    date: sm.date,
                    size: md.len(),
                    path: sm.path,
                    flags,
                });
            }

            // The read path must keep working even if the table can't be
            // written; the new assignments are retried on the next flush.
            if let Err(e) = mapper.flush() {
                error!("{} Failed to persist UIDs: {}", self.log_prefix, e);
            }
        }

        // The index returns messages in date order, but UIDs must ascend
        // with sequence numbers. They only disagree when a message with an
        // old date shows up late.
        messages.sort_by_key(|m| m.uid);

        Ok(Snapshot {
            messages,
            total,
            recent,
            unseen,
            uid_map,
        })
    }

    /// The `STATUS` command, also used for `SELECT` and `EXAMINE`.
    pub fn status(
        &self,
        request: &StatusRequest,
    ) -> Result<StatusResponse, Error> {
        let mut state = lock(&self.state);
        let snapshot = self.refresh(&mut state)?;
        let mapper = lock(&snapshot.uid_map);

        Ok(StatusResponse {
            name: self.name.clone(),
            messages: Some(snapshot.total).filter(|_| request.messages),
            recent: Some(snapshot.recent).filter(|_| request.recent),
            uidnext: Some(mapper.next_uid()).filter(|_| request.uidnext),
            uidvalidity: Some(mapper.uid_validity())
                .filter(|_| request.uidvalidity),
            unseen: Some(snapshot.unseen).filter(|_| request.unseen),
            first_unseen: snapshot.first_unseen(),
            permanent_flags: MaildirFlags::all().to_flags(),
        })
    }

    /// The `LIST` entry for this mailbox.
    pub fn info(&self) -> MailboxInfo {
        let mut attributes = self.attributes.clone();
        // Mailboxes are flat
        if !attributes.contains(&MailboxAttribute::Noinferiors) {
            attributes.push(MailboxAttribute::HasNoChildren);
        }
        attributes.sort();
        attributes.dedup();

        MailboxInfo {
            name: self.name.clone(),
            attributes,
        }
    }

    /// Subscriptions are not tracked; every mailbox is always subscribed.
    pub fn set_subscribed(&self, _subscribed: bool) -> Result<(), Error> {
        Err(Error::UnsupportedOperation)
    }

    /// The `CHECK` command.
    pub fn check(&self) -> Result<(), Error> {
        Err(Error::UnsupportedOperation)
    }
}
