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

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};

use super::defs::*;
use crate::account::flag_map::TAG_UNREAD;
use crate::account::model::*;
use crate::account::store::{OpenMode, StoreSession};
use crate::support::error::Error;
use crate::support::safe_name::is_safe_path;

impl Mailbox {
    /// The `MOVE` command.
    ///
    /// Returns the messages which left this mailbox, with the sequence
    /// numbers they had before the move.
    pub fn seqnum_move_messages(
        &self,
        dest: &str,
        ids: &SeqRange<Seqnum>,
    ) -> Result<ExpungeResponse, Error> {
        self.move_where(dest, |seqnum, _| ids.contains(seqnum))
    }

    /// The `UID MOVE` command.
    pub fn move_messages(
        &self,
        dest: &str,
        ids: &SeqRange<Uid>,
    ) -> Result<ExpungeResponse, Error> {
        self.move_where(dest, |_, uid| ids.contains(uid))
    }

    /// The `COPY` and `UID COPY` commands.
    ///
    /// A copy would be a second file for the same message, which the index
    /// would just merge back into one message.
    pub fn copy_messages<ID>(
        &self,
        _request: &CopyRequest<ID>,
        _dest: &str,
    ) -> Result<(), Error>
    where
        SeqRange<ID>: fmt::Debug,
    {
        Err(Error::UnsupportedOperation)
    }

    fn move_where(
        &self,
        dest: &str,
        selected: impl Fn(Seqnum, Uid) -> bool,
    ) -> Result<ExpungeResponse, Error> {
        let (dest_mailbox, dest_folder) = self.resolve_destination(dest)?;
        if !dest_folder.is_dir() {
            return Err(Error::NxMailbox);
        }

        let mut state = lock(&self.state);
        let snapshot = self.refresh(&mut state)?;

        let mut moved = HashSet::new();
        {
            let mut session = self.store.open(OpenMode::ReadWrite)?;
            for (ix, message) in snapshot.messages.iter().enumerate() {
                if !selected(Seqnum::from_index(ix), message.uid) {
                    continue;
                }

                match self.move_one(&mut *session, message, &dest_folder) {
                    Ok(true) => {
                        moved.insert(message.uid);
                    }
                    Ok(false) => debug!(
                        "{} UID {} is already in {}",
                        self.log_prefix,
                        message.uid.0.get(),
                        dest
                    ),
                    Err(e) => warn!(
                        "{} Failed to move UID {} to {}: {}",
                        self.log_prefix,
                        message.uid.0.get(),
                        dest,
                        e
                    ),
                }
            }
        }

        let removed = snapshot.remove_where(|_, m| moved.contains(&m.uid));
        if let Some(dest_mailbox) = dest_mailbox {
            dest_mailbox.expire();
        }

        let mut mapper = lock(&snapshot.uid_map);
        for &(_, ref message) in &removed {
            mapper.remove(&message.id);
        }
        mapper.flush()?;

        Ok(ExpungeResponse {
            expunged: removed
                .into_iter()
                .map(|(seqnum, m)| (seqnum, m.uid))
                .collect(),
        })
    }

    /// Find the mailbox named `dest`, if it is configured, and the folder
    /// messages moved there should go to.
    ///
    /// An unconfigured name is taken to be a folder under the store root.
    fn resolve_destination(
        &self,
        dest: &str,
    ) -> Result<(Option<Arc<Mailbox>>, PathBuf), Error> {
        let namespace = self.namespace.upgrade();
        if let Some(mailbox) = namespace.as_ref().and_then(|ns| ns.get(dest)) {
            return Ok((Some(Arc::clone(mailbox)), mailbox.folder.clone()));
        }

        if dest.is_empty() || !is_safe_path(dest) {
            return Err(Error::UnsafeName);
        }
        Ok((None, self.store.root().join(dest)))
    }

    /// Move one message's file into `dest_folder` and tell the index.
    ///
    /// Returns whether the message left its folder.
    fn move_one(
        &self,
        session: &mut (dyn StoreSession + '_),
        message: &Message,
        dest_folder: &Path,
    ) -> Result<bool, Error> {
        // The file is already where the move would put it. Detaching the old
        // path here would drop the message from the index.
        if message.path.parent().and_then(Path::parent) == Some(dest_folder) {
            return Ok(false);
        }

        let stored = session
            .find_message_by_path(&message.path)?
            .ok_or(Error::NxMessage)?;
        let file_name = message.path.file_name().ok_or(Error::NxMessage)?;
        let subdir = if stored.tags.contains(TAG_UNREAD) {
            "new"
        } else {
            "cur"
        };

        let dest_dir = dest_folder.join(subdir);
        let dest_path = dest_dir.join(file_name);
        fs::create_dir_all(&dest_dir)?;
        fs::rename(&message.path, &dest_path)?;

        // The file has moved, so the message has left this mailbox whatever
        // the index makes of it. Attaching the new path first keeps the
        // message, and so its tags, alive in between.
        if let Err(e) = session.add_message(&dest_path) {
            warn!(
                "{} Failed to index moved file {}: {}",
                self.log_prefix,
                dest_path.display(),
                e
            );
        }
        if let Err(e) = session.remove_message(&message.path) {
            warn!(
                "{} Failed to unindex old path {}: {}",
                self.log_prefix,
                message.path.display(),
                e
            );
        }

        Ok(true)
    }
}
