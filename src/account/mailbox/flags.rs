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

use log::warn;

use super::defs::*;
use crate::account::flag_map::{merge_tags, MaildirFlags};
use crate::account::model::*;
use crate::account::store::{OpenMode, StoreSession};
use crate::support::error::Error;

impl Mailbox {
    /// The `STORE` command.
    pub fn seqnum_store(
        &self,
        request: &StoreRequest<Seqnum>,
    ) -> Result<StoreResponse, Error> {
        self.store_where(request.flags, request.op, |seqnum, _| {
            request.ids.contains(seqnum)
        })
    }

    /// The `UID STORE` command.
    pub fn store(
        &self,
        request: &StoreRequest<Uid>,
    ) -> Result<StoreResponse, Error> {
        self.store_where(request.flags, request.op, |_, uid| {
            request.ids.contains(uid)
        })
    }

    fn store_where(
        &self,
        flags: &[Flag],
        op: FlagsOp,
        selected: impl Fn(Seqnum, Uid) -> bool,
    ) -> Result<StoreResponse, Error> {
        let requested = MaildirFlags::from_flags(flags);

        let mut state = lock(&self.state);
        let snapshot = self.refresh(&mut state)?;
        let mut session = self.store.open(OpenMode::ReadWrite)?;

        let mut response = StoreResponse::default();
        for ix in 0..snapshot.messages.len() {
            let seqnum = Seqnum::from_index(ix);
            let message = &snapshot.messages[ix];
            if !selected(seqnum, message.uid) {
                continue;
            }

            let uid = message.uid;
            let old = message.flags;
            let new = old.apply(op, requested);
            let path = match rewrite_flags(&mut *session, &message.id, new) {
                Ok(path) => path,
                Err(e) => {
                    warn!(
                        "{} Failed to update flags of UID {}: {}",
                        self.log_prefix,
                        uid.0.get(),
                        e
                    );
                    continue;
                }
            };

            let message = &mut snapshot.messages[ix];
            message.flags = new;
            message.path = path;
            snapshot.account_flags_changed(old, new);
            response.updated.push(FlagUpdate {
                seqnum,
                uid,
                flags: new.to_flags(),
            });
        }

        Ok(response)
    }
}

/// Make the tags of `id` carry exactly `flags`, then let the store rename
/// its files to match.
fn rewrite_flags(
    session: &mut (dyn StoreSession + '_),
    id: &str,
    flags: MaildirFlags,
) -> Result<PathBuf, Error> {
    let existing = session.find_message(id)?.ok_or(Error::NxMessage)?;
    let tags = merge_tags(existing.tags.iter().map(String::as_str), flags);
    session.rewrite_tags(id, &tags)?;
    session.tags_to_maildir_flags(id)
}
