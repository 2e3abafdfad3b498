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

use log::{debug, warn};

use super::defs::*;
use crate::account::flag_map::MaildirFlags;
use crate::account::model::*;
use crate::account::store::OpenMode;
use crate::support::error::Error;

impl Mailbox {
    /// Expunge every message with the `\Deleted` flag.
    ///
    /// This is the `EXPUNGE` operation from RFC 3501, and is also used for
    /// `CLOSE`. The response lists the removed messages in ascending order
    /// with the sequence numbers they had *before* the expunge.
    pub fn expunge(&self) -> Result<ExpungeResponse, Error> {
        self.expunge_where(|_| true)
    }

    /// Expunge messages with the `\Deleted` flag which are also in `uids`.
    ///
    /// This is the `UID EXPUNGE` operation from RFC 4315.
    pub fn uid_expunge(
        &self,
        uids: &SeqRange<Uid>,
    ) -> Result<ExpungeResponse, Error> {
        self.expunge_where(|uid| uids.contains(uid))
    }

    fn expunge_where(
        &self,
        selected: impl Fn(Uid) -> bool,
    ) -> Result<ExpungeResponse, Error> {
        let mut state = lock(&self.state);
        let snapshot = self.refresh(&mut state)?;

        let mut gone = HashSet::new();
        {
            let mut session = self.store.open(OpenMode::ReadWrite)?;
            for message in &snapshot.messages {
                if !message.flags.contains(MaildirFlags::TRASHED)
                    || !selected(message.uid)
                {
                    continue;
                }

                debug!("{} Expunging {}", self.log_prefix, message.id);
                match session.remove_message(&message.path) {
                    Ok(()) => {
                        gone.insert(message.uid);
                    }
                    Err(e) => warn!(
                        "{} Failed to expunge UID {}: {}",
                        self.log_prefix,
                        message.uid.0.get(),
                        e
                    ),
                }
            }
        }

        let removed = snapshot.remove_where(|_, m| gone.contains(&m.uid));
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
}
