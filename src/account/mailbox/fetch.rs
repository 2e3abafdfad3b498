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

use std::fmt;
use std::fs;

use crossbeam::channel::Sender;
use log::{debug, warn};

use super::defs::*;
use crate::account::model::*;
use crate::support::error::Error;

impl Mailbox {
    /// The `FETCH` command.
    ///
    /// Results are sent to `sink` in mailbox order. `sink` is dropped on
    /// return, which is how the receiver learns the listing is complete.
    pub fn seqnum_fetch(
        &self,
        request: &FetchRequest<Seqnum>,
        sink: Sender<FetchedMessage>,
    ) -> Result<(), Error> {
        self.fetch_where(
            request,
            |seqnum, _| request.ids.contains(seqnum),
            sink,
        )
    }

    /// The `UID FETCH` command.
    pub fn fetch(
        &self,
        request: &FetchRequest<Uid>,
        sink: Sender<FetchedMessage>,
    ) -> Result<(), Error> {
        self.fetch_where(request, |_, uid| request.ids.contains(uid), sink)
    }

    fn fetch_where<ID>(
        &self,
        request: &FetchRequest<ID>,
        selected: impl Fn(Seqnum, Uid) -> bool,
        sink: Sender<FetchedMessage>,
    ) -> Result<(), Error>
    where
        SeqRange<ID>: fmt::Debug,
    {
        let mut state = lock(&self.state);
        let snapshot = self.refresh(&mut state)?;

        for (ix, message) in snapshot.messages.iter().enumerate() {
            let seqnum = Seqnum::from_index(ix);
            if !selected(seqnum, message.uid) {
                continue;
            }

            let fetched = match self.fetch_one(request, seqnum, message) {
                Ok(fetched) => fetched,
                Err(e) => {
                    warn!(
                        "{} Failed to fetch UID {}: {}",
                        self.log_prefix,
                        message.uid.0.get(),
                        e
                    );
                    continue;
                }
            };

            if sink.send(fetched).is_err() {
                debug!("{} Fetch receiver hung up", self.log_prefix);
                break;
            }
        }

        Ok(())
    }

    fn fetch_one<ID>(
        &self,
        request: &FetchRequest<ID>,
        seqnum: Seqnum,
        message: &Message,
    ) -> Result<FetchedMessage, Error>
    where
        SeqRange<ID>: fmt::Debug,
    {
        let mut fetched = FetchedMessage {
            seqnum,
            uid: message.uid,
            flags: None,
            rfc822size: None,
            internal_date: None,
            sections: Vec::new(),
        };

        if request.flags {
            fetched.flags = Some(message.flags.to_flags());
        }
        if request.rfc822size {
            fetched.rfc822size = Some(message.size);
        }
        if request.internal_date {
            fetched.internal_date = Some(message.date);
        }

        if !request.sections.is_empty() {
            let data = fs::read(&message.path)?;
            let split = header_length(&data);
            for &section in &request.sections {
                let part = match section {
                    BodySection::Full => &data[..],
                    BodySection::Header => &data[..split],
                    BodySection::Text => &data[split..],
                };
                fetched.sections.push((section, part.to_vec()));
            }
        }

        Ok(fetched)
    }
}

/// The length of the header block, including the blank line that ends it.
///
/// A message with no blank line is all header.
fn header_length(data: &[u8]) -> usize {
    let mut line_start = 0;
    while line_start < data.len() {
        let line_end = data[line_start..]
            .iter()
            .position(|&b| b'\n' == b)
            .map(|p| line_start + p + 1)
            .unwrap_or_else(|| data.len());
        let line = &data[line_start..line_end];
        if b"\n" == line || b"\r\n" == line {
            return line_end;
        }
        line_start = line_end;
    }
    data.len()
}
