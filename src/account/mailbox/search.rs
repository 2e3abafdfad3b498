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

use std::collections::{HashMap, HashSet};

use super::defs::*;
use crate::account::model::*;
use crate::account::query::{self, Candidate, Residual};
use crate::account::store::OpenMode;
use crate::support::error::Error;

impl Mailbox {
    /// The `SEARCH` command.
    pub fn seqnum_search(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResponse<Seqnum>, Error> {
        Ok(SearchResponse {
            hits: self
                .search_impl(request)?
                .into_iter()
                .map(|(s, _)| s)
                .collect(),
        })
    }

    /// The `UID SEARCH` command.
    pub fn search(
        &self,
        request: &SearchRequest,
    ) -> Result<SearchResponse<Uid>, Error> {
        Ok(SearchResponse {
            hits: self
                .search_impl(request)?
                .into_iter()
                .map(|(_, u)| u)
                .collect(),
        })
    }

    fn search_impl(
        &self,
        request: &SearchRequest,
    ) -> Result<Vec<(Seqnum, Uid)>, Error> {
        let translation = query::translate(&request.queries)?;

        let mut state = lock(&self.state);
        let snapshot = self.refresh(&mut state)?;

        if Residual::False == translation.residual {
            return Ok(Vec::new());
        }

        let session = self.store.open(OpenMode::ReadOnly)?;
        let run = |q: &str| -> Result<HashSet<String>, Error> {
            Ok(session
                .query(&self.scoped(q))?
                .into_iter()
                .map(|m| m.id)
                .collect())
        };

        let candidates = match translation.query {
            Some(ref q) => Some(run(q)?),
            None => None,
        };
        let mut hits = HashMap::new();
        for q in translation.residual.queries() {
            if !hits.contains_key(q) {
                hits.insert(q.to_owned(), run(q)?);
            }
        }

        Ok(snapshot
            .messages
            .iter()
            .enumerate()
            .map(|(ix, m)| (Seqnum::from_index(ix), m))
            .filter(|&(_, m)| {
                candidates.as_ref().map_or(true, |c| c.contains(&m.id))
            })
            .filter(|&(seqnum, m)| {
                translation.residual.matches(
                    &Candidate {
                        id: &m.id,
                        seqnum,
                        uid: m.uid,
                        size: m.size,
                    },
                    &hits,
                )
            })
            .map(|(seqnum, m)| (seqnum, m.uid))
            .collect())
    }
}
