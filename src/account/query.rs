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

//! Translation of IMAP search queries into index queries.
//!
//! The index can answer anything about message content, dates and tags, but
//! knows nothing about sequence numbers or UIDs, and does not index message
//! sizes. Search is therefore done in two phases. Everything the index can
//! express is folded into one query string; everything else becomes a
//! `Residual` predicate which the mailbox evaluates against its in-memory
//! list for each message the index returned.
//!
//! At the top level (an implicit AND) the split is clean. Positional
//! conditions nested under `NOT` or `OR` cannot be separated from their
//! siblings, so the sibling index conditions become `Residual::Query`
//! leaves. The mailbox runs each of those as a separate index query and
//! uses the resulting ID sets while evaluating the residual.

use std::collections::{HashMap, HashSet};

use chrono::prelude::*;

use super::flag_map::{TAG_NEW, TAG_UNREAD};
use super::model::*;
use crate::support::error::Error;

/// The result of translating a search request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Translation {
    /// The index query, or `None` if every message in the mailbox is a
    /// candidate.
    pub query: Option<String>,
    /// The predicate every candidate must also satisfy.
    pub residual: Residual,
}

/// An in-memory predicate over the messages of a mailbox.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Residual {
    True,
    False,
    SeqIn(SeqRange<Seqnum>),
    UidIn(SeqRange<Uid>),
    Larger(u32),
    Smaller(u32),
    /// Matches messages returned by this index query, scoped to the mailbox.
    Query(String),
    Not(Box<Residual>),
    And(Vec<Residual>),
    Or(Box<Residual>, Box<Residual>),
}

/// What the residual is evaluated against.
#[derive(Clone, Copy, Debug)]
pub struct Candidate<'a> {
    pub id: &'a str,
    pub seqnum: Seqnum,
    pub uid: Uid,
    pub size: u64,
}

impl Residual {
    /// Every `Query` leaf, each of which must be run before `matches`.
    pub fn queries(&self) -> Vec<&str> {
        let mut ret = Vec::new();
        self.collect_queries(&mut ret);
        ret
    }

    fn collect_queries<'a>(&'a self, dst: &mut Vec<&'a str>) {
        match *self {
            Residual::Query(ref q) => dst.push(q),
            Residual::Not(ref sub) => sub.collect_queries(dst),
            Residual::And(ref subs) => {
                for sub in subs {
                    sub.collect_queries(dst);
                }
            }
            Residual::Or(ref a, ref b) => {
                a.collect_queries(dst);
                b.collect_queries(dst);
            }
            _ => (),
        }
    }

    /// Evaluate this predicate.
    ///
    /// `hits` maps each query from `queries()` to the IDs it returned. A
    /// query missing from `hits` matches nothing.
    pub fn matches(
        &self,
        c: &Candidate<'_>,
        hits: &HashMap<String, HashSet<String>>,
    ) -> bool {
        match *self {
            Residual::True => true,
            Residual::False => false,
            Residual::SeqIn(ref set) => set.contains(c.seqnum),
            Residual::UidIn(ref set) => set.contains(c.uid),
            Residual::Larger(thresh) => c.size > u64::from(thresh),
            Residual::Smaller(thresh) => c.size < u64::from(thresh),
            Residual::Query(ref q) => {
                hits.get(q).map_or(false, |ids| ids.contains(c.id))
            }
            Residual::Not(ref sub) => !sub.matches(c, hits),
            Residual::And(ref subs) => subs.iter().all(|s| s.matches(c, hits)),
            Residual::Or(ref a, ref b) => {
                a.matches(c, hits) || b.matches(c, hits)
            }
        }
    }
}

// The translation of one query node.
#[derive(Clone, Debug)]
enum Node {
    Const(bool),
    Index(String),
    Memory(Residual),
}

impl Node {
    fn into_residual(self) -> Residual {
        match self {
            Node::Const(true) => Residual::True,
            Node::Const(false) => Residual::False,
            Node::Index(q) => Residual::Query(q),
            Node::Memory(r) => r,
        }
    }
}

/// Translate the implicit conjunction `queries`.
pub fn translate(queries: &[SearchQuery]) -> Result<Translation, Error> {
    let mut nodes = Vec::with_capacity(queries.len());
    flatten_and(&mut nodes, queries)?;

    let mut index = Vec::new();
    let mut memory = Vec::new();
    for node in nodes {
        match node {
            Node::Const(true) => (),
            Node::Const(false) => {
                return Ok(Translation {
                    query: None,
                    residual: Residual::False,
                });
            }
            Node::Index(q) => index.push(q),
            Node::Memory(r) => memory.push(r),
        }
    }

    let query = match index.len() {
        0 => None,
        1 => index.pop(),
        _ => Some(join(&index, "and")),
    };
    let residual = match memory.len() {
        0 => Residual::True,
        1 => memory.pop().unwrap_or(Residual::True),
        _ => Residual::And(memory),
    };

    Ok(Translation { query, residual })
}

fn flatten_and(
    dst: &mut Vec<Node>,
    queries: &[SearchQuery],
) -> Result<(), Error> {
    for q in queries {
        if let SearchQuery::And(ref subs) = *q {
            flatten_and(dst, subs)?;
        } else {
            dst.push(translate_one(q)?);
        }
    }
    Ok(())
}

fn translate_one(query: &SearchQuery) -> Result<Node, Error> {
    Ok(match *query {
        SearchQuery::All => Node::Const(true),

        SearchQuery::SequenceSet(ref set) => {
            Node::Memory(Residual::SeqIn(set.clone()))
        }
        SearchQuery::UidSet(ref set) => {
            Node::Memory(Residual::UidIn(set.clone()))
        }
        SearchQuery::Larger(thresh) => Node::Memory(Residual::Larger(thresh)),
        SearchQuery::Smaller(thresh) => {
            Node::Memory(Residual::Smaller(thresh))
        }

        SearchQuery::Answered => tag("replied"),
        SearchQuery::Unanswered => not_tag("replied"),
        SearchQuery::Deleted => tag("deleted"),
        SearchQuery::Undeleted => not_tag("deleted"),
        SearchQuery::Draft => tag("draft"),
        SearchQuery::Undraft => not_tag("draft"),
        SearchQuery::Flagged => tag("flagged"),
        SearchQuery::Unflagged => not_tag("flagged"),
        SearchQuery::Seen => not_tag(TAG_UNREAD),
        SearchQuery::Unseen => tag(TAG_UNREAD),
        SearchQuery::Keyword(ref kw) => {
            if is_forwarded(kw) {
                tag("passed")
            } else {
                Node::Const(false)
            }
        }
        SearchQuery::Unkeyword(ref kw) => {
            if is_forwarded(kw) {
                not_tag("passed")
            } else {
                Node::Const(true)
            }
        }

        SearchQuery::Recent => tag(TAG_NEW),
        SearchQuery::Old => not_tag(TAG_NEW),
        SearchQuery::New => Node::Index(format!(
            "tag:{} and tag:{}",
            TAG_NEW, TAG_UNREAD
        )),

        SearchQuery::From(ref s) => phrase("from:", s),
        // The index folds every recipient header into `to:`
        SearchQuery::To(ref s)
        | SearchQuery::Cc(ref s)
        | SearchQuery::Bcc(ref s) => phrase("to:", s),
        SearchQuery::Subject(ref s) => phrase("subject:", s),
        SearchQuery::Body(ref s) => phrase("body:", s),
        SearchQuery::Text(ref s) => phrase("", s),
        SearchQuery::Header(ref name, ref value) => header(name, value)?,

        SearchQuery::Before(date) | SearchQuery::SentBefore(date) => {
            match date.pred_opt() {
                Some(last) => Node::Index(format!("date:..{}", day(last))),
                None => Node::Const(false),
            }
        }
        SearchQuery::On(date) | SearchQuery::SentOn(date) => {
            Node::Index(format!("date:{}..{}", day(date), day(date)))
        }
        SearchQuery::Since(date) | SearchQuery::SentSince(date) => {
            Node::Index(format!("date:{}..", day(date)))
        }

        SearchQuery::Not(ref sub) => match translate_one(sub)? {
            Node::Const(b) => Node::Const(!b),
            Node::Index(q) => Node::Index(format!("not ({})", q)),
            Node::Memory(r) => Node::Memory(Residual::Not(Box::new(r))),
        },

        SearchQuery::Or(ref a, ref b) => {
            match (translate_one(a)?, translate_one(b)?) {
                (Node::Const(true), _) | (_, Node::Const(true)) => {
                    Node::Const(true)
                }
                (Node::Const(false), other) | (other, Node::Const(false)) => {
                    other
                }
                (Node::Index(a), Node::Index(b)) => {
                    Node::Index(join(&[a, b], "or"))
                }
                (a, b) => Node::Memory(Residual::Or(
                    Box::new(a.into_residual()),
                    Box::new(b.into_residual()),
                )),
            }
        }

        SearchQuery::And(ref subs) => {
            let mut nodes = Vec::with_capacity(subs.len());
            flatten_and(&mut nodes, subs)?;
            and_nodes(nodes)
        }
    })
}

fn and_nodes(nodes: Vec<Node>) -> Node {
    let mut index = Vec::new();
    let mut memory = Vec::new();
    for node in nodes {
        match node {
            Node::Const(true) => (),
            Node::Const(false) => return Node::Const(false),
            Node::Index(q) => index.push(q),
            Node::Memory(r) => memory.push(r),
        }
    }

    if memory.is_empty() {
        match index.len() {
            0 => Node::Const(true),
            1 => Node::Index(index.remove(0)),
            _ => Node::Index(join(&index, "and")),
        }
    } else {
        if !index.is_empty() {
            memory.push(Residual::Query(join(&index, "and")));
        }
        Node::Memory(Residual::And(memory))
    }
}

fn header(name: &str, value: &str) -> Result<Node, Error> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "from" => Ok(phrase("from:", value)),
        "to" | "cc" | "bcc" => Ok(phrase("to:", value)),
        "subject" => Ok(phrase("subject:", value)),
        "message-id" => {
            let id = value.trim().trim_start_matches('<').trim_end_matches('>');
            if id.is_empty() {
                Ok(Node::Const(true))
            } else {
                Ok(Node::Index(format!("id:{}", quote(id))))
            }
        }
        _ => Err(Error::UnsupportedSearch(format!("header {}", name))),
    }
}

fn is_forwarded(kw: &str) -> bool {
    Flag::Keyword(kw.to_owned()) == Flag::forwarded()
}

fn tag(t: &str) -> Node {
    Node::Index(format!("tag:{}", t))
}

fn not_tag(t: &str) -> Node {
    Node::Index(format!("not tag:{}", t))
}

// An empty substring matches every message.
fn phrase(prefix: &str, s: &str) -> Node {
    if s.is_empty() {
        Node::Const(true)
    } else {
        Node::Index(format!("{}{}", prefix, quote(s)))
    }
}

/// Quote `s` as an index phrase, doubling embedded quotes.
pub fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn join(parts: &[String], op: &str) -> String {
    parts
        .iter()
        .map(|p| format!("({})", p))
        .collect::<Vec<_>>()
        .join(&format!(" {} ", op))
}

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
