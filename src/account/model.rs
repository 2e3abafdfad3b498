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

//! Request and response types shared between the protocol layer and the
//! mailbox implementation.

use std::collections::BTreeMap;
use std::convert::{TryFrom, TryInto};
use std::fmt;
use std::marker::PhantomData;
use std::num::NonZeroU32;
use std::ops::Bound::{Excluded, Included, Unbounded};
use std::str::FromStr;

use chrono::prelude::*;
use serde::{Deserialize, Serialize};

use crate::support::error::Error;

/// Identifies a message within one mailbox for one UID validity epoch.
///
/// UIDs start at 1 and are handed out strictly sequentially by the mailbox's
/// identifier table. A UID is never given to a different message within the
/// same epoch, even after the original message is gone.
#[derive(
    Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct Uid(pub NonZeroU32);

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Uid({})", self.0.get())
    }
}

// Only so that things containing SeqRange<Uid> can derive Default.
impl Default for Uid {
    fn default() -> Self {
        Uid::MIN
    }
}

impl Uid {
    pub const MIN: Self = match NonZeroU32::new(1) {
        Some(v) => Uid(v),
        None => unreachable!(),
    };
    pub const MAX: Self = match NonZeroU32::new(u32::MAX) {
        Some(v) => Uid(v),
        None => unreachable!(),
    };

    pub fn of(uid: u32) -> Option<Self> {
        NonZeroU32::new(uid).map(Uid)
    }

    pub fn next(self) -> Option<Self> {
        self.0.get().checked_add(1).and_then(Uid::of)
    }

    #[cfg(test)]
    pub fn u(uid: u32) -> Self {
        Uid::of(uid).unwrap()
    }
}

impl TryFrom<u32> for Uid {
    type Error = ();

    fn try_from(v: u32) -> Result<Self, ()> {
        Self::of(v).ok_or(())
    }
}

impl From<Uid> for u32 {
    fn from(uid: Uid) -> u32 {
        uid.0.get()
    }
}

/// The 1-based position of a message in the mailbox's current list.
///
/// Sequence numbers are never stored. They are derived from the list every
/// time they are needed, so any removal shifts every later message down.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Seqnum(pub NonZeroU32);

// Only so that things containing SeqRange<Seqnum> can derive Default.
impl Default for Seqnum {
    fn default() -> Self {
        Seqnum::MIN
    }
}

impl Seqnum {
    pub const MIN: Self = match NonZeroU32::new(1) {
        Some(v) => Seqnum(v),
        None => unreachable!(),
    };
    pub const MAX: Self = match NonZeroU32::new(u32::MAX) {
        Some(v) => Seqnum(v),
        None => unreachable!(),
    };

    pub fn of(seqnum: u32) -> Option<Self> {
        NonZeroU32::new(seqnum).map(Seqnum)
    }

    #[cfg(test)]
    pub fn u(seqnum: u32) -> Self {
        Seqnum::of(seqnum).unwrap()
    }

    /// Convert a list index to a sequence number.
    ///
    /// Lists longer than `u32::MAX` cannot be addressed; such indices
    /// saturate.
    pub fn from_index(ix: usize) -> Self {
        ix.checked_add(1)
            .and_then(|v| v.try_into().ok())
            .and_then(Seqnum::of)
            .unwrap_or(Seqnum::MAX)
    }
}

impl TryFrom<u32> for Seqnum {
    type Error = ();

    fn try_from(v: u32) -> Result<Self, ()> {
        Self::of(v).ok_or(())
    }
}

impl From<Seqnum> for u32 {
    fn from(seqnum: Seqnum) -> u32 {
        seqnum.0.get()
    }
}

impl fmt::Debug for Seqnum {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Seqnum({})", self.0.get())
    }
}

/// A set of sequence numbers or UIDs in IMAP "sequence set" form.
///
/// Internally, this is a minimal sorted set of inclusive ranges. The original
/// fragmentation, ordering and duplication of the input is not kept.
///
/// The `Display` format is the minimal IMAP wire format. IMAP cannot express
/// an empty set, so an empty range displays as an empty string.
#[derive(Clone, PartialEq, Eq)]
pub struct SeqRange<T> {
    parts: BTreeMap<u32, u32>,
    _t: PhantomData<T>,
}

impl<T> SeqRange<T> {
    pub fn new() -> Self {
        SeqRange {
            parts: BTreeMap::new(),
            _t: PhantomData,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl<T: TryFrom<u32> + Into<u32> + PartialOrd> SeqRange<T> {
    pub fn just(item: T) -> Self {
        let mut this = SeqRange::new();
        this.append(item);
        this
    }

    pub fn range(start: T, end: T) -> Self {
        let mut this = SeqRange::new();
        this.insert(start, end);
        this
    }

    /// Append a single item, which must be strictly greater than everything
    /// already in the set.
    pub fn append(&mut self, item: T) {
        let item: u32 = item.into();

        if let Some(end) = self.parts.values_mut().next_back() {
            assert!(item > *end);

            if item == *end + 1 {
                *end = item;
                return;
            }
        }

        self.parts.insert(item, item);
    }

    /// Insert the inclusive range `start_incl..=end_incl`.
    pub fn insert(&mut self, start_incl: T, end_incl: T) {
        assert!(end_incl >= start_incl);
        self.insert_raw(start_incl.into(), end_incl.into());
    }

    fn insert_raw(&mut self, start_incl: u32, mut end_incl: u32) {
        // Swallow every later range that overlaps or touches this one
        while let Some((next_start, next_end)) = self
            .parts
            .range((Excluded(start_incl), Unbounded))
            .next()
            .map(|(&s, &e)| (s, e))
        {
            if next_start - 1 > end_incl {
                break;
            }

            end_incl = end_incl.max(next_end);
            self.parts.remove(&next_start);
        }

        let preceding = self
            .parts
            .range((Unbounded, Included(end_incl)))
            .next_back()
            .map(|(&s, &e)| (s, e));
        if let Some((prev_start, prev_end)) = preceding {
            if prev_end.saturating_add(1) >= start_incl {
                if start_incl < prev_start {
                    self.parts.remove(&prev_start);
                    self.parts.insert(start_incl, end_incl.max(prev_end));
                } else {
                    self.parts.insert(prev_start, end_incl.max(prev_end));
                }
                return;
            }
        }

        self.parts.insert(start_incl, end_incl);
    }

    pub fn contains(&self, v: T) -> bool {
        let v: u32 = v.into();
        self.parts
            .range(..=v)
            .next_back()
            .filter(|&(_, &end)| end >= v)
            .is_some()
    }

    /// Iterate the items in this set in strictly ascending order.
    ///
    /// Items greater than `max` are excluded.
    pub fn items(&self, max: impl Into<u32>) -> impl Iterator<Item = T> + '_ {
        let max: u32 = max.into();
        self.parts
            .iter()
            .map(|(&start, &end)| (start, end))
            .filter(move |&(start, _)| start <= max)
            .flat_map(move |(start, end)| start..=end.min(max))
            .filter_map(|v| T::try_from(v).ok())
    }

    /// Parse the IMAP format of a sequence set.
    ///
    /// `splat` is the value substituted for `*`.
    pub fn parse(raw: &str, splat: T) -> Option<Self> {
        fn do_parse(r: &str, splat: u32) -> Option<u32> {
            if "*" == r {
                Some(splat)
            } else {
                r.parse().ok().filter(|&v| v > 0)
            }
        }

        let splat = splat.into();

        let mut this = Self::new();
        for part in raw.split(',') {
            let mut subs = part.split(':');
            match (subs.next(), subs.next(), subs.next()) {
                (Some(only), None, None) => {
                    let only = do_parse(only, splat)?;
                    this.insert_raw(only, only);
                }
                (Some(start), Some(end), None) => {
                    let start = do_parse(start, splat)?;
                    let end = do_parse(end, splat)?;
                    // Endpoints may come in either order
                    this.insert_raw(start.min(end), end.max(start));
                }
                _ => return None,
            }
        }

        Some(this)
    }

    pub fn len(&self) -> usize {
        self.parts
            .iter()
            .map(|(start, end)| (end - start) as usize + 1)
            .sum()
    }
}

impl<T> fmt::Display for SeqRange<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (ix, (&start, &end)) in self.parts.iter().enumerate() {
            let delim = if 0 == ix { "" } else { "," };

            if start == end {
                write!(f, "{}{}", delim, start)?;
            } else {
                write!(f, "{}{}:{}", delim, start, end)?;
            }
        }

        Ok(())
    }
}

impl fmt::Debug for SeqRange<Seqnum> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[Seqnum {}]", self)
    }
}

impl fmt::Debug for SeqRange<Uid> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[Uid {}]", self)
    }
}

impl<T> Default for SeqRange<T> {
    fn default() -> Self {
        SeqRange::new()
    }
}

/// A message flag.
///
/// System flags are top-level enum values; everything else is a `Keyword`.
/// The `Display` format is the wire format, and `FromStr` parses it back,
/// accepting any casing of the system flags.
///
/// `\Recent` is not a flag here. It is derived from the `new` tag and only
/// ever reported as a count.
#[derive(Clone, Serialize, Deserialize)]
pub enum Flag {
    Answered,
    Deleted,
    Draft,
    Flagged,
    Seen,
    Keyword(String),
}

impl Flag {
    /// The `$Forwarded` keyword, which the maildir `P` flag carries.
    pub fn forwarded() -> Self {
        Flag::Keyword("$Forwarded".to_owned())
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Flag::Answered => write!(f, "\\Answered"),
            Flag::Deleted => write!(f, "\\Deleted"),
            Flag::Draft => write!(f, "\\Draft"),
            Flag::Flagged => write!(f, "\\Flagged"),
            Flag::Seen => write!(f, "\\Seen"),
            Flag::Keyword(ref kw) => write!(f, "{}", kw),
        }
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        <Flag as fmt::Display>::fmt(self, f)
    }
}

impl FromStr for Flag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        if s.eq_ignore_ascii_case("\\answered") {
            Ok(Flag::Answered)
        } else if s.eq_ignore_ascii_case("\\deleted") {
            Ok(Flag::Deleted)
        } else if s.eq_ignore_ascii_case("\\draft") {
            Ok(Flag::Draft)
        } else if s.eq_ignore_ascii_case("\\flagged") {
            Ok(Flag::Flagged)
        } else if s.eq_ignore_ascii_case("\\seen") {
            Ok(Flag::Seen)
        } else if s.starts_with('\\') {
            Err(Error::NxFlag)
        } else if !s.is_empty() && s.bytes().all(is_atom_char) {
            Ok(Flag::Keyword(s.to_owned()))
        } else {
            Err(Error::UnsafeName)
        }
    }
}

fn is_atom_char(ch: u8) -> bool {
    !matches!(
        ch,
        0..=b' '
            | 127..=255
            | b'('
            | b')'
            | b'{'
            | b'*'
            | b'%'
            | b'\\'
            | b'"'
            | b']'
    )
}

impl PartialEq for Flag {
    fn eq(&self, other: &Flag) -> bool {
        match (self, other) {
            (&Flag::Answered, &Flag::Answered) => true,
            (&Flag::Deleted, &Flag::Deleted) => true,
            (&Flag::Draft, &Flag::Draft) => true,
            (&Flag::Flagged, &Flag::Flagged) => true,
            (&Flag::Seen, &Flag::Seen) => true,
            // Clients expect keywords to be case-insensitive. Only ASCII
            // folding is done since keywords are atoms anyway.
            (&Flag::Keyword(ref a), &Flag::Keyword(ref b)) => {
                a.eq_ignore_ascii_case(b)
            }
            _ => false,
        }
    }
}

impl Eq for Flag {}

/// Attributes that may be applied to mailboxes.
///
/// Mailboxes are defined in configuration, so only the attributes an
/// administrator could sensibly assign are here, mostly the RFC 6154
/// special-use markers.
#[derive(
    Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(try_from = "String", into = "String")]
pub enum MailboxAttribute {
    Noinferiors,
    HasNoChildren,
    All,
    Archive,
    Drafts,
    Flagged,
    Junk,
    Sent,
    Trash,
    Important,
}

impl MailboxAttribute {
    pub const ALL: &'static [MailboxAttribute] = &[
        MailboxAttribute::Noinferiors,
        MailboxAttribute::HasNoChildren,
        MailboxAttribute::All,
        MailboxAttribute::Archive,
        MailboxAttribute::Drafts,
        MailboxAttribute::Flagged,
        MailboxAttribute::Junk,
        MailboxAttribute::Sent,
        MailboxAttribute::Trash,
        MailboxAttribute::Important,
    ];

    pub fn name(&self) -> &'static str {
        match *self {
            MailboxAttribute::Noinferiors => "\\Noinferiors",
            MailboxAttribute::HasNoChildren => "\\HasNoChildren",
            MailboxAttribute::All => "\\All",
            MailboxAttribute::Archive => "\\Archive",
            MailboxAttribute::Drafts => "\\Drafts",
            MailboxAttribute::Flagged => "\\Flagged",
            MailboxAttribute::Junk => "\\Junk",
            MailboxAttribute::Sent => "\\Sent",
            MailboxAttribute::Trash => "\\Trash",
            MailboxAttribute::Important => "\\Important",
        }
    }
}

impl fmt::Display for MailboxAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for MailboxAttribute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        <MailboxAttribute as fmt::Display>::fmt(self, f)
    }
}

impl FromStr for MailboxAttribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        MailboxAttribute::ALL
            .iter()
            .copied()
            .find(|a| a.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                Error::Config(format!("unknown mailbox attribute {:?}", s))
            })
    }
}

impl TryFrom<String> for MailboxAttribute {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Error> {
        s.parse()
    }
}

impl From<MailboxAttribute> for String {
    fn from(a: MailboxAttribute) -> String {
        a.name().to_owned()
    }
}

/// A `LIST` response for one mailbox.
///
/// The hierarchy delimiter is always `/`.
#[derive(Debug, Clone, PartialEq, Eq, Default, PartialOrd, Ord)]
pub struct MailboxInfo {
    pub name: String,
    pub attributes: Vec<MailboxAttribute>,
}

/// The `STATUS` command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusRequest {
    /// Return the number of messages.
    pub messages: bool,
    /// Return the number of messages carrying the `new` tag.
    pub recent: bool,
    /// Return the next UID value.
    pub uidnext: bool,
    /// Return the UID validity.
    pub uidvalidity: bool,
    /// Return the number of not-`\Seen` messages.
    pub unseen: bool,
}

impl StatusRequest {
    pub fn everything() -> Self {
        StatusRequest {
            messages: true,
            recent: true,
            uidnext: true,
            uidvalidity: true,
            unseen: true,
        }
    }
}

/// The `STATUS` response.
///
/// The counted fields are only set if requested. `first_unseen` and
/// `permanent_flags` are always populated since `SELECT` needs them too.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusResponse {
    pub name: String,

    pub messages: Option<usize>,
    pub recent: Option<usize>,
    pub uidnext: Option<Uid>,
    pub uidvalidity: Option<u32>,
    pub unseen: Option<usize>,

    /// The sequence number of the first message without `\Seen`, or `None`
    /// if everything is seen.
    pub first_unseen: Option<Seqnum>,
    /// Flags which are stored permanently.
    ///
    /// `\*` is always reported alongside these.
    pub permanent_flags: Vec<Flag>,
}

/// One body part a `FETCH` can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySection {
    /// `BODY[]`
    Full,
    /// `BODY[HEADER]`, including the blank separator line.
    Header,
    /// `BODY[TEXT]`
    Text,
}

/// Request information for `FETCH` and `UID FETCH`.
#[derive(Clone, Debug, Default)]
pub struct FetchRequest<ID>
where
    SeqRange<ID>: fmt::Debug,
{
    pub ids: SeqRange<ID>,
    pub flags: bool,
    pub rfc822size: bool,
    pub internal_date: bool,
    pub sections: Vec<BodySection>,
}

/// One record produced by a `FETCH`.
///
/// The sequence number and UID are always present; everything else only if
/// requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedMessage {
    pub seqnum: Seqnum,
    pub uid: Uid,
    pub flags: Option<Vec<Flag>>,
    pub rfc822size: Option<u64>,
    pub internal_date: Option<DateTime<FixedOffset>>,
    pub sections: Vec<(BodySection, Vec<u8>)>,
}

/// How a `STORE` combines the given flags with what a message has.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagsOp {
    /// `+FLAGS`
    Add,
    /// `-FLAGS`
    Remove,
    /// `FLAGS`
    Replace,
}

/// Request information for `STORE` and `UID STORE`.
#[derive(Clone, Debug)]
pub struct StoreRequest<'a, ID>
where
    SeqRange<ID>: fmt::Debug,
{
    pub ids: &'a SeqRange<ID>,
    pub flags: &'a [Flag],
    pub op: FlagsOp,
}

/// The new flags of one message touched by a `STORE`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagUpdate {
    pub seqnum: Seqnum,
    pub uid: Uid,
    pub flags: Vec<Flag>,
}

/// Response information for `STORE` and `UID STORE`.
///
/// Messages whose update failed are absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreResponse {
    pub updated: Vec<FlagUpdate>,
}

/// The `SEARCH` and `UID SEARCH` commands.
///
/// The queries are implicitly joined by AND.
#[derive(Clone, Debug, Default)]
pub struct SearchRequest {
    pub queries: Vec<SearchQuery>,
}

/// The query for the `SEARCH` command, as a direct AST of the IMAP syntax.
///
/// The "Un$flag" forms are kept rather than desugared so that all translation
/// to the index's query language happens in one place.
#[derive(Clone, Debug)]
pub enum SearchQuery {
    SequenceSet(SeqRange<Seqnum>),
    All,
    Answered,
    Bcc(String),
    Before(NaiveDate),
    Body(String),
    Cc(String),
    Deleted,
    Draft,
    Flagged,
    From(String),
    Header(String, String),
    Keyword(String),
    Larger(u32),
    New,
    Not(Box<SearchQuery>),
    Old, // NB "NOT RECENT", not "NOT NEW"
    On(NaiveDate),
    Or(Box<SearchQuery>, Box<SearchQuery>),
    Recent,
    Seen,
    SentBefore(NaiveDate),
    SentOn(NaiveDate),
    SentSince(NaiveDate),
    Since(NaiveDate),
    Smaller(u32),
    Subject(String),
    Text(String),
    To(String),
    UidSet(SeqRange<Uid>), // "UID" in the grammar; "Set" for disambiguation
    Unanswered,
    Undeleted,
    Undraft,
    Unflagged,
    Unkeyword(String),
    Unseen,
    And(Vec<SearchQuery>),
}

/// The response from `SEARCH` (`ID` = `Seqnum`) or `UID SEARCH`
/// (`ID` = `Uid`), in mailbox order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchResponse<ID> {
    pub hits: Vec<ID>,
}

/// The response for the `APPEND` command (RFC 4315 `APPENDUID`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendResponse {
    pub uid_validity: u32,
    pub uid: Uid,
}

/// The `COPY` and `UID COPY` commands.
#[derive(Debug, Clone)]
pub struct CopyRequest<ID>
where
    SeqRange<ID>: fmt::Debug,
{
    pub ids: SeqRange<ID>,
}

/// Messages removed from a mailbox by `EXPUNGE` or `MOVE`.
///
/// Sorted ascending, with sequence numbers as they were before the
/// operation. Non-`QRESYNC` clients must be sent `EXPUNGE` responses in
/// *reverse* order so that each sequence number is still valid when the
/// client sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpungeResponse {
    pub expunged: Vec<(Seqnum, Uid)>,
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;

    use super::*;

    fn assert_sr(
        expected_content: &[u32],
        expected_string: &str,
        seqrange: SeqRange<Uid>,
    ) {
        let actual: Vec<u32> =
            seqrange.items(u32::MAX).map(|u| u.0.get()).collect();
        assert_eq!(expected_content, &actual[..]);
        assert_eq!(expected_string, &seqrange.to_string());
    }

    #[test]
    fn seqrange_parsing() {
        assert_sr(&[1], "1", SeqRange::parse("1", Uid::u(10)).unwrap());
        assert_sr(&[10], "10", SeqRange::parse("*", Uid::u(10)).unwrap());
        assert_sr(&[1, 2], "1:2", SeqRange::parse("2:1", Uid::u(10)).unwrap());
        assert_sr(
            &[9, 10],
            "9:10",
            SeqRange::parse("*:9", Uid::u(10)).unwrap(),
        );
        assert_sr(
            &[1, 3, 5],
            "1,3,5",
            SeqRange::parse("3,5,1", Uid::u(10)).unwrap(),
        );
        assert_sr(
            &[1, 2, 3, 4],
            "1:4",
            SeqRange::parse("1:2,3,4", Uid::u(10)).unwrap(),
        );
        assert_sr(
            &[1, 2, 3, 4],
            "1:4",
            SeqRange::parse("2:3,1:4", Uid::u(10)).unwrap(),
        );
        assert_sr(
            &[1, 2, 3, 4],
            "1:4",
            SeqRange::parse("1:3,2:4", Uid::u(10)).unwrap(),
        );

        assert!(SeqRange::<Uid>::parse("", Uid::u(10)).is_none());
        assert!(SeqRange::<Uid>::parse("0", Uid::u(10)).is_none());
        assert!(SeqRange::<Uid>::parse("1:2:3", Uid::u(10)).is_none());
        assert!(SeqRange::<Uid>::parse("x", Uid::u(10)).is_none());
    }

    #[test]
    fn seqrange_append() {
        let mut seqrange = SeqRange::new();
        seqrange.append(Uid::u(1));
        seqrange.append(Uid::u(2));
        assert_eq!("1:2", &seqrange.to_string());
        seqrange.append(Uid::u(5));
        assert_eq!("1:2,5", &seqrange.to_string());
        assert_eq!(3, seqrange.len());
    }

    #[test]
    fn seqnum_index_conversion() {
        assert_eq!(Seqnum::u(1), Seqnum::from_index(0));
        assert_eq!(Seqnum::u(3), Seqnum::from_index(2));
    }

    #[test]
    fn uid_next_stops_at_max() {
        assert_eq!(Some(Uid::u(2)), Uid::MIN.next());
        assert_eq!(None, Uid::MAX.next());
    }

    #[test]
    fn flag_parsing() {
        assert_eq!(Flag::Seen, "\\SEEN".parse::<Flag>().unwrap());
        assert_eq!(Flag::forwarded(), "$forwarded".parse::<Flag>().unwrap());
        assert_matches!(Err(Error::NxFlag), "\\Recent".parse::<Flag>());
        assert_matches!(Err(Error::UnsafeName), "a b".parse::<Flag>());
        assert_eq!("\\Answered", Flag::Answered.to_string());
    }

    #[test]
    fn mailbox_attribute_parsing() {
        assert_eq!(
            MailboxAttribute::Archive,
            "\\archive".parse::<MailboxAttribute>().unwrap()
        );
        assert_matches!(
            Err(Error::Config(_)),
            "\\Bogus".parse::<MailboxAttribute>()
        );
    }

    proptest! {
        #[test]
        fn seqrange_properties(
            ranges in prop::collection::vec((1u32..30, 1u32..=10), 1..=5)
        ) {
            let mut expected = Vec::new();
            let mut seqrange = SeqRange::new();

            for &(start, extent) in &ranges {
                seqrange.insert(Uid::u(start), Uid::u(start + extent));
                expected.extend(start..=start + extent);
            }

            expected.sort();
            expected.dedup();

            let actual: Vec<u32> = seqrange.items(u32::MAX).map(
                |u| u.0.get()).collect();
            prop_assert_eq!(&expected, &actual);

            for i in 1..50 {
                prop_assert_eq!(
                    expected.contains(&i),
                    seqrange.contains(Uid::u(i)),
                    "Bad contains result for {}",
                    i
                );
            }

            prop_assert_eq!(
                &seqrange,
                &SeqRange::parse(&seqrange.to_string(), Uid::MAX).unwrap());
        }
    }
}
