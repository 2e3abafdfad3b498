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

//! Translation between IMAP flags, maildir file name flags and index tags.
//!
//! Everything here is pure. Anything outside the recognised vocabulary is
//! dropped silently in every direction.
//!
//! | IMAP          | maildir | tag                   |
//! |---------------|---------|-----------------------|
//! | `\Draft`      | `D`     | `draft`               |
//! | `\Flagged`    | `F`     | `flagged`             |
//! | `$Forwarded`  | `P`     | `passed`              |
//! | `\Answered`   | `R`     | `replied`             |
//! | `\Seen`       | `S`     | absence of `unread`   |
//! | `\Deleted`    | `T`     | `deleted`             |

use std::collections::BTreeSet;

use bitflags::bitflags;
use lazy_static::lazy_static;
use regex::Regex;

use super::model::{Flag, FlagsOp};

bitflags! {
    /// The recognised flag vocabulary, as a set.
    #[derive(Default)]
    pub struct MaildirFlags: u8 {
        const DRAFT = 1 << 0;
        const FLAGGED = 1 << 1;
        const PASSED = 1 << 2;
        const REPLIED = 1 << 3;
        const SEEN = 1 << 4;
        const TRASHED = 1 << 5;
    }
}

/// The separator between a maildir unique name and its info section.
pub const INFO_SEPARATOR: &str = ":2,";

pub const TAG_UNREAD: &str = "unread";
pub const TAG_NEW: &str = "new";

// In maildir order (ASCII), which is also the order `to_flags` reports.
const TABLE: &[(MaildirFlags, char, &str)] = &[
    (MaildirFlags::DRAFT, 'D', "draft"),
    (MaildirFlags::FLAGGED, 'F', "flagged"),
    (MaildirFlags::PASSED, 'P', "passed"),
    (MaildirFlags::REPLIED, 'R', "replied"),
    (MaildirFlags::SEEN, 'S', ""),
    (MaildirFlags::TRASHED, 'T', "deleted"),
];

lazy_static! {
    static ref INFO_SUFFIX: Regex = Regex::new(":2,([A-Za-z]*)$").unwrap();
}

impl MaildirFlags {
    pub fn from_flag(flag: &Flag) -> Self {
        match *flag {
            Flag::Draft => MaildirFlags::DRAFT,
            Flag::Flagged => MaildirFlags::FLAGGED,
            Flag::Answered => MaildirFlags::REPLIED,
            Flag::Seen => MaildirFlags::SEEN,
            Flag::Deleted => MaildirFlags::TRASHED,
            ref kw if *kw == Flag::forwarded() => MaildirFlags::PASSED,
            Flag::Keyword(_) => MaildirFlags::empty(),
        }
    }

    pub fn from_flags<'a>(flags: impl IntoIterator<Item = &'a Flag>) -> Self {
        flags
            .into_iter()
            .fold(MaildirFlags::empty(), |acc, f| acc | Self::from_flag(f))
    }

    /// The IMAP flags in this set, in a stable order.
    pub fn to_flags(self) -> Vec<Flag> {
        let mut ret = Vec::new();
        if self.contains(MaildirFlags::DRAFT) {
            ret.push(Flag::Draft);
        }
        if self.contains(MaildirFlags::FLAGGED) {
            ret.push(Flag::Flagged);
        }
        if self.contains(MaildirFlags::PASSED) {
            ret.push(Flag::forwarded());
        }
        if self.contains(MaildirFlags::REPLIED) {
            ret.push(Flag::Answered);
        }
        if self.contains(MaildirFlags::SEEN) {
            ret.push(Flag::Seen);
        }
        if self.contains(MaildirFlags::TRASHED) {
            ret.push(Flag::Deleted);
        }
        ret
    }

    pub fn from_info_chars(chars: &str) -> Self {
        chars.chars().fold(MaildirFlags::empty(), |acc, ch| {
            acc | TABLE
                .iter()
                .find(|&&(_, c, _)| c == ch)
                .map(|&(f, _, _)| f)
                .unwrap_or_else(MaildirFlags::empty)
        })
    }

    /// Derive the flags from a maildir file name.
    ///
    /// Names without an info section (e.g. anything in `new/`) have no
    /// flags.
    pub fn from_filename(name: &str) -> Self {
        INFO_SUFFIX
            .captures(name)
            .and_then(|c| c.get(1))
            .map(|m| Self::from_info_chars(m.as_str()))
            .unwrap_or_else(MaildirFlags::empty)
    }

    /// The maildir info section for this set, e.g. `:2,FS`.
    pub fn info_suffix(self) -> String {
        let mut s = INFO_SEPARATOR.to_owned();
        s.extend(
            TABLE
                .iter()
                .filter(|&&(f, _, _)| self.contains(f))
                .map(|&(_, c, _)| c),
        );
        s
    }

    /// Derive the flags from a message's tags.
    ///
    /// `\Seen` is implied by the *absence* of `unread`.
    pub fn from_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> Self {
        let mut ret = MaildirFlags::SEEN;
        for tag in tags {
            if TAG_UNREAD == tag {
                ret.remove(MaildirFlags::SEEN);
            } else if let Some(&(f, _, _)) =
                TABLE.iter().find(|&&(_, _, t)| !t.is_empty() && t == tag)
            {
                ret |= f;
            }
        }
        ret
    }

    /// The tags this flag set implies.
    pub fn tags(self) -> BTreeSet<String> {
        let mut ret: BTreeSet<String> = TABLE
            .iter()
            .filter(|&&(f, _, t)| !t.is_empty() && self.contains(f))
            .map(|&(_, _, t)| t.to_owned())
            .collect();
        if !self.contains(MaildirFlags::SEEN) {
            ret.insert(TAG_UNREAD.to_owned());
        }
        ret
    }

    /// Apply a `STORE` operation to this set.
    pub fn apply(self, op: FlagsOp, flags: MaildirFlags) -> Self {
        match op {
            FlagsOp::Add => self | flags,
            FlagsOp::Remove => self - flags,
            FlagsOp::Replace => flags,
        }
    }
}

/// Whether `tag` is one the flag vocabulary controls.
pub fn is_managed_tag(tag: &str) -> bool {
    TAG_UNREAD == tag
        || TABLE.iter().any(|&(_, _, t)| !t.is_empty() && t == tag)
}

/// Compute the full tag set a message should carry after its flags become
/// `flags`.
///
/// Tags outside the flag vocabulary (`inbox`, `new`, user labels) are kept;
/// managed tags are replaced by what `flags` implies.
pub fn merge_tags<'a>(
    existing: impl IntoIterator<Item = &'a str>,
    flags: MaildirFlags,
) -> BTreeSet<String> {
    let mut ret: BTreeSet<String> = existing
        .into_iter()
        .filter(|t| !is_managed_tag(t))
        .map(str::to_owned)
        .collect();
    ret.extend(flags.tags());
    ret
}
