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

/// Determine whether the given name is "safe".
///
/// This is used to validate mailbox names and maildir folder components,
/// both of which end up joined onto the store root. It excludes empty names
/// and patterns that cause directory traversal or other unwanted behaviours,
/// as well as things that have special meaning within IMAP.
///
/// This does not care about whether the name is ultimately a valid file name;
/// for that, we simply rely on the OS rejecting it.
pub fn is_safe_name(name: &str) -> bool {
    !name.is_empty() &&
        // Block directory traversal through .. and creation of hidden files on
        // UNIX
        name.chars().next() != Some('.') &&
        name.find('/').is_none() &&
        name.find('\\').is_none() &&
        // Names beginning with # have special meaning in IMAP
        name.chars().next() != Some('#') &&
        // Don't allow any ASCII control characters
        name.find(|c| c < ' ' || c == '\x7F').is_none() &&
        // * and % are very special in *some* IMAP contexts, so forbid
        // everywhere
        name.find(|c| c == '*' || c == '%').is_none()
}

/// Determine whether every `/`-separated component of `path` is safe.
///
/// The empty path is accepted and refers to the store root itself.
pub fn is_safe_path(path: &str) -> bool {
    path.is_empty() || path.split('/').all(is_safe_name)
}
