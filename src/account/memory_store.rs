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

//! A small stand-in for the mail index, used by the tests.
//!
//! Messages are real files in a temporary maildir tree; only the index is
//! kept in memory. The query language covers what the mailbox layer and the
//! search translator generate: `tag:`, `id:`, `folder:`, `date:a..b`,
//! `from:`, `to:`, `subject:`, `body:`, bare phrases, `*`, and `and`, `or`,
//! `not` with parentheses.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering::SeqCst};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, UNIX_EPOCH};

use chrono::prelude::*;
use tempfile::TempDir;

use super::flag_map::{merge_tags, MaildirFlags, INFO_SEPARATOR};
use super::store::{
    OpenMode, Store, StoreSession, StoredMessage, FRESHNESS_SIGNAL,
};
use crate::support::error::Error;
use crate::support::file_ops::IgnoreKinds;

const NEW_TAGS: &[&str] = &["inbox", "unread"];

pub struct MemoryStore {
    root: TempDir,
    state: Mutex<State>,
    queries: AtomicUsize,
}

#[derive(Default)]
struct State {
    messages: BTreeMap<String, Entry>,
    generation: u64,
    counter: u64,
    unavailable: bool,
    failing_tags: HashSet<String>,
    failing_removal: HashSet<String>,
}

#[derive(Clone, Debug)]
struct Entry {
    paths: Vec<PathBuf>,
    date: DateTime<FixedOffset>,
    tags: BTreeSet<String>,
    from: String,
    to: String,
    subject: String,
    body: String,
}

impl MemoryStore {
    pub fn new() -> Self {
        let root = TempDir::new().unwrap();
        let signal = root.path().join(FRESHNESS_SIGNAL);
        fs::create_dir_all(signal.parent().unwrap()).unwrap();
        fs::write(&signal, b"").unwrap();

        let store = MemoryStore {
            root,
            state: Mutex::new(State::default()),
            queries: AtomicUsize::new(0),
        };
        store.touch(&mut store.lock());
        store
    }

    pub fn root_path(&self) -> &Path {
        self.root.path()
    }

    /// Write `content` into `<folder>/<subdir>/` and index it, as an
    /// external delivery agent would, returning the message ID.
    ///
    /// `info` becomes the maildir info section if non-empty.
    pub fn deliver(
        &self,
        folder: &str,
        subdir: &str,
        content: &str,
        info: &str,
    ) -> String {
        let folder = self.root.path().join(folder);
        for sub in &["new", "cur", "tmp"] {
            fs::create_dir_all(folder.join(sub)).unwrap();
        }

        let mut state = self.lock();
        state.counter += 1;
        let mut name = format!("{}.memory", state.counter);
        if !info.is_empty() {
            name.push_str(INFO_SEPARATOR);
            name.push_str(info);
        }
        let path = folder.join(subdir).join(name);
        fs::write(&path, content).unwrap();
        self.index(&mut state, &path).unwrap()
    }

    /// Add tags behind the mailbox layer's back.
    pub fn add_tags(&self, id: &str, tags: &[&str]) {
        let mut state = self.lock();
        let entry = state.messages.get_mut(id).unwrap();
        entry.tags.extend(tags.iter().map(|&t| t.to_owned()));
        self.touch(&mut state);
    }

    pub fn message(&self, id: &str) -> Option<StoredMessage> {
        self.lock().messages.get(id).map(|e| e.to_stored(id))
    }

    pub fn message_by_subject(&self, subject: &str) -> Option<StoredMessage> {
        self.lock()
            .messages
            .iter()
            .find(|&(_, e)| e.subject == subject)
            .map(|(id, e)| e.to_stored(id))
    }

    /// The number of `query` calls made so far (not counting `count`).
    pub fn query_count(&self) -> usize {
        self.queries.load(SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    pub fn remove_freshness_signal(&self) {
        fs::remove_file(self.root.path().join(FRESHNESS_SIGNAL)).unwrap();
    }

    /// Make every tag write to `id` fail.
    pub fn fail_tag_writes(&self, id: &str) {
        self.lock().failing_tags.insert(id.to_owned());
    }

    /// Make removing any file of `id` fail.
    pub fn fail_removal(&self, id: &str) {
        self.lock().failing_removal.insert(id.to_owned());
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Advance the freshness signal, as the real index does on every write.
    fn touch(&self, state: &mut State) {
        state.generation += 1;
        let mtime = UNIX_EPOCH
            + Duration::from_secs(1_600_000_000 + state.generation);
        if let Ok(file) = fs::OpenOptions::new()
            .write(true)
            .open(self.root.path().join(FRESHNESS_SIGNAL))
        {
            file.set_modified(mtime).unwrap();
        }
    }

    fn index(&self, state: &mut State, path: &Path) -> Result<String, Error> {
        let data = fs::read(path)?;
        let parsed = parse_message(&String::from_utf8_lossy(&data));
        let id = match parsed.id {
            Some(id) => id,
            None => {
                state.counter += 1;
                format!("generated-{}@memory", state.counter)
            }
        };

        if let Some(entry) = state.messages.get_mut(&id) {
            if !entry.paths.iter().any(|p| p == path) {
                entry.paths.push(path.to_owned());
            }
        } else {
            let mut tags: BTreeSet<String> =
                NEW_TAGS.iter().map(|&t| t.to_owned()).collect();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if name.contains(INFO_SEPARATOR) {
                tags = merge_tags(
                    tags.iter().map(String::as_str),
                    MaildirFlags::from_filename(name),
                );
            }

            state.messages.insert(
                id.clone(),
                Entry {
                    paths: vec![path.to_owned()],
                    date: parsed.date,
                    tags,
                    from: parsed.from,
                    to: parsed.to,
                    subject: parsed.subject,
                    body: parsed.body,
                },
            );
        }

        self.touch(state);
        Ok(id)
    }

    fn folder_of(&self, path: &Path) -> Option<String> {
        let folder = path.parent()?.parent()?;
        let rel = folder.strip_prefix(self.root.path()).ok()?;
        rel.to_str().map(str::to_owned)
    }
}

impl Store for MemoryStore {
    fn root(&self) -> &Path {
        self.root.path()
    }

    fn open(
        &self,
        mode: OpenMode,
    ) -> Result<Box<dyn StoreSession + '_>, Error> {
        if self.lock().unavailable {
            return Err(Error::Store("index unavailable".to_owned()));
        }
        Ok(Box::new(Session { store: self, mode }))
    }
}

struct Session<'a> {
    store: &'a MemoryStore,
    mode: OpenMode,
}

impl Session<'_> {
    fn writable(&self) -> Result<MutexGuard<'_, State>, Error> {
        if OpenMode::ReadOnly == self.mode {
            return Err(Error::Store("session is read-only".to_owned()));
        }
        Ok(self.store.lock())
    }

    fn matching(&self, query: &str) -> Result<Vec<StoredMessage>, Error> {
        let expr = parse_query(query)?;
        let state = self.store.lock();
        let mut hits = state
            .messages
            .iter()
            .filter(|&(id, e)| expr.matches(self.store, id, e))
            .map(|(id, e)| e.to_stored(id))
            .collect::<Vec<_>>();
        hits.sort_by(|a, b| (a.date, &a.id).cmp(&(b.date, &b.id)));
        Ok(hits)
    }
}

impl StoreSession for Session<'_> {
    fn query(&self, query: &str) -> Result<Vec<StoredMessage>, Error> {
        self.store.queries.fetch_add(1, SeqCst);
        self.matching(query)
    }

    fn count(&self, query: &str) -> Result<usize, Error> {
        Ok(self.matching(query)?.len())
    }

    fn add_message(&mut self, path: &Path) -> Result<String, Error> {
        let mut state = self.writable()?;
        self.store.index(&mut state, path)
    }

    fn find_message(&self, id: &str) -> Result<Option<StoredMessage>, Error> {
        Ok(self.store.lock().messages.get(id).map(|e| e.to_stored(id)))
    }

    fn find_message_by_path(
        &self,
        path: &Path,
    ) -> Result<Option<StoredMessage>, Error> {
        Ok(self
            .store
            .lock()
            .messages
            .iter()
            .find(|&(_, e)| e.paths.iter().any(|p| p == path))
            .map(|(id, e)| e.to_stored(id)))
    }

    fn remove_message(&mut self, path: &Path) -> Result<(), Error> {
        let mut state = self.writable()?;
        let id = state
            .messages
            .iter()
            .find(|&(_, e)| e.paths.iter().any(|p| p == path))
            .map(|(id, _)| id.clone())
            .ok_or(Error::NxMessage)?;
        if state.failing_removal.contains(&id) {
            return Err(Error::Store(format!("cannot remove {}", id)));
        }

        fs::remove_file(path).ignore_not_found()?;
        let now_empty = match state.messages.get_mut(&id) {
            Some(entry) => {
                entry.paths.retain(|p| p != path);
                entry.paths.is_empty()
            }
            None => false,
        };
        if now_empty {
            state.messages.remove(&id);
        }
        self.store.touch(&mut state);
        Ok(())
    }

    fn remove_all_tags(&mut self, id: &str) -> Result<(), Error> {
        let mut state = self.writable()?;
        if state.failing_tags.contains(id) {
            return Err(Error::Store(format!("cannot tag {}", id)));
        }
        state
            .messages
            .get_mut(id)
            .ok_or(Error::NxMessage)?
            .tags
            .clear();
        self.store.touch(&mut state);
        Ok(())
    }

    fn add_tag(&mut self, id: &str, tag: &str) -> Result<(), Error> {
        let mut state = self.writable()?;
        if state.failing_tags.contains(id) {
            return Err(Error::Store(format!("cannot tag {}", id)));
        }
        state
            .messages
            .get_mut(id)
            .ok_or(Error::NxMessage)?
            .tags
            .insert(tag.to_owned());
        self.store.touch(&mut state);
        Ok(())
    }

    fn tags_to_maildir_flags(&mut self, id: &str) -> Result<PathBuf, Error> {
        let mut state = self.writable()?;
        let entry = state.messages.get_mut(id).ok_or(Error::NxMessage)?;
        let flags =
            MaildirFlags::from_tags(entry.tags.iter().map(String::as_str));

        for path in &mut entry.paths {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or(Error::NxMessage)?;
            let base = name.split(INFO_SEPARATOR).next().unwrap_or(name);
            let folder = path
                .parent()
                .and_then(Path::parent)
                .ok_or(Error::NxMessage)?;
            let renamed = folder
                .join("cur")
                .join(format!("{}{}", base, flags.info_suffix()));
            if renamed != *path {
                fs::rename(&*path, &renamed)?;
                *path = renamed;
            }
        }

        let first = entry.paths.first().cloned().ok_or(Error::NxMessage)?;
        self.store.touch(&mut state);
        Ok(first)
    }
}

impl Entry {
    fn to_stored(&self, id: &str) -> StoredMessage {
        StoredMessage {
            id: id.to_owned(),
            path: self.paths[0].clone(),
            date: self.date,
            tags: self.tags.clone(),
        }
    }
}

struct ParsedMessage {
    id: Option<String>,
    date: DateTime<FixedOffset>,
    from: String,
    to: String,
    subject: String,
    body: String,
}

fn parse_message(text: &str) -> ParsedMessage {
    let mut parsed = ParsedMessage {
        id: None,
        date: FixedOffset::east_opt(0)
            .unwrap()
            .timestamp_opt(0, 0)
            .unwrap(),
        from: String::new(),
        to: String::new(),
        subject: String::new(),
        body: String::new(),
    };

    let (header, body) = match text.find("\r\n\r\n") {
        Some(ix) => (&text[..ix], &text[ix + 4..]),
        None => match text.find("\n\n") {
            Some(ix) => (&text[..ix], &text[ix + 2..]),
            None => (text, ""),
        },
    };
    parsed.body = body.to_owned();

    for line in header.lines() {
        let (name, value) = match line.find(':') {
            Some(ix) => (&line[..ix], line[ix + 1..].trim()),
            None => continue,
        };
        match name.to_ascii_lowercase().as_str() {
            "message-id" => {
                parsed.id = Some(
                    value
                        .trim_start_matches('<')
                        .trim_end_matches('>')
                        .to_owned(),
                )
            }
            "date" => {
                if let Ok(date) = DateTime::parse_from_rfc2822(value) {
                    parsed.date = date;
                }
            }
            "from" => parsed.from = value.to_owned(),
            "to" | "cc" | "bcc" => {
                parsed.to.push_str(value);
                parsed.to.push('\n');
            }
            "subject" => parsed.subject = value.to_owned(),
            _ => (),
        }
    }

    parsed
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Open,
    Close,
    Word { text: String, quoted: bool },
}

fn tokenise(query: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut chars = query.chars().peekable();
    while let Some(&ch) = chars.peek() {
        if ch.is_whitespace() {
            chars.next();
        } else if '(' == ch {
            chars.next();
            tokens.push(Token::Open);
        } else if ')' == ch {
            chars.next();
            tokens.push(Token::Close);
        } else {
            let mut text = String::new();
            let mut quoted = false;
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || '(' == ch || ')' == ch {
                    break;
                }
                chars.next();
                if '"' != ch {
                    text.push(ch);
                    continue;
                }

                quoted = true;
                loop {
                    match chars.next() {
                        None => {
                            return Err(Error::Store(format!(
                                "unterminated phrase in {}",
                                query
                            )))
                        }
                        Some('"') => {
                            if Some(&'"') != chars.peek() {
                                break;
                            }
                            chars.next();
                            text.push('"');
                        }
                        Some(c) => text.push(c),
                    }
                }
            }
            tokens.push(Token::Word { text, quoted });
        }
    }
    Ok(tokens)
}

#[derive(Clone, Debug)]
enum Expr {
    Term(String),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

fn parse_query(query: &str) -> Result<Expr, Error> {
    let tokens = tokenise(query)?;
    let mut pos = 0;
    let expr = parse_or(&tokens, &mut pos)?;
    if pos != tokens.len() {
        return Err(Error::Store(format!("trailing garbage in {}", query)));
    }
    Ok(expr)
}

fn is_op(token: Option<&Token>, op: &str) -> bool {
    match token {
        Some(&Token::Word {
            ref text,
            quoted: false,
        }) => text == op,
        _ => false,
    }
}

fn parse_or(tokens: &[Token], pos: &mut usize) -> Result<Expr, Error> {
    let mut parts = vec![parse_and(tokens, pos)?];
    while is_op(tokens.get(*pos), "or") {
        *pos += 1;
        parts.push(parse_and(tokens, pos)?);
    }
    Ok(if 1 == parts.len() {
        parts.remove(0)
    } else {
        Expr::Or(parts)
    })
}

fn parse_and(tokens: &[Token], pos: &mut usize) -> Result<Expr, Error> {
    let mut parts = vec![parse_unary(tokens, pos)?];
    loop {
        match tokens.get(*pos) {
            None | Some(&Token::Close) => break,
            t if is_op(t, "or") => break,
            t if is_op(t, "and") => *pos += 1,
            _ => (),
        }
        parts.push(parse_unary(tokens, pos)?);
    }
    Ok(if 1 == parts.len() {
        parts.remove(0)
    } else {
        Expr::And(parts)
    })
}

fn parse_unary(tokens: &[Token], pos: &mut usize) -> Result<Expr, Error> {
    match tokens.get(*pos) {
        t if is_op(t, "not") => {
            *pos += 1;
            Ok(Expr::Not(Box::new(parse_unary(tokens, pos)?)))
        }
        Some(&Token::Open) => {
            *pos += 1;
            let inner = parse_or(tokens, pos)?;
            if Some(&Token::Close) != tokens.get(*pos) {
                return Err(Error::Store("unbalanced parentheses".to_owned()));
            }
            *pos += 1;
            Ok(inner)
        }
        Some(&Token::Word { ref text, .. }) => {
            *pos += 1;
            Ok(Expr::Term(text.clone()))
        }
        _ => Err(Error::Store("unexpected end of query".to_owned())),
    }
}

impl Expr {
    fn matches(&self, store: &MemoryStore, id: &str, entry: &Entry) -> bool {
        match *self {
            Expr::Not(ref sub) => !sub.matches(store, id, entry),
            Expr::And(ref subs) => {
                subs.iter().all(|s| s.matches(store, id, entry))
            }
            Expr::Or(ref subs) => {
                subs.iter().any(|s| s.matches(store, id, entry))
            }
            Expr::Term(ref term) => term_matches(term, store, id, entry),
        }
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn term_matches(
    term: &str,
    store: &MemoryStore,
    id: &str,
    entry: &Entry,
) -> bool {
    if "*" == term {
        return true;
    }

    let (prefix, value) = match term.find(':') {
        Some(ix) => (&term[..ix], &term[ix + 1..]),
        None => ("", term),
    };
    match prefix {
        "tag" => entry.tags.contains(value),
        "id" => id == value,
        "folder" => entry
            .paths
            .iter()
            .any(|p| store.folder_of(p).as_deref() == Some(value)),
        "date" => {
            let mut bounds = value.splitn(2, "..");
            let parse = |s: Option<&str>| {
                s.filter(|s| !s.is_empty())
                    .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
            };
            let start = parse(bounds.next());
            let end = parse(bounds.next());
            let day = entry.date.naive_local().date();
            start.map_or(true, |s| day >= s) && end.map_or(true, |e| day <= e)
        }
        "from" => contains(&entry.from, value),
        "to" => contains(&entry.to, value),
        "subject" => contains(&entry.subject, value),
        "body" => contains(&entry.body, value),
        _ => {
            contains(&entry.from, term)
                || contains(&entry.to, term)
                || contains(&entry.subject, term)
                || contains(&entry.body, term)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn ids(store: &MemoryStore, query: &str) -> Vec<String> {
        store
            .open(OpenMode::ReadOnly)
            .unwrap()
            .query(query)
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect()
    }

    fn msg(subject: &str, date: &str) -> String {
        format!(
            "From: Carol <carol@example.com>\r\nSubject: {}\r\n\
             Message-ID: <{}@x>\r\nDate: {}\r\n\r\nText \"quoted\"\r\n",
            subject, subject, date
        )
    }

    #[test]
    fn query_language() {
        let store = MemoryStore::new();
        store.deliver(
            "",
            "new",
            &msg("a", "Mon, 6 Jan 2020 10:00:00 +0000"),
            "",
        );
        store.deliver(
            "Archive",
            "cur",
            &msg("b", "Tue, 7 Jan 2020 10:00:00 +0000"),
            "FS",
        );

        assert_eq!(vec!["a@x", "b@x"], ids(&store, "*"));
        assert_eq!(vec!["a@x"], ids(&store, "tag:unread"));
        assert_eq!(vec!["b@x"], ids(&store, "not tag:unread"));
        assert_eq!(vec!["b@x"], ids(&store, "(tag:inbox) and (tag:flagged)"));
        assert_eq!(vec!["b@x"], ids(&store, "folder:Archive"));
        assert_eq!(vec!["a@x"], ids(&store, "folder:\"\""));
        assert_eq!(vec!["b@x"], ids(&store, "date:2020-01-07.."));
        assert_eq!(vec!["a@x"], ids(&store, "date:..2020-01-06"));
        assert_eq!(vec!["a@x", "b@x"], ids(&store, "from:\"carol\""));
        assert_eq!(vec!["a@x"], ids(&store, "subject:a or tag:nx"));
        assert_eq!(vec!["a@x", "b@x"], ids(&store, "\"text \"\"quoted\"\"\""));
        assert_eq!(vec!["b@x"], ids(&store, "id:b@x tag:inbox"));
        assert!(store
            .open(OpenMode::ReadOnly)
            .unwrap()
            .query("(tag:inbox")
            .is_err());
    }

    #[test]
    fn writes_advance_freshness() {
        let store = MemoryStore::new();
        let before = store.freshness().unwrap();
        let id = store.deliver(
            "",
            "new",
            &msg("a", "Mon, 6 Jan 2020 10:00:00 +0000"),
            "",
        );
        let after = store.freshness().unwrap();
        assert!(after > before);

        let mut session = store.open(OpenMode::ReadOnly).unwrap();
        assert!(session.add_tag(&id, "x").is_err());
        drop(session);

        let mut session = store.open(OpenMode::ReadWrite).unwrap();
        session.add_tag(&id, "flagged").unwrap();
        session.remove_message(Path::new("/nx")).unwrap_err();
        let path = session.tags_to_maildir_flags(&id).unwrap();
        assert!(path.to_str().unwrap().ends_with("cur/1.memory:2,F"));
        drop(session);
        assert!(store.freshness().unwrap() > after);
    }
}
