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

use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::prelude::*;
use log::{error, info, warn};
use rand::{rngs::OsRng, Rng};

use super::defs::*;
use crate::account::flag_map::{merge_tags, MaildirFlags};
use crate::account::model::*;
use crate::account::store::OpenMode;
use crate::support::error::Error;
use crate::support::file_ops::IgnoreKinds;

/// How many times to pick a new file name before giving up.
const MAX_NAME_ATTEMPTS: u32 = 8;

impl Mailbox {
    /// The `APPEND` command.
    ///
    /// The message is written into this mailbox's folder. `date` becomes the
    /// internal date of the in-memory record and defaults to now; the index
    /// dates the message by its own headers once it is reloaded.
    pub fn append(
        &self,
        flags: &[Flag],
        date: Option<DateTime<FixedOffset>>,
        data: &[u8],
    ) -> Result<AppendResponse, Error> {
        let mut state = lock(&self.state);
        let flags = MaildirFlags::from_flags(flags);
        let date = date.unwrap_or_else(|| Utc::now().into());

        let path = self.deliver(flags, data, unique_name)?;
        info!("{} Appended {}", self.log_prefix, path.display());

        self.register_appended(&mut state, path.clone(), flags, date, data)
            .map_err(|e| {
                error!(
                    "{} {} was written but could not be registered: {}",
                    self.log_prefix,
                    path.display(),
                    e
                );
                e
            })
    }

    /// Write `data` into the maildir, returning the final path.
    ///
    /// `next_name` is asked for a fresh base name on every attempt.
    fn deliver(
        &self,
        flags: MaildirFlags,
        data: &[u8],
        mut next_name: impl FnMut() -> String,
    ) -> Result<PathBuf, Error> {
        let (subdir, suffix) = if flags.contains(MaildirFlags::SEEN) {
            ("cur", flags.info_suffix())
        } else if flags.is_empty() {
            ("new", String::new())
        } else {
            ("new", flags.info_suffix())
        };

        let tmp = self.folder.join("tmp");
        let dst_dir = self.folder.join(subdir);
        fs::create_dir_all(&self.folder)?;
        fs::create_dir(&tmp).ignore_already_exists()?;
        fs::create_dir(&dst_dir).ignore_already_exists()?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let name = next_name();
            let tmp_path = tmp.join(&name);
            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .mode(0o600)
                .open(&tmp_path)
            {
                Ok(f) => f,
                Err(e) if io::ErrorKind::AlreadyExists == e.kind() => continue,
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = file.write_all(data).and_then(|_| file.sync_all())
            {
                discard(&tmp_path);
                return Err(e.into());
            }

            // Linking rather than renaming never clobbers an existing file
            let dst = dst_dir.join(format!("{}{}", name, suffix));
            match fs::hard_link(&tmp_path, &dst) {
                Ok(()) => {
                    discard(&tmp_path);
                    return Ok(dst);
                }
                Err(e) if io::ErrorKind::AlreadyExists == e.kind() => {
                    discard(&tmp_path);
                    continue;
                }
                Err(e) => {
                    discard(&tmp_path);
                    return Err(e.into());
                }
            }
        }

        Err(Error::GaveUpInsertion)
    }

    fn register_appended(
        &self,
        state: &mut MailboxState,
        path: PathBuf,
        flags: MaildirFlags,
        date: DateTime<FixedOffset>,
        data: &[u8],
    ) -> Result<AppendResponse, Error> {
        let id = {
            let mut session = self.store.open(OpenMode::ReadWrite)?;
            let id = session.add_message(&path)?;
            let existing =
                session.find_message(&id)?.ok_or(Error::NxMessage)?;
            let tags =
                merge_tags(existing.tags.iter().map(String::as_str), flags);
            session.rewrite_tags(&id, &tags)?;
            id
        };

        let uid_map = self.uid_maps.get(&self.uid_map_path);
        let mut mapper = lock(&uid_map);
        let uid = mapper.find_or_add(&id)?;
        let uid_validity = mapper.uid_validity();

        if let Some(ref mut snapshot) = state.snapshot {
            snapshot.insert(Message {
                id,
                uid,
                date,
                size: data.len() as u64,
                path,
                flags,
                recent: false,
            });
        }

        mapper.flush()?;
        Ok(AppendResponse { uid_validity, uid })
    }
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).ignore_not_found() {
        warn!("Failed to remove {}: {}", path.display(), e);
    }
}

/// Generate a maildir base name, `<secs>.M<micros>P<pid>R<random>.<host>`.
fn unique_name() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    let mut buf = [0u8; 256];
    let host = nix::unistd::gethostname(&mut buf)
        .ok()
        .and_then(|h| h.to_str().ok())
        .filter(|h| !h.is_empty())
        .unwrap_or("localhost")
        .replace('/', "\\057")
        .replace(':', "\\072");

    format!(
        "{}.M{}P{}R{}.{}",
        now.as_secs(),
        now.subsec_micros(),
        nix::unistd::getpid(),
        OsRng.gen::<u64>(),
        host
    )
}
