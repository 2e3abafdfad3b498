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

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::account::model::MailboxAttribute;
use crate::support::error::Error;
use crate::support::safe_name::{is_safe_name, is_safe_path};

/// Where UID tables live when `store.uid_maps` is not set, relative to the
/// store root.
pub const DEFAULT_UID_MAP_DIR: &str = ".notmuch/imap-uids";

/// The configuration for a notmuch-imap backend.
///
/// This is typically stored in a file named `notmuch-imap.toml`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SystemConfig {
    pub store: StoreConfig,

    /// TLS material for the listener. Not used by the backend itself, but
    /// carried so the whole server can share one file.
    #[serde(default)]
    pub tls: Option<TlsConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// The mailboxes every user sees, by name.
    #[serde(default)]
    pub mailboxes: BTreeMap<String, MailboxConfig>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StoreConfig {
    /// The root of the maildir hierarchy, which also contains the index.
    pub root: PathBuf,
    /// The directory holding the UID tables, one file per mailbox.
    #[serde(default)]
    pub uid_maps: Option<PathBuf>,
}

impl StoreConfig {
    pub fn uid_map_dir(&self) -> PathBuf {
        self.uid_maps
            .clone()
            .unwrap_or_else(|| self.root.join(DEFAULT_UID_MAP_DIR))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct TlsConfig {
    /// The path to the TLS private key, which must be in PEM format.
    pub private_key: PathBuf,
    /// The path to the TLS certificate chain, which must be in PEM format.
    pub certificate_chain: PathBuf,
}

#[derive(Clone, Debug, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// If set, a log4rs configuration file to use instead of syslog.
    pub config_file: Option<PathBuf>,
    /// Log at debug level when going to syslog.
    pub debug: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MailboxConfig {
    /// The index query selecting this mailbox's messages.
    pub query: String,
    /// The maildir folder, relative to the store root, that messages
    /// appended or moved to this mailbox are written into.
    ///
    /// Defaults to the mailbox name. The empty string is the store root.
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub attributes: Vec<MailboxAttribute>,
}

impl MailboxConfig {
    pub fn folder<'a>(&'a self, name: &'a str) -> &'a str {
        self.folder.as_deref().unwrap_or(name)
    }
}

impl SystemConfig {
    /// Load and validate the configuration at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        let config: SystemConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.mailboxes.is_empty() {
            return Err(Error::Config("no mailboxes defined".to_owned()));
        }

        for (name, mailbox) in &self.mailboxes {
            if !is_safe_name(name) {
                return Err(Error::Config(format!(
                    "unsafe mailbox name {:?}",
                    name
                )));
            }

            if mailbox.query.trim().is_empty() {
                return Err(Error::Config(format!(
                    "mailbox {:?} has an empty query",
                    name
                )));
            }

            let folder = mailbox.folder(name);
            if !is_safe_path(folder) {
                return Err(Error::Config(format!(
                    "mailbox {:?} has unsafe folder {:?}",
                    name, folder
                )));
            }
        }

        Ok(())
    }
}
