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
use std::sync::Arc;

use log::info;

use crate::account::mailbox::Mailbox;
use crate::account::model::*;
use crate::account::store::Store;
use crate::account::uid_map::UidMapCache;
use crate::support::error::Error;
use crate::support::system_config::SystemConfig;

/// Process-wide state shared by every session.
pub struct Backend {
    config: Arc<SystemConfig>,
    store: Arc<dyn Store>,
    uid_maps: Arc<UidMapCache>,
}

impl Backend {
    pub fn new(
        config: SystemConfig,
        store: Arc<dyn Store>,
    ) -> Result<Self, Error> {
        config.validate()?;
        Ok(Backend {
            config: Arc::new(config),
            store,
            uid_maps: Arc::new(UidMapCache::new()),
        })
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Start a session for `user`.
    ///
    /// Each session gets its own mailbox objects, and so its own snapshots;
    /// only the UID tables are shared.
    pub fn session(&self, user: &str) -> Account {
        info!("{} Session started", user);

        let uid_map_dir = self.config.store.uid_map_dir();
        let namespace = Arc::new_cyclic(|weak| Namespace {
            mailboxes: self
                .config
                .mailboxes
                .iter()
                .map(|(name, config)| {
                    let mailbox = Mailbox::new(
                        user,
                        name,
                        config,
                        Arc::clone(&self.store),
                        Arc::clone(&self.uid_maps),
                        uid_map_dir.clone(),
                        weak.clone(),
                    );
                    (name.clone(), Arc::new(mailbox))
                })
                .collect(),
        });

        Account {
            log_prefix: user.to_owned(),
            namespace,
        }
    }
}

/// The mailboxes of one session, by name.
///
/// Mailboxes hold a weak reference back to this so that `MOVE` can find
/// its destination.
pub(crate) struct Namespace {
    mailboxes: BTreeMap<String, Arc<Mailbox>>,
}

impl Namespace {
    /// Look `name` up. `INBOX` is matched case-insensitively.
    pub(crate) fn get(&self, name: &str) -> Option<&Arc<Mailbox>> {
        if name.eq_ignore_ascii_case("INBOX") {
            self.mailboxes
                .iter()
                .find(|&(k, _)| k.eq_ignore_ascii_case("INBOX"))
                .map(|(_, v)| v)
        } else {
            self.mailboxes.get(name)
        }
    }
}

/// One user's view of the configured mailboxes.
#[derive(Clone)]
pub struct Account {
    log_prefix: String,
    namespace: Arc<Namespace>,
}

impl Account {
    pub fn log_prefix(&self) -> &str {
        &self.log_prefix
    }

    /// The `LIST` command, with every pattern matching everything.
    pub fn list_mailboxes(&self) -> Vec<MailboxInfo> {
        self.namespace
            .mailboxes
            .values()
            .map(|mb| mb.info())
            .collect()
    }

    pub fn mailbox(&self, name: &str) -> Result<Arc<Mailbox>, Error> {
        self.namespace
            .get(name)
            .cloned()
            .ok_or(Error::NxMailbox)
    }

    // Mailboxes come from the configuration file, so the namespace itself is
    // read-only.

    pub fn create_mailbox(&self, _name: &str) -> Result<(), Error> {
        Err(Error::UnsupportedOperation)
    }

    pub fn delete_mailbox(&self, _name: &str) -> Result<(), Error> {
        Err(Error::UnsupportedOperation)
    }

    pub fn rename_mailbox(&self, _from: &str, _to: &str) -> Result<(), Error> {
        Err(Error::UnsupportedOperation)
    }
}
