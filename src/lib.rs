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

//! An IMAP backend which presents a notmuch-indexed maildir as a set of
//! UID-addressed mailboxes.
//!
//! The protocol layer (framing, command dispatch, TLS) and the search index
//! itself live elsewhere. This crate owns the translation between the two:
//! stable UIDs for content-addressed messages, flags for tags, and search
//! criteria for index queries.

#[cfg(test)]
macro_rules! assert_matches {
    ($expected:pat, $actual:expr) => {
        match $actual {
            $expected => (),
            unexpected => panic!(
                "Expected {} matches {}, got {:?}",
                stringify!($expected),
                stringify!($actual),
                unexpected
            ),
        }
    };
}

pub mod account;
pub mod support;

pub use account::account::{Account, Backend};
pub use account::mailbox::Mailbox;
pub use account::store::{OpenMode, Store, StoreSession, StoredMessage};
pub use support::error::Error;
pub use support::system_config::SystemConfig;

#[cfg(test)]
static INIT_TEST_LOG: std::sync::Once = std::sync::Once::new();

#[cfg(test)]
fn init_test_log() {
    use log4rs::append::console::{ConsoleAppender, Target};
    use log4rs::config::{Appender, Config, Root};
    use log4rs::encode::pattern::PatternEncoder;

    INIT_TEST_LOG.call_once(|| {
        let stderr = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(Box::new(PatternEncoder::new(
                "{d(%H:%M:%S%.3f)} [{l}][{t}] {m}{n}",
            )))
            .build();
        let config = Config::builder()
            .appender(Appender::builder().build("stderr", Box::new(stderr)))
            .build(
                Root::builder()
                    .appender("stderr")
                    .build(log::LevelFilter::Debug),
            )
            .unwrap();
        log4rs::init_config(config).unwrap();
    })
}
