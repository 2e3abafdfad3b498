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

//! Process-wide logger setup.
//!
//! Either log4rs, if the configuration names a log4rs file, or syslog on the
//! mail facility. There is no way to combine the two since log4rs has no
//! maintained syslog appender.

use std::path::PathBuf;

use log::LevelFilter;

use crate::support::error::Error;
use crate::support::system_config::LoggingConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogTarget {
    /// A log4rs configuration file.
    File(PathBuf),
    Syslog(LevelFilter),
}

impl LogTarget {
    pub fn select(config: &LoggingConfig) -> Self {
        match config.config_file {
            Some(ref path) => LogTarget::File(path.clone()),
            None if config.debug => LogTarget::Syslog(LevelFilter::Debug),
            None => LogTarget::Syslog(LevelFilter::Info),
        }
    }
}

/// Install the global logger.
///
/// This can only succeed once per process.
pub fn init(config: &LoggingConfig) -> Result<(), Error> {
    match LogTarget::select(config) {
        LogTarget::File(path) => {
            log4rs::init_file(&path, log4rs::file::Deserializers::default())
                .map_err(|e| {
                    Error::Config(format!(
                        "failed to load {}: {}",
                        path.display(),
                        e
                    ))
                })
        }

        LogTarget::Syslog(level) => {
            let formatter = syslog::Formatter3164 {
                facility: syslog::Facility::LOG_MAIL,
                hostname: None,
                process: env!("CARGO_PKG_NAME").to_owned(),
                pid: nix::unistd::getpid().as_raw(),
            };

            let logger = syslog::unix(formatter).map_err(|e| {
                Error::Config(format!("failed to connect to syslog: {}", e))
            })?;
            log::set_boxed_logger(Box::new(syslog::BasicLogger::new(logger)))
                .map(|()| log::set_max_level(level))
                .map_err(|e| Error::Config(e.to_string()))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn select_target() {
        assert_eq!(
            LogTarget::Syslog(LevelFilter::Info),
            LogTarget::select(&LoggingConfig::default())
        );
        assert_eq!(
            LogTarget::Syslog(LevelFilter::Debug),
            LogTarget::select(&LoggingConfig {
                config_file: None,
                debug: true,
            })
        );
        assert_eq!(
            LogTarget::File(PathBuf::from("/etc/log4rs.toml")),
            LogTarget::select(&LoggingConfig {
                config_file: Some(PathBuf::from("/etc/log4rs.toml")),
                debug: true,
            })
        );
    }
}
