/*
 * error.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Fermaglio.
 *
 * Fermaglio is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Fermaglio is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Fermaglio.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Errors from resolution, embedding and message building.

use std::io;
use std::path::PathBuf;

/// Fieldless discriminant of [`EmailError`], for matching on the failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidReference,
    MalformedReference,
    NotFound,
    NameConflict,
    BuildAlreadyFinalized,
    InvalidMessage,
    Io,
    Config,
}

/// Errors surfaced by resolvers, the embedding registry and the message builder.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// Empty or absent name, logical name or reference. Never subject to leniency.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// Reference that cannot be parsed as a URL or path, or names an unsupported scheme.
    #[error("malformed reference {reference:?}: {reason}")]
    MalformedReference { reference: String, reason: String },

    /// Syntactically valid reference that could not be located or fetched.
    #[error("cannot resolve {location}")]
    NotFound {
        location: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Logical name already bound to a different source.
    #[error("embedded name {name:?} is already bound to {existing}, not {requested}")]
    NameConflict {
        name: String,
        existing: String,
        requested: String,
    },

    /// build() called on a message that has already been built.
    #[error("message has already been built")]
    BuildAlreadyFinalized,

    /// Message cannot be built as composed (missing sender, no recipient).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("resolver configuration: {0}")]
    Config(String),
}

impl EmailError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmailError::InvalidReference(_) => ErrorKind::InvalidReference,
            EmailError::MalformedReference { .. } => ErrorKind::MalformedReference,
            EmailError::NotFound { .. } => ErrorKind::NotFound,
            EmailError::NameConflict { .. } => ErrorKind::NameConflict,
            EmailError::BuildAlreadyFinalized => ErrorKind::BuildAlreadyFinalized,
            EmailError::InvalidMessage(_) => ErrorKind::InvalidMessage,
            EmailError::Io { .. } => ErrorKind::Io,
            EmailError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn invalid(what: impl Into<String>) -> Self {
        EmailError::InvalidReference(what.into())
    }

    pub(crate) fn malformed(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        EmailError::MalformedReference {
            reference: reference.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(location: impl Into<String>) -> Self {
        EmailError::NotFound {
            location: location.into(),
            source: None,
        }
    }

    pub(crate) fn not_found_caused_by<E>(location: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        EmailError::NotFound {
            location: location.into(),
            source: Some(Box::new(cause)),
        }
    }
}

pub type Result<T> = std::result::Result<T, EmailError>;
