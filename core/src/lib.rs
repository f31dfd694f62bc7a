/*
 * lib.rs
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

//! Fermaglio core: HTML email composition with inline resources.
//!
//! Resources referenced from an HTML body are fetched through a [`ResourceResolver`], registered
//! once per logical name in an [`EmbeddingRegistry`] under a generated Content-ID, and written as
//! `multipart/related` parts when the [`HtmlEmail`] is built.

pub mod config;
pub mod embedding;
pub mod error;
pub mod message;
pub mod mime;
pub mod resolver;

pub use config::{load_resolver_config, parse_resolver_config, ResolverConfig, ResolverSpec};
pub use embedding::{
    CidGenerator, DataSource, EmbeddingEntry, EmbeddingRegistry, RandomCidGenerator, ResourceReference, CID_LENGTH,
};
pub use error::{EmailError, ErrorKind, Result};
pub use message::{Attachment, BuildState, BuiltMessage, HtmlEmail};
pub use resolver::{CompositeResolver, FileResolver, ResolvedContent, ResourceResolver, UrlResolver};
