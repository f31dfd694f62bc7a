/*
 * mod.rs
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

//! Inline resource embedding: references, content-id generation and the per-message registry.

mod cid;
mod reference;
mod registry;

pub use cid::{CidGenerator, RandomCidGenerator, CID_LENGTH};
pub use reference::{DataSource, ResourceReference};
pub use registry::{EmbeddingEntry, EmbeddingRegistry};
