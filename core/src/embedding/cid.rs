/*
 * cid.rs
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

//! Content-ID token generation.

use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Length of generated content identifiers.
pub const CID_LENGTH: usize = 10;

/// Produces content-id tokens for newly embedded resources.
pub trait CidGenerator: Send {
    fn next_cid(&mut self) -> String;
}

/// [`CID_LENGTH`] random characters from `[a-z0-9]`.
#[derive(Debug)]
pub struct RandomCidGenerator {
    rng: StdRng,
}

impl RandomCidGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomCidGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CidGenerator for RandomCidGenerator {
    fn next_cid(&mut self) -> String {
        (&mut self.rng)
            .sample_iter(Alphanumeric)
            .take(CID_LENGTH)
            .map(|b| (b as char).to_ascii_lowercase())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_have_fixed_length_and_alphabet() {
        let mut g = RandomCidGenerator::new();
        for _ in 0..200 {
            let cid = g.next_cid();
            assert_eq!(cid.len(), CID_LENGTH);
            assert!(cid.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()), "{}", cid);
        }
    }

    #[test]
    fn seeded_generators_repeat() {
        let mut a = RandomCidGenerator::seeded(42);
        let mut b = RandomCidGenerator::seeded(42);
        assert_eq!(a.next_cid(), b.next_cid());
        assert_ne!(a.next_cid(), RandomCidGenerator::seeded(43).next_cid());
    }
}
