// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Deterministic batch identifiers.
//!
//! A [`BatchIdentifier`] is derived from a (mesh, material) pair with Szudzik's
//! pairing function, computed in 64 bits and folded to 32. The fold is the
//! identity while both ids stay below 2^16; past that, distinct pairs can fold
//! to the same value, which the registry reports as a collision instead of
//! silently merging two batches.

use crate::render_lane::error::BatchError;
use ahash::AHashMap;
use std::fmt;
use vesper_core::asset::{MaterialId, MeshId};

/// Identifies every batch drawing one (mesh, material) pair, across all passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchIdentifier(pub u32);

impl fmt::Display for BatchIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl BatchIdentifier {
    /// Computes the identifier of a pair. Two live pairs may only share a
    /// value if the registry rejects the second one.
    pub fn compute(mesh: MeshId, material: MaterialId) -> Self {
        let a = u64::from(mesh.0);
        let b = u64::from(material.0);
        let paired = if a >= b { a * a + a + b } else { b * b + a };
        Self((paired ^ (paired >> 32)) as u32)
    }
}

#[derive(Debug, Clone, Copy)]
struct LiveIdentifier {
    mesh: MeshId,
    material: MaterialId,
    references: u32,
}

/// The set of batch identifiers currently in use, with reference counts.
///
/// Batch identifiers live in their own namespace; nothing else in the engine
/// allocates from this registry.
#[derive(Debug, Default)]
pub struct BatchIdentifierRegistry {
    live: AHashMap<BatchIdentifier, LiveIdentifier>,
}

impl BatchIdentifierRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the identifier of the pair and takes a reference to it.
    ///
    /// # Errors
    ///
    /// [`BatchError::IdentifierCollision`] if the computed value is held by a
    /// different live pair.
    pub fn acquire(
        &mut self,
        mesh: MeshId,
        material: MaterialId,
    ) -> Result<BatchIdentifier, BatchError> {
        let identifier = BatchIdentifier::compute(mesh, material);
        match self.live.get_mut(&identifier) {
            Some(live) if live.mesh == mesh && live.material == material => {
                live.references += 1;
            }
            Some(live) => {
                log::error!(
                    "Batch identifier {identifier} for ({mesh:?}, {material:?}) collides with live pair ({:?}, {:?})",
                    live.mesh,
                    live.material
                );
                return Err(BatchError::IdentifierCollision {
                    identifier,
                    mesh,
                    material,
                    held_mesh: live.mesh,
                    held_material: live.material,
                });
            }
            None => {
                self.live.insert(
                    identifier,
                    LiveIdentifier {
                        mesh,
                        material,
                        references: 1,
                    },
                );
            }
        }
        Ok(identifier)
    }

    /// The identifier of the pair if it is live, without taking a reference.
    pub fn lookup(&self, mesh: MeshId, material: MaterialId) -> Option<BatchIdentifier> {
        let identifier = BatchIdentifier::compute(mesh, material);
        self.live
            .get(&identifier)
            .filter(|live| live.mesh == mesh && live.material == material)
            .map(|_| identifier)
    }

    /// Drops one reference. Returns `true` if this freed the identifier.
    pub fn release(&mut self, identifier: BatchIdentifier) -> Result<bool, BatchError> {
        let Some(live) = self.live.get_mut(&identifier) else {
            log::error!("Released batch identifier {identifier} which is not live");
            return Err(BatchError::UnknownIdentifier(identifier));
        };
        live.references -= 1;
        if live.references == 0 {
            self.live.remove(&identifier);
            return Ok(true);
        }
        Ok(false)
    }

    /// The number of references held on an identifier, zero if it is free.
    pub fn references(&self, identifier: BatchIdentifier) -> u32 {
        self.live.get(&identifier).map_or(0, |live| live.references)
    }

    /// Number of live identifiers.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Returns `true` if no identifier is live.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}
