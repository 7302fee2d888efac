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

//! An arena of backend objects addressed by small integer handles.

use std::collections::HashMap;
use vesper_core::renderer::{ResourceError, ResourceKind};

/// Owns every live object of one kind.
///
/// Handles are never reused, so a stale handle reliably fails with
/// [`ResourceError::NotFound`] instead of aliasing a newer object.
#[derive(Debug)]
pub(crate) struct ResourceTable<T> {
    kind: ResourceKind,
    next_id: usize,
    entries: HashMap<usize, T>,
}

impl<T> ResourceTable<T> {
    pub(crate) fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            next_id: 0,
            entries: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, value: T) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, value);
        id
    }

    pub(crate) fn get(&self, id: usize) -> Result<&T, ResourceError> {
        self.entries.get(&id).ok_or(ResourceError::NotFound {
            kind: self.kind,
            id,
        })
    }

    pub(crate) fn get_mut(&mut self, id: usize) -> Result<&mut T, ResourceError> {
        let kind = self.kind;
        self.entries
            .get_mut(&id)
            .ok_or(ResourceError::NotFound { kind, id })
    }

    pub(crate) fn remove(&mut self, id: usize) -> Result<T, ResourceError> {
        self.entries.remove(&id).ok_or(ResourceError::NotFound {
            kind: self.kind,
            id,
        })
    }

    pub(crate) fn contains(&self, id: usize) -> bool {
        self.entries.contains_key(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn retain(&mut self, mut keep: impl FnMut(usize, &T) -> bool) {
        self.entries.retain(|id, value| keep(*id, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_not_reused() {
        let mut table = ResourceTable::new(ResourceKind::Buffer);
        let a = table.insert("a");
        table.remove(a).unwrap();
        let b = table.insert("b");
        assert_ne!(a, b);
        assert_eq!(
            table.get(a),
            Err(ResourceError::NotFound {
                kind: ResourceKind::Buffer,
                id: a
            })
        );
        assert_eq!(*table.get(b).unwrap(), "b");
    }

    #[test]
    fn test_retain_and_len() {
        let mut table = ResourceTable::new(ResourceKind::DescriptorSet);
        for i in 0..4 {
            table.insert(i);
        }
        table.retain(|_, value| value % 2 == 0);
        assert_eq!(table.len(), 2);
        assert!(table.contains(0));
        assert!(!table.contains(1));
    }
}
