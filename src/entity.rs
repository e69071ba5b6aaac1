// Copyright 2024 Saptak Santra
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

//! Entity identifiers and entity kinds.

use slotmap::new_key_type;

new_key_type! {
    /// Unique, generational entity handle.
    ///
    /// `EntityId::null()` is the distinguished Nil handle: valid everywhere,
    /// referring to no entity. A freed slot, once reallocated, yields a
    /// handle that compares unequal to every handle ever returned for the
    /// previous occupant.
    pub struct EntityId;
}

/// The four closed entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    /// A plain node; no endpoints.
    Knot,
    /// A directed edge with `source` and `target`.
    Arrow,
    /// A unary annotation of another entity (`target` only).
    Mark,
    /// A unary back-reference from another entity (`source` only).
    Tether,
}

/// Storage for a single live entity.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntitySlot {
    pub kind: EntityKind,
    pub source: EntityId,
    pub target: EntityId,
    /// Monotonic creation order, used to make move/search results
    /// deterministic independent of slot recycling.
    pub order: u64,
}
