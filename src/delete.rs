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

//! Cascade and orphan deletion.

use ahash::AHashSet;

use crate::entity::EntityId;
use crate::weave::Weave;

/// Transitive closure of `depends`, not including `x` itself unless it is
/// reachable again through a cycle.
fn depends_closure(w: &Weave, x: EntityId) -> Vec<EntityId> {
    let mut visited: AHashSet<EntityId> = AHashSet::new();
    let mut stack = vec![x];
    let mut order = Vec::new();
    while let Some(cur) = stack.pop() {
        for d in w.direct_dependents(cur) {
            if visited.insert(d) {
                order.push(d);
                stack.push(d);
            }
        }
    }
    order
}

/// Frees `h` and transitively every live entity that depends on it, writing
/// Nil back into the caller's handle. A no-op (beyond nilling the handle) if
/// `h` was already dead.
pub fn delete_cascade(w: &mut Weave, handle: &mut EntityId) {
    let h = *handle;
    if w.is_valid(h) {
        // depends_closure discovers shallow dependents first (direct
        // dependents of `h` before their own dependents); reverse it so
        // deepest dependents free first, then `h` last.
        let mut to_free = depends_closure(w, h);
        to_free.reverse();
        to_free.push(h);
        for e in to_free {
            w.free_entity(e);
        }
    }
    *handle = Weave::nil();
}

/// Frees `h` only if no other live entity references it as source or
/// target. Returns `true` and nils the handle on success; otherwise leaves
/// the handle untouched and returns `false`.
pub fn delete_orphan(w: &mut Weave, handle: &mut EntityId) -> bool {
    let h = *handle;
    if !w.is_valid(h) {
        return false;
    }
    if w.direct_dependents(h).next().is_some() {
        return false;
    }
    w.free_entity(h);
    *handle = Weave::nil();
    true
}
