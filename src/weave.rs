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

//! Weave: the entity store and its referential invariants.

use ahash::{AHashMap, AHashSet};
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::data::{DataSchema, DataValue};
use crate::entity::{EntityId, EntityKind, EntitySlot};

/// Most entities are referenced by only a handful of others; inline storage
/// avoids a heap allocation for the common case.
pub(crate) type RefList = SmallVec<[EntityId; 4]>;

/// The top-level owning container of all entities, schemas, and components.
pub struct Weave {
    pub(crate) entities: SlotMap<EntityId, EntitySlot>,
    pub(crate) next_order: u64,

    /// Entities that reference the key as their `source` field.
    pub(crate) as_source: AHashMap<EntityId, RefList>,
    /// Entities that reference the key as their `target` field.
    pub(crate) as_target: AHashMap<EntityId, RefList>,

    // Data registry (see data.rs).
    pub(crate) schemas: Vec<DataSchema>,
    pub(crate) schema_index: AHashMap<String, usize>,
    pub(crate) components: AHashMap<(EntityId, usize), Vec<DataValue>>,
    pub(crate) entity_components: AHashMap<EntityId, AHashSet<usize>>,

    // Shape bookkeeping (see shape.rs).
    pub(crate) hoist_members: AHashMap<EntityId, Vec<EntityId>>,
    pub(crate) hoist_owner: AHashMap<EntityId, EntityId>,
    pub(crate) hierarchy_edges: AHashSet<EntityId>,
    pub(crate) hierarchy_marks: AHashMap<EntityId, EntityId>,
}

impl Default for Weave {
    fn default() -> Self {
        Self::new()
    }
}

impl Weave {
    /// Create a new, empty Weave.
    pub fn new() -> Self {
        Self {
            entities: SlotMap::with_key(),
            next_order: 0,
            as_source: AHashMap::new(),
            as_target: AHashMap::new(),
            schemas: Vec::new(),
            schema_index: AHashMap::new(),
            components: AHashMap::new(),
            entity_components: AHashMap::new(),
            hoist_members: AHashMap::new(),
            hoist_owner: AHashMap::new(),
            hierarchy_edges: AHashSet::new(),
            hierarchy_marks: AHashMap::new(),
        }
    }

    /// The distinguished Nil handle: valid everywhere, refers to no entity.
    pub fn nil() -> EntityId {
        EntityId::null()
    }

    /// True iff `h` is the Nil handle.
    pub fn is_nil(&self, h: EntityId) -> bool {
        h.is_null()
    }

    /// True iff `h` names a live entity.
    pub fn is_valid(&self, h: EntityId) -> bool {
        self.entities.contains_key(h)
    }

    /// True iff `h` is live-or-Nil, the domain every endpoint must live in.
    pub(crate) fn live_or_nil(&self, h: EntityId) -> bool {
        self.is_nil(h) || self.is_valid(h)
    }

    pub(crate) fn kind_of(&self, h: EntityId) -> Option<EntityKind> {
        self.entities.get(h).map(|slot| slot.kind)
    }

    pub(crate) fn order_of(&self, h: EntityId) -> u64 {
        self.entities.get(h).map(|slot| slot.order).unwrap_or(u64::MAX)
    }

    pub(crate) fn source_of(&self, h: EntityId) -> EntityId {
        self.entities.get(h).map(|slot| slot.source).unwrap_or_else(Self::nil)
    }

    pub(crate) fn target_of(&self, h: EntityId) -> EntityId {
        self.entities.get(h).map(|slot| slot.target).unwrap_or_else(Self::nil)
    }

    pub fn is_knot(&self, h: EntityId) -> bool {
        self.kind_of(h) == Some(EntityKind::Knot)
    }

    pub fn is_arrow(&self, h: EntityId) -> bool {
        self.kind_of(h) == Some(EntityKind::Arrow)
    }

    pub fn is_mark(&self, h: EntityId) -> bool {
        self.kind_of(h) == Some(EntityKind::Mark)
    }

    pub fn is_tether(&self, h: EntityId) -> bool {
        self.kind_of(h) == Some(EntityKind::Tether)
    }

    /// Source endpoint of an Arrow/Tether, or Nil for anything else / Nil input.
    pub fn source(&self, h: EntityId) -> EntityId {
        match self.kind_of(h) {
            Some(EntityKind::Arrow) | Some(EntityKind::Tether) => self.source_of(h),
            _ => Self::nil(),
        }
    }

    /// Target endpoint of an Arrow/Mark, or Nil for anything else / Nil input.
    pub fn target(&self, h: EntityId) -> EntityId {
        match self.kind_of(h) {
            Some(EntityKind::Arrow) | Some(EntityKind::Mark) => self.target_of(h),
            _ => Self::nil(),
        }
    }

    fn alloc(&mut self, kind: EntityKind, source: EntityId, target: EntityId) -> EntityId {
        let order = self.next_order;
        self.next_order += 1;
        let id = self.entities.insert(EntitySlot { kind, source, target, order });
        if !self.is_nil(source) {
            self.as_source.entry(source).or_default().push(id);
        }
        if !self.is_nil(target) {
            self.as_target.entry(target).or_default().push(id);
        }
        id
    }

    pub fn new_knot(&mut self) -> EntityId {
        self.alloc(EntityKind::Knot, Self::nil(), Self::nil())
    }

    /// Creates a directed edge. Requires `source`/`target` to each be live or
    /// Nil; an out-of-domain endpoint is a contract violation and, per the
    /// error design, degrades to returning Nil rather than creating a
    /// dangling edge.
    pub fn new_arrow(&mut self, source: EntityId, target: EntityId) -> EntityId {
        debug_assert!(
            self.live_or_nil(source) && self.live_or_nil(target),
            "new_arrow: endpoint must be live or Nil"
        );
        if !self.live_or_nil(source) || !self.live_or_nil(target) {
            #[cfg(feature = "profiling")]
            tracing::warn!(?source, ?target, "new_arrow: endpoint not live-or-nil, returning Nil");
            return Self::nil();
        }
        self.alloc(EntityKind::Arrow, source, target)
    }

    pub fn new_mark(&mut self, target: EntityId) -> EntityId {
        debug_assert!(self.live_or_nil(target), "new_mark: target must be live or Nil");
        if !self.live_or_nil(target) {
            #[cfg(feature = "profiling")]
            tracing::warn!(?target, "new_mark: target not live-or-nil, returning Nil");
            return Self::nil();
        }
        self.alloc(EntityKind::Mark, Self::nil(), target)
    }

    pub fn new_tether(&mut self, source: EntityId) -> EntityId {
        debug_assert!(self.live_or_nil(source), "new_tether: source must be live or Nil");
        if !self.live_or_nil(source) {
            #[cfg(feature = "profiling")]
            tracing::warn!(?source, "new_tether: source not live-or-nil, returning Nil");
            return Self::nil();
        }
        self.alloc(EntityKind::Tether, source, Self::nil())
    }

    fn unregister_source(&mut self, h: EntityId, old_source: EntityId) {
        if let Some(v) = self.as_source.get_mut(&old_source) {
            if let Some(pos) = v.iter().position(|&x| x == h) {
                v.swap_remove(pos);
            }
        }
    }

    fn unregister_target(&mut self, h: EntityId, old_target: EntityId) {
        if let Some(v) = self.as_target.get_mut(&old_target) {
            if let Some(pos) = v.iter().position(|&x| x == h) {
                v.swap_remove(pos);
            }
        }
    }

    /// Defined iff `kind(h) ∈ {Arrow, Tether}`.
    pub fn change_source(&mut self, h: EntityId, new_source: EntityId) -> bool {
        let kind = self.kind_of(h);
        debug_assert!(
            matches!(kind, Some(EntityKind::Arrow) | Some(EntityKind::Tether)),
            "change_source: only defined for Arrow/Tether"
        );
        if !matches!(kind, Some(EntityKind::Arrow) | Some(EntityKind::Tether)) {
            return false;
        }
        if !self.live_or_nil(new_source) {
            #[cfg(feature = "profiling")]
            tracing::warn!(?new_source, "change_source: new source not live-or-nil");
            return false;
        }
        let old_source = self.source_of(h);
        self.unregister_source(h, old_source);
        if let Some(slot) = self.entities.get_mut(h) {
            slot.source = new_source;
        }
        if !self.is_nil(new_source) {
            self.as_source.entry(new_source).or_default().push(h);
        }
        true
    }

    /// Defined iff `kind(h) ∈ {Arrow, Mark}`.
    pub fn change_target(&mut self, h: EntityId, new_target: EntityId) -> bool {
        let kind = self.kind_of(h);
        debug_assert!(
            matches!(kind, Some(EntityKind::Arrow) | Some(EntityKind::Mark)),
            "change_target: only defined for Arrow/Mark"
        );
        if !matches!(kind, Some(EntityKind::Arrow) | Some(EntityKind::Mark)) {
            return false;
        }
        if !self.live_or_nil(new_target) {
            #[cfg(feature = "profiling")]
            tracing::warn!(?new_target, "change_target: new target not live-or-nil");
            return false;
        }
        let old_target = self.target_of(h);
        self.unregister_target(h, old_target);
        if let Some(slot) = self.entities.get_mut(h) {
            slot.target = new_target;
        }
        if !self.is_nil(new_target) {
            self.as_target.entry(new_target).or_default().push(h);
        }
        true
    }

    /// Defined iff `kind(h) = Arrow`.
    pub fn change_ends(&mut self, h: EntityId, new_source: EntityId, new_target: EntityId) -> bool {
        debug_assert!(self.is_arrow(h), "change_ends: only defined for Arrow");
        if !self.is_arrow(h) {
            return false;
        }
        if !self.live_or_nil(new_source) || !self.live_or_nil(new_target) {
            return false;
        }
        self.change_source(h, new_source) && self.change_target(h, new_target)
    }

    /// Direct dependents of `x`: live entities whose `source` or `target`
    /// equals `x`. This is `depends(x)` from `spec.md` §4.2, not its
    /// transitive closure.
    pub(crate) fn direct_dependents(&self, x: EntityId) -> impl Iterator<Item = EntityId> + '_ {
        self.as_source
            .get(&x)
            .into_iter()
            .flatten()
            .chain(self.as_target.get(&x).into_iter().flatten())
            .copied()
    }

    /// Frees a single slot and all bookkeeping attached to it. Does not
    /// cascade; callers (delete.rs) compute the closure first.
    pub(crate) fn free_entity(&mut self, e: EntityId) {
        let Some(slot) = self.entities.remove(e) else { return };
        self.unregister_source(e, slot.source);
        self.unregister_target(e, slot.target);
        self.as_source.remove(&e);
        self.as_target.remove(&e);

        if let Some(schema_ids) = self.entity_components.remove(&e) {
            for schema_id in schema_ids {
                self.components.remove(&(e, schema_id));
            }
        }

        if let Some(subject) = self.hoist_owner.remove(&e) {
            if let Some(members) = self.hoist_members.get_mut(&subject) {
                members.retain(|&o| o != e);
            }
        }
        if let Some(members) = self.hoist_members.remove(&e) {
            for o in members {
                self.hoist_owner.remove(&o);
            }
        }

        self.hierarchy_edges.remove(&e);
        self.hierarchy_marks.remove(&e);
        self.hierarchy_marks.retain(|_, mark| *mark != e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_is_distinguishable_and_universally_valid() {
        let w = Weave::new();
        assert!(w.is_nil(Weave::nil()));
        assert!(!w.is_valid(Weave::nil()));
    }

    #[test]
    fn kind_predicates_partition_live_entities() {
        let mut w = Weave::new();
        let k = w.new_knot();
        let a = w.new_arrow(k, k);
        let m = w.new_mark(k);
        let t = w.new_tether(k);

        assert!(w.is_knot(k) && !w.is_arrow(k) && !w.is_mark(k) && !w.is_tether(k));
        assert!(!w.is_knot(a) && w.is_arrow(a) && !w.is_mark(a) && !w.is_tether(a));
        assert!(!w.is_knot(m) && !w.is_arrow(m) && w.is_mark(m) && !w.is_tether(m));
        assert!(!w.is_knot(t) && !w.is_arrow(t) && !w.is_mark(t) && w.is_tether(t));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic)]
    fn new_arrow_rejects_dead_endpoint() {
        let mut w = Weave::new();
        let k = w.new_knot();
        let dangling = w.new_knot();
        w.free_entity(dangling);
        // `dangling` no longer names a live entity and isn't Nil: a contract
        // violation. Debug builds assert; release builds return Nil.
        let a = w.new_arrow(k, dangling);
        assert!(w.is_nil(a));
    }

    #[test]
    fn handle_reuse_preserves_distinguishability() {
        let mut w = Weave::new();
        let first = w.new_knot();
        w.free_entity(first);
        let second = w.new_knot();
        assert_ne!(first, second);
        assert!(!w.is_valid(first));
        assert!(w.is_valid(second));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic)]
    fn change_source_rejects_wrong_kind() {
        let mut w = Weave::new();
        let k = w.new_knot();
        assert!(!w.change_source(k, k));
    }

    #[test]
    fn s1_lifecycle_and_kind_predicates() {
        let mut w = Weave::new();
        let a = w.new_knot();
        let b = w.new_knot();
        let mut c = w.new_arrow(a, b);

        assert!(w.is_arrow(c));
        assert!(!w.is_mark(c));

        w.change_source(c, c);
        assert!(w.is_arrow(c));
        assert!(!w.is_mark(c));

        crate::delete::delete_cascade(&mut w, &mut c);
        assert!(w.is_nil(c));
    }
}
