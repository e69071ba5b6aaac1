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

//! Directional traversal queries. Pure with respect to Weave state: none of
//! these mutate.

use ahash::AHashSet;

use crate::entity::{EntityId, EntityKind};
use crate::weave::Weave;

/// Entities in `ids` that are live and of kind `kind`, deduplicated and
/// sorted by creation order — matches `spec.md` §4.4's ordering rule.
fn sorted_unique_of_kind(w: &Weave, ids: impl Iterator<Item = EntityId>, kind: EntityKind) -> Vec<EntityId> {
    let set: AHashSet<EntityId> = ids.filter(|&id| w.kind_of(id) == Some(kind)).collect();
    let mut v: Vec<EntityId> = set.into_iter().collect();
    v.sort_by_key(|&id| w.order_of(id));
    v
}

fn referencing_as_source(w: &Weave, e: EntityId) -> impl Iterator<Item = EntityId> + '_ {
    w.as_source.get(&e).into_iter().flatten().copied()
}

fn referencing_as_target(w: &Weave, e: EntityId) -> impl Iterator<Item = EntityId> + '_ {
    w.as_target.get(&e).into_iter().flatten().copied()
}

/// Every live Arrow with `source ∈ S` or `target ∈ S`.
pub fn arrows(w: &Weave, s: &[EntityId]) -> Vec<EntityId> {
    let mut out = Vec::new();
    for &e in s {
        let ids = referencing_as_source(w, e).chain(referencing_as_target(w, e));
        out.extend(sorted_unique_of_kind(w, ids, EntityKind::Arrow));
    }
    out
}

/// Every live Arrow with `target ∈ S`.
pub fn arrows_in(w: &Weave, s: &[EntityId]) -> Vec<EntityId> {
    let mut out = Vec::new();
    for &e in s {
        out.extend(sorted_unique_of_kind(w, referencing_as_target(w, e), EntityKind::Arrow));
    }
    out
}

/// Every live Arrow with `source ∈ S`.
pub fn arrows_out(w: &Weave, s: &[EntityId]) -> Vec<EntityId> {
    let mut out = Vec::new();
    for &e in s {
        out.extend(sorted_unique_of_kind(w, referencing_as_source(w, e), EntityKind::Arrow));
    }
    out
}

/// Every live Mark with `target ∈ S`.
pub fn marks(w: &Weave, s: &[EntityId]) -> Vec<EntityId> {
    let mut out = Vec::new();
    for &e in s {
        out.extend(sorted_unique_of_kind(w, referencing_as_target(w, e), EntityKind::Mark));
    }
    out
}

/// Every live Tether with `source ∈ S`.
pub fn tethers(w: &Weave, s: &[EntityId]) -> Vec<EntityId> {
    let mut out = Vec::new();
    for &e in s {
        out.extend(sorted_unique_of_kind(w, referencing_as_source(w, e), EntityKind::Tether));
    }
    out
}

/// For each Arrow/Tether `a ∈ S`, its `source`.
pub fn to_source(w: &Weave, s: &[EntityId]) -> Vec<EntityId> {
    s.iter()
        .filter(|&&a| matches!(w.kind_of(a), Some(EntityKind::Arrow) | Some(EntityKind::Tether)))
        .map(|&a| w.source_of(a))
        .collect()
}

/// For each Arrow/Mark `a ∈ S`, its `target`.
pub fn to_target(w: &Weave, s: &[EntityId]) -> Vec<EntityId> {
    s.iter()
        .filter(|&&a| matches!(w.kind_of(a), Some(EntityKind::Arrow) | Some(EntityKind::Mark)))
        .map(|&a| w.target_of(a))
        .collect()
}

/// `depends⁺(S)`: the transitive closure of entities depending (via source
/// or target) on anything in `S`, sorted by creation order.
pub fn deps(w: &Weave, s: &[EntityId]) -> Vec<EntityId> {
    let mut visited: AHashSet<EntityId> = AHashSet::new();
    let mut stack: Vec<EntityId> = s.to_vec();
    while let Some(cur) = stack.pop() {
        for d in w.direct_dependents(cur) {
            if visited.insert(d) {
                stack.push(d);
            }
        }
    }
    let mut out: Vec<EntityId> = visited.into_iter().collect();
    out.sort_by_key(|&id| w.order_of(id));
    out
}

/// One-hop successor by Arrow: `ToTarget(ArrowsOut(x))`.
pub fn next(w: &Weave, x: EntityId) -> Vec<EntityId> {
    to_target(w, &arrows_out(w, &[x]))
}

/// Batched `Next`.
pub fn next_n(w: &Weave, s: &[EntityId]) -> Vec<EntityId> {
    to_target(w, &arrows_out(w, s))
}

/// One-hop predecessor by Arrow: `ToSource(ArrowsIn(x))`.
pub fn prev(w: &Weave, x: EntityId) -> Vec<EntityId> {
    to_source(w, &arrows_in(w, &[x]))
}

/// Batched `Prev`.
pub fn prev_n(w: &Weave, s: &[EntityId]) -> Vec<EntityId> {
    to_source(w, &arrows_in(w, s))
}

/// Follows Parent-tagged Arrows upward: for each incoming Arrow `a` on `x`
/// that `Parent`/`Lift` marked hierarchical, yields `source(a)`.
pub fn up(w: &Weave, x: EntityId) -> Vec<EntityId> {
    arrows_in(w, &[x])
        .into_iter()
        .filter(|a| w.hierarchy_edges.contains(a))
        .map(|a| w.source_of(a))
        .collect()
}

/// Batched `Up`.
pub fn up_n(w: &Weave, s: &[EntityId]) -> Vec<EntityId> {
    let mut out = Vec::new();
    for &x in s {
        out.extend(up(w, x));
    }
    out
}

/// Inverse of `Up`: hierarchical children of `x`.
pub fn down(w: &Weave, x: EntityId) -> Vec<EntityId> {
    arrows_out(w, &[x])
        .into_iter()
        .filter(|a| w.hierarchy_edges.contains(a))
        .map(|a| w.target_of(a))
        .collect()
}

/// Batched `Down`.
pub fn down_n(w: &Weave, s: &[EntityId]) -> Vec<EntityId> {
    let mut out = Vec::new();
    for &x in s {
        out.extend(down(w, x));
    }
    out
}
