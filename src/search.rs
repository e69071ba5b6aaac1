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

//! Injective subgraph matching over hoist-set members.
//!
//! A pattern and a target are each a hoist subject's member set. The
//! vertices of the induced subgraph are the hoist-set members themselves
//! (of any kind). Two kinds of structural link contribute edges:
//!
//! - an Arrow edge `(u, v)`, for any live Arrow with `source = u, target = v`
//!   both lying in the member set, whether or not the Arrow is itself a
//!   member;
//! - a Mark/Tether edge `(u, v)`, only when the Mark/Tether entity itself is
//!   a member: a Mark member `m` with `target(m) = v` contributes `(m, v)`,
//!   a Tether member `t` with `source(t) = u` contributes `(u, t)`.
//!
//! Matching is Ullmann-style backtracking with an MRV (fewest remaining
//! candidates) variable-ordering heuristic, entity-kind-restricted domains,
//! and incremental consistency checking against the merged edge relation.

use ahash::{AHashMap, AHashSet};

use crate::entity::{EntityId, EntityKind};
use crate::weave::Weave;

/// An injective mapping from pattern vertices to target vertices, listed in
/// pattern-vertex enumeration order (by arity descending, then creation
/// order ascending).
pub type Match = Vec<EntityId>;

struct SubGraph {
    /// Members in a fixed enumeration order: arity (in-degree + out-degree
    /// + marks-in + tethers-in, within the member set) descending, then
    /// creation order ascending.
    vertices: Vec<EntityId>,
    kind: AHashMap<EntityId, EntityKind>,
    /// Merged structural links: Arrow `(source, target)` pairs plus
    /// Mark/Tether single-endpoint pairs, as described above.
    edges: AHashSet<(EntityId, EntityId)>,
    out_deg: AHashMap<EntityId, usize>,
    in_deg: AHashMap<EntityId, usize>,
    marks_in: AHashMap<EntityId, usize>,
    tethers_in: AHashMap<EntityId, usize>,
}

fn build_subgraph(w: &Weave, subject: EntityId) -> Option<SubGraph> {
    let members = w.hoist_members(subject)?;
    let member_set: AHashSet<EntityId> = members.iter().copied().collect();

    let mut kind: AHashMap<EntityId, EntityKind> = AHashMap::new();
    let mut edges = AHashSet::new();
    let mut out_deg: AHashMap<EntityId, usize> = AHashMap::new();
    let mut in_deg: AHashMap<EntityId, usize> = AHashMap::new();
    let mut marks_in: AHashMap<EntityId, usize> = AHashMap::new();
    let mut tethers_in: AHashMap<EntityId, usize> = AHashMap::new();
    for &m in &members {
        out_deg.insert(m, 0);
        in_deg.insert(m, 0);
        marks_in.insert(m, 0);
        tethers_in.insert(m, 0);
        if let Some(k) = w.kind_of(m) {
            kind.insert(m, k);
        }
    }

    for &m in &members {
        match kind.get(&m) {
            Some(EntityKind::Arrow) => {
                let s = w.source(m);
                let t = w.target(m);
                if member_set.contains(&s) && member_set.contains(&t) && edges.insert((s, t)) {
                    *out_deg.entry(s).or_insert(0) += 1;
                    *in_deg.entry(t).or_insert(0) += 1;
                }
            }
            Some(EntityKind::Mark) => {
                let t = w.target(m);
                if member_set.contains(&t) && edges.insert((m, t)) {
                    *marks_in.entry(t).or_insert(0) += 1;
                }
            }
            Some(EntityKind::Tether) => {
                let s = w.source(m);
                if member_set.contains(&s) && edges.insert((s, m)) {
                    *tethers_in.entry(s).or_insert(0) += 1;
                }
            }
            _ => {}
        }
    }
    // Arrows whose endpoints are members don't need the entity itself to be
    // a member; scan independently of the per-member-kind pass above.
    for &m in &members {
        for a in crate::moves::arrows_out(w, &[m]) {
            if kind.get(&a) == Some(&EntityKind::Arrow) {
                continue; // already covered when `a` itself is a member
            }
            let t = w.target(a);
            if member_set.contains(&t) && edges.insert((m, t)) {
                *out_deg.entry(m).or_insert(0) += 1;
                *in_deg.entry(t).or_insert(0) += 1;
            }
        }
    }

    let mut vertices: Vec<EntityId> = members;
    vertices.sort_by(|&a, &b| {
        let arity_a = out_deg[&a] + in_deg[&a] + marks_in[&a] + tethers_in[&a];
        let arity_b = out_deg[&b] + in_deg[&b] + marks_in[&b] + tethers_in[&b];
        arity_b.cmp(&arity_a).then_with(|| w.order_of(a).cmp(&w.order_of(b)))
    });

    Some(SubGraph { vertices, kind, edges, out_deg, in_deg, marks_in, tethers_in })
}

/// Candidate target vertices for each pattern vertex: same entity kind, and
/// arity at least the pattern vertex's arity in each of the four dimensions
/// `spec.md` §4.6 names (in-arrows, out-arrows, marks-in, tethers-in) — a
/// necessary condition for an injective structure-preserving map.
fn initial_domains(pattern: &SubGraph, target: &SubGraph) -> Vec<Vec<EntityId>> {
    pattern
        .vertices
        .iter()
        .map(|&p| {
            let p_kind = pattern.kind.get(&p).copied();
            let p_out = pattern.out_deg[&p];
            let p_in = pattern.in_deg[&p];
            let p_marks = pattern.marks_in[&p];
            let p_tethers = pattern.tethers_in[&p];
            target
                .vertices
                .iter()
                .copied()
                .filter(|t| {
                    target.kind.get(t).copied() == p_kind
                        && target.out_deg[t] >= p_out
                        && target.in_deg[t] >= p_in
                        && target.marks_in[t] >= p_marks
                        && target.tethers_in[t] >= p_tethers
                })
                .collect()
        })
        .collect()
}

/// Checks that assigning `p -> t` keeps every already-assigned pattern edge
/// consistent with the target's merged edge relation, in both directions.
fn arrow_consistent(pattern: &SubGraph, target: &SubGraph, assignment: &[Option<EntityId>], p: usize, t: EntityId) -> bool {
    for (i, slot) in assignment.iter().enumerate() {
        let Some(u) = slot else { continue };
        let pi = pattern.vertices[i];
        let pp = pattern.vertices[p];
        if pattern.edges.contains(&(pp, pi)) && !target.edges.contains(&(t, *u)) {
            return false;
        }
        if pattern.edges.contains(&(pi, pp)) && !target.edges.contains(&(*u, t)) {
            return false;
        }
    }
    true
}

fn pick_next(domains: &[Vec<EntityId>], assignment: &[Option<EntityId>]) -> Option<usize> {
    assignment
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_none())
        .min_by_key(|&(i, _)| domains[i].len())
        .map(|(i, _)| i)
}

fn backtrack(
    pattern: &SubGraph,
    target: &SubGraph,
    domains: &mut [Vec<EntityId>],
    assignment: &mut Vec<Option<EntityId>>,
    used: &mut AHashSet<EntityId>,
    out: &mut Vec<Match>,
    find_all: bool,
) {
    if !find_all && !out.is_empty() {
        return;
    }
    let Some(p) = pick_next(domains, assignment) else {
        out.push(assignment.iter().map(|a| a.unwrap()).collect());
        return;
    };

    for t in domains[p].clone() {
        if used.contains(&t) {
            continue;
        }
        if !arrow_consistent(pattern, target, assignment, p, t) {
            continue;
        }
        assignment[p] = Some(t);
        used.insert(t);
        backtrack(pattern, target, domains, assignment, used, out, find_all);
        used.remove(&t);
        assignment[p] = None;
        if !find_all && !out.is_empty() {
            return;
        }
    }
}

fn run(w: &Weave, pattern_subject: EntityId, target_subject: EntityId, find_all: bool) -> Vec<Match> {
    let (Some(pattern), Some(target)) = (build_subgraph(w, pattern_subject), build_subgraph(w, target_subject)) else {
        return Vec::new();
    };
    if pattern.vertices.is_empty() {
        return Vec::new();
    }
    let mut domains = initial_domains(&pattern, &target);
    if domains.iter().any(|d| d.is_empty()) {
        return Vec::new();
    }
    let mut assignment = vec![None; pattern.vertices.len()];
    let mut used = AHashSet::new();
    let mut out = Vec::new();
    backtrack(&pattern, &target, &mut domains, &mut assignment, &mut used, &mut out, find_all);
    out
}

impl Weave {
    /// The first injective structure-preserving map from `pattern`'s
    /// hoisted members into `target`'s hoisted members, if one exists.
    pub fn find_one(&self, pattern: EntityId, target: EntityId) -> Option<Match> {
        run(self, pattern, target, false).into_iter().next()
    }

    /// Every injective structure-preserving map from `pattern`'s hoisted
    /// members into `target`'s hoisted members.
    pub fn find_all(&self, pattern: EntityId, target: EntityId) -> Vec<Match> {
        run(self, pattern, target, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s4_pattern_matches_isomorphic_target() {
        let mut w = Weave::new();

        // Pattern: a -> b
        let pa = w.new_knot();
        let pb = w.new_knot();
        w.new_arrow(pa, pb);
        let pattern = w.new_knot();
        w.hoist(pattern, &[pa, pb]);

        // Target: x -> y -> z, so a->b embeds twice: (x,y) and (y,z).
        let tx = w.new_knot();
        let ty = w.new_knot();
        let tz = w.new_knot();
        w.new_arrow(tx, ty);
        w.new_arrow(ty, tz);
        let target = w.new_knot();
        w.hoist(target, &[tx, ty, tz]);

        let one = w.find_one(pattern, target);
        assert!(one.is_some());

        let all = w.find_all(pattern, target);
        assert_eq!(all.len(), 2);
        for m in &all {
            assert_eq!(m.len(), 2);
            assert_ne!(m[0], m[1]);
        }
    }

    #[test]
    fn no_match_when_target_too_sparse() {
        let mut w = Weave::new();
        let pa = w.new_knot();
        let pb = w.new_knot();
        let pc = w.new_knot();
        w.new_arrow(pa, pb);
        w.new_arrow(pb, pc);
        let pattern = w.new_knot();
        w.hoist(pattern, &[pa, pb, pc]);

        let tx = w.new_knot();
        let ty = w.new_knot();
        w.new_arrow(tx, ty);
        let target = w.new_knot();
        w.hoist(target, &[tx, ty]);

        assert!(w.find_one(pattern, target).is_none());
        assert!(w.find_all(pattern, target).is_empty());
    }

    #[test]
    fn unrelated_members_still_match_with_no_edges() {
        let mut w = Weave::new();
        let pa = w.new_knot();
        let pattern = w.new_knot();
        w.hoist(pattern, &[pa]);

        let ta = w.new_knot();
        let tb = w.new_knot();
        let target = w.new_knot();
        w.hoist(target, &[ta, tb]);

        let all = w.find_all(pattern, target);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn non_hoisted_subject_yields_no_matches() {
        let w = Weave::new();
        let a = Weave::new().new_knot();
        assert!(w.find_one(a, a).is_none());
    }

    #[test]
    fn kind_mismatch_excludes_candidate_even_with_matching_arity() {
        // A lone Mark member in the pattern must never map to a Knot in the
        // target, even though a zero-arity Knot would otherwise satisfy the
        // arity-only domain check.
        let mut w = Weave::new();
        let anchor = w.new_knot();
        let pm = w.new_mark(anchor);
        let pattern = w.new_knot();
        w.hoist(pattern, &[pm]);

        let tk = w.new_knot();
        let target = w.new_knot();
        w.hoist(target, &[tk]);

        assert!(w.find_one(pattern, target).is_none());
    }

    #[test]
    fn mark_structure_is_preserved_across_the_match() {
        // Pattern: Mark `pm` annotating Knot `pu`, both hoisted.
        let mut w = Weave::new();
        let pu = w.new_knot();
        let pm = w.new_mark(pu);
        let pattern = w.new_knot();
        w.hoist(pattern, &[pu, pm]);

        // Target has a matching Mark/Knot pair plus an unrelated Knot, so the
        // engine must pick out the annotated one specifically.
        let tu = w.new_knot();
        let tm = w.new_mark(tu);
        let decoy = w.new_knot();
        let target = w.new_knot();
        w.hoist(target, &[tu, tm, decoy]);

        let m = w.find_one(pattern, target).expect("expected a match");
        // Whichever enumeration order was used, the Mark must map to `tm`
        // and the Knot to `tu`, never to the unrelated `decoy`.
        assert!(m.contains(&tm));
        assert!(m.contains(&tu));
        assert!(!m.contains(&decoy));
    }

    #[test]
    fn mark_targeting_a_non_member_gives_no_marks_in_credit() {
        // Pattern: Mark annotates `pu`, so `pu` needs marks-in >= 1. Target
        // has a Mark, but it targets an entity outside the hoisted set, so
        // no target member accrues any marks-in credit and no match exists.
        let mut w = Weave::new();
        let pu = w.new_knot();
        let pm = w.new_mark(pu);
        let pattern = w.new_knot();
        w.hoist(pattern, &[pu, pm]);

        let outsider = w.new_knot();
        let tu = w.new_knot();
        let tm = w.new_mark(outsider);
        let target = w.new_knot();
        w.hoist(target, &[tu, tm]);

        assert!(w.find_one(pattern, target).is_none());
    }
}
