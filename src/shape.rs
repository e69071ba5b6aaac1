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

//! Compound structural edits layered over the entity store.

use crate::entity::EntityId;
use crate::weave::Weave;

impl Weave {
    /// For each `t ∈ targets`, creates a new Arrow `(source → t)`. Returns
    /// the created arrows, in `targets` order.
    pub fn connect(&mut self, source: EntityId, targets: &[EntityId]) -> Vec<EntityId> {
        targets.iter().map(|&t| self.new_arrow(source, t)).collect()
    }

    /// Establishes containment: for each `o ∈ objects`, creates a Mark with
    /// `target = subject` and records `o` as a member of `subject`'s hoist
    /// set. This is the representation `spec.md` §9's open question settles
    /// on — Marks, not raw Arrows (`Connect`'s placeholder use in the
    /// original's C++ facade is the bug being fixed here).
    ///
    /// Search reads hoist-set membership back via [`Weave::hoist_members`]
    /// rather than re-deriving it from `Marks`, since a Mark's only field
    /// (`target`) can't itself encode which object it was created for.
    pub fn hoist(&mut self, subject: EntityId, objects: &[EntityId]) -> Vec<EntityId> {
        let mut created = Vec::with_capacity(objects.len());
        for &o in objects {
            if !self.is_valid(o) {
                continue;
            }
            let tag = self.new_mark(subject);
            created.push(tag);
            self.hoist_members.entry(subject).or_default().push(o);
            self.hoist_owner.insert(o, subject);
        }
        created
    }

    /// The live members hoisted under `subject`, or `None` if `subject` was
    /// never used as a `Hoist` subject.
    pub fn hoist_members(&self, subject: EntityId) -> Option<Vec<EntityId>> {
        let members = self.hoist_members.get(&subject)?;
        Some(members.iter().copied().filter(|&m| self.is_valid(m)).collect())
    }

    fn tag_hierarchical(&mut self, arrow: EntityId) {
        if self.hierarchy_edges.contains(&arrow) {
            return;
        }
        let tag = self.new_mark(arrow);
        self.hierarchy_edges.insert(arrow);
        self.hierarchy_marks.insert(arrow, tag);
    }

    fn untag_hierarchical(&mut self, arrow: EntityId) {
        if !self.hierarchy_edges.remove(&arrow) {
            return;
        }
        if let Some(tag) = self.hierarchy_marks.remove(&arrow) {
            self.free_entity(tag);
        }
    }

    /// Creates a hierarchical relationship: an Arrow `(root → child)` per
    /// child, tagged so `Up`/`Down` recognize it as parenting rather than a
    /// plain Arrow. Returns the created (tagged) Arrows.
    pub fn parent(&mut self, root: EntityId, children: &[EntityId]) -> Vec<EntityId> {
        let mut created = Vec::with_capacity(children.len());
        for &child in children {
            let arrow = self.new_arrow(root, child);
            if self.is_nil(arrow) {
                continue;
            }
            self.tag_hierarchical(arrow);
            created.push(arrow);
        }
        created
    }

    /// Fan-out: every child gains both an incoming and an outgoing Arrow
    /// to/from `center`. Returns the created Arrows, `(child → center,
    /// center → child)` per child, in `children` order.
    pub fn pivot(&mut self, center: EntityId, children: &[EntityId]) -> Vec<EntityId> {
        let mut created = Vec::with_capacity(children.len() * 2);
        for &child in children {
            created.push(self.new_arrow(child, center));
            created.push(self.new_arrow(center, child));
        }
        created
    }

    /// Promotes existing Arrows to the hierarchical reading, as `Parent`
    /// would have tagged them. Non-Arrow or dead handles are skipped.
    pub fn lift(&mut self, arrows: &[EntityId]) -> usize {
        let mut count = 0;
        for &a in arrows {
            if self.is_arrow(a) {
                self.tag_hierarchical(a);
                count += 1;
            }
        }
        count
    }

    /// Demotes Arrows out of the hierarchical reading. No-op for Arrows that
    /// weren't tagged.
    pub fn lower(&mut self, arrows: &[EntityId]) -> usize {
        let mut count = 0;
        for &a in arrows {
            if self.hierarchy_edges.contains(&a) {
                self.untag_hierarchical(a);
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves;

    #[test]
    fn connect_creates_fan_out_arrows() {
        let mut w = Weave::new();
        let src = w.new_knot();
        let a = w.new_knot();
        let b = w.new_knot();
        let created = w.connect(src, &[a, b]);
        assert_eq!(created.len(), 2);
        assert_eq!(moves::next(&w, src).len(), 2);
    }

    #[test]
    fn hoist_builds_membership_visible_to_search() {
        let mut w = Weave::new();
        let subject = w.new_knot();
        let o1 = w.new_knot();
        let o2 = w.new_knot();
        w.hoist(subject, &[o1, o2]);

        let members = w.hoist_members(subject).unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.contains(&o1) && members.contains(&o2));
        // The objects themselves aren't hoisted under anything.
        assert!(w.hoist_members(o1).is_none());
    }

    #[test]
    fn hoist_membership_drops_freed_objects() {
        let mut w = Weave::new();
        let subject = w.new_knot();
        let mut o1 = w.new_knot();
        w.hoist(subject, &[o1]);
        crate::delete::delete_cascade(&mut w, &mut o1);
        assert!(w.hoist_members(subject).unwrap().is_empty());
    }

    #[test]
    fn parent_tags_arrow_so_up_and_down_see_it() {
        let mut w = Weave::new();
        let root = w.new_knot();
        let child = w.new_knot();
        w.parent(root, &[child]);

        assert_eq!(moves::down(&w, root), vec![child]);
        assert_eq!(moves::up(&w, child), vec![root]);
    }

    #[test]
    fn plain_arrow_is_not_seen_by_up_down() {
        let mut w = Weave::new();
        let a = w.new_knot();
        let b = w.new_knot();
        w.new_arrow(a, b);
        assert!(moves::down(&w, a).is_empty());
        assert!(moves::up(&w, b).is_empty());
    }

    #[test]
    fn lift_then_lower_round_trips() {
        let mut w = Weave::new();
        let a = w.new_knot();
        let b = w.new_knot();
        let edge = w.new_arrow(a, b);

        assert_eq!(w.lift(&[edge]), 1);
        assert_eq!(moves::down(&w, a), vec![b]);

        assert_eq!(w.lower(&[edge]), 1);
        assert!(moves::down(&w, a).is_empty());
        // Idempotent: lowering an already-plain arrow is a no-op.
        assert_eq!(w.lower(&[edge]), 0);
    }

    #[test]
    fn pivot_gives_each_child_both_directions() {
        let mut w = Weave::new();
        let center = w.new_knot();
        let child = w.new_knot();
        w.pivot(center, &[child]);
        assert_eq!(moves::next(&w, child), vec![center]);
        assert_eq!(moves::next(&w, center), vec![child]);
    }
}
