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

//! Weave is an in-memory typed, labeled hyper-graph store: four entity
//! kinds (Knot, Arrow, Mark, Tether) related by `source`/`target`
//! endpoints, runtime-typed components attached to any entity, directional
//! traversal queries, compound structural edits, and injective subgraph
//! matching over hoisted member sets.
//!
//! There is no panicking or `Result`-based API surface: contract
//! violations (dead handles, wrong-kind operations) degrade to Nil/false/
//! empty in release builds, after a `debug_assert!` in debug builds. See
//! [`weave::Weave`] for the entity store itself.

mod data;
mod delete;
mod entity;
mod moves;
mod search;
mod shape;
mod weave;

pub mod prelude {
    //! Everything most callers need, in one `use`.
    pub use crate::data::{DataField, DataSchema, DataType, DataValue};
    pub use crate::delete::{delete_cascade, delete_orphan};
    pub use crate::entity::{EntityId, EntityKind};
    pub use crate::moves::{
        arrows, arrows_in, arrows_out, deps, down, down_n, marks, next, next_n, prev, prev_n, tethers, to_source,
        to_target, up, up_n,
    };
    pub use crate::search::Match;
    pub use crate::weave::Weave;
}

pub use data::{DataField, DataSchema, DataType, DataValue};
pub use delete::{delete_cascade, delete_orphan};
pub use entity::{EntityId, EntityKind};
pub use moves::{
    arrows, arrows_in, arrows_out, deps, down, down_n, marks, next, next_n, prev, prev_n, tethers, to_source,
    to_target, up, up_n,
};
pub use search::Match;
pub use weave::Weave;
