// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

//! Implements a hierarchical tree Conflict-Free Replicated Data Type.
//!
//! For usage/examples, see:
//!   demos/demo.rs
//!   tests/tree.rs
//!
//! Unlike the causal move-operation log described in "A highly-available
//! move operation for replicated trees and distributed filesystems" by
//! Martin Kleppmann, et al., this crate builds the tree from a flat,
//! per-field last-writer-wins operation store (`OpStore`): each `(child,
//! candidate_parent)` pair is one field, and `Tree` derives a single
//! rooted, acyclic tree from whichever edges currently win. `UndoRedo`
//! layers batched local undo/redo on top, and `Replica` binds one peer's
//! `OpStore`, `Tree` and `UndoRedo` together behind the root id it owns.
#![deny(missing_docs)]

mod clock;
pub use self::clock::Stamp;

mod entity_id;
pub use self::entity_id::EntityId;

mod operation;
pub use self::operation::Operation;

mod origin;
pub use self::origin::Origin;

mod error;
pub use self::error::TreeCrdtError;

mod opstore;
pub use self::opstore::{Observer, OpStore};

mod treenode;
pub use self::treenode::Node;

mod tree;
pub use self::tree::Tree;

mod undo_redo;
pub use self::undo_redo::UndoRedo;

mod replica;
pub use self::replica::Replica;
