// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use thiserror::Error;

/// Error kinds defined by section 7 of the spec.
///
/// `CycleDetected` is deliberately absent: it is non-fatal (the node simply
/// enters the non-rooted set and is reattached, see `tree::materialize`) and
/// is only ever logged, never returned.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeCrdtError {
    /// A remote operation referred to the reserved root id as its
    /// `entity_id`, which is never a legal child.
    #[error("invalid operation: {0}")]
    InvalidOp(String),

    /// A structural edit (`add_child_to_parent`, `rename`, `remove_edge`)
    /// targeted the reserved root id as the child being moved/removed.
    #[error("root mutation rejected: {0}")]
    RootMutation(String),
}
