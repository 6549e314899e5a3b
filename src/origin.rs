// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

/// Tags whether an `Operation` reaching `OpStore::apply` originated from this
/// peer (`Local`) or arrived over the wire (`Remote`).
///
/// `UndoRedo` only records `Local` writes (section 4.3); `Tree` rebuilds on
/// both (section 4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// produced by this peer via `OpStore::set`/`OpStore::delete`.
    Local,
    /// received from another peer via `OpStore::apply`.
    Remote,
}
