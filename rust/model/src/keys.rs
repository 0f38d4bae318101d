// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Key type for arena-based object storage.
//!
//! Objects reference each other by key rather than by copy, so a node shared
//! by several members is stored once. Keys are generational and stay valid
//! when other objects are removed.

use slotmap::new_key_type;

new_key_type! {
    /// Key for an object in an [`ObjectGraph`](crate::ObjectGraph).
    pub struct ObjectKey;
}
