// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # StructSync Engine
//!
//! Synchronizes a portable structural object graph with the element
//! database of a structural analysis application.
//!
//! A receive flattens the graph into conversion records, converts each
//! record into host elements, and deletes the elements of objects that were
//! received last time but are now gone. A send builds a graph from host
//! elements, with display meshes for frames and areas.
//!
//! ## Quick Start
//!
//! ```rust
//! use structsync_engine::{
//!     CancellationToken, MemoryDatabase, RunReport, Snapshot, SyncConfig, SyncSession,
//! };
//! use structsync_model::{GraphObject, LinearMember, Member, Node, ObjectBody, ObjectGraph};
//!
//! let mut graph = ObjectGraph::new();
//! let a = graph.add(GraphObject::new(ObjectBody::Node(Node::at(0.0, 0.0, 0.0))));
//! let b = graph.add(GraphObject::new(ObjectBody::Node(Node::at(6.0, 0.0, 0.0))));
//! let beam = graph.add(
//!     GraphObject::new(ObjectBody::LinearMember(LinearMember::between(a, b)))
//!         .with_application_id("beam-1"),
//! );
//! graph.add_root(
//!     GraphObject::new(ObjectBody::Collection { name: "model".into() })
//!         .with_member("elements", Member::List(vec![beam])),
//! );
//!
//! let mut session = SyncSession::new(MemoryDatabase::default(), SyncConfig::default());
//! let outcome = session
//!     .receive(&graph, &Snapshot::default(), &CancellationToken::new(), &mut RunReport::default())
//!     .unwrap();
//! assert_eq!(outcome.summary.created, 1);
//! ```

pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod flatten;
pub mod host;
pub mod progress;
pub mod reconcile;
pub mod record;
pub mod session;
pub mod tables;

pub use config::{ReceiveMode, SyncConfig};
pub use convert::{ConversionOutcome, Converter, CsiConverter, FinalizeConversion, NativeObject};
pub use dispatch::ConversionDispatcher;
pub use error::{ConversionError, HostError, HostResult, Result};
pub use flatten::{GraphFlattener, ObjectStore};
pub use host::{
    Definition, EditableTable, ElementDatabase, ElementKind, ElementProperty, EndReleases, HostCapabilities,
    LoadAssignment, MemoryDatabase, PropertyKey, TableApplyReport, DEFAULT_SECTION,
};
pub use progress::{CancellationToken, ProgressSink, RunReport, TracingSink};
pub use reconcile::ReconciliationEngine;
pub use record::{ConversionRecord, ConversionStatus, NativeArtifact, RunSummary, Snapshot};
pub use session::{ReceiveOutcome, SendOutcome, SyncSession};
pub use tables::{ProgramVersion, AREA_CONNECTIVITY_TABLE, FIELD_NAME_OVERRIDES, FRAME_CONNECTIVITY_TABLE};
