// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Load patterns and element loads.

use serde::{Deserialize, Serialize};

use crate::keys::ObjectKey;

/// Global direction of an applied load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoadDirection {
    X,
    Y,
    Z,
    #[default]
    Gravity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LoadPatternKind {
    #[default]
    Dead,
    SuperDead,
    Live,
    Wind,
    Seismic,
    Snow,
    Other,
}

/// A named load pattern that element loads are assigned to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPattern {
    pub name: String,
    #[serde(default)]
    pub kind: LoadPatternKind,
    #[serde(default)]
    pub self_weight_multiplier: f64,
}

/// Concentrated force on nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLoad {
    pub pattern: String,
    pub nodes: Vec<ObjectKey>,
    #[serde(default)]
    pub direction: LoadDirection,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BeamLoadKind {
    #[default]
    Uniform,
    Point,
}

/// Load along linear members.
///
/// Uniform loads use `values[0]` over the whole length. Point loads pair
/// each value with a relative position in `positions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamLoad {
    pub pattern: String,
    pub elements: Vec<ObjectKey>,
    #[serde(default)]
    pub kind: BeamLoadKind,
    #[serde(default)]
    pub direction: LoadDirection,
    pub values: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<f64>,
}

/// Uniform pressure over surface members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceLoad {
    pub pattern: String,
    pub elements: Vec<ObjectKey>,
    #[serde(default)]
    pub direction: LoadDirection,
    pub value: f64,
}
