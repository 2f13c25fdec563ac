//! Internal text helpers shared by normalization and rendering.

pub(crate) mod text;
