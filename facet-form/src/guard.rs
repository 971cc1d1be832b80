use alloc::string::{String, ToString};
use std::collections::HashSet;

use facet_core::{ConstTypeId, Shape};

use crate::{BindErrorKind, KeyPath};

/// Tracks the frames open on the current descent so self-referential types
/// can't make a bind loop.
///
/// The binder only descends where form keys exist, so a finite form bounds
/// the walk on its own; the guard additionally caps depth and refuses to
/// reopen a `(type, prefix)` pair that is already open.
#[derive(Debug)]
pub struct RecursionGuard {
    open: HashSet<(ConstTypeId, String)>,
    depth: usize,
    max_depth: usize,
}

impl RecursionGuard {
    /// A guard allowing at most `max_depth` nested frames.
    pub fn new(max_depth: usize) -> Self {
        Self {
            open: HashSet::new(),
            depth: 0,
            max_depth,
        }
    }

    /// Open a frame for `shape` at `prefix`.
    ///
    /// Every successful `enter` must be paired with a [`leave`](Self::leave).
    pub fn enter(&mut self, shape: &'static Shape, prefix: &KeyPath) -> Result<(), BindErrorKind> {
        if self.depth >= self.max_depth {
            return Err(BindErrorKind::RecursionLimit {
                depth: self.max_depth,
            });
        }
        if !self.open.insert((shape.id, prefix.to_string())) {
            return Err(BindErrorKind::Cycle {
                type_identifier: shape.type_identifier,
            });
        }
        self.depth += 1;
        tracing::debug!(depth = self.depth, "enter {shape} at `{prefix}`");
        Ok(())
    }

    /// Close the frame for `shape` at `prefix`.
    pub fn leave(&mut self, shape: &'static Shape, prefix: &KeyPath) {
        if self.open.remove(&(shape.id, prefix.to_string())) {
            self.depth -= 1;
            tracing::debug!(depth = self.depth, "leave {shape} at `{prefix}`");
        }
    }

    /// Number of frames currently open.
    pub fn depth(&self) -> usize {
        self.depth
    }
}
