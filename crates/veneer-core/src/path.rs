#![forbid(unsafe_code)]

//! Node paths: child-index routes from a tree root.
//!
//! Patches address their target by path rather than by reference, so a patch
//! list stays a pure value that can be logged, compared, and replayed. Paths
//! are short (tree depth), so the backing store is a `SmallVec` that stays
//! on the stack for realistic trees.

use std::fmt;

use smallvec::SmallVec;

/// A route from the root to a node: the child index taken at each level.
///
/// The empty path addresses the root itself.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NodePath {
    indices: SmallVec<[u32; 8]>,
}

impl NodePath {
    /// The root path.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Whether this path addresses the root.
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.indices.is_empty()
    }

    /// Path depth (0 for the root).
    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.indices.len()
    }

    /// The child indices, root-first.
    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Extend the path by one child index, returning the new path.
    #[must_use]
    pub fn child(&self, index: u32) -> Self {
        let mut indices = self.indices.clone();
        indices.push(index);
        Self { indices }
    }

    /// The parent path and final index, or `None` for the root.
    #[must_use]
    pub fn split_last(&self) -> Option<(Self, u32)> {
        let (&last, rest) = self.indices.split_last()?;
        Some((
            Self {
                indices: SmallVec::from_slice(rest),
            },
            last,
        ))
    }
}

impl FromIterator<u32> for NodePath {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            indices: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for idx in &self.indices {
            write!(f, "/{idx}")?;
        }
        Ok(())
    }
}
