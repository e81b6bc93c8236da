// src/annotation/mod.rs
//
// Text-selection annotation: a popup controller that turns a selection inside
// the results panel into an inline mark element carrying a comment.

pub mod controller;
pub mod dom;
pub mod placement;
// Arena stand-in for the browser DOM, exercised by the host tests.
#[cfg(test)]
pub mod tree;

use std::fmt;

/// Class carried by every manual annotation mark.
pub const MARK_CLASS: &str = "teacher-manual-annotation";
/// Attribute set once a mark's comment has been rendered inline.
pub const FLATTENED_ATTR: &str = "data-flattened";
/// Class of the visible note inserted by the flatten pass.
pub const EMBED_CLASS: &str = "manual-comment-embed";

/// What the surface needs to build a mark element.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkSpec {
    pub tag: String,
    pub class: String,
    pub comment: String,
}

impl MarkSpec {
    pub fn for_comment(comment: &str) -> Self {
        Self {
            tag: "span".to_string(),
            class: MARK_CLASS.to_string(),
            comment: comment.to_string(),
        }
    }
}

/// Text of the inline note the flatten pass inserts after a mark.
pub fn embed_text(comment: &str) -> String {
    format!(" [Manual Annotation: {}]", comment)
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationError {
    /// The range no longer points at live content.
    InvalidRange(String),
    /// The host tree refused the mutation.
    Mutation(String),
}

impl fmt::Display for AnnotationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationError::InvalidRange(msg) => write!(f, "invalid range: {}", msg),
            AnnotationError::Mutation(msg) => write!(f, "mutation failed: {}", msg),
        }
    }
}

impl std::error::Error for AnnotationError {}

/// Snapshot of the host's active selection at the moment it is read.
#[derive(Debug, Clone)]
pub struct SelectionSnapshot<R> {
    pub range: R,
    pub collapsed: bool,
    /// Both ends of the selection lie inside the results panel.
    pub inside_panel: bool,
}

/// Range mutation over some tree-content model.
///
/// `remove_and_capture` must detach the range's content and report where it
/// was; `insert_fragment_wrapped` puts it back inside a fresh mark element.
/// The controller never touches the host tree any other way.
pub trait AnnotationSurface {
    type Range: Clone;
    type Position;
    type Fragment;
    type Node;

    /// The first range of the active selection, cloned, or `None` when
    /// nothing is selected.
    fn current_selection(&self) -> Option<SelectionSnapshot<Self::Range>>;

    fn remove_and_capture(
        &mut self,
        range: &Self::Range,
    ) -> Result<(Self::Fragment, Self::Position), AnnotationError>;

    fn insert_fragment_wrapped(
        &mut self,
        at: Self::Position,
        fragment: Self::Fragment,
        mark: &MarkSpec,
    ) -> Result<Self::Node, AnnotationError>;

    /// True when the range intersects an existing annotation mark.
    fn overlaps_mark(&self, range: &Self::Range) -> bool;

    fn clear_selection(&mut self);

    /// Render each mark's comment as visible inline text, once per mark.
    fn flatten_marks(&mut self) -> Result<usize, AnnotationError>;
}
