// src/annotation/controller.rs
use super::placement::{place_popup, Placement, Point, Size, Viewport};
use super::{AnnotationError, AnnotationSurface, MarkSpec};

/// At most one range is ever pending.
#[derive(Debug)]
pub enum PopupState<R> {
    Idle,
    PopupOpen { range: R, placement: Placement },
}

/// Where a mouse-down landed, relative to the popup and the results panel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerTarget {
    Popup,
    Panel,
    Elsewhere,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MouseDownAction {
    Ignore,
    Dismissed,
    /// Look at the selection again once the browser has updated it.
    RecheckDeferred,
}

#[derive(Debug)]
pub enum ConfirmOutcome<N> {
    Applied(N),
    /// No pending range or an empty comment.
    Discarded,
    RejectedOverlap,
    Failed(AnnotationError),
}

pub struct AnnotationController<S: AnnotationSurface> {
    surface: S,
    state: PopupState<S::Range>,
}

impl<S: AnnotationSurface> AnnotationController<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            state: PopupState::Idle,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[cfg(test)]
    pub fn state(&self) -> &PopupState<S::Range> {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, PopupState::PopupOpen { .. })
    }

    pub fn placement(&self) -> Option<Placement> {
        match &self.state {
            PopupState::PopupOpen { placement, .. } => Some(*placement),
            PopupState::Idle => None,
        }
    }

    /// Capture the selection and open the popup at a position computed from
    /// the already-measured popup size. Returns the placement when it opened.
    pub fn on_mouse_up(&mut self, cursor: Point, popup: Size, viewport: Viewport) -> Option<Placement> {
        let snapshot = self.surface.current_selection()?;
        if snapshot.collapsed || !snapshot.inside_panel {
            return None;
        }
        let placement = place_popup(cursor, popup, viewport);
        self.state = PopupState::PopupOpen {
            range: snapshot.range,
            placement,
        };
        Some(placement)
    }

    /// Wrap the pending range in a mark carrying `comment`. Every path ends
    /// in `Idle`.
    pub fn confirm(&mut self, comment: &str) -> ConfirmOutcome<S::Node> {
        let range = match std::mem::replace(&mut self.state, PopupState::Idle) {
            PopupState::PopupOpen { range, .. } => range,
            PopupState::Idle => return ConfirmOutcome::Discarded,
        };
        let comment = comment.trim();
        if comment.is_empty() {
            return ConfirmOutcome::Discarded;
        }

        if self.surface.overlaps_mark(&range) {
            log::warn!("Selection overlaps an existing annotation; not applied");
            self.surface.clear_selection();
            return ConfirmOutcome::RejectedOverlap;
        }

        let result = self.wrap(&range, comment);
        self.surface.clear_selection();
        match result {
            Ok(node) => ConfirmOutcome::Applied(node),
            Err(e) => {
                log::error!("Error applying annotation: {}", e);
                ConfirmOutcome::Failed(e)
            }
        }
    }

    pub fn dismiss(&mut self) {
        self.state = PopupState::Idle;
    }

    pub fn on_mouse_down(&mut self, target: PointerTarget) -> MouseDownAction {
        if !self.is_open() {
            return MouseDownAction::Ignore;
        }
        match target {
            PointerTarget::Popup => MouseDownAction::Ignore,
            PointerTarget::Elsewhere => {
                self.dismiss();
                MouseDownAction::Dismissed
            }
            PointerTarget::Panel => MouseDownAction::RecheckDeferred,
        }
    }

    /// Follow-up to `RecheckDeferred`: a collapsed or missing selection
    /// closes the popup. Returns true if it did.
    pub fn recheck_selection(&mut self) -> bool {
        if !self.is_open() {
            return false;
        }
        let collapsed = self
            .surface
            .current_selection()
            .map(|s| s.collapsed)
            .unwrap_or(true);
        if collapsed {
            self.dismiss();
        }
        collapsed
    }

    fn wrap(&mut self, range: &S::Range, comment: &str) -> Result<S::Node, AnnotationError> {
        let (fragment, at) = self.surface.remove_and_capture(range)?;
        self.surface
            .insert_fragment_wrapped(at, fragment, &MarkSpec::for_comment(comment))
    }
}
