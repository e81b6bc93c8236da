// src/annotation/placement.rs

/// Gap kept between the popup and the viewport edges, and between the popup
/// and the cursor when it sits above it.
pub const POPUP_MARGIN: f64 = 5.0;
/// Distance below the cursor when the popup has to flip downwards.
pub const BELOW_CURSOR_OFFSET: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Visible window in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scroll_x: f64,
    pub scroll_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn right(&self) -> f64 {
        self.scroll_x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.scroll_y + self.height
    }
}

/// Top-left corner of the popup in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub left: f64,
    pub top: f64,
}

impl Placement {
    pub fn to_style(&self) -> String {
        format!("left: {}px; top: {}px;", self.left, self.top)
    }
}

/// Place the popup above-right of the cursor, flipping below it when the top
/// edge would clip, then clamp into the scrolled viewport.
///
/// When the popup is larger than the viewport the top-left margin wins.
pub fn place_popup(cursor: Point, popup: Size, viewport: Viewport) -> Placement {
    let mut top = cursor.y - popup.height - POPUP_MARGIN;
    let mut left = cursor.x + POPUP_MARGIN;

    if top < viewport.scroll_y {
        top = cursor.y + BELOW_CURSOR_OFFSET;
    }

    if left + popup.width > viewport.right() {
        left = viewport.right() - popup.width - POPUP_MARGIN;
    }
    if left < viewport.scroll_x {
        left = viewport.scroll_x + POPUP_MARGIN;
    }

    if top + popup.height > viewport.bottom() {
        top = viewport.bottom() - popup.height - POPUP_MARGIN;
    }
    if top < viewport.scroll_y {
        top = viewport.scroll_y + POPUP_MARGIN;
    }

    Placement { left, top }
}
