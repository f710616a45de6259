//! Integer geometry and the opaque identifiers the layout core is keyed on.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Point {
        Point { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    pub const fn new(width: i32, height: i32) -> Size {
        Size { width, height }
    }

    pub fn is_degenerate(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// An axis-aligned rectangle in screen coordinates.
///
/// Width and height may be zero or negative when gaps exceed the available
/// space; see [`Rect::is_degenerate`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Rect {
        Rect { x, y, width, height }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn max_x(&self) -> i32 {
        self.x + self.width
    }

    pub fn max_y(&self) -> i32 {
        self.y + self.height
    }

    /// Center point, rounded toward the origin.
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Shrinks the rectangle by `amount` on every edge.
    pub fn inset(&self, amount: i32) -> Rect {
        Rect::new(
            self.x + amount,
            self.y + amount,
            self.width - 2 * amount,
            self.height - 2 * amount,
        )
    }

    /// True when the rectangle has no area and must not be applied to a
    /// window.
    pub fn is_degenerate(&self) -> bool {
        self.size().is_degenerate()
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.max_x()
            && other.x < self.max_x()
            && self.y < other.max_y()
            && other.y < self.max_y()
    }

    /// A rectangle of (at most) `size`, centered within `self`.
    pub fn centered(&self, size: Size) -> Rect {
        let width = size.width.min(self.width);
        let height = size.height.min(self.height);
        Rect::new(
            self.x + (self.width - width) / 2,
            self.y + (self.height - height) / 2,
            width,
            height,
        )
    }
}

/// Identifies a window. The layout core only compares and hashes these; it
/// never owns the window itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(u64);

impl WindowId {
    pub const fn new(id: u64) -> WindowId {
        WindowId(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Identifies a workspace within an output's workspace grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkspaceId(u32);

impl WorkspaceId {
    pub const fn new(index: u32) -> WorkspaceId {
        WorkspaceId(index)
    }

    /// Row-major index of grid cell `(x, y)`.
    pub const fn from_grid(x: u32, y: u32, grid_width: u32) -> WorkspaceId {
        WorkspaceId(y * grid_width + x)
    }
}
