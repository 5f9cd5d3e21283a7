//! Integer points and rectangles in window/texture pixel space.

/// A pixel coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle. Empty when either dimension is not positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// A rectangle at the origin covering `w` x `h`.
    pub const fn sized(w: i32, h: i32) -> Self {
        Self { x: 0, y: 0, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    /// One past the rightmost column.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }

    /// One past the bottom row.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    pub fn contains_point(&self, p: Point) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.right() && p.y < self.bottom()
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        !other.is_empty()
            && other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Intersection of two rectangles, `None` when it is empty.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        if self.is_empty() || other.is_empty() {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 > x && y2 > y {
            Some(Rect::new(x, y, x2 - x, y2 - y))
        } else {
            None
        }
    }

    /// Translate by `(dx, dy)`.
    pub fn offset(&self, dx: i32, dy: i32) -> Rect {
        Rect::new(self.x.saturating_add(dx), self.y.saturating_add(dy), self.w, self.h)
    }

    /// Smallest rectangle enclosing `points`.
    ///
    /// With a `clip`, points outside it are ignored. Returns `None` when no
    /// point qualifies.
    pub fn enclose_points(points: &[Point], clip: Option<&Rect>) -> Option<Rect> {
        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        for p in points {
            if let Some(clip) = clip
                && !clip.contains_point(*p)
            {
                continue;
            }
            bounds = Some(match bounds {
                None => (p.x, p.y, p.x, p.y),
                Some((x1, y1, x2, y2)) => (x1.min(p.x), y1.min(p.y), x2.max(p.x), y2.max(p.y)),
            });
        }
        bounds.map(|(x1, y1, x2, y2)| {
            let extent = |lo: i32, hi: i32| hi.saturating_sub(lo).saturating_add(1);
            Rect::new(x1, y1, extent(x1, x2), extent(y1, y2))
        })
    }

    /// The four corners as a closed polyline (first point repeated).
    pub fn outline(&self) -> [Point; 5] {
        let x2 = self.right().saturating_sub(1);
        let y2 = self.bottom().saturating_sub(1);
        [
            Point::new(self.x, self.y),
            Point::new(x2, self.y),
            Point::new(x2, y2),
            Point::new(self.x, y2),
            Point::new(self.x, self.y),
        ]
    }
}
