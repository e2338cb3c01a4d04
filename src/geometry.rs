/// A point in screen pixels, origin at the top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Center of a circle of `diameter` whose bounding box starts at `self`
    pub fn center_of(&self, diameter: f64) -> Point {
        Point::new(self.x + diameter / 2.0, self.y + diameter / 2.0)
    }
}

/// Screen and sprite sizes for one dismissal session.
///
/// All-zero geometry stands for "layout not measured yet" and is valid input
/// everywhere: it degrades to positions pinned at the origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub screen_width: f64,
    pub screen_height: f64,
    pub cursor_diameter: f64,
    pub target_diameter: f64,
}

impl Geometry {
    pub fn new(
        screen_width: f64,
        screen_height: f64,
        cursor_diameter: f64,
        target_diameter: f64,
    ) -> Self {
        Self {
            screen_width,
            screen_height,
            cursor_diameter,
            target_diameter,
        }
    }

    /// Largest top-left x a sprite of `diameter` can take while fully on screen
    pub fn max_x(&self, diameter: f64) -> f64 {
        travel(self.screen_width, diameter)
    }

    /// Largest top-left y a sprite of `diameter` can take while fully on screen
    pub fn max_y(&self, diameter: f64) -> f64 {
        travel(self.screen_height, diameter)
    }
}

// Never negative: a sprite larger than the screen is pinned at 0.
fn travel(dimension: f64, diameter: f64) -> f64 {
    (dimension - diameter).max(0.0)
}
