//! Spatial primitives shared by the graph model and the layouts.

pub type Unit = euclid::UnknownUnit;

pub type Point = euclid::Point2D<f64, Unit>;
pub type Vector = euclid::Vector2D<f64, Unit>;
pub type Size = euclid::Size2D<f64, Unit>;
pub type Rect = euclid::Rect<f64, Unit>;
pub type Transform = euclid::Transform2D<f64, Unit, Unit>;
pub type Insets = euclid::SideOffsets2D<f64, Unit>;

pub fn point(x: f64, y: f64) -> Point {
    euclid::point2(x, y)
}

pub fn size(w: f64, h: f64) -> Size {
    euclid::size2(w, h)
}

pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
    euclid::rect(x, y, w, h)
}

/// Rectangle of the given extent centred on `center`.
pub fn centered_rect(center: Point, extent: Size) -> Rect {
    Rect::new(
        point(center.x - extent.width / 2.0, center.y - extent.height / 2.0),
        extent,
    )
}

/// Map a rectangle through a transform, returning the axis-aligned hull of
/// its transformed corners.
pub fn transform_rect(transform: &Transform, r: &Rect) -> Rect {
    let corners = [
        r.origin,
        point(r.max_x(), r.min_y()),
        point(r.min_x(), r.max_y()),
        point(r.max_x(), r.max_y()),
    ];
    Rect::from_points(corners.iter().map(|&c| transform.transform_point(c)))
}
