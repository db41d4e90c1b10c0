//! Collision boxes: unions of primitive shapes used for hit testing.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// A single primitive shape inside a collision box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CollisionShape {
    Rectangle(Rect),
    /// A line segment hit within `tolerance` of its axis.
    Segment { a: Point, b: Point, tolerance: f64 },
    Circle { center: Point, radius: f64 },
}

impl CollisionShape {
    pub fn contains(&self, point: Point) -> bool {
        match *self {
            CollisionShape::Rectangle(rect) => {
                point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
            }
            CollisionShape::Segment { a, b, tolerance } => {
                point_to_segment_dist(point, a, b) <= tolerance
            }
            CollisionShape::Circle { center, radius } => (point - center).hypot() <= radius,
        }
    }

    pub fn overlaps_rectangle(&self, rect: Rect) -> bool {
        match *self {
            CollisionShape::Rectangle(own) => {
                own.x0 <= rect.x1 && own.x1 >= rect.x0 && own.y0 <= rect.y1 && own.y1 >= rect.y0
            }
            CollisionShape::Segment { a, b, .. } => segment_intersects_rect(a, b, rect),
            CollisionShape::Circle { center, radius } => {
                let nearest = Point::new(
                    center.x.clamp(rect.x0, rect.x1),
                    center.y.clamp(rect.y0, rect.y1),
                );
                (nearest - center).hypot() <= radius
            }
        }
    }

    pub fn intersects_segment(&self, a: Point, b: Point) -> bool {
        match *self {
            CollisionShape::Rectangle(rect) => segment_intersects_rect(a, b, rect),
            CollisionShape::Segment { a: c, b: d, tolerance } => {
                segments_intersect(a, b, c, d)
                    || point_to_segment_dist(c, a, b) <= tolerance
                    || point_to_segment_dist(d, a, b) <= tolerance
            }
            CollisionShape::Circle { center, radius } => {
                point_to_segment_dist(center, a, b) <= radius
            }
        }
    }

    pub fn bounds(&self) -> Rect {
        match *self {
            CollisionShape::Rectangle(rect) => rect,
            CollisionShape::Segment { a, b, tolerance } => {
                Rect::from_points(a, b).inflate(tolerance, tolerance)
            }
            CollisionShape::Circle { center, radius } => {
                Rect::from_center_size(center, (radius * 2.0, radius * 2.0))
            }
        }
    }

    fn translate(&mut self, delta: Vec2) {
        match self {
            CollisionShape::Rectangle(rect) => *rect = *rect + delta,
            CollisionShape::Segment { a, b, .. } => {
                *a += delta;
                *b += delta;
            }
            CollisionShape::Circle { center, .. } => *center += delta,
        }
    }
}

/// Union of primitive shapes attached to a stage object.
///
/// An empty box contains nothing, overlaps nothing and reports
/// `Rect::ZERO` as its bounding rectangle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollisionBox {
    pub shapes: Vec<CollisionShape>,
}

impl CollisionBox {
    pub fn new(shapes: Vec<CollisionShape>) -> Self {
        Self { shapes }
    }

    /// Box made of a single rectangle.
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(vec![CollisionShape::Rectangle(rect)])
    }

    /// Box made of the segments of a polyline.
    pub fn from_polyline(points: &[Point], tolerance: f64) -> Self {
        let shapes = match points {
            [] => Vec::new(),
            [single] => vec![CollisionShape::Circle {
                center: *single,
                radius: tolerance,
            }],
            _ => points
                .windows(2)
                .map(|w| CollisionShape::Segment {
                    a: w[0],
                    b: w[1],
                    tolerance,
                })
                .collect(),
        };
        Self::new(shapes)
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn is_point_in(&self, point: Point) -> bool {
        self.shapes.iter().any(|s| s.contains(point))
    }

    pub fn overlaps_rectangle(&self, rect: Rect) -> bool {
        self.shapes.iter().any(|s| s.overlaps_rectangle(rect))
    }

    pub fn intersects_segment(&self, a: Point, b: Point) -> bool {
        self.shapes.iter().any(|s| s.intersects_segment(a, b))
    }

    /// Minimal axis-aligned rectangle covering every shape.
    pub fn bounding_rectangle(&self) -> Rect {
        let mut iter = self.shapes.iter().map(CollisionShape::bounds);
        match iter.next() {
            Some(first) => iter.fold(first, |acc, r| acc.union(r)),
            None => Rect::ZERO,
        }
    }

    pub fn translate(&mut self, delta: Vec2) {
        for shape in &mut self.shapes {
            shape.translate(delta);
        }
    }
}

/// Where the ray from the center of `rect` toward `target` leaves `rect`.
/// A target inside the rectangle is returned as is.
pub fn border_point(rect: Rect, target: Point) -> Point {
    let center = rect.center();
    let dir = target - center;
    let scale = |half: f64, d: f64| {
        if d.abs() > f64::EPSILON {
            half / d.abs()
        } else {
            f64::INFINITY
        }
    };
    let t = scale(rect.width() / 2.0, dir.x).min(scale(rect.height() / 2.0, dir.y));
    if t >= 1.0 {
        return target;
    }
    center + dir * t
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    (point - (a + seg * t)).hypot()
}

/// Test if segment (a-b) crosses or lies inside a rectangle.
pub fn segment_intersects_rect(a: Point, b: Point, rect: Rect) -> bool {
    if rect.contains(a) || rect.contains(b) {
        return true;
    }
    let corners = [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ];
    (0..4).any(|i| segments_intersect(a, b, corners[i], corners[(i + 1) % 4]))
}

/// Test if two line segments (a-b) and (c-d) intersect.
pub fn segments_intersect(a: Point, b: Point, c: Point, d: Point) -> bool {
    let cross = |o: Point, p: Point, q: Point| -> f64 {
        (p.x - o.x) * (q.y - o.y) - (p.y - o.y) * (q.x - o.x)
    };
    let d1 = cross(c, d, a);
    let d2 = cross(c, d, b);
    let d3 = cross(a, b, c);
    let d4 = cross(a, b, d);
    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    // Collinear: an endpoint lies on the other segment
    let on_segment = |p: Point, q: Point, r: Point| -> bool {
        r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
    };
    (d1.abs() < 1e-10 && on_segment(c, d, a))
        || (d2.abs() < 1e-10 && on_segment(c, d, b))
        || (d3.abs() < 1e-10 && on_segment(a, b, c))
        || (d4.abs() < 1e-10 && on_segment(a, b, d))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_box() {
        let empty = CollisionBox::default();
        assert!(empty.is_empty());
        assert!(!empty.is_point_in(Point::ZERO));
        assert!(!empty.overlaps_rectangle(Rect::new(-10.0, -10.0, 10.0, 10.0)));
        assert!(!empty.intersects_segment(Point::new(-5.0, 0.0), Point::new(5.0, 0.0)));
        assert_eq!(empty.bounding_rectangle(), Rect::ZERO);
    }

    #[test]
    fn test_rectangle_point_in() {
        let cb = CollisionBox::from_rect(Rect::new(0.0, 0.0, 100.0, 50.0));
        assert!(cb.is_point_in(Point::new(50.0, 25.0)));
        assert!(cb.is_point_in(Point::new(100.0, 50.0)));
        assert!(!cb.is_point_in(Point::new(101.0, 25.0)));
    }

    #[test]
    fn test_union_of_shapes() {
        let cb = CollisionBox::new(vec![
            CollisionShape::Rectangle(Rect::new(0.0, 0.0, 10.0, 10.0)),
            CollisionShape::Circle {
                center: Point::new(100.0, 100.0),
                radius: 5.0,
            },
        ]);
        assert!(cb.is_point_in(Point::new(5.0, 5.0)));
        assert!(cb.is_point_in(Point::new(103.0, 100.0)));
        assert!(!cb.is_point_in(Point::new(50.0, 50.0)));

        let bounds = cb.bounding_rectangle();
        assert!((bounds.x0 - 0.0).abs() < f64::EPSILON);
        assert!((bounds.x1 - 105.0).abs() < f64::EPSILON);
        assert!((bounds.y1 - 105.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_segment_tolerance() {
        let cb = CollisionBox::from_polyline(&[Point::new(0.0, 0.0), Point::new(100.0, 0.0)], 4.0);
        assert!(cb.is_point_in(Point::new(50.0, 3.0)));
        assert!(!cb.is_point_in(Point::new(50.0, 5.0)));
    }

    #[test]
    fn test_overlaps_rectangle() {
        let rect_box = CollisionBox::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(rect_box.overlaps_rectangle(Rect::new(5.0, 5.0, 20.0, 20.0)));
        assert!(!rect_box.overlaps_rectangle(Rect::new(11.0, 11.0, 20.0, 20.0)));

        // Segment crossing the rect without an endpoint inside
        let line = CollisionBox::from_polyline(&[Point::new(-10.0, 5.0), Point::new(30.0, 5.0)], 1.0);
        assert!(line.overlaps_rectangle(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert!(!line.overlaps_rectangle(Rect::new(0.0, 20.0, 10.0, 30.0)));
    }

    #[test]
    fn test_intersects_segment() {
        let cb = CollisionBox::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(cb.intersects_segment(Point::new(-5.0, 5.0), Point::new(15.0, 5.0)));
        assert!(!cb.intersects_segment(Point::new(-5.0, 20.0), Point::new(15.0, 20.0)));

        let edge = CollisionBox::from_polyline(&[Point::new(0.0, 0.0), Point::new(0.0, 100.0)], 2.0);
        assert!(edge.intersects_segment(Point::new(-50.0, 50.0), Point::new(50.0, 50.0)));
    }

    #[test]
    fn test_translate() {
        let mut cb = CollisionBox::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        cb.translate(Vec2::new(5.0, -5.0));
        let bounds = cb.bounding_rectangle();
        assert!((bounds.x0 - 5.0).abs() < f64::EPSILON);
        assert!((bounds.y0 + 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_border_point() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        let right = border_point(rect, Point::new(300.0, 25.0));
        assert!((right.x - 100.0).abs() < f64::EPSILON);
        assert!((right.y - 25.0).abs() < f64::EPSILON);
        let below = border_point(rect, Point::new(50.0, 500.0));
        assert!((below.y - 50.0).abs() < f64::EPSILON);
        let inside = Point::new(60.0, 30.0);
        assert_eq!(border_point(rect, inside), inside);
    }

    #[test]
    fn test_point_to_segment_dist() {
        let d = point_to_segment_dist(Point::new(5.0, 5.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((d - 5.0).abs() < f64::EPSILON);
        let degenerate = point_to_segment_dist(Point::new(3.0, 4.0), Point::ZERO, Point::ZERO);
        assert!((degenerate - 5.0).abs() < f64::EPSILON);
    }
}
