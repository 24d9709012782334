//! Planar polygons in longitude/latitude space.

/// A vertex in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// A closed ring of vertices; the last vertex connects back to the first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Fewer than three vertices.
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3
    }

    /// Shoelace area, positive for counter-clockwise rings.
    pub fn signed_area(&self) -> f64 {
        if self.is_degenerate() {
            return 0.0;
        }
        let n = self.points.len();
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.lon * b.lat - b.lon * a.lat
            })
            .sum();
        twice / 2.0
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    /// Part of `self` inside `clip` (Sutherland-Hodgman).
    ///
    /// `clip` must be convex; `self` may be any simple ring.
    pub fn intersection(&self, clip: &Polygon) -> Polygon {
        if self.is_degenerate() || clip.is_degenerate() || clip.area() == 0.0 {
            return Polygon::default();
        }

        let mut edges = clip.points.clone();
        if clip.signed_area() < 0.0 {
            edges.reverse();
        }

        let mut output = self.points.clone();
        for i in 0..edges.len() {
            if output.is_empty() {
                break;
            }
            let a = edges[i];
            let b = edges[(i + 1) % edges.len()];
            let input = std::mem::take(&mut output);

            for j in 0..input.len() {
                let current = input[j];
                let previous = input[(j + input.len() - 1) % input.len()];
                let current_in = cross(a, b, current) >= 0.0;
                let previous_in = cross(a, b, previous) >= 0.0;

                if current_in {
                    if !previous_in {
                        output.push(crossing(previous, current, a, b));
                    }
                    output.push(current);
                } else if previous_in {
                    output.push(crossing(previous, current, a, b));
                }
            }
        }
        Polygon::new(output)
    }
}

/// Z component of (a→b) × (a→p); positive when p is left of a→b.
fn cross(a: Point, b: Point, p: Point) -> f64 {
    (b.lon - a.lon) * (p.lat - a.lat) - (b.lat - a.lat) * (p.lon - a.lon)
}

/// Where segment p→q crosses the line through a and b.
///
/// Only called for segments with one end on each side of the line.
fn crossing(p: Point, q: Point, a: Point, b: Point) -> Point {
    let dp = cross(a, b, p);
    let dq = cross(a, b, q);
    let t = dp / (dp - dq);
    Point::new(p.lon + t * (q.lon - p.lon), p.lat + t * (q.lat - p.lat))
}
