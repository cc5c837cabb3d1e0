use eframe::egui::{Pos2, Vec2, pos2, vec2};

const MIN_VECTOR_LENGTH_SQ: f32 = 1e-8;

/// Unit vector in the direction of `v`, or `None` for a degenerate vector.
pub fn unit(v: Vec2) -> Option<Vec2> {
    let length_sq = v.length_sq();
    if length_sq <= MIN_VECTOR_LENGTH_SQ {
        return None;
    }
    Some(v / length_sq.sqrt())
}

/// Vector in the direction of `v` with the given length.
pub fn scale_to(v: Vec2, length: f32) -> Option<Vec2> {
    unit(v).map(|u| u * length)
}

/// Unit vector perpendicular to `v` (rotated a quarter turn counter-clockwise).
pub fn unit_normal(v: Vec2) -> Option<Vec2> {
    unit(vec2(-v.y, v.x))
}

/// Monotone-chain convex hull. Returns the hull vertices in
/// counter-clockwise order; collinear points are dropped. Inputs with
/// fewer than three distinct points come back as-is.
pub fn convex_hull(points: &[Vec2]) -> Vec<Vec2> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mut sorted = points.to_vec();
    sorted.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    sorted.dedup_by(|a, b| (*a - *b).length_sq() <= MIN_VECTOR_LENGTH_SQ);
    if sorted.len() < 3 {
        return sorted;
    }

    fn cross(o: Vec2, a: Vec2, b: Vec2) -> f32 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    }

    let mut lower: Vec<Vec2> = Vec::with_capacity(sorted.len());
    for &point in &sorted {
        while lower.len() >= 2
            && cross(lower[lower.len() - 2], lower[lower.len() - 1], point) <= 0.0
        {
            lower.pop();
        }
        lower.push(point);
    }

    let mut upper: Vec<Vec2> = Vec::with_capacity(sorted.len());
    for &point in sorted.iter().rev() {
        while upper.len() >= 2
            && cross(upper[upper.len() - 2], upper[upper.len() - 1], point) <= 0.0
        {
            upper.pop();
        }
        upper.push(point);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

const CIRCLE_SAMPLES: usize = 32;
const CURVE_SAMPLES: usize = 12;

/// Closed, smoothed outline around a set of hull points, offset outward
/// by `padding`. The result is a sampled closed polyline ready for
/// `PathShape::closed_line`.
///
/// Zero points yield an empty path; one point a circle; two points a
/// stadium with rounded shoulders; three or more a rounded polygon where
/// each vertex is pushed outward along the bisector of its incident edge
/// directions and the offset vertices are joined with a closed
/// Catmull-Rom spline.
pub fn smooth_hull(points: &[Vec2], padding: f32) -> Vec<Pos2> {
    match points.len() {
        0 => Vec::new(),
        1 => hull_around_point(points[0], padding),
        2 => hull_around_segment(points[0], points[1], padding),
        _ => hull_around_polygon(points, padding),
    }
}

fn hull_around_point(center: Vec2, padding: f32) -> Vec<Pos2> {
    (0..CIRCLE_SAMPLES)
        .map(|i| {
            let angle = (i as f32) * std::f32::consts::TAU / (CIRCLE_SAMPLES as f32);
            pos2(
                center.x + padding * angle.cos(),
                center.y + padding * angle.sin(),
            )
        })
        .collect()
}

fn hull_around_segment(p0: Vec2, p1: Vec2, padding: f32) -> Vec<Pos2> {
    let along = p1 - p0;
    let Some(extension) = scale_to(along, padding) else {
        // Coincident points collapse to the single-point case.
        return hull_around_point(p0, padding);
    };
    let Some(shoulder) = unit_normal(along) else {
        return hull_around_point(p0, padding);
    };

    let extension0 = p0 - extension;
    let extension1 = p1 + extension;

    // Shoulder control points sit off the segment axis at 1.2x padding.
    let control_delta = shoulder * (1.2 * padding);

    let mut path = Vec::with_capacity(CURVE_SAMPLES * 2);
    sample_cubic(
        &mut path,
        extension0,
        extension0 - control_delta,
        extension1 - control_delta,
        extension1,
    );
    // Mirror of the first bend, reflecting the inbound control point.
    sample_cubic(
        &mut path,
        extension1,
        extension1 + control_delta,
        extension0 + control_delta,
        extension0,
    );
    path
}

fn hull_around_polygon(points: &[Vec2], padding: f32) -> Vec<Pos2> {
    let count = points.len();
    let mut offset = Vec::with_capacity(count);
    for (i, &point) in points.iter().enumerate() {
        let next = points[(i + 1) % count];
        let prior = points[(i + count - 1) % count];
        let dir_out = unit(next - point);
        let dir_in = unit(point - prior);
        let extension = match (dir_in, dir_out) {
            // External angle bisector of the two incident edges.
            (Some(a), Some(b)) => unit(a - b),
            (Some(a), None) | (None, Some(a)) => unit_normal(a),
            (None, None) => None,
        };
        match extension {
            Some(extension) => offset.push(point + extension * padding),
            None => offset.push(point),
        }
    }
    catmull_rom_closed(&offset)
}

fn sample_cubic(out: &mut Vec<Pos2>, p0: Vec2, c0: Vec2, c1: Vec2, p1: Vec2) {
    for i in 0..CURVE_SAMPLES {
        let t = (i as f32) / (CURVE_SAMPLES as f32);
        let s = 1.0 - t;
        let point = p0 * (s * s * s)
            + c0 * (3.0 * s * s * t)
            + c1 * (3.0 * s * t * t)
            + p1 * (t * t * t);
        out.push(pos2(point.x, point.y));
    }
}

/// Centripetal Catmull-Rom sampling through all points, closed.
fn catmull_rom_closed(points: &[Vec2]) -> Vec<Pos2> {
    const ALPHA: f32 = 0.5;

    let count = points.len();
    let mut path = Vec::with_capacity(count * CURVE_SAMPLES);
    for i in 0..count {
        let p0 = points[(i + count - 1) % count];
        let p1 = points[i];
        let p2 = points[(i + 1) % count];
        let p3 = points[(i + 2) % count];

        let knot = |a: Vec2, b: Vec2| (b - a).length().powf(ALPHA).max(1e-4);
        let t0 = 0.0;
        let t1 = t0 + knot(p0, p1);
        let t2 = t1 + knot(p1, p2);
        let t3 = t2 + knot(p2, p3);

        for step in 0..CURVE_SAMPLES {
            let t = t1 + (t2 - t1) * (step as f32) / (CURVE_SAMPLES as f32);
            // Barry-Goldman pyramid.
            let lerp = |a: Vec2, b: Vec2, ta: f32, tb: f32| {
                if (tb - ta).abs() <= f32::EPSILON {
                    a
                } else {
                    a * ((tb - t) / (tb - ta)) + b * ((t - ta) / (tb - ta))
                }
            };
            let a1 = lerp(p0, p1, t0, t1);
            let a2 = lerp(p1, p2, t1, t2);
            let a3 = lerp(p2, p3, t2, t3);
            let b1 = lerp(a1, a2, t0, t2);
            let b2 = lerp(a2, a3, t1, t3);
            let point = lerp(b1, b2, t1, t2);
            path.push(pos2(point.x, point.y));
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(path: &[Pos2]) -> (f32, f32, f32, f32) {
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for point in path {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        (min_x, min_y, max_x, max_y)
    }

    #[test]
    fn unit_rejects_degenerate_vectors() {
        assert!(unit(Vec2::ZERO).is_none());
        assert!(scale_to(Vec2::ZERO, 5.0).is_none());
        assert!(unit_normal(Vec2::ZERO).is_none());

        let u = unit(vec2(3.0, 4.0)).unwrap();
        assert!((u.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn unit_normal_is_perpendicular() {
        let v = vec2(2.0, -1.0);
        let n = unit_normal(v).unwrap();
        assert!(v.dot(n).abs() < 1e-6);
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn convex_hull_of_square_with_interior_point() {
        let points = [
            vec2(0.0, 0.0),
            vec2(4.0, 0.0),
            vec2(4.0, 4.0),
            vec2(0.0, 4.0),
            vec2(2.0, 2.0),
        ];
        let hull = convex_hull(&points);
        assert_eq!(hull.len(), 4);
        assert!(!hull.iter().any(|p| (*p - vec2(2.0, 2.0)).length() < 1e-6));
    }

    #[test]
    fn empty_hull_is_empty_path() {
        assert!(smooth_hull(&[], 10.0).is_empty());
    }

    #[test]
    fn single_point_hull_is_a_circle() {
        let center = vec2(13.0, -7.0);
        let padding = 9.0;
        let path = smooth_hull(&[center], padding);
        assert!(!path.is_empty());
        for point in &path {
            let distance = (point.to_vec2() - center).length();
            assert!((distance - padding).abs() < 1e-3, "distance {distance}");
        }
    }

    #[test]
    fn two_point_hull_covers_both_endpoints() {
        let padding = 6.0;
        let path = smooth_hull(&[vec2(0.0, 0.0), vec2(20.0, 0.0)], padding);
        let (min_x, min_y, max_x, max_y) = bounds(&path);
        assert!(min_x <= -padding + 1e-3);
        assert!(max_x >= 20.0 + padding - 1e-3);
        // Shoulders bulge along the normal but stay near the padding band.
        assert!(min_y < 0.0 && max_y > 0.0);
    }

    #[test]
    fn square_hull_expands_by_roughly_the_padding() {
        let padding = 5.0;
        let square = [
            vec2(0.0, 0.0),
            vec2(2.0, 0.0),
            vec2(2.0, 2.0),
            vec2(0.0, 2.0),
        ];
        let path = smooth_hull(&square, padding);
        let (min_x, min_y, max_x, max_y) = bounds(&path);

        let tolerance = padding * 0.25;
        assert!((min_x - (0.0 - padding)).abs() < tolerance, "min_x {min_x}");
        assert!((min_y - (0.0 - padding)).abs() < tolerance, "min_y {min_y}");
        assert!((max_x - (2.0 + padding)).abs() < tolerance, "max_x {max_x}");
        assert!((max_y - (2.0 + padding)).abs() < tolerance, "max_y {max_y}");
    }
}
