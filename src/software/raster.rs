//! Scan conversion.

use glam::{Vec2, Vec3};

#[inline]
fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Whether a pixel centre exactly on edge `a -> b` belongs to this triangle.
///
/// Two triangles sharing an edge walk it in opposite directions, so exactly
/// one of them owns it.
#[inline]
fn owns(a: Vec2, b: Vec2) -> bool {
    let d = b - a;
    d.y < 0.0 || (d.y == 0.0 && d.x > 0.0)
}

#[inline]
fn covers(w: f32, a: Vec2, b: Vec2) -> bool {
    w > 0.0 || (w == 0.0 && owns(a, b))
}

/// Rasterize one triangle given in pixel coordinates (`z` is depth).
///
/// Calls `fragment(x, y, barycentric, depth)` for every covered pixel centre
/// inside the `width` x `height` viewport. Barycentrics follow the input
/// vertex order regardless of winding. Degenerate triangles produce nothing.
pub(crate) fn rasterize_triangle<F>(width: u32, height: u32, vertices: [Vec3; 3], mut fragment: F)
where
    F: FnMut(u32, u32, [f32; 3], f32),
{
    if vertices.iter().any(|v| !v.is_finite()) {
        return;
    }
    let [p0, p1, p2] = vertices.map(|v| v.truncate());
    let area = edge(p0, p1, p2);
    if area.abs() < 1e-12 {
        return;
    }
    // Walk counter-clockwise in pixel space so every inside weight is positive.
    let flipped = area < 0.0;
    let (a, b, c) = if flipped { (p0, p2, p1) } else { (p0, p1, p2) };
    let area = area.abs();

    let min = a.min(b).min(c);
    let max = a.max(b).max(c);
    let x0 = min.x.floor().max(0.0) as u32;
    let y0 = min.y.floor().max(0.0) as u32;
    let x1 = max.x.ceil().clamp(0.0, width as f32) as u32;
    let y1 = max.y.ceil().clamp(0.0, height as f32) as u32;

    for y in y0..y1 {
        for x in x0..x1 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let wa = edge(b, c, p);
            let wb = edge(c, a, p);
            let wc = edge(a, b, p);
            if !(covers(wa, b, c) && covers(wb, c, a) && covers(wc, a, b)) {
                continue;
            }
            let (wa, wb, wc) = (wa / area, wb / area, wc / area);
            let bary = if flipped { [wa, wc, wb] } else { [wa, wb, wc] };
            let depth = bary[0] * vertices[0].z + bary[1] * vertices[1].z + bary[2] * vertices[2].z;
            fragment(x, y, bary, depth);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_quad_covers_each_pixel_once() {
        let (w, h) = (8u32, 6u32);
        let mut hits = vec![0u32; (w * h) as usize];
        let corners = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(w as f32, 0.0, 0.0),
            Vec3::new(w as f32, h as f32, 0.0),
            Vec3::new(0.0, h as f32, 0.0),
        ];
        for tri in [[0, 1, 2], [0, 2, 3]] {
            rasterize_triangle(w, h, tri.map(|i| corners[i]), |x, y, _, _| {
                hits[(y * w + x) as usize] += 1;
            });
        }
        assert!(hits.iter().all(|&n| n == 1), "{hits:?}");
    }

    #[test]
    fn test_winding_does_not_matter() {
        let cw = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 4.0, 0.0), Vec3::new(4.0, 0.0, 0.0)];
        let ccw = [cw[0], cw[2], cw[1]];
        let mut a = 0;
        let mut b = 0;
        rasterize_triangle(4, 4, cw, |_, _, _, _| a += 1);
        rasterize_triangle(4, 4, ccw, |_, _, _, _| b += 1);
        assert_eq!(a, b);
        assert!(a > 0);
    }

    #[test]
    fn test_barycentrics_follow_input_order() {
        let tri = [Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.0, 8.0, 1.0), Vec3::new(8.0, 0.0, 0.0)];
        rasterize_triangle(8, 8, tri, |x, y, bary, depth| {
            assert!((bary.iter().sum::<f32>() - 1.0).abs() < 1e-5);
            // Depth is 1 only at the second vertex, at (0, 8).
            assert!((depth - (y as f32 + 0.5) / 8.0).abs() < 1e-5, "({x}, {y}) {depth}");
        });
    }

    #[test]
    fn test_offscreen_and_degenerate() {
        let mut count = 0;
        let outside = [Vec3::new(-10.0, -10.0, 0.0), Vec3::new(-5.0, -10.0, 0.0), Vec3::new(-5.0, -5.0, 0.0)];
        rasterize_triangle(4, 4, outside, |_, _, _, _| count += 1);
        let line = [Vec3::ZERO, Vec3::new(2.0, 2.0, 0.0), Vec3::new(4.0, 4.0, 0.0)];
        rasterize_triangle(4, 4, line, |_, _, _, _| count += 1);
        assert_eq!(count, 0);
    }
}
