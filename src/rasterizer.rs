use cgmath::Vector4 as Vec4;

use crate::vertex::{Line, RasterPoint, Triangle, Varyings};

/// 用于给两个三角形恰好共享的边界像素分配归属（FoCG 8.1.2）
const OFFSCREEN_POINT: (f64, f64) = (-1.0, -1.0);

/// 光栅化产生的片元：像素坐标、插值深度和透视校正后的属性
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub x: i32,
    pub y: i32,
    /// 使用未校正的重心坐标插值
    pub z: f64,
    /// 插值后的 1/w
    pub depth_inverse: f64,
    /// 屏幕空间重心坐标 (alpha, beta, gamma)
    pub barycentric: [f64; 3],
    pub varyings: Varyings,
}

impl Fragment {
    /// 传给片元着色器的 gl_FragCoord 等价物
    pub fn coordinates(&self) -> Vec4<f64> {
        Vec4::new(self.x as f64, self.y as f64, self.z, self.depth_inverse)
    }
}

/// 包围盒取整到像素中心，(xmin, ymin, xmax, ymax)
pub fn get_box(triangle: &Triangle<RasterPoint>) -> (i32, i32, i32, i32) {
    (
        triangle.xmin().round_ties_even() as i32,
        triangle.ymin().round_ties_even() as i32,
        triangle.xmax().round_ties_even() as i32,
        triangle.ymax().round_ties_even() as i32,
    )
}

/// 增量式重心坐标光栅化
///
/// 三角形必须已经在窗口空间。退化三角形（面积为零）不产生任何片元。
/// 每个被覆盖的像素调用一次 `on_fragment`，深度测试由调用方负责。
pub fn rasterize_incremental<F>(triangle: &Triangle<RasterPoint>, mut on_fragment: F)
where
    F: FnMut(Fragment),
{
    let lines = [triangle.line_a(), triangle.line_b(), triangle.line_c()];

    let denominators = [
        lines[0].evaluate_at(triangle.a.pos),
        lines[1].evaluate_at(triangle.b.pos),
        lines[2].evaluate_at(triangle.c.pos),
    ];
    if denominators.contains(&0.0) {
        return;
    }

    // 三条边在屏幕外参考点上的符号与分母一致时，恰好落在该边上的像素才归这个三角形
    let owns_edge = [0, 1, 2].map(|i| {
        denominators[i] * lines[i].evaluate(OFFSCREEN_POINT.0, OFFSCREEN_POINT.1) > 0.0
    });

    let x_increments = lines.map(|l| l.factor_x());
    let y_increments = lines.map(|l| l.factor_y());

    // 初始分子必须在像素中心处求值，所以先取整
    let (min_x, min_y, max_x, max_y) = get_box(triangle);
    let mut previous_numerators = lines.map(|l| l.evaluate(min_x as f64, min_y as f64));

    let depth_inverses = [
        triangle.a.depth_inverse,
        triangle.b.depth_inverse,
        triangle.c.depth_inverse,
    ];
    let varyings = [
        &triangle.a.varyings,
        &triangle.b.varyings,
        &triangle.c.varyings,
    ];

    for y in min_y..=max_y {
        let mut numerators = previous_numerators;
        for x in min_x..=max_x {
            let barycentric = [0, 1, 2].map(|i| numerators[i] / denominators[i]);

            let covered = (0..3)
                .all(|i| barycentric[i] > 0.0 || (barycentric[i] == 0.0 && owns_edge[i]));
            if covered {
                let [alpha, beta, gamma] = barycentric;

                // 窗口空间中 1/w 可以线性插值
                let depth_inverse = alpha * depth_inverses[0]
                    + beta * depth_inverses[1]
                    + gamma * depth_inverses[2];
                // 深度直接用屏幕空间重心坐标插值
                let z = alpha * triangle.a.pos.z
                    + beta * triangle.b.pos.z
                    + gamma * triangle.c.pos.z;

                let weights = if depth_inverse != 0.0 && depth_inverse.is_finite() {
                    [0, 1, 2].map(|i| barycentric[i] * depth_inverses[i] / depth_inverse)
                } else {
                    barycentric
                };

                on_fragment(Fragment {
                    x,
                    y,
                    z,
                    depth_inverse,
                    barycentric,
                    varyings: Varyings::blend(weights, varyings),
                });
            }

            for i in 0..3 {
                numerators[i] += x_increments[i];
            }
        }
        for i in 0..3 {
            previous_numerators[i] += y_increments[i];
        }
    }
}

/// 中点画线算法（FoCG 8.1.1）
///
/// 端点是浮点坐标，最后一个像素在主循环之外单独写入，
/// 避免斜率把线段延伸到它从未进入的相邻像素。
pub fn rasterize_line<F>(line: &Line, mut plot: F)
where
    F: FnMut(i32, i32),
{
    let (mut a, mut b) = (line.point_a, line.point_b);
    if a.x > b.x {
        std::mem::swap(&mut a, &mut b);
    }
    // 交换端点之后再取方程
    let f = Line::new(a, b);

    let end_x = b.x.round_ties_even() as i32;
    let end_y = b.y.round_ties_even() as i32;
    let m = (b.y - a.y) / (b.x - a.x);

    if m <= -1.0 {
        let mut x = a.x.round_ties_even() as i32;
        let mut y = a.y.round_ties_even() as i32;
        while y > end_y {
            plot(x, y);
            if f.evaluate(x as f64 + 0.5, y as f64 - 1.0) < 0.0 {
                x += 1;
            }
            y -= 1;
        }
    } else if m <= 0.0 {
        let mut x = a.x.round_ties_even() as i32;
        let mut y = a.y.round_ties_even() as i32;
        while x < end_x {
            plot(x, y);
            if f.evaluate(x as f64 + 1.0, y as f64 - 0.5) > 0.0 {
                y -= 1;
            }
            x += 1;
        }
    } else if m <= 1.0 {
        let mut x = a.x.round_ties_even() as i32;
        let mut y = a.y.round_ties_even() as i32;
        while x < end_x {
            plot(x, y);
            if f.evaluate(x as f64 + 1.0, y as f64 + 0.5) < 0.0 {
                y += 1;
            }
            x += 1;
        }
    } else {
        let mut x = a.x.round_ties_even() as i32;
        let mut y = a.y.round_ties_even() as i32;
        while y < end_y {
            plot(x, y);
            if f.evaluate(x as f64 + 0.5, y as f64 + 1.0) > 0.0 {
                x += 1;
            }
            y += 1;
        }
    }
    plot(end_x, end_y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vertex::ClipSpaceVertex;
    use cgmath::{Vector2 as Vec2, Vector3 as Vec3};
    use rand::{Rng, SeedableRng, rngs::StdRng};
    use std::collections::{HashMap, HashSet};

    const EPSILON: f64 = 1e-9;

    fn point(x: f64, y: f64, color: Vec3<f64>) -> RasterPoint {
        RasterPoint::new(Vec4::new(x, y, 0.0, 1.0), color)
    }

    fn rgb_triangle() -> Triangle<RasterPoint> {
        Triangle::new(
            point(300.0, 300.0, Vec3::new(1.0, 0.0, 0.0)),
            point(500.0, 300.0, Vec3::new(0.0, 1.0, 0.0)),
            point(400.0, 500.0, Vec3::new(0.0, 0.0, 1.0)),
        )
    }

    fn coverage(triangle: &Triangle<RasterPoint>) -> Vec<(i32, i32)> {
        let mut pixels = Vec::new();
        rasterize_incremental(triangle, |fragment| pixels.push((fragment.x, fragment.y)));
        pixels
    }

    #[test]
    fn rgb_triangle_blends_inside_pixel() {
        let mut sample = None;
        rasterize_incremental(&rgb_triangle(), |fragment| {
            if (fragment.x, fragment.y) == (400, 350) {
                sample = Some(fragment);
            }
        });
        let fragment = sample.expect("像素 (400, 350) 在三角形内");

        let [alpha, beta, gamma] = fragment.barycentric;
        assert!(alpha > 0.0 && beta > 0.0 && gamma > 0.0);
        assert!((alpha + beta + gamma - 1.0).abs() < EPSILON);
        assert!((alpha - 0.375).abs() < EPSILON);
        assert!((beta - 0.375).abs() < EPSILON);
        assert!((gamma - 0.25).abs() < EPSILON);

        let color = fragment.varyings.color;
        assert!((color.x - alpha).abs() < EPSILON);
        assert!((color.y - beta).abs() < EPSILON);
        assert!((color.z - gamma).abs() < EPSILON);
    }

    #[test]
    fn every_fragment_lies_inside_the_triangle() {
        let triangle = rgb_triangle();
        let pixels = coverage(&triangle);
        assert!(!pixels.is_empty());
        for (x, y) in pixels {
            assert!((300..=500).contains(&x) && (300..=500).contains(&y));
            // 底边 y = 300 上的像素只归下方相邻的三角形
            assert!(y > 300);
        }
    }

    #[test]
    fn degenerate_triangle_is_skipped() {
        let collinear = Triangle::new(
            point(0.0, 0.0, Vec3::new(1.0, 0.0, 0.0)),
            point(10.0, 10.0, Vec3::new(1.0, 0.0, 0.0)),
            point(20.0, 20.0, Vec3::new(1.0, 0.0, 0.0)),
        );
        assert!(coverage(&collinear).is_empty());
    }

    #[test]
    fn shared_edge_is_covered_exactly_once() {
        let red = Vec3::new(1.0, 0.0, 0.0);
        let a = point(10.0, 10.0, red);
        let b = point(50.0, 12.0, red);
        let c = point(46.0, 47.0, red);
        let d = point(8.0, 44.0, red);

        // 四边形沿对角线 a–c 拆成两个三角形
        let first = Triangle::new(a, b, c);
        let second = Triangle::new(a, c, d);

        let mut owner: HashMap<(i32, i32), usize> = HashMap::new();
        for (id, triangle) in [first, second].iter().enumerate() {
            for pixel in coverage(triangle) {
                assert!(owner.insert(pixel, id).is_none(), "像素 {pixel:?} 被着色两次");
            }
        }

        // 四边形内部（含对角线）的每个像素都必须被覆盖
        let quad = [first, second];
        for y in 0..60 {
            for x in 0..60 {
                let strictly_inside = quad.iter().any(|t| {
                    let edges = [t.line_a(), t.line_b(), t.line_c()];
                    let denominators = [
                        edges[0].evaluate_at(t.a.pos),
                        edges[1].evaluate_at(t.b.pos),
                        edges[2].evaluate_at(t.c.pos),
                    ];
                    (0..3).all(|i| edges[i].evaluate(x as f64, y as f64) / denominators[i] >= 0.0)
                }) && {
                    let outline = [
                        Line::new(a.pos, b.pos),
                        Line::new(b.pos, c.pos),
                        Line::new(c.pos, d.pos),
                        Line::new(d.pos, a.pos),
                    ];
                    outline.iter().all(|l| l.evaluate(x as f64, y as f64) != 0.0)
                };
                if strictly_inside {
                    assert!(owner.contains_key(&(x, y)), "像素 ({x}, {y}) 没有被覆盖");
                }
            }
        }
    }

    #[test]
    fn fractional_shared_edges_have_no_gaps_or_overlaps() {
        let mut rng = StdRng::seed_from_u64(42);
        let green = Vec3::new(0.0, 1.0, 0.0);

        for _ in 0..200 {
            // 四个角按角度递增排列，间隔小于 180 度，得到凸四边形
            let center = (rng.random_range(25.0..35.0), rng.random_range(25.0..35.0));
            let corners: Vec<RasterPoint> = (0..4)
                .map(|k| {
                    let jitter: f64 = rng.random_range(-20.0..20.0);
                    let angle = (45.0 + 90.0 * k as f64 + jitter).to_radians();
                    let radius = rng.random_range(8.0..24.0);
                    point(center.0 + radius * angle.cos(), center.1 + radius * angle.sin(), green)
                })
                .collect();
            let (a, b, c, d) = (corners[0], corners[1], corners[2], corners[3]);
            let quad = [Triangle::new(a, b, c), Triangle::new(a, c, d)];

            let mut owner: HashMap<(i32, i32), usize> = HashMap::new();
            for (id, triangle) in quad.iter().enumerate() {
                for pixel in coverage(triangle) {
                    assert!(owner.insert(pixel, id).is_none(), "像素 {pixel:?} 被着色两次");
                }
            }

            for y in 0..64 {
                for x in 0..64 {
                    let inside = quad.iter().any(|t| {
                        let edges = [t.line_a(), t.line_b(), t.line_c()];
                        let denominators = [
                            edges[0].evaluate_at(t.a.pos),
                            edges[1].evaluate_at(t.b.pos),
                            edges[2].evaluate_at(t.c.pos),
                        ];
                        (0..3).all(|i| {
                            edges[i].evaluate(x as f64, y as f64) / denominators[i] > 1e-9
                        })
                    });
                    if inside {
                        assert!(owner.contains_key(&(x, y)), "像素 ({x}, {y}) 没有被覆盖");
                    }
                }
            }
        }
    }

    #[test]
    fn adjacent_triangles_with_axis_aligned_edge() {
        let white = Vec3::new(1.0, 1.0, 1.0);
        let left = Triangle::new(
            point(0.0, 0.0, white),
            point(10.0, 0.0, white),
            point(10.0, 10.0, white),
        );
        let right = Triangle::new(
            point(10.0, 0.0, white),
            point(20.0, 0.0, white),
            point(10.0, 10.0, white),
        );

        let left_pixels: HashSet<_> = coverage(&left).into_iter().collect();
        let right_pixels: HashSet<_> = coverage(&right).into_iter().collect();
        assert!(left_pixels.is_disjoint(&right_pixels));
        for y in 1..10 {
            assert!(left_pixels.contains(&(10, y)) ^ right_pixels.contains(&(10, y)));
        }
    }

    #[test]
    fn constant_attributes_survive_perspective_correction() {
        let varyings = Varyings {
            color: Vec3::new(0.2, 0.4, 0.6),
            uv: Vec2::new(0.3, 0.7),
            ..Varyings::default()
        };
        let vertex = |x: f64, y: f64, w: f64| {
            ClipSpaceVertex {
                position: Vec4::new(x * w, y * w, 0.5 * w, w),
                varyings,
            }
            .perspective_divide()
        };
        let triangle = Triangle::new(
            vertex(5.0, 5.0, 0.5),
            vertex(60.0, 8.0, 7.0),
            vertex(30.0, 55.0, 30.0),
        );

        let mut count = 0;
        rasterize_incremental(&triangle, |fragment| {
            count += 1;
            let color = fragment.varyings.color;
            assert!((color.x - 0.2).abs() < EPSILON);
            assert!((color.y - 0.4).abs() < EPSILON);
            assert!((color.z - 0.6).abs() < EPSILON);
            assert!((fragment.varyings.uv.x - 0.3).abs() < EPSILON);
            assert!((fragment.varyings.uv.y - 0.7).abs() < EPSILON);
        });
        assert!(count > 0);
    }

    #[test]
    fn perspective_weights_favour_the_near_vertex() {
        let mut near = point(0.0, 0.0, Vec3::new(1.0, 0.0, 0.0));
        near.depth_inverse = 1.0;
        let mut far_b = point(40.0, 0.0, Vec3::new(0.0, 0.0, 0.0));
        far_b.depth_inverse = 0.1;
        let mut far_c = point(0.0, 40.0, Vec3::new(0.0, 0.0, 0.0));
        far_c.depth_inverse = 0.1;

        rasterize_incremental(&Triangle::new(near, far_b, far_c), |fragment| {
            let [alpha, _, _] = fragment.barycentric;
            // 透视校正后近处顶点的权重不小于屏幕空间权重
            assert!(fragment.varyings.color.x >= alpha - EPSILON);
        });
    }

    #[test]
    fn line_endpoints_are_plotted() {
        let cases = [
            ((400.0, 400.0), (600.0, 500.0)),
            ((400.0, 400.0), (410.0, 700.0)),
            ((400.0, 400.0), (100.0, 700.0)),
            ((400.0, 400.0), (100.0, 400.0)),
            ((400.0, 400.0), (400.0, 100.0)),
            ((400.0, 400.0), (700.0, 130.0)),
        ];
        for ((ax, ay), (bx, by)) in cases {
            let mut pixels = Vec::new();
            let line = Line::planar(Vec2::new(ax, ay), Vec2::new(bx, by));
            rasterize_line(&line, |x, y| pixels.push((x, y)));
            assert!(pixels.contains(&(ax as i32, ay as i32)));
            assert!(pixels.contains(&(bx as i32, by as i32)));

            // 每一步最多在两个方向上各移动一个像素
            for pair in pixels.windows(2) {
                let (dx, dy) = (pair[1].0 - pair[0].0, pair[1].1 - pair[0].1);
                assert!(dx.abs() <= 1 && dy.abs() <= 1);
            }
        }
    }

    #[test]
    fn horizontal_line_fills_span() {
        let mut pixels = Vec::new();
        let line = Line::planar(Vec2::new(2.0, 3.0), Vec2::new(8.0, 3.0));
        rasterize_line(&line, |x, y| pixels.push((x, y)));
        assert_eq!(pixels, (2..=8).map(|x| (x, 3)).collect::<Vec<_>>());
    }
}
