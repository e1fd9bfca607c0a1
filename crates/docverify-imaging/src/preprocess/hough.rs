// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Probabilistic Hough transform for finite line segments.
//
// `imageproc::hough` only reports infinite polar lines; skew estimation needs
// segment endpoints, so edge points are visited in pseudo-random order, vote
// into a (theta, rho) accumulator, and once a bin crosses the threshold the
// corresponding line is walked in both directions (bridging gaps up to
// `max_line_gap`). Pixels on an accepted segment are removed from the
// accumulator and the edge mask.

use image::GrayImage;

/// Fixed-point fraction bits used while stepping along a line.
const SHIFT: i64 = 16;

/// Seed for the point-visiting order. Fixed so results are reproducible.
const VISIT_SEED: u64 = 0x9E37_79B9_7F4A_7C15;

/// A detected segment in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    pub start: (i32, i32),
    pub end: (i32, i32),
}

impl LineSegment {
    /// Angle against the x axis in degrees, with the endpoints ordered left
    /// to right. Positive angles descend to the right (image y grows down).
    pub fn angle_degrees(&self) -> f64 {
        let (a, b) = if self.start.0 <= self.end.0 {
            (self.start, self.end)
        } else {
            (self.end, self.start)
        };
        let dy = f64::from(b.1 - a.1);
        let dx = f64::from(b.0 - a.0);
        dy.atan2(dx).to_degrees()
    }

    pub fn length(&self) -> f64 {
        let dx = f64::from(self.end.0 - self.start.0);
        let dy = f64::from(self.end.1 - self.start.1);
        dx.hypot(dy)
    }
}

/// Segment detector parameters.
#[derive(Debug, Clone, Copy)]
pub struct SegmentDetector {
    /// Distance resolution of the accumulator, in pixels.
    pub rho: f64,
    /// Angle resolution of the accumulator, in degrees.
    pub theta_degrees: f64,
    /// Minimum votes before a line is walked.
    pub threshold: u32,
    /// Segments shorter than this (on both axes) are discarded.
    pub min_line_length: u32,
    /// Largest run of missing edge pixels bridged within one segment.
    pub max_line_gap: u32,
}

impl Default for SegmentDetector {
    fn default() -> Self {
        Self {
            rho: 1.0,
            theta_degrees: 1.0,
            threshold: 100,
            min_line_length: 100,
            max_line_gap: 20,
        }
    }
}

impl SegmentDetector {
    /// Detect segments in a binary edge map (non-zero = edge).
    pub fn detect(&self, edges: &GrayImage) -> Vec<LineSegment> {
        let (width, height) = edges.dimensions();
        if width == 0 || height == 0 || self.rho <= 0.0 || self.theta_degrees <= 0.0 {
            return Vec::new();
        }
        let w = i64::from(width);
        let h = i64::from(height);

        let theta = self.theta_degrees.to_radians();
        let irho = 1.0 / self.rho;
        let num_angle = ((std::f64::consts::PI / theta).round() as usize).max(1);
        let num_rho = (((w + h) * 2 + 1) as f64 / self.rho).round() as usize;
        let rho_offset = (num_rho as i64 - 1) / 2;
        let trig: Vec<(f64, f64)> = (0..num_angle)
            .map(|n| {
                let angle = n as f64 * theta;
                (angle.cos() * irho, angle.sin() * irho)
            })
            .collect();

        let rho_bin = |x: i64, y: i64, (cos, sin): (f64, f64)| -> Option<usize> {
            let r = (x as f64 * cos + y as f64 * sin).round() as i64 + rho_offset;
            usize::try_from(r).ok().filter(|&r| r < num_rho)
        };

        let mut accumulator = vec![0i32; num_angle * num_rho];
        let mut mask = vec![false; (w * h) as usize];
        let mut points = Vec::new();
        for (x, y, pixel) in edges.enumerate_pixels() {
            if pixel.0[0] != 0 {
                mask[(i64::from(y) * w + i64::from(x)) as usize] = true;
                points.push((i64::from(x), i64::from(y)));
            }
        }

        let threshold = self.threshold as i32;
        let gap_limit = self.max_line_gap as i64;
        let min_length = i64::from(self.min_line_length);
        let mut rng = XorShift(VISIT_SEED);
        let mut segments = Vec::new();
        let mut remaining = points.len();

        while remaining > 0 {
            let pick = rng.below(remaining);
            let (px, py) = points[pick];
            points.swap(pick, remaining - 1);
            remaining -= 1;

            // Already consumed by an earlier segment.
            if !mask[(py * w + px) as usize] {
                continue;
            }

            let mut max_val = threshold - 1;
            let mut max_n = 0usize;
            for (n, &tab) in trig.iter().enumerate() {
                if let Some(r) = rho_bin(px, py, tab) {
                    let cell = &mut accumulator[n * num_rho + r];
                    *cell += 1;
                    if *cell > max_val {
                        max_val = *cell;
                        max_n = n;
                    }
                }
            }
            if max_val < threshold {
                continue;
            }

            // Step along the line direction in fixed point, one pixel per step
            // on the dominant axis.
            let (cos, sin) = trig[max_n];
            let a = -sin;
            let b = cos;
            let major_x = a.abs() > b.abs();
            let (x0, y0, dx0, dy0) = if major_x {
                let dx0 = if a > 0.0 { 1 } else { -1 };
                let dy0 = (b * (1i64 << SHIFT) as f64 / a.abs()).round() as i64;
                (px, (py << SHIFT) + (1 << (SHIFT - 1)), dx0, dy0)
            } else {
                let dy0 = if b > 0.0 { 1 } else { -1 };
                let dx0 = (a * (1i64 << SHIFT) as f64 / b.abs()).round() as i64;
                ((px << SHIFT) + (1 << (SHIFT - 1)), py, dx0, dy0)
            };
            let to_pixel = |x: i64, y: i64| {
                if major_x {
                    (x, y >> SHIFT)
                } else {
                    (x >> SHIFT, y)
                }
            };

            let mut ends = [(px, py); 2];
            for (k, end) in ends.iter_mut().enumerate() {
                let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
                let (mut x, mut y) = (x0, y0);
                let mut gap = 0;
                loop {
                    let (j, i) = to_pixel(x, y);
                    if j < 0 || j >= w || i < 0 || i >= h {
                        break;
                    }
                    if mask[(i * w + j) as usize] {
                        gap = 0;
                        *end = (j, i);
                    } else {
                        gap += 1;
                        if gap > gap_limit {
                            break;
                        }
                    }
                    x += dx;
                    y += dy;
                }
            }

            let good_line = (ends[1].0 - ends[0].0).abs() >= min_length
                || (ends[1].1 - ends[0].1).abs() >= min_length;

            // Second walk: clear the mask and, for accepted segments, take the
            // votes back out of the accumulator.
            for (k, &end) in ends.iter().enumerate() {
                let (dx, dy) = if k == 0 { (dx0, dy0) } else { (-dx0, -dy0) };
                let (mut x, mut y) = (x0, y0);
                loop {
                    let (j, i) = to_pixel(x, y);
                    if j < 0 || j >= w || i < 0 || i >= h {
                        break;
                    }
                    let idx = (i * w + j) as usize;
                    if mask[idx] {
                        if good_line {
                            for (n, &tab) in trig.iter().enumerate() {
                                if let Some(r) = rho_bin(j, i, tab) {
                                    accumulator[n * num_rho + r] -= 1;
                                }
                            }
                        }
                        mask[idx] = false;
                    }
                    if (j, i) == end {
                        break;
                    }
                    x += dx;
                    y += dy;
                }
            }

            if good_line {
                segments.push(LineSegment {
                    start: (ends[0].0 as i32, ends[0].1 as i32),
                    end: (ends[1].0 as i32, ends[1].1 as i32),
                });
            }
        }

        segments
    }
}

/// xorshift64 generator for the point-visiting order.
struct XorShift(u64);

impl XorShift {
    fn below(&mut self, bound: usize) -> usize {
        let mut s = self.0;
        s ^= s << 13;
        s ^= s >> 7;
        s ^= s << 17;
        self.0 = s;
        (s % bound as u64) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn edge_map(width: u32, height: u32, points: impl IntoIterator<Item = (u32, u32)>) -> GrayImage {
        let mut img = GrayImage::new(width, height);
        for (x, y) in points {
            img.put_pixel(x, y, Luma([255]));
        }
        img
    }

    #[test]
    fn empty_edge_map_has_no_segments() {
        let edges = GrayImage::new(120, 80);
        assert!(SegmentDetector::default().detect(&edges).is_empty());
    }

    #[test]
    fn long_horizontal_run_is_one_segment() {
        let edges = edge_map(300, 100, (20..240).map(|x| (x, 50)));
        let segments = SegmentDetector::default().detect(&edges);

        assert_eq!(segments.len(), 1);
        let segment = segments[0];
        assert!(segment.length() >= 200.0, "segment too short: {:?}", segment);
        assert!(segment.angle_degrees().abs() < 1e-9);
    }

    #[test]
    fn short_run_is_rejected() {
        let edges = edge_map(300, 100, (20..80).map(|x| (x, 50)));
        assert!(SegmentDetector::default().detect(&edges).is_empty());
    }

    #[test]
    fn small_gaps_are_bridged() {
        // 220 pixels with a 10 pixel hole in the middle.
        let points = (20..240).filter(|x| !(120..130).contains(x)).map(|x| (x, 40));
        let edges = edge_map(300, 100, points);
        let segments = SegmentDetector::default().detect(&edges);
        assert_eq!(segments.len(), 1);
        assert!(segments[0].length() >= 200.0);
    }

    #[test]
    fn angle_is_independent_of_endpoint_order() {
        let forward = LineSegment { start: (0, 0), end: (100, 5) };
        let backward = LineSegment { start: (100, 5), end: (0, 0) };
        assert_eq!(forward.angle_degrees(), backward.angle_degrees());
        assert!(forward.angle_degrees() > 0.0);
    }
}
