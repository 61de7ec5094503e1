//! Stage G: periodic 4-D gradient noise stack generation (spec.md §4.1).
//!
//! Time is mapped onto an angle and then onto a circle in two auxiliary
//! noise dimensions, so that evaluating 4-D noise along that circle produces
//! a stack whose first and (conceptual) `T`-th frame coincide without ever
//! reversing time. The noise itself is a classical permutation-table
//! gradient noise (not the simplex lattice): a 256-entry table seeded per
//! instance, fade-interpolated corners of the enclosing 4-D hypercube. Its
//! magnitude is bounded below `sqrt(4) / 2 = 1.0`, usually well under it,
//! matching spec.md §9's design note.

use funutd::Rnd;
use rayon::prelude::*;
use std::f64::consts::PI;

use crate::stack::Stack;

const PERM_SIZE: usize = 256;

/// 32 edge directions of the 4-D hypercube, the classical gradient set for
/// 4-D Perlin-family noise (three components are +-1, one is 0).
const GRAD4: [[i8; 4]; 32] = [
    [0, 1, 1, 1],
    [0, 1, 1, -1],
    [0, 1, -1, 1],
    [0, 1, -1, -1],
    [0, -1, 1, 1],
    [0, -1, 1, -1],
    [0, -1, -1, 1],
    [0, -1, -1, -1],
    [1, 0, 1, 1],
    [1, 0, 1, -1],
    [1, 0, -1, 1],
    [1, 0, -1, -1],
    [-1, 0, 1, 1],
    [-1, 0, 1, -1],
    [-1, 0, -1, 1],
    [-1, 0, -1, -1],
    [1, 1, 0, 1],
    [1, 1, 0, -1],
    [1, -1, 0, 1],
    [1, -1, 0, -1],
    [-1, 1, 0, 1],
    [-1, 1, 0, -1],
    [-1, -1, 0, 1],
    [-1, -1, 0, -1],
    [1, 1, 1, 0],
    [1, 1, -1, 0],
    [1, -1, 1, 0],
    [1, -1, -1, 0],
    [-1, 1, 1, 0],
    [-1, 1, -1, 0],
    [-1, -1, 1, 0],
    [-1, -1, -1, 0],
];

/// A seeded permutation table backing the 4-D gradient noise. Pure data, no
/// interior mutability: evaluating the same point with the same table always
/// returns the same value.
#[derive(Clone)]
pub struct GradientNoise4 {
    perm: [u8; PERM_SIZE * 2],
}

impl GradientNoise4 {
    /// Build a permutation table deterministically from `seed`.
    pub fn new(seed: u64) -> Self {
        let mut table: [u8; PERM_SIZE] = [0; PERM_SIZE];
        for (i, slot) in table.iter_mut().enumerate() {
            *slot = i as u8;
        }

        let mut rnd = Rnd::from_u64(seed);
        for i in (1..PERM_SIZE).rev() {
            let j = (rnd.u64() as usize) % (i + 1);
            table.swap(i, j);
        }

        let mut perm = [0u8; PERM_SIZE * 2];
        for (i, slot) in perm.iter_mut().enumerate() {
            *slot = table[i % PERM_SIZE];
        }
        Self { perm }
    }

    #[inline]
    fn hash4(&self, ix: i64, iy: i64, iz: i64, iw: i64) -> usize {
        let h = self.perm[(ix as u8 as usize + self.perm[iy as u8 as usize] as usize)
            & (PERM_SIZE * 2 - 1)];
        let h =
            self.perm[(h as usize + self.perm[iz as u8 as usize] as usize) & (PERM_SIZE * 2 - 1)];
        let h =
            self.perm[(h as usize + self.perm[iw as u8 as usize] as usize) & (PERM_SIZE * 2 - 1)];
        (h as usize) & 31
    }

    #[inline]
    fn grad_dot(hash: usize, x: f64, y: f64, z: f64, w: f64) -> f64 {
        let g = GRAD4[hash];
        g[0] as f64 * x + g[1] as f64 * y + g[2] as f64 * z + g[3] as f64 * w
    }

    #[inline]
    fn fade(t: f64) -> f64 {
        t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
    }

    #[inline]
    fn lerp(a: f64, b: f64, t: f64) -> f64 {
        a + t * (b - a)
    }

    /// Evaluate the noise field at a single 4-D point. Value lies in
    /// `[-1, 1]`, typically well within it (see the module doc).
    pub fn eval(&self, x: f64, y: f64, z: f64, w: f64) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let z0 = z.floor();
        let w0 = w.floor();

        let ix = x0 as i64;
        let iy = y0 as i64;
        let iz = z0 as i64;
        let iw = w0 as i64;

        let fx = x - x0;
        let fy = y - y0;
        let fz = z - z0;
        let fw = w - w0;

        let u = Self::fade(fx);
        let v = Self::fade(fy);
        let t = Self::fade(fz);
        let s = Self::fade(fw);

        let mut corners = [0f64; 16];
        for (i, corner) in corners.iter_mut().enumerate() {
            let dx = (i & 1) as i64;
            let dy = ((i >> 1) & 1) as i64;
            let dz = ((i >> 2) & 1) as i64;
            let dw = ((i >> 3) & 1) as i64;
            let h = self.hash4(ix + dx, iy + dy, iz + dz, iw + dw);
            *corner = Self::grad_dot(
                h,
                fx - dx as f64,
                fy - dy as f64,
                fz - dz as f64,
                fw - dw as f64,
            );
        }

        // Trilinear-in-4D interpolation across the 16 hypercube corners.
        let mut lerp_w = [0f64; 8];
        for (i, slot) in lerp_w.iter_mut().enumerate() {
            *slot = Self::lerp(corners[i], corners[i + 8], s);
        }
        let mut lerp_z = [0f64; 4];
        for (i, slot) in lerp_z.iter_mut().enumerate() {
            *slot = Self::lerp(lerp_w[i], lerp_w[i + 4], t);
        }
        let mut lerp_y = [0f64; 2];
        for (i, slot) in lerp_y.iter_mut().enumerate() {
            *slot = Self::lerp(lerp_z[i], lerp_z[i + 2], v);
        }
        Self::lerp(lerp_y[0], lerp_y[1], u)
    }
}

/// Generate a periodic noise stack `img[t, y, x]`, values in `[-1, 1]`,
/// deterministic given `seed`. Time is mapped onto a circle of radius
/// `n_frames * t_step / (2*pi)` in two auxiliary dimensions, so frame `0` and
/// the conceptual frame `n_frames` agree exactly (spec.md §4.1).
pub fn looping_animated_stack(
    n_frames: usize,
    n_pixels: usize,
    t_step: f64,
    x_step: f64,
    seed: u64,
) -> Stack {
    let noise = GradientNoise4::new(seed);
    let radius = n_frames as f64 * t_step / (2.0 * PI);
    let mut stack = Stack::zeros(n_frames, n_pixels, n_pixels);

    stack
        .par_frames_mut()
        .enumerate()
        .for_each(|(t, frame)| {
            let theta = 2.0 * PI * t as f64 / n_frames as f64;
            let u = radius * theta.sin();
            let w = radius * theta.cos();
            for y in 0..n_pixels {
                for x in 0..n_pixels {
                    frame[y * n_pixels + x] =
                        noise.eval(x as f64 * x_step, y as f64 * x_step, u, w) as f32;
                }
            }
        });

    stack
}
