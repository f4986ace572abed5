//! Seeded 3-D lattice noise used by the flow field.
//!
//! Classic creative-coding "Perlin" noise: a 4096-entry table of random values,
//! cosine-smoothed lattice interpolation, and four octaves with 0.5 falloff.
//! Output lies in `[0, 1)`.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const LATTICE_MASK: i64 = 4095;
const Y_WRAP: i64 = 1 << 4;
const Z_WRAP: i64 = 1 << 8;

#[derive(Clone, Debug)]
pub struct NoiseField {
    seed: u64,
    lattice: Vec<f64>,
    octaves: u32,
    falloff: f64,
}

impl NoiseField {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let lattice = (0..=LATTICE_MASK).map(|_| rng.gen::<f64>()).collect();
        Self {
            seed,
            lattice,
            octaves: 4,
            falloff: 0.5,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    #[inline]
    fn at(&self, offset: i64) -> f64 {
        self.lattice[(offset & LATTICE_MASK) as usize]
    }

    #[inline]
    fn near(&self, base: i64, delta: i64) -> f64 {
        self.at(base.wrapping_add(delta))
    }

    /// Samples the field. Negative coordinates are mirrored.
    pub fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        let (x, y, z) = (x.abs(), y.abs(), z.abs());
        let (mut xi, mut yi, mut zi) = (x.floor() as i64, y.floor() as i64, z.floor() as i64);
        let (mut xf, mut yf, mut zf) = (x - xi as f64, y - yi as f64, z - zi as f64);

        let mut total = 0.0;
        let mut amplitude = 0.5;

        for _ in 0..self.octaves {
            let mut of = xi
                .wrapping_add(yi.wrapping_shl(4))
                .wrapping_add(zi.wrapping_shl(8));

            let rxf = scaled_cosine(xf);
            let ryf = scaled_cosine(yf);

            let mut n1 = self.at(of);
            n1 += rxf * (self.near(of, 1) - n1);
            let mut n2 = self.near(of, Y_WRAP);
            n2 += rxf * (self.near(of, Y_WRAP + 1) - n2);
            n1 += ryf * (n2 - n1);

            of = of.wrapping_add(Z_WRAP);
            n2 = self.at(of);
            n2 += rxf * (self.near(of, 1) - n2);
            let mut n3 = self.near(of, Y_WRAP);
            n3 += rxf * (self.near(of, Y_WRAP + 1) - n3);
            n2 += ryf * (n3 - n2);

            n1 += scaled_cosine(zf) * (n2 - n1);

            total += n1 * amplitude;
            amplitude *= self.falloff;

            xi = xi.wrapping_shl(1);
            xf *= 2.0;
            yi = yi.wrapping_shl(1);
            yf *= 2.0;
            zi = zi.wrapping_shl(1);
            zf *= 2.0;

            if xf >= 1.0 {
                xi += 1;
                xf -= 1.0;
            }
            if yf >= 1.0 {
                yi += 1;
                yf -= 1.0;
            }
            if zf >= 1.0 {
                zi += 1;
                zf -= 1.0;
            }
        }

        total
    }
}

fn scaled_cosine(i: f64) -> f64 {
    0.5 * (1.0 - (i * std::f64::consts::PI).cos())
}
