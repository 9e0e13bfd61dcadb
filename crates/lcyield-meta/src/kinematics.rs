//! Minimal four-vector algebra for the Λc → p h h phase space.
//!
//! Rotation and boost conventions follow the usual HEP ones: a rotation
//! built with `rotate_y` then `rotate_z` applies the y rotation first, and
//! `boost(b)` moves a vector into a frame travelling with velocity `-b`.

use std::ops::{Add, Sub};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn mag2(&self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn mag(&self) -> f64 {
        self.mag2().sqrt()
    }

    pub fn dot(&self, o: &Vec3) -> f64 {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    pub fn cross(&self, o: &Vec3) -> Vec3 {
        Vec3::new(
            self.y * o.z - self.z * o.y,
            self.z * o.x - self.x * o.z,
            self.x * o.y - self.y * o.x,
        )
    }

    /// Unit vector along `self`; a null vector is returned unchanged.
    pub fn unit(&self) -> Vec3 {
        let m = self.mag();
        if m > 0.0 {
            self.scale(1.0 / m)
        } else {
            *self
        }
    }

    pub fn scale(&self, k: f64) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }

    /// Polar angle to +z, in [0, pi].
    pub fn theta(&self) -> f64 {
        if self.mag2() == 0.0 {
            0.0
        } else {
            self.x.hypot(self.y).atan2(self.z)
        }
    }

    /// Azimuth around z, in (-pi, pi].
    pub fn phi(&self) -> f64 {
        if self.x == 0.0 && self.y == 0.0 {
            0.0
        } else {
            self.y.atan2(self.x)
        }
    }

    fn rotate_x(&self, angle: f64) -> Vec3 {
        let (s, c) = angle.sin_cos();
        Vec3::new(self.x, c * self.y - s * self.z, s * self.y + c * self.z)
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

/// 3x3 rotation, accumulated by left multiplication.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    m: [[f64; 3]; 3],
}

impl Default for Rotation {
    fn default() -> Self {
        Self {
            m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }
}

impl Rotation {
    fn then(self, r: [[f64; 3]; 3]) -> Self {
        let mut m = [[0.0; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| r[i][k] * self.m[k][j]).sum();
            }
        }
        Self { m }
    }

    pub fn rotate_y(self, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        self.then([[c, 0.0, s], [0.0, 1.0, 0.0], [-s, 0.0, c]])
    }

    pub fn rotate_z(self, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        self.then([[c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0]])
    }

    pub fn apply(&self, v: &Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0][0] * v.x + m[0][1] * v.y + m[0][2] * v.z,
            m[1][0] * v.x + m[1][1] * v.y + m[1][2] * v.z,
            m[2][0] * v.x + m[2][1] * v.y + m[2][2] * v.z,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LorentzVector {
    pub p: Vec3,
    pub e: f64,
}

impl LorentzVector {
    pub const fn new(px: f64, py: f64, pz: f64, e: f64) -> Self {
        Self {
            p: Vec3::new(px, py, pz),
            e,
        }
    }

    /// Invariant mass; negative for space-like vectors.
    pub fn m(&self) -> f64 {
        let m2 = self.e * self.e - self.p.mag2();
        if m2 < 0.0 {
            -(-m2).sqrt()
        } else {
            m2.sqrt()
        }
    }

    /// Velocity `p / E`.
    pub fn boost_vector(&self) -> Vec3 {
        self.p.scale(1.0 / self.e)
    }

    pub fn boost(&self, b: &Vec3) -> LorentzVector {
        let b2 = b.mag2();
        let gamma = 1.0 / (1.0 - b2).sqrt();
        let bp = b.dot(&self.p);
        let gamma2 = if b2 > 0.0 { (gamma - 1.0) / b2 } else { 0.0 };
        LorentzVector {
            p: self.p + b.scale(gamma2 * bp + gamma * self.e),
            e: gamma * (self.e + bp),
        }
    }

    pub fn transform(&self, r: &Rotation) -> LorentzVector {
        LorentzVector {
            p: r.apply(&self.p),
            e: self.e,
        }
    }

    pub fn rotate_x(&self, angle: f64) -> LorentzVector {
        LorentzVector {
            p: self.p.rotate_x(angle),
            e: self.e,
        }
    }
}

impl Add for LorentzVector {
    type Output = LorentzVector;

    fn add(self, o: LorentzVector) -> LorentzVector {
        LorentzVector {
            p: self.p + o.p,
            e: self.e + o.e,
        }
    }
}

/// Lab-frame four-momenta of one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DecayMomenta {
    pub lambdab: LorentzVector,
    pub lambdac: LorentzVector,
    pub proton: LorentzVector,
    pub h1: LorentzVector,
    pub h2: LorentzVector,
}

/// Two pair masses plus three angles describe the three-body phase space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseSpace {
    pub p_h1_m: f64,
    pub p_h2_m: f64,
    pub h1_h2_m: f64,
    /// Proton polar angle to the polarisation axis.
    pub proton_theta: f64,
    /// Proton azimuth around the polarisation axis, from the Λc flight direction.
    pub proton_phi: f64,
    /// Cosine between the proton-polarisation plane and the h1-h2 plane.
    pub cos_h1_h2_phi: f64,
}

impl DecayMomenta {
    /// Phase-space variables in the Λc rest frame, with the Λc flight
    /// direction along x and the polarisation axis `Λb x Λc` along z.
    pub fn phase_space(&self) -> PhaseSpace {
        let lc = self.lambdac.p;
        let alpha = lc.z.atan2(lc.x);
        let beta = -(lc.y / lc.mag()).asin();
        let rotation = Rotation::default().rotate_y(alpha).rotate_z(beta);

        let rotated = [self.lambdab, self.lambdac, self.proton, self.h1, self.h2]
            .map(|v| v.transform(&rotation));
        let boost = rotated[1].boost_vector().scale(-1.0);
        let rest = rotated.map(|v| v.boost(&boost));

        let pol = rest[0].p.cross(&rest[1].p);
        let gamma = pol.y.atan2(pol.z);
        let [_, _, proton, h1, h2] = rest.map(|v| v.rotate_x(gamma));
        let pol = pol.rotate_x(gamma);

        let proton_pol_norm = proton.p.cross(&pol).unit();
        let h1_h2_norm = h1.p.cross(&h2.p).unit();

        PhaseSpace {
            p_h1_m: (self.proton + self.h1).m(),
            p_h2_m: (self.proton + self.h2).m(),
            h1_h2_m: (self.h1 + self.h2).m(),
            proton_theta: proton.p.theta(),
            proton_phi: proton.p.phi(),
            cos_h1_h2_phi: proton_pol_norm.dot(&h1_h2_norm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn on_shell(px: f64, py: f64, pz: f64, m: f64) -> LorentzVector {
        let e = (px * px + py * py + pz * pz + m * m).sqrt();
        LorentzVector::new(px, py, pz, e)
    }

    fn candidate() -> DecayMomenta {
        let proton = on_shell(3000.0, 400.0, 40000.0, 938.272);
        let h1 = on_shell(1500.0, -300.0, 20000.0, 493.677);
        let h2 = on_shell(800.0, 200.0, 15000.0, 139.570);
        let lambdac = proton + h1 + h2;
        let mu = on_shell(1200.0, 900.0, 25000.0, 105.658);
        DecayMomenta {
            lambdab: lambdac + mu,
            lambdac,
            proton,
            h1,
            h2,
        }
    }

    #[test]
    fn mass_of_particle_at_rest() {
        let v = LorentzVector::new(0.0, 0.0, 0.0, 2286.46);
        assert_eq!(v.m(), 2286.46);
        assert!(LorentzVector::new(3.0, 0.0, 0.0, 1.0).m() < 0.0);
    }

    #[test]
    fn boost_to_rest_frame() {
        let v = on_shell(1000.0, -2000.0, 30000.0, 2286.46);
        let rest = v.boost(&v.boost_vector().scale(-1.0));
        assert!(rest.p.mag() < 1e-6);
        assert!((rest.e - 2286.46).abs() < 1e-6);
    }

    #[test]
    fn rotation_aligns_with_x() {
        let lc = Vec3::new(1000.0, -2000.0, 30000.0);
        let alpha = lc.z.atan2(lc.x);
        let beta = -(lc.y / lc.mag()).asin();
        let r = Rotation::default().rotate_y(alpha).rotate_z(beta);
        let aligned = r.apply(&lc);
        assert!((aligned.x - lc.mag()).abs() < 1e-6);
        assert!(aligned.y.abs() < 1e-6);
        assert!(aligned.z.abs() < 1e-6);
    }

    #[test]
    fn rotations_compose_in_call_order() {
        let r = Rotation::default()
            .rotate_y(std::f64::consts::FRAC_PI_2)
            .rotate_z(std::f64::consts::FRAC_PI_2);
        // x -> -z under the y rotation; z is fixed by the z rotation
        let v = r.apply(&Vec3::new(1.0, 0.0, 0.0));
        assert!((v.z + 1.0).abs() < EPS);
        assert!(v.x.abs() < EPS && v.y.abs() < EPS);
    }

    #[test]
    fn pair_masses_are_frame_independent() {
        let c = candidate();
        let ps = c.phase_space();
        assert!((ps.p_h1_m - (c.proton + c.h1).m()).abs() < EPS);
        assert!(ps.h1_h2_m > 493.677 + 139.570);
        assert!(ps.p_h2_m > 938.272 + 139.570);
    }

    #[test]
    fn angles_are_in_range() {
        let ps = candidate().phase_space();
        assert!((0.0..=std::f64::consts::PI).contains(&ps.proton_theta));
        assert!(ps.proton_phi.abs() <= std::f64::consts::PI);
        assert!(ps.cos_h1_h2_phi.abs() <= 1.0 + EPS);
    }

    #[test]
    fn daughters_balance_in_rest_frame() {
        let c = candidate();
        let lc = c.lambdac.p;
        let r = Rotation::default()
            .rotate_y(lc.z.atan2(lc.x))
            .rotate_z(-(lc.y / lc.mag()).asin());
        let b = c.lambdac.transform(&r).boost_vector().scale(-1.0);
        let sum = [c.proton, c.h1, c.h2]
            .map(|v| v.transform(&r).boost(&b).p)
            .into_iter()
            .fold(Vec3::default(), |a, v| a + v);
        assert!(sum.mag() < 1e-6);
    }
}
