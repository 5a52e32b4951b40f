//! Dense single-variable polynomials with real coefficients

use std::ops::{Add, Mul, Neg, Sub};

/// Highest degree the solver accepts
pub const MAX_DEGREE: usize = 12;

const DK_MAX_ITERATIONS: usize = 500;
const DK_TOLERANCE: f64 = 1e-12;
const IMAG_TOLERANCE: f64 = 1e-4;
const ROOT_MERGE_TOLERANCE: f64 = 1e-9;
const NEWTON_ITERATIONS: usize = 60;

/// A sum smaller than this fraction of its operands' magnitude is rounding noise
const CANCELLATION_EPS: f64 = 1e-12;

/// `coeffs[i]` is the coefficient of `x^i`
#[derive(Debug, Clone, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    pub fn constant(value: f64) -> Self {
        Self { coeffs: vec![value] }.trimmed()
    }

    /// The polynomial `x`
    pub fn variable() -> Self {
        Self {
            coeffs: vec![0.0, 1.0],
        }
    }

    pub fn from_coeffs(coeffs: Vec<f64>) -> Self {
        Self { coeffs }.trimmed()
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Degree, with the zero polynomial reported as 0
    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// True if every coefficient is a finite number
    pub fn is_finite(&self) -> bool {
        self.coeffs.iter().all(|c| c.is_finite())
    }

    /// Constant value if the polynomial has degree 0
    pub fn as_constant(&self) -> Option<f64> {
        match self.coeffs.len() {
            0 => Some(0.0),
            1 => Some(self.coeffs[0]),
            _ => None,
        }
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self::from_coeffs(self.coeffs.iter().map(|c| c * factor).collect())
    }

    pub fn pow(&self, exponent: u32) -> Self {
        let mut result = Polynomial::constant(1.0);
        for _ in 0..exponent {
            result = &result * self;
        }
        result
    }

    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    fn derivative(&self) -> Self {
        Self::from_coeffs(
            self.coeffs
                .iter()
                .enumerate()
                .skip(1)
                .map(|(i, c)| c * i as f64)
                .collect(),
        )
    }

    /// Drop leading coefficients that are exactly zero
    ///
    /// Magnitudes are never compared across coefficients: `x + 1e12` keeps
    /// its `x`. Cancellation noise is zeroed where it arises, in `Add`/`Mul`.
    fn trimmed(mut self) -> Self {
        while self.coeffs.last() == Some(&0.0) {
            self.coeffs.pop();
        }
        self
    }

    /// Real roots, sorted ascending and merged when numerically equal.
    ///
    /// Must only be called on a non-constant polynomial.
    pub fn real_roots(&self) -> Vec<f64> {
        let mut roots = Vec::new();

        // Factor out x^k so zero roots are exact
        let zeros = self.coeffs.iter().take_while(|c| **c == 0.0).count();
        if zeros > 0 {
            roots.push(0.0);
        }
        let reduced = Polynomial::from_coeffs(self.coeffs[zeros..].to_vec());

        match reduced.degree() {
            0 => {}
            1 => roots.push(-reduced.coeffs[0] / reduced.coeffs[1]),
            2 => roots.extend(quadratic_roots(
                reduced.coeffs[2],
                reduced.coeffs[1],
                reduced.coeffs[0],
            )),
            _ => roots.extend(reduced.numeric_real_roots()),
        }

        roots.retain(|r| r.is_finite());
        roots.sort_by(|a, b| a.total_cmp(b));
        roots.dedup_by(|a, b| (*a - *b).abs() <= ROOT_MERGE_TOLERANCE * a.abs().max(b.abs()));
        roots
    }

    /// Durand-Kerner over the complex plane, keeping near-real roots
    fn numeric_real_roots(&self) -> Vec<f64> {
        let n = self.degree();
        let lead = self.coeffs[n];
        let monic: Vec<f64> = self.coeffs.iter().map(|c| c / lead).collect();

        // Seeds spread on a circle enclosing every root
        let radius = root_bound(&monic);
        let mut z: Vec<Complex> = (0..n)
            .map(|k| {
                let angle = 2.0 * std::f64::consts::PI * k as f64 / n as f64 + 0.4;
                Complex::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect();

        for _ in 0..DK_MAX_ITERATIONS {
            let mut max_delta: f64 = 0.0;
            for i in 0..n {
                let mut denom = Complex::new(1.0, 0.0);
                for (j, zj) in z.iter().enumerate() {
                    if i != j {
                        denom = denom.mul(z[i].sub(*zj));
                    }
                }
                let delta = eval_complex(&monic, z[i]).div(denom);
                z[i] = z[i].sub(delta);
                let magnitude = z[i].norm();
                let relative = if magnitude > 0.0 {
                    delta.norm() / magnitude
                } else {
                    delta.norm()
                };
                max_delta = max_delta.max(relative);
            }
            if max_delta < DK_TOLERANCE {
                break;
            }
        }

        let derivative = self.derivative();
        z.into_iter()
            .filter(|r| r.im.abs() <= IMAG_TOLERANCE * r.norm())
            .map(|r| self.polish(&derivative, r.re))
            .collect()
    }

    /// Newton refinement of a real root estimate
    fn polish(&self, derivative: &Polynomial, mut x: f64) -> f64 {
        for _ in 0..NEWTON_ITERATIONS {
            let d = derivative.eval(x);
            if d == 0.0 {
                break;
            }
            let step = self.eval(x) / d;
            if !step.is_finite() {
                break;
            }
            x -= step;
            if step.abs() < 1e-15 {
                break;
            }
        }
        x
    }
}

/// Upper bound on root magnitudes of a monic polynomial (Fujiwara)
fn root_bound(monic: &[f64]) -> f64 {
    let n = monic.len() - 1;
    let bound = (0..n)
        .map(|i| {
            let c = monic[i].abs();
            if i == 0 {
                (c / 2.0).powf(1.0 / n as f64)
            } else {
                c.powf(1.0 / (n - i) as f64)
            }
        })
        .fold(0.0_f64, f64::max);
    if bound > 0.0 {
        2.0 * bound
    } else {
        1.0
    }
}

fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    let discriminant = b * b - 4.0 * a * c;
    // Relative to the terms of the discriminant, never to an absolute scale
    let tolerance = CANCELLATION_EPS * (b * b).max((4.0 * a * c).abs());

    if discriminant < -tolerance {
        return Vec::new();
    }
    if discriminant.abs() <= tolerance {
        return vec![-b / (2.0 * a)];
    }

    // Numerically stable form avoids cancellation when b^2 >> 4ac
    let sign = if b < 0.0 { -1.0 } else { 1.0 };
    let q = -0.5 * (b + sign * discriminant.sqrt());
    vec![q / a, c / q]
}

fn eval_complex(coeffs: &[f64], z: Complex) -> Complex {
    coeffs
        .iter()
        .rev()
        .fold(Complex::new(0.0, 0.0), |acc, c| acc.mul(z).add(Complex::new(*c, 0.0)))
}

#[derive(Debug, Clone, Copy)]
struct Complex {
    re: f64,
    im: f64,
}

impl Complex {
    fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    fn add(self, o: Self) -> Self {
        Self::new(self.re + o.re, self.im + o.im)
    }

    fn sub(self, o: Self) -> Self {
        Self::new(self.re - o.re, self.im - o.im)
    }

    fn mul(self, o: Self) -> Self {
        Self::new(
            self.re * o.re - self.im * o.im,
            self.re * o.im + self.im * o.re,
        )
    }

    fn div(self, o: Self) -> Self {
        let d = o.re * o.re + o.im * o.im;
        if d == 0.0 {
            return Self::new(0.0, 0.0);
        }
        Self::new(
            (self.re * o.re + self.im * o.im) / d,
            (self.im * o.re - self.re * o.im) / d,
        )
    }

    fn norm(self) -> f64 {
        self.re.hypot(self.im)
    }
}

/// Zero a sum that cancelled down to rounding noise of its operands
fn cancel_noise(sum: f64, operand_magnitude: f64) -> f64 {
    if sum.is_finite() && sum.abs() <= CANCELLATION_EPS * operand_magnitude {
        0.0
    } else {
        sum
    }
}

impl Add for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Polynomial {
        let len = self.coeffs.len().max(rhs.coeffs.len());
        let coeffs = (0..len)
            .map(|i| {
                let a = self.coeffs.get(i).copied().unwrap_or(0.0);
                let b = rhs.coeffs.get(i).copied().unwrap_or(0.0);
                cancel_noise(a + b, a.abs().max(b.abs()))
            })
            .collect();
        Polynomial::from_coeffs(coeffs)
    }
}

impl Sub for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &Polynomial) -> Polynomial {
        self + &(-rhs)
    }
}

impl Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        self.scale(-1.0)
    }
}

impl Mul for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &Polynomial) -> Polynomial {
        if self.is_zero() || rhs.is_zero() {
            return Polynomial::from_coeffs(Vec::new());
        }
        let len = self.coeffs.len() + rhs.coeffs.len() - 1;
        let mut coeffs = vec![0.0; len];
        let mut magnitudes = vec![0.0_f64; len];
        for (i, a) in self.coeffs.iter().enumerate() {
            for (j, b) in rhs.coeffs.iter().enumerate() {
                coeffs[i + j] += a * b;
                magnitudes[i + j] = magnitudes[i + j].max((a * b).abs());
            }
        }
        let coeffs = coeffs
            .into_iter()
            .zip(magnitudes)
            .map(|(c, m)| cancel_noise(c, m))
            .collect();
        Polynomial::from_coeffs(coeffs)
    }
}
