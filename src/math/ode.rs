use serde::{Deserialize, Serialize};

use crate::error::{PhError, Result};

/// Right-hand side of `dy/dt = f(t, y)`.
pub trait OdeSystem {
    fn ndim(&self) -> usize;

    /// Writes `f(t, y)` into `dy`. Both slices have length `ndim()`.
    fn deriv(&self, t: f64, y: &[f64], dy: &mut [f64]);
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SolverConfig {
    /// Adaptive Dormand–Prince 4(5).
    Dopri5 { rtol: f64, atol: f64, max_steps: usize },
    /// Classic RK4 with `substeps` equal steps between consecutive grid points.
    Rk4 { substeps: usize },
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig::Dopri5 { rtol: 1e-8, atol: 1e-12, max_steps: 1_000_000 }
    }
}

impl SolverConfig {
    pub fn check(&self) -> Result<()> {
        match *self {
            SolverConfig::Dopri5 { rtol, atol, max_steps } => {
                if !(rtol.is_finite() && rtol > 0.0) || !(atol.is_finite() && atol > 0.0) {
                    return Err(PhError::parameter("solver tolerances must be finite and > 0"));
                }
                if max_steps == 0 {
                    return Err(PhError::parameter("max_steps must be > 0"));
                }
            }
            SolverConfig::Rk4 { substeps } => {
                if substeps == 0 {
                    return Err(PhError::parameter("rk4 substeps must be >= 1"));
                }
            }
        }
        Ok(())
    }
}

/// Workspace for allocation-free RK4 steps
pub struct Rk4Workspace {
    pub k1: Vec<f64>,
    pub k2: Vec<f64>,
    pub k3: Vec<f64>,
    pub k4: Vec<f64>,
    pub ytmp: Vec<f64>,
}

impl Rk4Workspace {
    pub fn new(n: usize) -> Self {
        Self {
            k1: vec![0.0; n],
            k2: vec![0.0; n],
            k3: vec![0.0; n],
            k4: vec![0.0; n],
            ytmp: vec![0.0; n],
        }
    }
}

/// One fixed RK4 step of size `dt`, in place.
pub fn rk4_step<S: OdeSystem + ?Sized>(sys: &S, y: &mut [f64], t: f64, dt: f64, ws: &mut Rk4Workspace) {
    let n = y.len();
    let (k1, k2, k3, k4, ytmp) = (&mut ws.k1, &mut ws.k2, &mut ws.k3, &mut ws.k4, &mut ws.ytmp);

    sys.deriv(t, y, k1);

    for i in 0..n {
        ytmp[i] = y[i] + 0.5 * dt * k1[i];
    }
    sys.deriv(t + 0.5 * dt, ytmp, k2);

    for i in 0..n {
        ytmp[i] = y[i] + 0.5 * dt * k2[i];
    }
    sys.deriv(t + 0.5 * dt, ytmp, k3);

    for i in 0..n {
        ytmp[i] = y[i] + dt * k3[i];
    }
    sys.deriv(t + dt, ytmp, k4);

    for i in 0..n {
        y[i] += (dt / 6.0) * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
    }
}

// Dormand–Prince tableau
const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th-order weights (advancing solution)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// y5 - y4
const E1: f64 = B1 - 5179.0 / 57600.0;
const E3: f64 = B3 - 7571.0 / 16695.0;
const E4: f64 = B4 - 393.0 / 640.0;
const E5: f64 = B5 - (-92097.0 / 339200.0);
const E6: f64 = B6 - 187.0 / 2100.0;
const E7: f64 = -1.0 / 40.0;

const H_MIN: f64 = 1e-12;

struct Dopri5<'a, S: OdeSystem + ?Sized> {
    sys: &'a S,
    rtol: f64,
    atol: f64,
    max_steps: usize,
    steps: usize,
    h: f64,
    k: [Vec<f64>; 7],
    ytmp: Vec<f64>,
    ynew: Vec<f64>,
}

impl<'a, S: OdeSystem + ?Sized> Dopri5<'a, S> {
    fn new(sys: &'a S, rtol: f64, atol: f64, max_steps: usize, h0: f64) -> Self {
        let n = sys.ndim();
        Self {
            sys,
            rtol,
            atol,
            max_steps,
            steps: 0,
            h: h0,
            k: std::array::from_fn(|_| vec![0.0; n]),
            ytmp: vec![0.0; n],
            ynew: vec![0.0; n],
        }
    }

    /// Advances `y` from `t` to exactly `t_end`.
    fn advance(&mut self, y: &mut [f64], mut t: f64, t_end: f64) -> Result<()> {
        let n = y.len();
        self.sys.deriv(t, y, &mut self.k[0]);
        while t < t_end {
            if self.steps >= self.max_steps {
                return Err(PhError::Integration(format!(
                    "exceeded max_steps={} at t={t:.6e}",
                    self.max_steps
                )));
            }
            self.steps += 1;

            let remaining = t_end - t;
            let last = self.h >= remaining;
            let h = if last { remaining } else { self.h };

            let [k1, k2, k3, k4, k5, k6, k7] = &mut self.k;
            let ytmp = &mut self.ytmp;
            let ynew = &mut self.ynew;

            for i in 0..n {
                ytmp[i] = y[i] + h * A21 * k1[i];
            }
            self.sys.deriv(t + h / 5.0, ytmp, k2);
            for i in 0..n {
                ytmp[i] = y[i] + h * (A31 * k1[i] + A32 * k2[i]);
            }
            self.sys.deriv(t + 3.0 * h / 10.0, ytmp, k3);
            for i in 0..n {
                ytmp[i] = y[i] + h * (A41 * k1[i] + A42 * k2[i] + A43 * k3[i]);
            }
            self.sys.deriv(t + 4.0 * h / 5.0, ytmp, k4);
            for i in 0..n {
                ytmp[i] = y[i] + h * (A51 * k1[i] + A52 * k2[i] + A53 * k3[i] + A54 * k4[i]);
            }
            self.sys.deriv(t + 8.0 * h / 9.0, ytmp, k5);
            for i in 0..n {
                ytmp[i] = y[i]
                    + h * (A61 * k1[i] + A62 * k2[i] + A63 * k3[i] + A64 * k4[i] + A65 * k5[i]);
            }
            self.sys.deriv(t + h, ytmp, k6);
            for i in 0..n {
                ynew[i] = y[i] + h * (B1 * k1[i] + B3 * k3[i] + B4 * k4[i] + B5 * k5[i] + B6 * k6[i]);
            }
            // FSAL
            self.sys.deriv(t + h, ynew, k7);

            let mut err = 0.0;
            for i in 0..n {
                let e = h * (E1 * k1[i] + E3 * k3[i] + E4 * k4[i] + E5 * k5[i] + E6 * k6[i] + E7 * k7[i]);
                let sc = self.atol + self.rtol * y[i].abs().max(ynew[i].abs());
                err += (e / sc) * (e / sc);
            }
            err = (err / n as f64).sqrt();
            if !err.is_finite() {
                return Err(PhError::Integration(format!("non-finite error estimate at t={t:.6e}")));
            }

            if err <= 1.0 {
                t = if last { t_end } else { t + h };
                y.copy_from_slice(ynew);
                std::mem::swap(k1, k7);
            }

            let factor = if err == 0.0 { 5.0 } else { (0.9 * err.powf(-0.2)).clamp(0.2, 5.0) };
            // a truncated final step should not shrink the step carried to the next interval
            if !(last && err <= 1.0) {
                self.h = h * factor;
            }
            if self.h < H_MIN {
                return Err(PhError::Integration(format!(
                    "step size underflow (h={:.3e}) at t={t:.6e}",
                    self.h
                )));
            }
        }
        Ok(())
    }
}

/// Integrates `sys` from `grid[0]` and returns the state at every grid time.
///
/// `grid` must be strictly increasing. The solver always lands exactly on each
/// grid point; the result has `grid.len()` rows.
pub fn integrate_on_grid<S: OdeSystem + ?Sized>(
    sys: &S,
    y0: &[f64],
    grid: &[f64],
    solver: &SolverConfig,
) -> Result<Vec<Vec<f64>>> {
    solver.check()?;
    let n = sys.ndim();
    if y0.len() != n {
        return Err(PhError::DimensionMismatch { context: "initial state", expected: n, found: y0.len() });
    }
    if grid.is_empty() {
        return Ok(Vec::new());
    }
    if grid.len() == 1 {
        return Ok(vec![y0.to_vec()]);
    }
    if grid.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(PhError::parameter("time grid must be strictly increasing"));
    }

    let mut out = Vec::with_capacity(grid.len());
    let mut y = y0.to_vec();
    out.push(y.clone());

    match *solver {
        SolverConfig::Rk4 { substeps } => {
            let mut ws = Rk4Workspace::new(n);
            for w in grid.windows(2) {
                let dt = (w[1] - w[0]) / substeps as f64;
                let mut t = w[0];
                for _ in 0..substeps {
                    rk4_step(sys, &mut y, t, dt, &mut ws);
                    t += dt;
                }
                if y.iter().any(|v| !v.is_finite()) {
                    return Err(PhError::Integration(format!("non-finite state at t={:.6e}", w[1])));
                }
                out.push(y.clone());
            }
        }
        SolverConfig::Dopri5 { rtol, atol, max_steps } => {
            let h0 = ((grid[1] - grid[0]) * 0.1).max(H_MIN * 10.0);
            let mut stepper = Dopri5::new(sys, rtol, atol, max_steps, h0);
            for w in grid.windows(2) {
                stepper.advance(&mut y, w[0], w[1])?;
                out.push(y.clone());
            }
            tracing::debug!(steps = stepper.steps, "dopri5 finished");
        }
    }
    Ok(out)
}
