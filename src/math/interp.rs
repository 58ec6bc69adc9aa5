use crate::error::{PhError, Result};

/// Piecewise-linear interpolation of `(xs, ys)` at each point of `at`.
///
/// `xs` must be increasing; points outside `[xs[0], xs[last]]` are rejected.
pub fn interp_linear(xs: &[f64], ys: &[f64], at: &[f64]) -> Result<Vec<f64>> {
    if xs.len() != ys.len() {
        return Err(PhError::DimensionMismatch { context: "interpolation", expected: xs.len(), found: ys.len() });
    }
    let (first, last) = match (xs.first(), xs.last()) {
        (Some(f), Some(l)) => (*f, *l),
        _ => return Err(PhError::parameter("cannot interpolate an empty series")),
    };

    let mut out = Vec::with_capacity(at.len());
    let mut j = 0;
    for &x in at {
        if x < first || x > last {
            return Err(PhError::parameter(format!("{x} outside interpolation range [{first}, {last}]")));
        }
        // `at` is usually sorted, so the cursor only moves forward
        if x < xs[j] {
            j = 0;
        }
        while j + 1 < xs.len() && xs[j + 1] < x {
            j += 1;
        }
        if j + 1 == xs.len() || xs[j] == x {
            out.push(ys[j]);
            continue;
        }
        let (x0, x1) = (xs[j], xs[j + 1]);
        let w = (x - x0) / (x1 - x0);
        out.push(ys[j] + w * (ys[j + 1] - ys[j]));
    }
    Ok(out)
}
