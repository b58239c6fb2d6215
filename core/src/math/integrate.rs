//! Adaptive Simpson quadrature.

/// Integrate `f` over `[a, b]` to within `tolerance`.
///
/// The per-interval tolerance is halved at each split but never drops below
/// `f64::EPSILON` relative to the first estimate, and intervals narrower than
/// `f64::EPSILON * (b - a)` are accepted as they are. Together these let
/// integrable endpoint singularities such as `sqrt(x)` at zero converge.
///
/// Returns `None` when the recursion depth is exhausted before the error
/// estimate falls below tolerance, or when the integrand produces a
/// non-finite value.
pub fn adaptive_simpson<F>(f: F, a: f64, b: f64, tolerance: f64, max_depth: u32) -> Option<f64>
where
    F: Fn(f64) -> f64,
{
    if !(a.is_finite() && b.is_finite()) {
        return None;
    }
    if a == b {
        return Some(0.0);
    }
    let fa = f(a);
    let fb = f(b);
    let m = 0.5 * (a + b);
    let fm = f(m);
    let whole = simpson(a, b, fa, fm, fb);
    let limits = Limits {
        tolerance_floor: f64::EPSILON * whole.abs(),
        min_width: f64::EPSILON * (b - a).abs(),
    };
    let interval = Interval { a, b, fa, fm, fb, whole };
    recurse(&f, interval, tolerance, max_depth, &limits)
}

struct Limits {
    tolerance_floor: f64,
    min_width: f64,
}

#[derive(Clone, Copy)]
struct Interval {
    a: f64,
    b: f64,
    fa: f64,
    fm: f64,
    fb: f64,
    whole: f64,
}

fn simpson(a: f64, b: f64, fa: f64, fm: f64, fb: f64) -> f64 {
    (b - a) / 6.0 * (fa + 4.0 * fm + fb)
}

fn recurse<F>(f: &F, iv: Interval, tolerance: f64, depth: u32, limits: &Limits) -> Option<f64>
where
    F: Fn(f64) -> f64,
{
    if !iv.whole.is_finite() {
        return None;
    }
    let m = 0.5 * (iv.a + iv.b);
    let flm = f(0.5 * (iv.a + m));
    let frm = f(0.5 * (m + iv.b));
    let left = simpson(iv.a, m, iv.fa, flm, iv.fm);
    let right = simpson(m, iv.b, iv.fm, frm, iv.fb);
    let delta = left + right - iv.whole;

    let tolerance = tolerance.max(limits.tolerance_floor);
    if delta.abs() <= 15.0 * tolerance || (iv.b - iv.a).abs() <= limits.min_width {
        let result = left + right + delta / 15.0;
        return result.is_finite().then_some(result);
    }
    if depth == 0 {
        return None;
    }

    let left_iv = Interval {
        a: iv.a,
        b: m,
        fa: iv.fa,
        fm: flm,
        fb: iv.fm,
        whole: left,
    };
    let right_iv = Interval {
        a: m,
        b: iv.b,
        fa: iv.fm,
        fm: frm,
        fb: iv.fb,
        whole: right,
    };
    let left = recurse(f, left_iv, 0.5 * tolerance, depth - 1, limits)?;
    let right = recurse(f, right_iv, 0.5 * tolerance, depth - 1, limits)?;
    Some(left + right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrates_cubic_exactly() {
        let value = adaptive_simpson(|x| x * x * x, 0.0, 2.0, 1e-12, 20).unwrap();
        assert!((value - 4.0).abs() < 1e-10);
    }

    #[test]
    fn integrates_sine_over_half_period() {
        let value = adaptive_simpson(f64::sin, 0.0, std::f64::consts::PI, 1e-10, 30).unwrap();
        assert!((value - 2.0).abs() < 1e-8);
    }

    #[test]
    fn integrates_square_root_singularity_at_zero() {
        let value = adaptive_simpson(f64::sqrt, 0.0, 3.5, 1e-9, 50).unwrap();
        let exact = 2.0 / 3.0 * 3.5_f64.powf(1.5);
        assert!((value - exact).abs() < 1e-8);
    }

    #[test]
    fn integrates_square_root_singularity_at_upper_end() {
        let value = adaptive_simpson(|x| (2.0 - x).sqrt(), 0.0, 2.0, 1e-9, 50).unwrap();
        let exact = 2.0 / 3.0 * 2.0_f64.powf(1.5);
        assert!((value - exact).abs() < 1e-8);
    }

    #[test]
    fn depth_limit_still_reports_failure() {
        assert!(adaptive_simpson(f64::sqrt, 0.0, 3.5, 1e-12, 2).is_none());
    }

    #[test]
    fn non_finite_integrand_fails() {
        assert!(adaptive_simpson(|x| 1.0 / x, 0.0, 1.0, 1e-10, 30).is_none());
    }
}
