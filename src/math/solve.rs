/// Solve `a·t² + b·t + c = 0`
///
/// Returns both real roots (`(-b + √D) / 2a`, `(-b - √D) / 2a`) or `None`
/// when the discriminant is negative or the equation is not quadratic.
pub fn solve_quadratic(a: f32, b: f32, c: f32) -> Option<(f32, f32)> {
    if a == 0.0 {
        return None;
    }
    let discr = b * b - 4.0 * a * c;
    if discr < 0.0 {
        return None;
    }
    let discr = discr.sqrt();
    let inv2a = 0.5 / a;
    Some(((-b + discr) * inv2a, (-b - discr) * inv2a))
}

/// Pick the time of impact among two roots
///
/// Opposite signs mean the ball is already inside and leaving, so the
/// positive root wins. Otherwise the earlier root is the first touch.
#[inline]
pub fn pick_root(t1: f32, t2: f32) -> f32 {
    if t1 * t2 < 0.0 { t1.max(t2) } else { t1.min(t2) }
}

/// A hit time usable within the current budget
#[inline]
pub fn valid_time(t: f32, dtime: f32) -> bool {
    t.is_finite() && t >= 0.0 && t <= dtime
}
