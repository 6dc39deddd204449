/// Calculates the factorial of n (n!).
///
/// Negative inputs yield NaN and large inputs overflow to infinity; both are
/// rejected later as a failed calculation. Fractional inputs multiply
/// `2..=floor(n)`, so `0!` and `1!` are 1.
pub fn factorial(n: f64) -> f64 {
    if n.is_nan() || n < 0.0 {
        return f64::NAN;
    }
    if n.is_infinite() {
        return f64::INFINITY;
    }

    // 171! is already beyond f64; stop early instead of looping to n.
    if n > 170.0 {
        return f64::INFINITY;
    }

    let n_int = n.floor() as u64;
    (2..=n_int).map(|i| i as f64).product()
}

/// `N%` reads as `N / 100`, regardless of the surrounding operator.
pub fn percent(n: f64) -> f64 {
    n / 100.0
}
