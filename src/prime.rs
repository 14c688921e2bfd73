//! Prime table sizes for `HashTable` growth.

/// Trial division primality test. 0 and 1 are not prime.
pub fn is_prime(n: usize) -> bool {
    if n < 2 {
        return false;
    }
    if n % 2 == 0 {
        return n == 2;
    }
    let mut d = 3;
    while d <= n / d {
        if n % d == 0 {
            return false;
        }
        d += 2;
    }
    true
}

/// Smallest prime strictly greater than `n`.
///
/// Returns `n` unchanged if no larger prime fits in `usize`.
pub fn next_prime(n: usize) -> usize {
    let mut candidate = n;
    while let Some(c) = candidate.checked_add(1) {
        if is_prime(c) {
            return c;
        }
        candidate = c;
    }
    n
}

/// `n` itself when prime, otherwise `next_prime(n)`.
pub fn prime_at_least(n: usize) -> usize {
    if is_prime(n) {
        n
    } else {
        next_prime(n)
    }
}
