//! Probabilistic primality checking for server-supplied DH moduli.
//!
//! The handshake must not accept an arbitrary composite as the DH prime; a
//! Miller-Rabin pass over fixed small bases rejects composites with
//! probability overwhelming for an adversary that cannot grind the client.

use num_bigint::BigUint;
use num_traits::{One, Zero};

const BASES: [u32; 10] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29];

/// Miller-Rabin over the fixed base set.
pub fn is_probable_prime(n: &BigUint) -> bool {
    let one = BigUint::one();
    let two = &one + &one;
    if n < &two {
        return false;
    }
    if n == &two {
        return true;
    }
    if (n % &two).is_zero() {
        return false;
    }

    // n - 1 = d * 2^s with d odd
    let n_minus_1 = n - &one;
    let mut d = n_minus_1.clone();
    let mut s = 0u32;
    while (&d % &two).is_zero() {
        d >>= 1;
        s += 1;
    }

    'bases: for &b in &BASES {
        let base = BigUint::from(b);
        if &base >= n {
            continue;
        }
        let mut x = base.modpow(&d, n);
        if x == one || x == n_minus_1 {
            continue;
        }
        for _ in 0..s - 1 {
            x = x.modpow(&two, n);
            if x == n_minus_1 {
                continue 'bases;
            }
        }
        return false;
    }
    true
}

/// True if `p` and `(p - 1) / 2` are both (probable) primes.
pub fn is_safe_prime(p: &BigUint) -> bool {
    if !is_probable_prime(p) {
        return false;
    }
    let half = (p - BigUint::one()) >> 1;
    is_probable_prime(&half)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_primes() {
        for p in [2u32, 3, 5, 7, 23, 47, 59, 83, 107] {
            assert!(is_probable_prime(&BigUint::from(p)), "{p}");
        }
        for c in [1u32, 4, 9, 15, 21, 25, 49, 91] {
            assert!(!is_probable_prime(&BigUint::from(c)), "{c}");
        }
    }

    #[test]
    fn safe_primes() {
        // 23 = 2*11 + 1, 11 prime → safe
        assert!(is_safe_prime(&BigUint::from(23u32)));
        // 13 = 2*6 + 1, 6 composite → not safe
        assert!(!is_safe_prime(&BigUint::from(13u32)));
    }
}
