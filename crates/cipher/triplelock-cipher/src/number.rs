//! Number theory helpers shared by key generation and the factoring attack

use lazy_static::lazy_static;
use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use rand::Rng;

use triplelock_core::{Error, Result};

/// Fixed Miller-Rabin bases. Together they are deterministic below 3.3 * 10^24,
/// which covers every modulus the weak tier produces.
const WITNESSES: [u32; 13] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41];

/// Extra random rounds for numbers past the deterministic range
const RANDOM_ROUNDS: usize = 16;

const SIEVE_LIMIT: usize = 2000;

lazy_static! {
    /// Primes below 2000, for sieving candidates and trial division.
    pub static ref SMALL_PRIMES: Vec<u32> = sieve(SIEVE_LIMIT);
}

fn sieve(limit: usize) -> Vec<u32> {
    let mut composite = vec![false; limit];
    let mut primes = Vec::new();
    for i in 2..limit {
        if !composite[i] {
            primes.push(i as u32);
            for j in (i * i..limit).step_by(i) {
                composite[j] = true;
            }
        }
    }
    primes
}

pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    a.gcd(b)
}

/// `a^-1 mod m` by the extended Euclidean algorithm.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Result<BigUint> {
    if m.is_zero() {
        return Err(Error::NoModularInverse { gcd: a.to_string() });
    }

    let modulus = BigInt::from_biguint(Sign::Plus, m.clone());
    let (mut old_r, mut r) = (BigInt::from_biguint(Sign::Plus, a % m), modulus.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());

    while !r.is_zero() {
        let q = &old_r / &r;
        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);
        let next_s = &old_s - &q * &s;
        old_s = std::mem::replace(&mut s, next_s);
    }

    if !old_r.is_one() {
        return Err(Error::NoModularInverse { gcd: old_r.abs().to_string() });
    }

    let inverse = old_s.mod_floor(&modulus);
    inverse
        .to_biguint()
        .ok_or_else(|| Error::NoModularInverse { gcd: old_r.to_string() })
}

/// Miller-Rabin with fixed witnesses, plus random rounds for large `n`.
pub fn is_probable_prime(n: &BigUint) -> bool {
    let two = BigUint::from(2u32);
    if *n < two {
        return false;
    }

    if let Some(small) = n.to_u32() {
        if small < SIEVE_LIMIT as u32 {
            return SMALL_PRIMES.binary_search(&small).is_ok();
        }
    }
    for &p in SMALL_PRIMES.iter() {
        if (n % p).is_zero() {
            return *n == BigUint::from(p);
        }
    }

    let one = BigUint::one();
    let n_minus_1 = n - &one;
    let r = n_minus_1.trailing_zeros().unwrap_or(0);
    let d = &n_minus_1 >> r;

    let passes = |a: &BigUint| -> bool {
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_1 {
            return true;
        }
        for _ in 1..r {
            x = x.modpow(&two, n);
            if x == n_minus_1 {
                return true;
            }
        }
        false
    };

    if !WITNESSES.iter().all(|&w| passes(&BigUint::from(w))) {
        return false;
    }
    if n.bits() <= 80 {
        return true;
    }

    let mut rng = rand::thread_rng();
    (0..RANDOM_ROUNDS).all(|_| passes(&rng.gen_biguint_range(&two, &n_minus_1)))
}

/// Random prime of exactly `bits` bits. The top two bits are set so a
/// product of two such primes has exactly `2 * bits` bits.
pub fn random_prime<R: Rng + ?Sized>(bits: u64, rng: &mut R) -> BigUint {
    loop {
        let mut candidate = rng.gen_biguint(bits);
        candidate.set_bit(bits - 1, true);
        if bits >= 2 {
            candidate.set_bit(bits - 2, true);
        }
        candidate.set_bit(0, true);

        if is_probable_prime(&candidate) {
            return candidate;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_primes_table() {
        assert_eq!(&SMALL_PRIMES[..6], &[2, 3, 5, 7, 11, 13]);
        assert_eq!(SMALL_PRIMES.last(), Some(&1999));
    }

    #[test]
    fn test_mod_inverse() {
        let d = mod_inverse(&BigUint::from(17u32), &BigUint::from(3120u32)).unwrap();
        assert_eq!(d, BigUint::from(2753u32));

        let err = mod_inverse(&BigUint::from(2u32), &BigUint::from(3120u32)).unwrap_err();
        assert_eq!(err, Error::NoModularInverse { gcd: "2".into() });
    }

    #[test]
    fn test_primality() {
        for p in [2u64, 3, 1999, 2003, 65_537, 4_294_967_291, 18_446_744_073_709_551_557] {
            assert!(is_probable_prime(&BigUint::from(p)), "{} is prime", p);
        }
        // Carmichael numbers and a semiprime of two large primes
        for c in [0u64, 1, 561, 41_041, 3_215_031_751, 4_294_967_291 * 65_537] {
            assert!(!is_probable_prime(&BigUint::from(c)), "{} is composite", c);
        }

        let mersenne_127 = (BigUint::one() << 127usize) - BigUint::one();
        assert!(is_probable_prime(&mersenne_127));
    }

    #[test]
    fn test_random_prime_bit_length() {
        let mut rng = rand::thread_rng();
        for bits in [8u64, 16, 33, 128] {
            let p = random_prime(bits, &mut rng);
            assert_eq!(p.bits(), bits);
            assert!(is_probable_prime(&p));
        }
    }
}
