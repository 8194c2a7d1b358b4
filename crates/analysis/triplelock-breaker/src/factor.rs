//! RSA modulus factoring
//!
//! Strategy by modulus size:
//!
//! | bits(n) | method |
//! |---|---|
//! | <= 32 | trial division by odd numbers up to `sqrt(n)` |
//! | <= 64 | Pollard's rho (Brent) in 128-bit arithmetic |
//! | larger | small primes, then Fermat (close factors), then Pollard's rho over big integers |
//!
//! Every method draws from one [`FactorBudget`], the primality check on `n`
//! included. When either the iteration or the time allowance runs out the
//! attack stops with [`Error::FactorizationTimeout`]. For strong keys that is
//! the expected answer. Moduli wider than the budget's `max_bits` are refused
//! before any arithmetic.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, ToPrimitive, Zero};
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

use triplelock_cipher::number::{is_probable_prime, mod_inverse, SMALL_PRIMES};
use triplelock_cipher::Rsa;
use triplelock_core::{Error, Result, MAX_MODULUS_BITS};

/// Polynomial steps between gcd checks in Brent's variant
const BRENT_BATCH: u64 = 128;

/// Upper bound on Fermat steps before handing over to Pollard's rho
const FERMAT_ROUNDS: u64 = 20_000;

/// How much work one factoring attempt may do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorBudget {
    pub max_iterations: u64,
    pub max_duration: Duration,
    /// Widest modulus accepted at all
    pub max_bits: u64,
}

impl Default for FactorBudget {
    fn default() -> Self {
        Self {
            max_iterations: 5_000_000,
            max_duration: Duration::from_secs(2),
            max_bits: MAX_MODULUS_BITS,
        }
    }
}

impl FactorBudget {
    pub fn new(max_iterations: u64, max_duration: Duration) -> Self {
        Self {
            max_iterations,
            max_duration,
            max_bits: MAX_MODULUS_BITS,
        }
    }

    pub fn with_max_bits(mut self, max_bits: u64) -> Self {
        self.max_bits = max_bits;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    TrialDivision,
    PollardRho,
    Fermat,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::TrialDivision => write!(f, "trial division"),
            Method::PollardRho => write!(f, "Pollard's rho"),
            Method::Fermat => write!(f, "Fermat"),
        }
    }
}

/// `n = p * q` with `p <= q`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Factors {
    pub p: BigUint,
    pub q: BigUint,
    pub method: Method,
    pub iterations: u64,
}

/// Private key rebuilt from the factors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredKey {
    pub factors: Factors,
    pub phi: BigUint,
    pub d: BigUint,
    pub n: BigUint,
}

/// Key recovery plus decryption of the intercepted blocks
#[derive(Debug, Clone)]
pub struct RsaAttack {
    pub key: RecoveredKey,
    pub decrypted: String,
    pub elapsed: Duration,
}

/// Iteration and wall-clock accounting for one attempt
struct Meter {
    budget: FactorBudget,
    started: Instant,
    spent: u64,
}

impl Meter {
    fn new(budget: FactorBudget) -> Self {
        Self {
            budget,
            started: Instant::now(),
            spent: 0,
        }
    }

    fn spend(&mut self, steps: u64) -> Result<()> {
        self.spent = self.spent.saturating_add(steps);
        if self.spent > self.budget.max_iterations
            || self.started.elapsed() > self.budget.max_duration
        {
            return Err(Error::FactorizationTimeout {
                iterations: self.spent,
                elapsed_ms: self.started.elapsed().as_millis(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RsaFactorizer {
    budget: FactorBudget,
}

impl RsaFactorizer {
    pub fn new(budget: FactorBudget) -> Self {
        Self { budget }
    }

    pub fn budget(&self) -> FactorBudget {
        self.budget
    }

    /// Split `n` into two non-trivial factors.
    pub fn factor(&self, n: &BigUint) -> Result<Factors> {
        let bits = n.bits();
        if bits > self.budget.max_bits {
            return Err(Error::InvalidModulus(format!(
                "n is {} bits, above the {}-bit limit",
                bits, self.budget.max_bits
            )));
        }
        if *n < BigUint::from(4u32) {
            return Err(Error::InvalidModulus(format!("n = {} has no non-trivial factors", n)));
        }

        let mut meter = Meter::new(self.budget);
        let prime = is_probable_prime(n);
        // Roughly one modular multiplication per bit for each witness
        meter.spend(bits)?;
        if prime {
            return Err(Error::InvalidModulus(format!("n = {} is prime", n)));
        }

        let small = n.to_u64();

        let (p, method) = match small {
            Some(n64) if bits <= 32 => {
                tracing::info!("Factoring {}-bit n by trial division", bits);
                (BigUint::from(trial_division(n64, &mut meter)?), Method::TrialDivision)
            }
            Some(n64) => {
                tracing::info!("Factoring {}-bit n with Pollard's rho", bits);
                (BigUint::from(pollard_rho_u64(n64, &mut meter)?), Method::PollardRho)
            }
            None => {
                tracing::info!("Factoring {}-bit n: small primes, Fermat, Pollard's rho", bits);
                factor_big(n, &mut meter)?
            }
        };

        let q = n / &p;
        let (p, q) = if p <= q { (p, q) } else { (q, p) };
        tracing::info!(
            "Factored n with {} after {} iterations in {:?}",
            method,
            meter.spent,
            meter.started.elapsed()
        );

        Ok(Factors {
            p,
            q,
            method,
            iterations: meter.spent,
        })
    }

    /// Factor `n`, then derive `phi` and `d = e^-1 mod phi`.
    pub fn recover(&self, e: &BigUint, n: &BigUint) -> Result<RecoveredKey> {
        let factors = self.factor(n)?;
        let phi = (&factors.p - 1u32) * (&factors.q - 1u32);
        let d = mod_inverse(e, &phi)?;

        Ok(RecoveredKey {
            factors,
            phi,
            d,
            n: n.clone(),
        })
    }

    /// Recover the private key and decrypt `blocks` with it.
    pub fn attack(&self, e: &BigUint, n: &BigUint, blocks: &[BigUint]) -> Result<RsaAttack> {
        let started = Instant::now();
        let key = self.recover(e, n)?;
        let decrypted = Rsa::decrypt(blocks, &key.d, n)?;

        Ok(RsaAttack {
            key,
            decrypted,
            elapsed: started.elapsed(),
        })
    }
}

fn isqrt_u64(n: u64) -> u64 {
    let mut r = (n as f64).sqrt() as u64;
    while (r as u128) * (r as u128) > n as u128 {
        r -= 1;
    }
    while ((r + 1) as u128) * ((r + 1) as u128) <= n as u128 {
        r += 1;
    }
    r
}

fn trial_division(n: u64, meter: &mut Meter) -> Result<u64> {
    if n % 2 == 0 {
        return Ok(2);
    }

    let limit = isqrt_u64(n);
    let mut divisor = 3;
    let mut pending = 0;
    while divisor <= limit {
        if n % divisor == 0 {
            meter.spend(pending)?;
            return Ok(divisor);
        }
        divisor += 2;
        pending += 1;
        if pending == 1024 {
            meter.spend(pending)?;
            pending = 0;
        }
    }

    Err(Error::InvalidModulus(format!("n = {} is prime", n)))
}

fn pollard_rho_u64(n: u64, meter: &mut Meter) -> Result<u64> {
    if n % 2 == 0 {
        return Ok(2);
    }
    for c in 1u64.. {
        if let Some(factor) = brent_u64(n, c, meter)? {
            return Ok(factor);
        }
        tracing::debug!("Pollard's rho cycle without factor for c = {}, retrying", c);
    }
    Err(Error::InvalidModulus(format!("n = {} resisted every polynomial", n)))
}

/// One run of Brent's cycle finder on `x^2 + c mod n`.
fn brent_u64(n: u64, c: u64, meter: &mut Meter) -> Result<Option<u64>> {
    let modulus = n as u128;
    let f = |x: u128| (x * x + c as u128) % modulus;

    let (mut x, mut y, mut ys) = (2u128, 2u128, 2u128);
    let (mut r, mut q, mut g) = (1u64, 1u128, 1u128);

    while g == 1 {
        x = y;
        let mut walked = 0;
        while walked < r {
            let steps = BRENT_BATCH.min(r - walked);
            for _ in 0..steps {
                y = f(y);
            }
            meter.spend(steps)?;
            walked += steps;
        }

        let mut k = 0;
        while k < r && g == 1 {
            ys = y;
            let steps = BRENT_BATCH.min(r - k);
            for _ in 0..steps {
                y = f(y);
                q = q * x.abs_diff(y) % modulus;
            }
            meter.spend(steps)?;
            g = q.gcd(&modulus);
            k += steps;
        }
        r *= 2;
    }

    if g == modulus {
        // The batch overshot; replay one step at a time
        loop {
            ys = f(ys);
            meter.spend(1)?;
            g = x.abs_diff(ys).gcd(&modulus);
            if g > 1 {
                break;
            }
        }
    }

    Ok((g != modulus).then_some(g as u64))
}

fn factor_big(n: &BigUint, meter: &mut Meter) -> Result<(BigUint, Method)> {
    for (tried, &p) in SMALL_PRIMES.iter().enumerate() {
        if (n % p).is_zero() {
            meter.spend(tried as u64 + 1)?;
            return Ok((BigUint::from(p), Method::TrialDivision));
        }
    }
    meter.spend(SMALL_PRIMES.len() as u64)?;

    if let Some(p) = fermat(n, meter)? {
        return Ok((p, Method::Fermat));
    }

    for c in 1u32.. {
        if let Some(p) = brent_big(n, &BigUint::from(c), meter)? {
            return Ok((p, Method::PollardRho));
        }
        tracing::debug!("Pollard's rho cycle without factor for c = {}, retrying", c);
    }
    Err(Error::InvalidModulus(format!("n = {} resisted every polynomial", n)))
}

/// Fermat's method: finds `n = a^2 - b^2` quickly when `p` and `q` are close.
fn fermat(n: &BigUint, meter: &mut Meter) -> Result<Option<BigUint>> {
    let mut a = n.sqrt();
    if &a * &a < *n {
        a += 1u32;
    }
    let mut b2 = &a * &a - n;

    for round in 0..FERMAT_ROUNDS {
        // Squares are 0, 1, 4 or 9 mod 16
        let low = b2.iter_u32_digits().next().unwrap_or(0) & 15;
        if matches!(low, 0 | 1 | 4 | 9) {
            let b = b2.sqrt();
            if &b * &b == b2 {
                let p = &a - &b;
                if !p.is_one() {
                    return Ok(Some(p));
                }
            }
        }

        b2 += &a * 2u32 + 1u32;
        a += 1u32;
        if round % 64 == 63 {
            meter.spend(64)?;
        }
    }

    Ok(None)
}

fn brent_big(n: &BigUint, c: &BigUint, meter: &mut Meter) -> Result<Option<BigUint>> {
    let f = |x: &BigUint| (x * x + c) % n;
    let abs_diff = |a: &BigUint, b: &BigUint| if a > b { a - b } else { b - a };

    let two = BigUint::from(2u32);
    let (mut x, mut y, mut ys) = (two.clone(), two.clone(), two);
    let (mut r, mut q, mut g) = (1u64, BigUint::one(), BigUint::one());

    while g.is_one() {
        x = y.clone();
        let mut walked = 0;
        while walked < r {
            let steps = BRENT_BATCH.min(r - walked);
            for _ in 0..steps {
                y = f(&y);
            }
            meter.spend(steps)?;
            walked += steps;
        }

        let mut k = 0;
        while k < r && g.is_one() {
            ys = y.clone();
            let steps = BRENT_BATCH.min(r - k);
            for _ in 0..steps {
                y = f(&y);
                q = (&q * abs_diff(&x, &y)) % n;
            }
            meter.spend(steps)?;
            g = q.gcd(n);
            k += steps;
        }
        r *= 2;
    }

    if &g == n {
        loop {
            ys = f(&ys);
            meter.spend(1)?;
            g = abs_diff(&x, &ys).gcd(n);
            if !g.is_one() {
                break;
            }
        }
    }

    Ok((&g != n).then_some(g))
}
