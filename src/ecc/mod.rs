//! Systematic Reed-Solomon code over GF(2^8).
//!
//! Generator roots are alpha^0 .. alpha^(nsym-1). Codewords of up to 255
//! symbols are corrected with Berlekamp-Massey, Chien search and Forney;
//! longer codewords (the field only has 255 distinct roots) are detect-only.

use log::debug;
use thiserror::Error;

use crate::gf::{self, GfError};

/// Longest codeword with distinct error locators.
const N_MAX: usize = 255;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EccError {
    #[error("codeword of {len} bytes is shorter than its {nsym} parity symbols")]
    TooShort { len: usize, nsym: usize },
    #[error("codeword of {0} bytes is too long to correct")]
    CodewordTooLong(usize),
    #[error("too many errors to correct")]
    TooManyErrors,
    #[error(transparent)]
    Field(#[from] GfError),
}

/// Reed-Solomon encoder/decoder with a fixed number of parity symbols.
#[derive(Debug, Clone)]
pub struct ReedSolomonCode {
    nsym: usize,
    /// Monic generator, highest-degree coefficient first.
    generator: Vec<u8>,
}

impl ReedSolomonCode {
    pub fn new(nsym: usize) -> Self {
        let mut generator = vec![1u8];
        for i in 0..nsym {
            generator = poly_mul(&generator, &[1, gf::exp(i)]);
        }
        Self { nsym, generator }
    }

    pub fn nsym(&self) -> usize {
        self.nsym
    }

    /// Returns `data ‖ parity`.
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        let mut encoded = Vec::with_capacity(data.len() + self.nsym);
        encoded.extend_from_slice(data);
        if self.nsym == 0 {
            return encoded;
        }

        // Remainder of data(x) * x^nsym / g(x), kept in a shift register.
        let mut parity = vec![0u8; self.nsym];
        for &byte in data {
            let feedback = gf::add(byte, parity[0]);
            for j in 0..self.nsym - 1 {
                parity[j] = gf::add(parity[j + 1], gf::multiply(feedback, self.generator[j + 1]));
            }
            parity[self.nsym - 1] = gf::multiply(feedback, self.generator[self.nsym]);
        }

        encoded.extend_from_slice(&parity);
        encoded
    }

    /// Syndromes S_i = r(alpha^i), i in 0..nsym.
    pub fn syndromes(&self, received: &[u8]) -> Vec<u8> {
        (0..self.nsym)
            .map(|i| poly_eval(received, gf::exp(i)))
            .collect()
    }

    /// Check and, where possible, correct `received`, returning the payload
    /// with the parity symbols stripped.
    pub fn decode(&self, received: &[u8]) -> Result<Vec<u8>, EccError> {
        let n = received.len();
        if n < self.nsym {
            return Err(EccError::TooShort {
                len: n,
                nsym: self.nsym,
            });
        }
        let data_len = n - self.nsym;

        let syndromes = self.syndromes(received);
        if syndromes.iter().all(|&s| s == 0) {
            return Ok(received[..data_len].to_vec());
        }
        if n > N_MAX {
            return Err(EccError::CodewordTooLong(n));
        }

        let sigma = berlekamp_massey(&syndromes)?;
        let num_errors = sigma.len() - 1;
        if num_errors > self.nsym / 2 {
            return Err(EccError::TooManyErrors);
        }

        let found = chien_search(&sigma, n).ok_or(EccError::TooManyErrors)?;
        let magnitudes = forney(&sigma, &syndromes, &found)?;

        let mut corrected = received.to_vec();
        for (&(_, index), &magnitude) in found.iter().zip(magnitudes.iter()) {
            corrected[index] = gf::add(corrected[index], magnitude);
        }

        if self.syndromes(&corrected).iter().any(|&s| s != 0) {
            return Err(EccError::TooManyErrors);
        }

        debug!("reed-solomon corrected {} symbol errors", num_errors);
        corrected.truncate(data_len);
        Ok(corrected)
    }
}

/// Evaluate a highest-first polynomial at x (Horner).
fn poly_eval(poly: &[u8], x: u8) -> u8 {
    poly.iter()
        .fold(0u8, |acc, &coeff| gf::add(gf::multiply(acc, x), coeff))
}

fn poly_mul(a: &[u8], b: &[u8]) -> Vec<u8> {
    let mut result = vec![0u8; a.len() + b.len() - 1];
    for (i, &ac) in a.iter().enumerate() {
        for (j, &bc) in b.iter().enumerate() {
            result[i + j] = gf::add(result[i + j], gf::multiply(ac, bc));
        }
    }
    result
}

/// Evaluate an ascending-power polynomial at x.
fn eval_asc(poly: &[u8], x: u8) -> u8 {
    let mut result = 0u8;
    let mut x_pow = 1u8;
    for &coeff in poly {
        result = gf::add(result, gf::multiply(coeff, x_pow));
        x_pow = gf::multiply(x_pow, x);
    }
    result
}

/// Error locator sigma(x), ascending power with sigma[0] = 1.
fn berlekamp_massey(syndromes: &[u8]) -> Result<Vec<u8>, EccError> {
    let n = syndromes.len();
    let mut c = vec![0u8; n + 1];
    let mut b = vec![0u8; n + 1];
    c[0] = 1;
    b[0] = 1;
    let mut c_len = 1usize;
    let mut b_len = 1usize;
    let mut ell = 0usize;
    let mut prev_delta = 1u8;
    let mut m = 1usize;

    for r in 0..n {
        let mut delta = syndromes[r];
        for i in 1..c_len.min(r + 1) {
            delta = gf::add(delta, gf::multiply(c[i], syndromes[r - i]));
        }

        if delta == 0 {
            m += 1;
            continue;
        }

        let factor = gf::divide(delta, prev_delta)?;
        if b_len + m > c.len() {
            return Err(EccError::TooManyErrors);
        }

        if 2 * ell <= r {
            let old_c = c.clone();
            let old_c_len = c_len;
            c_len = (b_len + m).max(c_len);
            for j in 0..b_len {
                c[j + m] = gf::add(c[j + m], gf::multiply(factor, b[j]));
            }
            b = old_c;
            b_len = old_c_len;
            ell = r + 1 - ell;
            prev_delta = delta;
            m = 1;
        } else {
            c_len = (b_len + m).max(c_len);
            for j in 0..b_len {
                c[j + m] = gf::add(c[j + m], gf::multiply(factor, b[j]));
            }
            m += 1;
        }
    }

    c.truncate(c_len);
    while c.len() > 1 && c[c.len() - 1] == 0 {
        c.pop();
    }
    Ok(c)
}

/// Roots of sigma among the `n` codeword positions, as (power, array index).
fn chien_search(sigma: &[u8], n: usize) -> Option<Vec<(usize, usize)>> {
    let num_errors = sigma.len() - 1;
    let found: Vec<(usize, usize)> = (0..n)
        .filter(|&p| eval_asc(sigma, gf::exp((255 - p % 255) % 255)) == 0)
        .map(|p| (p, n - 1 - p))
        .collect();

    if found.len() != num_errors {
        return None;
    }
    Some(found)
}

/// Error magnitudes for first consecutive root alpha^0:
/// e = X * Omega(X^-1) / Sigma'(X^-1).
fn forney(sigma: &[u8], syndromes: &[u8], found: &[(usize, usize)]) -> Result<Vec<u8>, EccError> {
    let two_t = syndromes.len();

    let mut omega = vec![0u8; two_t];
    for (i, &s_i) in sigma.iter().enumerate().take(two_t) {
        for (j, &syn) in syndromes.iter().enumerate() {
            if i + j < two_t {
                omega[i + j] = gf::add(omega[i + j], gf::multiply(s_i, syn));
            }
        }
    }

    // Formal derivative: only odd powers survive in characteristic 2.
    let mut sigma_prime = vec![0u8; sigma.len().saturating_sub(1)];
    for i in (1..sigma.len()).step_by(2) {
        sigma_prime[i - 1] = sigma[i];
    }

    found
        .iter()
        .map(|&(p, _)| {
            let x = gf::exp(p);
            let x_inv = gf::exp((255 - p % 255) % 255);
            let numerator = gf::multiply(x, eval_asc(&omega, x_inv));
            gf::divide(numerator, eval_asc(&sigma_prime, x_inv)).map_err(EccError::from)
        })
        .collect()
}
