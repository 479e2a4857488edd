//! GF(2^8) arithmetic over the primitive polynomial 0x11D.
//!
//! Log/exp tables are built once on first use and shared read-only for the
//! lifetime of the process.

use std::sync::OnceLock;

use thiserror::Error;

/// x^8 + x^4 + x^3 + x^2 + 1
const PRIM_POLY: u16 = 0x11D;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GfError {
    #[error("division by zero in GF(256)")]
    DivisionByZero,
}

struct GfTables {
    /// Doubled so `exp[log a + log b]` never needs a modulo.
    exp: [u8; 512],
    log: [u8; 256],
}

fn build_tables() -> GfTables {
    let mut exp = [0u8; 512];
    let mut log = [0u8; 256];

    let mut x: u16 = 1;
    for i in 0..255usize {
        exp[i] = x as u8;
        exp[i + 255] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIM_POLY;
        }
    }
    exp[510] = exp[0];
    exp[511] = exp[1];

    GfTables { exp, log }
}

fn tables() -> &'static GfTables {
    static TABLES: OnceLock<GfTables> = OnceLock::new();
    TABLES.get_or_init(build_tables)
}

/// alpha^i for any non-negative exponent.
pub fn exp(i: usize) -> u8 {
    tables().exp[i % 255]
}

/// Discrete log of a non-zero element. `log(0)` is undefined and returns 0.
pub fn log(a: u8) -> usize {
    tables().log[a as usize] as usize
}

pub fn add(a: u8, b: u8) -> u8 {
    a ^ b
}

pub fn multiply(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let t = tables();
    t.exp[t.log[a as usize] as usize + t.log[b as usize] as usize]
}

pub fn divide(a: u8, b: u8) -> Result<u8, GfError> {
    if b == 0 {
        return Err(GfError::DivisionByZero);
    }
    if a == 0 {
        return Ok(0);
    }
    let t = tables();
    Ok(t.exp[t.log[a as usize] as usize + 255 - t.log[b as usize] as usize])
}

pub fn inverse(a: u8) -> Result<u8, GfError> {
    divide(1, a)
}

/// x^n via the log table.
pub fn power(x: u8, n: usize) -> u8 {
    if x == 0 {
        return if n == 0 { 1 } else { 0 };
    }
    let t = tables();
    t.exp[(t.log[x as usize] as usize * n) % 255]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_cover_all_nonzero_elements() {
        let mut seen = [false; 256];
        for i in 0..255 {
            seen[exp(i) as usize] = true;
        }
        assert!(!seen[0]);
        assert!(seen[1..].iter().all(|&s| s));
    }

    #[test]
    fn test_multiply_known_values() {
        assert_eq!(multiply(0, 7), 0);
        assert_eq!(multiply(1, 0x53), 0x53);
        assert_eq!(multiply(2, 0x80), 0x1D);
        assert_eq!(multiply(3, 7), 9);
    }

    #[test]
    fn test_divide_inverts_multiply() {
        for a in 1..=255u8 {
            for b in [1u8, 2, 29, 113, 255] {
                let p = multiply(a, b);
                assert_eq!(divide(p, b), Ok(a));
            }
        }
    }

    #[test]
    fn test_divide_by_zero() {
        assert_eq!(divide(5, 0), Err(GfError::DivisionByZero));
        assert_eq!(inverse(0), Err(GfError::DivisionByZero));
    }

    #[test]
    fn test_power() {
        assert_eq!(power(2, 0), 1);
        assert_eq!(power(2, 8), 0x1D);
        assert_eq!(power(0, 0), 1);
        assert_eq!(power(0, 3), 0);
        assert_eq!(power(7, 255), 1);
        let mut acc = 1u8;
        for n in 0..20 {
            assert_eq!(power(0x35, n), acc);
            acc = multiply(acc, 0x35);
        }
    }
}
