//! Key-seeded deterministic generator and the ordered session built on it.

/// Linear-congruential generator seeded from a string key.
///
/// Not cryptographic: the key only randomises where bits are placed.
#[derive(Debug, Clone)]
pub struct SeededRng {
    seed: u64,
}

const LCG_MUL: u64 = 1_103_515_245;
const LCG_INC: u64 = 12_345;
const MASK_31: u64 = 0x7FFF_FFFF;

impl SeededRng {
    pub fn new(key: &str) -> Self {
        Self {
            seed: hash_key(key),
        }
    }

    /// Next value in [0, 1].
    pub fn next_f64(&mut self) -> f64 {
        self.seed = (self.seed.wrapping_mul(LCG_MUL).wrapping_add(LCG_INC)) & MASK_31;
        self.seed as f64 / MASK_31 as f64
    }

    /// Uniform integer in the inclusive range [min, max].
    pub fn next_int(&mut self, min: usize, max: usize) -> usize {
        let span = (max - min + 1) as f64;
        let offset = (self.next_f64() * span).floor() as usize;
        (min + offset).min(max)
    }

    /// Fisher-Yates shuffle: exactly `len - 1` draws.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_int(0, i);
            items.swap(i, j);
        }
    }
}

/// Multiplicative (x31) hash over the key's UTF-16 units, folded into 31 bits.
fn hash_key(key: &str) -> u64 {
    let hash = key
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32));
    hash.unsigned_abs() as u64 % MASK_31
}

/// The single consumption order shared by embedder and extractor.
///
/// Construction draws the whole block permutation (N-1 draws for N blocks);
/// afterwards every embedded or extracted bit consumes exactly one draw via
/// [`RngSession::next_spread`]. Both sides must go through this type so their
/// streams stay aligned.
#[derive(Debug)]
pub struct RngSession {
    rng: SeededRng,
    block_order: Vec<usize>,
}

impl RngSession {
    pub fn new(key: &str, block_count: usize) -> Self {
        let mut rng = SeededRng::new(key);
        let mut block_order: Vec<usize> = (0..block_count).collect();
        rng.shuffle(&mut block_order);
        Self { rng, block_order }
    }

    pub fn block_order(&self) -> &[usize] {
        &self.block_order
    }

    /// Spread sample (+1.0 or -1.0) for the next bit slot.
    pub fn next_spread(&mut self) -> f64 {
        if self.rng.next_f64() < 0.5 {
            -1.0
        } else {
            1.0
        }
    }

    /// Draw the spread samples for the next `count` bit slots in order.
    pub fn spreads(&mut self, count: usize) -> Vec<f64> {
        (0..count).map(|_| self.next_spread()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_key_same_stream() {
        let mut a = SeededRng::new("secret");
        let mut b = SeededRng::new("secret");
        for _ in 0..100 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn test_different_keys_differ() {
        let mut a = SeededRng::new("alpha");
        let mut b = SeededRng::new("beta");
        let sa: Vec<u64> = (0..10).map(|_| a.next_f64().to_bits()).collect();
        let sb: Vec<u64> = (0..10).map(|_| b.next_f64().to_bits()).collect();
        assert_ne!(sa, sb);
    }

    #[test]
    fn test_next_in_unit_range() {
        let mut rng = SeededRng::new("");
        for _ in 0..10_000 {
            let v = rng.next_f64();
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn test_next_int_inclusive_bounds() {
        let mut rng = SeededRng::new("bounds");
        let mut seen = [false; 5];
        for _ in 0..1000 {
            let v = rng.next_int(3, 7);
            assert!((3..=7).contains(&v));
            seen[v - 3] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = SeededRng::new("perm");
        let mut items: Vec<usize> = (0..257).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..257).collect::<Vec<_>>());
        assert_ne!(items, sorted);
    }

    #[test]
    fn test_session_consumes_n_minus_one_draws_for_shuffle() {
        let mut session = RngSession::new("order", 10);

        let mut manual = SeededRng::new("order");
        for _ in 0..9 {
            manual.next_f64();
        }
        let expected = if manual.next_f64() < 0.5 { -1.0 } else { 1.0 };
        assert_eq!(session.next_spread(), expected);
    }

    #[test]
    fn test_session_spreads_are_signs() {
        let mut session = RngSession::new("k", 4);
        let spreads = session.spreads(500);
        assert!(spreads.iter().all(|&s| s == 1.0 || s == -1.0));
        assert!(spreads.iter().any(|&s| s > 0.0));
        assert!(spreads.iter().any(|&s| s < 0.0));
    }

    #[test]
    fn test_empty_session() {
        let session = RngSession::new("k", 0);
        assert!(session.block_order().is_empty());
    }
}
