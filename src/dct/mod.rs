use std::f64::consts::PI;
use std::sync::OnceLock;

use crate::config::BLOCK_SIZE;

/// One 8x8 block of samples or coefficients, indexed `[row][col]`.
pub type Block = [[f64; BLOCK_SIZE]; BLOCK_SIZE];

/// Orthonormal DCT-II basis: `C[i][j] = c_i * cos((2j+1) i pi / 16)`.
fn basis() -> &'static Block {
    static BASIS: OnceLock<Block> = OnceLock::new();
    BASIS.get_or_init(|| {
        let n = BLOCK_SIZE as f64;
        let mut c = [[0.0f64; BLOCK_SIZE]; BLOCK_SIZE];
        for (i, row) in c.iter_mut().enumerate() {
            let scale = if i == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            for (j, v) in row.iter_mut().enumerate() {
                *v = scale * ((2 * j + 1) as f64 * i as f64 * PI / (2.0 * n)).cos();
            }
        }
        c
    })
}

/// Forward 2-D DCT: `C * B * C^T`, applied as two separable passes.
pub fn dct2d(block: &Block) -> Block {
    let c = basis();
    let mut tmp = [[0.0f64; BLOCK_SIZE]; BLOCK_SIZE];
    for u in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            tmp[u][x] = (0..BLOCK_SIZE).map(|y| c[u][y] * block[y][x]).sum();
        }
    }
    let mut out = [[0.0f64; BLOCK_SIZE]; BLOCK_SIZE];
    for u in 0..BLOCK_SIZE {
        for v in 0..BLOCK_SIZE {
            out[u][v] = (0..BLOCK_SIZE).map(|x| tmp[u][x] * c[v][x]).sum();
        }
    }
    out
}

/// Inverse 2-D DCT: `C^T * F * C`.
pub fn idct2d(coeffs: &Block) -> Block {
    let c = basis();
    let mut tmp = [[0.0f64; BLOCK_SIZE]; BLOCK_SIZE];
    for y in 0..BLOCK_SIZE {
        for v in 0..BLOCK_SIZE {
            tmp[y][v] = (0..BLOCK_SIZE).map(|u| c[u][y] * coeffs[u][v]).sum();
        }
    }
    let mut out = [[0.0f64; BLOCK_SIZE]; BLOCK_SIZE];
    for y in 0..BLOCK_SIZE {
        for x in 0..BLOCK_SIZE {
            out[y][x] = (0..BLOCK_SIZE).map(|v| tmp[y][v] * c[v][x]).sum();
        }
    }
    out
}
