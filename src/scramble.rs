//! Password scrambles for the two handshake generations.
//!
//! Protocol 41 servers issue a 20-byte seed and expect
//! `SHA1(password) XOR SHA1(seed || SHA1(SHA1(password)))`. Pre-4.1 servers
//! (and the old-password downgrade path) use the 3.23 hash over the first
//! eight seed bytes.

use sha1::{Digest, Sha1};

/// 4.1 authentication token. Empty password yields an empty token.
pub fn scramble_41(seed: &[u8], password: &str) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }

    let mut hasher = Sha1::new();
    hasher.update(password.as_bytes());
    let stage1 = hasher.finalize();

    let mut hasher = Sha1::new();
    hasher.update(stage1);
    let stage2 = hasher.finalize();

    let mut hasher = Sha1::new();
    hasher.update(seed);
    hasher.update(stage2);
    let stage3 = hasher.finalize();

    stage1
        .iter()
        .zip(stage3.iter())
        .map(|(a, b)| a ^ b)
        .collect()
}

/// 3.23 authentication token: 8 bytes derived from the first 8 seed bytes.
/// Empty password yields an empty token.
pub fn scramble_323(seed: &[u8], password: &str) -> Vec<u8> {
    if password.is_empty() {
        return Vec::new();
    }
    let seed = &seed[..seed.len().min(8)];

    let pw_hash = hash_323(password.as_bytes());
    let seed_hash = hash_323(seed);

    let mut rng = Rand323::new(pw_hash[0] ^ seed_hash[0], pw_hash[1] ^ seed_hash[1]);
    let mut token: Vec<u8> = (0..seed.len())
        .map(|_| (rng.next() * 31.0) as u8 + 64)
        .collect();
    let mask = (rng.next() * 31.0) as u8;
    for byte in token.iter_mut() {
        *byte ^= mask;
    }
    token
}

/// The 3.23 password hash. Spaces and tabs are skipped, results are masked
/// to 31 bits.
fn hash_323(input: &[u8]) -> [u32; 2] {
    let mut nr: u32 = 1345345333;
    let mut nr2: u32 = 0x12345671;
    let mut add: u32 = 7;

    for &byte in input {
        if byte == b' ' || byte == b'\t' {
            continue;
        }
        let tmp = u32::from(byte);
        nr ^= (nr & 63)
            .wrapping_add(add)
            .wrapping_mul(tmp)
            .wrapping_add(nr << 8);
        nr2 = nr2.wrapping_add((nr2 << 8) ^ nr);
        add = add.wrapping_add(tmp);
    }

    [nr & 0x7FFF_FFFF, nr2 & 0x7FFF_FFFF]
}

/// The 3.23 congruential generator seeded from the two hash halves.
struct Rand323 {
    seed1: u32,
    seed2: u32,
}

const RAND_MAX_323: u32 = 0x3FFF_FFFF;

impl Rand323 {
    fn new(seed1: u32, seed2: u32) -> Self {
        Self {
            seed1: seed1 % RAND_MAX_323,
            seed2: seed2 % RAND_MAX_323,
        }
    }

    fn next(&mut self) -> f64 {
        self.seed1 = (self.seed1.wrapping_mul(3).wrapping_add(self.seed2)) % RAND_MAX_323;
        self.seed2 = (self.seed1.wrapping_add(self.seed2).wrapping_add(33)) % RAND_MAX_323;
        f64::from(self.seed1) / f64::from(RAND_MAX_323)
    }
}
