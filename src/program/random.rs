use crate::foundation::error::ProgramError;

const N: usize = 624;
const M: usize = 397;
const MATRIX_A: u32 = 0x9908_B0DF;
const UPPER_MASK: u32 = 0x8000_0000;
const LOWER_MASK: u32 = 0x7FFF_FFFF;

/// 32-bit Mersenne Twister (MT19937) with the reference `init_genrand` seeding.
#[derive(Clone)]
pub struct Mt19937 {
    state: Box<[u32; N]>,
    index: usize,
}

impl Mt19937 {
    /// Seed the generator.
    pub fn new(seed: u32) -> Self {
        let mut state = Box::new([0u32; N]);
        state[0] = seed;
        for i in 1..N {
            let prev = state[i - 1];
            state[i] = 1_812_433_253u32
                .wrapping_mul(prev ^ (prev >> 30))
                .wrapping_add(i as u32);
        }
        Self { state, index: N }
    }

    /// Next tempered 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        if self.index >= N {
            self.twist();
        }
        let mut y = self.state[self.index];
        self.index += 1;

        y ^= y >> 11;
        y ^= (y << 7) & 0x9D2C_5680;
        y ^= (y << 15) & 0xEFC6_0000;
        y ^ (y >> 18)
    }

    fn twist(&mut self) {
        let mag = |y: u32| if y & 1 == 0 { 0 } else { MATRIX_A };
        for i in 0..N {
            let y = (self.state[i] & UPPER_MASK) | (self.state[(i + 1) % N] & LOWER_MASK);
            self.state[i] = self.state[(i + M) % N] ^ (y >> 1) ^ mag(y);
        }
        self.index = 0;
    }
}

impl std::fmt::Debug for Mt19937 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mt19937")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

/// Seeded random source shared by everything a stimulus program randomizes.
///
/// One instance exists per run. For a fixed seed and call sequence every output is
/// bit-identical across runs and processes.
#[derive(Clone, Debug)]
pub struct DeterministicRandom {
    mt: Mt19937,
    seed: u32,
}

impl DeterministicRandom {
    /// Create a source from a seed.
    pub fn new(seed: u32) -> Self {
        Self {
            mt: Mt19937::new(seed),
            seed,
        }
    }

    /// The seed this source was created with.
    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Raw 32-bit draw.
    pub fn next_u32(&mut self) -> u32 {
        self.mt.next_u32()
    }

    /// Uniform float on `[0, 1)` with 32-bit resolution.
    pub fn uniform01(&mut self) -> f64 {
        f64::from(self.next_u32()) * (1.0 / 4_294_967_296.0)
    }

    /// Uniform integer on `[lo, hi)`.
    ///
    /// Rejection sampling: draws at or above the largest multiple of `hi - lo` that fits in the
    /// 32-bit output space are discarded, so there is no modulo bias.
    pub fn uniform_int(&mut self, lo: i64, hi: i64) -> Result<i64, ProgramError> {
        if lo >= hi {
            return Err(ProgramError::new(
                "RangeError",
                format!("randi requires lo < hi (got [{lo}, {hi}))"),
                "random.randi",
            ));
        }
        let range = hi.abs_diff(lo);
        let range = u32::try_from(range).map_err(|_| {
            ProgramError::new(
                "RangeError",
                format!("randi range {range} exceeds 32-bit output"),
                "random.randi",
            )
        })?;
        Ok(lo + i64::from(self.below(range)))
    }

    /// In-place Fisher–Yates shuffle, last index down to 1.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let bound = u32::try_from(i + 1).unwrap_or(u32::MAX);
            let j = self.below(bound) as usize;
            items.swap(i, j);
        }
    }

    /// Random v4-shaped identifier.
    pub fn uuid(&mut self) -> String {
        const TEMPLATE: &str = "xxxxxxxx-xxxx-4xxx-yxxx-xxxxxxxxxxxx";
        let mut out = String::with_capacity(TEMPLATE.len());
        for c in TEMPLATE.chars() {
            let v = match c {
                'x' => (self.uniform01() * 16.0) as u32,
                'y' => (((self.uniform01() * 16.0) as u32) & 0x3) | 0x8,
                other => {
                    out.push(other);
                    continue;
                }
            };
            out.push(char::from_digit(v, 16).unwrap_or('0'));
        }
        out
    }

    /// Uniform draw on `[0, n)` for `n >= 1`.
    fn below(&mut self, n: u32) -> u32 {
        debug_assert!(n >= 1);
        let space = 1u64 << 32;
        let n64 = u64::from(n);
        let zone = space - (space % n64);
        loop {
            let r = u64::from(self.next_u32());
            if r < zone {
                return (r % n64) as u32;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/program/random.rs"]
mod tests;
