//! Deterministic priority source for treap balancing.
//!
//! The balancing priorities are pseudo-random but must be reproducible:
//! the source is seeded explicitly by whoever owns the containing structure
//! (normally the [`Checker`]) instead of hiding a process-wide generator.
//! Distinct monitor instances get independent draw sequences by seeding
//! independently.
//!
//! [`Checker`]: crate::Checker

/// Splitmix64 generator for treap priorities and tie-break coin flips.
///
/// Splitmix64 passes through every 64-bit state exactly once, which keeps
/// priority collisions rare, and a two-field struct keeps the source trivially
/// cloneable for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrioritySource {
    state: u64,
}

impl PrioritySource {
    /// Creates a source from an explicit seed.
    #[must_use]
    pub const fn from_seed(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Draws a strictly positive balancing priority.
    ///
    /// Priority 0 is reserved for the empty-subtree sentinel.
    pub fn next_priority(&mut self) -> u64 {
        loop {
            let p = self.next_u64();
            if p != 0 {
                return p;
            }
        }
    }

    /// Unbiased coin flip, used to break priority ties during removal.
    pub fn coin_flip(&mut self) -> bool {
        // Low bits of splitmix64 output are full-period.
        self.next_u64() & 1 == 1
    }
}
