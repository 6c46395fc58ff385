use std::sync::{Mutex, PoisonError};

use rand::{rngs::StdRng, Rng, SeedableRng};

/// Characters used for generated passwords. Visually ambiguous glyphs
/// (`O`, `o`, `I`, `l`, `Q`) are left out.
pub const ALPHABET: &[u8] = b"0123456789-.!#%/?+*\
abcdefghijkmnpqrstuvwxyz\
ABCDEFGHJKLMNPRSTUVWXYZ$&<>";

/// Random password generator over [`ALPHABET`].
///
/// Holds one generator seeded once at construction and shared by all callers.
/// The default generator is `StdRng` seeded from OS entropy.
#[derive(Debug)]
pub struct PasswordGenerator<R = StdRng> {
    rng: Mutex<R>,
}

impl PasswordGenerator<StdRng> {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }
}

impl Default for PasswordGenerator<StdRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Rng> PasswordGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// `length` independent uniform picks from [`ALPHABET`], in pick order.
    pub fn generate(&self, length: usize) -> String {
        // A panic elsewhere cannot leave the generator in a state worth refusing.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        (0..length)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}
