//! Keyboard shortcuts for destination folders
//!
//! Folders get the uppercased first letter of their name when it is free.
//! Collisions draw a random unused letter, then a random unused digit, and
//! go without a shortcut once all 36 are taken.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::protocol::DirectoryEntry;

use super::config::ShortcutMode;

/// Assign shortcuts to `names`, which must already be in listing order.
///
/// The result is index-aligned with `names`.
pub fn assign<S, R>(names: &[S], rng: &mut R) -> Vec<Option<char>>
where
    S: AsRef<str>,
    R: Rng + ?Sized,
{
    let mut shortcuts = vec![None; names.len()];
    let mut used = HashSet::new();
    let mut deferred = Vec::new();

    for (index, name) in names.iter().enumerate() {
        match first_letter(name.as_ref()) {
            Some(letter) if used.insert(letter) => shortcuts[index] = Some(letter),
            _ => deferred.push(index),
        }
    }

    let mut letters: Vec<char> = ('A'..='Z').filter(|c| !used.contains(c)).collect();
    let mut unassigned = Vec::new();
    for index in deferred {
        match draw(&mut letters, rng) {
            Some(letter) => shortcuts[index] = Some(letter),
            None => unassigned.push(index),
        }
    }

    let mut digits: Vec<char> = ('0'..='9').collect();
    for index in unassigned {
        shortcuts[index] = draw(&mut digits, rng);
    }

    shortcuts
}

/// Uppercased first character, if it is a single alphabetic character
fn first_letter(name: &str) -> Option<char> {
    let first = name.chars().next()?;
    let mut upper = first.to_uppercase();
    let letter = upper.next()?;
    if upper.next().is_some() || !letter.is_alphabetic() {
        return None;
    }
    Some(letter)
}

/// Take a uniformly random element out of the pool
fn draw<R: Rng + ?Sized>(pool: &mut Vec<char>, rng: &mut R) -> Option<char> {
    if pool.is_empty() {
        return None;
    }
    let index = rng.gen_range(0..pool.len());
    Some(pool.swap_remove(index))
}

/// Applies [`assign`] under the configured [`ShortcutMode`]
pub struct ShortcutAssigner {
    mode: ShortcutMode,
    session_token: String,
}

impl ShortcutAssigner {
    pub fn new(mode: ShortcutMode) -> Self {
        Self {
            mode,
            session_token: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn label(&self, names: Vec<String>) -> Vec<DirectoryEntry> {
        let shortcuts = match self.mode {
            ShortcutMode::PerRequest => assign(&names, &mut rand::thread_rng()),
            ShortcutMode::Session => assign(&names, &mut self.session_rng(&names)),
        };

        names
            .into_iter()
            .zip(shortcuts)
            .map(|(name, shortcut)| DirectoryEntry { name, shortcut })
            .collect()
    }

    fn session_rng(&self, names: &[String]) -> StdRng {
        let mut context = md5::Context::new();
        context.consume(self.session_token.as_bytes());
        for name in names {
            context.consume([0u8]);
            context.consume(name.as_bytes());
        }
        let digest = context.compute();
        let mut seed = [0u8; 8];
        seed.copy_from_slice(&digest.0[..8]);
        StdRng::seed_from_u64(u64::from_le_bytes(seed))
    }
}
