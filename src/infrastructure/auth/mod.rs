//! Key hashing and secret generation

mod generator;
mod hash;

pub use generator::{KeyGenerator, KEY_PREFIX_LEN};
pub use hash::{Argon2KeyHasher, KeyHasher};
