pub mod random;

pub use random::{RandomSource, ScriptedRandom, SeededRandom, ThreadRandom};
