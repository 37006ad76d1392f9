//! Internal-invariant-violation errors: conditions that indicate a bug in
//! the generator rather than an expected outcome of the algorithm. These are
//! the only failures in this crate represented via `std::error::Error`
//! (everything else, `Unsatisfiable`, `MustGuess`, a failed shift, is a
//! tagged return value consumed by ordinary control flow).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("cell ({row}, {col}) is already revealed")]
    AlreadyRevealed { row: usize, col: usize },

    #[error("cell ({row}, {col}) is a mine and cannot be revealed")]
    RevealedMine { row: usize, col: usize },
}
