//! Monte Carlo machinery for the ballot-box test.
//!
//! - [`multinomial`]: draws count vectors from Multinomial(J, r)
//! - [`engine`]: the sequential p-value test over the sampling ladder

pub mod engine;
pub mod multinomial;

// Re-export commonly used items
pub use engine::{
    log_likelihood, log_probabilities, test_ballot_box, validate_ballot_box, SequentialTester,
};
pub use multinomial::MultinomialSampler;
