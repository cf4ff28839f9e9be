//! Answer generation: prompt assembly and the retrieve-then-generate chain

mod chain;
mod prompt;

pub use chain::RagChain;
pub use prompt::PromptBuilder;

#[cfg(test)]
pub(crate) use chain::tests as test_support;
