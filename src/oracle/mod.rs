//! Decision oracle - language-model adapter and strict decision parsing

pub mod decision;
pub mod openai;

pub use decision::{SYSTEM_PROMPT, parse_decision};
pub use openai::OpenAiOracle;
