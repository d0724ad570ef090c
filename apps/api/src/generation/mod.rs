// Generation: brief → drafted proposal content via the LLM client.

pub mod generator;
pub mod handlers;
pub mod prompts;
