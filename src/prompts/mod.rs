//! Prompt module for LLM-based operations.
//!
//! This module provides the prompt templates sent to the model provider.

pub mod filter_recommendation;

pub use filter_recommendation::*;
