//! # shopfilter
//!
//! Storefront filter URL builder and LLM filter recommendation proxy.
//!
//! ## Modules
//!
//! - [`filters`] - Filter entities and pure transformations
//! - [`storefront_url`] - Filter collection to storefront search URL
//! - [`prompts`] - Recommendation prompt templates
//! - [`llm`] - OpenAI-compatible chat-completion client
//! - [`recommend`] - Recommendation service facade
//! - [`server`] - HTTP endpoints
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust
//! use shopfilter::filters::{Brand, FilterCollection, Gender, ProductCategory};
//! use shopfilter::storefront_url::build_url;
//!
//! let filters = FilterCollection::empty()
//!     .with_brand(Brand::new("310579", "Nike", true))
//!     .with_gender_filter(Gender::Male, ProductCategory::Jeans, true)
//!     .toggle_review_rating(4);
//! let url = build_url("https://www.amazon.com/s", &filters);
//! assert!(url.starts_with("https://www.amazon.com/s?rnid=85457740011&p_123=310579"));
//! ```

pub mod error;
pub mod filters;
pub mod llm;
pub mod prompts;
pub mod recommend;
pub mod server;
pub mod storefront_url;

pub use error::{Result, ShopFilterError};
