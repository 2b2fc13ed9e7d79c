//! Filter recommendation prompt.
//!
//! Renders the shopper's current filters, current query and query history
//! into a fixed instruction document for the model provider. Inputs are
//! embedded as-is; nothing here interprets them.

use crate::error::Result;
use crate::filters::FilterCollection;

/// Instruction template.
/// Placeholders: {filters_json}, {current_query}, {past_queries}
pub const FILTER_RECOMMENDATION_TEMPLATE: &str = r#"# Storefront Filter Recommendation

You are a filter recommendation system for an online storefront. Analyze the shopper's current session and search history, then recommend the search filters most likely to match what they want to buy.

## Input Data

**Current Filters:**
{filters_json}

**Current Query:** "{current_query}"

**Past Queries:**
{past_queries}

## Goals

Recommend filters that:
1. Narrow results toward the shopper's likely purchase
2. Surface relevant options first
3. Remove clearly irrelevant results
4. Stay consistent with patterns in the search history

## Analysis Framework

Consider:
- **Intent Evolution**: has the search intent changed or stayed consistent?
- **Category Patterns**: is the shopper focused on specific product categories?
- **Price Sensitivity**: do past queries suggest a budget?
- **Brand Preferences**: are brands mentioned repeatedly?
- **Feature Focus**: are specific features or attributes requested again and again?
- **Urgency Indicators**: do queries suggest a time-sensitive need?

## Available Filters

- `brands` - product brands, each {"id": string, "name": string, "selected": bool}
- `priceRange` - one price bracket {"lowPrice": number, "highPrice": number, "selected": bool} with lowPrice <= highPrice
- `genderFilter` - one department {"gender": "male" | "female", "productType": "jeans" | "shirts", "selected": bool}
- `customerReviews` - rating thresholds, one entry per star value {"stars": 1-5, "selected": bool}

## Response Format

Return ONLY a JSON object with the same structure as the current filters (no markdown, no extra text):
{
  "brands": [...],
  "priceRange": {...} | null,
  "genderFilter": {...} | null,
  "customerReviews": [...]
}

Now analyze the data above and return your filter recommendations."#;

/// Shown in place of an empty query history
const NO_PAST_QUERIES: &str = "(none)";

/// Build the recommendation prompt.
///
/// Callers pass [`FilterCollection::empty`] and an empty slice when the
/// shopper has no filters or history; both render the same as if omitted.
pub fn build_filter_recommendation_prompt(
    filters: &FilterCollection,
    current_query: &str,
    past_queries: &[String],
) -> Result<String> {
    let filters_json = serde_json::to_string_pretty(filters)?;
    let past = format_past_queries(past_queries);

    Ok(render(
        FILTER_RECOMMENDATION_TEMPLATE,
        &[
            ("filters_json", filters_json.as_str()),
            ("current_query", current_query),
            ("past_queries", past.as_str()),
        ],
    ))
}

/// Numbered list, one query per line.
fn format_past_queries(past_queries: &[String]) -> String {
    if past_queries.is_empty() {
        return NO_PAST_QUERIES.to_string();
    }
    past_queries
        .iter()
        .enumerate()
        .map(|(i, q)| format!("{}. {}", i + 1, q))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Substitute `{name}` placeholders in one pass, so substituted text is never rescanned.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let hit = vars.iter().find_map(|(name, value)| {
            let key_len = name.len() + 2;
            let is_match = tail.len() >= key_len
                && tail.as_bytes()[key_len - 1] == b'}'
                && &tail[1..key_len - 1] == *name;
            is_match.then_some((key_len, *value))
        });

        match hit {
            Some((key_len, value)) => {
                out.push_str(value);
                rest = &tail[key_len..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
