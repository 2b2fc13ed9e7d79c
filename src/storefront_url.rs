//! Storefront search URL generation.
//!
//! Maps a [`FilterCollection`] onto the storefront's query-parameter grammar.
//! The vendor refinement codes below are fixed constants owned by this module;
//! filter entities never carry them.
//!
//! Parameter order is part of the contract:
//! brand (`rnid`, `p_123`), price (`ref`, `low-price`, `high-price`), then a
//! single `rh` holding the gender/category code followed by star-rating codes
//! in ascending star order.

use crate::filters::{FilterCollection, Gender, ProductCategory, StarRating};
use tracing::debug;
use url::form_urlencoded;

/// Default storefront search endpoint
pub const DEFAULT_STOREFRONT_URL: &str = "https://www.amazon.com/s";

/// Refinement node id sent alongside any brand selection
const BRAND_NODE_PARAM: (&str, &str) = ("rnid", "85457740011");

/// Brand id list parameter, values joined by `|`
const BRAND_PARAM: &str = "p_123";

/// Reference tag sent alongside any price selection
const PRICE_REF_PARAM: (&str, &str) = ("ref", "is_r_p_36_0_0");

const LOW_PRICE_PARAM: &str = "low-price";
const HIGH_PRICE_PARAM: &str = "high-price";

/// Combined refinement parameter, values joined by `,`
const REFINEMENT_PARAM: &str = "rh";

/// Refinement code for a gender + product category pair.
fn gender_refinement(gender: Gender, product_type: ProductCategory) -> &'static str {
    match (gender, product_type) {
        (Gender::Male, ProductCategory::Jeans) => {
            "n:21512907011,p_n_feature_thirty-two_browse-bin:121075132011"
        }
        (Gender::Male, ProductCategory::Shirts) => {
            "n:7141123011,p_n_feature_thirty-two_browse-bin:121075132011"
        }
        (Gender::Female, ProductCategory::Jeans) => {
            "n:21512907011,p_n_feature_thirty-two_browse-bin:121075131011"
        }
        (Gender::Female, ProductCategory::Shirts) => {
            "n:7141123011,p_n_feature_thirty-two_browse-bin:121075131011"
        }
    }
}

/// Refinement code for an "N stars & up" review filter.
fn star_refinement(stars: StarRating) -> &'static str {
    match stars {
        StarRating::Five => "p_72:2661617011",
        StarRating::Four => "p_72:2661618011",
        StarRating::Three => "p_72:2661619011",
        StarRating::Two => "p_72:2661620011",
        StarRating::One => "p_72:2661621011",
    }
}

/// Shortest decimal form; `-0` is written as `0`.
fn format_price(value: f64) -> String {
    (value + 0.0).to_string()
}

/// Build the storefront search URL for the selected filters.
///
/// Returns `base_url` unchanged when nothing is selected.
pub fn build_url(base_url: &str, filters: &FilterCollection) -> String {
    let params = build_query(filters);
    if params.is_empty() {
        base_url.to_string()
    } else {
        format!("{}?{}", base_url, params)
    }
}

/// Encode the selected filters as a query string (without the leading `?`).
pub fn build_query(filters: &FilterCollection) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());

    let brand_ids: Vec<&str> = filters.selected_brands().map(|b| b.id.as_str()).collect();
    if !brand_ids.is_empty() {
        query.append_pair(BRAND_NODE_PARAM.0, BRAND_NODE_PARAM.1);
        query.append_pair(BRAND_PARAM, &brand_ids.join("|"));
    }

    if let Some(range) = filters.price_range.filter(|r| r.selected) {
        query.append_pair(PRICE_REF_PARAM.0, PRICE_REF_PARAM.1);
        query.append_pair(LOW_PRICE_PARAM, &format_price(range.low_price));
        query.append_pair(HIGH_PRICE_PARAM, &format_price(range.high_price));
    }

    let mut refinements: Vec<&str> = Vec::new();
    if let Some(gender) = filters.gender_filter.filter(|g| g.selected) {
        refinements.push(gender_refinement(gender.gender, gender.product_type));
    }
    refinements.extend(filters.selected_ratings().into_iter().map(star_refinement));

    if !refinements.is_empty() {
        query.append_pair(REFINEMENT_PARAM, &refinements.join(","));
    }

    let encoded = query.finish();
    debug!(
        brands = brand_ids.len(),
        refinements = refinements.len(),
        query = %encoded,
        "Built storefront query"
    );
    encoded
}
