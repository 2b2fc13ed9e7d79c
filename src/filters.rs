//! Storefront filter model.
//!
//! Filter entities are vendor-agnostic: they carry only what the UI shows
//! (ids, names, bounds, enum values and a `selected` flag). Every vendor code
//! lives in [`crate::storefront_url`].
//!
//! All transformations on [`FilterCollection`] take `&self` and return a new
//! collection, so callers can keep the previous state around (undo, diffing).

use crate::error::{Result, ShopFilterError};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Gender values accepted by [`is_valid_gender`]
pub const VALID_GENDERS: &[&str] = &["male", "female"];

/// Product categories accepted by [`is_valid_product_category`]
pub const VALID_PRODUCT_CATEGORIES: &[&str] = &["jeans", "shirts"];

/// Star ratings accepted by [`is_valid_star_rating`]
pub const VALID_STAR_RATINGS: &[i64] = &[1, 2, 3, 4, 5];

/// A brand facet value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
    /// Opaque catalog key (e.g. "310579")
    pub id: String,
    /// Display name (e.g. "Nike")
    pub name: String,
    #[serde(default)]
    pub selected: bool,
}

impl Brand {
    pub fn new(id: impl Into<String>, name: impl Into<String>, selected: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            selected,
        }
    }
}

/// Price bounds in the storefront currency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub low_price: f64,
    pub high_price: f64,
    #[serde(default)]
    pub selected: bool,
}

impl PriceRange {
    /// Build a range, rejecting negative, non-finite or inverted bounds.
    pub fn new(low_price: f64, high_price: f64, selected: bool) -> Result<Self> {
        // `-0.0 + 0.0` is `0.0`
        let range = Self {
            low_price: low_price + 0.0,
            high_price: high_price + 0.0,
            selected,
        };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.low_price.is_finite() || !self.high_price.is_finite() {
            return Err(ShopFilterError::Validation(
                "price bounds must be finite numbers".to_string(),
            ));
        }
        if self.low_price < 0.0 {
            return Err(ShopFilterError::Validation(format!(
                "low price {} must not be negative",
                self.low_price
            )));
        }
        if self.low_price > self.high_price {
            return Err(ShopFilterError::Validation(format!(
                "low price {} exceeds high price {}",
                self.low_price, self.high_price
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ShopFilterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            other => Err(ShopFilterError::Validation(format!(
                "unknown gender '{}', expected one of {:?}",
                other, VALID_GENDERS
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductCategory {
    Jeans,
    Shirts,
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductCategory::Jeans => "jeans",
            ProductCategory::Shirts => "shirts",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = ShopFilterError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "jeans" => Ok(ProductCategory::Jeans),
            "shirts" => Ok(ProductCategory::Shirts),
            other => Err(ShopFilterError::Validation(format!(
                "unknown product type '{}', expected one of {:?}",
                other, VALID_PRODUCT_CATEGORIES
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenderFilter {
    pub gender: Gender,
    pub product_type: ProductCategory,
    #[serde(default)]
    pub selected: bool,
}

/// Customer review threshold ("N stars & up"). Serialized as the bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StarRating {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
}

impl StarRating {
    /// All ratings in ascending order.
    pub const ALL: [StarRating; 5] = [
        StarRating::One,
        StarRating::Two,
        StarRating::Three,
        StarRating::Four,
        StarRating::Five,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for StarRating {
    type Error = ShopFilterError;

    fn try_from(stars: u8) -> Result<Self> {
        match stars {
            1 => Ok(StarRating::One),
            2 => Ok(StarRating::Two),
            3 => Ok(StarRating::Three),
            4 => Ok(StarRating::Four),
            5 => Ok(StarRating::Five),
            other => Err(ShopFilterError::Validation(format!(
                "star rating {} is outside 1-5",
                other
            ))),
        }
    }
}

impl From<StarRating> for u8 {
    fn from(stars: StarRating) -> u8 {
        stars.value()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewRatingFilter {
    pub stars: StarRating,
    #[serde(default)]
    pub selected: bool,
}

/// Full set of refinements for one search session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCollection {
    pub brands: Vec<Brand>,
    pub price_range: Option<PriceRange>,
    pub gender_filter: Option<GenderFilter>,
    /// One entry per star value, ascending
    #[serde(deserialize_with = "deserialize_reviews")]
    pub customer_reviews: Vec<ReviewRatingFilter>,
}

/// Decoded reviews are normalized: missing stars become unselected entries,
/// duplicates are rejected.
fn deserialize_reviews<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<ReviewRatingFilter>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<ReviewRatingFilter>::deserialize(deserializer)?;
    normalize_reviews(entries).map_err(serde::de::Error::custom)
}

fn normalize_reviews(entries: Vec<ReviewRatingFilter>) -> Result<Vec<ReviewRatingFilter>> {
    let mut slots: [Option<bool>; 5] = [None; 5];
    for entry in entries {
        let slot = &mut slots[usize::from(entry.stars.value()) - 1];
        if slot.is_some() {
            return Err(ShopFilterError::Validation(format!(
                "duplicate review entry for {} stars",
                entry.stars.value()
            )));
        }
        *slot = Some(entry.selected);
    }

    Ok(StarRating::ALL
        .iter()
        .zip(slots)
        .map(|(&stars, selected)| ReviewRatingFilter {
            stars,
            selected: selected.unwrap_or(false),
        })
        .collect())
}

impl Default for FilterCollection {
    fn default() -> Self {
        Self::empty()
    }
}

impl FilterCollection {
    /// No brands, no price, no gender, and one unselected entry per star value.
    pub fn empty() -> Self {
        Self {
            brands: Vec::new(),
            price_range: None,
            gender_filter: None,
            customer_reviews: StarRating::ALL
                .iter()
                .map(|&stars| ReviewRatingFilter {
                    stars,
                    selected: false,
                })
                .collect(),
        }
    }

    /// Append a brand. Duplicate ids are kept as-is.
    pub fn with_brand(&self, brand: Brand) -> Self {
        let mut next = self.clone();
        next.brands.push(brand);
        next
    }

    /// Flip `selected` on every brand with this id.
    pub fn toggle_brand(&self, brand_id: &str) -> Self {
        let mut next = self.clone();
        for brand in next.brands.iter_mut().filter(|b| b.id == brand_id) {
            brand.selected = !brand.selected;
        }
        next
    }

    pub fn with_price_range(
        &self,
        low_price: f64,
        high_price: f64,
        selected: bool,
    ) -> Result<Self> {
        let range = PriceRange::new(low_price, high_price, selected)?;
        Ok(Self {
            price_range: Some(range),
            ..self.clone()
        })
    }

    pub fn with_gender_filter(
        &self,
        gender: Gender,
        product_type: ProductCategory,
        selected: bool,
    ) -> Self {
        Self {
            gender_filter: Some(GenderFilter {
                gender,
                product_type,
                selected,
            }),
            ..self.clone()
        }
    }

    /// Flip the entry for `stars`. Values outside 1-5 leave the collection unchanged.
    pub fn toggle_review_rating(&self, stars: u8) -> Self {
        let mut next = self.clone();
        let Ok(stars) = StarRating::try_from(stars) else {
            return next;
        };
        for review in next.customer_reviews.iter_mut().filter(|r| r.stars == stars) {
            review.selected = !review.selected;
        }
        next
    }

    pub fn selected_brands(&self) -> impl Iterator<Item = &Brand> {
        self.brands.iter().filter(|b| b.selected)
    }

    /// Selected star ratings in ascending order, deduplicated.
    pub fn selected_ratings(&self) -> Vec<StarRating> {
        let mut stars: Vec<StarRating> = self
            .customer_reviews
            .iter()
            .filter(|r| r.selected)
            .map(|r| r.stars)
            .collect();
        stars.sort();
        stars.dedup();
        stars
    }

    /// Check invariants that serde cannot express: a sane price range and
    /// exactly one review entry per star value.
    pub fn validate(&self) -> Result<()> {
        if let Some(range) = &self.price_range {
            range.validate()?;
        }

        let mut counts = [0usize; 5];
        for review in &self.customer_reviews {
            counts[usize::from(review.stars.value()) - 1] += 1;
        }
        if let Some(idx) = counts.iter().position(|&c| c != 1) {
            return Err(ShopFilterError::Validation(format!(
                "expected one review entry for {} stars, found {}",
                idx + 1,
                counts[idx]
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let filters: FilterCollection = serde_json::from_str(json)?;
        filters.validate()?;
        Ok(filters)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

pub fn is_valid_gender(gender: &str) -> bool {
    VALID_GENDERS.contains(&gender)
}

pub fn is_valid_product_category(product_type: &str) -> bool {
    VALID_PRODUCT_CATEGORIES.contains(&product_type)
}

pub fn is_valid_star_rating(stars: i64) -> bool {
    VALID_STAR_RATINGS.contains(&stars)
}
