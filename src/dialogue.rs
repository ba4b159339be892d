//! Conversation state for the admin flows.
//!
//! Each multi-step flow is a set of variants on [`FlowState`]; partially
//! collected fields ride along in the variant payload. Exactly one state is
//! stored per chat, so starting a new flow discards any prior one wholly.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

/// The product field being replaced by the modify flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductField {
    Name,
    Price,
    Media,
    Category,
}

impl ProductField {
    pub fn as_key(self) -> &'static str {
        match self {
            ProductField::Name => "name",
            ProductField::Price => "price",
            ProductField::Media => "media",
            ProductField::Category => "category",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(ProductField::Name),
            "price" => Some(ProductField::Price),
            "media" => Some(ProductField::Media),
            "category" => Some(ProductField::Category),
            _ => None,
        }
    }
}

/// Current step of the active admin flow, if any.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum FlowState {
    #[default]
    Idle,
    // Add-product flow
    AddAwaitingName,
    AddAwaitingPrice {
        name: String,
    },
    AddAwaitingMedia {
        name: String,
        price: String,
    },
    AddAwaitingCategory {
        name: String,
        price: String,
        media_ref: String,
    },
    // Modify-product flow
    ModifyAwaitingName,
    ModifyAwaitingSelection,
    ModifyAwaitingField {
        product_id: u64,
    },
    ModifyAwaitingValue {
        product_id: u64,
        field: ProductField,
    },
    ModifyAwaitingMedia {
        product_id: u64,
    },
    ModifyAwaitingCategory {
        product_id: u64,
    },
    // Delete-product flow
    DeleteAwaitingName,
    DeleteAwaitingSelection,
    // Category management flow
    CategoryAwaitingAction,
    CategoryAwaitingNewName,
    CategoryAwaitingDeleteChoice,
    CategoryAwaitingRename,
}

impl FlowState {
    /// Step that collects the replacement value for a product field. Media
    /// and category have dedicated steps; name and price share the free-text
    /// one.
    pub fn value_step(product_id: u64, field: ProductField) -> FlowState {
        match field {
            ProductField::Media => FlowState::ModifyAwaitingMedia { product_id },
            ProductField::Category => FlowState::ModifyAwaitingCategory { product_id },
            ProductField::Name | ProductField::Price => {
                FlowState::ModifyAwaitingValue { product_id, field }
            }
        }
    }
}

/// Per-chat dialogue handle over the in-memory session store.
pub type FlowDialogue = Dialogue<FlowState, InMemStorage<FlowState>>;

static PRICE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:[.,]\d{1,2})?$").unwrap());

/// Validates a product or category name input.
pub fn validate_name(name: &str) -> Result<String, &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("empty");
    }
    if trimmed.len() > 100 {
        return Err("too_long");
    }
    Ok(trimmed.to_string())
}

/// Validates a price input: digits with an optional decimal part, comma
/// accepted and normalized to a dot.
pub fn validate_price(price: &str) -> Result<String, &'static str> {
    let trimmed = price.trim();
    if !PRICE_PATTERN.is_match(trimmed) {
        return Err("invalid");
    }
    Ok(trimmed.replace(',', "."))
}

/// Parses the category rename format `Old -> New`.
pub fn parse_rename_spec(input: &str) -> Option<(String, String)> {
    let (old, new) = input.split_once("->")?;
    let old = old.trim();
    let new = new.trim();
    if old.is_empty() || new.is_empty() {
        return None;
    }
    Some((old.to_string(), new.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        assert_eq!(validate_name("  Mug  ").unwrap(), "Mug");
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_price_validation() {
        assert_eq!(validate_price("9.90").unwrap(), "9.90");
        assert_eq!(validate_price(" 12,50 ").unwrap(), "12.50");
        assert_eq!(validate_price("7").unwrap(), "7");
        assert!(validate_price("9.999").is_err());
        assert!(validate_price("free").is_err());
        assert!(validate_price("-3").is_err());
        assert!(validate_price("").is_err());
    }

    #[test]
    fn test_product_field_round_trip() {
        for field in [
            ProductField::Name,
            ProductField::Price,
            ProductField::Media,
            ProductField::Category,
        ] {
            assert_eq!(ProductField::parse(field.as_key()), Some(field));
        }
        assert_eq!(ProductField::parse("weight"), None);
    }

    #[test]
    fn test_rename_spec_parsing() {
        assert_eq!(
            parse_rename_spec("Home -> Living"),
            Some(("Home".to_string(), "Living".to_string()))
        );
        assert_eq!(parse_rename_spec("Home->Living").unwrap().1, "Living");
        assert!(parse_rename_spec("Home Living").is_none());
        assert!(parse_rename_spec("-> Living").is_none());
        assert!(parse_rename_spec("Home ->").is_none());
    }

    #[test]
    fn test_default_state_is_idle() {
        assert_eq!(FlowState::default(), FlowState::Idle);
    }

    #[test]
    fn test_value_step_routes_each_field() {
        assert_eq!(
            FlowState::value_step(7, ProductField::Name),
            FlowState::ModifyAwaitingValue {
                product_id: 7,
                field: ProductField::Name,
            }
        );
        assert_eq!(
            FlowState::value_step(7, ProductField::Price),
            FlowState::ModifyAwaitingValue {
                product_id: 7,
                field: ProductField::Price,
            }
        );
        // Media and category never land in the free-text value step.
        assert_eq!(
            FlowState::value_step(7, ProductField::Media),
            FlowState::ModifyAwaitingMedia { product_id: 7 }
        );
        assert_eq!(
            FlowState::value_step(7, ProductField::Category),
            FlowState::ModifyAwaitingCategory { product_id: 7 }
        );
    }
}
