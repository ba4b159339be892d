//! Keyboards and message formatting for the admin flows.

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::catalog::{Product, Snapshot};
use crate::localization::t_lang;

use super::commands::{CallbackToken, CategoryAction};

fn cancel_button(language_code: Option<&str>) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(
        format!("❌ {}", t_lang("cancel", language_code)),
        CallbackToken::Cancel.encode(),
    )
}

/// A lone cancel button, attached to free-text prompts so every step can be
/// aborted.
pub fn cancel_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![cancel_button(language_code)]])
}

/// Category picker for the add/modify flows: one row per category, plus the
/// "new category" affordance and cancel. Buttons are keyed by list position,
/// not name.
pub fn category_keyboard(
    categories: &[String],
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = categories
        .iter()
        .enumerate()
        .map(|(index, name)| {
            vec![InlineKeyboardButton::callback(
                name.clone(),
                CallbackToken::Category(index).encode(),
            )]
        })
        .collect();
    rows.push(vec![InlineKeyboardButton::callback(
        t_lang("new-category", language_code),
        CallbackToken::NewCategory.encode(),
    )]);
    rows.push(vec![cancel_button(language_code)]);
    InlineKeyboardMarkup::new(rows)
}

/// Category picker for the delete action.
pub fn category_delete_keyboard(
    categories: &[String],
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = categories
        .iter()
        .enumerate()
        .map(|(index, name)| {
            vec![InlineKeyboardButton::callback(
                name.clone(),
                CallbackToken::DeleteCategory(index).encode(),
            )]
        })
        .collect();
    rows.push(vec![cancel_button(language_code)]);
    InlineKeyboardMarkup::new(rows)
}

/// Disambiguation keyboard keyed by product id.
pub fn product_selection_keyboard(
    products: &[&Product],
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = products
        .iter()
        .map(|product| {
            vec![InlineKeyboardButton::callback(
                format!("{} ({}) · id {}", product.name, product.price, product.id),
                CallbackToken::Product(product.id).encode(),
            )]
        })
        .collect();
    rows.push(vec![cancel_button(language_code)]);
    InlineKeyboardMarkup::new(rows)
}

/// Field picker for the modify flow.
pub fn field_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    use crate::dialogue::ProductField;
    let rows = vec![
        vec![
            InlineKeyboardButton::callback(
                t_lang("field-name", language_code),
                CallbackToken::Field(ProductField::Name).encode(),
            ),
            InlineKeyboardButton::callback(
                t_lang("field-price", language_code),
                CallbackToken::Field(ProductField::Price).encode(),
            ),
        ],
        vec![
            InlineKeyboardButton::callback(
                t_lang("field-media", language_code),
                CallbackToken::Field(ProductField::Media).encode(),
            ),
            InlineKeyboardButton::callback(
                t_lang("field-category", language_code),
                CallbackToken::Field(ProductField::Category).encode(),
            ),
        ],
        vec![cancel_button(language_code)],
    ];
    InlineKeyboardMarkup::new(rows)
}

/// Action picker for the category-management flow.
pub fn category_action_keyboard(language_code: Option<&str>) -> InlineKeyboardMarkup {
    let rows = vec![
        vec![
            InlineKeyboardButton::callback(
                t_lang("cat-add", language_code),
                CallbackToken::CategoryAction(CategoryAction::Add).encode(),
            ),
            InlineKeyboardButton::callback(
                t_lang("cat-delete", language_code),
                CallbackToken::CategoryAction(CategoryAction::Delete).encode(),
            ),
            InlineKeyboardButton::callback(
                t_lang("cat-rename", language_code),
                CallbackToken::CategoryAction(CategoryAction::Rename).encode(),
            ),
        ],
        vec![cancel_button(language_code)],
    ];
    InlineKeyboardMarkup::new(rows)
}

/// Welcome keyboard with the storefront link.
pub fn storefront_keyboard(
    storefront_url: &reqwest::Url,
    language_code: Option<&str>,
) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::url(
        t_lang("open-storefront", language_code),
        storefront_url.clone(),
    )]])
}

/// Catalog listing grouped by category, in first-seen category order with
/// unlisted categories (including the sentinel) appended.
pub fn format_product_list(snapshot: &Snapshot, language_code: Option<&str>) -> String {
    if snapshot.products.is_empty() {
        return t_lang("list-empty", language_code);
    }

    let mut order: Vec<&str> = snapshot.categories.iter().map(|c| c.as_str()).collect();
    for product in &snapshot.products {
        if !order
            .iter()
            .any(|c| c.eq_ignore_ascii_case(&product.category))
        {
            order.push(product.category.as_str());
        }
    }

    let mut out = t_lang("list-title", language_code);
    for category in order {
        let entries: Vec<&Product> = snapshot
            .products
            .iter()
            .filter(|p| p.category.eq_ignore_ascii_case(category))
            .collect();
        if entries.is_empty() {
            continue;
        }
        out.push_str(&format!("\n\n📦 {category}"));
        for product in entries {
            out.push_str(&format!(
                "\n  [{}] {} · {}",
                product.id, product.name, product.price
            ));
        }
    }
    out
}
