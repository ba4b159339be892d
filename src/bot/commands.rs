//! Slash-command parsing and the admin-only gate.

use crate::dialogue::ProductField;

/// Commands understood by the bot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Cancel,
    AddProduct,
    ListProducts,
    ModifyProduct,
    DeleteProduct,
    Categories,
}

impl Command {
    /// Parse the leading token of a message as a command. An `@botname`
    /// suffix is tolerated, the way Telegram appends it in groups.
    pub fn parse(text: &str) -> Option<Command> {
        let token = text.trim().split_whitespace().next()?;
        if !token.starts_with('/') {
            return None;
        }
        let name = token
            .split('@')
            .next()
            .unwrap_or(token)
            .to_ascii_lowercase();
        match name.as_str() {
            "/start" => Some(Command::Start),
            "/help" => Some(Command::Help),
            "/cancel" => Some(Command::Cancel),
            "/addproduct" => Some(Command::AddProduct),
            "/listproducts" => Some(Command::ListProducts),
            "/modifyproduct" => Some(Command::ModifyProduct),
            "/deleteproduct" => Some(Command::DeleteProduct),
            "/categories" => Some(Command::Categories),
            _ => None,
        }
    }

    /// Whether the command is reserved to the configured admin.
    pub fn requires_admin(self) -> bool {
        !matches!(self, Command::Start)
    }
}

/// Inline-keyboard callback tokens, parsed from the opaque data string.
///
/// Category buttons carry the category's position in the stored list rather
/// than its name: callback data is capped at 64 bytes by the Bot API, while
/// category names can be far longer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallbackToken {
    Cancel,
    /// Existing category picked during add/modify, by list position.
    Category(usize),
    /// "Create a new category" affordance.
    NewCategory,
    /// Product picked from a disambiguation keyboard.
    Product(u64),
    /// Field picked during the modify flow.
    Field(ProductField),
    /// Category-management action.
    CategoryAction(CategoryAction),
    /// Category picked for deletion, by list position.
    DeleteCategory(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CategoryAction {
    Add,
    Delete,
    Rename,
}

impl CallbackToken {
    pub fn parse(data: &str) -> Option<CallbackToken> {
        if data == "cancel" {
            return Some(CallbackToken::Cancel);
        }
        if data == "newcat" {
            return Some(CallbackToken::NewCategory);
        }
        if let Some(index) = data.strip_prefix("cat_") {
            return index.parse().ok().map(CallbackToken::Category);
        }
        if let Some(id) = data.strip_prefix("prod_") {
            return id.parse().ok().map(CallbackToken::Product);
        }
        if let Some(field) = data.strip_prefix("field_") {
            return ProductField::parse(field).map(CallbackToken::Field);
        }
        if let Some(action) = data.strip_prefix("act_") {
            let action = match action {
                "add" => CategoryAction::Add,
                "delete" => CategoryAction::Delete,
                "rename" => CategoryAction::Rename,
                _ => return None,
            };
            return Some(CallbackToken::CategoryAction(action));
        }
        if let Some(index) = data.strip_prefix("delcat_") {
            return index.parse().ok().map(CallbackToken::DeleteCategory);
        }
        None
    }

    pub fn encode(&self) -> String {
        match self {
            CallbackToken::Cancel => "cancel".to_string(),
            CallbackToken::Category(index) => format!("cat_{index}"),
            CallbackToken::NewCategory => "newcat".to_string(),
            CallbackToken::Product(id) => format!("prod_{id}"),
            CallbackToken::Field(field) => format!("field_{}", field.as_key()),
            CallbackToken::CategoryAction(CategoryAction::Add) => "act_add".to_string(),
            CallbackToken::CategoryAction(CategoryAction::Delete) => "act_delete".to_string(),
            CallbackToken::CategoryAction(CategoryAction::Rename) => "act_rename".to_string(),
            CallbackToken::DeleteCategory(index) => format!("delcat_{index}"),
        }
    }
}
