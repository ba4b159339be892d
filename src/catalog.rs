//! Catalog store: products and categories persisted as a single JSON snapshot.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Products whose category is removed get reassigned here.
pub const UNASSIGNED_CATEGORY: &str = "Unassigned";

/// A single catalog entry. Field names on the wire match the storefront
/// front-end (`nome`, `prezzo`, `immagine`, `tipologia`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "prezzo")]
    pub price: String,
    #[serde(rename = "immagine", default)]
    pub media_ref: String,
    #[serde(rename = "tipologia")]
    pub category: String,
}

/// The whole catalog, read and written as one unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Snapshot {
    /// Next product id: one past the current maximum, 1 for an empty catalog.
    pub fn next_product_id(&self) -> u64 {
        self.products.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    /// Append a new product and return a clone of it.
    pub fn add_product(
        &mut self,
        name: String,
        price: String,
        media_ref: String,
        category: String,
    ) -> Product {
        let product = Product {
            id: self.next_product_id(),
            name,
            price,
            media_ref,
            category,
        };
        self.products.push(product.clone());
        product
    }

    /// Look up a stored category name, matching case-insensitively.
    pub fn find_category(&self, name: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.eq_ignore_ascii_case(name.trim()))
            .map(|c| c.as_str())
    }

    /// Register a category if it does not exist yet (case-insensitive) and
    /// return the stored spelling. Idempotent.
    pub fn ensure_category(&mut self, name: &str) -> String {
        let trimmed = name.trim();
        if let Some(existing) = self.find_category(trimmed) {
            return existing.to_string();
        }
        self.categories.push(trimmed.to_string());
        trimmed.to_string()
    }

    /// Remove a category and reassign its products to [`UNASSIGNED_CATEGORY`].
    ///
    /// Returns the number of reassigned products, or `None` if no such
    /// category was stored.
    pub fn delete_category(&mut self, name: &str) -> Option<usize> {
        let trimmed = name.trim();
        let before = self.categories.len();
        self.categories
            .retain(|c| !c.eq_ignore_ascii_case(trimmed));
        if self.categories.len() == before {
            return None;
        }
        let mut reassigned = 0;
        for product in &mut self.products {
            if product.category.eq_ignore_ascii_case(trimmed) {
                product.category = UNASSIGNED_CATEGORY.to_string();
                reassigned += 1;
            }
        }
        Some(reassigned)
    }

    /// Rename a category in place, rewriting every matching product.
    ///
    /// Renaming onto an existing category merges the two. Returns the number
    /// of rewritten products, or `None` when the old name is not stored.
    pub fn rename_category(&mut self, old: &str, new: &str) -> Option<usize> {
        let old = old.trim();
        let new = new.trim();
        self.find_category(old)?;
        self.categories.retain(|c| !c.eq_ignore_ascii_case(old));
        let canonical = self.ensure_category(new);
        let mut rewritten = 0;
        for product in &mut self.products {
            if product.category.eq_ignore_ascii_case(old) {
                product.category = canonical.clone();
                rewritten += 1;
            }
        }
        Some(rewritten)
    }

    /// Products whose name matches exactly, ignoring case.
    pub fn find_by_exact_name(&self, name: &str) -> Vec<&Product> {
        let needle = name.trim().to_lowercase();
        self.products
            .iter()
            .filter(|p| p.name.trim().to_lowercase() == needle)
            .collect()
    }

    /// Products matching a free-form query: the union of the exact numeric id
    /// and case-insensitive substring matches on the name.
    pub fn search(&self, query: &str) -> Vec<&Product> {
        let trimmed = query.trim();
        let id = trimmed.parse::<u64>().ok();
        let needle = trimmed.to_lowercase();
        self.products
            .iter()
            .filter(|p| Some(p.id) == id || p.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn product(&self, id: u64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn product_mut(&mut self, id: u64) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == id)
    }

    /// Remove a product by id, returning it if it was present.
    pub fn remove_product(&mut self, id: u64) -> Option<Product> {
        let index = self.products.iter().position(|p| p.id == id)?;
        Some(self.products.remove(index))
    }
}

/// File-backed catalog store. All file access runs inside a single mutex so
/// concurrent flows never interleave a read-modify-write cycle.
pub struct CatalogStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current snapshot. A missing or corrupt file is replaced with
    /// an empty snapshot rather than reported as an error.
    pub async fn read(&self) -> Result<Snapshot> {
        let _guard = self.lock.lock().await;
        self.load_or_init()
    }

    /// Persist a full snapshot, replacing any prior content.
    pub async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let _guard = self.lock.lock().await;
        self.persist(snapshot)
    }

    /// Read-modify-write in one critical section. Id assignment and every
    /// other mutation go through here so no two writers race.
    pub async fn update<T>(&self, mutate: impl FnOnce(&mut Snapshot) -> T) -> Result<T> {
        let _guard = self.lock.lock().await;
        let mut snapshot = self.load_or_init()?;
        let outcome = mutate(&mut snapshot);
        self.persist(&snapshot)?;
        Ok(outcome)
    }

    fn load_or_init(&self) -> Result<Snapshot> {
        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Snapshot>(&content) {
                Ok(snapshot) => Ok(snapshot),
                Err(err) => {
                    warn!(path = %self.path.display(), error = %err, "Corrupt catalog file, reinitializing");
                    let empty = Snapshot::default();
                    self.persist(&empty)?;
                    Ok(empty)
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No catalog file yet, initializing empty snapshot");
                let empty = Snapshot::default();
                self.persist(&empty)?;
                Ok(empty)
            }
            Err(err) => Err(err).with_context(|| {
                format!("failed to read catalog file {}", self.path.display())
            }),
        }
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create catalog directory {}", parent.display())
                })?;
            }
        }
        // Indented UTF-8, non-ASCII left unescaped; the storefront reads this
        // file directly.
        let mut content = serde_json::to_string_pretty(snapshot)?;
        content.push('\n');
        fs::write(&self.path, content)
            .with_context(|| format!("failed to write catalog file {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> Snapshot {
        let mut snapshot = Snapshot::default();
        snapshot.ensure_category("Home");
        snapshot.ensure_category("Office");
        snapshot.add_product(
            "Mug".to_string(),
            "9.90".to_string(),
            "".to_string(),
            "Home".to_string(),
        );
        snapshot.add_product(
            "Desk Mug".to_string(),
            "12.00".to_string(),
            "".to_string(),
            "Office".to_string(),
        );
        snapshot
    }

    #[test]
    fn test_id_assignment_starts_at_one() {
        assert_eq!(Snapshot::default().next_product_id(), 1);
    }

    #[test]
    fn test_ids_are_unique_and_increasing() {
        let mut snapshot = Snapshot::default();
        let mut last = 0;
        for i in 0..10 {
            let p = snapshot.add_product(
                format!("p{i}"),
                "1".to_string(),
                String::new(),
                "c".to_string(),
            );
            assert!(p.id > last);
            last = p.id;
        }
        // Ids never reuse a removed product's slot below the maximum.
        snapshot.remove_product(3);
        assert_eq!(snapshot.next_product_id(), last + 1);
    }

    #[test]
    fn test_ensure_category_is_case_insensitive_idempotent() {
        let mut snapshot = Snapshot::default();
        assert_eq!(snapshot.ensure_category("Home"), "Home");
        assert_eq!(snapshot.ensure_category("home"), "Home");
        assert_eq!(snapshot.ensure_category(" HOME "), "Home");
        assert_eq!(snapshot.categories, vec!["Home".to_string()]);
    }

    #[test]
    fn test_delete_category_reassigns_matching_products() {
        let mut snapshot = Snapshot::default();
        snapshot.ensure_category("Home");
        snapshot.add_product("a".into(), "1".into(), String::new(), "home".into());
        snapshot.add_product("b".into(), "1".into(), String::new(), "HOME".into());
        snapshot.add_product("c".into(), "1".into(), String::new(), "Office".into());

        let reassigned = snapshot.delete_category("Home");
        assert_eq!(reassigned, Some(2));
        assert!(snapshot.find_category("home").is_none());
        assert_eq!(snapshot.products[0].category, UNASSIGNED_CATEGORY);
        assert_eq!(snapshot.products[1].category, UNASSIGNED_CATEGORY);
        assert_eq!(snapshot.products[2].category, "Office");
    }

    #[test]
    fn test_delete_unknown_category_returns_none() {
        let mut snapshot = sample_snapshot();
        assert_eq!(snapshot.delete_category("Garden"), None);
        assert_eq!(snapshot.categories.len(), 2);
    }

    #[test]
    fn test_rename_category_rewrites_products() {
        let mut snapshot = sample_snapshot();
        let rewritten = snapshot.rename_category("home", "Living");
        assert_eq!(rewritten, Some(1));
        assert!(snapshot.find_category("Home").is_none());
        assert_eq!(snapshot.find_category("living"), Some("Living"));
        assert_eq!(snapshot.products[0].category, "Living");
        assert_eq!(snapshot.products[1].category, "Office");
    }

    #[test]
    fn test_rename_onto_existing_category_merges() {
        let mut snapshot = sample_snapshot();
        let rewritten = snapshot.rename_category("Home", "office");
        assert_eq!(rewritten, Some(1));
        assert_eq!(snapshot.categories, vec!["Office".to_string()]);
        assert_eq!(snapshot.products[0].category, "Office");
    }

    #[test]
    fn test_find_by_exact_name_ignores_case() {
        let snapshot = sample_snapshot();
        assert_eq!(snapshot.find_by_exact_name("mug").len(), 1);
        assert_eq!(snapshot.find_by_exact_name("  MUG ").len(), 1);
        assert!(snapshot.find_by_exact_name("mu").is_empty());
    }

    #[test]
    fn test_search_matches_substring_or_id() {
        let mut snapshot = sample_snapshot();
        snapshot.add_product(
            "Size 2 Shoe".into(),
            "30".into(),
            String::new(),
            "Home".into(),
        );
        assert_eq!(snapshot.search("mug").len(), 2);
        assert_eq!(snapshot.search("desk").len(), 1);
        // A numeric query matches both the exact id and any name containing
        // the digits.
        let hits = snapshot.search("2");
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().any(|p| p.id == 2));
        assert!(hits.iter().any(|p| p.name == "Size 2 Shoe"));
        assert!(snapshot.search("99").is_empty());
    }

    #[test]
    fn test_remove_product_returns_removed_entry() {
        let mut snapshot = sample_snapshot();
        let removed = snapshot.remove_product(1).unwrap();
        assert_eq!(removed.name, "Mug");
        assert!(snapshot.remove_product(1).is_none());
        assert_eq!(snapshot.products.len(), 1);
    }

    #[test]
    fn test_snapshot_json_field_names() {
        let mut snapshot = Snapshot::default();
        snapshot.add_product(
            "Caffè".into(),
            "3.50".into(),
            "https://example.test/media/a.jpg".into(),
            "Bar".into(),
        );
        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        assert!(json.contains("\"nome\": \"Caffè\""));
        assert!(json.contains("\"prezzo\": \"3.50\""));
        assert!(json.contains("\"immagine\""));
        assert!(json.contains("\"tipologia\": \"Bar\""));
        // Non-ASCII must not be escaped.
        assert!(!json.contains("\\u"));
    }
}
