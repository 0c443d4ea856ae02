use std::collections::BTreeMap;

use super::{ApiError, Category, CategoryChoice, CategoryId, TriviaBackend};

const ANY_CATEGORY_LABELS: [&str; 3] = ["all", "any", "any category"];

/// Category id to display name. Filled by one [`CategoryDirectory::load`]
/// and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDirectory {
    names: BTreeMap<CategoryId, String>,
}

impl CategoryDirectory {
    pub fn from_categories(categories: impl IntoIterator<Item = Category>) -> Self {
        Self {
            names: categories.into_iter().map(|c| (c.id, c.name)).collect(),
        }
    }

    /// Replaces the directory with the backend's current categories.
    ///
    /// On failure the directory is left empty and the error is handed back
    /// so the caller can warn the user; an empty directory still offers
    /// "any category".
    pub async fn load(&mut self, backend: &dyn TriviaBackend) -> Result<(), ApiError> {
        match backend.categories().await {
            Ok(categories) => {
                *self = Self::from_categories(categories);
                log::debug!("Loaded {} categories", self.len());
                Ok(())
            }
            Err(e) => {
                log::warn!("Unable to load categories: {e}");
                self.names.clear();
                Err(e)
            }
        }
    }

    pub fn name(&self, id: CategoryId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    pub fn label(&self, choice: CategoryChoice) -> &str {
        match choice {
            CategoryChoice::Any => "any category",
            CategoryChoice::Only(id) => self.name(id).unwrap_or("unknown"),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (CategoryId, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn first_id(&self) -> Option<CategoryId> {
        self.names.keys().next().copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Interprets what the user typed or tapped: a category name (any case),
    /// a numeric id, or one of the "any category" labels.
    ///
    /// A numeric id is accepted even when the directory failed to load, so
    /// the user is never locked out by a missing category list.
    pub fn parse_choice(&self, input: &str) -> Option<CategoryChoice> {
        let input = input.trim();
        if ANY_CATEGORY_LABELS
            .iter()
            .any(|label| label.eq_ignore_ascii_case(input))
        {
            return Some(CategoryChoice::Any);
        }
        if let Some((id, _)) = self
            .names
            .iter()
            .find(|(_, name)| name.to_lowercase() == input.to_lowercase())
        {
            return Some(CategoryChoice::Only(*id));
        }
        match input.parse::<CategoryId>() {
            Ok(id) if id > 0 && (self.is_empty() || self.names.contains_key(&id)) => {
                Some(CategoryChoice::Only(id))
            }
            Ok(CategoryChoice::ANY_WIRE_VALUE) => Some(CategoryChoice::Any),
            _ => None,
        }
    }
}
