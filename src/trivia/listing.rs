use super::CategoryId;

/// Questions per listing page. Fixed by the backend.
pub const PAGE_SIZE: u64 = 10;

pub fn page_count(total_questions: u64) -> u64 {
    total_questions.div_ceil(PAGE_SIZE)
}

/// What the question list currently shows. Changing the category or the
/// search term always starts over from the first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingQuery {
    pub page: u64,
    pub category: Option<CategoryId>,
    pub search_term: Option<String>,
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self {
            page: 1,
            category: None,
            search_term: None,
        }
    }
}

impl ListingQuery {
    pub fn select_category(&mut self, category: Option<CategoryId>) {
        self.category = category;
        self.page = 1;
    }

    pub fn search(&mut self, term: &str) {
        let term = term.trim();
        self.search_term = (!term.is_empty()).then(|| term.to_string());
        self.page = 1;
    }

    pub fn go_to(&mut self, page: u64) {
        self.page = page.max(1);
    }

    /// Query string for `GET /questions`. An unset category goes out as the
    /// literal `null` and an unset search term as an empty string.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("page", self.page.to_string()),
            (
                "current_category",
                self.category
                    .map_or_else(|| "null".to_string(), |id| id.to_string()),
            ),
            ("search_term", self.search_term.clone().unwrap_or_default()),
        ]
    }
}
