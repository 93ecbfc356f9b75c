pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 200;
pub const MAX_MIN_SCORE: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeadFilters {
    pub segment: Option<String>,
    pub min_score: Option<u32>,
    pub provider: Option<String>,
    pub search: Option<String>,
}

impl LeadFilters {
    /// Trims text fields, drops empty ones and caps the minimum score.
    pub fn normalized(self) -> Self {
        Self {
            segment: non_empty(self.segment),
            min_score: self.min_score.map(|score| score.min(MAX_MIN_SCORE)),
            provider: non_empty(self.provider),
            search: non_empty(self.search),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segment.is_none()
            && self.min_score.is_none()
            && self.provider.is_none()
            && self.search.is_none()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Domain,
    ReadinessScore,
    PriorityScore,
    Segment,
    Provider,
    ScannedAt,
}

impl SortField {
    pub const ALL: [SortField; 6] = [
        SortField::Domain,
        SortField::ReadinessScore,
        SortField::PriorityScore,
        SortField::Segment,
        SortField::Provider,
        SortField::ScannedAt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Domain => "domain",
            SortField::ReadinessScore => "readiness_score",
            SortField::PriorityScore => "priority_score",
            SortField::Segment => "segment",
            SortField::Provider => "provider",
            SortField::ScannedAt => "scanned_at",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|field| field.as_str().eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

/// Everything the backend needs to produce one page of leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadQuery {
    pub filters: LeadFilters,
    pub page: u32,
    pub page_size: u32,
    pub sort: Option<Sort>,
}

impl Default for LeadQuery {
    fn default() -> Self {
        Self {
            filters: LeadFilters::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            sort: None,
        }
    }
}

impl LeadQuery {
    /// Query parameters for `GET /leads`, in a stable order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = filter_pairs(&self.filters);
        pairs.push(("page".to_string(), self.page.to_string()));
        pairs.push(("page_size".to_string(), self.page_size.to_string()));
        if let Some(sort) = self.sort {
            pairs.push(("sort_by".to_string(), sort.field.as_str().to_string()));
            pairs.push(("sort_order".to_string(), sort.order.as_str().to_string()));
        }
        pairs
    }

    /// Query parameters for `GET /leads/export`; pagination does not apply.
    pub fn export_pairs(&self) -> Vec<(String, String)> {
        filter_pairs(&self.filters)
    }
}

fn filter_pairs(filters: &LeadFilters) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if let Some(segment) = &filters.segment {
        pairs.push(("segment".to_string(), segment.clone()));
    }
    if let Some(score) = filters.min_score {
        pairs.push(("min_score".to_string(), score.to_string()));
    }
    if let Some(provider) = &filters.provider {
        pairs.push(("provider".to_string(), provider.clone()));
    }
    if let Some(search) = &filters.search {
        pairs.push(("search".to_string(), search.clone()));
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_drops_blank_fields_and_caps_score() {
        let filters = LeadFilters {
            segment: Some("  Migration ".to_string()),
            min_score: Some(250),
            provider: Some("   ".to_string()),
            search: None,
        }
        .normalized();

        assert_eq!(filters.segment.as_deref(), Some("Migration"));
        assert_eq!(filters.min_score, Some(100));
        assert_eq!(filters.provider, None);
    }

    #[test]
    fn export_pairs_skip_pagination_and_sort() {
        let query = LeadQuery {
            filters: LeadFilters {
                provider: Some("M365".to_string()),
                ..LeadFilters::default()
            },
            page: 3,
            page_size: 20,
            sort: Some(Sort {
                field: SortField::Domain,
                order: SortOrder::Desc,
            }),
        };
        assert_eq!(
            query.export_pairs(),
            vec![("provider".to_string(), "M365".to_string())]
        );
        assert_eq!(query.query_pairs().len(), 5);
    }

    #[test]
    fn sort_field_names_round_trip() {
        for field in SortField::ALL {
            assert_eq!(SortField::from_name(field.as_str()), Some(field));
        }
        assert_eq!(SortField::from_name("score"), None);
    }
}
