use hunter_core::SortField;

pub const BAR_WIDTH: usize = 20;

/// Table columns and the backend sort field each one maps to.
pub const COLUMNS: [(&str, Option<SortField>); 6] = [
    ("Domain", Some(SortField::Domain)),
    ("Company", None),
    ("Readiness", Some(SortField::ReadinessScore)),
    ("Priority", Some(SortField::PriorityScore)),
    ("Segment", Some(SortField::Segment)),
    ("Provider", Some(SortField::Provider)),
];
