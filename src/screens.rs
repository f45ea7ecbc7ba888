use std::sync::Arc;

use tracing::debug;

use crate::domain::AdminError;
use crate::record::FieldValue;
use crate::view::{ColumnSpec, FilterSpec, Renderer};

/// One back office screen, described entirely as data. Every screen runs
/// through the same view engine; only these specifications differ.
pub struct ScreenSpec {
    pub name: String,
    pub title: String,
    pub columns: Vec<ColumnSpec>,
    pub filters: Vec<FilterSpec>,
    /// Shown instead of the table when nothing matches.
    pub empty_text: Option<String>,
    /// Per-record action hint for the selected row.
    pub row_action: Option<Renderer>,
}

pub const BUILTIN_SCREENS: [&str; 4] = ["properties", "neighborhoods", "blog-posts", "inquiries"];

/// Look up the screen for an explicit `--screen` request, or derive a
/// generic one from the loaded field names when no screen was named.
pub fn resolve(requested: Option<&str>, field_names: &[String]) -> Result<ScreenSpec, AdminError> {
    match requested {
        Some(name) => builtin(name).ok_or_else(|| {
            debug!("Unknown screen '{name}', built-in screens are {BUILTIN_SCREENS:?}");
            AdminError::UnknownScreen(name.to_string())
        }),
        None => {
            debug!("No screen requested, deriving a generic one from the data");
            Ok(generic(field_names))
        }
    }
}

pub fn builtin(name: &str) -> Option<ScreenSpec> {
    match name {
        "properties" => Some(properties()),
        "neighborhoods" => Some(neighborhoods()),
        "blog-posts" => Some(blog_posts()),
        "inquiries" => Some(inquiries()),
        _ => None,
    }
}

/// Generic fallback: every field becomes a plain column, no filters.
pub fn generic(field_names: &[String]) -> ScreenSpec {
    ScreenSpec {
        name: "generic".to_string(),
        title: "Records".to_string(),
        columns: field_names.iter().map(ColumnSpec::new).collect(),
        filters: Vec::new(),
        empty_text: None,
        row_action: None,
    }
}

fn properties() -> ScreenSpec {
    ScreenSpec {
        name: "properties".to_string(),
        title: "Properties".to_string(),
        columns: vec![
            ColumnSpec::new("name").label("Name"),
            // Derived location string; search and sort go through the
            // extractor, not the raw fields.
            ColumnSpec::new("location").label("Location").extract(|r| {
                match (r.value("neighborhood").text(), r.value("city").text()) {
                    (Some(n), Some(c)) => FieldValue::Str(format!("{n}, {c}")),
                    (Some(one), None) | (None, Some(one)) => FieldValue::Str(one),
                    (None, None) => FieldValue::Null,
                }
            }),
            ColumnSpec::new("bedrooms").label("Bedrooms"),
            ColumnSpec::new("nightly_rate").label("Rate").render(|r| {
                match r.value("nightly_rate").number() {
                    Some(rate) => format!("${rate:.0} / night"),
                    None => "∅".to_string(),
                }
            }),
            ColumnSpec::new("status").label("Status"),
        ],
        filters: vec![
            FilterSpec::new("status", "Status")
                .option("active", "Active")
                .option("draft", "Draft")
                .option("archived", "Archived"),
            FilterSpec::new("bedrooms", "Bedrooms")
                .option("1", "1")
                .option("2", "2")
                .option("3", "3")
                .option("4", "4"),
        ],
        empty_text: Some("No properties match the current filters".to_string()),
        row_action: Some(Arc::new(|r| match r.id() {
            Some(id) => format!("edit: /admin/properties/{id}"),
            None => "edit: /admin/properties".to_string(),
        })),
    }
}

fn neighborhoods() -> ScreenSpec {
    ScreenSpec {
        name: "neighborhoods".to_string(),
        title: "Neighborhoods".to_string(),
        columns: vec![
            ColumnSpec::new("name").label("Name"),
            ColumnSpec::new("city").label("City"),
            ColumnSpec::new("property_count").label("Properties"),
            ColumnSpec::new("featured").label("Featured"),
        ],
        filters: vec![
            FilterSpec::new("featured", "Featured")
                .option("true", "Yes")
                .option("false", "No"),
        ],
        empty_text: None,
        row_action: None,
    }
}

fn blog_posts() -> ScreenSpec {
    ScreenSpec {
        name: "blog-posts".to_string(),
        title: "Blog posts".to_string(),
        columns: vec![
            ColumnSpec::new("title").label("Title"),
            ColumnSpec::new("author").label("Author"),
            ColumnSpec::new("published_at").label("Published"),
            ColumnSpec::new("status").label("Status"),
            // Slugs are internal routing keys, noise in a free-text search.
            ColumnSpec::new("slug").label("Slug").searchable(false),
        ],
        filters: vec![
            FilterSpec::new("status", "Status")
                .option("published", "Published")
                .option("draft", "Draft"),
        ],
        empty_text: None,
        row_action: Some(Arc::new(|r| {
            let slug = r.value("slug");
            format!("open: /blog/{slug}")
        })),
    }
}

fn inquiries() -> ScreenSpec {
    ScreenSpec {
        name: "inquiries".to_string(),
        title: "Inquiries".to_string(),
        columns: vec![
            ColumnSpec::new("guest_name").label("Guest"),
            ColumnSpec::new("property").label("Property"),
            ColumnSpec::new("check_in").label("Check-in"),
            ColumnSpec::new("nights").label("Nights"),
            ColumnSpec::new("status").label("Status").extract(|r| {
                // Localized status label drives search and sort.
                match r.value("status").text().as_deref() {
                    Some("new") => FieldValue::from("New"),
                    Some("answered") => FieldValue::from("Answered"),
                    Some("archived") => FieldValue::from("Archived"),
                    Some(other) => FieldValue::from(other),
                    None => FieldValue::Null,
                }
            }),
        ],
        filters: vec![
            FilterSpec::new("status", "Status")
                .option("new", "New")
                .option("answered", "Answered")
                .option("archived", "Archived"),
        ],
        empty_text: Some("No inquiries match the current filters".to_string()),
        row_action: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Record;

    #[test]
    fn every_builtin_screen_resolves() {
        for name in BUILTIN_SCREENS {
            let screen = resolve(Some(name), &[]).unwrap();
            assert_eq!(screen.name, name);
            assert!(!screen.columns.is_empty());
        }
    }

    #[test]
    fn unknown_screen_is_an_error_only_when_requested() {
        assert!(matches!(
            resolve(Some("bookings"), &[]),
            Err(AdminError::UnknownScreen(_))
        ));
        let fields = vec!["id".to_string(), "name".to_string()];
        let screen = resolve(None, &fields).unwrap();
        assert_eq!(screen.columns.len(), 2);
        assert!(screen.filters.is_empty());
    }

    #[test]
    fn property_location_is_derived_from_two_fields() {
        let screen = properties();
        let location = screen
            .columns
            .iter()
            .find(|c| c.key == "location")
            .unwrap();
        let record = Record::new()
            .with("neighborhood", "Old Town")
            .with("city", "Lisbon");
        assert_eq!(
            location.effective_value(&record).text().unwrap(),
            "Old Town, Lisbon"
        );
        assert!(location.effective_value(&Record::new()).is_null());
    }
}
