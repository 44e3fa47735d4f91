//! Category sheet schema and row validation.

use std::collections::HashMap;

use kawn_core::Slug;

use super::{Operation, Plan, PlannedRow, RowError, RowView, Sheet, matches_label};
use crate::api::{Category, CategoryInput};

/// Column order for category sheets.
pub const COLUMNS: &[&str] = &["Name", "NameAr", "Description", "DescriptionAr", "Slug", "Parent"];

/// Headers an import cannot do without.
pub const REQUIRED_COLUMNS: &[&str] = &["Name"];

/// Validate every row and decide create vs update by slug.
pub(crate) fn plan(sheet: &Sheet, existing: &[Category]) -> Plan {
    let mut plan = Plan::default();
    let mut seen: HashMap<Slug, usize> = HashMap::new();

    for row in sheet.rows() {
        match validate(row, existing, &mut seen) {
            Ok(operation) => plan.rows.push(PlannedRow {
                row: row.number(),
                operation,
            }),
            Err(errors) => plan.errors.extend(errors),
        }
    }
    plan
}

fn validate(
    row: RowView<'_>,
    existing: &[Category],
    seen: &mut HashMap<Slug, usize>,
) -> Result<Operation, Vec<RowError>> {
    let number = row.number();
    let mut errors = Vec::new();

    let name = row.get("Name");
    if name.is_none() {
        errors.push(RowError::cell(number, "Name", "Name is required"));
    }

    let slug = match (row.get("Slug"), name) {
        (Some(raw), _) => Slug::parse(raw)
            .map_err(|e| errors.push(RowError::cell(number, "Slug", e.to_string())))
            .ok(),
        (None, Some(name)) => {
            let derived = Slug::slugify(name);
            if derived.is_none() {
                errors.push(RowError::cell(
                    number,
                    "Slug",
                    "Name has no letters or digits to build a slug from; fill in Slug",
                ));
            }
            derived
        }
        (None, None) => None,
    };

    if let Some(slug) = &slug {
        if let Some(first) = seen.get(slug) {
            errors.push(RowError::cell(
                number,
                "Slug",
                format!("Duplicate slug '{slug}', already used on row {first}"),
            ));
        } else {
            seen.insert(slug.clone(), number);
        }
    }

    let parent = match row.get("Parent") {
        None => None,
        Some(label) => {
            let found = existing.iter().find(|c| {
                matches_label(
                    label,
                    &[Some(c.name.as_str()), c.name_ar.as_deref(), Some(c.slug.as_str())],
                )
            });
            match found {
                Some(parent) if slug.as_ref().is_some_and(|s| s.as_str() == parent.slug) => {
                    errors.push(RowError::cell(
                        number,
                        "Parent",
                        "A category cannot be its own parent",
                    ));
                    None
                }
                Some(parent) => Some(parent.id),
                None => {
                    errors.push(RowError::cell(
                        number,
                        "Parent",
                        format!("Parent category '{label}' not found"),
                    ));
                    None
                }
            }
        }
    };

    let (Some(name), Some(slug), true) = (name, slug, errors.is_empty()) else {
        return Err(errors);
    };

    let target = existing
        .iter()
        .find(|c| c.slug == slug.as_str())
        .map(|c| c.id);
    let input = CategoryInput {
        name: name.to_string(),
        name_ar: row.get("NameAr").map(String::from),
        description: row.get("Description").map(String::from),
        description_ar: row.get("DescriptionAr").map(String::from),
        slug,
        parent_id: parent,
    };

    Ok(match target {
        Some(id) => Operation::UpdateCategory(id, input),
        None => Operation::CreateCategory(input),
    })
}
