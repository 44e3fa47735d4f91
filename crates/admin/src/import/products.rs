//! Product sheet schema and row validation.

use std::collections::HashMap;

use kawn_core::Price;

use super::{Operation, Plan, PlannedRow, RowError, RowView, Sheet, matches_label};
use crate::api::{Brand, Category, Product, ProductInput};

/// Column order for product sheets.
pub const COLUMNS: &[&str] = &[
    "Name",
    "NameAr",
    "Description",
    "DescriptionAr",
    "SKU",
    "Price",
    "Stock",
    "Category",
    "Brand",
    "Active",
];

/// Headers an import cannot do without.
pub const REQUIRED_COLUMNS: &[&str] = &["Name", "Price"];

/// The store's current catalog, loaded once per import.
pub(crate) struct Catalog<'a> {
    pub products: &'a [Product],
    pub categories: &'a [Category],
    pub brands: &'a [Brand],
}

/// Validate every row and decide create vs update by SKU.
///
/// Rows without a SKU always create a new product.
pub(crate) fn plan(sheet: &Sheet, catalog: &Catalog<'_>) -> Plan {
    let mut plan = Plan::default();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for row in sheet.rows() {
        match validate(row, catalog, &mut seen) {
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
    catalog: &Catalog<'_>,
    seen: &mut HashMap<String, usize>,
) -> Result<Operation, Vec<RowError>> {
    let number = row.number();
    let mut errors = Vec::new();

    let name = row.get("Name");
    if name.is_none() {
        errors.push(RowError::cell(number, "Name", "Name is required"));
    }

    let price = match row.get("Price") {
        None => {
            errors.push(RowError::cell(number, "Price", "Price is required"));
            None
        }
        Some(raw) => raw
            .parse::<Price>()
            .map_err(|e| errors.push(RowError::cell(number, "Price", capitalize(&e.to_string()))))
            .ok(),
    };

    let stock = match row.get("Stock") {
        None => Some(0),
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| {
                errors.push(RowError::cell(
                    number,
                    "Stock",
                    "Stock must be a whole number, 0 or more",
                ));
            })
            .ok(),
    };

    let is_active = match row.get("Active") {
        None => Some(true),
        Some(raw) => {
            let parsed = parse_flag(raw);
            if parsed.is_none() {
                errors.push(RowError::cell(number, "Active", "Active must be yes or no"));
            }
            parsed
        }
    };

    let category_id = lookup(row, "Category", catalog.categories, &mut errors, |c| {
        [Some(c.name.as_str()), c.name_ar.as_deref(), Some(c.slug.as_str())]
    })
    .map(|c| c.id);
    let brand_id = lookup(row, "Brand", catalog.brands, &mut errors, |b| {
        [Some(b.name.as_str()), b.name_ar.as_deref(), b.slug.as_deref()]
    })
    .map(|b| b.id);

    let sku = row.get("SKU");
    if let Some(sku) = sku {
        let key = sku.to_lowercase();
        if let Some(first) = seen.get(&key) {
            errors.push(RowError::cell(
                number,
                "SKU",
                format!("Duplicate SKU '{sku}', already used on row {first}"),
            ));
        } else {
            seen.insert(key, number);
        }
    }

    let (Some(name), Some(price), Some(stock), Some(is_active), true) =
        (name, price, stock, is_active, errors.is_empty())
    else {
        return Err(errors);
    };

    let target = sku.and_then(|sku| {
        catalog
            .products
            .iter()
            .find(|p| p.sku.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(sku)))
            .map(|p| p.id)
    });
    let input = ProductInput {
        name: name.to_string(),
        name_ar: row.get("NameAr").map(String::from),
        description: row.get("Description").map(String::from),
        description_ar: row.get("DescriptionAr").map(String::from),
        sku: sku.map(String::from),
        price,
        stock,
        category_id,
        brand_id,
        is_active,
    };

    Ok(match target {
        Some(id) => Operation::UpdateProduct(id, input),
        None => Operation::CreateProduct(input),
    })
}

/// Find the entity a reference column names, recording an error when the
/// label matches nothing. Blank cells resolve to `None` silently.
fn lookup<'a, T>(
    row: RowView<'_>,
    column: &str,
    items: &'a [T],
    errors: &mut Vec<RowError>,
    labels: impl Fn(&'a T) -> [Option<&'a str>; 3],
) -> Option<&'a T> {
    let label = row.get(column)?;
    let found = items.iter().find(|&item| matches_label(label, &labels(item)));
    if found.is_none() {
        errors.push(RowError::cell(
            row.number(),
            column,
            format!("{column} '{label}' not found"),
        ));
    }
    found
}

/// Accepts the usual spreadsheet spellings of a boolean.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "active" | "نعم" => Some(true),
        "no" | "n" | "false" | "0" | "inactive" | "لا" => Some(false),
        _ => None,
    }
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::import::write_sheet;
    use kawn_core::{BrandId, CategoryId, ProductId};
    use rstest::rstest;

    fn sheet(rows: &[&[&str]]) -> Sheet {
        let rows: Vec<Vec<String>> = rows
            .iter()
            .map(|row| row.iter().map(|c| (*c).to_string()).collect())
            .collect();
        Sheet::read(&write_sheet("Products", COLUMNS, &rows).unwrap()).unwrap()
    }

    fn categories() -> Vec<Category> {
        vec![Category {
            id: CategoryId::new(2),
            name: "Gift Cards".to_string(),
            name_ar: Some("بطاقات الهدايا".to_string()),
            description: None,
            description_ar: None,
            slug: "gift-cards".to_string(),
            parent_id: None,
        }]
    }

    fn brands() -> Vec<Brand> {
        vec![Brand {
            id: BrandId::new(5),
            name: "PlayStation".to_string(),
            name_ar: None,
            slug: Some("playstation".to_string()),
        }]
    }

    fn existing_product() -> Product {
        Product {
            id: ProductId::new(11),
            name: "PSN 50".to_string(),
            name_ar: None,
            description: None,
            description_ar: None,
            sku: Some("PSN-50".to_string()),
            price: "50".parse().unwrap(),
            stock: 3,
            category_id: None,
            brand_id: None,
            is_active: true,
        }
    }

    fn run(rows: &[&[&str]]) -> Plan {
        let (categories, brands, products) = (categories(), brands(), vec![existing_product()]);
        plan(
            &sheet(rows),
            &Catalog {
                products: &products,
                categories: &categories,
                brands: &brands,
            },
        )
    }

    #[test]
    fn test_full_row() {
        let plan = run(&[&[
            "PSN 100", "", "", "", "PSN-100", "100.00", "12", "gift cards", "playstation", "yes",
        ]]);
        assert!(plan.errors.is_empty());
        let Operation::CreateProduct(input) = &plan.rows[0].operation else {
            panic!("expected create");
        };
        assert_eq!(input.price.to_string(), "100.00");
        assert_eq!(input.stock, 12);
        assert_eq!(input.category_id, Some(CategoryId::new(2)));
        assert_eq!(input.brand_id, Some(BrandId::new(5)));
        assert!(input.is_active);
    }

    #[test]
    fn test_sku_match_updates() {
        let plan = run(&[&["PSN 50 (KSA)", "", "", "", "psn-50", "55", "", "", "", "no"]]);
        let Operation::UpdateProduct(id, input) = &plan.rows[0].operation else {
            panic!("expected update");
        };
        assert_eq!(*id, ProductId::new(11));
        assert_eq!(input.stock, 0);
        assert!(!input.is_active);
    }

    #[rstest]
    #[case(&["", "", "", "", "", "10", "", "", "", ""], "Name")]
    #[case(&["X", "", "", "", "", "", "", "", "", ""], "Price")]
    #[case(&["X", "", "", "", "", "ten", "", "", "", ""], "Price")]
    #[case(&["X", "", "", "", "", "-1", "", "", "", ""], "Price")]
    #[case(&["X", "", "", "", "", "1.999", "", "", "", ""], "Price")]
    #[case(&["X", "", "", "", "", "1", "-3", "", "", ""], "Stock")]
    #[case(&["X", "", "", "", "", "1", "2.5", "", "", ""], "Stock")]
    #[case(&["X", "", "", "", "", "1", "", "Toys", "", ""], "Category")]
    #[case(&["X", "", "", "", "", "1", "", "", "Xbox", ""], "Brand")]
    #[case(&["X", "", "", "", "", "1", "", "", "", "maybe"], "Active")]
    fn test_invalid_cell(#[case] row: &[&str], #[case] column: &str) {
        let plan = run(&[row]);
        assert!(plan.rows.is_empty());
        assert_eq!(plan.errors.len(), 1);
        assert_eq!(plan.errors[0].row, 2);
        assert_eq!(plan.errors[0].column.as_deref(), Some(column));
    }

    #[test]
    fn test_duplicate_sku() {
        let plan = run(&[
            &["A", "", "", "", "SKU-1", "1", "", "", "", ""],
            &["B", "", "", "", "sku-1", "1", "", "", "", ""],
        ]);
        assert_eq!(plan.rows.len(), 1);
        assert_eq!(plan.errors[0].row, 3);
        assert_eq!(plan.errors[0].column.as_deref(), Some("SKU"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("price must be a number"), "Price must be a number");
        assert_eq!(capitalize(""), "");
    }
}
