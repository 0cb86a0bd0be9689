//! Mapping from CSV rows to the destination `products` table.
//!
//! Input files in the wild disagree on header spelling (`Id` vs `Index`,
//! `Internal ID` vs `InternalID`, any capitalization). Each destination
//! column therefore lists the header spellings it accepts, in priority order;
//! header comparison ignores ASCII case.

use crate::row::Row;
use serde::Serialize;

/// Storage class of a destination column, which also decides how raw CSV
/// text is coerced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    pub fn sql_type(self) -> &'static str {
        match self {
            ColumnKind::Integer => "BIGINT",
            ColumnKind::Float => "NUMERIC",
            ColumnKind::Text => "TEXT",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProductColumn {
    /// Column name in the destination table.
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Accepted CSV header spellings, first match wins.
    pub aliases: &'static [&'static str],
}

impl ProductColumn {
    const fn new(name: &'static str, kind: ColumnKind, aliases: &'static [&'static str]) -> Self {
        Self {
            name,
            kind,
            aliases,
        }
    }
}

pub mod column {
    use super::{ColumnKind::*, ProductColumn};

    pub const ID: ProductColumn = ProductColumn::new("id", Integer, &["Id", "Index", "product_id"]);
    pub const NAME: ProductColumn = ProductColumn::new("name", Text, &["Name"]);
    pub const DESCRIPTION: ProductColumn = ProductColumn::new("description", Text, &["Description"]);
    pub const BRAND: ProductColumn = ProductColumn::new("brand", Text, &["Brand"]);
    pub const CATEGORY: ProductColumn = ProductColumn::new("category", Text, &["Category"]);
    pub const PRICE: ProductColumn = ProductColumn::new("price", Float, &["Price"]);
    pub const CURRENCY: ProductColumn = ProductColumn::new("currency", Text, &["Currency"]);
    pub const STOCK: ProductColumn = ProductColumn::new("stock", Integer, &["Stock"]);
    pub const EAN: ProductColumn = ProductColumn::new("ean", Text, &["EAN"]);
    pub const COLOR: ProductColumn = ProductColumn::new("color", Text, &["Color", "Colour"]);
    pub const SIZE: ProductColumn = ProductColumn::new("size", Text, &["Size"]);
    pub const AVAILABILITY: ProductColumn =
        ProductColumn::new("availability", Text, &["Availability"]);
    pub const INTERNAL_ID: ProductColumn = ProductColumn::new(
        "internal_id",
        Integer,
        &["Internal ID", "InternalID", "internal_id"],
    );
}

/// Destination columns in table order. `id` is the primary key.
pub const PRODUCT_COLUMNS: [ProductColumn; 13] = [
    column::ID,
    column::NAME,
    column::DESCRIPTION,
    column::BRAND,
    column::CATEGORY,
    column::PRICE,
    column::CURRENCY,
    column::STOCK,
    column::EAN,
    column::COLOR,
    column::SIZE,
    column::AVAILABILITY,
    column::INTERNAL_ID,
];

/// A typed row of the destination table.
///
/// Field names match the column names, so a JSON array of products can be
/// expanded directly into table rows on the database side.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub price: f64,
    pub currency: String,
    pub stock: i64,
    pub ean: String,
    pub color: String,
    pub size: String,
    pub availability: String,
    pub internal_id: i64,
}

impl Product {
    /// Coerces a raw row. Never fails: unparsable numbers become 0 and
    /// missing text columns become empty strings.
    pub fn from_row(row: &Row) -> Self {
        let text = |column: ProductColumn| row.lookup(column.aliases).unwrap_or_default().to_string();
        let integer = |column: ProductColumn| parse_integer(row.lookup(column.aliases));

        Self {
            id: integer(column::ID),
            name: text(column::NAME),
            description: text(column::DESCRIPTION),
            brand: text(column::BRAND),
            category: text(column::CATEGORY),
            price: parse_float(row.lookup(column::PRICE.aliases)),
            currency: text(column::CURRENCY),
            stock: integer(column::STOCK),
            ean: text(column::EAN),
            color: text(column::COLOR),
            size: text(column::SIZE),
            availability: text(column::AVAILABILITY),
            internal_id: integer(column::INTERNAL_ID),
        }
    }
}

pub fn parse_integer(value: Option<&str>) -> i64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(0)
}

pub fn parse_float(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod test {
    use super::{parse_float, parse_integer, Product, PRODUCT_COLUMNS};
    use crate::row::CsvRowReader;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn products_of(data: &str) -> Vec<Product> {
        CsvRowReader::from_reader(data.as_bytes())
            .unwrap()
            .map(|row| Product::from_row(&row.unwrap()))
            .collect()
    }

    #[test]
    fn maps_canonical_headers() {
        let products = products_of(
            "Index,Name,Description,Brand,Category,Price,Currency,Stock,EAN,Color,Size,Availability,Internal ID\n\
             1,Lamp,Desk lamp,Acme,Lighting,19.5,USD,12,400638133393,Red,Small,in_stock,57\n",
        );

        assert_eq!(
            products,
            vec![Product {
                id: 1,
                name: "Lamp".to_string(),
                description: "Desk lamp".to_string(),
                brand: "Acme".to_string(),
                category: "Lighting".to_string(),
                price: 19.5,
                currency: "USD".to_string(),
                stock: 12,
                ean: "400638133393".to_string(),
                color: "Red".to_string(),
                size: "Small".to_string(),
                availability: "in_stock".to_string(),
                internal_id: 57,
            }]
        );
    }

    #[test]
    fn aliases_ignore_case() {
        let products = products_of("ID,NAME,price,internalid\n5,Chair,3.25,9\n");

        assert_eq!(products[0].id, 5);
        assert_eq!(products[0].name, "Chair");
        assert_eq!(products[0].price, 3.25);
        assert_eq!(products[0].internal_id, 9);
    }

    #[test]
    fn id_prefers_earlier_alias() {
        let products = products_of("Index,Id\n1,2\n");
        assert_eq!(products[0].id, 2);
    }

    #[test]
    fn empty_price_defaults_to_zero() {
        let products = products_of("Id,Name,Price\n1,Lamp,\n");
        assert_eq!(products[0].price, 0.0);
        assert_eq!(products[0].name, "Lamp");
    }

    #[test]
    fn missing_columns_get_defaults() {
        let products = products_of("Id,Name,Stock\n3\n");

        assert_eq!(
            products[0],
            Product {
                id: 3,
                ..Product::default()
            }
        );
    }

    #[test]
    fn numeric_coercion() {
        assert_eq!(parse_integer(Some(" 42 ")), 42);
        assert_eq!(parse_integer(Some("-7")), -7);
        assert_eq!(parse_integer(Some("")), 0);
        assert_eq!(parse_integer(Some("12abc")), 0);
        assert_eq!(parse_integer(None), 0);

        assert_eq!(parse_float(Some("1.5")), 1.5);
        assert_eq!(parse_float(Some("")), 0.0);
        assert_eq!(parse_float(Some("n/a")), 0.0);
        assert_eq!(parse_float(Some("NaN")), 0.0);
        assert_eq!(parse_float(Some("inf")), 0.0);
        assert_eq!(parse_float(None), 0.0);
    }

    #[test]
    fn column_names_are_unique() {
        let names: HashSet<_> = PRODUCT_COLUMNS.iter().map(|c| c.name).collect();
        assert_eq!(names.len(), PRODUCT_COLUMNS.len());
        assert_eq!(PRODUCT_COLUMNS[0].name, "id");
    }

    #[test]
    fn serializes_with_column_names() {
        let json = serde_json::to_value(Product {
            id: 1,
            price: 2.5,
            ..Product::default()
        })
        .unwrap();

        let object = json.as_object().unwrap();
        assert_eq!(object.len(), PRODUCT_COLUMNS.len());
        for column in PRODUCT_COLUMNS {
            assert!(object.contains_key(column.name), "missing {}", column.name);
        }
        assert_eq!(json["id"].as_i64(), Some(1));
        assert_eq!(json["price"].as_f64(), Some(2.5));
    }
}
