//! The fixed resale-record schema: ten typed columns, declared in CSV
//! order. The storage and index layers are parametric; this is the one
//! place that knows the concrete dataset.

use index::KeyType;

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub key_type: KeyType,
}

pub const COLUMNS: [ColumnDef; 10] = [
    ColumnDef {
        name: "month",
        key_type: KeyType::Text,
    },
    ColumnDef {
        name: "town",
        key_type: KeyType::Text,
    },
    ColumnDef {
        name: "flat_type",
        key_type: KeyType::Text,
    },
    ColumnDef {
        name: "block",
        key_type: KeyType::Text,
    },
    ColumnDef {
        name: "street_name",
        key_type: KeyType::Text,
    },
    ColumnDef {
        name: "storey_range",
        key_type: KeyType::Text,
    },
    ColumnDef {
        name: "floor_area_sqm",
        key_type: KeyType::Real,
    },
    ColumnDef {
        name: "flat_model",
        key_type: KeyType::Text,
    },
    ColumnDef {
        name: "lease_commence_date",
        key_type: KeyType::Int,
    },
    ColumnDef {
        name: "resale_price",
        key_type: KeyType::Real,
    },
];

pub fn column_names() -> Vec<&'static str> {
    COLUMNS.iter().map(|column| column.name).collect()
}

pub fn key_type_of(name: &str) -> Option<KeyType> {
    COLUMNS
        .iter()
        .find(|column| column.name == name)
        .map(|column| column.key_type)
}

pub fn index_specs() -> Vec<(&'static str, KeyType)> {
    COLUMNS
        .iter()
        .map(|column| (column.name, column.key_type))
        .collect()
}
