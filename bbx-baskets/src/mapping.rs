//! Field-to-basket mapping and its JSON file
//!
//! Entries keep the order of the requested field list. On disk the mapping
//! is a JSON object `{ "<field>": "<basket>" | null }`; older files wrote
//! `[]` for a missing field, which is still accepted on read.

use crate::error::{BasketError, BasketResult};
use bbx_common::Error;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::path::Path;

/// Where a field comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasketAssignment {
    /// Most recent basket providing the field
    Basket(String),
    /// No basket of the project provides the field
    Missing,
}

impl BasketAssignment {
    pub fn basket(&self) -> Option<&str> {
        match self {
            BasketAssignment::Basket(b) => Some(b),
            BasketAssignment::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, BasketAssignment::Missing)
    }
}

/// Ordered mapping field id -> basket assignment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldToBasket {
    entries: Vec<(String, BasketAssignment)>,
}

impl FieldToBasket {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field's assignment, keeping its original position if present
    pub fn insert(&mut self, field: impl Into<String>, assignment: BasketAssignment) {
        let field = field.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = assignment,
            None => self.entries.push((field, assignment)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&BasketAssignment> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, a)| a)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BasketAssignment)> {
        self.entries.iter().map(|(f, a)| (f.as_str(), a))
    }

    /// Fields no basket provides
    pub fn missing_fields(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, a)| a.is_missing())
            .map(|(f, _)| f)
            .collect()
    }

    /// Invert into basket -> fields
    ///
    /// Baskets appear in the order they are first referenced; missing
    /// fields are left out.
    pub fn by_basket(&self) -> Vec<(String, Vec<String>)> {
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for (field, assignment) in self.iter() {
            let Some(basket) = assignment.basket() else {
                continue;
            };
            match grouped.iter_mut().find(|(b, _)| b == basket) {
                Some((_, fields)) => fields.push(field.to_string()),
                None => grouped.push((basket.to_string(), vec![field.to_string()])),
            }
        }
        grouped
    }

    /// Write the mapping as pretty-printed JSON
    pub fn save(&self, path: &Path) -> BasketResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(Error::Json)?;
        std::fs::write(path, json).map_err(|e| Error::file(path, e))?;
        Ok(())
    }

    /// Read a mapping file
    pub fn load(path: &Path) -> BasketResult<Self> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()).into());
        }
        let text = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
        serde_json::from_str(&text).map_err(|e| BasketError::InvalidMapping {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

impl Serialize for FieldToBasket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, assignment) in &self.entries {
            map.serialize_entry(field, &assignment.basket())?;
        }
        map.end()
    }
}

/// Accepted JSON values for one entry
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAssignment {
    Basket(String),
    Missing(Option<Vec<String>>),
}

impl<'de> Deserialize<'de> for FieldToBasket {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct MappingVisitor;

        impl<'de> Visitor<'de> for MappingVisitor {
            type Value = FieldToBasket;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object mapping field ids to basket names or null")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut mapping = FieldToBasket::new();
                while let Some((field, raw)) = access.next_entry::<String, RawAssignment>()? {
                    let assignment = match raw {
                        RawAssignment::Basket(b) => BasketAssignment::Basket(b),
                        RawAssignment::Missing(None) => BasketAssignment::Missing,
                        RawAssignment::Missing(Some(list)) if list.is_empty() => {
                            BasketAssignment::Missing
                        }
                        RawAssignment::Missing(Some(_)) => {
                            return Err(serde::de::Error::custom(format!(
                                "field {} maps to a list of baskets; expected a single basket",
                                field
                            )));
                        }
                    };
                    mapping.insert(field, assignment);
                }
                Ok(mapping)
            }
        }

        deserializer.deserialize_map(MappingVisitor)
    }
}
