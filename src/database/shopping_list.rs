use std::collections::BTreeMap;

use serde::Serialize;

use crate::{schema::CartEntry, SHOPPING_LIST_TITLE};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ShoppingLine {
    pub name: String,
    pub total_amount: i64,
    pub measurement_unit: String,
}

/// Cart contents collapsed per (ingredient name, measurement unit).
///
/// Lines are ordered by name, then by unit, so two exports of the same cart
/// are byte-identical regardless of the order recipes were added in.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ShoppingList {
    pub lines: Vec<ShoppingLine>,
}

impl ShoppingList {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = CartEntry>,
    {
        let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
        for entry in entries {
            *totals
                .entry((entry.name, entry.measurement_unit))
                .or_insert(0) += i64::from(entry.amount);
        }

        let lines = totals
            .into_iter()
            .map(|((name, measurement_unit), total_amount)| ShoppingLine {
                name,
                total_amount,
                measurement_unit,
            })
            .collect();

        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Plain-text export: the title line, then `{name}  - {total}{unit}` per line.
    pub fn render(&self) -> String {
        let mut out = format!("{SHOPPING_LIST_TITLE}\n");
        for line in self.lines.iter() {
            out.push_str(&format!(
                "{}  - {}{}\n",
                line.name, line.total_amount, line.measurement_unit
            ));
        }
        out
    }
}
