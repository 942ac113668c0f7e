use std::collections::HashSet;

use crate::{error::TypeError, INGREDIENT_FIELD_MAX_LENGTH};

/*
Ingredient import format, one ingredient per line:

name,measurement_unit
абрикосовое варенье,г
salt, pinch

The last comma separates the unit, so names may themselves contain commas.
*/

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportedIngredient {
    pub name: String,
    pub measurement_unit: String,
}

impl TryFrom<&str> for ImportedIngredient {
    type Error = TypeError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let (name, unit) = line
            .rsplit_once(',')
            .ok_or_else(|| TypeError::new("Invalid syntax; expected name,measurement_unit"))?;

        let name = name.trim();
        let measurement_unit = unit.trim();
        if name.is_empty() || measurement_unit.is_empty() {
            return Err(TypeError::new("Invalid syntax; empty field"));
        }
        if name.chars().count() > INGREDIENT_FIELD_MAX_LENGTH
            || measurement_unit.chars().count() > INGREDIENT_FIELD_MAX_LENGTH
        {
            return Err(TypeError::new("Invalid syntax; field too long"));
        }

        Ok(Self {
            name: name.to_string(),
            measurement_unit: measurement_unit.to_string(),
        })
    }
}

/// Parses a whole import stream. Blank lines are skipped and repeated
/// (name, unit) pairs are kept once, in first-seen order.
pub fn parse_ingredients(input: &str) -> Result<Vec<ImportedIngredient>, TypeError> {
    let mut seen = HashSet::new();
    let mut parsed = vec![];

    for (number, line) in input.lines().enumerate() {
        let line = line.trim_start_matches('\u{feff}');
        if line.trim().is_empty() {
            continue;
        }

        let ingredient = ImportedIngredient::try_from(line)
            .map_err(|e| TypeError::new(&format!("Line {}: {e}", number + 1)))?;

        if seen.insert(ingredient.clone()) {
            parsed.push(ingredient);
        }
    }

    Ok(parsed)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: u64,
    pub skipped: u64,
}
