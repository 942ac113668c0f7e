pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const USER_COUNT_PER_PAGE: i64 = 6;
pub const MAX_PAGE_LIMIT: i64 = 100;

pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_COOKING_TIME: i32 = 600;
pub const MIN_INGREDIENT_AMOUNT: i32 = 1;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const INGREDIENT_FIELD_MAX_LENGTH: usize = 200;

/// Rows per statement when bulk inserting ingredients (2 binds per row).
pub const IMPORT_CHUNK_SIZE: usize = 65535 / 2;

pub const SHOPPING_LIST_TITLE: &str = "Foodgram shopping list:";
pub const SHOPPING_LIST_FILENAME: &str = "shopping_cart.txt";

/// Upper bound for request bodies, recipe images included.
pub const MAX_BODY_SIZE: u64 = 10 * 1024 * 1024;
