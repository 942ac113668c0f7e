pub mod follows;
pub mod ingredients;
pub mod recipes;
pub mod relations;
pub mod shopping_cart;
pub mod tags;
pub mod users;
