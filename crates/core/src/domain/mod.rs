pub mod comparison;
pub mod product;
pub mod query;
