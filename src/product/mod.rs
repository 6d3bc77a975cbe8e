//! Product registry: products, tax rates, restrictions, locked-product enforcement.

mod models;
mod repository;

pub use models::{NewProduct, Product, TaxRate};
pub use repository::ProductRepository;
