use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: Option<Decimal>,
    pub fixed_price: bool,
    pub price_in_vouchers: Option<i32>,
    pub tax_name: String,
    pub tax_rate: Decimal,
    pub restrictions: Vec<String>,
    pub is_locked: bool,
    pub is_returnable: bool,
    pub target_account_id: Option<i64>,
}

impl Product {
    /// Fields that may still change once `is_locked` is set.
    const COSMETIC_FIELDS: &'static [&'static str] = &["name"];

    pub fn is_cosmetic_only_change(field: &str) -> bool {
        Self::COSMETIC_FIELDS.contains(&field)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Option<Decimal>,
    pub fixed_price: bool,
    pub price_in_vouchers: Option<i32>,
    pub tax_name: String,
    pub restrictions: Vec<String>,
    pub is_locked: bool,
    pub is_returnable: bool,
    pub target_account_id: Option<i64>,
}

impl NewProduct {
    /// Invariant from the data model: `fixed_price XOR (price is null)`.
    pub fn validate_pricing(&self) -> bool {
        self.fixed_price == self.price.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct TaxRate {
    pub name: String,
    pub rate: Decimal,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_price_xor_price_is_null() {
        let p = NewProduct {
            name: "Beer".into(),
            price: Some(Decimal::new(420, 2)),
            fixed_price: true,
            price_in_vouchers: None,
            tax_name: "ust".into(),
            restrictions: vec![],
            is_locked: false,
            is_returnable: false,
            target_account_id: None,
        };
        assert!(p.validate_pricing());

        let free_price = NewProduct { fixed_price: false, price: None, ..p.clone() };
        assert!(free_price.validate_pricing());

        let inconsistent = NewProduct { fixed_price: true, price: None, ..p };
        assert!(!inconsistent.validate_pricing());
    }
}
