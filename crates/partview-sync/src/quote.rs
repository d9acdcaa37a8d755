//! Quotation line items stored next to a project.

use serde::{Deserialize, Serialize};

/// One line of a quote. Field names match the store's JSON.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteItem {
    pub concepto: String,
    pub cantidad: f64,
    pub precio: f64,
    pub link: String,
}

impl QuoteItem {
    pub fn new(concepto: impl Into<String>, cantidad: f64, precio: f64) -> Self {
        Self {
            concepto: concepto.into(),
            cantidad,
            precio,
            link: String::new(),
        }
    }

    pub fn subtotal(&self) -> f64 {
        self.cantidad * self.precio
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Quote {
    pub items: Vec<QuoteItem>,
    pub total: f64,
}

impl Quote {
    pub fn new(items: Vec<QuoteItem>) -> Self {
        let mut quote = Self { items, total: 0.0 };
        quote.recompute_total();
        quote
    }

    /// Set `total` to the sum of all line subtotals.
    pub fn recompute_total(&mut self) -> f64 {
        self.total = self.items.iter().map(QuoteItem::subtotal).sum();
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recompute_total() {
        let mut quote = Quote {
            items: vec![QuoteItem::new("Tornillo M4", 8.0, 0.25), QuoteItem::new("Placa", 1.0, 12.5)],
            total: 99.0,
        };
        assert_eq!(quote.recompute_total(), 14.5);
        assert_eq!(quote.total, 14.5);
    }

    #[test]
    fn test_missing_fields_default() {
        let quote: Quote = serde_json::from_str(r#"{"items": [{"concepto": "Corte"}]}"#).unwrap();
        assert_eq!(quote.items[0].cantidad, 0.0);
        assert_eq!(quote.items[0].link, "");
        assert_eq!(quote.total, 0.0);
    }
}
