//! Purchase-invoice registration draft.
//!
//! The grand total is always recomputed from the lines, never stored, so it
//! matches Σ(quantity × unit cost) after any edit.
use serde_json::{json, Value};
use tracing::info;

use crate::api::{ApiClient, Transport};
use crate::error::ApiError;
use crate::models::{Article, SuccessResult};

pub const PAYMENT_TERMS: [&str; 3] = ["CONTADO", "CREDITO 15d", "CREDITO 30d"];
pub const CURRENCIES: [&str; 2] = ["PYG", "USD"];

pub const ERR_NO_LINES: &str = "Debe agregar al menos un ítem";
pub const ERR_NO_SUPPLIER: &str = "Debe seleccionar un proveedor";

#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseLine {
    pub id: u32,
    pub articulo_id: Option<i64>,
    pub cantidad: f64,
    pub costo_unitario: f64,
}

impl PurchaseLine {
    pub fn total(&self) -> f64 {
        self.cantidad * self.costo_unitario
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseDraft {
    pub proveedor_id: Option<i64>,
    pub nro_factura: String,
    pub fecha_emision: String,
    pub condicion_pago: String,
    pub moneda: String,
    pub lines: Vec<PurchaseLine>,
    next_id: u32,
}

impl PurchaseDraft {
    pub fn new(today: &str) -> Self {
        Self {
            proveedor_id: None,
            nro_factura: String::new(),
            fecha_emision: today.to_string(),
            condicion_pago: PAYMENT_TERMS[0].to_string(),
            moneda: CURRENCIES[0].to_string(),
            lines: Vec::new(),
            next_id: 1,
        }
    }

    pub fn add_line(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.lines.push(PurchaseLine { id, articulo_id: None, cantidad: 1.0, costo_unitario: 0.0 });
        id
    }

    pub fn remove_line(&mut self, id: u32) {
        self.lines.retain(|l| l.id != id);
    }

    fn line_mut(&mut self, id: u32) -> Option<&mut PurchaseLine> {
        self.lines.iter_mut().find(|l| l.id == id)
    }

    /// Picking an article copies its catalogue cost into the line.
    pub fn set_article(&mut self, id: u32, articulo_id: Option<i64>, catalogue: &[Article]) {
        if let Some(line) = self.line_mut(id) {
            line.articulo_id = articulo_id;
            let cost = articulo_id
                .and_then(|aid| catalogue.iter().find(|a| a.articulo_id == aid))
                .and_then(|a| a.costo_unitario);
            if let Some(c) = cost {
                line.costo_unitario = c;
            }
        }
    }

    pub fn set_quantity(&mut self, id: u32, cantidad: f64) {
        if let Some(line) = self.line_mut(id) {
            line.cantidad = cantidad;
        }
    }

    pub fn set_cost(&mut self, id: u32, costo: f64) {
        if let Some(line) = self.line_mut(id) {
            line.costo_unitario = costo;
        }
    }

    pub fn total(&self) -> f64 {
        self.lines.iter().map(PurchaseLine::total).sum()
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.lines.is_empty() {
            return Err(ERR_NO_LINES);
        }
        if self.proveedor_id.is_none() {
            return Err(ERR_NO_SUPPLIER);
        }
        Ok(())
    }

    pub fn payload(&self, empresa_id: Option<i64>, sucursal_id: Option<i64>, usuario_id: Option<i64>) -> Value {
        let detalles: Vec<Value> = self
            .lines
            .iter()
            .map(|l| json!({ "articulo_id": l.articulo_id, "cantidad": l.cantidad, "costo_unitario": l.costo_unitario }))
            .collect();
        json!({
            "proveedor_id": self.proveedor_id,
            "nro_factura": self.nro_factura.trim(),
            "fecha_emision": self.fecha_emision,
            "condicion_pago": self.condicion_pago,
            "moneda": self.moneda,
            "usuario_id": usuario_id,
            "empresa_id": empresa_id,
            "sucursal_id": sucursal_id,
            "total_general": self.total(),
            "detalles": detalles,
        })
    }
}

/// Validates and posts the draft. Validation failures come back as
/// `Rejected` without touching the network.
pub async fn submit<T: Transport>(
    api: &ApiClient<T>,
    draft: &PurchaseDraft,
    empresa_id: Option<i64>,
    sucursal_id: Option<i64>,
    usuario_id: Option<i64>,
) -> Result<SuccessResult, ApiError> {
    draft.validate().map_err(|m| ApiError::Rejected(m.to_string()))?;
    let result = api.register_purchase(draft.payload(empresa_id, sucursal_id, usuario_id)).await?;
    info!(factura = %draft.nro_factura, lines = draft.lines.len(), "purchase registered");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::RecordingTransport;
    use crate::api::Method;

    fn catalogue() -> Vec<Article> {
        vec![
            Article { articulo_id: 1, nombre: "Guantes".into(), costo_unitario: Some(1500.0), ..Default::default() },
            Article { articulo_id: 2, nombre: "Resina".into(), costo_unitario: None, ..Default::default() },
        ]
    }

    #[test]
    fn total_tracks_every_edit() {
        let mut d = PurchaseDraft::new("2025-06-01");
        assert_eq!(d.total(), 0.0);

        let a = d.add_line();
        let b = d.add_line();
        d.set_article(a, Some(1), &catalogue());
        d.set_quantity(a, 3.0);
        assert_eq!(d.total(), 4500.0);

        d.set_cost(b, 250.0);
        d.set_quantity(b, 2.0);
        assert_eq!(d.total(), 5000.0);

        d.remove_line(a);
        assert_eq!(d.total(), 500.0);
        assert_eq!(d.total(), d.lines.iter().map(|l| l.cantidad * l.costo_unitario).sum::<f64>());
    }

    #[test]
    fn total_follows_each_keystroke() {
        let mut d = PurchaseDraft::new("2025-06-01");
        let a = d.add_line();
        d.set_cost(a, 1000.0);
        let mut seen = Vec::new();
        for typed in ["1", "12", "12,", "12,5", ""] {
            d.set_quantity(a, crate::components::parse_amount(typed));
            seen.push(d.total());
        }
        assert_eq!(seen, vec![1000.0, 12000.0, 12000.0, 12500.0, 0.0]);
    }

    #[test]
    fn new_lines_start_at_one_unit_zero_cost() {
        let mut d = PurchaseDraft::new("2025-06-01");
        let id = d.add_line();
        assert_eq!(d.lines[0], PurchaseLine { id, articulo_id: None, cantidad: 1.0, costo_unitario: 0.0 });
        assert_eq!(d.condicion_pago, "CONTADO");
        assert_eq!(d.moneda, "PYG");
    }

    #[test]
    fn article_without_cost_keeps_typed_cost() {
        let mut d = PurchaseDraft::new("2025-06-01");
        let id = d.add_line();
        d.set_cost(id, 90.0);
        d.set_article(id, Some(2), &catalogue());
        assert_eq!(d.lines[0].costo_unitario, 90.0);
        assert_eq!(d.lines[0].articulo_id, Some(2));
    }

    #[test]
    fn validation_order() {
        let mut d = PurchaseDraft::new("2025-06-01");
        assert_eq!(d.validate(), Err(ERR_NO_LINES));
        d.add_line();
        assert_eq!(d.validate(), Err(ERR_NO_SUPPLIER));
        d.proveedor_id = Some(4);
        assert_eq!(d.validate(), Ok(()));
    }

    #[tokio::test]
    async fn invalid_draft_is_not_sent() {
        let api = ApiClient::new(RecordingTransport::new());
        let d = PurchaseDraft::new("2025-06-01");
        let err = submit(&api, &d, Some(1), Some(1), Some(1)).await.unwrap_err();
        assert_eq!(err, ApiError::Rejected(ERR_NO_LINES.into()));
        assert!(api.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn submit_posts_header_and_lines() {
        let api = ApiClient::new(RecordingTransport::new().respond(serde_json::json!({"success": true})));
        let mut d = PurchaseDraft::new("2025-06-01");
        d.proveedor_id = Some(4);
        d.nro_factura = " 001-001-0000123 ".into();
        let id = d.add_line();
        d.set_article(id, Some(1), &catalogue());
        d.set_quantity(id, 2.0);

        submit(&api, &d, Some(1), Some(9), Some(5)).await.unwrap();
        let sent = api.transport().requests.borrow()[0].clone();
        assert_eq!(sent.method, Method::Post);
        assert_eq!(sent.path, "/compras/facturas");
        let body = sent.body.unwrap();
        assert_eq!(body["total_general"], 3000.0);
        assert_eq!(body["nro_factura"], "001-001-0000123");
        assert_eq!(body["sucursal_id"], 9);
        assert_eq!(body["detalles"][0]["costo_unitario"], 1500.0);
    }
}
