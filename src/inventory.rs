//! Stock views and manual movements.
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;

use crate::api::{ApiClient, Transport};
use crate::error::ApiError;
use crate::format::truncate;
use crate::models::{Article, StockItem, SuccessResult};

pub const MOVEMENT_TYPES: [&str; 3] = ["INGRESO", "EGRESO", "AJUSTE"];
pub const DEFAULT_REASON: &str = "Regularización técnica de existencias";
pub const MOVEMENT_ERROR: &str = "Error al registrar el movimiento";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StockStatus {
    Out,
    Low,
    Normal,
}

impl StockStatus {
    pub fn of(actual: f64, minimum: f64) -> Self {
        if actual == 0.0 {
            StockStatus::Out
        } else if actual <= minimum {
            StockStatus::Low
        } else {
            StockStatus::Normal
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StockStatus::Out => "Sin stock",
            StockStatus::Low => "Stock bajo",
            StockStatus::Normal => "Normal",
        }
    }

    pub fn css(self) -> &'static str {
        match self {
            StockStatus::Out => "badge badge-danger",
            StockStatus::Low => "badge badge-warning",
            StockStatus::Normal => "badge badge-success",
        }
    }
}

/// Branch-level shelf badge: below minimum, above maximum, or normal.
pub fn shelf_label(item: &StockItem) -> &'static str {
    let actual = item.on_hand();
    if actual <= item.cantidad_minima.unwrap_or(0.0) {
        "Bajo"
    } else if item.cantidad_maxima.is_some_and(|max| actual >= max) {
        "Exceso"
    } else {
        "Normal"
    }
}

pub fn filter_stock<'a>(items: &'a [StockItem], query: &str) -> Vec<&'a StockItem> {
    let q = query.trim().to_lowercase();
    items
        .iter()
        .filter(|i| {
            q.is_empty()
                || i.articulo_nombre.to_lowercase().contains(&q)
                || i.articulo_codigo.as_deref().is_some_and(|c| c.to_lowercase().contains(&q))
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct InventoryRow {
    pub articulo_id: i64,
    pub codigo: String,
    pub nombre: String,
    pub stock: f64,
    pub minimo: f64,
    pub costo: f64,
}

impl InventoryRow {
    pub fn status(&self) -> StockStatus {
        StockStatus::of(self.stock, self.minimo)
    }

    pub fn value(&self) -> f64 {
        self.stock * self.costo
    }
}

/// One row per catalogue article; stock rows are summed across branches.
pub fn merge(stock: &[StockItem], articles: &[Article]) -> Vec<InventoryRow> {
    let mut on_hand: HashMap<i64, f64> = HashMap::new();
    for s in stock {
        *on_hand.entry(s.articulo_id).or_insert(0.0) += s.on_hand();
    }
    articles
        .iter()
        .map(|a| InventoryRow {
            articulo_id: a.articulo_id,
            codigo: a.codigo.clone(),
            nombre: a.nombre.clone(),
            stock: on_hand.get(&a.articulo_id).copied().unwrap_or(0.0),
            minimo: a.stock_minimo.unwrap_or(0.0),
            costo: a.precio_unitario.filter(|p| *p != 0.0).or(a.costo_unitario).unwrap_or(0.0),
        })
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InventorySummary {
    pub total: usize,
    pub low: usize,
    pub out: usize,
    pub value: f64,
}

pub fn summarize(rows: &[InventoryRow]) -> InventorySummary {
    rows.iter().fold(InventorySummary { total: rows.len(), ..Default::default() }, |mut acc, r| {
        match r.status() {
            StockStatus::Out => acc.out += 1,
            StockStatus::Low => acc.low += 1,
            StockStatus::Normal => {}
        }
        acc.value += r.value();
        acc
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct StockBar {
    pub label: String,
    pub stock: f64,
    pub minimo: f64,
}

/// Articles with stock, largest first, names cut for the axis.
pub fn top_by_stock(rows: &[InventoryRow], n: usize) -> Vec<StockBar> {
    let mut with_stock: Vec<&InventoryRow> = rows.iter().filter(|r| r.stock > 0.0).collect();
    with_stock.sort_by(|a, b| b.stock.total_cmp(&a.stock));
    with_stock
        .into_iter()
        .take(n)
        .map(|r| StockBar { label: truncate(&r.nombre, 20), stock: r.stock, minimo: r.minimo })
        .collect()
}

#[derive(Clone, Debug, PartialEq)]
pub struct MovementForm {
    pub tipo_movimiento: String,
    pub cantidad: f64,
    pub motivo: String,
}

impl MovementForm {
    /// Adjustments start from the current count.
    pub fn for_item(item: &StockItem) -> Self {
        Self { tipo_movimiento: "AJUSTE".into(), cantidad: item.on_hand(), motivo: DEFAULT_REASON.into() }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if !MOVEMENT_TYPES.contains(&self.tipo_movimiento.as_str()) {
            return Err("Tipo de movimiento inválido");
        }
        let ok = if self.tipo_movimiento == "AJUSTE" { self.cantidad >= 0.0 } else { self.cantidad > 0.0 };
        if !ok || !self.cantidad.is_finite() {
            return Err("La cantidad debe ser mayor a cero");
        }
        if self.motivo.trim().is_empty() {
            return Err("Indique el motivo del movimiento");
        }
        Ok(())
    }

    pub fn payload(&self, item: &StockItem, empresa_id: Option<i64>, usuario_id: Option<i64>) -> Value {
        json!({
            "articulo_id": item.articulo_id,
            "empresa_id": empresa_id,
            "sucursal_id": item.sucursal_id,
            "tipo_movimiento": self.tipo_movimiento,
            "cantidad": self.cantidad,
            "motivo": self.motivo.trim(),
            "usuario_id": usuario_id,
        })
    }
}

pub async fn register_movement<T: Transport>(
    api: &ApiClient<T>,
    form: &MovementForm,
    item: &StockItem,
    empresa_id: Option<i64>,
    usuario_id: Option<i64>,
) -> Result<SuccessResult, ApiError> {
    form.validate().map_err(|m| ApiError::Rejected(m.to_string()))?;
    let res = api.register_movement(form.payload(item, empresa_id, usuario_id)).await?;
    info!(articulo_id = item.articulo_id, tipo = %form.tipo_movimiento, cantidad = form.cantidad, "stock movement");
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::RecordingTransport;

    fn article(id: i64, nombre: &str, min: f64, costo: f64, precio: Option<f64>) -> Article {
        Article {
            articulo_id: id,
            nombre: nombre.into(),
            stock_minimo: Some(min),
            costo_unitario: Some(costo),
            precio_unitario: precio,
            ..Default::default()
        }
    }

    fn stock(id: i64, qty: f64) -> StockItem {
        StockItem { articulo_id: id, cantidad_disponible: Some(qty), ..Default::default() }
    }

    #[test]
    fn status_thresholds() {
        assert_eq!(StockStatus::of(0.0, 5.0).label(), "Sin stock");
        assert_eq!(StockStatus::of(5.0, 5.0).label(), "Stock bajo");
        assert_eq!(StockStatus::of(6.0, 5.0).label(), "Normal");
    }

    #[test]
    fn merge_and_summary() {
        let arts = vec![
            article(1, "Guantes", 10.0, 100.0, None),
            article(2, "Resina", 2.0, 500.0, Some(800.0)),
            article(3, "Anestesia", 1.0, 50.0, None),
        ];
        let rows = merge(&[stock(1, 4.0), stock(1, 4.0), stock(2, 5.0)], &arts);
        assert_eq!(rows[0].stock, 8.0);
        assert_eq!(rows[1].costo, 800.0);
        assert_eq!(rows[2].stock, 0.0);

        let s = summarize(&rows);
        assert_eq!((s.total, s.low, s.out), (3, 1, 1));
        assert_eq!(s.value, 8.0 * 100.0 + 5.0 * 800.0);
    }

    #[test]
    fn top_chart_skips_empty_and_truncates() {
        let arts: Vec<Article> = (1..=12).map(|i| article(i, &format!("Articulo de prueba número {}", i), 0.0, 1.0, None)).collect();
        let st: Vec<StockItem> = (1..=12).map(|i| stock(i, if i == 12 { 0.0 } else { i as f64 })).collect();
        let bars = top_by_stock(&merge(&st, &arts), 10);
        assert_eq!(bars.len(), 10);
        assert_eq!(bars[0].stock, 11.0);
        assert_eq!(bars[0].label, "Articulo de prueba n...");
    }

    #[test]
    fn movement_rules() {
        let item = StockItem { articulo_id: 1, cantidad_actual: Some(7.0), ..Default::default() };
        let mut f = MovementForm::for_item(&item);
        assert_eq!(f.cantidad, 7.0);
        assert!(f.validate().is_ok());
        f.tipo_movimiento = "EGRESO".into();
        f.cantidad = 0.0;
        assert_eq!(f.validate(), Err("La cantidad debe ser mayor a cero"));
    }

    #[tokio::test]
    async fn movement_posts_branch_of_item() {
        let api = ApiClient::new(RecordingTransport::new().respond(json!({"success": true})));
        let item = StockItem { articulo_id: 4, sucursal_id: Some(2), cantidad_actual: Some(3.0), ..Default::default() };
        register_movement(&api, &MovementForm::for_item(&item), &item, Some(1), Some(5)).await.unwrap();
        let body = api.transport().requests.borrow()[0].body.clone().unwrap();
        assert_eq!(body["sucursal_id"], 2);
        assert_eq!(body["tipo_movimiento"], "AJUSTE");
        assert_eq!(api.transport().requests.borrow()[0].path, "/compras/inventario/movimiento");
    }
}
