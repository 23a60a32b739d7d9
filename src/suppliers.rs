//! Supplier catalogue: search, form state and upsert payloads.
use serde_json::{json, Value};
use tracing::info;

use crate::api::{nullable, ApiClient, Transport};
use crate::error::ApiError;
use crate::locations::LocationCascade;
use crate::models::{SuccessResult, Supplier};

pub const SAVE_ERROR: &str = "Error al guardar el proveedor";

/// Matches name, RUC or contact, ignoring case.
pub fn filter<'a>(suppliers: &'a [Supplier], query: &str) -> Vec<&'a Supplier> {
    let q = query.trim().to_lowercase();
    suppliers
        .iter()
        .filter(|s| {
            q.is_empty()
                || s.nombre.to_lowercase().contains(&q)
                || s.ruc.as_deref().is_some_and(|r| r.to_lowercase().contains(&q))
                || s.nombre_contacto.as_deref().is_some_and(|c| c.to_lowercase().contains(&q))
        })
        .collect()
}

pub fn location_line(s: &Supplier) -> String {
    let mut out = String::new();
    if let Some(b) = s.barrio.as_deref().filter(|b| !b.is_empty()) {
        out.push_str(b);
        out.push_str(", ");
    }
    out.push_str(s.ciudad.as_deref().unwrap_or(""));
    if let Some(d) = s.departamento.as_deref().filter(|d| !d.is_empty()) {
        out.push_str(" - ");
        out.push_str(d);
    }
    out
}

#[derive(Clone, Debug, PartialEq)]
pub struct SupplierForm {
    pub proveedor_id: Option<i64>,
    pub nombre: String,
    pub ruc: String,
    pub nombre_contacto: String,
    pub telefono: String,
    pub email: String,
    pub direccion: String,
    pub location: LocationCascade,
    pub pais: String,
    pub condiciones_pago: String,
    pub moneda: String,
    pub activo: crate::models::Flag,
}

impl Default for SupplierForm {
    fn default() -> Self {
        Self {
            proveedor_id: None,
            nombre: String::new(),
            ruc: String::new(),
            nombre_contacto: String::new(),
            telefono: String::new(),
            email: String::new(),
            direccion: String::new(),
            location: LocationCascade::default(),
            pais: "Paraguay".into(),
            condiciones_pago: String::new(),
            moneda: "PYG".into(),
            activo: crate::models::Flag::Yes,
        }
    }
}

impl From<&Supplier> for SupplierForm {
    fn from(s: &Supplier) -> Self {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        Self {
            proveedor_id: s.proveedor_id,
            nombre: s.nombre.clone(),
            ruc: text(&s.ruc),
            nombre_contacto: text(&s.nombre_contacto),
            telefono: text(&s.telefono),
            email: text(&s.email),
            direccion: text(&s.direccion),
            location: LocationCascade::from_names(
                s.departamento.as_deref().unwrap_or(""),
                s.ciudad.as_deref().unwrap_or(""),
                s.barrio.as_deref().unwrap_or(""),
            ),
            pais: s.pais.clone().filter(|p| !p.is_empty()).unwrap_or_else(|| "Paraguay".into()),
            condiciones_pago: text(&s.condiciones_pago),
            moneda: s.moneda.clone().filter(|m| !m.is_empty()).unwrap_or_else(|| "PYG".into()),
            activo: s.activo,
        }
    }
}

impl SupplierForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.nombre.trim().is_empty() {
            return Err("El nombre del proveedor es requerido");
        }
        Ok(())
    }

    pub fn payload(&self, usuario_id: Option<i64>) -> Value {
        json!({
            "proveedor_id": self.proveedor_id,
            "nombre": self.nombre.trim(),
            "ruc": nullable(&self.ruc),
            "nombre_contacto": nullable(&self.nombre_contacto),
            "telefono": nullable(&self.telefono),
            "email": nullable(&self.email),
            "direccion": nullable(&self.direccion),
            "departamento": nullable(&self.location.departamento),
            "ciudad": nullable(&self.location.ciudad),
            "barrio": nullable(&self.location.barrio),
            "pais": nullable(&self.pais),
            "condiciones_pago": nullable(&self.condiciones_pago),
            "moneda": self.moneda,
            "activo": self.activo,
            "usuario_id": usuario_id,
        })
    }
}

pub async fn save<T: Transport>(
    api: &ApiClient<T>,
    form: &SupplierForm,
    usuario_id: Option<i64>,
) -> Result<SuccessResult, ApiError> {
    form.validate().map_err(|m| ApiError::Rejected(m.to_string()))?;
    let res = api.upsert_supplier(form.payload(usuario_id)).await?;
    info!(proveedor_id = ?form.proveedor_id, "supplier saved");
    Ok(res)
}

/// Re-sends the whole record with `activo` flipped.
pub async fn toggle<T: Transport>(
    api: &ApiClient<T>,
    supplier: &Supplier,
    usuario_id: Option<i64>,
) -> Result<SuccessResult, ApiError> {
    let mut body = serde_json::to_value(supplier)?;
    body["activo"] = json!(supplier.activo.toggled());
    body["usuario_id"] = json!(usuario_id);
    api.upsert_supplier(body).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::RecordingTransport;
    use crate::models::Flag;

    fn sample() -> Vec<Supplier> {
        vec![
            Supplier { proveedor_id: Some(1), nombre: "Dental Import".into(), ruc: Some("80011111-1".into()), nombre_contacto: Some("Rosa".into()), ..Default::default() },
            Supplier { proveedor_id: Some(2), nombre: "Odonto Sur".into(), ruc: None, nombre_contacto: Some("Pedro Ruiz".into()), ..Default::default() },
        ]
    }

    #[test]
    fn filter_covers_ruc_and_contact() {
        let all = sample();
        assert_eq!(filter(&all, "8001").len(), 1);
        assert_eq!(filter(&all, "ruiz")[0].proveedor_id, Some(2));
        assert_eq!(filter(&all, "").len(), 2);
    }

    #[test]
    fn new_supplier_payload_has_null_id() {
        let form = SupplierForm { nombre: "Nuevo".into(), ..Default::default() };
        let body = form.payload(Some(3));
        assert_eq!(body["proveedor_id"], Value::Null);
        assert_eq!(body["usuario_id"], 3);
        assert_eq!(body["pais"], "Paraguay");
        assert_eq!(body["activo"], "S");
    }

    #[test]
    fn editing_keeps_location_names() {
        let s = Supplier { departamento: Some("Central".into()), ciudad: Some("Luque".into()), barrio: Some("Centro".into()), ..sample()[0].clone() };
        let form = SupplierForm::from(&s);
        assert_eq!(form.location.ciudad, "Luque");
        assert_eq!(location_line(&s), "Centro, Luque - Central");
    }

    #[tokio::test]
    async fn toggle_resends_record_with_flipped_flag() {
        let api = ApiClient::new(RecordingTransport::new().respond(json!({"success": true})));
        let s = Supplier { activo: Flag::Yes, ..sample()[0].clone() };
        toggle(&api, &s, Some(9)).await.unwrap();
        let body = api.transport().requests.borrow()[0].body.clone().unwrap();
        assert_eq!(body["activo"], "N");
        assert_eq!(body["proveedor_id"], 1);
        assert_eq!(body["nombre"], "Dental Import");
    }

    #[tokio::test]
    async fn failed_upsert_surfaces_message() {
        let api = ApiClient::new(RecordingTransport::new().respond(json!({"success": false, "message": "RUC duplicado"})));
        let form = SupplierForm { nombre: "X".into(), ..Default::default() };
        let err = save(&api, &form, None).await.unwrap_err();
        assert_eq!(err.user_message(SAVE_ERROR), "RUC duplicado");
    }
}
