//! Thin HTTP layer over the ORDS REST API.
//!
//! Every call goes through a [`Transport`], so pages talk to
//! [`ApiClient`] and tests swap in a recording fake. Response bodies are
//! normalised to lower-case keys before decoding, since ORDS echoes column
//! names in upper case.
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::models::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// Adds a query parameter; `None` values are left out.
    pub fn param(mut self, key: &str, value: Option<impl ToString>) -> Self {
        if let Some(v) = value {
            self.query.push((key.to_string(), v.to_string()));
        }
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }

    fn url(&self, request: &ApiRequest) -> Result<reqwest::Url, ApiError> {
        let raw = format!("{}/{}", self.base_url.trim_end_matches('/'), request.path.trim_start_matches('/'));
        let parsed = if request.query.is_empty() {
            reqwest::Url::parse(&raw)
        } else {
            reqwest::Url::parse_with_params(&raw, &request.query)
        };
        parsed.map_err(|e| ApiError::Unknown(format!("invalid url {}: {}", raw, e)))
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = self.url(&request)?;
        debug!(method = request.method.as_str(), %url, "api request");

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };
        let mut req = self.client.request(method, url).header("Content-Type", "application/json");
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| {
            warn!(path = %request.path, error = %e, "request failed");
            ApiError::from(e)
        })?;
        let status = resp.status();
        let text = resp.text().await?;
        let body = parse_body(&text);

        if !status.is_success() {
            warn!(path = %request.path, status = status.as_u16(), "api error status");
            return Err(ApiError::from_status(status.as_u16(), &body));
        }
        Ok(body)
    }
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text)
        .map(lowercase_keys)
        .unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Recursively lower-cases object keys.
pub fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(lowercase_keys).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k.to_lowercase(), lowercase_keys(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

/// Detail endpoints answer either with the bare record or with a
/// one-item collection envelope.
pub fn single_item(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("items") => match map.remove("items") {
            Some(Value::Array(mut items)) if !items.is_empty() => items.swap_remove(0),
            _ => Value::Null,
        },
        other => other,
    }
}

/// Form text as a JSON value; blank input is sent as `null`.
pub fn nullable(text: &str) -> Value {
    match text.trim() {
        "" => Value::Null,
        t => Value::String(t.to_string()),
    }
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    Ok(serde_json::from_value(body)?)
}

fn to_body<T: Serialize>(payload: &T) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(payload)?)
}

/// Interprets a `{ resultado, mensaje }` answer.
pub fn procedure_outcome(body: Value) -> Result<ProcedureResult, ApiError> {
    let result: ProcedureResult = decode(body)?;
    if result.resultado == 1 {
        Ok(result)
    } else {
        Err(ApiError::Rejected(result.mensaje.unwrap_or_default()))
    }
}

/// Interprets a `{ success, message }` answer.
pub fn success_outcome(body: Value) -> Result<SuccessResult, ApiError> {
    let result: SuccessResult = decode(body)?;
    if result.success {
        Ok(result)
    } else {
        let msg = result.message.or(result.error).unwrap_or_default();
        Err(ApiError::Rejected(msg))
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct InvoiceFilter {
    pub empresa_id: Option<i64>,
    pub fecha_desde: Option<String>,
    pub fecha_hasta: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ApiClient<T> {
    transport: T,
}

impl<T: Transport> ApiClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn fetch(&self, request: ApiRequest) -> Result<Value, ApiError> {
        self.transport.send(request).await
    }

    async fn page<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<Page<R>, ApiError> {
        decode(self.fetch(request).await?)
    }

    async fn one<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        let body = single_item(self.fetch(request).await?);
        if body.is_null() {
            return Err(ApiError::Unknown("registro no encontrado".into()));
        }
        decode(body)
    }

    async fn procedure(&self, request: ApiRequest) -> Result<ProcedureResult, ApiError> {
        procedure_outcome(self.fetch(request).await?)
    }

    async fn success(&self, request: ApiRequest) -> Result<SuccessResult, ApiError> {
        success_outcome(self.fetch(request).await?)
    }

    // Auth

    pub async fn login(&self, username: &str, password: &str) -> Result<ProcedureResult, ApiError> {
        let req = ApiRequest::new(Method::Post, "/facturas/auth/login")
            .json(json!({ "username": username, "password": password }));
        self.procedure(req).await
    }

    /// Raw `/auth/me` body; the session module picks it apart.
    pub async fn me(&self, usuario_id: i64) -> Result<Value, ApiError> {
        let body = self.fetch(ApiRequest::get(format!("/facturas/auth/me/{}", usuario_id))).await?;
        Ok(single_item(body))
    }

    pub async fn user_branches(&self, usuario_id: i64, empresa_id: i64) -> Result<Page<BranchAccess>, ApiError> {
        let req = ApiRequest::get(format!("/facturas/auth/sucursales/{}", usuario_id)).param("empresa_id", Some(empresa_id));
        self.page(req).await
    }

    // Patients

    pub async fn list_patients(&self, empresa_id: Option<i64>, limit: Option<i64>) -> Result<Page<Patient>, ApiError> {
        let req = ApiRequest::get("/pacientes").param("empresa_id", empresa_id).param("limit", limit);
        self.page(req).await
    }

    pub async fn get_patient(&self, id: i64) -> Result<Patient, ApiError> {
        self.one(ApiRequest::get(format!("/pacientes/{}", id))).await
    }

    pub async fn search_patients(&self, q: &str) -> Result<Page<Patient>, ApiError> {
        let req = ApiRequest::get("/pacientes/buscar").param("q", Some(q));
        self.page(req).await
    }

    pub async fn create_patient<P: Serialize>(&self, payload: &P) -> Result<Value, ApiError> {
        self.fetch(ApiRequest::new(Method::Post, "/pacientes").json(to_body(payload)?)).await
    }

    pub async fn update_patient<P: Serialize>(&self, id: i64, payload: &P) -> Result<Value, ApiError> {
        self.fetch(ApiRequest::new(Method::Put, format!("/pacientes/{}", id)).json(to_body(payload)?)).await
    }

    pub async fn delete_patient(&self, id: i64) -> Result<(), ApiError> {
        self.fetch(ApiRequest::new(Method::Delete, format!("/pacientes/{}", id))).await.map(|_| ())
    }

    pub async fn dashboard_stats(&self, empresa_id: i64) -> Result<DashboardStats, ApiError> {
        self.one(ApiRequest::get("/dashboard/stats").param("empresa_id", Some(empresa_id))).await
    }

    // Companies and branches

    pub async fn list_companies(&self) -> Result<Page<Company>, ApiError> {
        self.page(ApiRequest::get("/empresas")).await
    }

    pub async fn create_company(&self, payload: Value) -> Result<ProcedureResult, ApiError> {
        self.procedure(ApiRequest::new(Method::Post, "/empresas").json(payload)).await
    }

    pub async fn set_company_active(&self, empresa_id: i64, activo: Flag, usuario_id: Option<i64>) -> Result<ProcedureResult, ApiError> {
        let req = ApiRequest::new(Method::Put, format!("/empresas/{}/estado", empresa_id))
            .json(json!({ "activo": activo, "modificado_por": usuario_id }));
        self.procedure(req).await
    }

    pub async fn list_branches(&self, empresa_id: i64) -> Result<Page<Branch>, ApiError> {
        self.page(ApiRequest::get(format!("/empresas/{}/sucursales", empresa_id))).await
    }

    pub async fn create_branch(&self, payload: Value) -> Result<ProcedureResult, ApiError> {
        self.procedure(ApiRequest::new(Method::Post, "/sucursales").json(payload)).await
    }

    pub async fn update_branch(&self, sucursal_id: i64, payload: Value) -> Result<ProcedureResult, ApiError> {
        self.procedure(ApiRequest::new(Method::Put, format!("/sucursales/{}", sucursal_id)).json(payload)).await
    }

    pub async fn set_branch_active(&self, sucursal_id: i64, activo: Flag, usuario_id: Option<i64>) -> Result<ProcedureResult, ApiError> {
        let req = ApiRequest::new(Method::Put, format!("/sucursales/{}/estado", sucursal_id))
            .json(json!({ "activo": activo, "modificado_por": usuario_id }));
        self.procedure(req).await
    }

    // Locations

    pub async fn departments(&self) -> Result<Page<Department>, ApiError> {
        self.page(ApiRequest::get("/ubicaciones/departamentos")).await
    }

    pub async fn cities(&self, departamento_id: i64) -> Result<Page<City>, ApiError> {
        self.page(ApiRequest::get(format!("/ubicaciones/departamentos/{}/ciudades", departamento_id))).await
    }

    pub async fn neighborhoods(&self, ciudad_id: i64) -> Result<Page<Neighborhood>, ApiError> {
        self.page(ApiRequest::get(format!("/ubicaciones/ciudades/{}/barrios", ciudad_id))).await
    }

    // Purchasing and inventory

    /// `activo`: `Some("S")` for active suppliers only, `None` for all.
    pub async fn suppliers(&self, activo: Option<&str>) -> Result<Page<Supplier>, ApiError> {
        self.page(ApiRequest::get("/compras/proveedores").param("activo", activo)).await
    }

    pub async fn upsert_supplier(&self, payload: Value) -> Result<SuccessResult, ApiError> {
        self.success(ApiRequest::new(Method::Post, "/compras/proveedores").json(payload)).await
    }

    pub async fn articles(&self, categoria_id: Option<i64>, activo: Option<&str>) -> Result<Page<Article>, ApiError> {
        let req = ApiRequest::get("/compras/articulos").param("categoria_id", categoria_id).param("activo", activo);
        self.page(req).await
    }

    pub async fn upsert_article(&self, payload: Value) -> Result<SuccessResult, ApiError> {
        self.success(ApiRequest::new(Method::Post, "/compras/articulos").json(payload)).await
    }

    /// Active categories only; the server filters the rest out.
    pub async fn categories(&self) -> Result<Page<Category>, ApiError> {
        self.page(ApiRequest::get("/compras/categorias")).await
    }

    pub async fn upsert_category(&self, payload: Value) -> Result<SuccessResult, ApiError> {
        self.success(ApiRequest::new(Method::Post, "/compras/categorias").json(payload)).await
    }

    pub async fn delete_category(&self, categoria_id: i64) -> Result<SuccessResult, ApiError> {
        self.success(ApiRequest::new(Method::Delete, format!("/compras/categorias/{}", categoria_id))).await
    }

    pub async fn measure_units(&self) -> Result<Page<MeasureUnit>, ApiError> {
        self.page(ApiRequest::get("/compras/unidades-medida")).await
    }

    pub async fn stock(&self, empresa_id: i64, sucursal_id: Option<i64>) -> Result<Page<StockItem>, ApiError> {
        let req = ApiRequest::get("/compras/inventario")
            .param("empresa_id", Some(empresa_id))
            .param("sucursal_id", sucursal_id);
        self.page(req).await
    }

    pub async fn register_movement(&self, payload: Value) -> Result<SuccessResult, ApiError> {
        self.success(ApiRequest::new(Method::Post, "/compras/inventario/movimiento").json(payload)).await
    }

    pub async fn purchase_invoices(&self, empresa_id: i64, sucursal_id: Option<i64>) -> Result<Page<PurchaseInvoice>, ApiError> {
        let req = ApiRequest::get("/compras/facturas")
            .param("empresa_id", Some(empresa_id))
            .param("sucursal_id", sucursal_id);
        self.page(req).await
    }

    pub async fn register_purchase(&self, payload: Value) -> Result<SuccessResult, ApiError> {
        self.success(ApiRequest::new(Method::Post, "/compras/facturas").json(payload)).await
    }

    // Billing

    pub async fn invoices(&self, filter: &InvoiceFilter) -> Result<Page<Invoice>, ApiError> {
        let req = ApiRequest::get("/facturas/lista")
            .param("empresa_id", filter.empresa_id)
            .param("fecha_desde", filter.fecha_desde.as_deref().filter(|d| !d.is_empty()))
            .param("fecha_hasta", filter.fecha_hasta.as_deref().filter(|d| !d.is_empty()));
        self.page(req).await
    }

    // WhatsApp

    pub async fn whatsapp_messages(&self, empresa_id: i64) -> Result<Page<WhatsAppMessage>, ApiError> {
        self.page(ApiRequest::get("/whatsapp/mensajes").param("empresa_id", Some(empresa_id))).await
    }

    pub async fn whatsapp_config(&self, empresa_id: i64) -> Result<WhatsAppConfig, ApiError> {
        let body = single_item(self.fetch(ApiRequest::get("/whatsapp/config").param("empresa_id", Some(empresa_id))).await?);
        if body.is_null() {
            return Ok(WhatsAppConfig { empresa_id: Some(empresa_id), ..Default::default() });
        }
        decode(body)
    }

    pub async fn save_whatsapp_config(&self, config: &WhatsAppConfig) -> Result<SuccessResult, ApiError> {
        self.success(ApiRequest::new(Method::Post, "/whatsapp/config").json(to_body(config)?)).await
    }

    pub async fn send_whatsapp(&self, payload: Value) -> Result<SuccessResult, ApiError> {
        self.success(ApiRequest::new(Method::Post, "/whatsapp/send").json(payload)).await
    }

    /// Runs the reminder job. Partial failures are reported in the counters,
    /// so the envelope is read without the success check.
    pub async fn run_reminders(&self) -> Result<SuccessResult, ApiError> {
        decode(self.fetch(ApiRequest::new(Method::Post, "/whatsapp/cron")).await?)
    }
}

/// In-memory transport that records requests and replays canned bodies.
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Default)]
    pub struct RecordingTransport {
        pub requests: RefCell<Vec<ApiRequest>>,
        responses: RefCell<VecDeque<Result<Value, ApiError>>>,
    }

    impl RecordingTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, body: Value) -> Self {
            self.responses.borrow_mut().push_back(Ok(body));
            self
        }

        pub fn fail(self, err: ApiError) -> Self {
            self.responses.borrow_mut().push_back(Err(err));
            self
        }

        pub fn calls(&self) -> Vec<(Method, String)> {
            self.requests.borrow().iter().map(|r| (r.method, r.path.clone())).collect()
        }

        pub fn count(&self, method: Method) -> usize {
            self.requests.borrow().iter().filter(|r| r.method == method).count()
        }
    }

    impl Transport for RecordingTransport {
        async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
            self.requests.borrow_mut().push(request);
            self.responses.borrow_mut().pop_front().unwrap_or(Ok(Value::Null))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingTransport;
    use super::*;

    #[test]
    fn lowercases_nested_keys() {
        let v = lowercase_keys(json!({"ITEMS": [{"PACIENTE_ID": 1, "Nombre": "Ana"}], "HasMore": false}));
        assert_eq!(v, json!({"items": [{"paciente_id": 1, "nombre": "Ana"}], "hasmore": false}));
    }

    #[test]
    fn single_item_unwraps_collections() {
        assert_eq!(single_item(json!({"items": [{"a": 1}, {"a": 2}]})), json!({"a": 1}));
        assert_eq!(single_item(json!({"items": []})), Value::Null);
        assert_eq!(single_item(json!({"a": 1})), json!({"a": 1}));
    }

    #[test]
    fn procedure_and_success_envelopes() {
        assert!(procedure_outcome(json!({"resultado": 1, "mensaje": "ok"})).is_ok());
        assert_eq!(
            procedure_outcome(json!({"resultado": 0, "mensaje": "RUC existente"})),
            Err(ApiError::Rejected("RUC existente".into()))
        );
        assert_eq!(
            success_outcome(json!({"success": false, "error": "sin token"})),
            Err(ApiError::Rejected("sin token".into()))
        );
    }

    #[test]
    fn none_params_are_skipped() {
        let req = ApiRequest::get("/compras/inventario").param("empresa_id", Some(1)).param("sucursal_id", None::<i64>);
        assert_eq!(req.query, vec![("empresa_id".to_string(), "1".to_string())]);
    }

    #[test]
    fn http_transport_builds_absolute_urls() {
        let t = HttpTransport::new("http://localhost:8080/api/v1/");
        let req = ApiRequest::get("/facturas/lista").param("fecha_desde", Some("2025-01-01"));
        let url = t.url(&req).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/v1/facturas/lista?fecha_desde=2025-01-01");
    }

    #[tokio::test]
    async fn detail_accepts_both_shapes() {
        let api = ApiClient::new(
            RecordingTransport::new()
                .respond(json!({"items": [{"paciente_id": 7, "nombre": "Ana", "apellido": "Paz"}]}))
                .respond(json!({"paciente_id": 8, "nombre": "Luis", "apellido": "Gómez"})),
        );
        assert_eq!(api.get_patient(7).await.unwrap().paciente_id, 7);
        assert_eq!(api.get_patient(8).await.unwrap().full_name(), "Luis Gómez");
        assert_eq!(api.transport().calls()[0], (Method::Get, "/pacientes/7".to_string()));
    }

    #[tokio::test]
    async fn search_sends_term_as_query() {
        let api = ApiClient::new(RecordingTransport::new().respond(json!({"items": [], "hasMore": false})));
        assert!(api.search_patients("Paz").await.unwrap().items.is_empty());
        let req = api.transport().requests.borrow()[0].clone();
        assert_eq!(req.path, "/pacientes/buscar");
        assert_eq!(req.query, vec![("q".to_string(), "Paz".to_string())]);
    }

    #[tokio::test]
    async fn missing_whatsapp_config_defaults() {
        let api = ApiClient::new(RecordingTransport::new().respond(json!({"items": []})));
        let cfg = api.whatsapp_config(4).await.unwrap();
        assert_eq!(cfg.empresa_id, Some(4));
        assert_eq!(cfg.horas_anticipacion, 24);
        assert!(!cfg.habilitado.is_yes());
    }
}
