//! Company and branch administration: create/edit forms, active toggles
//! and the header counters.
use serde_json::{json, Value};
use tracing::info;

use crate::api::{nullable, ApiClient, Transport};
use crate::error::ApiError;
use crate::models::{Branch, Company, Flag, ProcedureResult};

pub const COMPANY_SAVE_ERROR: &str = "Error al crear la empresa";
pub const BRANCH_SAVE_ERROR: &str = "Error al guardar la sucursal";
pub const TOGGLE_ERROR: &str = "No se pudo cambiar el estado";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompanyForm {
    pub razon_social: String,
    pub nombre_comercial: String,
    pub ruc: String,
    pub direccion: String,
    pub telefono: String,
    pub email: String,
}

impl CompanyForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.razon_social.trim().is_empty() {
            return Err("La razón social es requerida");
        }
        if self.nombre_comercial.trim().is_empty() {
            return Err("El nombre comercial es requerido");
        }
        if self.ruc.trim().is_empty() {
            return Err("El RUC es requerido");
        }
        Ok(())
    }

    pub fn payload(&self, usuario_id: Option<i64>) -> Value {
        json!({
            "razon_social": self.razon_social.trim(),
            "nombre_comercial": self.nombre_comercial.trim(),
            "ruc": self.ruc.trim(),
            "direccion": nullable(&self.direccion),
            "telefono": nullable(&self.telefono),
            "email": nullable(&self.email),
            "creado_por": usuario_id,
        })
    }
}

pub async fn create_company<T: Transport>(
    api: &ApiClient<T>,
    form: &CompanyForm,
    usuario_id: Option<i64>,
) -> Result<ProcedureResult, ApiError> {
    form.validate().map_err(|m| ApiError::Rejected(m.to_string()))?;
    let res = api.create_company(form.payload(usuario_id)).await?;
    info!(ruc = %form.ruc.trim(), "company created");
    Ok(res)
}

#[derive(Clone, Debug, PartialEq)]
pub struct BranchForm {
    pub nombre: String,
    pub direccion: String,
    pub telefono: String,
    pub email: String,
    pub ciudad: String,
    pub es_principal: Flag,
}

impl Default for BranchForm {
    fn default() -> Self {
        Self {
            nombre: String::new(),
            direccion: String::new(),
            telefono: String::new(),
            email: String::new(),
            ciudad: String::new(),
            es_principal: Flag::No,
        }
    }
}

impl From<&Branch> for BranchForm {
    fn from(b: &Branch) -> Self {
        Self {
            nombre: b.nombre.clone(),
            direccion: b.direccion.clone().unwrap_or_default(),
            telefono: b.telefono.clone().unwrap_or_default(),
            email: b.email.clone().unwrap_or_default(),
            ciudad: b.ciudad.clone().unwrap_or_default(),
            es_principal: b.es_principal,
        }
    }
}

impl BranchForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.nombre.trim().is_empty() {
            return Err("El nombre de la sucursal es requerido");
        }
        Ok(())
    }

    fn common(&self) -> serde_json::Map<String, Value> {
        let mut m = serde_json::Map::new();
        m.insert("nombre".into(), Value::String(self.nombre.trim().to_string()));
        m.insert("direccion".into(), nullable(&self.direccion));
        m.insert("telefono".into(), nullable(&self.telefono));
        m.insert("email".into(), nullable(&self.email));
        m.insert("ciudad".into(), nullable(&self.ciudad));
        m
    }

    pub fn create_payload(&self, empresa_id: i64, usuario_id: Option<i64>) -> Value {
        let mut m = self.common();
        m.insert("empresa_id".into(), json!(empresa_id));
        m.insert("es_principal".into(), json!(self.es_principal));
        m.insert("creado_por".into(), json!(usuario_id));
        Value::Object(m)
    }

    pub fn update_payload(&self, usuario_id: Option<i64>) -> Value {
        let mut m = self.common();
        m.insert("modificado_por".into(), json!(usuario_id));
        Value::Object(m)
    }
}

/// Creates when `sucursal_id` is `None`, otherwise updates.
pub async fn save_branch<T: Transport>(
    api: &ApiClient<T>,
    sucursal_id: Option<i64>,
    empresa_id: i64,
    form: &BranchForm,
    usuario_id: Option<i64>,
) -> Result<ProcedureResult, ApiError> {
    form.validate().map_err(|m| ApiError::Rejected(m.to_string()))?;
    match sucursal_id {
        Some(id) => api.update_branch(id, form.update_payload(usuario_id)).await,
        None => api.create_branch(form.create_payload(empresa_id, usuario_id)).await,
    }
}

/// One update carrying the flipped flag. The caller re-fetches on success;
/// the local record is left untouched.
pub async fn toggle_company<T: Transport>(
    api: &ApiClient<T>,
    company: &Company,
    usuario_id: Option<i64>,
) -> Result<ProcedureResult, ApiError> {
    let next = company.activo.toggled();
    let res = api.set_company_active(company.empresa_id, next, usuario_id).await?;
    info!(empresa_id = company.empresa_id, activo = next.as_str(), "company status changed");
    Ok(res)
}

pub async fn toggle_branch<T: Transport>(
    api: &ApiClient<T>,
    branch: &Branch,
    usuario_id: Option<i64>,
) -> Result<ProcedureResult, ApiError> {
    let next = branch.activo.toggled();
    let res = api.set_branch_active(branch.sucursal_id, next, usuario_id).await?;
    info!(sucursal_id = branch.sucursal_id, activo = next.as_str(), "branch status changed");
    Ok(res)
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Counters {
    pub total: usize,
    pub active: usize,
    pub branches: i64,
    pub users: i64,
}

pub fn company_counters(companies: &[Company]) -> Counters {
    Counters {
        total: companies.len(),
        active: companies.iter().filter(|c| c.activo.is_yes()).count(),
        branches: companies.iter().map(|c| c.total_sucursales).sum(),
        users: companies.iter().map(|c| c.total_usuarios).sum(),
    }
}

pub fn branch_counters(branches: &[Branch]) -> Counters {
    Counters {
        total: branches.len(),
        active: branches.iter().filter(|b| b.activo.is_yes()).count(),
        branches: branches.len() as i64,
        users: branches.iter().map(|b| b.total_usuarios).sum(),
    }
}

/// Badge text for companies and branches.
pub const STATUS_LABELS: (&str, &str) = ("Operativo", "Inactivo");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::RecordingTransport;
    use crate::api::Method;

    fn company(id: i64, activo: Flag) -> Company {
        serde_json::from_value(json!({
            "empresa_id": id, "razon_social": "Dental Sur S.A.", "activo": activo,
            "total_sucursales": 2, "total_usuarios": 5
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn toggle_sends_one_flipped_update() {
        let api = ApiClient::new(RecordingTransport::new().respond(json!({"resultado": 1, "mensaje": "Empresa desactivada"})));
        let c = company(4, Flag::Yes);
        let res = toggle_company(&api, &c, Some(7)).await.unwrap();
        assert_eq!(res.mensaje.as_deref(), Some("Empresa desactivada"));

        let sent = api.transport().requests.borrow().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, Method::Put);
        assert_eq!(sent[0].path, "/empresas/4/estado");
        assert_eq!(sent[0].body, Some(json!({"activo": "N", "modificado_por": 7})));
        assert!(c.activo.is_yes());
    }

    #[tokio::test]
    async fn rejected_toggle_keeps_server_text() {
        let api = ApiClient::new(RecordingTransport::new().respond(json!({"resultado": 0, "mensaje": "Tiene sucursales activas"})));
        let err = toggle_company(&api, &company(4, Flag::No), None).await.unwrap_err();
        assert_eq!(err.user_message(TOGGLE_ERROR), "Tiene sucursales activas");
    }

    #[tokio::test]
    async fn company_form_requires_identity_fields() {
        let api = ApiClient::new(RecordingTransport::new());
        let form = CompanyForm { razon_social: "X S.A.".into(), nombre_comercial: "X".into(), ..Default::default() };
        let err = create_company(&api, &form, Some(1)).await.unwrap_err();
        assert_eq!(err, ApiError::Rejected("El RUC es requerido".into()));
        assert!(api.transport().calls().is_empty());
    }

    #[test]
    fn company_payload_nulls_blanks() {
        let form = CompanyForm {
            razon_social: " X S.A. ".into(),
            nombre_comercial: "X".into(),
            ruc: "80012345-6".into(),
            telefono: "  ".into(),
            ..Default::default()
        };
        let body = form.payload(Some(2));
        assert_eq!(body["razon_social"], "X S.A.");
        assert_eq!(body["telefono"], Value::Null);
        assert_eq!(body["creado_por"], 2);
    }

    #[tokio::test]
    async fn branch_save_picks_create_or_update() {
        let api = ApiClient::new(
            RecordingTransport::new()
                .respond(json!({"resultado": 1}))
                .respond(json!({"resultado": 1})),
        );
        let form = BranchForm { nombre: "Centro".into(), es_principal: Flag::Yes, ..Default::default() };
        save_branch(&api, None, 3, &form, Some(1)).await.unwrap();
        save_branch(&api, Some(8), 3, &form, Some(1)).await.unwrap();

        let sent = api.transport().requests.borrow().clone();
        assert_eq!(sent[0].path, "/sucursales");
        assert_eq!(sent[0].body.as_ref().unwrap()["es_principal"], "S");
        assert_eq!(sent[1].path, "/sucursales/8");
        assert!(sent[1].body.as_ref().unwrap().get("es_principal").is_none());
    }

    #[test]
    fn counters_sum_children() {
        let list = vec![company(1, Flag::Yes), company(2, Flag::No)];
        let c = company_counters(&list);
        assert_eq!((c.total, c.active, c.branches, c.users), (2, 1, 4, 10));
    }
}
