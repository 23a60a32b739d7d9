//! Patient form rules, list filtering and the delete flow.
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::{nullable, ApiClient, Transport};
use crate::error::ApiError;
use crate::format::looks_like_email;
use crate::models::{Page, Patient};

pub const DOCUMENT_TYPES: [&str; 4] = ["CI", "RUC", "DNI", "PAS"];
pub const GENDERS: [(&str, &str); 3] = [("M", "Masculino"), ("F", "Femenino"), ("O", "Otro")];
pub const BLOOD_GROUPS: [&str; 8] = ["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

pub const LOAD_ERROR: &str = "No se pudo cargar la información del paciente.";
pub const SAVE_ERROR: &str = "Ocurrió un error al guardar los datos del paciente.";
pub const LIST_ERROR: &str = "Error al cargar la lista de pacientes.";
pub const DELETE_ERROR: &str = "No se pudo eliminar el paciente.";

#[derive(Clone, Debug, PartialEq)]
pub struct PatientForm {
    pub numero_historia: String,
    pub nombre: String,
    pub apellido: String,
    pub documento_tipo: String,
    pub documento_numero: String,
    pub fecha_nacimiento: String,
    pub genero: String,
    pub grupo_sanguineo: String,
    pub email: String,
    pub telefono_principal: String,
    pub telefono_secundario: String,
    pub direccion_calle: String,
    pub direccion_ciudad: String,
    pub codigo_postal: String,
    pub contacto_emergencia_nombre: String,
    pub contacto_emergencia_telefono: String,
    pub contacto_emergencia_relacion: String,
    pub alergias: String,
    pub medicamentos_actuales: String,
    pub enfermedades_cronicas: String,
}

impl Default for PatientForm {
    fn default() -> Self {
        Self {
            numero_historia: String::new(),
            nombre: String::new(),
            apellido: String::new(),
            documento_tipo: "CI".into(),
            documento_numero: String::new(),
            fecha_nacimiento: String::new(),
            genero: "M".into(),
            grupo_sanguineo: String::new(),
            email: String::new(),
            telefono_principal: String::new(),
            telefono_secundario: String::new(),
            direccion_calle: String::new(),
            direccion_ciudad: String::new(),
            codigo_postal: String::new(),
            contacto_emergencia_nombre: String::new(),
            contacto_emergencia_telefono: String::new(),
            contacto_emergencia_relacion: String::new(),
            alergias: String::new(),
            medicamentos_actuales: String::new(),
            enfermedades_cronicas: String::new(),
        }
    }
}

fn text(v: &Option<String>) -> String {
    v.clone().unwrap_or_default()
}

impl From<&Patient> for PatientForm {
    fn from(p: &Patient) -> Self {
        let defaults = Self::default();
        Self {
            numero_historia: p.numero_historia.clone(),
            nombre: p.nombre.clone(),
            apellido: p.apellido.clone(),
            documento_tipo: if p.documento_tipo.is_empty() { defaults.documento_tipo } else { p.documento_tipo.clone() },
            documento_numero: p.documento_numero.clone(),
            fecha_nacimiento: p.fecha_nacimiento.as_deref().map(|d| d.get(..10).unwrap_or(d).to_string()).unwrap_or_default(),
            genero: p.genero.clone().filter(|g| !g.is_empty()).unwrap_or(defaults.genero),
            grupo_sanguineo: text(&p.grupo_sanguineo),
            email: text(&p.email),
            telefono_principal: text(&p.telefono_principal),
            telefono_secundario: text(&p.telefono_secundario),
            direccion_calle: text(&p.direccion_calle),
            direccion_ciudad: text(&p.direccion_ciudad),
            codigo_postal: text(&p.codigo_postal),
            contacto_emergencia_nombre: text(&p.contacto_emergencia_nombre),
            contacto_emergencia_telefono: text(&p.contacto_emergencia_telefono),
            contacto_emergencia_relacion: text(&p.contacto_emergencia_relacion),
            alergias: text(&p.alergias),
            medicamentos_actuales: text(&p.medicamentos_actuales),
            enfermedades_cronicas: text(&p.enfermedades_cronicas),
        }
    }
}

impl PatientForm {
    /// First failing rule, in field order.
    pub fn validate(&self) -> Result<(), &'static str> {
        let required = [
            (&self.documento_numero, "El número de documento es obligatorio"),
            (&self.nombre, "El nombre es obligatorio"),
            (&self.apellido, "El apellido es obligatorio"),
            (&self.fecha_nacimiento, "La fecha de nacimiento es obligatoria"),
            (&self.telefono_principal, "El teléfono principal es obligatorio"),
        ];
        if let Some((_, msg)) = required.iter().find(|(v, _)| v.trim().is_empty()) {
            return Err(*msg);
        }
        if !self.email.trim().is_empty() && !looks_like_email(&self.email) {
            return Err("El email no tiene un formato válido");
        }
        Ok(())
    }

    pub fn payload(&self, empresa_id: Option<i64>) -> Value {
        json!({
            "numero_historia": nullable(&self.numero_historia),
            "nombre": self.nombre.trim(),
            "apellido": self.apellido.trim(),
            "documento_tipo": self.documento_tipo,
            "documento_numero": self.documento_numero.trim(),
            "fecha_nacimiento": self.fecha_nacimiento,
            "genero": self.genero,
            "grupo_sanguineo": nullable(&self.grupo_sanguineo),
            "email": nullable(&self.email),
            "telefono_principal": self.telefono_principal.trim(),
            "telefono_secundario": nullable(&self.telefono_secundario),
            "direccion_calle": nullable(&self.direccion_calle),
            "direccion_ciudad": nullable(&self.direccion_ciudad),
            "codigo_postal": nullable(&self.codigo_postal),
            "contacto_emergencia_nombre": nullable(&self.contacto_emergencia_nombre),
            "contacto_emergencia_telefono": nullable(&self.contacto_emergencia_telefono),
            "contacto_emergencia_relacion": nullable(&self.contacto_emergencia_relacion),
            "alergias": nullable(&self.alergias),
            "medicamentos_actuales": nullable(&self.medicamentos_actuales),
            "enfermedades_cronicas": nullable(&self.enfermedades_cronicas),
            "empresa_id": empresa_id,
        })
    }
}

/// Creates or updates. An invalid form is rejected before any request.
pub async fn save<T: Transport>(
    api: &ApiClient<T>,
    id: Option<i64>,
    form: &PatientForm,
    empresa_id: Option<i64>,
) -> Result<(), ApiError> {
    form.validate().map_err(|m| ApiError::Rejected(m.to_string()))?;
    let payload = form.payload(empresa_id);
    match id {
        Some(id) => api.update_patient(id, &payload).await?,
        None => api.create_patient(&payload).await?,
    };
    info!(paciente_id = ?id, "patient saved");
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct PatientRows {
    pub rows: Vec<Patient>,
    /// Demo data shown because the real fetch failed.
    pub demo: bool,
}

pub async fn load<T: Transport>(
    api: &ApiClient<T>,
    empresa_id: Option<i64>,
    dev_fallback: bool,
) -> Result<PatientRows, ApiError> {
    or_demo(api.list_patients(empresa_id, None).await, dev_fallback)
}

/// Blank query lists the company's patients; anything else goes to the
/// server-side search.
pub async fn load_matching<T: Transport>(
    api: &ApiClient<T>,
    empresa_id: Option<i64>,
    query: &str,
    dev_fallback: bool,
) -> Result<PatientRows, ApiError> {
    match query.trim() {
        "" => load(api, empresa_id, dev_fallback).await,
        q => or_demo(api.search_patients(q).await, dev_fallback),
    }
}

fn or_demo(fetched: Result<Page<Patient>, ApiError>, dev_fallback: bool) -> Result<PatientRows, ApiError> {
    match fetched {
        Ok(page) => Ok(PatientRows { rows: page.items, demo: false }),
        Err(e) if dev_fallback => {
            warn!(error = %e, "patient list failed, showing demo rows");
            Ok(PatientRows { rows: demo_patients(), demo: true })
        }
        Err(e) => Err(e),
    }
}

/// One DELETE, then a fresh list.
pub async fn delete_and_reload<T: Transport>(
    api: &ApiClient<T>,
    id: i64,
    empresa_id: Option<i64>,
    dev_fallback: bool,
) -> Result<PatientRows, ApiError> {
    api.delete_patient(id).await?;
    info!(paciente_id = id, "patient deleted");
    load(api, empresa_id, dev_fallback).await
}

pub fn confirm_delete_text(p: &Patient) -> String {
    format!("¿Está seguro de eliminar a {}?", p.full_name())
}

/// Case-insensitive match on name, surname, document and history number.
pub fn filter<'a>(patients: &'a [Patient], query: &str) -> Vec<&'a Patient> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return patients.iter().collect();
    }
    patients
        .iter()
        .filter(|p| {
            [&p.nombre, &p.apellido, &p.documento_numero, &p.numero_historia]
                .iter()
                .any(|f| f.to_lowercase().contains(&q))
        })
        .collect()
}

pub fn demo_patients() -> Vec<Patient> {
    let row = |id, historia: &str, nombre: &str, apellido: &str, doc: &str, nac: &str, genero: &str, email: &str, tel: &str, ciudad: &str, calle: &str| Patient {
        paciente_id: id,
        numero_historia: historia.into(),
        nombre: nombre.into(),
        apellido: apellido.into(),
        documento_tipo: "CI".into(),
        documento_numero: doc.into(),
        fecha_nacimiento: Some(nac.into()),
        genero: Some(genero.into()),
        email: Some(email.into()),
        telefono_principal: Some(tel.into()),
        direccion_ciudad: Some(ciudad.into()),
        direccion_calle: Some(calle.into()),
        ..Default::default()
    };
    vec![
        row(1, "OD-2024-001", "Juan Carlos", "Perez Rojas", "1.234.567", "1990-05-15", "M", "juan.perez@email.com", "0981-111-222", "Asunción", "Av. España 1234"),
        row(2, "OD-2024-002", "Maria Elena", "Benitez Troche", "3.456.789", "1995-10-20", "F", "maria.b@email.com", "0971-333-444", "Luque", "General Aquino 567"),
        row(3, "OD-2024-003", "Carlos Enrique", "Gonzalez Silva", "2.876.543", "1985-03-08", "M", "carlos.g@email.com", "0991-555-666", "San Lorenzo", "Mariscal Estigarribia 890"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::RecordingTransport;
    use crate::api::Method;

    fn valid_form() -> PatientForm {
        PatientForm {
            nombre: "Ana".into(),
            apellido: "Paz".into(),
            documento_numero: "4.567.890".into(),
            fecha_nacimiento: "1992-02-02".into(),
            telefono_principal: "0981 000 000".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_document_blocks_without_request() {
        let api = ApiClient::new(RecordingTransport::new());
        let form = PatientForm { documento_numero: "  ".into(), ..valid_form() };
        let err = save(&api, None, &form, Some(1)).await.unwrap_err();
        assert_eq!(err, ApiError::Rejected("El número de documento es obligatorio".into()));
        assert!(api.transport().calls().is_empty());
    }

    #[test]
    fn bad_email_is_rejected_blank_is_fine() {
        assert!(valid_form().validate().is_ok());
        let f = PatientForm { email: "ana@".into(), ..valid_form() };
        assert_eq!(f.validate(), Err("El email no tiene un formato válido"));
    }

    #[test]
    fn payload_nulls_blank_optionals() {
        let body = valid_form().payload(Some(3));
        assert_eq!(body["email"], Value::Null);
        assert_eq!(body["documento_tipo"], "CI");
        assert_eq!(body["genero"], "M");
        assert_eq!(body["empresa_id"], 3);
    }

    #[tokio::test]
    async fn save_routes_create_and_update() {
        let api = ApiClient::new(RecordingTransport::new());
        save(&api, None, &valid_form(), Some(1)).await.unwrap();
        save(&api, Some(9), &valid_form(), Some(1)).await.unwrap();
        assert_eq!(
            api.transport().calls(),
            vec![(Method::Post, "/pacientes".to_string()), (Method::Put, "/pacientes/9".to_string())]
        );
    }

    #[tokio::test]
    async fn delete_issues_one_delete_then_reloads() {
        let api = ApiClient::new(
            RecordingTransport::new()
                .respond(Value::Null)
                .respond(json!({"items": [{"paciente_id": 2, "nombre": "Luis", "apellido": "Gómez"}]})),
        );
        let rows = delete_and_reload(&api, 1, Some(1), false).await.unwrap();
        assert_eq!(api.transport().count(Method::Delete), 1);
        assert_eq!(
            api.transport().calls(),
            vec![(Method::Delete, "/pacientes/1".to_string()), (Method::Get, "/pacientes".to_string())]
        );
        assert_eq!(rows.rows.len(), 1);
    }

    #[tokio::test]
    async fn failed_delete_does_not_reload() {
        let api = ApiClient::new(RecordingTransport::new().fail(ApiError::Transport("down".into())));
        assert!(delete_and_reload(&api, 1, None, false).await.is_err());
        assert_eq!(api.transport().calls().len(), 1);
    }

    #[tokio::test]
    async fn list_failure_only_falls_back_in_dev_mode() {
        let api = ApiClient::new(RecordingTransport::new().fail(ApiError::Transport("down".into())));
        assert!(load(&api, None, false).await.is_err());

        let api = ApiClient::new(RecordingTransport::new().fail(ApiError::Transport("down".into())));
        let rows = load(&api, None, true).await.unwrap();
        assert!(rows.demo);
        assert_eq!(rows.rows.len(), 3);
    }

    #[tokio::test]
    async fn typed_query_uses_server_search() {
        let api = ApiClient::new(
            RecordingTransport::new()
                .respond(json!({"items": [{"paciente_id": 5, "nombre": "Ana", "apellido": "Paz"}]}))
                .respond(json!({"items": []})),
        );
        let found = load_matching(&api, Some(1), "  Paz ", false).await.unwrap();
        assert_eq!(found.rows[0].paciente_id, 5);
        load_matching(&api, Some(1), "", false).await.unwrap();

        let requests = api.transport().requests.borrow();
        assert_eq!(requests[0].path, "/pacientes/buscar");
        assert_eq!(requests[0].query, vec![("q".to_string(), "Paz".to_string())]);
        assert_eq!(requests[1].path, "/pacientes");
    }

    #[tokio::test]
    async fn failed_search_falls_back_in_dev_mode() {
        let api = ApiClient::new(RecordingTransport::new().fail(ApiError::Transport("down".into())));
        let rows = load_matching(&api, None, "benitez", true).await.unwrap();
        assert!(rows.demo);
        assert_eq!(filter(&rows.rows, "benitez").len(), 1);
    }

    #[test]
    fn filter_matches_any_identifying_field() {
        let all = demo_patients();
        assert_eq!(filter(&all, "benitez").len(), 1);
        assert_eq!(filter(&all, "OD-2024-003")[0].paciente_id, 3);
        assert_eq!(filter(&all, "2.876").len(), 1);
        assert_eq!(filter(&all, "").len(), 3);
        assert!(filter(&all, "zzz").is_empty());
    }

    #[test]
    fn form_from_record_trims_timestamp() {
        let p = Patient { fecha_nacimiento: Some("1990-05-15T00:00:00Z".into()), ..demo_patients()[0].clone() };
        let f = PatientForm::from(&p);
        assert_eq!(f.fecha_nacimiento, "1990-05-15");
        assert_eq!(f.telefono_principal, "0981-111-222");
        assert_eq!(confirm_delete_text(&p), "¿Está seguro de eliminar a Juan Carlos Perez Rojas?");
    }
}
