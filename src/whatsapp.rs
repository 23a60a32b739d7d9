//! WhatsApp messaging: manual send, reminder job and per-company settings.
use serde_json::json;
use tracing::info;

use crate::api::{ApiClient, Transport};
use crate::error::ApiError;
use crate::format::phone_digits;
use crate::models::{SuccessResult, WhatsAppConfig};

pub const DEFAULT_TEMPLATE: &str = "Hola {nombre}, te recordamos tu cita el {fecha} a las {hora} con Dr/a. {doctor}. Cualquier consulta comunicate con nosotros.";
pub const TEMPLATE_VARIABLES: [&str; 4] = ["{nombre}", "{fecha}", "{hora}", "{doctor}"];
pub const SEND_ERROR: &str = "Error desconocido";
pub const SAVE_ERROR: &str = "Error al guardar la configuración";

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SendForm {
    pub phone: String,
    pub message: String,
}

impl SendForm {
    pub fn can_send(&self) -> bool {
        !phone_digits(&self.phone).is_empty() && !self.message.trim().is_empty()
    }
}

pub async fn send<T: Transport>(api: &ApiClient<T>, form: &SendForm, empresa_id: Option<i64>) -> Result<SuccessResult, ApiError> {
    if !form.can_send() {
        return Err(ApiError::Rejected("Ingrese teléfono y mensaje".into()));
    }
    let phone = phone_digits(&form.phone);
    let res = api
        .send_whatsapp(json!({ "phone": phone, "message": form.message.trim(), "empresa_id": empresa_id }))
        .await?;
    info!(%phone, "whatsapp message sent");
    Ok(res)
}

pub fn reminder_summary(res: &SuccessResult) -> String {
    format!("Enviados: {}, Errores: {}", res.enviados.unwrap_or(0), res.errores.unwrap_or(0))
}

pub async fn run_reminders<T: Transport>(api: &ApiClient<T>) -> Result<String, ApiError> {
    let res = api.run_reminders().await?;
    let summary = reminder_summary(&res);
    info!(%summary, "reminder job finished");
    Ok(summary)
}

/// Fills the stored config with form defaults. The access token is never
/// echoed back, so it always starts empty.
pub fn with_defaults(mut cfg: WhatsAppConfig) -> WhatsAppConfig {
    if cfg.horas_anticipacion <= 0 {
        cfg.horas_anticipacion = 24;
    }
    if cfg.plantilla_recordatorio.as_deref().map_or(true, |p| p.trim().is_empty()) {
        cfg.plantilla_recordatorio = Some(DEFAULT_TEMPLATE.to_string());
    }
    cfg.access_token = None;
    cfg
}

pub fn preview(template: &str) -> String {
    template
        .replacen("{nombre}", "Juan Pérez", 1)
        .replacen("{fecha}", "28/02/2026", 1)
        .replacen("{hora}", "10:30", 1)
        .replacen("{doctor}", "García", 1)
}

pub fn validate_config(cfg: &WhatsAppConfig) -> Result<(), &'static str> {
    if !(1..=168).contains(&cfg.horas_anticipacion) {
        return Err("Las horas de anticipación deben estar entre 1 y 168");
    }
    if cfg.habilitado.is_yes() && cfg.phone_number_id.as_deref().map_or(true, |p| p.trim().is_empty()) {
        return Err("Ingrese el Phone Number ID para habilitar el envío");
    }
    Ok(())
}

/// Saves and returns the config as the form should show it afterwards,
/// with the token cleared.
pub async fn save_config<T: Transport>(
    api: &ApiClient<T>,
    cfg: &WhatsAppConfig,
    empresa_id: i64,
) -> Result<WhatsAppConfig, ApiError> {
    validate_config(cfg).map_err(|m| ApiError::Rejected(m.to_string()))?;
    let mut outgoing = cfg.clone();
    outgoing.empresa_id = Some(empresa_id);
    if outgoing.access_token.as_deref().is_some_and(|t| t.trim().is_empty()) {
        outgoing.access_token = None;
    }
    api.save_whatsapp_config(&outgoing).await?;
    info!(empresa_id, habilitado = outgoing.habilitado.as_str(), "whatsapp config saved");
    outgoing.access_token = None;
    Ok(outgoing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::RecordingTransport;
    use crate::models::Flag;

    #[tokio::test]
    async fn send_normalises_phone() {
        let api = ApiClient::new(RecordingTransport::new().respond(json!({"success": true})));
        let form = SendForm { phone: "+595 981-234-567".into(), message: " Hola ".into() };
        send(&api, &form, Some(2)).await.unwrap();
        let body = api.transport().requests.borrow()[0].body.clone().unwrap();
        assert_eq!(body, json!({"phone": "595981234567", "message": "Hola", "empresa_id": 2}));
    }

    #[tokio::test]
    async fn empty_form_is_not_sent() {
        let api = ApiClient::new(RecordingTransport::new());
        assert!(send(&api, &SendForm { phone: "--".into(), message: "x".into() }, None).await.is_err());
        assert!(api.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn failed_send_reports_error_field() {
        let api = ApiClient::new(RecordingTransport::new().respond(json!({"success": false, "error": "Token vencido"})));
        let form = SendForm { phone: "0981".into(), message: "x".into() };
        let err = send(&api, &form, Some(1)).await.unwrap_err();
        assert_eq!(err.user_message(SEND_ERROR), "Token vencido");
    }

    #[tokio::test]
    async fn reminder_counts() {
        let api = ApiClient::new(RecordingTransport::new().respond(json!({"success": true, "enviados": 4, "errores": 1})));
        assert_eq!(run_reminders(&api).await.unwrap(), "Enviados: 4, Errores: 1");
        assert_eq!(reminder_summary(&SuccessResult::default()), "Enviados: 0, Errores: 0");
    }

    #[test]
    fn preview_fills_placeholders() {
        assert_eq!(
            preview(DEFAULT_TEMPLATE),
            "Hola Juan Pérez, te recordamos tu cita el 28/02/2026 a las 10:30 con Dr/a. García. Cualquier consulta comunicate con nosotros."
        );
    }

    #[test]
    fn defaults_and_validation() {
        let cfg = with_defaults(WhatsAppConfig { horas_anticipacion: 0, access_token: Some("secret".into()), ..Default::default() });
        assert_eq!(cfg.horas_anticipacion, 24);
        assert_eq!(cfg.plantilla_recordatorio.as_deref(), Some(DEFAULT_TEMPLATE));
        assert_eq!(cfg.access_token, None);

        let enabled = WhatsAppConfig { habilitado: Flag::Yes, ..cfg };
        assert!(validate_config(&enabled).is_err());
    }

    #[tokio::test]
    async fn save_clears_token_afterwards() {
        let api = ApiClient::new(RecordingTransport::new().respond(json!({"success": true})));
        let cfg = WhatsAppConfig { access_token: Some("EAAG".into()), ..with_defaults(WhatsAppConfig::default()) };
        let shown = save_config(&api, &cfg, 3).await.unwrap();
        assert_eq!(shown.access_token, None);
        let body = api.transport().requests.borrow()[0].body.clone().unwrap();
        assert_eq!(body["access_token"], "EAAG");
        assert_eq!(body["empresa_id"], 3);
    }
}
