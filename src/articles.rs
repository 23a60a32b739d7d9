//! Article catalogue: search, article form, categories and measure units.
use serde_json::{json, Value};
use tracing::info;

use crate::api::{nullable, ApiClient, Transport};
use crate::components::parse_amount;
use crate::error::ApiError;
use crate::models::{Article, Category, Flag, MeasureUnit, SuccessResult};

pub const SAVE_ERROR: &str = "Error al guardar el artículo";
pub const CATEGORY_SAVE_ERROR: &str = "Error al guardar la categoría";
pub const CATEGORY_DELETE_ERROR: &str = "No se pudo eliminar la categoría";
pub const CONFIRM_CATEGORY_DELETE: &str = "¿Eliminar esta categoría permanentemente?";

pub const DEFAULT_UNIT: &str = "UNIDADES";

/// Matches name or code, ignoring case.
pub fn filter<'a>(articles: &'a [Article], query: &str) -> Vec<&'a Article> {
    let q = query.trim().to_lowercase();
    articles
        .iter()
        .filter(|a| q.is_empty() || a.nombre.to_lowercase().contains(&q) || a.codigo.to_lowercase().contains(&q))
        .collect()
}

/// `(categoria_id, NOMBRE)` pairs for selects.
pub fn category_options(categories: &[Category]) -> Vec<(String, String)> {
    categories.iter().map(|c| (c.categoria_id.to_string(), c.nombre.to_uppercase())).collect()
}

/// Units keyed by abbreviation. An empty unit table still offers "UN".
pub fn unit_options(units: &[MeasureUnit]) -> Vec<(String, String)> {
    if units.is_empty() {
        return vec![("UN".into(), "Unidad".into())];
    }
    units
        .iter()
        .map(|u| (u.abreviatura.clone(), format!("{} ({})", u.nombre, u.abreviatura)))
        .collect()
}

/// Numbers are kept as typed text; zero or missing shows the default.
#[derive(Clone, Debug, PartialEq)]
pub struct ArticleForm {
    pub articulo_id: Option<i64>,
    pub codigo: String,
    pub nombre: String,
    pub descripcion: String,
    pub categoria_id: String,
    pub unidad_medida: String,
    pub costo_unitario: String,
    pub precio_venta: String,
    pub cantidad_minima: String,
    pub cantidad_maxima: String,
    pub activo: Flag,
}

impl Default for ArticleForm {
    fn default() -> Self {
        Self {
            articulo_id: None,
            codigo: String::new(),
            nombre: String::new(),
            descripcion: String::new(),
            categoria_id: String::new(),
            unidad_medida: DEFAULT_UNIT.into(),
            costo_unitario: "0".into(),
            precio_venta: "0".into(),
            cantidad_minima: "1".into(),
            cantidad_maxima: "10".into(),
            activo: Flag::Yes,
        }
    }
}

fn number(v: Option<f64>, fallback: &str) -> String {
    v.filter(|n| *n != 0.0).map(|n| n.to_string()).unwrap_or_else(|| fallback.to_string())
}

impl From<&Article> for ArticleForm {
    fn from(a: &Article) -> Self {
        let defaults = Self::default();
        Self {
            articulo_id: Some(a.articulo_id),
            codigo: a.codigo.clone(),
            nombre: a.nombre.clone(),
            descripcion: a.descripcion.clone().unwrap_or_default(),
            categoria_id: a.categoria_id.map(|c| c.to_string()).unwrap_or_default(),
            unidad_medida: a.unidad_medida.clone().filter(|u| !u.is_empty()).unwrap_or(defaults.unidad_medida),
            costo_unitario: number(a.costo_unitario, &defaults.costo_unitario),
            precio_venta: number(a.precio_venta, &defaults.precio_venta),
            cantidad_minima: number(a.cantidad_minima, &defaults.cantidad_minima),
            cantidad_maxima: number(a.cantidad_maxima, &defaults.cantidad_maxima),
            activo: a.activo,
        }
    }
}

impl ArticleForm {
    fn category(&self) -> Option<i64> {
        self.categoria_id.trim().parse().ok()
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.nombre.trim().is_empty() {
            return Err("El nombre del artículo es requerido");
        }
        if self.category().is_none() {
            return Err("Seleccione una categoría");
        }
        if self.unidad_medida.trim().is_empty() {
            return Err("Seleccione la unidad de medida");
        }
        Ok(())
    }

    /// A new article with a blank code sends `null` so the server assigns one.
    pub fn payload(&self, usuario_id: Option<i64>) -> Value {
        let codigo = match self.articulo_id {
            None => nullable(&self.codigo),
            Some(_) => json!(self.codigo.trim()),
        };
        json!({
            "articulo_id": self.articulo_id,
            "codigo": codigo,
            "nombre": self.nombre.trim(),
            "descripcion": nullable(&self.descripcion),
            "categoria_id": self.category(),
            "unidad_medida": self.unidad_medida,
            "costo_unitario": parse_amount(&self.costo_unitario),
            "precio_venta": parse_amount(&self.precio_venta),
            "cantidad_minima": parse_amount(&self.cantidad_minima),
            "cantidad_maxima": parse_amount(&self.cantidad_maxima),
            "activo": self.activo,
            "usuario_id": usuario_id,
        })
    }
}

pub async fn save<T: Transport>(
    api: &ApiClient<T>,
    form: &ArticleForm,
    usuario_id: Option<i64>,
) -> Result<SuccessResult, ApiError> {
    form.validate().map_err(|m| ApiError::Rejected(m.to_string()))?;
    let res = api.upsert_article(form.payload(usuario_id)).await?;
    info!(articulo_id = ?form.articulo_id, "article saved");
    Ok(res)
}

/// Re-sends the whole record with `activo` flipped.
pub async fn toggle<T: Transport>(
    api: &ApiClient<T>,
    article: &Article,
    usuario_id: Option<i64>,
) -> Result<SuccessResult, ApiError> {
    let mut body = serde_json::to_value(article)?;
    body["activo"] = json!(article.activo.toggled());
    body["usuario_id"] = json!(usuario_id);
    api.upsert_article(body).await
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CategoryForm {
    pub categoria_id: Option<i64>,
    pub nombre: String,
    pub descripcion: String,
}

impl From<&Category> for CategoryForm {
    fn from(c: &Category) -> Self {
        Self {
            categoria_id: Some(c.categoria_id),
            nombre: c.nombre.clone(),
            descripcion: c.descripcion.clone().unwrap_or_default(),
        }
    }
}

impl CategoryForm {
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.nombre.trim().is_empty() {
            return Err("El nombre de la categoría es requerido");
        }
        Ok(())
    }

    pub fn payload(&self) -> Value {
        json!({
            "categoria_id": self.categoria_id,
            "nombre": self.nombre.trim(),
            "descripcion": nullable(&self.descripcion),
            "activo": Flag::Yes,
        })
    }
}

pub async fn save_category<T: Transport>(api: &ApiClient<T>, form: &CategoryForm) -> Result<SuccessResult, ApiError> {
    form.validate().map_err(|m| ApiError::Rejected(m.to_string()))?;
    let res = api.upsert_category(form.payload()).await?;
    info!(categoria_id = ?form.categoria_id, "category saved");
    Ok(res)
}

pub async fn delete_category<T: Transport>(api: &ApiClient<T>, categoria_id: i64) -> Result<SuccessResult, ApiError> {
    let res = api.delete_category(categoria_id).await?;
    info!(categoria_id, "category deleted");
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::RecordingTransport;
    use crate::api::Method;

    fn sample() -> Vec<Article> {
        vec![
            Article { articulo_id: 1, codigo: "GUA-01".into(), nombre: "Guantes de látex".into(), ..Default::default() },
            Article { articulo_id: 2, codigo: "RES-07".into(), nombre: "Resina A2".into(), ..Default::default() },
        ]
    }

    fn valid_form() -> ArticleForm {
        ArticleForm { nombre: "Anestesia".into(), categoria_id: "3".into(), ..Default::default() }
    }

    #[test]
    fn filter_matches_name_or_code() {
        let all = sample();
        assert_eq!(filter(&all, "gua")[0].articulo_id, 1);
        assert_eq!(filter(&all, "res-07")[0].articulo_id, 2);
        assert_eq!(filter(&all, " ").len(), 2);
        assert!(filter(&all, "jeringa").is_empty());
    }

    #[test]
    fn new_article_payload_leaves_code_to_server() {
        let form = ArticleForm { costo_unitario: "1500".into(), precio_venta: "2500".into(), ..valid_form() };
        let body = form.payload(Some(4));
        assert_eq!(body["articulo_id"], Value::Null);
        assert_eq!(body["codigo"], Value::Null);
        assert_eq!(body["categoria_id"], 3);
        assert_eq!(body["unidad_medida"], DEFAULT_UNIT);
        assert_eq!(body["costo_unitario"], 1500.0);
        assert_eq!(body["precio_venta"], 2500.0);
        assert_eq!(body["cantidad_minima"], 1.0);
        assert_eq!(body["cantidad_maxima"], 10.0);
        assert_eq!(body["activo"], "S");
        assert_eq!(body["usuario_id"], 4);
    }

    #[test]
    fn editing_keeps_code_and_fills_zero_numbers() {
        let a = Article {
            categoria_id: Some(2),
            unidad_medida: Some("CJ".into()),
            costo_unitario: Some(8000.0),
            cantidad_minima: Some(0.0),
            ..sample()[1].clone()
        };
        let form = ArticleForm::from(&a);
        assert_eq!(form.articulo_id, Some(2));
        assert_eq!(form.categoria_id, "2");
        assert_eq!(form.costo_unitario, "8000");
        assert_eq!(form.cantidad_minima, "1");
        assert_eq!(form.payload(None)["codigo"], "RES-07");
    }

    #[test]
    fn validation_order() {
        assert_eq!(ArticleForm::default().validate(), Err("El nombre del artículo es requerido"));
        let no_category = ArticleForm { categoria_id: String::new(), ..valid_form() };
        assert_eq!(no_category.validate(), Err("Seleccione una categoría"));
        let no_unit = ArticleForm { unidad_medida: " ".into(), ..valid_form() };
        assert_eq!(no_unit.validate(), Err("Seleccione la unidad de medida"));
        assert!(valid_form().validate().is_ok());
    }

    #[test]
    fn empty_unit_table_offers_single_unit() {
        assert_eq!(unit_options(&[]), vec![("UN".to_string(), "Unidad".to_string())]);
        let units = vec![MeasureUnit { unidad_id: Some(1), nombre: "Caja".into(), abreviatura: "CJ".into() }];
        assert_eq!(unit_options(&units), vec![("CJ".to_string(), "Caja (CJ)".to_string())]);
        let cats = vec![Category { categoria_id: 5, nombre: "Insumos".into(), ..Default::default() }];
        assert_eq!(category_options(&cats), vec![("5".to_string(), "INSUMOS".to_string())]);
    }

    #[tokio::test]
    async fn invalid_article_is_not_sent() {
        let api = ApiClient::new(RecordingTransport::new());
        let err = save(&api, &ArticleForm::default(), None).await.unwrap_err();
        assert_eq!(err.user_message(SAVE_ERROR), "El nombre del artículo es requerido");
        assert!(api.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn article_save_posts_catalogue_record() {
        let api = ApiClient::new(RecordingTransport::new().respond(json!({"success": true, "articulo_id": 9})));
        save(&api, &valid_form(), Some(1)).await.unwrap();
        assert_eq!(api.transport().calls(), vec![(Method::Post, "/compras/articulos".to_string())]);
        let body = api.transport().requests.borrow()[0].body.clone().unwrap();
        assert_eq!(body["nombre"], "Anestesia");
    }

    #[tokio::test]
    async fn toggle_resends_article_with_flipped_flag() {
        let api = ApiClient::new(RecordingTransport::new().respond(json!({"success": true})));
        let a = Article { activo: Flag::Yes, ..sample()[0].clone() };
        toggle(&api, &a, Some(2)).await.unwrap();
        let body = api.transport().requests.borrow()[0].body.clone().unwrap();
        assert_eq!(body["activo"], "N");
        assert_eq!(body["articulo_id"], 1);
        assert_eq!(body["codigo"], "GUA-01");
        assert_eq!(body["usuario_id"], 2);
    }

    #[tokio::test]
    async fn category_upsert_and_delete_endpoints() {
        let api = ApiClient::new(
            RecordingTransport::new()
                .respond(json!({"success": true, "categoria_id": 5}))
                .respond(json!({"success": true})),
        );
        let form = CategoryForm { nombre: " Insumos ".into(), ..Default::default() };
        save_category(&api, &form).await.unwrap();
        delete_category(&api, 5).await.unwrap();
        assert_eq!(
            api.transport().calls(),
            vec![(Method::Post, "/compras/categorias".to_string()), (Method::Delete, "/compras/categorias/5".to_string())]
        );
        let body = api.transport().requests.borrow()[0].body.clone().unwrap();
        assert_eq!(body["nombre"], "Insumos");
        assert_eq!(body["categoria_id"], Value::Null);
        assert_eq!(body["descripcion"], Value::Null);
        assert_eq!(body["activo"], "S");
    }

    #[tokio::test]
    async fn blocked_category_delete_surfaces_server_text() {
        let api = ApiClient::new(
            RecordingTransport::new().respond(json!({"success": false, "message": "La categoría tiene artículos asociados"})),
        );
        let err = delete_category(&api, 5).await.unwrap_err();
        assert_eq!(err.user_message(CATEGORY_DELETE_ERROR), "La categoría tiene artículos asociados");
    }

    #[tokio::test]
    async fn unnamed_category_is_not_sent() {
        let api = ApiClient::new(RecordingTransport::new());
        assert!(save_category(&api, &CategoryForm::default()).await.is_err());
        assert!(api.transport().calls().is_empty());
    }
}
