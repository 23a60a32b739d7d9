use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// ORDS `S`/`N` column flag. Also accepts booleans and 1/0 on input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Flag {
    Yes,
    #[default]
    No,
}

impl Flag {
    pub fn yes() -> Self {
        Flag::Yes
    }

    pub fn is_yes(self) -> bool {
        self == Flag::Yes
    }

    pub fn toggled(self) -> Self {
        match self {
            Flag::Yes => Flag::No,
            Flag::No => Flag::Yes,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Yes => "S",
            Flag::No => "N",
        }
    }
}

impl From<bool> for Flag {
    fn from(b: bool) -> Self {
        if b { Flag::Yes } else { Flag::No }
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Flag {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(match v {
            Value::String(s) => Flag::from(matches!(s.trim().to_uppercase().as_str(), "S" | "SI" | "Y" | "TRUE" | "1")),
            Value::Bool(b) => Flag::from(b),
            Value::Number(n) => Flag::from(n.as_i64() == Some(1)),
            _ => Flag::No,
        })
    }
}

/// Deserializers for columns ORDS sometimes sends as strings or nulls.
pub mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().replace(',', ".").parse().ok(),
            _ => None,
        })
    }

    pub fn f64_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
        opt_f64(d).map(|v| v.unwrap_or(0.0))
    }

    pub fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Option::<Value>::deserialize(d)? {
            Some(Value::String(s)) => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        })
    }
}

// Envelopes

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default, rename = "hasmore", alias = "hasMore")]
    pub has_more: bool,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self { items: Vec::new(), has_more: false, limit: None, offset: None, count: None, links: Vec::new() }
    }
}

impl<T> Page<T> {
    /// Server-side total when the envelope carries one, else the page length.
    pub fn total(&self) -> usize {
        self.count.and_then(|c| usize::try_from(c).ok()).unwrap_or(self.items.len())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

/// `{ resultado, mensaje }` answer of stored-procedure endpoints.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct ProcedureResult {
    #[serde(default)]
    pub resultado: i64,
    #[serde(default)]
    pub mensaje: Option<String>,
    #[serde(default)]
    pub usuario_id: Option<i64>,
}

/// `{ success, message }` answer of the newer endpoints.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct SuccessResult {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub enviados: Option<i64>,
    #[serde(default)]
    pub errores: Option<i64>,
}

// Session

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct User {
    pub usuario_id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub username: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nombre: String,
    #[serde(default)]
    pub apellido: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub rol_nombre: Option<String>,
    #[serde(default)]
    pub es_superadmin: Flag,
}

impl User {
    pub fn display_name(&self) -> String {
        match &self.apellido {
            Some(a) if !a.is_empty() => format!("{} {}", self.nombre, a),
            _ if self.nombre.is_empty() => self.username.clone(),
            _ => self.nombre.clone(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Program {
    #[serde(default)]
    pub programa_id: Option<i64>,
    pub codigo: String,
    #[serde(default)]
    pub nombre: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct CompanyAccess {
    pub empresa_id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nombre: String,
    #[serde(default)]
    pub razon_social: Option<String>,
    #[serde(default)]
    pub ruc: Option<String>,
    #[serde(default)]
    pub es_principal: Flag,
    #[serde(default)]
    pub programas: Vec<Program>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct BranchAccess {
    pub sucursal_id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nombre: String,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub ciudad: Option<String>,
    #[serde(default)]
    pub es_principal: Flag,
}

// Patients

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct Patient {
    pub paciente_id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub numero_historia: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nombre: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub apellido: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub documento_tipo: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub documento_numero: String,
    #[serde(default)]
    pub fecha_nacimiento: Option<String>,
    #[serde(default)]
    pub genero: Option<String>,
    #[serde(default)]
    pub grupo_sanguineo: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telefono_principal: Option<String>,
    #[serde(default)]
    pub telefono_secundario: Option<String>,
    #[serde(default)]
    pub direccion_calle: Option<String>,
    #[serde(default)]
    pub direccion_ciudad: Option<String>,
    #[serde(default)]
    pub codigo_postal: Option<String>,
    #[serde(default)]
    pub contacto_emergencia_nombre: Option<String>,
    #[serde(default)]
    pub contacto_emergencia_telefono: Option<String>,
    #[serde(default)]
    pub contacto_emergencia_relacion: Option<String>,
    #[serde(default)]
    pub alergias: Option<String>,
    #[serde(default)]
    pub medicamentos_actuales: Option<String>,
    #[serde(default)]
    pub enfermedades_cronicas: Option<String>,
    #[serde(default)]
    pub empresa_id: Option<i64>,
    #[serde(default)]
    pub fecha_registro: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.nombre, self.apellido).trim().to_string()
    }

    /// `YYYY-MM-DD` registration day, from whichever column the server filled.
    pub fn registration_day(&self) -> Option<&str> {
        self.fecha_registro
            .as_deref()
            .or(self.created_at.as_deref())
            .map(|d| d.split('T').next().unwrap_or(d))
            .filter(|d| !d.is_empty())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_pacientes: i64,
    #[serde(default)]
    pub citas_hoy: i64,
    #[serde(default)]
    pub tratamientos_activos: i64,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub ingresos_mes: f64,
}

// Companies and branches

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Company {
    pub empresa_id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub razon_social: String,
    #[serde(default)]
    pub nombre_comercial: Option<String>,
    #[serde(default)]
    pub ruc: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "Flag::yes")]
    pub activo: Flag,
    #[serde(default)]
    pub total_sucursales: i64,
    #[serde(default)]
    pub total_usuarios: i64,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Branch {
    pub sucursal_id: i64,
    #[serde(default)]
    pub empresa_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nombre: String,
    #[serde(default)]
    pub codigo: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub ciudad: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub es_principal: Flag,
    #[serde(default = "Flag::yes")]
    pub activo: Flag,
    #[serde(default)]
    pub total_usuarios: i64,
}

// Locations

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Department {
    pub departamento_id: i64,
    pub nombre: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct City {
    pub ciudad_id: i64,
    #[serde(default)]
    pub departamento_id: Option<i64>,
    pub nombre: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct Neighborhood {
    pub barrio_id: i64,
    #[serde(default)]
    pub ciudad_id: Option<i64>,
    pub nombre: String,
}

// Purchasing

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct Supplier {
    #[serde(default)]
    pub proveedor_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nombre: String,
    #[serde(default)]
    pub ruc: Option<String>,
    #[serde(default)]
    pub nombre_contacto: Option<String>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub direccion: Option<String>,
    #[serde(default)]
    pub ciudad: Option<String>,
    #[serde(default)]
    pub departamento: Option<String>,
    #[serde(default)]
    pub barrio: Option<String>,
    #[serde(default)]
    pub pais: Option<String>,
    #[serde(default)]
    pub condiciones_pago: Option<String>,
    #[serde(default)]
    pub moneda: Option<String>,
    #[serde(default = "Flag::yes")]
    pub activo: Flag,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct Article {
    pub articulo_id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub codigo: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nombre: String,
    #[serde(default)]
    pub categoria_id: Option<i64>,
    #[serde(default)]
    pub unidad_medida: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub costo_unitario: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub precio_unitario: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub stock_minimo: Option<f64>,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub categoria_nombre: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub precio_venta: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub cantidad_minima: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub cantidad_maxima: Option<f64>,
    #[serde(default = "Flag::yes")]
    pub activo: Flag,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct Category {
    pub categoria_id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default = "Flag::yes")]
    pub activo: Flag,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct MeasureUnit {
    #[serde(default)]
    pub unidad_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub nombre: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub abreviatura: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct StockItem {
    #[serde(default)]
    pub inventario_id: Option<i64>,
    pub articulo_id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub articulo_nombre: String,
    #[serde(default)]
    pub articulo_codigo: Option<String>,
    #[serde(default)]
    pub unidad_medida: Option<String>,
    #[serde(default)]
    pub sucursal_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub cantidad_actual: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub cantidad_disponible: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub stock_actual: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub cantidad_minima: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub cantidad_maxima: Option<f64>,
    #[serde(default)]
    pub fecha_ultimo_ingreso: Option<String>,
    #[serde(default)]
    pub observaciones: Option<String>,
}

impl StockItem {
    /// First non-zero quantity column; a zero reading falls through to the next.
    pub fn on_hand(&self) -> f64 {
        let nonzero = |v: Option<f64>| v.filter(|q| *q != 0.0);
        nonzero(self.cantidad_disponible)
            .or(nonzero(self.cantidad_actual))
            .or(self.stock_actual)
            .unwrap_or(0.0)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct PurchaseInvoice {
    pub factura_compra_id: i64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub numero_factura: String,
    #[serde(default)]
    pub fecha_factura: Option<String>,
    #[serde(default)]
    pub proveedor_id: Option<i64>,
    #[serde(default)]
    pub proveedor_nombre: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
    #[serde(default)]
    pub moneda: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_or_zero")]
    pub total_general: f64,
    #[serde(default)]
    pub condicion_pago: Option<String>,
    #[serde(default)]
    pub fecha_creacion: Option<String>,
}

// Billing

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct Invoice {
    #[serde(default)]
    pub factura_id: Option<i64>,
    #[serde(default)]
    pub numero_factura: Option<String>,
    #[serde(default)]
    pub fecha_emision: Option<String>,
    #[serde(default)]
    pub fecha_factura: Option<String>,
    #[serde(default)]
    pub paciente_nombre: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub total_factura: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub monto_total: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub total_pagado: Option<f64>,
    #[serde(default)]
    pub estado: Option<String>,
}

impl Invoice {
    pub fn billed(&self) -> f64 {
        self.total_factura.filter(|v| *v != 0.0).or(self.monto_total).unwrap_or(0.0)
    }

    pub fn collected(&self) -> f64 {
        self.total_pagado.unwrap_or(0.0)
    }

    pub fn is_voided(&self) -> bool {
        self.estado.as_deref() == Some("ANULADA")
    }

    /// Emission day as `YYYY-MM-DD`, from whichever date column is filled.
    pub fn issued_on(&self) -> Option<&str> {
        present(&self.fecha_emision)
            .or(present(&self.fecha_factura))
            .and_then(|d| d.split('T').next())
            .filter(|d| !d.is_empty())
    }

    /// Grouping key for the per-day chart.
    pub fn day(&self) -> String {
        self.issued_on().unwrap_or("Sin fecha").to_string()
    }
}

fn present(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.trim().is_empty())
}

// WhatsApp

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Default)]
pub struct WhatsAppMessage {
    #[serde(default)]
    pub mensaje_id: Option<i64>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub paciente_nombre: Option<String>,
    #[serde(default)]
    pub mensaje: Option<String>,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub estado: String,
    #[serde(default)]
    pub fecha_envio: Option<String>,
    #[serde(default)]
    pub error_detalle: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub config_id: Option<i64>,
    #[serde(default)]
    pub empresa_id: Option<i64>,
    #[serde(default)]
    pub habilitado: Flag,
    #[serde(default)]
    pub phone_number_id: Option<String>,
    #[serde(default)]
    pub waba_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_hours_ahead")]
    pub horas_anticipacion: i64,
    #[serde(default)]
    pub plantilla_recordatorio: Option<String>,
}

fn default_hours_ahead() -> i64 {
    24
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            config_id: None,
            empresa_id: None,
            habilitado: Flag::No,
            phone_number_id: None,
            waba_id: None,
            access_token: None,
            horas_anticipacion: default_hours_ahead(),
            plantilla_recordatorio: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flag_reads_ords_and_json_forms() {
        let f: Flag = serde_json::from_value(json!("S")).unwrap();
        assert_eq!(f, Flag::Yes);
        let f: Flag = serde_json::from_value(json!(false)).unwrap();
        assert_eq!(f, Flag::No);
        let f: Flag = serde_json::from_value(json!(1)).unwrap();
        assert_eq!(f, Flag::Yes);
        assert_eq!(serde_json::to_value(Flag::No).unwrap(), json!("N"));
        assert_eq!(Flag::Yes.toggled(), Flag::No);
    }

    #[test]
    fn page_envelope_tolerates_missing_fields() {
        let p: Page<Department> = serde_json::from_value(json!({
            "items": [{"departamento_id": 11, "nombre": "Central"}],
            "hasmore": true,
            "count": 1
        }))
        .unwrap();
        assert!(p.has_more);
        assert_eq!(p.total(), 1);

        let empty: Page<Department> = serde_json::from_value(json!({})).unwrap();
        assert!(empty.items.is_empty());
        assert_eq!(empty.total(), 0);
    }

    #[test]
    fn null_columns_and_string_numbers_decode() {
        let a: Article = serde_json::from_value(json!({
            "articulo_id": 3,
            "codigo": null,
            "nombre": "Guantes",
            "costo_unitario": "1500",
            "stock_minimo": null
        }))
        .unwrap();
        assert_eq!(a.codigo, "");
        assert_eq!(a.costo_unitario, Some(1500.0));
        assert_eq!(a.stock_minimo, None);
        assert!(a.activo.is_yes());
    }

    #[test]
    fn invoice_amount_fallbacks() {
        let i = Invoice { total_factura: None, monto_total: Some(200.0), ..Default::default() };
        assert_eq!(i.billed(), 200.0);
        let j = Invoice { fecha_factura: Some("2025-03-02T10:00:00Z".into()), ..Default::default() };
        assert_eq!(j.day(), "2025-03-02");
        assert_eq!(Invoice::default().day(), "Sin fecha");
    }

    #[test]
    fn blank_emission_date_falls_back_to_invoice_date() {
        let i = Invoice {
            fecha_emision: Some(String::new()),
            fecha_factura: Some("2025-03-02T08:30:00".into()),
            ..Default::default()
        };
        assert_eq!(i.day(), "2025-03-02");
        let spaces = Invoice { fecha_emision: Some("  ".into()), ..Default::default() };
        assert_eq!(spaces.day(), "Sin fecha");
    }

    #[test]
    fn zero_stock_column_falls_through() {
        let s = StockItem { cantidad_disponible: Some(0.0), cantidad_actual: Some(12.0), ..Default::default() };
        assert_eq!(s.on_hand(), 12.0);
        let t = StockItem { cantidad_disponible: Some(0.0), cantidad_actual: None, stock_actual: Some(4.0), ..Default::default() };
        assert_eq!(t.on_hand(), 4.0);
        let empty = StockItem { cantidad_disponible: Some(0.0), ..Default::default() };
        assert_eq!(empty.on_hand(), 0.0);
    }

    #[test]
    fn patient_registration_day_prefers_fecha_registro() {
        let p = Patient {
            fecha_registro: Some("2025-01-09T00:00:00".into()),
            created_at: Some("2024-01-01".into()),
            ..Default::default()
        };
        assert_eq!(p.registration_day(), Some("2025-01-09"));
    }
}
