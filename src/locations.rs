//! Department → city → neighborhood selects.
//!
//! Selections are kept by name, which is what supplier records store. Ids
//! are looked up in the loaded lists when a child list must be fetched.
use crate::api::{ApiClient, Transport};
use crate::error::ApiError;
use crate::models::{City, Department, Neighborhood};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LocationCascade {
    pub departamento: String,
    pub ciudad: String,
    pub barrio: String,
    cities_for: Option<String>,
    neighborhoods_for: Option<String>,
}

impl LocationCascade {
    /// Starts from a stored record. Child lists still have to resolve
    /// before their selects unlock.
    pub fn from_names(departamento: &str, ciudad: &str, barrio: &str) -> Self {
        Self {
            departamento: departamento.to_string(),
            ciudad: ciudad.to_string(),
            barrio: barrio.to_string(),
            ..Default::default()
        }
    }

    pub fn set_department(&mut self, nombre: &str) {
        if self.departamento == nombre {
            return;
        }
        self.departamento = nombre.to_string();
        self.ciudad.clear();
        self.barrio.clear();
        self.cities_for = None;
        self.neighborhoods_for = None;
    }

    pub fn set_city(&mut self, nombre: &str) {
        if self.ciudad == nombre {
            return;
        }
        self.ciudad = nombre.to_string();
        self.barrio.clear();
        self.neighborhoods_for = None;
    }

    pub fn set_neighborhood(&mut self, nombre: &str) {
        self.barrio = nombre.to_string();
    }

    /// Marks the city list as loaded. Answers for a department that is no
    /// longer selected are ignored.
    pub fn cities_loaded(&mut self, for_department: &str) {
        if !for_department.is_empty() && self.departamento == for_department {
            self.cities_for = Some(for_department.to_string());
        }
    }

    pub fn neighborhoods_loaded(&mut self, for_city: &str) {
        if !for_city.is_empty() && self.ciudad == for_city {
            self.neighborhoods_for = Some(for_city.to_string());
        }
    }

    pub fn city_enabled(&self) -> bool {
        !self.departamento.is_empty() && self.cities_for.as_deref() == Some(self.departamento.as_str())
    }

    pub fn neighborhood_enabled(&self) -> bool {
        !self.ciudad.is_empty() && self.neighborhoods_for.as_deref() == Some(self.ciudad.as_str())
    }
}

/// Cities of the named department; an unknown name yields an empty list
/// without a request.
pub async fn load_cities<T: Transport>(
    api: &ApiClient<T>,
    departments: &[Department],
    departamento: &str,
) -> Result<Vec<City>, ApiError> {
    match departments.iter().find(|d| d.nombre == departamento) {
        Some(d) => Ok(api.cities(d.departamento_id).await?.items),
        None => Ok(Vec::new()),
    }
}

pub async fn load_neighborhoods<T: Transport>(
    api: &ApiClient<T>,
    cities: &[City],
    ciudad: &str,
) -> Result<Vec<Neighborhood>, ApiError> {
    match cities.iter().find(|c| c.nombre == ciudad) {
        Some(c) => Ok(api.neighborhoods(c.ciudad_id).await?.items),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::RecordingTransport;
    use crate::api::Method;
    use serde_json::json;

    fn departments() -> Vec<Department> {
        vec![
            Department { departamento_id: 11, nombre: "Central".into() },
            Department { departamento_id: 0, nombre: "Asunción".into() },
        ]
    }

    #[test]
    fn department_change_clears_children_and_locks_city() {
        let mut c = LocationCascade::from_names("Central", "Luque", "Centro");
        c.cities_loaded("Central");
        c.neighborhoods_loaded("Luque");
        assert!(c.city_enabled());
        assert!(c.neighborhood_enabled());

        c.set_department("Asunción");
        assert_eq!((c.ciudad.as_str(), c.barrio.as_str()), ("", ""));
        assert!(!c.city_enabled());
        assert!(!c.neighborhood_enabled());

        c.cities_loaded("Asunción");
        assert!(c.city_enabled());
    }

    #[test]
    fn stale_city_list_is_ignored() {
        let mut c = LocationCascade::default();
        c.set_department("Central");
        c.set_department("Asunción");
        c.cities_loaded("Central");
        assert!(!c.city_enabled());
    }

    #[test]
    fn city_change_clears_only_neighborhood() {
        let mut c = LocationCascade::from_names("Central", "Luque", "Centro");
        c.set_city("San Lorenzo");
        assert_eq!(c.departamento, "Central");
        assert_eq!(c.barrio, "");
    }

    #[test]
    fn reselecting_same_department_keeps_state() {
        let mut c = LocationCascade::from_names("Central", "Luque", "");
        c.cities_loaded("Central");
        c.set_department("Central");
        assert_eq!(c.ciudad, "Luque");
        assert!(c.city_enabled());
    }

    #[test]
    fn no_department_means_disabled() {
        let mut c = LocationCascade::default();
        c.cities_loaded("");
        assert!(!c.city_enabled());
    }

    #[tokio::test]
    async fn fetch_is_keyed_on_department_id() {
        let api = ApiClient::new(
            RecordingTransport::new().respond(json!({"items": [{"ciudad_id": 3, "nombre": "Luque"}]})),
        );
        let cities = load_cities(&api, &departments(), "Central").await.unwrap();
        assert_eq!(cities[0].ciudad_id, 3);
        assert_eq!(api.transport().calls(), vec![(Method::Get, "/ubicaciones/departamentos/11/ciudades".to_string())]);

        let none = load_cities(&api, &departments(), "Itapúa").await.unwrap();
        assert!(none.is_empty());
        assert_eq!(api.transport().calls().len(), 1);
    }
}
