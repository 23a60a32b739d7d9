//! Current-session read model.
//!
//! The logged-in user, the programs they may open and the selected
//! company/branch. The user survives reloads through a [`SessionStore`];
//! everything else is re-read from `/auth/me` on restore.
use leptos::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{info, warn};

use crate::api::{ApiClient, Transport};
use crate::error::ApiError;
use crate::models::{BranchAccess, CompanyAccess, Program, User};

pub const KEY_USER: &str = "usuario";
pub const KEY_PROGRAMS: &str = "programas";
pub const KEY_COMPANY: &str = "empresa_activa";
pub const KEY_BRANCH: &str = "sucursal_activa";

pub const MISSING_CREDENTIALS: &str = "Por favor ingrese usuario y contraseña";

pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    /// `Err` carries why the slot could not be cleared.
    fn remove(&self, key: &str) -> Result<(), &'static str>;
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    slots: Rc<RefCell<HashMap<String, String>>>,
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.slots.borrow_mut().insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) -> Result<(), &'static str> {
        self.slots.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub type AppStore = crate::storage::BrowserStore;
#[cfg(not(target_arch = "wasm32"))]
pub type AppStore = MemoryStore;

fn save<S: SessionStore, T: Serialize>(store: &S, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(s) => store.set(key, &s),
        Err(e) => warn!(key, error = %e, "could not persist session slot"),
    }
}

fn clear<S: SessionStore>(store: &S, key: &str) {
    if let Err(reason) = store.remove(key) {
        warn!(key, reason, "could not clear session slot");
    }
}

fn load<S: SessionStore, T: DeserializeOwned>(store: &S, key: &str) -> Option<T> {
    store.get(key).and_then(|raw| serde_json::from_str(&raw).ok())
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub programs: Vec<Program>,
    pub companies: Vec<CompanyAccess>,
    pub active_company: Option<CompanyAccess>,
    pub active_branch: Option<BranchAccess>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_superadmin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.es_superadmin.is_yes())
    }

    pub fn can_access(&self, program: &str) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        self.is_superadmin() || self.programs.iter().any(|p| p.codigo == program)
    }

    pub fn context_ready(&self) -> bool {
        self.active_company.is_some() && self.active_branch.is_some()
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user.as_ref().map(|u| u.usuario_id)
    }

    pub fn company_id(&self) -> Option<i64> {
        self.active_company.as_ref().map(|c| c.empresa_id)
    }

    pub fn branch_id(&self) -> Option<i64> {
        self.active_branch.as_ref().map(|b| b.sucursal_id)
    }

    /// Switching company always drops the selected branch.
    pub fn select_company<S: SessionStore>(&mut self, store: &S, company: Option<CompanyAccess>) {
        match &company {
            Some(c) => {
                save(store, KEY_COMPANY, c);
                if !c.programas.is_empty() {
                    self.programs = c.programas.clone();
                    save(store, KEY_PROGRAMS, &self.programs);
                }
            }
            None => clear(store, KEY_COMPANY),
        }
        self.active_company = company;
        self.active_branch = None;
        clear(store, KEY_BRANCH);
    }

    pub fn select_branch<S: SessionStore>(&mut self, store: &S, branch: Option<BranchAccess>) {
        match &branch {
            Some(b) => save(store, KEY_BRANCH, b),
            None => clear(store, KEY_BRANCH),
        }
        self.active_branch = branch;
    }
}

/// Splits an `/auth/me` body into user, programs and companies.
pub fn parse_profile(body: Value) -> Result<Session, ApiError> {
    let Value::Object(mut map) = body else {
        return Err(ApiError::Unknown("No se encontraron datos del usuario".into()));
    };
    if !map.contains_key("usuario_id") {
        return Err(ApiError::Unknown("No se encontraron datos del usuario".into()));
    }
    let programs: Vec<Program> = match map.remove("programas") {
        Some(v @ Value::Array(_)) => serde_json::from_value(v)?,
        _ => Vec::new(),
    };
    let companies: Vec<CompanyAccess> = match map.remove("empresas") {
        Some(v @ Value::Array(_)) => serde_json::from_value(v)?,
        _ => Vec::new(),
    };
    let user: User = serde_json::from_value(Value::Object(map))?;
    Ok(Session { user: Some(user), programs, companies, ..Default::default() })
}

pub async fn load_profile<T: Transport, S: SessionStore>(
    api: &ApiClient<T>,
    store: &S,
    usuario_id: i64,
) -> Result<Session, ApiError> {
    let mut session = parse_profile(api.me(usuario_id).await?)?;
    if let Some(user) = &session.user {
        save(store, KEY_USER, user);
    }
    save(store, KEY_PROGRAMS, &session.programs);

    if session.companies.len() == 1 {
        let only = session.companies[0].clone();
        session.select_company(store, Some(only));
    }
    Ok(session)
}

pub async fn login<T: Transport, S: SessionStore>(
    api: &ApiClient<T>,
    store: &S,
    username: &str,
    password: &str,
) -> Result<Session, ApiError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(ApiError::Rejected(MISSING_CREDENTIALS.into()));
    }
    let result = api.login(username, password).await?;
    let Some(usuario_id) = result.usuario_id else {
        return Err(ApiError::Unknown("respuesta de login sin usuario".into()));
    };
    info!(usuario_id, "login ok");
    load_profile(api, store, usuario_id).await
}

/// Rebuilds the session from storage. Any failure logs out.
pub async fn restore<T: Transport, S: SessionStore>(api: &ApiClient<T>, store: &S) -> Session {
    let Some(stored) = load::<S, User>(store, KEY_USER) else {
        return Session::default();
    };
    let company: Option<CompanyAccess> = load(store, KEY_COMPANY);
    let branch: Option<BranchAccess> = load(store, KEY_BRANCH);

    match load_profile(api, store, stored.usuario_id).await {
        Ok(mut session) => {
            if let Some(c) = company {
                session.select_company(store, Some(c));
            }
            if let Some(b) = branch {
                session.select_branch(store, Some(b));
            }
            session
        }
        Err(e) => {
            warn!(error = %e, "session restore failed");
            logout(store);
            Session::default()
        }
    }
}

pub fn logout<S: SessionStore>(store: &S) {
    for key in [KEY_USER, KEY_PROGRAMS, KEY_COMPANY, KEY_BRANCH] {
        clear(store, key);
    }
}

/// Session state shared through context.
#[derive(Clone)]
pub struct SessionContext {
    pub session: RwSignal<Session>,
    pub loading: RwSignal<bool>,
    pub store: AppStore,
}

impl SessionContext {
    pub fn new(store: AppStore) -> Self {
        Self { session: create_rw_signal(Session::default()), loading: create_rw_signal(true), store }
    }

    pub fn select_company(&self, company: Option<CompanyAccess>) {
        let store = self.store.clone();
        self.session.update(|s| s.select_company(&store, company));
    }

    pub fn select_branch(&self, branch: Option<BranchAccess>) {
        let store = self.store.clone();
        self.session.update(|s| s.select_branch(&store, branch));
    }

    pub fn logout(&self) {
        logout(&self.store);
        self.session.set(Session::default());
    }
}

pub fn use_session() -> SessionContext {
    expect_context::<SessionContext>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::RecordingTransport;
    use crate::api::Method;
    use crate::models::Flag;
    use serde_json::json;

    fn profile(empresas: Value) -> Value {
        json!({
            "usuario_id": 5,
            "username": "admin",
            "nombre": "Ana",
            "es_superadmin": "N",
            "programas": [{"codigo": "PACIENTES"}],
            "empresas": empresas
        })
    }

    fn company(id: i64, programs: Value) -> Value {
        json!({"empresa_id": id, "nombre": format!("Empresa {}", id), "programas": programs})
    }

    #[tokio::test]
    async fn blank_credentials_never_hit_the_network() {
        let api = ApiClient::new(RecordingTransport::new());
        let store = MemoryStore::default();
        let err = login(&api, &store, "  ", "x").await.unwrap_err();
        assert_eq!(err, ApiError::Rejected(MISSING_CREDENTIALS.into()));
        assert!(api.transport().calls().is_empty());
    }

    #[tokio::test]
    async fn rejected_login_surfaces_server_message() {
        let api = ApiClient::new(
            RecordingTransport::new().respond(json!({"resultado": 0, "mensaje": "Usuario bloqueado"})),
        );
        let err = login(&api, &MemoryStore::default(), "ana", "pw").await.unwrap_err();
        assert_eq!(err.user_message("x"), "Usuario bloqueado");
    }

    #[tokio::test]
    async fn login_loads_profile_and_autoselects_single_company() {
        let api = ApiClient::new(
            RecordingTransport::new()
                .respond(json!({"resultado": 1, "mensaje": "ok", "usuario_id": 5}))
                .respond(json!({"items": [profile(json!([company(2, json!([{"codigo": "COMPRAS"}]))]))]})),
        );
        let store = MemoryStore::default();
        let session = login(&api, &store, "admin", "pw").await.unwrap();

        assert_eq!(session.user_id(), Some(5));
        assert_eq!(session.company_id(), Some(2));
        assert!(session.can_access("COMPRAS"));
        assert!(!session.can_access("PACIENTES"));
        assert!(!session.context_ready());
        assert!(store.get(KEY_USER).is_some());
        assert!(store.get(KEY_COMPANY).is_some());
        assert_eq!(api.transport().calls()[1], (Method::Get, "/facturas/auth/me/5".to_string()));
    }

    #[tokio::test]
    async fn restore_reapplies_company_and_branch() {
        let store = MemoryStore::default();
        store.set(KEY_USER, r#"{"usuario_id":5,"username":"admin","nombre":"Ana"}"#);
        store.set(KEY_COMPANY, r#"{"empresa_id":3,"nombre":"Sur"}"#);
        store.set(KEY_BRANCH, r#"{"sucursal_id":9,"nombre":"Centro"}"#);

        let api = ApiClient::new(RecordingTransport::new().respond(profile(json!([company(3, json!([])), company(4, json!([]))]))));
        let session = restore(&api, &store).await;
        assert_eq!(session.company_id(), Some(3));
        assert_eq!(session.branch_id(), Some(9));
        assert!(session.context_ready());
    }

    #[tokio::test]
    async fn failed_restore_clears_storage() {
        let store = MemoryStore::default();
        store.set(KEY_USER, r#"{"usuario_id":5}"#);
        store.set(KEY_COMPANY, r#"{"empresa_id":3,"nombre":"Sur"}"#);
        let api = ApiClient::new(RecordingTransport::new().fail(ApiError::Transport("offline".into())));

        let session = restore(&api, &store).await;
        assert!(!session.is_authenticated());
        assert!(store.get(KEY_USER).is_none());
        assert!(store.get(KEY_COMPANY).is_none());
    }

    #[tokio::test]
    async fn restore_without_stored_user_is_anonymous() {
        let api = ApiClient::new(RecordingTransport::new());
        let session = restore(&api, &MemoryStore::default()).await;
        assert_eq!(session, Session::default());
        assert!(api.transport().calls().is_empty());
    }

    #[test]
    fn switching_company_drops_branch() {
        let store = MemoryStore::default();
        let mut s = Session { user: Some(User { usuario_id: 1, ..Default::default() }), ..Default::default() };
        s.select_company(&store, serde_json::from_value(company(1, json!([]))).ok());
        s.select_branch(&store, serde_json::from_value(json!({"sucursal_id": 2, "nombre": "A"})).ok());
        assert!(s.context_ready());

        s.select_company(&store, serde_json::from_value(company(7, json!([]))).ok());
        assert_eq!(s.branch_id(), None);
        assert!(store.get(KEY_BRANCH).is_none());
    }

    #[test]
    fn superadmin_opens_everything() {
        let s = Session {
            user: Some(User { usuario_id: 1, es_superadmin: Flag::Yes, ..Default::default() }),
            ..Default::default()
        };
        assert!(s.can_access("WHATSAPP"));
        assert!(!Session::default().can_access("WHATSAPP"));
    }

    #[test]
    fn logout_clears_every_slot() {
        let store = MemoryStore::default();
        for k in [KEY_USER, KEY_PROGRAMS, KEY_COMPANY, KEY_BRANCH] {
            store.set(k, "{}");
        }
        logout(&store);
        assert!([KEY_USER, KEY_PROGRAMS, KEY_COMPANY, KEY_BRANCH].iter().all(|k| store.get(k).is_none()));
    }

    /// Refuses to clear one key, like a blocked `localStorage`.
    struct StickyStore {
        inner: MemoryStore,
        sticky: &'static str,
        attempts: RefCell<Vec<String>>,
    }

    impl SessionStore for StickyStore {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) {
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), &'static str> {
            self.attempts.borrow_mut().push(key.to_string());
            if key == self.sticky {
                return Err("localStorage remove rejected");
            }
            self.inner.remove(key)
        }
    }

    #[test]
    fn rejected_remove_does_not_stop_logout() {
        let store = StickyStore { inner: MemoryStore::default(), sticky: KEY_PROGRAMS, attempts: RefCell::new(Vec::new()) };
        for k in [KEY_USER, KEY_PROGRAMS, KEY_COMPANY, KEY_BRANCH] {
            store.set(k, "{}");
        }
        logout(&store);
        assert_eq!(*store.attempts.borrow(), vec![KEY_USER, KEY_PROGRAMS, KEY_COMPANY, KEY_BRANCH]);
        assert!(store.get(KEY_PROGRAMS).is_some());
        assert!([KEY_USER, KEY_COMPANY, KEY_BRANCH].iter().all(|k| store.get(k).is_none()));
    }
}
