//! Application shell: shared context, routes, layout and access guards.
use leptos::*;
use leptos_router::*;
use tracing::info;

use crate::api::{ApiClient, HttpTransport};
use crate::cache::QueryClient;
use crate::components::{Loading, ToastOutlet, Toaster};
use crate::config::{page_origin, AppConfig};
use crate::pages::*;
use crate::session::{self, use_session, AppStore, SessionContext};

pub type Api = ApiClient<HttpTransport>;

pub fn use_api() -> Api {
    expect_context::<Api>()
}

pub fn use_config() -> AppConfig {
    use_context::<AppConfig>().unwrap_or_default()
}

pub struct MenuItem {
    pub name: &'static str,
    pub path: &'static str,
    pub program: &'static str,
}

pub const MENU: [MenuItem; 6] = [
    MenuItem { name: "Inicio", path: "/", program: "DASHBOARD" },
    MenuItem { name: "Pacientes", path: "/pacientes", program: "PACIENTES" },
    MenuItem { name: "Compras", path: "/compras/facturas", program: "COMPRAS" },
    MenuItem { name: "Reportes", path: "/reportes", program: "REPORTES" },
    MenuItem { name: "WhatsApp", path: "/whatsapp", program: "WHATSAPP" },
    MenuItem { name: "Configuraciones", path: "/configuraciones/empresas", program: "CONFIGURACIONES" },
];

/// Where a visitor goes when the route is not open to them.
pub fn guard_redirect(s: &session::Session, program: Option<&str>) -> Option<&'static str> {
    if !s.is_authenticated() {
        Some("/login")
    } else if !s.context_ready() {
        Some("/seleccion-contexto")
    } else if program.is_some_and(|p| !s.can_access(p)) {
        Some("/sin-acceso")
    } else {
        None
    }
}

#[component]
pub fn App(config: AppConfig) -> impl IntoView {
    let api: Api = ApiClient::new(HttpTransport::new(config.resolved_base(&page_origin())));
    info!(base = %config.api_base_url, dev_fallback = config.dev_fallback, "console starting");

    let ctx = SessionContext::new(AppStore::default());
    provide_context(api.clone());
    provide_context(config);
    provide_context(QueryClient::new());
    provide_context(Toaster::new());
    provide_context(ctx.clone());

    spawn_local(async move {
        let restored = session::restore(&api, &ctx.store).await;
        ctx.session.set(restored);
        ctx.loading.set(false);
    });

    view! {
        <Router>
            <ToastOutlet/>
            <Routes>
                <Route path="/login" view=LoginPage/>
                <Route path="/seleccion-contexto" view=ContextSelection/>
                <Route path="/sin-acceso" view=NoAccess/>
                <Route path="/" view=Layout>
                    <Route path="" view=|| view! { <Guard program="DASHBOARD"><Dashboard/></Guard> }/>
                    <Route path="pacientes" view=|| view! { <Guard program="PACIENTES"><PatientList/></Guard> }/>
                    <Route path="pacientes/nuevo" view=|| view! { <Guard program="PACIENTES"><PatientFormPage/></Guard> }/>
                    <Route path="pacientes/editar/:id" view=|| view! { <Guard program="PACIENTES"><PatientFormPage/></Guard> }/>
                    <Route path="pacientes/detalle/:id" view=|| view! { <Guard program="PACIENTES"><PatientDetail/></Guard> }/>
                    <Route path="compras" view=|| view! { <Redirect path="/compras/facturas"/> }/>
                    <Route path="compras/facturas" view=|| view! { <Guard program="COMPRAS"><PurchaseList/></Guard> }/>
                    <Route path="compras/facturas/nueva" view=|| view! { <Guard program="COMPRAS"><NewPurchase/></Guard> }/>
                    <Route path="compras/proveedores" view=|| view! { <Guard program="COMPRAS"><SuppliersPage/></Guard> }/>
                    <Route path="compras/articulos" view=|| view! { <Guard program="COMPRAS"><ArticlesPage/></Guard> }/>
                    <Route path="compras/inventario" view=|| view! { <Guard program="COMPRAS"><InventoryPage/></Guard> }/>
                    <Route path="reportes" view=|| view! { <Guard program="REPORTES"><ReportsIndex/></Guard> }/>
                    <Route path="reportes/financiero" view=|| view! { <Guard program="REPORTES"><FinancialReport/></Guard> }/>
                    <Route path="reportes/pacientes" view=|| view! { <Guard program="REPORTES"><PatientReport/></Guard> }/>
                    <Route path="reportes/inventario" view=|| view! { <Guard program="REPORTES"><InventoryReport/></Guard> }/>
                    <Route path="whatsapp" view=|| view! { <Guard program="WHATSAPP"><WhatsAppPage/></Guard> }/>
                    <Route path="configuraciones/empresas" view=|| view! { <Guard program="CONFIGURACIONES"><CompaniesPage/></Guard> }/>
                    <Route path="configuraciones/sucursales" view=|| view! { <Guard program="CONFIGURACIONES"><BranchesPage/></Guard> }/>
                    <Route path="configuraciones/whatsapp" view=|| view! { <Guard program="CONFIGURACIONES"><WhatsAppConfigPage/></Guard> }/>
                    <Route path="*any" view=|| view! { <Redirect path="/"/> }/>
                </Route>
            </Routes>
        </Router>
    }
}

/// Renders `children` only when the session may open `program`.
#[component]
pub fn Guard(#[prop(optional)] program: Option<&'static str>, children: ChildrenFn) -> impl IntoView {
    let ctx = use_session();
    move || {
        if ctx.loading.get() {
            return view! { <Loading/> }.into_view();
        }
        match ctx.session.with(|s| guard_redirect(s, program)) {
            Some(path) => view! { <Redirect path=path/> }.into_view(),
            None => children().into_view(),
        }
    }
}

#[component]
fn Layout() -> impl IntoView {
    let ctx = use_session();
    let navigate = use_navigate();
    let menu_open = create_rw_signal(false);

    let logout = {
        let ctx = ctx.clone();
        move |_: ev::MouseEvent| {
            ctx.logout();
            navigate("/login", Default::default());
        }
    };

    let visible = {
        let ctx = ctx.clone();
        move || {
            ctx.session.with(|s| {
                MENU.iter().filter(|m| s.can_access(m.program)).map(|m| (m.name, m.path)).collect::<Vec<_>>()
            })
        }
    };

    let who = {
        let ctx = ctx.clone();
        move || ctx.session.with(|s| s.user.as_ref().map(|u| u.display_name()).unwrap_or_default())
    };
    let place = move || {
        ctx.session.with(|s| {
            let company = s.active_company.as_ref().map(|c| c.nombre.clone()).unwrap_or_default();
            let branch = s.active_branch.as_ref().map(|b| b.nombre.clone()).unwrap_or_default();
            format!("{} · {}", company, branch)
        })
    };

    view! {
        <div class="app-container">
            <aside class=move || if menu_open.get() { "sidebar open" } else { "sidebar" }>
                <div class="brand">"OdontoSys"</div>
                <nav on:click=move |_| menu_open.set(false)>
                    {move || visible().into_iter().map(|(name, path)| view! {
                        <A href=path class="nav-link" exact={path == "/"}>{name}</A>
                    }).collect_view()}
                </nav>
            </aside>
            <div class="main">
                <header class="topbar">
                    <button class="btn-icon menu-toggle" on:click=move |_| menu_open.update(|o| *o = !*o)>"☰"</button>
                    <div class="context-chip">
                        <span>{place}</span>
                        <A href="/seleccion-contexto" class="link">"Cambiar"</A>
                    </div>
                    <div class="user-chip">
                        <span>{who}</span>
                        <button class="btn btn-secondary" on:click=logout>"Salir"</button>
                    </div>
                </header>
                <main>
                    <Outlet/>
                </main>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BranchAccess, CompanyAccess, Flag, Program, User};
    use crate::session::Session;

    fn ready(programs: &[&str]) -> Session {
        Session {
            user: Some(User { usuario_id: 1, ..Default::default() }),
            programs: programs.iter().map(|c| Program { programa_id: None, codigo: c.to_string(), nombre: None }).collect(),
            companies: Vec::new(),
            active_company: Some(CompanyAccess {
                empresa_id: 1,
                nombre: "Sur".into(),
                razon_social: None,
                ruc: None,
                es_principal: Flag::Yes,
                programas: Vec::new(),
            }),
            active_branch: Some(BranchAccess { sucursal_id: 1, nombre: "Centro".into(), direccion: None, ciudad: None, es_principal: Flag::Yes }),
        }
    }

    #[test]
    fn guards_in_order() {
        assert_eq!(guard_redirect(&Session::default(), None), Some("/login"));

        let mut no_branch = ready(&["PACIENTES"]);
        no_branch.active_branch = None;
        assert_eq!(guard_redirect(&no_branch, Some("PACIENTES")), Some("/seleccion-contexto"));

        let s = ready(&["PACIENTES"]);
        assert_eq!(guard_redirect(&s, Some("PACIENTES")), None);
        assert_eq!(guard_redirect(&s, Some("COMPRAS")), Some("/sin-acceso"));
        assert_eq!(guard_redirect(&s, None), None);
    }

    #[test]
    fn menu_follows_programs() {
        let s = ready(&["DASHBOARD", "REPORTES"]);
        let visible: Vec<&str> = MENU.iter().filter(|m| s.can_access(m.program)).map(|m| m.name).collect();
        assert_eq!(visible, vec!["Inicio", "Reportes"]);
    }
}
