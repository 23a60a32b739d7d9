use leptos::*;
use leptos_router::*;
use tracing::warn;

use crate::app::use_api;
use crate::components::{EmptyState, ErrorState, Loading};
use crate::models::{BranchAccess, CompanyAccess};
use crate::session::use_session;

const BRANCH_ERROR: &str = "No se pudieron cargar las sucursales";

/// A lone branch is picked without asking.
fn auto_branch(branches: &[BranchAccess]) -> Option<BranchAccess> {
    match branches {
        [only] => Some(only.clone()),
        _ => None,
    }
}

#[component]
pub fn ContextSelection() -> impl IntoView {
    let api = use_api();
    let ctx = use_session();
    let navigate = use_navigate();
    let session = ctx.session;

    let branches = create_local_resource(
        move || session.with(|s| (s.user_id(), s.company_id())),
        move |(user, company)| {
            let api = api.clone();
            async move {
                match (user, company) {
                    (Some(u), Some(c)) => api.user_branches(u, c).await.map(|p| Some(p.items)),
                    _ => Ok(None),
                }
            }
        },
    );

    let go_home = {
        let navigate = navigate.clone();
        move || navigate("/", NavigateOptions { replace: true, ..Default::default() })
    };

    let pick_branch = {
        let ctx = ctx.clone();
        let go_home = go_home.clone();
        move |b: BranchAccess| {
            ctx.select_branch(Some(b));
            go_home();
        }
    };

    {
        let pick_branch = pick_branch.clone();
        create_effect(move |_| {
            if let Some(Ok(Some(list))) = branches.get() {
                if let Some(only) = auto_branch(&list) {
                    pick_branch(only);
                }
            }
        });
    }

    let pick_company = {
        let ctx = ctx.clone();
        move |c: CompanyAccess| ctx.select_company(Some(c))
    };
    let change_company = {
        let ctx = ctx.clone();
        move |_: ev::MouseEvent| ctx.select_company(None)
    };

    let companies = move || session.with(|s| s.companies.clone());
    let company_name = move || session.with(|s| s.active_company.as_ref().map(|c| c.nombre.clone()).unwrap_or_default());

    let company_step = move || {
        let list = companies();
        if list.is_empty() {
            return view! { <EmptyState message="No tiene empresas asignadas"/> }.into_view();
        }
        list.into_iter()
            .map(|c| {
                let pick_company = pick_company.clone();
                let chosen = c.clone();
                view! {
                    <button class="choice" on:click=move |_| pick_company(chosen.clone())>
                        <strong>{c.nombre.clone()}</strong>
                        <span class="muted">{c.ruc.clone().unwrap_or_default()}</span>
                        {c.es_principal.is_yes().then_some(view! { <span class="badge">"Principal"</span> })}
                    </button>
                }
            })
            .collect_view()
    };

    let branch_list = move |list: Vec<BranchAccess>| {
        if list.is_empty() {
            return view! { <EmptyState message="No tiene sucursales asignadas en esta empresa"/> }.into_view();
        }
        list.into_iter()
            .map(|b| {
                let pick_branch = pick_branch.clone();
                let chosen = b.clone();
                view! {
                    <button class="choice" on:click=move |_| pick_branch(chosen.clone())>
                        <strong>{b.nombre.clone()}</strong>
                        <span class="muted">{b.direccion.clone().unwrap_or_default()}</span>
                        <span class="muted">{b.ciudad.clone().unwrap_or_else(|| "N/A".into())}</span>
                        {b.es_principal.is_yes().then_some(view! { <span class="badge">"Principal"</span> })}
                    </button>
                }
            })
            .collect_view()
    };

    let branch_step = move || {
        let change_company = change_company.clone();
        let branch_list = branch_list.clone();
        view! {
            <div class="context-current">
                <span>"Empresa: "<strong>{company_name}</strong></span>
                {(companies().len() > 1).then(|| view! { <button class="link" on:click=change_company>"Cambiar"</button> })}
            </div>
            <p class="muted">"Establezca la conexión con la sucursal asignada para su jornada."</p>
            <Suspense fallback=|| view! { <Loading/> }>
                {
                    let branch_list = branch_list.clone();
                    move || branches.get().map(|res| match res {
                        Err(e) => {
                            warn!(error = %e, "branch list failed");
                            view! { <ErrorState message=e.user_message(BRANCH_ERROR) on_retry=move |_| branches.refetch()/> }.into_view()
                        }
                        Ok(None) => ().into_view(),
                        Ok(Some(list)) => branch_list(list),
                    })
                }
            </Suspense>
        }
    };

    view! {
        {move || (!session.with(|s| s.is_authenticated())).then(|| view! { <Redirect path="/login"/> })}
        <div class="centered-page">
            <div class="card context-card">
                <h1>"Seleccione su contexto de trabajo"</h1>
                {move || {
                    if session.with(|s| s.active_company.is_some()) {
                        branch_step().into_view()
                    } else {
                        view! {
                            <p class="muted">"Elija la empresa con la que desea trabajar."</p>
                            {company_step.clone()}
                        }
                        .into_view()
                    }
                }}
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Flag;

    fn branch(id: i64) -> BranchAccess {
        BranchAccess { sucursal_id: id, nombre: format!("S{}", id), direccion: None, ciudad: None, es_principal: Flag::No }
    }

    #[test]
    fn only_a_single_branch_is_autoselected() {
        assert_eq!(auto_branch(&[branch(1)]).map(|b| b.sucursal_id), Some(1));
        assert_eq!(auto_branch(&[branch(1), branch(2)]), None);
        assert_eq!(auto_branch(&[]), None);
    }
}
