use leptos::*;
use leptos_router::*;
use tracing::error;

use crate::app::use_api;
use crate::cache::use_query_client;
use crate::companies::{self, BranchForm, CompanyForm, Counters};
use crate::components::{bind, use_toaster, EmptyState, ErrorState, Field, FormError, Loading, Modal, PageHeader, StatCard, StatusBadge};
use crate::models::{Branch, Company, Flag};
use crate::session::use_session;

use super::parse_id;

fn counter_signals(counters: Signal<Option<Counters>>) -> [Signal<String>; 3] {
    let read = move |pick: fn(&Counters) -> String| {
        Signal::derive(move || counters.get().map(|c| pick(&c)).unwrap_or_else(|| "-".into()))
    };
    [
        read(|c| format!("{} / {}", c.active, c.total)),
        read(|c| c.branches.to_string()),
        read(|c| c.users.to_string()),
    ]
}

#[component]
pub fn CompaniesPage() -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let toaster = use_toaster();
    let session = use_session().session;

    let form = create_rw_signal(CompanyForm::default());
    let open = create_rw_signal(false);
    let error_msg = create_rw_signal(None::<String>);
    let saving = create_rw_signal(false);

    let list = {
        let api = api.clone();
        create_local_resource(
            move || queries.version("empresas"),
            move |_| {
                let api = api.clone();
                async move { api.list_companies().await.map(|p| p.items) }
            },
        )
    };
    let counters = Signal::derive(move || list.get().and_then(Result::ok).map(|l| companies::company_counters(&l)));
    let [active, branches, users] = counter_signals(counters);

    let save = {
        let api = api.clone();
        Callback::new(move |ev: ev::SubmitEvent| {
            ev.prevent_default();
            if saving.get_untracked() {
                return;
            }
            let current = form.get_untracked();
            if let Err(msg) = current.validate() {
                error_msg.set(Some(msg.to_string()));
                return;
            }
            saving.set(true);
            let api = api.clone();
            let usuario = session.with_untracked(|s| s.user_id());
            spawn_local(async move {
                match companies::create_company(&api, &current, usuario).await {
                    Ok(res) => {
                        open.set(false);
                        queries.invalidate("empresas");
                        toaster.success(res.mensaje.unwrap_or_else(|| "Empresa creada correctamente".into()));
                    }
                    Err(e) => {
                        error!(error = %e, "company create failed");
                        error_msg.set(Some(e.user_message(companies::COMPANY_SAVE_ERROR)));
                    }
                }
                saving.set(false);
            });
        })
    };

    let toggle = Callback::new(move |c: Company| {
        let api = api.clone();
        let usuario = session.with_untracked(|s| s.user_id());
        spawn_local(async move {
            match companies::toggle_company(&api, &c, usuario).await {
                Ok(res) => {
                    queries.invalidate("empresas");
                    toaster.success(res.mensaje.unwrap_or_else(|| "Estado actualizado".into()));
                }
                Err(e) => {
                    error!(empresa_id = c.empresa_id, error = %e, "company toggle failed");
                    toaster.error(e.user_message(companies::TOGGLE_ERROR));
                }
            }
        });
    });

    view! {
        <div class="page">
            <PageHeader title="Empresas" subtitle="Unidades de negocio registradas">
                <button class="btn btn-primary" on:click=move |_| {
                    form.set(CompanyForm::default());
                    error_msg.set(None);
                    open.set(true);
                }>"+ Nueva Empresa"</button>
            </PageHeader>
            <div class="stats-grid">
                <StatCard label="Empresas operativas" value=active accent="blue"/>
                <StatCard label="Sucursales" value=branches accent="green"/>
                <StatCard label="Usuarios" value=users accent="amber"/>
            </div>
            <div class="card">
                <Suspense fallback=|| view! { <Loading/> }>
                    {
                        move || list.get().map(|res| match res {
                            Err(e) => view! { <ErrorState message=e.user_message("Error al cargar empresas") on_retry=move |_| list.refetch()/> }.into_view(),
                            Ok(rows) if rows.is_empty() => view! { <EmptyState message="No hay empresas registradas"/> }.into_view(),
                            Ok(rows) => {
                                                                view! {
                                    <table class="table">
                                        <thead>
                                            <tr>
                                                <th>"Razón social"</th>
                                                <th>"RUC"</th>
                                                <th>"Contacto"</th>
                                                <th class="num">"Sucursales"</th>
                                                <th class="num">"Usuarios"</th>
                                                <th>"Estado"</th>
                                                <th></th>
                                            </tr>
                                        </thead>
                                        <tbody>
                                            {rows.into_iter().map(|c| {
                                                                                                let target = c.clone();
                                                let active = c.activo.is_yes();
                                                view! {
                                                    <tr>
                                                        <td>
                                                            <strong>{c.razon_social.clone()}</strong><br/>
                                                            <span class="muted">{c.nombre_comercial.clone().unwrap_or_default()}</span>
                                                        </td>
                                                        <td>{c.ruc.clone().unwrap_or_default()}</td>
                                                        <td>{c.telefono.clone().unwrap_or_default()}<br/><span class="muted">{c.email.clone().unwrap_or_default()}</span></td>
                                                        <td class="num">{c.total_sucursales}</td>
                                                        <td class="num">{c.total_usuarios}</td>
                                                        <td><StatusBadge activo=c.activo labels=companies::STATUS_LABELS/></td>
                                                        <td class="actions">
                                                            <A href=format!("/configuraciones/sucursales?empresa_id={}", c.empresa_id) class="btn-icon">"Sucursales"</A>
                                                            <button class="btn-icon" on:click=move |_| toggle.call(target.clone())>
                                                                {if active { "Desactivar" } else { "Activar" }}
                                                            </button>
                                                        </td>
                                                    </tr>
                                                }
                                            }).collect_view()}
                                        </tbody>
                                    </table>
                                }.into_view()
                            }
                        })
                    }
                </Suspense>
            </div>

            <Show when=move || open.get()>
                <Modal title="Nueva Empresa" on_close=move |_| open.set(false)>
                    <form class="form" on:submit=move |ev| save.call(ev)>
                        <FormError message=error_msg/>
                        <div class="form-grid">
                            <Field label="Razón social" bind=bind!(form, razon_social) required=true/>
                            <Field label="Nombre comercial" bind=bind!(form, nombre_comercial) required=true/>
                            <Field label="RUC" bind=bind!(form, ruc) required=true/>
                            <Field label="Dirección" bind=bind!(form, direccion)/>
                            <Field label="Teléfono" kind="tel" bind=bind!(form, telefono)/>
                            <Field label="Email" kind="email" bind=bind!(form, email)/>
                        </div>
                        <div class="form-actions">
                            <button type="button" class="btn btn-secondary" on:click=move |_| open.set(false)>"Cancelar"</button>
                            <button type="submit" class="btn btn-primary" prop:disabled=move || saving.get()>
                                {move || if saving.get() { "Guardando..." } else { "Crear Empresa" }}
                            </button>
                        </div>
                    </form>
                </Modal>
            </Show>
        </div>
    }
}

#[component]
pub fn BranchesPage() -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let toaster = use_toaster();
    let session = use_session().session;
    let query = use_query_map();

    // `?empresa_id=` from the companies screen, else the active company.
    let empresa = move || {
        parse_id(query.with(|q| q.get("empresa_id").cloned())).or_else(|| session.with(|s| s.company_id()))
    };

    let form = create_rw_signal(BranchForm::default());
    let editing = create_rw_signal(None::<i64>);
    let open = create_rw_signal(false);
    let error_msg = create_rw_signal(None::<String>);
    let saving = create_rw_signal(false);

    let list = {
        let api = api.clone();
        create_local_resource(
            move || {
                let id = empresa();
                (id, queries.version(&format!("sucursales/{}", id.unwrap_or_default())))
            },
            move |(empresa, _)| {
                let api = api.clone();
                async move {
                    match empresa {
                        Some(id) => api.list_branches(id).await.map(|p| p.items),
                        None => Ok(Vec::new()),
                    }
                }
            },
        )
    };
    let counters = Signal::derive(move || list.get().and_then(Result::ok).map(|l| companies::branch_counters(&l)));
    let [active, total, users] = counter_signals(counters);

    let open_form = move |branch: Option<Branch>| {
        form.set(branch.as_ref().map(BranchForm::from).unwrap_or_default());
        editing.set(branch.map(|b| b.sucursal_id));
        error_msg.set(None);
        open.set(true);
    };

    let save = {
        let api = api.clone();
        Callback::new(move |ev: ev::SubmitEvent| {
            ev.prevent_default();
            if saving.get_untracked() {
                return;
            }
            let Some(empresa_id) = empresa() else {
                error_msg.set(Some("Seleccione una empresa".into()));
                return;
            };
            let current = form.get_untracked();
            if let Err(msg) = current.validate() {
                error_msg.set(Some(msg.to_string()));
                return;
            }
            saving.set(true);
            let api = api.clone();
            let sucursal = editing.get_untracked();
            let usuario = session.with_untracked(|s| s.user_id());
            spawn_local(async move {
                match companies::save_branch(&api, sucursal, empresa_id, &current, usuario).await {
                    Ok(res) => {
                        open.set(false);
                        queries.invalidate("sucursales");
                        queries.invalidate("empresas");
                        toaster.success(res.mensaje.unwrap_or_else(|| "Sucursal guardada correctamente".into()));
                    }
                    Err(e) => {
                        error!(error = %e, "branch save failed");
                        error_msg.set(Some(e.user_message(companies::BRANCH_SAVE_ERROR)));
                    }
                }
                saving.set(false);
            });
        })
    };

    let toggle = Callback::new(move |b: Branch| {
        let api = api.clone();
        let usuario = session.with_untracked(|s| s.user_id());
        spawn_local(async move {
            match companies::toggle_branch(&api, &b, usuario).await {
                Ok(res) => {
                    queries.invalidate("sucursales");
                    toaster.success(res.mensaje.unwrap_or_else(|| "Estado actualizado".into()));
                }
                Err(e) => {
                    error!(sucursal_id = b.sucursal_id, error = %e, "branch toggle failed");
                    toaster.error(e.user_message(companies::TOGGLE_ERROR));
                }
            }
        });
    });

    view! {
        <div class="page">
            <PageHeader title="Sucursales" subtitle="Locales de atención de la empresa">
                <A href="/configuraciones/empresas" class="btn btn-secondary">"Empresas"</A>
                <button class="btn btn-primary" on:click=move |_| open_form(None)>"+ Nueva Sucursal"</button>
            </PageHeader>
            <div class="stats-grid">
                <StatCard label="Sucursales operativas" value=active accent="blue"/>
                <StatCard label="Total" value=total accent="green"/>
                <StatCard label="Usuarios" value=users accent="amber"/>
            </div>
            <div class="card">
                <Suspense fallback=|| view! { <Loading/> }>
                    {
                        move || list.get().map(|res| match res {
                            Err(e) => view! { <ErrorState message=e.user_message("Error al cargar sucursales") on_retry=move |_| list.refetch()/> }.into_view(),
                            Ok(rows) if rows.is_empty() => view! { <EmptyState message="No hay sucursales registradas"/> }.into_view(),
                            Ok(rows) => rows.into_iter().map(|b| {
                                                                let target = b.clone();
                                let for_edit = b.clone();
                                let active = b.activo.is_yes();
                                view! {
                                    <div class="card branch-card">
                                        <div class="card-header">
                                            <h3>{b.nombre.clone()}</h3>
                                            {b.es_principal.is_yes().then_some(view! { <span class="badge">"Principal"</span> })}
                                            <StatusBadge activo=b.activo labels=companies::STATUS_LABELS/>
                                        </div>
                                        <p class="muted">{b.direccion.clone().unwrap_or_default()}</p>
                                        <p class="muted">{b.ciudad.clone().unwrap_or_default()}</p>
                                        <p>{b.telefono.clone().unwrap_or_default()}" "{b.email.clone().unwrap_or_default()}</p>
                                        <p class="muted">{format!("{} usuarios", b.total_usuarios)}</p>
                                        <div class="actions">
                                            <button class="btn-icon" on:click=move |_| open_form(Some(for_edit.clone()))>"Editar"</button>
                                            <button class="btn-icon" on:click=move |_| toggle.call(target.clone())>
                                                {if active { "Desactivar" } else { "Activar" }}
                                            </button>
                                        </div>
                                    </div>
                                }
                            }).collect_view(),
                        })
                    }
                </Suspense>
            </div>

            <Show when=move || open.get()>
                <Modal
                    title={if editing.get_untracked().is_some() { "Editar Sucursal" } else { "Nueva Sucursal" }}
                    on_close=move |_| open.set(false)
                >
                    <form class="form" on:submit=move |ev| save.call(ev)>
                        <FormError message=error_msg/>
                        <div class="form-grid">
                            <Field label="Nombre" bind=bind!(form, nombre) required=true/>
                            <Field label="Dirección" bind=bind!(form, direccion)/>
                            <Field label="Ciudad" bind=bind!(form, ciudad)/>
                            <Field label="Teléfono" kind="tel" bind=bind!(form, telefono)/>
                            <Field label="Email" kind="email" bind=bind!(form, email)/>
                        </div>
                        {move || editing.get().is_none().then(|| view! {
                            <label class="checkbox">
                                <input
                                    type="checkbox"
                                    prop:checked=move || form.with(|f| f.es_principal.is_yes())
                                    on:change=move |ev| form.update(|f| f.es_principal = Flag::from(event_target_checked(&ev)))
                                />
                                " Sucursal principal"
                            </label>
                        })}
                        <div class="form-actions">
                            <button type="button" class="btn btn-secondary" on:click=move |_| open.set(false)>"Cancelar"</button>
                            <button type="submit" class="btn btn-primary" prop:disabled=move || saving.get()>
                                {move || if saving.get() { "Guardando..." } else { "Guardar" }}
                            </button>
                        </div>
                    </form>
                </Modal>
            </Show>
        </div>
    }
}
