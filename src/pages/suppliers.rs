use leptos::*;
use tracing::{error, warn};

use crate::app::use_api;
use crate::cache::use_query_client;
use crate::components::{
    bind, plain_options, use_toaster, Binding, EmptyState, ErrorState, Field, FormError, Loading, Modal, PageHeader,
    SelectField, StatusBadge,
};
use crate::locations::{load_cities, load_neighborhoods};
use crate::models::Supplier;
use crate::purchase::{CURRENCIES, PAYMENT_TERMS};
use crate::session::use_session;
use crate::suppliers::{self, SupplierForm};

fn names<T>(items: &[T], name: impl Fn(&T) -> &str) -> Vec<(String, String)> {
    items.iter().map(|i| (name(i).to_string(), name(i).to_string())).collect()
}

#[component]
pub fn SuppliersPage() -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let toaster = use_toaster();
    let session = use_session().session;

    let query = create_rw_signal(String::new());
    let form = create_rw_signal(SupplierForm::default());
    let open = create_rw_signal(false);
    let error_msg = create_rw_signal(None::<String>);
    let saving = create_rw_signal(false);

    let list = {
        let api = api.clone();
        create_local_resource(
            move || queries.version("proveedores"),
            move |_| {
                let api = api.clone();
                async move { api.suppliers(None).await.map(|p| p.items) }
            },
        )
    };

    let departments = {
        let api = api.clone();
        create_local_resource(
            move || queries.version("departamentos"),
            move |_| {
                let api = api.clone();
                async move { api.departments().await.map(|p| p.items) }
            },
        )
    };

    let department = create_memo(move |_| form.with(|f| f.location.departamento.clone()));
    let city = create_memo(move |_| form.with(|f| f.location.ciudad.clone()));

    let cities = {
        let api = api.clone();
        create_local_resource(
            move || (department.get(), departments.get().and_then(Result::ok).unwrap_or_default()),
            move |(name, deps)| {
                let api = api.clone();
                async move {
                    let found = load_cities(&api, &deps, &name).await;
                    (name, found)
                }
            },
        )
    };

    let neighborhoods = {
        let api = api.clone();
        create_local_resource(
            move || (city.get(), cities.get().and_then(|(_, r)| r.ok()).unwrap_or_default()),
            move |(name, list)| {
                let api = api.clone();
                async move {
                    let found = load_neighborhoods(&api, &list, &name).await;
                    (name, found)
                }
            },
        )
    };

    create_effect(move |_| {
        if let Some((name, res)) = cities.get() {
            match res {
                Ok(_) => form.update(|f| f.location.cities_loaded(&name)),
                Err(e) => warn!(departamento = %name, error = %e, "city list failed"),
            }
        }
    });
    create_effect(move |_| {
        if let Some((name, res)) = neighborhoods.get() {
            match res {
                Ok(_) => form.update(|f| f.location.neighborhoods_loaded(&name)),
                Err(e) => warn!(ciudad = %name, error = %e, "neighborhood list failed"),
            }
        }
    });

    let department_options = Signal::derive(move || {
        departments.get().and_then(Result::ok).map(|d| names(&d, |x| x.nombre.as_str())).unwrap_or_default()
    });
    let city_options = Signal::derive(move || {
        cities.get().and_then(|(_, r)| r.ok()).map(|c| names(&c, |x| x.nombre.as_str())).unwrap_or_default()
    });
    let neighborhood_options = Signal::derive(move || {
        neighborhoods.get().and_then(|(_, r)| r.ok()).map(|b| names(&b, |x| x.nombre.as_str())).unwrap_or_default()
    });

    let department_bind = Binding {
        value: department.into(),
        set: Callback::new(move |v: String| form.update(|f| f.location.set_department(&v))),
    };
    let city_bind = Binding {
        value: city.into(),
        set: Callback::new(move |v: String| form.update(|f| f.location.set_city(&v))),
    };
    let neighborhood_bind = Binding {
        value: Signal::derive(move || form.with(|f| f.location.barrio.clone())),
        set: Callback::new(move |v: String| form.update(|f| f.location.set_neighborhood(&v))),
    };

    let open_form = move |initial: SupplierForm| {
        form.set(initial);
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
            let current = form.get_untracked();
            if let Err(msg) = current.validate() {
                error_msg.set(Some(msg.to_string()));
                return;
            }
            saving.set(true);
            let api = api.clone();
            let usuario = session.with_untracked(|s| s.user_id());
            spawn_local(async move {
                match suppliers::save(&api, &current, usuario).await {
                    Ok(res) => {
                        open.set(false);
                        queries.invalidate("proveedores");
                        toaster.success(res.message.unwrap_or_else(|| "Proveedor guardado correctamente".into()));
                    }
                    Err(e) => {
                        error!(error = %e, "supplier save failed");
                        error_msg.set(Some(e.user_message(suppliers::SAVE_ERROR)));
                    }
                }
                saving.set(false);
            });
        })
    };

    let toggle = Callback::new(move |s: Supplier| {
        let api = api.clone();
        let usuario = session.with_untracked(|s| s.user_id());
        spawn_local(async move {
            match suppliers::toggle(&api, &s, usuario).await {
                Ok(_) => {
                    queries.invalidate("proveedores");
                    toaster.success("Estado actualizado");
                }
                Err(e) => toaster.error(e.user_message(crate::companies::TOGGLE_ERROR)),
            }
        });
    });

    let table = move |rows: Vec<Supplier>| {
        view! {
            <table class="table">
                <thead>
                    <tr>
                        <th>"Proveedor"</th>
                        <th>"RUC"</th>
                        <th>"Contacto"</th>
                        <th>"Ubicación"</th>
                        <th>"Estado"</th>
                        <th></th>
                    </tr>
                </thead>
                <tbody>
                    {rows.into_iter().map(|s| {
                        let for_edit = SupplierForm::from(&s);
                        let for_toggle = s.clone();
                        let active = s.activo.is_yes();
                        view! {
                            <tr>
                                <td><strong>{s.nombre.clone()}</strong><br/><span class="muted">{s.email.clone().unwrap_or_default()}</span></td>
                                <td>{s.ruc.clone().unwrap_or_default()}</td>
                                <td>{s.nombre_contacto.clone().unwrap_or_default()}<br/><span class="muted">{s.telefono.clone().unwrap_or_default()}</span></td>
                                <td>{suppliers::location_line(&s)}</td>
                                <td><StatusBadge activo=s.activo/></td>
                                <td class="actions">
                                    <button class="btn-icon" on:click=move |_| open_form(for_edit.clone())>"Editar"</button>
                                    <button class="btn-icon" on:click=move |_| toggle.call(for_toggle.clone())>
                                        {if active { "Desactivar" } else { "Activar" }}
                                    </button>
                                </td>
                            </tr>
                        }
                    }).collect_view()}
                </tbody>
            </table>
        }
    };

    view! {
        <div class="page">
            <PageHeader title="Proveedores" subtitle="Catálogo de proveedores de insumos">
                <button class="btn btn-primary" on:click=move |_| open_form(SupplierForm::default())>"+ Nuevo Proveedor"</button>
            </PageHeader>
            <div class="card">
                <input
                    class="search"
                    type="search"
                    placeholder="Buscar por nombre, RUC o contacto..."
                    prop:value=move || query.get()
                    on:input=move |ev| query.set(event_target_value(&ev))
                />
                <Suspense fallback=|| view! { <Loading/> }>
                    {
                        move || list.get().map(|res| match res {
                            Err(e) => view! {
                                <ErrorState message=e.user_message("Error al cargar proveedores") on_retry=move |_| list.refetch()/>
                            }.into_view(),
                            Ok(all) => {
                                let rows: Vec<Supplier> = suppliers::filter(&all, &query.get()).into_iter().cloned().collect();
                                if rows.is_empty() {
                                    view! { <EmptyState message="No se encontraron proveedores"/> }.into_view()
                                } else {
                                    table(rows).into_view()
                                }
                            }
                        })
                    }
                </Suspense>
            </div>

            <Show when=move || open.get()>
                <Modal
                    title={if form.with_untracked(|f| f.proveedor_id.is_some()) { "Editar Proveedor" } else { "Nuevo Proveedor" }}
                    on_close=move |_| open.set(false)
                >
                    <form class="form" on:submit=move |ev| save.call(ev)>
                        <FormError message=error_msg/>
                        <div class="form-grid">
                            <Field label="Nombre" bind=bind!(form, nombre) required=true/>
                            <Field label="RUC" bind=bind!(form, ruc)/>
                            <Field label="Contacto" bind=bind!(form, nombre_contacto)/>
                            <Field label="Teléfono" kind="tel" bind=bind!(form, telefono)/>
                            <Field label="Email" kind="email" bind=bind!(form, email)/>
                            <Field label="Dirección" bind=bind!(form, direccion)/>
                            <SelectField label="Departamento" options=department_options bind=department_bind placeholder="Seleccione"/>
                            <SelectField
                                label="Ciudad"
                                options=city_options
                                bind=city_bind
                                placeholder="Seleccione"
                                disabled=Signal::derive(move || !form.with(|f| f.location.city_enabled()))
                            />
                            <SelectField
                                label="Barrio"
                                options=neighborhood_options
                                bind=neighborhood_bind
                                placeholder="Seleccione"
                                disabled=Signal::derive(move || !form.with(|f| f.location.neighborhood_enabled()))
                            />
                            <Field label="País" bind=bind!(form, pais)/>
                            <SelectField label="Condiciones de pago" options=plain_options(&PAYMENT_TERMS) bind=bind!(form, condiciones_pago) placeholder="Seleccione"/>
                            <SelectField label="Moneda" options=plain_options(&CURRENCIES) bind=bind!(form, moneda)/>
                        </div>
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Department;

    #[test]
    fn options_use_names_as_values() {
        let deps = vec![Department { departamento_id: 1, nombre: "Central".into() }];
        assert_eq!(names(&deps, |d| d.nombre.as_str()), vec![("Central".to_string(), "Central".to_string())]);
    }
}
