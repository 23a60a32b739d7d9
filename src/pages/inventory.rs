use leptos::*;
use tracing::error;

use crate::app::use_api;
use crate::cache::use_query_client;
use crate::components::{bind, parse_amount, plain_options, use_toaster, EmptyState, ErrorState, Field, FormError, Loading, Modal, PageHeader, SelectField, StatCard};
use crate::format::thousands;
use crate::inventory::{self, MovementForm, StockStatus, MOVEMENT_TYPES};
use crate::models::StockItem;
use crate::session::use_session;

const LIST_ERROR: &str = "Error al cargar el inventario";

#[component]
pub fn InventoryPage() -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let toaster = use_toaster();
    let session = use_session().session;

    let query = create_rw_signal(String::new());
    let selected = create_rw_signal(None::<StockItem>);
    let form = create_rw_signal(MovementForm { tipo_movimiento: "AJUSTE".into(), cantidad: 0.0, motivo: inventory::DEFAULT_REASON.into() });
    let error_msg = create_rw_signal(None::<String>);
    let saving = create_rw_signal(false);
    // Raw text so partial input like "0." survives re-rendering.
    let cantidad_text = create_rw_signal(String::new());

    let stock = {
        let api = api.clone();
        create_local_resource(
            move || (session.with(|s| (s.company_id(), s.branch_id())), queries.version("inventario")),
            move |((empresa, sucursal), _)| {
                let api = api.clone();
                async move {
                    match empresa {
                        Some(e) => api.stock(e, sucursal).await.map(|p| p.items),
                        None => Ok(Vec::new()),
                    }
                }
            },
        )
    };

    let counts = move |status: StockStatus| {
        Signal::derive(move || {
            stock
                .get()
                .and_then(Result::ok)
                .map(|items| {
                    items
                        .iter()
                        .filter(|i| StockStatus::of(i.on_hand(), i.cantidad_minima.unwrap_or(0.0)) == status)
                        .count()
                })
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".into())
        })
    };
    let total = Signal::derive(move || {
        stock.get().and_then(Result::ok).map(|i| i.len().to_string()).unwrap_or_else(|| "-".into())
    });

    let open_movement = move |item: StockItem| {
        form.set(MovementForm::for_item(&item));
        cantidad_text.set(item.on_hand().to_string());
        error_msg.set(None);
        selected.set(Some(item));
    };

    let on_submit = Callback::new(move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        let Some(item) = selected.get_untracked() else {
            return;
        };
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
        let (empresa, usuario) = session.with_untracked(|s| (s.company_id(), s.user_id()));
        spawn_local(async move {
            match inventory::register_movement(&api, &current, &item, empresa, usuario).await {
                Ok(res) => {
                    selected.set(None);
                    queries.invalidate("inventario");
                    toaster.success(res.message.unwrap_or_else(|| "Movimiento registrado correctamente".into()));
                }
                Err(e) => {
                    error!(articulo_id = item.articulo_id, error = %e, "stock movement failed");
                    error_msg.set(Some(e.user_message(inventory::MOVEMENT_ERROR)));
                }
            }
            saving.set(false);
        });
    });

    let cantidad = crate::components::Binding {
        value: cantidad_text.into(),
        set: Callback::new(move |v: String| {
            form.update(|f| f.cantidad = parse_amount(&v));
            cantidad_text.set(v);
        }),
    };

    view! {
        <div class="page">
            <PageHeader title="Inventario" subtitle="Existencias de la sucursal activa"/>
            <div class="stats-grid">
                <StatCard label="Artículos" value=total accent="blue"/>
                <StatCard label="Stock bajo" value=counts(StockStatus::Low) accent="amber"/>
                <StatCard label="Sin stock" value=counts(StockStatus::Out) accent="rose"/>
            </div>
            <div class="card">
                <input
                    class="search"
                    type="search"
                    placeholder="Buscar por nombre o código..."
                    prop:value=move || query.get()
                    on:input=move |ev| query.set(event_target_value(&ev))
                />
                <Suspense fallback=|| view! { <Loading/> }>
                    {move || stock.get().map(|res| match res {
                        Err(e) => view! { <ErrorState message=e.user_message(LIST_ERROR) on_retry=move |_| stock.refetch()/> }.into_view(),
                        Ok(items) => {
                            let rows: Vec<StockItem> = inventory::filter_stock(&items, &query.get()).into_iter().cloned().collect();
                            if rows.is_empty() {
                                return view! { <EmptyState message="No hay artículos en inventario"/> }.into_view();
                            }
                            view! {
                                <table class="table">
                                    <thead>
                                        <tr>
                                            <th>"Código"</th>
                                            <th>"Artículo"</th>
                                            <th class="num">"Stock"</th>
                                            <th class="num">"Mínimo"</th>
                                            <th>"Estado"</th>
                                            <th>"Nivel"</th>
                                            <th></th>
                                        </tr>
                                    </thead>
                                    <tbody>
                                        {rows.into_iter().map(|i| {
                                            let status = StockStatus::of(i.on_hand(), i.cantidad_minima.unwrap_or(0.0));
                                            let shelf = inventory::shelf_label(&i);
                                            let target = i.clone();
                                            view! {
                                                <tr>
                                                    <td>{i.articulo_codigo.clone().unwrap_or_default()}</td>
                                                    <td>{i.articulo_nombre.clone()}</td>
                                                    <td class="num">{thousands(i.on_hand())}" "{i.unidad_medida.clone().unwrap_or_default()}</td>
                                                    <td class="num">{thousands(i.cantidad_minima.unwrap_or(0.0))}</td>
                                                    <td><span class={status.css()}>{status.label()}</span></td>
                                                    <td class="muted">{shelf}</td>
                                                    <td>
                                                        <button class="btn-icon" on:click=move |_| open_movement(target.clone())>"Movimiento"</button>
                                                    </td>
                                                </tr>
                                            }
                                        }).collect_view()}
                                    </tbody>
                                </table>
                            }.into_view()
                        }
                    })}
                </Suspense>
            </div>

            {move || selected.get().map(|item| view! {
                <Modal title=format!("Movimiento: {}", item.articulo_nombre) on_close=move |_| selected.set(None)>
                    <form class="form" on:submit=move |ev| on_submit.call(ev)>
                        <p class="muted">{format!("Stock actual: {}", thousands(item.on_hand()))}</p>
                        <FormError message=error_msg/>
                        <SelectField label="Tipo de movimiento" options=plain_options(&MOVEMENT_TYPES) bind=bind!(form, tipo_movimiento)/>
                        <Field label="Cantidad" kind="number" bind=cantidad required=true/>
                        <Field label="Motivo" bind=bind!(form, motivo) required=true/>
                        <div class="form-actions">
                            <button type="button" class="btn btn-secondary" on:click=move |_| selected.set(None)>"Cancelar"</button>
                            <button type="submit" class="btn btn-primary" prop:disabled=move || saving.get()>
                                {move || if saving.get() { "Guardando..." } else { "Registrar" }}
                            </button>
                        </div>
                    </form>
                </Modal>
            })}
        </div>
    }
}
