use leptos::*;
use leptos_router::*;
use tracing::error;

use crate::analytics::today;
use crate::app::use_api;
use crate::cache::use_query_client;
use crate::components::{amount_text, bind, parse_amount, plain_options, use_toaster, EmptyState, ErrorState, Field, FormError, Loading, PageHeader, SelectField};
use crate::format::{date, money};
use crate::models::Article;
use crate::purchase::{self, PurchaseDraft, CURRENCIES, PAYMENT_TERMS};
use crate::session::use_session;

const LIST_ERROR: &str = "Error al cargar las facturas de compra";
const SAVE_ERROR: &str = "Error al registrar la compra";

fn state_class(estado: &str) -> &'static str {
    match estado {
        "PAGADA" | "RECIBIDA" => "badge badge-success",
        "ANULADA" => "badge badge-danger",
        _ => "badge badge-warning",
    }
}

#[component]
pub fn PurchaseList() -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let session = use_session().session;

    let invoices = create_local_resource(
        move || (session.with(|s| (s.company_id(), s.branch_id())), queries.version("compras")),
        move |((empresa, sucursal), _)| {
            let api = api.clone();
            async move {
                match empresa {
                    Some(e) => api.purchase_invoices(e, sucursal).await.map(|p| p.items),
                    None => Ok(Vec::new()),
                }
            }
        },
    );

    view! {
        <div class="page">
            <PageHeader title="Facturas de Compra" subtitle="Compras registradas en la sucursal">
                <A href="/compras/proveedores" class="btn btn-secondary">"Proveedores"</A>
                <A href="/compras/articulos" class="btn btn-secondary">"Artículos"</A>
                <A href="/compras/inventario" class="btn btn-secondary">"Inventario"</A>
                <A href="/compras/facturas/nueva" class="btn btn-primary">"+ Registrar Compra"</A>
            </PageHeader>
            <div class="card">
                <Suspense fallback=|| view! { <Loading/> }>
                    {move || invoices.get().map(|res| match res {
                        Err(e) => view! { <ErrorState message=e.user_message(LIST_ERROR) on_retry=move |_| invoices.refetch()/> }.into_view(),
                        Ok(list) if list.is_empty() => view! { <EmptyState message="No hay facturas de compra registradas"/> }.into_view(),
                        Ok(list) => view! {
                            <table class="table">
                                <thead>
                                    <tr>
                                        <th>"N° Factura"</th>
                                        <th>"Fecha"</th>
                                        <th>"Proveedor"</th>
                                        <th>"Condición"</th>
                                        <th class="num">"Total"</th>
                                        <th>"Estado"</th>
                                    </tr>
                                </thead>
                                <tbody>
                                    {list.into_iter().map(|f| {
                                        let estado = f.estado.clone().unwrap_or_else(|| "PENDIENTE".into());
                                        let moneda = f.moneda.clone().unwrap_or_else(|| "PYG".into());
                                        view! {
                                            <tr>
                                                <td>{f.numero_factura.clone()}</td>
                                                <td>{date(f.fecha_factura.as_deref())}</td>
                                                <td>{f.proveedor_nombre.clone().unwrap_or_default()}</td>
                                                <td>{f.condicion_pago.clone().unwrap_or_default()}</td>
                                                <td class="num">{money(f.total_general, &moneda)}</td>
                                                <td><span class=state_class(&estado)>{estado.clone()}</span></td>
                                            </tr>
                                        }
                                    }).collect_view()}
                                </tbody>
                            </table>
                        }.into_view(),
                    })}
                </Suspense>
            </div>
        </div>
    }
}

#[component]
pub fn NewPurchase() -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let toaster = use_toaster();
    let session = use_session().session;
    let navigate = use_navigate();

    let draft = create_rw_signal(PurchaseDraft::new(&today().format("%Y-%m-%d").to_string()));
    let error_msg = create_rw_signal(None::<String>);
    let saving = create_rw_signal(false);

    let suppliers = {
        let api = api.clone();
        create_local_resource(
            move || queries.version("proveedores"),
            move |_| {
                let api = api.clone();
                async move { api.suppliers(Some("S")).await.map(|p| p.items) }
            },
        )
    };
    let articles = {
        let api = api.clone();
        create_local_resource(
            move || queries.version("articulos"),
            move |_| {
                let api = api.clone();
                async move { api.articles(None, Some("S")).await.map(|p| p.items) }
            },
        )
    };
    let catalogue = Signal::derive(move || articles.get().and_then(Result::ok).unwrap_or_default());

    let supplier_options = Signal::derive(move || {
        suppliers
            .get()
            .and_then(Result::ok)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|s| s.proveedor_id.map(|id| (id.to_string(), s.nombre)))
            .collect::<Vec<_>>()
    });
    let article_options = Signal::derive(move || {
        catalogue.with(|list| list.iter().map(|a: &Article| (a.articulo_id.to_string(), format!("{} - {}", a.codigo, a.nombre))).collect::<Vec<_>>())
    });

    let supplier_bind = crate::components::Binding {
        value: Signal::derive(move || draft.with(|d| d.proveedor_id.map(|id| id.to_string()).unwrap_or_default())),
        set: Callback::new(move |v: String| draft.update(|d| d.proveedor_id = v.parse().ok())),
    };

    let on_submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if saving.get_untracked() {
            return;
        }
        let current = draft.get_untracked();
        if let Err(msg) = current.validate() {
            error_msg.set(Some(msg.to_string()));
            return;
        }
        saving.set(true);
        error_msg.set(None);
        let api = api.clone();
        let navigate = navigate.clone();
        let (empresa, sucursal, usuario) = session.with_untracked(|s| (s.company_id(), s.branch_id(), s.user_id()));
        spawn_local(async move {
            match purchase::submit(&api, &current, empresa, sucursal, usuario).await {
                Ok(res) => {
                    queries.invalidate("inventario");
                    queries.invalidate("articulos");
                    queries.invalidate("compras");
                    toaster.success(res.message.unwrap_or_else(|| "Compra registrada correctamente".into()));
                    navigate("/compras/facturas", Default::default());
                }
                Err(e) => {
                    error!(error = %e, "purchase submit failed");
                    error_msg.set(Some(e.user_message(SAVE_ERROR)));
                }
            }
            saving.set(false);
        });
    };

    let moneda = move || draft.with(|d| d.moneda.clone());

    view! {
        <div class="page">
            <div class="page-header">
                <h1>"Registrar Compra"</h1>
                <A href="/compras/facturas" class="btn btn-secondary">"Volver"</A>
            </div>
            <form class="form" on:submit=on_submit>
                <FormError message=error_msg/>
                <div class="card">
                    <h3>"Cabecera"</h3>
                    <div class="form-grid">
                        <SelectField label="Proveedor" options=supplier_options bind=supplier_bind placeholder="Seleccione un proveedor"/>
                        <Field label="N° Factura" bind=bind!(draft, nro_factura)/>
                        <Field label="Fecha de emisión" kind="date" bind=bind!(draft, fecha_emision)/>
                        <SelectField label="Condición" options=plain_options(&PAYMENT_TERMS) bind=bind!(draft, condicion_pago)/>
                        <SelectField label="Moneda" options=plain_options(&CURRENCIES) bind=bind!(draft, moneda)/>
                    </div>
                </div>

                <div class="card">
                    <div class="card-header">
                        <h3>"Detalle"</h3>
                        <button type="button" class="btn btn-secondary" on:click=move |_| { draft.update(|d| { d.add_line(); }); }>
                            "+ Agregar ítem"
                        </button>
                    </div>
                    <table class="table">
                        <thead>
                            <tr>
                                <th>"Artículo"</th>
                                <th class="num">"Cantidad"</th>
                                <th class="num">"Costo unitario"</th>
                                <th class="num">"Subtotal"</th>
                                <th></th>
                            </tr>
                        </thead>
                        <tbody>
                            <For
                                each=move || draft.with(|d| d.lines.iter().map(|l| l.id).collect::<Vec<_>>())
                                key=|id| *id
                                children=move |id| {
                                    let line = move || draft.with(|d| d.lines.iter().find(|l| l.id == id).cloned());
                                    let qty_ref = create_node_ref::<html::Input>();
                                    let cost_ref = create_node_ref::<html::Input>();
                                    let shown = move |node: NodeRef<html::Input>, value: f64| {
                                        let typed = node.get_untracked().map(|el| el.value()).unwrap_or_default();
                                        amount_text(&typed, value)
                                    };
                                    view! {
                                        <tr>
                                            <td>
                                                <select on:change=move |ev| {
                                                    let picked = event_target_value(&ev).parse().ok();
                                                    let list = catalogue.get_untracked();
                                                    draft.update(|d| d.set_article(id, picked, &list));
                                                }>
                                                    <option value="">"Seleccione"</option>
                                                    {move || article_options.get().into_iter().map(|(v, l)| {
                                                        let selected = line().and_then(|x| x.articulo_id).map(|a| a.to_string()) == Some(v.clone());
                                                        view! { <option value=v selected=selected>{l}</option> }
                                                    }).collect_view()}
                                                </select>
                                            </td>
                                            <td class="num">
                                                <input type="number" min="0" step="any" node_ref=qty_ref
                                                    prop:value=move || shown(qty_ref, line().map(|x| x.cantidad).unwrap_or(0.0))
                                                    on:input=move |ev| draft.update(|d| d.set_quantity(id, parse_amount(&event_target_value(&ev))))
                                                />
                                            </td>
                                            <td class="num">
                                                <input type="number" min="0" step="any" node_ref=cost_ref
                                                    prop:value=move || shown(cost_ref, line().map(|x| x.costo_unitario).unwrap_or(0.0))
                                                    on:input=move |ev| draft.update(|d| d.set_cost(id, parse_amount(&event_target_value(&ev))))
                                                />
                                            </td>
                                            <td class="num">{move || money(line().map(|x| x.total()).unwrap_or(0.0), &moneda())}</td>
                                            <td>
                                                <button type="button" class="btn-icon danger" on:click=move |_| draft.update(|d| d.remove_line(id))>"Quitar"</button>
                                            </td>
                                        </tr>
                                    }
                                }
                            />
                        </tbody>
                    </table>
                    {move || draft.with(|d| d.lines.is_empty()).then(|| view! { <EmptyState message="Agregue ítems a la factura"/> })}
                    <div class="total-row">
                        <span>"Total"</span>
                        <strong>{move || money(draft.with(|d| d.total()), &moneda())}</strong>
                    </div>
                </div>

                <div class="form-actions">
                    <A href="/compras/facturas" class="btn btn-secondary">"Cancelar"</A>
                    <button type="submit" class="btn btn-primary" prop:disabled=move || saving.get()>
                        {move || if saving.get() { "Registrando..." } else { "Registrar Compra" }}
                    </button>
                </div>
            </form>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_badges() {
        assert_eq!(state_class("ANULADA"), "badge badge-danger");
        assert_eq!(state_class("PAGADA"), "badge badge-success");
        assert_eq!(state_class("PENDIENTE"), "badge badge-warning");
    }
}
