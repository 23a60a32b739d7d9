use leptos::*;
use leptos_router::*;

use crate::analytics::{self, first_of_month, first_of_year, today};
use crate::api::InvoiceFilter;
use crate::app::{use_api, use_config};
use crate::cache::use_query_client;
use crate::charts::{BarChart, GrowthChart, Series, StockChart};
use crate::components::{EmptyState, ErrorState, Loading, PageHeader, StatCard};
use crate::format::{date, guaranies, short_date, thousands};
use crate::inventory::{self, InventoryRow};
use crate::session::use_session;

fn invoice_badge(estado: &str) -> &'static str {
    match estado {
        "PAGADA" => "badge badge-success",
        "ANULADA" => "badge badge-danger",
        "PENDIENTE" => "badge badge-warning",
        _ => "badge badge-muted",
    }
}

fn iso(day: chrono::NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Two date inputs bound to the report's range.
#[component]
fn RangePicker(from: RwSignal<String>, to: RwSignal<String>) -> impl IntoView {
    view! {
        <div class="range-picker">
            <label class="field">
                <span class="field-label">"Desde"</span>
                <input type="date" prop:value=move || from.get() on:change=move |ev| from.set(event_target_value(&ev))/>
            </label>
            <label class="field">
                <span class="field-label">"Hasta"</span>
                <input type="date" prop:value=move || to.get() on:change=move |ev| to.set(event_target_value(&ev))/>
            </label>
        </div>
    }
}

#[component]
pub fn ReportsIndex() -> impl IntoView {
    let cards = [
        ("/reportes/financiero", "Financiero", "Facturación y cobros por período"),
        ("/reportes/pacientes", "Pacientes", "Altas y crecimiento de la cartera"),
        ("/reportes/inventario", "Inventario", "Existencias, faltantes y valorización"),
    ];
    view! {
        <div class="page">
            <PageHeader title="Reportes" subtitle="Indicadores de la empresa activa"/>
            <div class="stats-grid">
                {cards.into_iter().map(|(href, title, hint)| view! {
                    <A href=href class="card report-card">
                        <h3>{title}</h3>
                        <p class="muted">{hint}</p>
                    </A>
                }).collect_view()}
            </div>
        </div>
    }
}

#[component]
pub fn FinancialReport() -> impl IntoView {
    let api = use_api();
    let session = use_session().session;
    let now = today();
    let from = create_rw_signal(iso(first_of_month(now)));
    let to = create_rw_signal(iso(now));

    let invoices = create_local_resource(
        move || (session.with(|s| s.company_id()), from.get(), to.get()),
        move |(empresa, desde, hasta)| {
            let api = api.clone();
            async move {
                let filter = InvoiceFilter { empresa_id: empresa, fecha_desde: Some(desde), fecha_hasta: Some(hasta) };
                api.invoices(&filter).await.map(|p| p.items)
            }
        },
    );

    let summary = Signal::derive(move || invoices.get().and_then(Result::ok).map(|l| analytics::financial_summary(&l)));
    let money_stat = move |pick: fn(&analytics::FinancialSummary) -> f64| {
        Signal::derive(move || summary.get().map(|s| guaranies(pick(&s))).unwrap_or_else(|| "-".into()))
    };
    let count = Signal::derive(move || {
        summary.get().map(|s| format!("{} ({} anuladas)", s.count, s.voided)).unwrap_or_else(|| "-".into())
    });

    view! {
        <div class="page">
            <PageHeader title="Reporte Financiero" subtitle="Facturación del período">
                <A href="/reportes" class="btn btn-secondary">"Volver"</A>
            </PageHeader>
            <RangePicker from=from to=to/>
            <div class="stats-grid">
                <StatCard label="Facturado" value=money_stat(|s| s.billed) accent="blue"/>
                <StatCard label="Cobrado" value=money_stat(|s| s.collected) accent="green"/>
                <StatCard label="Pendiente" value=money_stat(|s| s.pending) accent="amber"/>
                <StatCard label="Facturas" value=count accent="rose"/>
            </div>
            <div class="card">
                <h3>"Facturación diaria"</h3>
                <Suspense fallback=|| view! { <Loading/> }>
                    {move || invoices.get().map(|res| match res {
                        Err(e) => view! { <ErrorState message=e.user_message("Error al cargar facturas") on_retry=move |_| invoices.refetch()/> }.into_view(),
                        Ok(list) => {
                            let days = analytics::invoices_by_day(&list);
                            if days.is_empty() {
                                return view! { <EmptyState message="Sin facturas en el período"/> }.into_view();
                            }
                            let labels = days.iter().map(|d| short_date(&d.day)).collect();
                            let series = vec![
                                Series { name: "Facturado", color: "var(--primary)", values: days.iter().map(|d| d.billed).collect() },
                                Series { name: "Cobrado", color: "var(--success)", values: days.iter().map(|d| d.collected).collect() },
                            ];
                            view! { <BarChart labels=labels series=series format=guaranies/> }.into_view()
                        }
                    })}
                </Suspense>
            </div>
            <div class="card">
                <h3>"Detalle de facturas"</h3>
                <Suspense fallback=|| view! { <Loading/> }>
                    {move || invoices.get().and_then(Result::ok).map(|list| {
                        let lines = analytics::invoice_lines(&list);
                        if lines.is_empty() {
                            return view! { <EmptyState message="Sin facturas en el período seleccionado"/> }.into_view();
                        }
                        view! {
                            <table class="table">
                                <thead>
                                    <tr>
                                        <th>"Nro. Factura"</th>
                                        <th>"Fecha"</th>
                                        <th>"Paciente"</th>
                                        <th class="num">"Total"</th>
                                        <th class="num">"Pagado"</th>
                                        <th>"Estado"</th>
                                    </tr>
                                </thead>
                                <tbody>
                                    {lines.into_iter().map(|l| view! {
                                        <tr>
                                            <td>{l.numero}</td>
                                            <td>{date(l.issued_on.as_deref())}</td>
                                            <td>{l.paciente}</td>
                                            <td class="num">{guaranies(l.billed)}</td>
                                            <td class="num">{guaranies(l.collected)}</td>
                                            <td><span class=invoice_badge(&l.estado)>{l.estado.clone()}</span></td>
                                        </tr>
                                    }).collect_view()}
                                </tbody>
                            </table>
                        }.into_view()
                    })}
                </Suspense>
            </div>
        </div>
    }
}

#[component]
pub fn PatientReport() -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let session = use_session().session;
    let dev_fallback = use_config().dev_fallback;
    let now = today();
    let from = create_rw_signal(iso(first_of_year(now)));
    let to = create_rw_signal(iso(now));

    let patients = create_local_resource(
        move || (session.with(|s| s.company_id()), queries.version("pacientes")),
        move |(empresa, _)| {
            let api = api.clone();
            async move { crate::patients::load(&api, empresa, dev_fallback).await.map(|l| l.rows) }
        },
    );

    let in_range = create_memo(move |_| {
        patients
            .get()
            .and_then(Result::ok)
            .map(|all| analytics::patients_in_range(&all, &from.get(), &to.get()).into_iter().cloned().collect::<Vec<_>>())
    });
    let total = Signal::derive(move || in_range.get().map(|l| l.len().to_string()).unwrap_or_else(|| "-".into()));
    let this_month = Signal::derive(move || {
        patients
            .get()
            .and_then(Result::ok)
            .map(|all| analytics::new_this_month(&all, today()).to_string())
            .unwrap_or_else(|| "-".into())
    });

    view! {
        <div class="page">
            <PageHeader title="Reporte de Pacientes" subtitle="Altas registradas en el período">
                <A href="/reportes" class="btn btn-secondary">"Volver"</A>
            </PageHeader>
            <RangePicker from=from to=to/>
            <div class="stats-grid">
                <StatCard label="Pacientes en el período" value=total accent="blue"/>
                <StatCard label="Nuevos este mes" value=this_month accent="green"/>
            </div>
            <Suspense fallback=|| view! { <Loading/> }>
                {move || patients.get().map(|res| match res {
                    Err(e) => view! { <ErrorState message=e.user_message("Error al cargar pacientes") on_retry=move |_| patients.refetch()/> }.into_view(),
                    Ok(_) => {
                        let rows = in_range.get().unwrap_or_default();
                        if rows.is_empty() {
                            return view! { <EmptyState message="No hay pacientes en el período"/> }.into_view();
                        }
                        let growth = analytics::patient_growth(&rows);
                        view! {
                            <div class="card">
                                <h3>"Crecimiento mensual"</h3>
                                <GrowthChart points=growth/>
                            </div>
                            <div class="card">
                                <table class="table">
                                    <thead>
                                        <tr>
                                            <th>"Historia"</th>
                                            <th>"Paciente"</th>
                                            <th>"Documento"</th>
                                            <th>"Registro"</th>
                                        </tr>
                                    </thead>
                                    <tbody>
                                        {rows.into_iter().map(|p| view! {
                                            <tr>
                                                <td>{p.numero_historia.clone()}</td>
                                                <td>{p.full_name()}</td>
                                                <td>{format!("{} {}", p.documento_tipo, p.documento_numero)}</td>
                                                <td>{date(p.registration_day())}</td>
                                            </tr>
                                        }).collect_view()}
                                    </tbody>
                                </table>
                            </div>
                        }.into_view()
                    }
                })}
            </Suspense>
        </div>
    }
}

#[component]
pub fn InventoryReport() -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let session = use_session().session;

    // Whole company: stock is summed across branches.
    let rows = create_local_resource(
        move || (session.with(|s| s.company_id()), queries.version("inventario"), queries.version("articulos")),
        move |(empresa, _, _)| {
            let api = api.clone();
            async move {
                let Some(empresa) = empresa else {
                    return Ok(Vec::new());
                };
                let stock = api.stock(empresa, None).await?.items;
                let articles = api.articles(None, None).await?.items;
                Ok::<_, crate::error::ApiError>(inventory::merge(&stock, &articles))
            }
        },
    );

    let summary = Signal::derive(move || rows.get().and_then(Result::ok).map(|r| inventory::summarize(&r)));
    let stat = move |pick: fn(&inventory::InventorySummary) -> String| {
        Signal::derive(move || summary.get().map(|s| pick(&s)).unwrap_or_else(|| "-".into()))
    };

    let table = |list: Vec<InventoryRow>| {
        view! {
            <table class="table">
                <thead>
                    <tr>
                        <th>"Código"</th>
                        <th>"Artículo"</th>
                        <th class="num">"Stock"</th>
                        <th class="num">"Mínimo"</th>
                        <th class="num">"Valor"</th>
                        <th>"Estado"</th>
                    </tr>
                </thead>
                <tbody>
                    {list.into_iter().map(|r| {
                        let status = r.status();
                        view! {
                            <tr>
                                <td>{r.codigo.clone()}</td>
                                <td>{r.nombre.clone()}</td>
                                <td class="num">{thousands(r.stock)}</td>
                                <td class="num">{thousands(r.minimo)}</td>
                                <td class="num">{guaranies(r.value())}</td>
                                <td><span class={status.css()}>{status.label()}</span></td>
                            </tr>
                        }
                    }).collect_view()}
                </tbody>
            </table>
        }
    };

    view! {
        <div class="page">
            <PageHeader title="Reporte de Inventario" subtitle="Existencias consolidadas de la empresa">
                <A href="/reportes" class="btn btn-secondary">"Volver"</A>
            </PageHeader>
            <div class="stats-grid">
                <StatCard label="Artículos" value=stat(|s| s.total.to_string()) accent="blue"/>
                <StatCard label="Stock bajo" value=stat(|s| s.low.to_string()) accent="amber"/>
                <StatCard label="Sin stock" value=stat(|s| s.out.to_string()) accent="rose"/>
                <StatCard label="Valor del inventario" value=stat(|s| guaranies(s.value)) accent="green"/>
            </div>
            <Suspense fallback=|| view! { <Loading/> }>
                {move || rows.get().map(|res| match res {
                    Err(e) => view! { <ErrorState message=e.user_message("Error al cargar el inventario") on_retry=move |_| rows.refetch()/> }.into_view(),
                    Ok(list) if list.is_empty() => view! { <EmptyState message="No hay artículos registrados"/> }.into_view(),
                    Ok(list) => view! {
                        <div class="card">
                            <h3>"Top 10 por existencias"</h3>
                            <StockChart bars=inventory::top_by_stock(&list, 10)/>
                        </div>
                        <div class="card">{table(list)}</div>
                    }.into_view(),
                })}
            </Suspense>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn range_bounds_are_iso_days() {
        let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(iso(first_of_month(day)), "2025-03-01");
        assert_eq!(iso(first_of_year(day)), "2025-01-01");
    }

    #[test]
    fn invoice_states_map_to_badges() {
        assert_eq!(invoice_badge("PAGADA"), "badge badge-success");
        assert_eq!(invoice_badge("ANULADA"), "badge badge-danger");
        assert_eq!(invoice_badge("PENDIENTE"), "badge badge-warning");
        assert_eq!(invoice_badge("N/A"), "badge badge-muted");
    }
}
