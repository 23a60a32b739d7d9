use leptos::*;
use leptos_router::A;

use crate::analytics::{greeting_now, recent_patients};
use crate::app::use_api;
use crate::cache::use_query_client;
use crate::components::{EmptyState, ErrorState, Loading, StatCard};
use crate::format::{compact, date, thousands};
use crate::models::{DashboardStats, Patient};
use crate::session::use_session;

const STATS_ERROR: &str = "No se pudieron cargar las estadísticas";

/// Link target, name and registration date for one recent patient.
fn recent_row(p: &Patient) -> (String, String, String) {
    (format!("/pacientes/detalle/{}", p.paciente_id), p.full_name(), date(p.registration_day()))
}

#[component]
pub fn Dashboard() -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let session = use_session().session;

    let stats = {
        let api = api.clone();
        create_local_resource(
            move || (session.with(|s| s.company_id()), queries.version("dashboard")),
            move |(empresa, _)| {
                let api = api.clone();
                async move {
                    match empresa {
                        Some(id) => api.dashboard_stats(id).await,
                        None => Ok(DashboardStats::default()),
                    }
                }
            },
        )
    };

    let patients = create_local_resource(
        move || (session.with(|s| s.company_id()), queries.version("pacientes")),
        move |(empresa, _)| {
            let api = api.clone();
            async move { api.list_patients(empresa, None).await.map(|p| recent_patients(&p.items, 5)) }
        },
    );

    let name = move || session.with(|s| s.user.as_ref().map(|u| u.nombre.clone()).unwrap_or_default());
    let stat = move |pick: fn(&DashboardStats) -> String| {
        Signal::derive(move || stats.get().and_then(Result::ok).map(|s| pick(&s)).unwrap_or_else(|| "-".into()))
    };

    view! {
        <div class="page">
            <div class="page-header">
                <div>
                    <h1>{greeting_now()}", "{name}</h1>
                    <p class="muted">"Resumen de la actividad de la clínica"</p>
                </div>
            </div>

            {move || stats.get().and_then(Result::err).map(|e| view! { <ErrorState message=e.user_message(STATS_ERROR) on_retry=move |_| stats.refetch()/> })}

            <div class="stats-grid">
                <StatCard label="Pacientes Totales" value=stat(|s| thousands(s.total_pacientes as f64)) accent="blue"/>
                <StatCard label="Citas para Hoy" value=stat(|s| thousands(s.citas_hoy as f64)) accent="green"/>
                <StatCard label="Tratamientos Activos" value=stat(|s| thousands(s.tratamientos_activos as f64)) accent="amber"/>
                <StatCard label="Ingresos Mensuales" value=stat(|s| format!("Gs {}", compact(s.ingresos_mes))) accent="rose"/>
            </div>

            <div class="card">
                <div class="card-header">
                    <h3>"Pacientes Nuevos"</h3>
                    <A href="/pacientes" class="link">"Ver todos"</A>
                </div>
                <Suspense fallback=|| view! { <Loading/> }>
                    {move || patients.get().map(|res| match res {
                        Err(e) => view! { <ErrorState message=e.user_message(crate::patients::LIST_ERROR)/> }.into_view(),
                        Ok(list) if list.is_empty() => view! { <EmptyState message="Aún no hay pacientes registrados"/> }.into_view(),
                        Ok(list) => view! {
                            <ul class="list">
                                {list.iter().map(|p| {
                                    let (href, name, registered) = recent_row(p);
                                    view! {
                                        <li>
                                            <A href=href>{name}</A>
                                            <span class="muted">{registered}</span>
                                        </li>
                                    }
                                }).collect_view()}
                            </ul>
                        }.into_view(),
                    })}
                </Suspense>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_rows_link_to_detail() {
        let p = Patient {
            paciente_id: 12,
            nombre: "Ana".into(),
            apellido: "Paz".into(),
            fecha_registro: Some("2025-04-03T09:00:00".into()),
            ..Default::default()
        };
        let (href, name, registered) = recent_row(&p);
        assert_eq!(href, "/pacientes/detalle/12");
        assert_eq!(name, "Ana Paz");
        assert_eq!(registered, "03/04/2025");
        assert_eq!(p.full_name(), "Ana Paz");
    }
}
