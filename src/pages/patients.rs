use leptos::*;
use leptos_router::*;
use tracing::error;

use crate::analytics::today;
use crate::app::{use_api, use_config};
use crate::cache::use_query_client;
use crate::components::{bind, plain_options, ErrorState, EmptyState, Field, FormError, Loading, PageHeader, SelectField, TextArea};
use crate::format::{age_label, date};
use crate::models::Patient;
use crate::patients::{self, PatientForm};
use crate::session::use_session;

use super::{confirm, parse_id};

#[component]
pub fn PatientList() -> impl IntoView {
    let api = use_api();
    let dev_fallback = use_config().dev_fallback;
    let queries = use_query_client();
    let toaster = crate::components::use_toaster();
    let session = use_session().session;
    let query = create_rw_signal(String::new());

    let rows = {
        let api = api.clone();
        create_local_resource(
            move || (session.with(|s| s.company_id()), query.get(), queries.version("pacientes")),
            move |(empresa, term, _)| {
                let api = api.clone();
                async move { patients::load_matching(&api, empresa, &term, dev_fallback).await }
            },
        )
    };

    let delete = move |p: Patient| {
        if !confirm(&patients::confirm_delete_text(&p)) {
            return;
        }
        let api = api.clone();
        let empresa = session.with_untracked(|s| s.company_id());
        spawn_local(async move {
            match patients::delete_and_reload(&api, p.paciente_id, empresa, dev_fallback).await {
                Ok(fresh) => {
                    rows.set(Ok(fresh));
                    toaster.success("Paciente eliminado correctamente");
                }
                Err(e) => {
                    error!(paciente_id = p.paciente_id, error = %e, "patient delete failed");
                    toaster.error(e.user_message(patients::DELETE_ERROR));
                }
            }
        });
    };

    view! {
        <div class="page">
            <PageHeader title="Pacientes" subtitle="Gestión de pacientes de la clínica">
                <A href="/pacientes/nuevo" class="btn btn-primary">"+ Nuevo Paciente"</A>
            </PageHeader>
            <div class="card">
                <input
                    class="search"
                    type="search"
                    placeholder="Buscar por nombre, apellido, documento o historia..."
                    prop:value=move || query.get()
                    on:input=move |ev| query.set(event_target_value(&ev))
                />
                <Transition fallback=|| view! { <Loading/> }>
                    {
                        let delete = delete.clone();
                        move || rows.get().map(|res| match res {
                            Err(e) => view! {
                                <ErrorState message=e.user_message(patients::LIST_ERROR) on_retry=move |_| rows.refetch()/>
                            }.into_view(),
                            Ok(data) => {
                                let delete = delete.clone();
                                let visible: Vec<Patient> = patients::filter(&data.rows, &query.get()).into_iter().cloned().collect();
                                view! {
                                    {data.demo.then_some(view! { <div class="notice">"Mostrando datos de demostración"</div> })}
                                    {if visible.is_empty() {
                                        view! { <EmptyState message="No se encontraron pacientes"/> }.into_view()
                                    } else {
                                        view! {
                                            <table class="table">
                                                <thead>
                                                    <tr>
                                                        <th>"Historia"</th>
                                                        <th>"Paciente"</th>
                                                        <th>"Documento"</th>
                                                        <th>"Teléfono"</th>
                                                        <th>"Ciudad"</th>
                                                        <th></th>
                                                    </tr>
                                                </thead>
                                                <tbody>
                                                    {visible.into_iter().map(|p| {
                                                        let delete = delete.clone();
                                                        let id = p.paciente_id;
                                                        let target = p.clone();
                                                        view! {
                                                            <tr>
                                                                <td>{p.numero_historia.clone()}</td>
                                                                <td>{p.full_name()}</td>
                                                                <td>{format!("{} {}", p.documento_tipo, p.documento_numero)}</td>
                                                                <td>{p.telefono_principal.clone().unwrap_or_default()}</td>
                                                                <td>{p.direccion_ciudad.clone().unwrap_or_default()}</td>
                                                                <td class="actions">
                                                                    <A href=format!("/pacientes/detalle/{}", id) class="btn-icon">"Ver"</A>
                                                                    <A href=format!("/pacientes/editar/{}", id) class="btn-icon">"Editar"</A>
                                                                    <button class="btn-icon danger" on:click=move |_| delete(target.clone())>"Eliminar"</button>
                                                                </td>
                                                            </tr>
                                                        }
                                                    }).collect_view()}
                                                </tbody>
                                            </table>
                                        }.into_view()
                                    }}
                                }.into_view()
                            }
                        })
                    }
                </Transition>
            </div>
        </div>
    }
}

/// Create and edit share one screen; `:id` present means edit.
#[component]
pub fn PatientFormPage() -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let toaster = crate::components::use_toaster();
    let session = use_session().session;
    let navigate = use_navigate();
    let params = use_params_map();
    let id = move || parse_id(params.with(|p| p.get("id").cloned()));

    let form = create_rw_signal(PatientForm::default());
    let error_msg = create_rw_signal(None::<String>);
    let saving = create_rw_signal(false);

    let existing = {
        let api = api.clone();
        create_local_resource(id, move |id| {
            let api = api.clone();
            async move {
                match id {
                    Some(id) => api.get_patient(id).await.map(Some),
                    None => Ok(None),
                }
            }
        })
    };

    create_effect(move |_| match existing.get() {
        Some(Ok(Some(p))) => form.set(PatientForm::from(&p)),
        Some(Ok(None)) => form.set(PatientForm::default()),
        Some(Err(e)) => error_msg.set(Some(e.user_message(patients::LOAD_ERROR))),
        None => {}
    });

    let on_submit = move |ev: ev::SubmitEvent| {
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
        error_msg.set(None);
        let api = api.clone();
        let navigate = navigate.clone();
        let editing = id();
        let empresa = session.with_untracked(|s| s.company_id());
        spawn_local(async move {
            match patients::save(&api, editing, &current, empresa).await {
                Ok(()) => {
                    queries.invalidate("pacientes");
                    toaster.success(if editing.is_some() { "Paciente actualizado correctamente" } else { "Paciente registrado correctamente" });
                    navigate("/pacientes", Default::default());
                }
                Err(e) => {
                    error!(error = %e, "patient save failed");
                    error_msg.set(Some(e.user_message(patients::SAVE_ERROR)));
                }
            }
            saving.set(false);
        });
    };

    let genders: Vec<(String, String)> = patients::GENDERS.iter().map(|(v, l)| (v.to_string(), l.to_string())).collect();
    let title = move || if id().is_some() { "Editar Paciente" } else { "Nuevo Paciente" };

    view! {
        <div class="page">
            <div class="page-header">
                <h1>{title}</h1>
                <A href="/pacientes" class="btn btn-secondary">"Volver"</A>
            </div>
            <form class="card form" on:submit=on_submit>
                <FormError message=error_msg/>

                <h3>"Datos personales"</h3>
                <div class="form-grid">
                    <Field label="N° Historia" bind=bind!(form, numero_historia)/>
                    <SelectField label="Tipo de documento" options=plain_options(&patients::DOCUMENT_TYPES) bind=bind!(form, documento_tipo)/>
                    <Field label="N° Documento" bind=bind!(form, documento_numero) required=true/>
                    <Field label="Nombre" bind=bind!(form, nombre) required=true/>
                    <Field label="Apellido" bind=bind!(form, apellido) required=true/>
                    <Field label="Fecha de nacimiento" kind="date" bind=bind!(form, fecha_nacimiento) required=true/>
                    <SelectField label="Género" options=genders bind=bind!(form, genero)/>
                    <SelectField label="Grupo sanguíneo" options=plain_options(&patients::BLOOD_GROUPS) bind=bind!(form, grupo_sanguineo) placeholder="Seleccione"/>
                </div>

                <h3>"Contacto"</h3>
                <div class="form-grid">
                    <Field label="Email" kind="email" bind=bind!(form, email)/>
                    <Field label="Teléfono principal" kind="tel" bind=bind!(form, telefono_principal) required=true/>
                    <Field label="Teléfono secundario" kind="tel" bind=bind!(form, telefono_secundario)/>
                    <Field label="Dirección" bind=bind!(form, direccion_calle)/>
                    <Field label="Ciudad" bind=bind!(form, direccion_ciudad)/>
                    <Field label="Código postal" bind=bind!(form, codigo_postal)/>
                </div>

                <h3>"Contacto de emergencia"</h3>
                <div class="form-grid">
                    <Field label="Nombre" bind=bind!(form, contacto_emergencia_nombre)/>
                    <Field label="Teléfono" kind="tel" bind=bind!(form, contacto_emergencia_telefono)/>
                    <Field label="Relación" bind=bind!(form, contacto_emergencia_relacion)/>
                </div>

                <h3>"Información médica"</h3>
                <TextArea label="Alergias" bind=bind!(form, alergias)/>
                <TextArea label="Medicamentos actuales" bind=bind!(form, medicamentos_actuales)/>
                <TextArea label="Enfermedades crónicas" bind=bind!(form, enfermedades_cronicas)/>

                <div class="form-actions">
                    <A href="/pacientes" class="btn btn-secondary">"Cancelar"</A>
                    <button type="submit" class="btn btn-primary" prop:disabled=move || saving.get()>
                        {move || if saving.get() { "Guardando..." } else { "Guardar" }}
                    </button>
                </div>
            </form>
        </div>
    }
}

#[component]
pub fn PatientDetail() -> impl IntoView {
    let api = use_api();
    let params = use_params_map();
    let id = move || parse_id(params.with(|p| p.get("id").cloned()));

    let patient = create_local_resource(id, move |id| {
        let api = api.clone();
        async move {
            match id {
                Some(id) => api.get_patient(id).await,
                None => Err(crate::error::ApiError::Unknown("id de paciente inválido".into())),
            }
        }
    });

    let row = |label: &'static str, value: Option<String>| {
        view! {
            <div class="detail-row">
                <span class="muted">{label}</span>
                <span>{value.filter(|v| !v.trim().is_empty()).unwrap_or_else(|| "-".into())}</span>
            </div>
        }
    };

    view! {
        <div class="page">
            <Suspense fallback=|| view! { <Loading/> }>
                {move || patient.get().map(|res| match res {
                    Err(e) => view! {
                        <ErrorState message=e.user_message(patients::LOAD_ERROR)/>
                        <A href="/pacientes" class="btn btn-secondary">"Volver"</A>
                    }.into_view(),
                    Ok(p) => {
                        let birth = p.fecha_nacimiento.clone();
                        view! {
                            <div class="page-header">
                                <div>
                                    <h1>{p.full_name()}</h1>
                                    <p class="muted">{format!("Historia {}", p.numero_historia)}</p>
                                </div>
                                <div class="page-actions">
                                    <A href=format!("/pacientes/editar/{}", p.paciente_id) class="btn btn-primary">"Editar"</A>
                                    <A href="/pacientes" class="btn btn-secondary">"Volver"</A>
                                </div>
                            </div>
                            <div class="detail-grid">
                                <div class="card">
                                    <h3>"Datos personales"</h3>
                                    {row("Documento", Some(format!("{} {}", p.documento_tipo, p.documento_numero)))}
                                    {row("Fecha de nacimiento", Some(date(birth.as_deref())))}
                                    {row("Edad", Some(age_label(birth.as_deref(), today())))}
                                    {row("Género", p.genero.clone().map(|g| gender_label(&g).to_string()))}
                                    {row("Grupo sanguíneo", p.grupo_sanguineo.clone())}
                                    {row("Registrado", Some(date(p.registration_day())))}
                                </div>
                                <div class="card">
                                    <h3>"Contacto"</h3>
                                    {row("Email", p.email.clone())}
                                    {row("Teléfono principal", p.telefono_principal.clone())}
                                    {row("Teléfono secundario", p.telefono_secundario.clone())}
                                    {row("Dirección", p.direccion_calle.clone())}
                                    {row("Ciudad", p.direccion_ciudad.clone())}
                                </div>
                                <div class="card">
                                    <h3>"Contacto de emergencia"</h3>
                                    {row("Nombre", p.contacto_emergencia_nombre.clone())}
                                    {row("Teléfono", p.contacto_emergencia_telefono.clone())}
                                    {row("Relación", p.contacto_emergencia_relacion.clone())}
                                </div>
                                <div class="card">
                                    <h3>"Información médica"</h3>
                                    {row("Alergias", p.alergias.clone())}
                                    {row("Medicamentos actuales", p.medicamentos_actuales.clone())}
                                    {row("Enfermedades crónicas", p.enfermedades_cronicas.clone())}
                                </div>
                            </div>
                        }.into_view()
                    }
                })}
            </Suspense>
        </div>
    }
}

fn gender_label(code: &str) -> &str {
    patients::GENDERS.iter().find(|(c, _)| *c == code).map(|(_, l)| *l).unwrap_or(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gender_codes_read_as_words() {
        assert_eq!(gender_label("F"), "Femenino");
        assert_eq!(gender_label("X"), "X");
    }
}
