use leptos::*;
use leptos_router::*;
use tracing::{error, warn};

use crate::analytics::{message_stats, today, MessageStats};
use crate::app::use_api;
use crate::cache::use_query_client;
use crate::components::{bind, use_toaster, Binding, EmptyState, ErrorState, Field, FormError, Loading, Modal, PageHeader, StatCard, TextArea};
use crate::format::{date, truncate};
use crate::models::{Flag, WhatsAppConfig};
use crate::session::use_session;
use crate::whatsapp::{self, SendForm, TEMPLATE_VARIABLES};

fn estado_class(estado: &str) -> &'static str {
    match estado {
        "ENVIADO" | "ENTREGADO" | "LEIDO" => "badge badge-success",
        "ERROR" => "badge badge-danger",
        _ => "badge badge-warning",
    }
}

#[component]
pub fn WhatsAppPage() -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let toaster = use_toaster();
    let session = use_session().session;

    let form = create_rw_signal(SendForm::default());
    let open = create_rw_signal(false);
    let sending = create_rw_signal(false);
    let running = create_rw_signal(false);
    let error_msg = create_rw_signal(None::<String>);

    let messages = {
        let api = api.clone();
        create_local_resource(
            move || (session.with(|s| s.company_id()), queries.version("wa-mensajes")),
            move |(empresa, _)| {
                let api = api.clone();
                async move {
                    match empresa {
                        Some(e) => api.whatsapp_messages(e).await.map(|p| p.items),
                        None => Ok(Vec::new()),
                    }
                }
            },
        )
    };

    let stats = Signal::derive(move || messages.get().and_then(Result::ok).map(|m| message_stats(&m, today())));
    let stat = move |pick: fn(&MessageStats) -> String| {
        Signal::derive(move || stats.get().map(|s| pick(&s)).unwrap_or_else(|| "-".into()))
    };

    let send = {
        let api = api.clone();
        Callback::new(move |ev: ev::SubmitEvent| {
            ev.prevent_default();
            if sending.get_untracked() {
                return;
            }
            let current = form.get_untracked();
            sending.set(true);
            error_msg.set(None);
            let api = api.clone();
            let empresa = session.with_untracked(|s| s.company_id());
            spawn_local(async move {
                match whatsapp::send(&api, &current, empresa).await {
                    Ok(_) => {
                        open.set(false);
                        form.set(SendForm::default());
                        queries.invalidate("wa-mensajes");
                        toaster.success("Mensaje enviado correctamente");
                    }
                    Err(e) => {
                        error!(error = %e, "whatsapp send failed");
                        error_msg.set(Some(format!("Error al enviar: {}", e.user_message(whatsapp::SEND_ERROR))));
                    }
                }
                sending.set(false);
            });
        })
    };

    let reminders = Callback::new(move |_: ev::MouseEvent| {
        if running.get_untracked() {
            return;
        }
        running.set(true);
        let api = api.clone();
        spawn_local(async move {
            match whatsapp::run_reminders(&api).await {
                Ok(summary) => {
                    queries.invalidate("wa-mensajes");
                    toaster.success(format!("Recordatorios procesados. {}", summary));
                }
                Err(e) => {
                    warn!(error = %e, "reminder job failed");
                    toaster.error(e.user_message("Error al ejecutar recordatorios"));
                }
            }
            running.set(false);
        });
    });

    view! {
        <div class="page">
            <PageHeader title="WhatsApp" subtitle="Mensajes y recordatorios a pacientes">
                <A href="/configuraciones/whatsapp" class="btn btn-secondary">"Configuración"</A>
                <button class="btn btn-secondary" on:click=move |ev| reminders.call(ev) prop:disabled=move || running.get()>
                    {move || if running.get() { "Procesando..." } else { "Enviar recordatorios" }}
                </button>
                <button class="btn btn-primary" on:click=move |_| {
                    error_msg.set(None);
                    open.set(true);
                }>"+ Enviar mensaje"</button>
            </PageHeader>
            <div class="stats-grid">
                <StatCard label="Enviados hoy" value=stat(|s| s.sent_today.to_string()) accent="green"/>
                <StatCard label="Errores" value=stat(|s| s.errors.to_string()) accent="rose"/>
                <StatCard label="Total mensajes" value=stat(|s| s.total.to_string()) accent="blue"/>
                <StatCard label="Tasa de éxito" value=stat(|s| format!("{}%", s.success_rate)) accent="amber"/>
            </div>
            <div class="card">
                <Suspense fallback=|| view! { <Loading/> }>
                    {move || messages.get().map(|res| match res {
                        Err(e) => view! { <ErrorState message=e.user_message("Error al cargar mensajes") on_retry=move |_| messages.refetch()/> }.into_view(),
                        Ok(list) if list.is_empty() => view! { <EmptyState message="No hay mensajes registrados"/> }.into_view(),
                        Ok(list) => view! {
                            <table class="table">
                                <thead>
                                    <tr>
                                        <th>"Fecha"</th>
                                        <th>"Paciente"</th>
                                        <th>"Teléfono"</th>
                                        <th>"Tipo"</th>
                                        <th>"Mensaje"</th>
                                        <th>"Estado"</th>
                                    </tr>
                                </thead>
                                <tbody>
                                    {list.into_iter().map(|m| {
                                        let text = m.mensaje.clone().unwrap_or_default();
                                        view! {
                                            <tr>
                                                <td>{date(m.fecha_envio.as_deref())}</td>
                                                <td>{m.paciente_nombre.clone().unwrap_or_else(|| "-".into())}</td>
                                                <td>{m.telefono.clone().unwrap_or_default()}</td>
                                                <td>{m.tipo.clone().unwrap_or_default()}</td>
                                                <td title=text.clone()>{truncate(&text, 60)}</td>
                                                <td>
                                                    <span class=estado_class(&m.estado) title=m.error_detalle.clone().unwrap_or_default()>
                                                        {m.estado.clone()}
                                                    </span>
                                                </td>
                                            </tr>
                                        }
                                    }).collect_view()}
                                </tbody>
                            </table>
                        }.into_view(),
                    })}
                </Suspense>
            </div>

            <Show when=move || open.get()>
                <Modal title="Enviar mensaje" on_close=move |_| open.set(false)>
                    <form class="form" on:submit=move |ev| send.call(ev)>
                        <FormError message=error_msg/>
                        <Field label="Teléfono" kind="tel" placeholder="595981123456" bind=bind!(form, phone) required=true/>
                        <TextArea label="Mensaje" rows=4 bind=bind!(form, message)/>
                        <div class="form-actions">
                            <button type="button" class="btn btn-secondary" on:click=move |_| open.set(false)>"Cancelar"</button>
                            <button
                                type="submit"
                                class="btn btn-primary"
                                prop:disabled=move || sending.get() || !form.with(|f| f.can_send())
                            >
                                {move || if sending.get() { "Enviando..." } else { "Enviar" }}
                            </button>
                        </div>
                    </form>
                </Modal>
            </Show>
        </div>
    }
}

/// Text binding over an optional config column; blank input stays `Some("")`.
fn config_text(cfg: RwSignal<WhatsAppConfig>, field: fn(&mut WhatsAppConfig) -> &mut Option<String>) -> Binding {
    Binding {
        value: Signal::derive(move || {
            let mut current = cfg.get();
            field(&mut current).clone().unwrap_or_default()
        }),
        set: Callback::new(move |v: String| cfg.update(|c| *field(c) = Some(v))),
    }
}

#[component]
pub fn WhatsAppConfigPage() -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let toaster = use_toaster();
    let session = use_session().session;

    let cfg = create_rw_signal(whatsapp::with_defaults(WhatsAppConfig::default()));
    let error_msg = create_rw_signal(None::<String>);
    let saving = create_rw_signal(false);

    let stored = {
        let api = api.clone();
        create_local_resource(
            move || (session.with(|s| s.company_id()), queries.version("wa-config")),
            move |(empresa, _)| {
                let api = api.clone();
                async move {
                    match empresa {
                        Some(e) => api.whatsapp_config(e).await.map(Some),
                        None => Ok(None),
                    }
                }
            },
        )
    };

    create_effect(move |_| {
        if let Some(Ok(Some(found))) = stored.get() {
            cfg.set(whatsapp::with_defaults(found));
        }
    });

    let hours = Binding {
        value: Signal::derive(move || cfg.with(|c| c.horas_anticipacion.to_string())),
        set: Callback::new(move |v: String| cfg.update(|c| c.horas_anticipacion = v.trim().parse().unwrap_or(0))),
    };
    let template = config_text(cfg, |c| &mut c.plantilla_recordatorio);

    let save = Callback::new(move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if saving.get_untracked() {
            return;
        }
        let Some(empresa) = session.with_untracked(|s| s.company_id()) else {
            error_msg.set(Some("Seleccione una empresa".into()));
            return;
        };
        let current = cfg.get_untracked();
        saving.set(true);
        error_msg.set(None);
        let api = api.clone();
        spawn_local(async move {
            match whatsapp::save_config(&api, &current, empresa).await {
                Ok(saved) => {
                    cfg.set(saved);
                    toaster.success("Configuración guardada correctamente");
                }
                Err(e) => {
                    error!(empresa_id = empresa, error = %e, "whatsapp config save failed");
                    error_msg.set(Some(e.user_message(whatsapp::SAVE_ERROR)));
                }
            }
            saving.set(false);
        });
    });

    let allowed = move || session.with(|s| s.is_superadmin());

    view! {
        <div class="page">
            <PageHeader title="Configuración de WhatsApp" subtitle="Credenciales de WhatsApp Business y recordatorios"/>
            <Show
                when=allowed
                fallback=|| view! { <EmptyState message="Solo un superadministrador puede modificar esta configuración"/> }
            >
                <Suspense fallback=|| view! { <Loading/> }>
                    {move || stored.get().and_then(|res| res.err()).map(|e| view! {
                        <ErrorState message=e.user_message("Error al cargar la configuración") on_retry=move |_| stored.refetch()/>
                    })}
                </Suspense>
                <form class="form card" on:submit=move |ev| save.call(ev)>
                    <FormError message=error_msg/>
                    <label class="checkbox">
                        <input
                            type="checkbox"
                            prop:checked=move || cfg.with(|c| c.habilitado.is_yes())
                            on:change=move |ev| cfg.update(|c| c.habilitado = Flag::from(event_target_checked(&ev)))
                        />
                        " Habilitar envío de mensajes"
                    </label>
                    <div class="form-grid">
                        <Field label="Phone Number ID" bind=config_text(cfg, |c| &mut c.phone_number_id)/>
                        <Field label="WABA ID" bind=config_text(cfg, |c| &mut c.waba_id)/>
                        <Field
                            label="Access Token"
                            kind="password"
                            placeholder="Dejar vacío para conservar el actual"
                            bind=config_text(cfg, |c| &mut c.access_token)
                        />
                        <Field label="Horas de anticipación" kind="number" bind=hours/>
                    </div>
                    <TextArea label="Plantilla de recordatorio" rows=4 bind=template/>
                    <p class="muted">
                        "Variables disponibles: "
                        {TEMPLATE_VARIABLES.join(", ")}
                    </p>
                    <div class="preview">
                        <span class="field-label">"Vista previa"</span>
                        <p>{move || whatsapp::preview(&template.value.get())}</p>
                    </div>
                    <div class="form-actions">
                        <button type="submit" class="btn btn-primary" prop:disabled=move || saving.get()>
                            {move || if saving.get() { "Guardando..." } else { "Guardar configuración" }}
                        </button>
                    </div>
                </form>
            </Show>
        </div>
    }
}
