use leptos::*;
use leptos_router::*;

use crate::app::use_api;
use crate::components::FormError;
use crate::session::{self, use_session};

const LOGIN_ERROR: &str = "Usuario o contraseña incorrectos";

#[component]
pub fn LoginPage() -> impl IntoView {
    let api = use_api();
    let ctx = use_session();
    let navigate = use_navigate();

    let username = create_rw_signal(String::new());
    let password = create_rw_signal(String::new());
    let error = create_rw_signal(None::<String>);
    let busy = create_rw_signal(false);

    let already_in = {
        let session = ctx.session;
        move || session.with(|s| s.is_authenticated())
    };

    let on_submit = move |ev: ev::SubmitEvent| {
        ev.prevent_default();
        if busy.get_untracked() {
            return;
        }
        busy.set(true);
        error.set(None);

        let api = api.clone();
        let ctx = ctx.clone();
        let navigate = navigate.clone();
        let (user, pass) = (username.get_untracked(), password.get_untracked());
        spawn_local(async move {
            match session::login(&api, &ctx.store, &user, &pass).await {
                Ok(s) => {
                    ctx.session.set(s);
                    navigate("/seleccion-contexto", NavigateOptions { replace: true, ..Default::default() });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "login failed");
                    error.set(Some(e.user_message(LOGIN_ERROR)));
                }
            }
            busy.set(false);
        });
    };

    view! {
        {move || already_in().then(|| view! { <Redirect path="/"/> })}
        <div class="centered-page login-page">
            <form class="card login-card" on:submit=on_submit>
                <h1>"OdontoSys"</h1>
                <p class="muted">"Ingrese sus credenciales para continuar"</p>
                <FormError message=error/>
                <label class="field">
                    <span class="field-label">"Usuario"</span>
                    <input
                        type="text"
                        autocomplete="username"
                        prop:value=move || username.get()
                        on:input=move |ev| username.set(event_target_value(&ev))
                    />
                </label>
                <label class="field">
                    <span class="field-label">"Contraseña"</span>
                    <input
                        type="password"
                        autocomplete="current-password"
                        prop:value=move || password.get()
                        on:input=move |ev| password.set(event_target_value(&ev))
                    />
                </label>
                <button type="submit" class="btn btn-primary" prop:disabled=move || busy.get()>
                    {move || if busy.get() { "Ingresando..." } else { "Ingresar" }}
                </button>
            </form>
        </div>
    }
}
