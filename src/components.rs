//! Small building blocks shared by the pages.
use leptos::*;

use crate::models::Flag;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
}

const TOAST_MS: u32 = 3500;

/// One toast at a time; a newer toast replaces the current one and the
/// older timer does not dismiss it.
#[derive(Clone, Copy)]
pub struct Toaster {
    current: RwSignal<Option<Toast>>,
    next_id: StoredValue<u64>,
}

impl Toaster {
    pub fn new() -> Self {
        Self { current: create_rw_signal(None), next_id: store_value(0) }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show(ToastKind::Success, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show(ToastKind::Error, message.into());
    }

    fn show(&self, kind: ToastKind, message: String) {
        let id = self.next_id.get_value() + 1;
        self.next_id.set_value(id);
        self.current.set(Some(Toast { id, kind, message }));

        let current = self.current;
        spawn_local(async move {
            gloo_timers::future::TimeoutFuture::new(TOAST_MS).await;
            if current.get_untracked().is_some_and(|t| t.id == id) {
                current.set(None);
            }
        });
    }

    pub fn dismiss(&self) {
        self.current.set(None);
    }
}

impl Default for Toaster {
    fn default() -> Self {
        Self::new()
    }
}

pub fn use_toaster() -> Toaster {
    use_context::<Toaster>().unwrap_or_default()
}

#[component]
pub fn ToastOutlet() -> impl IntoView {
    let toaster = use_toaster();
    view! {
        {move || toaster.current.get().map(|t| {
            let class = match t.kind {
                ToastKind::Success => "toast toast-success",
                ToastKind::Error => "toast toast-error",
            };
            view! {
                <div class=class role="status" on:click=move |_| toaster.dismiss()>
                    {t.message}
                </div>
            }
        })}
    }
}

#[component]
pub fn Loading(#[prop(default = "Cargando...")] label: &'static str) -> impl IntoView {
    view! {
        <div class="loading">
            <div class="spinner"></div>
            <span>{label}</span>
        </div>
    }
}

#[component]
pub fn ErrorState(#[prop(into)] message: String, #[prop(optional, into)] on_retry: Option<Callback<()>>) -> impl IntoView {
    view! {
        <div class="error-state" role="alert">
            <p>{message}</p>
            {on_retry.map(|cb| view! {
                <button class="btn btn-secondary" on:click=move |_| cb.call(())>"Reintentar"</button>
            })}
        </div>
    }
}

#[component]
pub fn EmptyState(#[prop(into)] message: String) -> impl IntoView {
    view! { <div class="empty-state">{message}</div> }
}

#[component]
pub fn StatCard(
    #[prop(into)] label: String,
    #[prop(into)] value: Signal<String>,
    #[prop(default = "")] accent: &'static str,
) -> impl IntoView {
    view! {
        <div class=format!("card stat-card {}", accent)>
            <span class="stat-label">{label}</span>
            <span class="stat-value">{move || value.get()}</span>
        </div>
    }
}

#[component]
pub fn PageHeader(
    #[prop(into)] title: String,
    #[prop(optional, into)] subtitle: Option<String>,
    #[prop(optional)] children: Option<Children>,
) -> impl IntoView {
    view! {
        <div class="page-header">
            <div>
                <h1>{title}</h1>
                {subtitle.map(|s| view! { <p class="muted">{s}</p> })}
            </div>
            <div class="page-actions">{children.map(|c| c())}</div>
        </div>
    }
}

#[component]
pub fn Modal(#[prop(into)] title: String, #[prop(into)] on_close: Callback<()>, children: Children) -> impl IntoView {
    view! {
        <div class="modal-backdrop">
            <div class="modal" role="dialog">
                <div class="modal-header">
                    <h2>{title}</h2>
                    <button class="btn-icon" title="Cerrar" on:click=move |_| on_close.call(())>"×"</button>
                </div>
                <div class="modal-body">{children()}</div>
            </div>
        </div>
    }
}

#[component]
pub fn FormError(#[prop(into)] message: Signal<Option<String>>) -> impl IntoView {
    view! {
        {move || message.get().map(|m| view! { <div class="form-error" role="alert">{m}</div> })}
    }
}

/// Read/write pair for one text field of a form signal.
#[derive(Clone, Copy)]
pub struct Binding {
    pub value: Signal<String>,
    pub set: Callback<String>,
}

/// `bind!(form, field)` or `bind!(form, nested.field)` over an
/// `RwSignal` holding a form struct.
macro_rules! bind {
    ($form:expr, $($field:ident).+) => {{
        let form = $form;
        $crate::components::Binding {
            value: ::leptos::Signal::derive(move || form.with(|f| f.$($field).+.clone())),
            set: ::leptos::Callback::new(move |v: String| form.update(|f| f.$($field).+ = v)),
        }
    }};
}
pub(crate) use bind;

#[component]
pub fn Field(
    #[prop(into)] label: String,
    bind: Binding,
    #[prop(default = "text")] kind: &'static str,
    #[prop(optional, into)] placeholder: String,
    #[prop(optional)] required: bool,
    #[prop(optional, into)] disabled: MaybeSignal<bool>,
) -> impl IntoView {
    view! {
        <label class="field">
            <span class="field-label">{label}{required.then_some(" *")}</span>
            <input
                type=kind
                placeholder=placeholder
                prop:value=move || bind.value.get()
                prop:disabled=move || disabled.get()
                on:input=move |ev| bind.set.call(event_target_value(&ev))
            />
        </label>
    }
}

#[component]
pub fn TextArea(#[prop(into)] label: String, bind: Binding, #[prop(default = 3)] rows: u32) -> impl IntoView {
    view! {
        <label class="field">
            <span class="field-label">{label}</span>
            <textarea
                rows=rows
                prop:value=move || bind.value.get()
                on:input=move |ev| bind.set.call(event_target_value(&ev))
            ></textarea>
        </label>
    }
}

/// `(value, label)` pairs from a fixed list of codes shown as-is.
pub fn plain_options(codes: &[&str]) -> Vec<(String, String)> {
    codes.iter().map(|c| (c.to_string(), c.to_string())).collect()
}

/// Select over `(value, label)` pairs. The empty value is the placeholder.
#[component]
pub fn SelectField(
    #[prop(into)] label: String,
    #[prop(into)] options: MaybeSignal<Vec<(String, String)>>,
    bind: Binding,
    #[prop(optional, into)] placeholder: Option<String>,
    #[prop(optional, into)] disabled: MaybeSignal<bool>,
) -> impl IntoView {
    let value = bind.value;
    view! {
        <label class="field">
            <span class="field-label">{label}</span>
            <select
                prop:disabled=move || disabled.get()
                on:change=move |ev| bind.set.call(event_target_value(&ev))
            >
                {placeholder.map(|p| view! { <option value="" selected=move || value.get().is_empty()>{p}</option> })}
                {move || options.get().into_iter().map(|(v, l)| {
                    let selected = v == value.get();
                    view! { <option value=v selected=selected>{l}</option> }
                }).collect_view()}
            </select>
        </label>
    }
}

#[component]
pub fn StatusBadge(activo: Flag, #[prop(default = ("Activo", "Inactivo"))] labels: (&'static str, &'static str)) -> impl IntoView {
    let (class, text) = if activo.is_yes() { ("badge badge-success", labels.0) } else { ("badge badge-muted", labels.1) };
    view! { <span class=class>{text}</span> }
}

/// Reads a number from a form input; blank or garbage reads as zero.
pub fn parse_amount(raw: &str) -> f64 {
    raw.trim().replace(',', ".").parse().unwrap_or(0.0)
}

/// Text for a live amount input. What the user typed is kept while it still
/// reads as `value`, so a cleared field or a trailing "1." survives re-render.
pub fn amount_text(typed: &str, value: f64) -> String {
    if parse_amount(typed) == value {
        typed.to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amounts_accept_comma_decimals() {
        assert_eq!(parse_amount("12,5"), 12.5);
        assert_eq!(parse_amount(" 3 "), 3.0);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
    }

    #[test]
    fn amount_text_keeps_partial_typing() {
        assert_eq!(amount_text("", 0.0), "");
        assert_eq!(amount_text("1.", 1.0), "1.");
        assert_eq!(amount_text("2,5", 2.5), "2,5");
        assert_eq!(amount_text("", 1.0), "1");
        assert_eq!(amount_text("3", 1500.0), "1500");
    }
}
