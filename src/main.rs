use leptos::*;
use odonto_console::app::App;
use odonto_console::config::AppConfig;

fn main() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
    let config = AppConfig::from_env();
    mount_to_body(move || view! { <App config=config.clone()/> })
}
