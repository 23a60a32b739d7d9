//! One module per screen.
mod articles;
mod companies;
mod context;
mod dashboard;
mod inventory;
mod login;
mod patients;
mod purchases;
mod reports;
mod suppliers;
mod whatsapp;

pub use articles::ArticlesPage;
pub use companies::{BranchesPage, CompaniesPage};
pub use context::ContextSelection;
pub use dashboard::Dashboard;
pub use inventory::InventoryPage;
pub use login::LoginPage;
pub use patients::{PatientDetail, PatientFormPage, PatientList};
pub use purchases::{NewPurchase, PurchaseList};
pub use reports::{FinancialReport, InventoryReport, PatientReport, ReportsIndex};
pub use suppliers::SuppliersPage;
pub use whatsapp::{WhatsAppConfigPage, WhatsAppPage};

use leptos::*;
use leptos_router::A;

/// Browser confirm dialog. Outside the browser there is nobody to ask.
#[cfg(target_arch = "wasm32")]
pub(crate) fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn confirm(_message: &str) -> bool {
    true
}

/// Numeric route/query parameter; anything else reads as absent.
pub(crate) fn parse_id(raw: Option<String>) -> Option<i64> {
    raw.and_then(|s| s.trim().parse().ok())
}

#[component]
pub fn NoAccess() -> impl IntoView {
    view! {
        <div class="centered-page">
            <div class="card">
                <h1>"Acceso denegado"</h1>
                <p class="muted">"No tiene permisos para acceder a esta sección. Consulte con el administrador."</p>
                <A href="/" class="btn btn-primary">"Volver al inicio"</A>
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_from_params() {
        assert_eq!(parse_id(Some("42".into())), Some(42));
        assert_eq!(parse_id(Some("nuevo".into())), None);
        assert_eq!(parse_id(None), None);
    }
}
