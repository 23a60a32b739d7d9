use leptos::*;
use leptos_router::*;
use tracing::error;

use crate::app::use_api;
use crate::articles::{self, ArticleForm, CategoryForm};
use crate::cache::use_query_client;
use crate::components::{
    bind, use_toaster, Binding, EmptyState, ErrorState, Field, FormError, Loading, Modal, PageHeader, SelectField,
    StatusBadge, TextArea,
};
use crate::error::ApiError;
use crate::format::guaranies;
use crate::models::{Article, Category};
use crate::session::use_session;

use super::confirm;

#[component]
pub fn ArticlesPage() -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let toaster = use_toaster();
    let session = use_session().session;

    let query = create_rw_signal(String::new());
    let category = create_rw_signal(String::new());
    let form = create_rw_signal(ArticleForm::default());
    let open = create_rw_signal(false);
    let categories_open = create_rw_signal(false);
    let error_msg = create_rw_signal(None::<String>);
    let saving = create_rw_signal(false);

    let list = {
        let api = api.clone();
        create_local_resource(
            move || (category.get(), queries.version("articulos")),
            move |(selected, _)| {
                let api = api.clone();
                async move { api.articles(selected.trim().parse().ok(), None).await.map(|p| p.items) }
            },
        )
    };

    let categories = {
        let api = api.clone();
        create_local_resource(
            move || queries.version("categorias"),
            move |_| {
                let api = api.clone();
                async move { api.categories().await.map(|p| p.items) }
            },
        )
    };

    let units = {
        let api = api.clone();
        create_local_resource(
            move || queries.version("unidades"),
            move |_| {
                let api = api.clone();
                async move { api.measure_units().await.map(|p| p.items) }
            },
        )
    };

    let category_options = Signal::derive(move || {
        categories.get().and_then(Result::ok).map(|c| articles::category_options(&c)).unwrap_or_default()
    });
    let unit_options = Signal::derive(move || {
        articles::unit_options(&units.get().and_then(Result::ok).unwrap_or_default())
    });
    let category_filter = Binding {
        value: category.into(),
        set: Callback::new(move |v: String| category.set(v)),
    };

    let open_form = move |initial: ArticleForm| {
        form.set(initial);
        error_msg.set(None);
        open.set(true);
    };

    let save = {
        let api = api.clone();
        Callback::new(move |ev: ev::SubmitEvent| {
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
            let api = api.clone();
            let usuario = session.with_untracked(|s| s.user_id());
            spawn_local(async move {
                match articles::save(&api, &current, usuario).await {
                    Ok(res) => {
                        open.set(false);
                        queries.invalidate("articulos");
                        queries.invalidate("inventario");
                        toaster.success(res.message.unwrap_or_else(|| "Artículo guardado correctamente".into()));
                    }
                    Err(e) => {
                        error!(error = %e, "article save failed");
                        error_msg.set(Some(e.user_message(articles::SAVE_ERROR)));
                    }
                }
                saving.set(false);
            });
        })
    };

    let toggle = Callback::new(move |a: Article| {
        let api = api.clone();
        let usuario = session.with_untracked(|s| s.user_id());
        spawn_local(async move {
            match articles::toggle(&api, &a, usuario).await {
                Ok(_) => {
                    queries.invalidate("articulos");
                    toaster.success("Estado actualizado");
                }
                Err(e) => {
                    error!(articulo_id = a.articulo_id, error = %e, "article toggle failed");
                    toaster.error(e.user_message(articles::SAVE_ERROR));
                }
            }
        });
    });

    let table = move |rows: Vec<Article>| {
        view! {
            <table class="table">
                <thead>
                    <tr>
                        <th>"Artículo"</th>
                        <th>"Categoría"</th>
                        <th>"Unidad"</th>
                        <th class="num">"Costo"</th>
                        <th class="num">"Precio"</th>
                        <th>"Estado"</th>
                        <th></th>
                    </tr>
                </thead>
                <tbody>
                    {rows.into_iter().map(|a| {
                        let for_edit = ArticleForm::from(&a);
                        let for_toggle = a.clone();
                        let active = a.activo.is_yes();
                        view! {
                            <tr>
                                <td><strong>{a.nombre.clone()}</strong><br/><span class="muted">{format!("#{}", a.codigo)}</span></td>
                                <td>{a.categoria_nombre.clone().unwrap_or_default()}</td>
                                <td>{a.unidad_medida.clone().unwrap_or_default()}</td>
                                <td class="num">{guaranies(a.costo_unitario.unwrap_or(0.0))}</td>
                                <td class="num">{guaranies(a.precio_venta.unwrap_or(0.0))}</td>
                                <td><StatusBadge activo=a.activo/></td>
                                <td class="actions">
                                    <button class="btn-icon" on:click=move |_| open_form(for_edit.clone())>"Editar"</button>
                                    <button class="btn-icon" on:click=move |_| toggle.call(for_toggle.clone())>
                                        {if active { "Desactivar" } else { "Activar" }}
                                    </button>
                                </td>
                            </tr>
                        }
                    }).collect_view()}
                </tbody>
            </table>
        }
    };

    view! {
        <div class="page">
            <PageHeader title="Artículos" subtitle="Catálogo de insumos y materiales">
                <A href="/compras/facturas" class="btn btn-secondary">"Volver"</A>
                <button class="btn btn-secondary" on:click=move |_| categories_open.set(true)>"Categorías"</button>
                <button class="btn btn-primary" on:click=move |_| open_form(ArticleForm::default())>"+ Nuevo Artículo"</button>
            </PageHeader>
            <div class="card">
                <div class="form-grid">
                    <input
                        class="search"
                        type="search"
                        placeholder="Buscar por nombre o código..."
                        prop:value=move || query.get()
                        on:input=move |ev| query.set(event_target_value(&ev))
                    />
                    <SelectField label="Categoría" options=category_options bind=category_filter placeholder="Todas las categorías"/>
                </div>
                <Transition fallback=|| view! { <Loading/> }>
                    {move || list.get().map(|res| match res {
                        Err(e) => view! {
                            <ErrorState message=e.user_message("Error al cargar artículos") on_retry=move |_| list.refetch()/>
                        }.into_view(),
                        Ok(all) => {
                            let rows: Vec<Article> = articles::filter(&all, &query.get()).into_iter().cloned().collect();
                            if rows.is_empty() {
                                view! { <EmptyState message="No se encontraron artículos"/> }.into_view()
                            } else {
                                table(rows).into_view()
                            }
                        }
                    })}
                </Transition>
            </div>

            <Show when=move || open.get()>
                <Modal
                    title={if form.with_untracked(|f| f.articulo_id.is_some()) { "Editar Artículo" } else { "Nuevo Artículo" }}
                    on_close=move |_| open.set(false)
                >
                    <form class="form" on:submit=move |ev| save.call(ev)>
                        <FormError message=error_msg/>
                        <div class="form-grid">
                            <Field label="Código" placeholder="Automático si se deja vacío" bind=bind!(form, codigo)/>
                            <SelectField label="Unidad de medida" options=unit_options bind=bind!(form, unidad_medida)/>
                            <Field label="Nombre" bind=bind!(form, nombre) required=true/>
                            <SelectField label="Categoría" options=category_options bind=bind!(form, categoria_id) placeholder="Seleccione"/>
                            <Field label="Costo unitario (Gs)" kind="number" bind=bind!(form, costo_unitario)/>
                            <Field label="Precio de venta (Gs)" kind="number" bind=bind!(form, precio_venta)/>
                            <Field label="Cantidad mínima" kind="number" bind=bind!(form, cantidad_minima)/>
                            <Field label="Cantidad máxima" kind="number" bind=bind!(form, cantidad_maxima)/>
                        </div>
                        <TextArea label="Descripción" bind=bind!(form, descripcion)/>
                        <div class="form-actions">
                            <button type="button" class="btn btn-secondary" on:click=move |_| open.set(false)>"Cancelar"</button>
                            <button type="submit" class="btn btn-primary" prop:disabled=move || saving.get()>
                                {move || if saving.get() { "Guardando..." } else { "Guardar" }}
                            </button>
                        </div>
                    </form>
                </Modal>
            </Show>

            <Show when=move || categories_open.get()>
                <Modal title="Categorías" on_close=move |_| categories_open.set(false)>
                    <CategoryManager categories=categories/>
                </Modal>
            </Show>
        </div>
    }
}

/// Create, rename and delete article categories.
#[component]
fn CategoryManager(categories: Resource<u64, Result<Vec<Category>, ApiError>>) -> impl IntoView {
    let api = use_api();
    let queries = use_query_client();
    let toaster = use_toaster();

    let form = create_rw_signal(CategoryForm::default());
    let error_msg = create_rw_signal(None::<String>);
    let saving = create_rw_signal(false);

    let save = {
        let api = api.clone();
        Callback::new(move |ev: ev::SubmitEvent| {
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
            spawn_local(async move {
                match articles::save_category(&api, &current).await {
                    Ok(_) => {
                        form.set(CategoryForm::default());
                        queries.invalidate("categorias");
                        queries.invalidate("articulos");
                        toaster.success("Categoría guardada correctamente");
                    }
                    Err(e) => {
                        error!(error = %e, "category save failed");
                        error_msg.set(Some(e.user_message(articles::CATEGORY_SAVE_ERROR)));
                    }
                }
                saving.set(false);
            });
        })
    };

    let remove = Callback::new(move |c: Category| {
        if !confirm(articles::CONFIRM_CATEGORY_DELETE) {
            return;
        }
        let api = api.clone();
        spawn_local(async move {
            match articles::delete_category(&api, c.categoria_id).await {
                Ok(_) => {
                    queries.invalidate("categorias");
                    toaster.success("Categoría eliminada");
                }
                Err(e) => {
                    error!(categoria_id = c.categoria_id, error = %e, "category delete failed");
                    toaster.error(e.user_message(articles::CATEGORY_DELETE_ERROR));
                }
            }
        });
    });

    view! {
        <form class="form" on:submit=move |ev| save.call(ev)>
            <FormError message=error_msg/>
            <Field label="Nombre" bind=bind!(form, nombre) required=true/>
            <Field label="Descripción" bind=bind!(form, descripcion)/>
            <div class="form-actions">
                <Show when=move || form.with(|f| f.categoria_id.is_some())>
                    <button type="button" class="btn btn-secondary" on:click=move |_| form.set(CategoryForm::default())>"Cancelar edición"</button>
                </Show>
                <button type="submit" class="btn btn-primary" prop:disabled=move || saving.get()>
                    {move || if form.with(|f| f.categoria_id.is_some()) { "Actualizar" } else { "Agregar" }}
                </button>
            </div>
        </form>
        <Suspense fallback=|| view! { <Loading/> }>
            {move || categories.get().map(|res| match res {
                Err(e) => view! {
                    <ErrorState message=e.user_message("Error al cargar categorías") on_retry=move |_| categories.refetch()/>
                }.into_view(),
                Ok(list) if list.is_empty() => view! { <EmptyState message="No hay categorías registradas"/> }.into_view(),
                Ok(list) => view! {
                    <div class="list">
                        {list.into_iter().map(|c| {
                            let for_edit = CategoryForm::from(&c);
                            let for_remove = c.clone();
                            view! {
                                <div class="detail-row">
                                    <span>
                                        <strong>{c.nombre.to_uppercase()}</strong>
                                        <br/>
                                        <span class="muted">{c.descripcion.clone().unwrap_or_default()}</span>
                                    </span>
                                    <span class="actions">
                                        <button type="button" class="btn-icon" on:click=move |_| form.set(for_edit.clone())>"Editar"</button>
                                        <button type="button" class="btn-icon danger" on:click=move |_| remove.call(for_remove.clone())>"Eliminar"</button>
                                    </span>
                                </div>
                            }
                        }).collect_view()}
                    </div>
                }.into_view(),
            })}
        </Suspense>
    }
}
