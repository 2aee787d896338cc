use chrono::NaiveDate;
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use tracing::{info, warn};

use crate::analysis::{self, SidebarOrder};
use crate::config::EditorConfig;
use crate::editor_core::{byte_to_utf16, utf16_to_byte, Selection};
use crate::error::SyncOp;
use crate::link_flow::{slugify, LinkFlow};
use crate::markdown;
use crate::search::SearchHit;
use crate::session::Session;
use crate::sitemap::{FieldUpdate, PageRecord};
use crate::sync::{self, HttpGateway, ServerStatus, SitemapGateway};

const APP_CSS: &str = r#"
:root {
    --sidebar-width: 300px;
    --topbar-height: 48px;
    --radius-md: 6px;
    --accent-color: #6366f1;
    --bg-primary: #ffffff;
    --bg-secondary: #f4f5f7;
    --border-color: #e2e4e9;
    --text-primary: #1a1a1a;
    --text-secondary: #4b5563;
    --text-muted: #9ca3af;
    --error-color: #b91c1c;
    --font-editor: ui-monospace, SFMono-Regular, Menlo, monospace;
}
body { margin: 0; font-family: system-ui, sans-serif; }
button { cursor: pointer; }
button:disabled { cursor: default; opacity: 0.5; }
.app-layout { display: flex; height: 100vh; width: 100vw; background: var(--bg-primary); color: var(--text-primary); }
.sidebar { width: var(--sidebar-width); border-right: 1px solid var(--border-color); display: flex; flex-direction: column; background: var(--bg-secondary); }
.sidebar-header { height: var(--topbar-height); display: flex; align-items: center; justify-content: space-between; padding: 0 1rem; border-bottom: 1px solid var(--border-color); font-weight: 600; color: var(--accent-color); }
.sidebar-header button { background: transparent; border: none; font-size: 1.2rem; color: var(--text-muted); }
.sidebar-tools { display: flex; gap: 0.5rem; padding: 0.5rem; }
.sidebar-tools input { flex: 1; min-width: 0; }
.file-list { flex: 1; overflow-y: auto; padding: 0.5rem; }
.file-item { padding: 0.4rem 0.75rem; cursor: pointer; border-radius: var(--radius-md); margin-bottom: 4px; font-size: 0.9rem; color: var(--text-secondary); display: flex; flex-direction: column; }
.file-item.active { background: var(--accent-color); color: white; }
.file-path, .file-links { font-size: 0.75rem; opacity: 0.7; }
.sidebar-stats { border-top: 1px solid var(--border-color); padding: 0.5rem 1rem; font-size: 0.75rem; color: var(--text-muted); }
.main-pane { flex: 1; display: flex; flex-direction: column; min-width: 0; }
.topbar { height: var(--topbar-height); border-bottom: 1px solid var(--border-color); display: flex; align-items: center; gap: 0.75rem; padding: 0 1.5rem; font-size: 0.9rem; }
.topbar .primary { background: var(--accent-color); color: white; border: none; border-radius: var(--radius-md); padding: 0.3rem 0.9rem; }
.notice { flex: 1; color: var(--text-secondary); }
.notice.error { color: var(--error-color); }
.server-status { color: var(--text-muted); font-size: 0.8rem; }
.empty-pane { flex: 1; display: flex; align-items: center; justify-content: center; color: var(--text-muted); }
.page-form { display: grid; grid-template-columns: 6rem 1fr; gap: 0.4rem 0.75rem; padding: 1rem 1.5rem; border-bottom: 1px solid var(--border-color); align-items: center; }
.page-form label { font-weight: 600; font-size: 0.85rem; }
.page-form .path { font-family: var(--font-editor); color: var(--text-muted); }
.page-form textarea { font-family: var(--font-editor); min-height: 3.5rem; }
.body-tabs { display: flex; gap: 0.5rem; padding: 0.5rem 1.5rem; }
.body-tabs .active { font-weight: 700; }
.body-tabs .spacer { flex: 1; }
.editor-container { flex: 1; position: relative; overflow: hidden; }
.markdown-highlight-layer, .raw-editor { position: absolute; inset: 0; padding: 1.5rem 3rem; font-family: var(--font-editor); font-size: 15px; line-height: 1.6; white-space: pre-wrap; word-wrap: break-word; box-sizing: border-box; margin: 0; }
.markdown-highlight-layer { pointer-events: none; overflow-y: hidden; color: var(--text-primary); }
.raw-editor { color: transparent; background: transparent; caret-color: var(--text-primary); outline: none; border: none; resize: none; overflow-y: auto; }
.preview { flex: 1; overflow-y: auto; padding: 1.5rem 3rem; }
.hl-h1, .hl-h2, .hl-h3, .hl-h4 { font-weight: 700; color: #111827; }
.hl-bold { font-weight: 700; color: #4f46e5; }
.hl-italic { font-style: italic; }
.hl-code { background: #e9ecef; border-radius: 3px; }
.hl-link { color: #0e7490; }
.hl-quote { color: var(--text-muted); }
.link-modal { position: fixed; top: 15vh; left: 50%; transform: translateX(-50%); width: min(520px, 90vw); background: var(--bg-primary); border: 1px solid var(--border-color); border-radius: var(--radius-md); box-shadow: 0 12px 40px rgba(0,0,0,0.2); padding: 1rem; display: flex; flex-direction: column; gap: 0.5rem; }
.link-modal ul { list-style: none; margin: 0; padding: 0; max-height: 40vh; overflow-y: auto; }
.link-modal li { padding: 0.4rem 0.5rem; border-radius: var(--radius-md); cursor: pointer; display: flex; justify-content: space-between; gap: 1rem; }
.link-modal li:hover { background: var(--bg-secondary); }
.link-modal .hint { font-size: 0.75rem; color: var(--text-muted); }
"#;

#[derive(Clone, Debug, PartialEq)]
struct Notice {
    text: String,
    is_error: bool,
}

impl Notice {
    fn info(text: impl Into<String>) -> Option<Self> {
        Some(Self {
            text: text.into(),
            is_error: false,
        })
    }

    fn error(text: impl Into<String>) -> Option<Self> {
        Some(Self {
            text: text.into(),
            is_error: true,
        })
    }
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Current textarea selection as byte offsets into its value.
fn read_caret(el: &web_sys::HtmlTextAreaElement) -> Option<Selection> {
    let text = el.value();
    let start = el.selection_start().ok().flatten()?;
    let end = el.selection_end().ok().flatten()?;
    Some(Selection::new(
        utf16_to_byte(&text, start as usize),
        utf16_to_byte(&text, end as usize),
    ))
}

/// Moves the DOM caret once the textarea has re-rendered `text`.
fn place_caret(textarea_ref: NodeRef<html::Textarea>, text: String, selection: Selection) {
    request_animation_frame(move || {
        if let Some(el) = textarea_ref.get_untracked() {
            let start = byte_to_utf16(&text, selection.start) as u32;
            let end = byte_to_utf16(&text, selection.end) as u32;
            let _ = el.focus();
            let _ = el.set_selection_range(start, end);
        }
    });
}

/// Takes the busy flag for `op`, reporting a refusal in the notice line.
fn claim(session: RwSignal<Session>, notice: RwSignal<Option<Notice>>, op: SyncOp) -> bool {
    match session.try_update(|s| s.begin_sync(op)) {
        Some(Ok(())) => true,
        Some(Err(err)) => {
            warn!(error = %err, "sync refused");
            notice.set(Notice::error(err.to_string()));
            false
        }
        None => false,
    }
}

#[component]
pub fn App(config: EditorConfig) -> impl IntoView {
    let suffix = StoredValue::new(config.page_suffix.clone());
    let gateway = StoredValue::new(HttpGateway::new(&config.api_base));
    let session = RwSignal::new(Session::from_config(&config));
    let link_flow = RwSignal::new(LinkFlow::default());
    let notice = RwSignal::new(None::<Notice>);
    let server_status = RwSignal::new(None::<ServerStatus>);
    let sidebar_order = RwSignal::new(SidebarOrder::default());
    let sidebar_filter = RwSignal::new(String::new());
    let preview = RwSignal::new(false);
    let caret = RwSignal::new(None::<Selection>);
    let scroll_top = RwSignal::new(0);
    let textarea_ref = NodeRef::<html::Textarea>::new();
    let search_ref = NodeRef::<html::Input>::new();

    let busy = Memo::new(move |_| session.with(|s| s.busy()));
    let selected = Memo::new(move |_| session.with(|s| s.selected().map(str::to_string)));
    let has_page = Memo::new(move |_| session.with(|s| s.selected_page().is_some()));
    let inbound = Memo::new(move |_| session.with(|s| analysis::inbound_links(s.store().document())));
    let stats = Memo::new(move |_| session.with(|s| analysis::content_stats(s.store().document())));

    let page_field = move |read: fn(&PageRecord) -> String| {
        session.with(|s| s.selected_page().map(read).unwrap_or_default())
    };

    let refresh_status = move || {
        let gateway = gateway.get_value();
        spawn_local(async move {
            match gateway.fetch_status().await {
                Ok(status) => server_status.set(Some(status)),
                Err(err) => {
                    warn!(error = %err, "status check failed");
                    server_status.set(None);
                }
            }
        });
    };

    let reload = move || {
        if !claim(session, notice, SyncOp::Load) {
            return;
        }
        notice.set(Notice::info("Loading sitemap…"));
        let gateway = gateway.get_value();
        spawn_local(async move {
            let result = sync::load_document(&gateway).await;
            match session.try_update(|s| s.finish_load(result)) {
                Some(Ok(pages)) => notice.set(Notice::info(format!("Loaded {pages} pages"))),
                Some(Err(err)) => notice.set(Notice::error(err.to_string())),
                None => {}
            }
            caret.set(None);
            refresh_status();
        });
    };

    let save = move || {
        if !claim(session, notice, SyncOp::Save) {
            return;
        }
        notice.set(Notice::info("Saving…"));
        let doc = session.with_untracked(|s| s.store().document().clone());
        let gateway = gateway.get_value();
        spawn_local(async move {
            let result = sync::save_document(&gateway, &doc).await;
            match session.try_update(|s| s.finish_save(result)) {
                Some(Ok(())) => notice.set(Notice::info("Saved, the site is being regenerated")),
                Some(Err(err)) => notice.set(Notice::error(err.to_string())),
                None => {}
            }
            refresh_status();
        });
    };

    Effect::new(move |_| {
        info!("initial sitemap load");
        reload();
    });

    let select_page = move |path: String| {
        session.update(|s| s.select(&path));
        caret.set(None);
        link_flow.update(LinkFlow::close);
    };

    let edit = move |update: FieldUpdate| {
        session.update(|s| {
            s.edit(update);
        });
    };

    let create_new_page = move || {
        let Ok(Some(raw)) = window().prompt_with_message("New page path (e.g. events/summer-camp)") else {
            return;
        };
        if raw.trim().is_empty() {
            return;
        }
        match session.try_update(|s| s.create_page(&raw, today())) {
            Some(Ok(path)) => {
                notice.set(Notice::info(format!("Created {path}")));
                select_page(path);
            }
            Some(Err(err)) => notice.set(Notice::error(err.to_string())),
            None => {}
        }
    };

    let delete_page = move |path: String| {
        let result = session.try_update(|s| {
            s.delete_page(&path, |page| {
                window()
                    .confirm_with_message(&format!(
                        "Delete \"{}\" ({path})? This cannot be undone.",
                        page.title
                    ))
                    .unwrap_or(false)
            })
        });
        match result {
            Some(Ok(Some(_))) => {
                caret.set(None);
                notice.set(Notice::info(format!("Deleted {path}, save to apply")));
            }
            Some(Err(err)) => notice.set(Notice::error(err.to_string())),
            _ => {}
        }
    };

    let track_caret = move || {
        if let Some(el) = textarea_ref.get_untracked() {
            caret.set(read_caret(&el));
        }
    };

    let open_link_flow = move || {
        link_flow.update(LinkFlow::open);
        request_animation_frame(move || {
            if let Some(el) = search_ref.get_untracked() {
                let _ = el.focus();
            }
        });
    };

    let insert_link = move |hit: SearchHit| {
        let suffix = suffix.get_value();
        let Some(token) = link_flow.try_update(|f| f.select(&hit, &suffix)) else {
            return;
        };
        let next = session
            .try_update(|s| s.insert_into_body(&token, caret.get_untracked()))
            .flatten();
        caret.set(next);
        if let Some(selection) = next {
            let text = session.with_untracked(|s| s.selected_page().map(|p| p.md.clone()));
            place_caret(textarea_ref, text.unwrap_or_default(), selection);
        }
    };

    let create_from_term = move || {
        let result = link_flow
            .try_update(|f| session.try_update(|s| f.create_from_term(s, today())))
            .flatten();
        match result {
            Some(Ok(path)) => notice.set(Notice::info(format!("Created {path}"))),
            Some(Err(err)) => notice.set(Notice::error(err.to_string())),
            None => {}
        }
    };

    let sidebar_rows = move || {
        let filter = sidebar_filter.get();
        let order = sidebar_order.get();
        let counts = inbound.get();
        session.with(|s| {
            let paths = if filter.trim().is_empty() {
                analysis::ordered_paths(s.store().document(), order, &counts)
            } else {
                s.index().query(&filter).into_iter().map(|hit| hit.path).collect()
            };
            paths
                .into_iter()
                .map(|path| {
                    let title = s
                        .store()
                        .get_page(&path)
                        .map(|p| p.title.clone())
                        .unwrap_or_default();
                    let label = if title.trim().is_empty() { path.clone() } else { title };
                    let count = counts.get(&path).copied().unwrap_or(0);
                    let is_active = s.selected() == Some(path.as_str());
                    let click_path = path.clone();
                    view! {
                        <div
                            class="file-item"
                            class:active=is_active
                            on:click=move |_| select_page(click_path.clone())
                        >
                            <span>{label}</span>
                            <small class="file-path">{path}</small>
                            {(order == SidebarOrder::Popularity)
                                .then(|| view! { <small class="file-links">{format!("linked from {count} pages")}</small> })}
                        </div>
                    }
                })
                .collect::<Vec<_>>()
        })
    };

    let stats_line = move || {
        let s = stats.get();
        let range = match (s.earliest_date, s.latest_date) {
            (Some(first), Some(last)) => format!(" · {first} to {last}"),
            _ => String::new(),
        };
        format!(
            "{} pages · {} dated · {} with images · {} chars{}",
            s.total_pages, s.pages_with_dates, s.pages_with_images, s.total_content_length, range
        )
    };

    let body_view = move || {
        if preview.get() {
            view! {
                <article
                    class="preview"
                    inner_html=move || markdown::render_preview(&page_field(|p| p.md.clone()))
                ></article>
            }
            .into_any()
        } else {
            view! {
                <div class="editor-container">
                    <div
                        class="markdown-highlight-layer"
                        inner_html=move || markdown::highlight(&page_field(|p| p.md.clone()))
                        prop:scrollTop=move || scroll_top.get()
                    ></div>
                    <textarea
                        class="raw-editor"
                        node_ref=textarea_ref
                        prop:value=move || page_field(|p| p.md.clone())
                        on:input=move |ev| {
                            track_caret();
                            edit(FieldUpdate::Md(event_target_value(&ev)));
                        }
                        on:keyup=move |_| track_caret()
                        on:click=move |_| track_caret()
                        on:keydown=move |ev: leptos::ev::KeyboardEvent| {
                            if (ev.ctrl_key() || ev.meta_key()) && ev.key() == "k" {
                                ev.prevent_default();
                                track_caret();
                                open_link_flow();
                            }
                        }
                        on:scroll=move |e| {
                            let target: leptos::web_sys::Element = event_target(&e);
                            scroll_top.set(target.scroll_top());
                        }
                        placeholder="Start writing markdown..."
                        spellcheck="false"
                    ></textarea>
                </div>
            }
            .into_any()
        }
    };

    let editor_pane = move || {
        let Some(path) = selected.get() else {
            return view! {
                <div class="empty-pane">"Select a page from the sidebar to start editing."</div>
            }
            .into_any();
        };
        if !has_page.get() {
            return view! { <div class="empty-pane">{format!("There is no page at {path}.")}</div> }
                .into_any();
        }

        let delete_path = path.clone();
        view! {
            <form class="page-form" on:submit=|ev| ev.prevent_default()>
                <label>"Path"</label>
                <div style="display: flex; justify-content: space-between;">
                    <span class="path">{path}</span>
                    <button type="button" on:click=move |_| delete_page(delete_path.clone())>
                        "Delete page"
                    </button>
                </div>
                <label>"Title"</label>
                <input
                    type="text"
                    prop:value=move || page_field(|p| p.title.clone())
                    on:input=move |ev| edit(FieldUpdate::Title(event_target_value(&ev)))
                />
                <label>"Date"</label>
                <input
                    type="text"
                    placeholder="YYYY-MM-DD"
                    prop:value=move || page_field(|p| p.date.clone().unwrap_or_default())
                    on:input=move |ev| edit(FieldUpdate::Date(non_empty(event_target_value(&ev))))
                />
                <label>"Image"</label>
                <input
                    type="text"
                    placeholder="sites/pa-f.net/files/..."
                    prop:value=move || page_field(|p| p.image.clone().unwrap_or_default())
                    on:input=move |ev| edit(FieldUpdate::Image(non_empty(event_target_value(&ev))))
                />
                <label>"Links"</label>
                <textarea
                    placeholder="one link per line"
                    prop:value=move || page_field(|p| p.links.join("\n"))
                    on:change=move |ev| {
                        let links = event_target_value(&ev)
                            .lines()
                            .map(str::trim)
                            .filter(|l| !l.is_empty())
                            .map(str::to_string)
                            .collect();
                        edit(FieldUpdate::Links(links));
                    }
                ></textarea>
            </form>
            <div class="body-tabs">
                <button class:active=move || !preview.get() on:click=move |_| preview.set(false)>"Edit"</button>
                <button class:active=move || preview.get() on:click=move |_| preview.set(true)>"Preview"</button>
                <span class="spacer"></span>
                <button
                    title="Insert a link to another page (Ctrl+K)"
                    on:click=move |_| {
                        preview.set(false);
                        open_link_flow();
                    }
                >
                    "Insert link"
                </button>
            </div>
            {body_view}
        }
        .into_any()
    };

    let link_modal = move || {
        link_flow.with(LinkFlow::is_open).then(|| {
            let results = move || session.with(|s| link_flow.with(|f| f.results(s.index())));
            let offers_create = move || session.with(|s| link_flow.with(|f| f.offers_create(s.index())));
            view! {
                <div class="link-modal">
                    <input
                        type="text"
                        node_ref=search_ref
                        placeholder="Search pages by title or path"
                        prop:value=move || link_flow.with(|f| f.term().to_string())
                        on:input=move |ev| link_flow.update(|f| f.set_term(event_target_value(&ev)))
                        on:keydown=move |ev: leptos::ev::KeyboardEvent| {
                            match ev.key().as_str() {
                                "Escape" => link_flow.update(LinkFlow::close),
                                "Enter" => {
                                    ev.prevent_default();
                                    if let Some(first) = results().into_iter().next() {
                                        insert_link(first);
                                    }
                                }
                                _ => {}
                            }
                        }
                    />
                    <ul>
                        {move || {
                            results()
                                .into_iter()
                                .map(|hit| {
                                    let title = hit.title.clone();
                                    let path = hit.path.clone();
                                    view! {
                                        <li on:click=move |_| insert_link(hit.clone())>
                                            <span>{title}</span>
                                            <span class="hint">{path}</span>
                                        </li>
                                    }
                                })
                                .collect::<Vec<_>>()
                        }}
                    </ul>
                    {move || {
                        offers_create()
                            .then(|| {
                                let slug = slugify(&link_flow.with(|f| f.term().to_string()));
                                view! {
                                    <button on:click=move |_| create_from_term()>
                                        {format!("Create page \"{slug}\"")}
                                    </button>
                                }
                            })
                    }}
                    <div style="display: flex; justify-content: space-between; align-items: center;">
                        <span class="hint">"Enter inserts the first match · Esc closes"</span>
                        <button on:click=move |_| link_flow.update(LinkFlow::close)>"Cancel"</button>
                    </div>
                </div>
            }
        })
    };

    view! {
        <style>{APP_CSS}</style>
        <main
            class="app-layout"
            on:keydown=move |ev: leptos::ev::KeyboardEvent| {
                if (ev.ctrl_key() || ev.meta_key()) && ev.key() == "s" {
                    ev.prevent_default();
                    if busy.get_untracked().is_none() {
                        save();
                    }
                }
            }
        >
            <nav class="sidebar">
                <div class="sidebar-header">
                    <span>"Sitemap"</span>
                    <button on:click=move |_| create_new_page() title="New page">"+"</button>
                </div>
                <div class="sidebar-tools">
                    <input
                        type="search"
                        placeholder="Filter pages"
                        prop:value=move || sidebar_filter.get()
                        on:input=move |ev| sidebar_filter.set(event_target_value(&ev))
                    />
                    <select
                        prop:value=move || sidebar_order.get().key()
                        on:change=move |ev| sidebar_order.set(SidebarOrder::from_key(&event_target_value(&ev)))
                    >
                        {SidebarOrder::ALL
                            .into_iter()
                            .map(|order| view! { <option value=order.key()>{order.label()}</option> })
                            .collect::<Vec<_>>()}
                    </select>
                </div>
                <div class="file-list">{sidebar_rows}</div>
                <footer class="sidebar-stats">{stats_line}</footer>
            </nav>
            <section class="main-pane">
                <header class="topbar">
                    <button prop:disabled=move || busy.get().is_some() on:click=move |_| reload()>
                        {move || if busy.get() == Some(SyncOp::Load) { "Loading…" } else { "Reload" }}
                    </button>
                    <button
                        class="primary"
                        prop:disabled=move || busy.get().is_some()
                        on:click=move |_| save()
                    >
                        {move || if busy.get() == Some(SyncOp::Save) { "Saving…" } else { "Save" }}
                    </button>
                    <span
                        class="notice"
                        class:error=move || notice.with(|n| n.as_ref().is_some_and(|n| n.is_error))
                    >
                        {move || notice.with(|n| n.as_ref().map(|n| n.text.clone()).unwrap_or_default())}
                    </span>
                    <span class="server-status">
                        {move || {
                            server_status
                                .with(|status| match status {
                                    Some(s) if s.sitemap_exists => format!("server copy: {} pages", s.sitemap_size),
                                    Some(_) => "server has no sitemap yet".to_string(),
                                    None => "server status unknown".to_string(),
                                })
                        }}
                    </span>
                </header>
                {editor_pane}
            </section>
            {link_modal}
        </main>
    }
}
