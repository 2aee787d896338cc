mod analysis;
mod app;
mod config;
mod editor_core;
mod error;
mod link_flow;
mod markdown;
mod search;
mod session;
mod sitemap;
mod sync;
mod telemetry;

use app::*;
use config::EditorConfig;
use leptos::prelude::*;

fn main() {
    console_error_panic_hook::set_once();
    let config = EditorConfig::load();
    telemetry::init(config.max_level());
    tracing::info!(api = %config.api_base, "sitemap editor starting");
    mount_to_body(move || {
        view! { <App config=config /> }
    })
}
