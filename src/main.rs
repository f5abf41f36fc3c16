#[cfg(feature = "ssr")]
#[tokio::main]
async fn main() {
    use axum::Router;
    use dotenvy::dotenv;
    use leptos::logging::{error, log};
    use leptos::prelude::*;
    use leptos_axum::{generate_route_list, LeptosRoutes};
    use puzzle_gate::app::*;
    use puzzle_gate::GateConfig;

    dotenv().ok();

    // A broken deployment must stop the server here, not surface halfway through a game.
    for name in GateConfig::builtin_names() {
        match GateConfig::builtin(name) {
            Ok(config) => log!(
                "deployment {}: {} tiles, reveal after {:?}",
                name,
                config.tile_count(),
                config.reveal_delay
            ),
            Err(e) => {
                error!("deployment {} is invalid: {}", name, e);
                std::process::exit(1);
            }
        }
    }

    let conf = match get_configuration(None) {
        Ok(conf) => conf,
        Err(e) => {
            error!("Failed to read Leptos configuration: {}", e);
            std::process::exit(1);
        }
    };
    let addr = conf.leptos_options.site_addr;
    let leptos_options = conf.leptos_options;
    // Generate the list of routes in your Leptos App
    let routes = generate_route_list(App);

    let app = Router::new()
        .leptos_routes(&leptos_options, routes, {
            let leptos_options = leptos_options.clone();
            move || shell(leptos_options.clone())
        })
        .fallback(leptos_axum::file_and_error_handler(shell))
        .with_state(leptos_options);

    log!("listening on http://{}", &addr);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app.into_make_service()).await {
        error!("Server error: {}", e);
    }
}

#[cfg(not(feature = "ssr"))]
pub fn main() {
    // no client-side main function
    // see lib.rs for hydration function instead
}
