//! Wizapp demo entry point.
//!
//! Serves `/health` over the HTTP server adapter and exposes the `sql`
//! migration component.

use std::process::ExitCode;

use axum::routing::get;
use axum::Router;

use wizapp::adapters::http_server::{self, HttpRoutes, HTTP_SERVER_NAME};
use wizapp::adapters::sql_component::{self, SQL_COMPONENT_NAME};
use wizapp::application::{Application, BootstrapError};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(BootstrapError::Cli(err)) => {
            let _ = err.print();
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
        Err(err) => {
            match err.unit_name() {
                Some(unit) => eprintln!("unable to start application ({unit}): {err}"),
                None => eprintln!("unable to start application: {err}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), BootstrapError> {
    let routes = HttpRoutes::new();

    let mut app = Application::from_executable()
        .about("A wizapp application")
        .version(env!("CARGO_PKG_VERSION"));
    app.register_server(HTTP_SERVER_NAME, http_server::server_factory(routes.clone()))?;
    app.register_component(SQL_COMPONENT_NAME, sql_component::create_component)?;

    app.run(std::env::args_os(), move |_config| {
        routes.register(Router::new().route("/health", get(|| async { "ok" })));
        Ok(())
    })
    .await
}
