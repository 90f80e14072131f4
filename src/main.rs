use std::net::SocketAddr;

use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql::{Request, Response};
use axum::extract::Extension;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Html;
use axum::routing::{get, get_service};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use naus::auth::PrincipalKind;
use naus::config::Config;
use naus::error::{NausError, NausResult};
use naus::graphql::{build_schema, NausSchema};
use naus::models::admin::Admin;
use naus::models::credential::Credential;
use naus::state::AppState;

const NAUS_TOKEN: &'static str = "NAUS_TOKEN";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("naus=debug,tower_http=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let uploads = ServeDir::new(&config.upload_dir);
    let state = AppState::connect(config).await?;
    let schema = build_schema(state.clone());

    let app = Router::new()
        .route("/", get(playground).post(query))
        .route("/health", get(|| async { StatusCode::NO_CONTENT }))
        .nest(
            "/uploads",
            get_service(uploads).handle_error(|err: std::io::Error| async move {
                error!(error = %err, "failed to serve upload");
                StatusCode::INTERNAL_SERVER_ERROR
            }),
        )
        .layer(Extension(state))
        .layer(Extension(schema))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!(%addr, "listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}

async fn query(
    Extension(state): Extension<AppState>,
    Extension(schema): Extension<NausSchema>,
    headers: HeaderMap,
    Json(request): Json<Request>,
) -> NausResult<Json<Response>> {
    let mut request = request;
    if let Some(token) = get_token(&headers)? {
        let principal = state.tokens.verify(token)?;
        request = match principal.kind {
            PrincipalKind::Member => {
                request.data(Credential::authenticate(principal.id, &state).await?)
            }
            PrincipalKind::Admin => {
                request.data(Admin::authenticate(principal.id, &*state.store).await?)
            }
        };
    }

    let mut response = schema.execute(request).await;
    if !state.config.diagnostics {
        for error in &mut response.errors {
            if let Some(extensions) = &mut error.extensions {
                extensions.unset("detail");
            }
        }
    }

    Ok(Json(response))
}

async fn playground() -> Html<String> {
    Html(playground_source(GraphQLPlaygroundConfig::new("/")))
}

/// The bearer token, from either `Authorization` or the `NAUS_TOKEN` header.
fn get_token(headers: &HeaderMap) -> NausResult<Option<&str>> {
    let invalid = |_| NausError::Unauthorized("Invalid token header".to_owned());

    if let Some(value) = headers.get(AUTHORIZATION) {
        let value = value.to_str().map_err(invalid)?;
        return match value.strip_prefix("Bearer ") {
            Some(token) => Ok(Some(token.trim())),
            None => Err(NausError::Unauthorized(
                "Authorization header must be a bearer token".to_owned(),
            )),
        };
    }

    headers
        .get(NAUS_TOKEN)
        .map(|value| value.to_str().map_err(invalid))
        .transpose()
}
