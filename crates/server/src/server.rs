use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::{future::Future, net::SocketAddr, sync::Arc};

use crate::{budgets, expenses, reports, teams, user::CurrentUser};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(auth_header)) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let authenticated = state
        .engine
        .authenticate(auth_header.username(), auth_header.password())
        .await
        .map_err(|err| {
            tracing::error!("authentication failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if !authenticated {
        return Err(StatusCode::UNAUTHORIZED);
    }

    request.extensions_mut().insert(CurrentUser {
        username: auth_header.username().to_string(),
    });
    Ok(next.run(request).await)
}

/// Every route sits behind HTTP Basic auth.
pub fn router(engine: Arc<Engine>) -> Router {
    let state = ServerState { engine };
    Router::new()
        .route("/expenses", get(expenses::list).post(expenses::create))
        .route(
            "/expenses/{id}",
            axum::routing::patch(expenses::update).delete(expenses::remove),
        )
        .route("/budget", get(budgets::get).put(budgets::set))
        .route("/reports/monthly", get(reports::monthly))
        .route("/alerts", get(reports::alert))
        .route("/teams/{team_id}", get(teams::get))
        .route(
            "/teams/{team_id}/expenses",
            get(expenses::team_list).post(expenses::team_create),
        )
        .route(
            "/teams/{team_id}/expenses/{id}",
            axum::routing::patch(expenses::team_update).delete(expenses::team_remove),
        )
        .route(
            "/teams/{team_id}/budget",
            get(budgets::team_get).put(budgets::team_set),
        )
        .route("/teams/{team_id}/reports/monthly", get(reports::team_monthly))
        .route("/teams/{team_id}/alerts", get(reports::team_alert))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run<F>(engine: Engine, addr: SocketAddr, shutdown: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener, shutdown).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener<F>(
    engine: Engine,
    listener: tokio::net::TcpListener,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(Arc::new(engine)))
        .with_graceful_shutdown(shutdown)
        .await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener, std::future::pending()).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
