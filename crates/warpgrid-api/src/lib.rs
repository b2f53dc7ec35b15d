//! warpgrid-api — REST control surface for the model controller.
//!
//! Lets a request router or an external autoscaling policy reach the
//! deployment manager over HTTP. It carries scale intents and model
//! lookups only; inference traffic never passes through it.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/models` | Model → workload table |
//! | GET | `/api/v1/models/{model}` | Resolve a model to its workload |
//! | GET | `/api/v1/workloads` | List tracked workloads |
//! | GET | `/api/v1/workloads/{name}` | Scaler status |
//! | POST | `/api/v1/workloads/{name}/active` | Signal traffic |
//! | PUT | `/api/v1/workloads/{name}/scale` | Set desired replicas |
//! | GET | `/healthz` | Liveness |

pub mod handlers;

use axum::Router;
use axum::routing::{get, post, put};
use warpgrid_controller::DeploymentManager;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub manager: DeploymentManager,
}

/// Build the complete API router.
pub fn build_router(manager: DeploymentManager) -> Router {
    let api_state = ApiState { manager };

    let api_routes = Router::new()
        .route("/models", get(handlers::list_models))
        .route("/models/{model}", get(handlers::resolve_model))
        .route("/workloads", get(handlers::list_workloads))
        .route("/workloads/{name}", get(handlers::get_workload))
        .route("/workloads/{name}/active", post(handlers::request_active))
        .route("/workloads/{name}/scale", put(handlers::set_scale))
        .with_state(api_state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
}
