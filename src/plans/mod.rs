mod dto;
pub mod handlers;
pub mod model;
pub mod pricing;
pub mod repo;
mod repo_types;
pub mod services;
pub mod store;
pub mod week;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::plan_routes()
}
