pub mod buildings;
pub mod hlasovani;
pub mod members;
pub mod templates;
pub mod votes;

use crate::state::AppState;
use axum::Router;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/buildings", buildings::routes())
        .nest("/members", members::routes())
        .nest("/votes", votes::routes())
        .nest("/hlasovani", hlasovani::routes())
        .nest("/templates", templates::routes())
}
