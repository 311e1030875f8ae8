mod error;
mod handlers;
mod router;

pub use error::{ApiError, ErrorResponse};
pub use router::{AppState, create_router};
