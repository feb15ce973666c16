// Job board domain: record table, upload validation, orchestration and the JSON API.
// The HTML page in `ui` drives the same `JobBoard` as the API handlers.

pub mod board;
pub mod handlers;
pub mod models;
pub mod records;
pub mod validation;
