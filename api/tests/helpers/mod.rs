pub mod app;

pub use app::{TestCtx, bearer, json_body, make_test_app, setup};
