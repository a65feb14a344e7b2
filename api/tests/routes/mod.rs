mod attendance;
mod auth_test;
mod health_test;
