pub(crate) mod auth;
mod server;

pub(crate) use server::{AppState, build_state, router, run};
