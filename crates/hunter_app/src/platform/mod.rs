mod app;
mod cli;
mod config;
mod effects;
mod logging;
mod persistence;
mod ui;

pub(crate) use app::run_app;
