//! detwatch: terminal and browser dashboard for an object-detection service.

pub mod api;
pub mod cli;
pub mod config;
pub mod fingerprint;
pub mod format;
pub mod mock;
pub mod model;
pub mod poller;
pub mod render;
pub mod view;
pub mod web;
