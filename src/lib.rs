//! content-vault: upload files to a content-addressed storage network and
//! read them back by content identifier.
//!
//! [`services::content_client::ContentClient`] is the entry point; the
//! `handlers` and `routes` modules expose it over HTTP.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
