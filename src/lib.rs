pub mod config;
pub mod error;
pub mod models;
pub mod api;
pub mod cache;
pub mod session;

// localStorage only exists in the browser; native builds use the memory store.
#[cfg(target_arch = "wasm32")]
pub mod storage;

pub mod purchase;
pub mod locations;
pub mod patients;
pub mod companies;
pub mod suppliers;
pub mod articles;
pub mod inventory;
pub mod whatsapp;
pub mod analytics;
pub mod format;

pub mod charts;
pub mod components;
pub mod pages;
pub mod app;
