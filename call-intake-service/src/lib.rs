//! Call Intake Service - Webhook lifecycle coordination for telephony call-record notifications.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod startup;
pub mod workers;
