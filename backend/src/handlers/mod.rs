//! HTTP handlers for the operational surface

pub mod health;
