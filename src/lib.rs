//! Course messaging toggle.
//!
//! SYSTEM CONTEXT
//! ==============
//! A course page block that lets course managers switch participant
//! messaging on or off. The server owns the persisted per-course flag and
//! the access-controlled mutation endpoint; the `widget` module is the
//! presentation controller that mirrors the flag into page elements and
//! talks to the endpoint.

pub mod config;
pub mod db;
pub mod routes;
pub mod services;
pub mod state;
pub mod widget;
