//! Types shared between the HabitStar server and its clients.

pub mod api;
pub mod auth;
pub mod catalog;
pub mod domain;
pub mod jwt;
