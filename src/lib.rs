//! # Taskify
//!
//! A multi-user task tracking service with role-based dashboards.
//!
//! This library provides:
//! - An HTTP API for registration, login and task management
//! - A task lifecycle engine deriving status and progress from checklists
//! - Role- and assignment-based access control
//! - Aggregated dashboards for admins and members
//!
//! ## Request Flow
//! 1. Verify the bearer credential and re-fetch the user record
//! 2. Validate the payload
//! 3. Authorize the principal against the target task
//! 4. Apply the mutation and recompute derived fields
//! 5. Persist through the task store
//!
//! ## Modules
//! - `task`: lifecycle coordinator, progress engine, access control, dashboards
//! - `store`: store contracts with in-memory and SQLite backends
//! - `auth`: identity claims (JWT) and password hashing
//! - `api`: HTTP routes and handlers

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod store;
pub mod task;
pub mod user;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
