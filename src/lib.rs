// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational User Service - OIDC identity reconciliation
//!
//! Authenticates callers with identity-provider access tokens, derives
//! their authorities from token claims and keeps one local identity per
//! external subject.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Token verification, authority derivation, authorization gate
//! - `identity` - Identity records, storage (redb) and reconciliation
//! - `config` - Environment configuration
//! - `telemetry` - Logging setup

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod identity;
pub mod state;
pub mod telemetry;
