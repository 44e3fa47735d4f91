//! Kawn Core - Shared types library.
//!
//! This crate provides common types used across all Kawn components:
//! - `storefront` - Customer-facing storefront service
//! - `admin` - Merchant dashboard service (bulk import/export, page design)
//! - `cli` - Command-line tools for migrations, tenant lookups and imports
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, subdomains, OTP codes, slugs and prices
//! - [`tenant`] - Hostname to tenant resolution
//! - [`pages`] - Page records and virtual system page synthesis

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pages;
pub mod tenant;
pub mod types;

pub use pages::{Page, PageContent, Section};
pub use tenant::{TENANT_HEADER, TenantContext, TenantResolver};
pub use types::*;
