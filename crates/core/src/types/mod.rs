//! Core types for Kawn.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod otp;
pub mod price;
pub mod slug;
pub mod status;
pub mod subdomain;

pub use email::{Email, EmailError};
pub use id::*;
pub use otp::{OtpCode, OtpCodeError};
pub use price::{Price, PriceError};
pub use slug::{Slug, SlugError};
pub use status::*;
pub use subdomain::{Subdomain, SubdomainError};
