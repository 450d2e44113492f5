//! Shared types for the mpx SDK.
//!
//! - [`MpxError`], the error taxonomy every crate returns
//! - [`validators`] for references and account ids
//! - [`ServiceDescriptor`] and friends, the typed service catalog entries
//! - the wire entity model: [`Field`], [`Fields`], [`Entry`], [`Entries`], [`Page`]

pub mod entries;
pub mod entry;
pub mod error;
pub mod field;
pub mod fields;
pub mod page;
pub mod service;
pub mod validators;

pub use entries::Entries;
pub use entry::{Entry, ReferenceResolver, ReferenceTarget};
pub use error::{MpxError, Result};
pub use field::{CUSTOM_FIELD_MARKER, Field, Namespace, is_custom_field_name};
pub use fields::{Fields, RESERVED_KEYS};
pub use page::Page;
pub use service::{EndpointDescriptor, ServiceDescriptor, ServiceType, WireForm, split_shard};
pub use validators::ROOT_ACCOUNT_ID;
