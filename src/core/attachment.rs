//! # Attachment Resolver
//!
//! Turns request-level references (`{"name": "..."}`) into the stored
//! reference type, injecting the gateway's namespace, and projects stored
//! references back into the request shape.
//!
//! A disk source is a tagged variant: exactly one of an archive or a disk.
//! Requests still use the two-optional-field shape
//! (`{"archive": {...}}` / `{"disk": {...}}`), and the exclusivity rule is
//! enforced here at the decode boundary.

use serde::{Deserialize, Serialize};

use crate::core::error::{GatewayError, GatewayResult};
use crate::core::validation::validate_name;

/// By-name reference as clients send it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub name: String,
}

impl ResourceRef {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into() }
    }
}

/// Namespaced reference as stored in a resource spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedRef {
    pub namespace: String,
    pub name: String,
}

impl AttachedRef {
    pub fn to_request(&self) -> ResourceRef {
        ResourceRef::new(self.name.clone())
    }
}

/// Where a disk's initial contents come from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachedSource {
    Archive(AttachedRef),
    Disk(AttachedRef),
}

/// Disk source in request/response shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive: Option<ResourceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<ResourceRef>,
}

fn attach(field: &str, reference: ResourceRef, namespace: &str) -> GatewayResult<AttachedRef> {
    validate_name(field, &reference.name)?;
    Ok(AttachedRef {
        namespace: namespace.to_string(),
        name: reference.name,
    })
}

/// Resolve a disk source. Exactly one of `archive` / `disk` must be set.
pub fn resolve_source(
    source: Option<SourceRequest>,
    namespace: &str,
) -> GatewayResult<AttachedSource> {
    let source = source.unwrap_or_default();
    match (source.archive, source.disk) {
        (Some(archive), None) => Ok(AttachedSource::Archive(attach(
            "source.archive.name",
            archive,
            namespace,
        )?)),
        (None, Some(disk)) => Ok(AttachedSource::Disk(attach(
            "source.disk.name",
            disk,
            namespace,
        )?)),
        (Some(_), Some(_)) => Err(GatewayError::validation(
            "source",
            "only one of archive or disk may be set",
        )),
        (None, None) => Err(GatewayError::validation(
            "source",
            "one of archive or disk is required",
        )),
    }
}

/// Resolve an optional reference; absence is not an error
pub fn resolve_reference(
    field: &str,
    reference: Option<ResourceRef>,
    namespace: &str,
) -> GatewayResult<Option<AttachedRef>> {
    reference
        .map(|r| attach(&format!("{}.name", field), r, namespace))
        .transpose()
}

/// Resolve a list of references, failing on the first invalid entry
pub fn resolve_references(
    field: &str,
    references: Vec<ResourceRef>,
    namespace: &str,
) -> GatewayResult<Vec<AttachedRef>> {
    references
        .into_iter()
        .enumerate()
        .map(|(i, r)| attach(&format!("{}[{}].name", field, i), r, namespace))
        .collect()
}

/// Project a stored source back into the shape it was accepted in
pub fn project_source(source: &AttachedSource) -> SourceRequest {
    match source {
        AttachedSource::Archive(r) => SourceRequest {
            archive: Some(r.to_request()),
            disk: None,
        },
        AttachedSource::Disk(r) => SourceRequest {
            archive: None,
            disk: Some(r.to_request()),
        },
    }
}
