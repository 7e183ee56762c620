//! Seam to the home-automation runtime that hosts the coordinator.
//!
//! The runtime owns the entity state store and dispatches service calls to devices.
//! States are plain strings and attributes are JSON values, the way the runtime's
//! own state objects carry them.

use anyhow::Result;
use serde::Serialize;
use serde_json::Value;

use crate::config::CoverType;
use crate::constants::{
    ATTR_CURRENT_POSITION, ATTR_CURRENT_TILT_POSITION, STATE_UNAVAILABLE, STATE_UNKNOWN,
};

/// Cover service the coordinator can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverService {
    SetCoverPosition,
    SetCoverTiltPosition,
}

impl CoverService {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverService::SetCoverPosition => "set_cover_position",
            CoverService::SetCoverTiltPosition => "set_cover_tilt_position",
        }
    }
}

/// One command to one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceCall {
    pub service: CoverService,
    pub entity_id: String,
    pub position: u8,
}

/// Read access to entity state plus service dispatch.
#[cfg_attr(test, mockall::automock)]
pub trait HostRuntime {
    /// Raw state string of an entity, `None` if the entity does not exist.
    fn state(&self, entity_id: &str) -> Option<String>;

    /// One attribute of an entity.
    fn attribute(&self, entity_id: &str, attribute: &str) -> Option<Value>;

    /// Dispatch a service call. Success means the runtime accepted it, not that the
    /// device reached the position.
    fn call_service(&mut self, call: &ServiceCall) -> Result<()>;
}

/// State of an entity with `unknown`/`unavailable` treated as absent.
pub fn safe_state(host: &dyn HostRuntime, entity_id: &str) -> Option<String> {
    host.state(entity_id)
        .filter(|state| state != STATE_UNKNOWN && state != STATE_UNAVAILABLE)
}

/// Numeric state of a sensor entity.
pub fn numeric_state(host: &dyn HostRuntime, entity_id: &str) -> Option<f64> {
    safe_state(host, entity_id)?.trim().parse().ok()
}

/// Numeric attribute, accepting numbers and numeric strings.
pub fn numeric_attribute(host: &dyn HostRuntime, entity_id: &str, attribute: &str) -> Option<f64> {
    value_as_f64(&host.attribute(entity_id, attribute)?)
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Attribute holding the reported position of a cover of this type.
pub fn position_attribute(cover_type: CoverType) -> &'static str {
    match cover_type {
        CoverType::Tilt => ATTR_CURRENT_TILT_POSITION,
        CoverType::Vertical | CoverType::Awning => ATTR_CURRENT_POSITION,
    }
}

/// Domain part of an entity id: `binary_sensor` for `binary_sensor.hallway`.
pub fn get_domain(entity_id: &str) -> Option<&str> {
    entity_id
        .split_once('.')
        .map(|(domain, _)| domain)
        .filter(|domain| !domain.is_empty())
}
