//! Update planning under full-replace semantics.
//!
//! An update submits the complete attribute set and payload. Anything the
//! caller leaves out is gone afterwards, so the planner makes that explicit:
//!
//! - the planned attributes are exactly the desired ones
//! - the planned payload is the desired one, or empty
//! - removing an attribute means omitting it; an empty string is rejected
//!
//! A [`VersionPolicy`] may carry one version attribute forward when the
//! caller omits it.

use bytes::Bytes;
use tracing::warn;

use crate::error::{AttributeError, PlanError};
use crate::model::{AttributeSet, EntityKey, EntitySnapshot};
use crate::validate::{validate_attribute, validate_name};

/// Name of the conventional schema version attribute.
pub const TYPE_VERSION_ATTRIBUTE: &str = "typeVersion";

/// How a version attribute omitted from an update is handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionPolicy {
    /// Keep the current value of `attribute` if the update omits it.
    CarryForward { attribute: String },
    /// Treat version attributes like any other: omitted means dropped.
    Replace,
}

impl VersionPolicy {
    /// Carries `typeVersion` forward.
    pub fn type_version() -> Self {
        VersionPolicy::CarryForward { attribute: TYPE_VERSION_ATTRIBUTE.to_string() }
    }
}

/// Advisory conditions found while planning. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanWarning {
    /// The current payload is non-empty and the update does not re-supply it.
    PayloadDropped { previous_len: usize },
    /// The version attribute was omitted and copied from the current entity.
    VersionCarriedForward { attribute: String },
}

/// The literal attribute set and payload to submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationPlan {
    pub entity_key: EntityKey,
    pub attributes: AttributeSet,
    pub payload: Bytes,
    pub warnings: Vec<PlanWarning>,
}

impl MutationPlan {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Attributes present now that the plan drops.
    pub fn dropped_attributes<'a>(&'a self, current: &'a EntitySnapshot) -> impl Iterator<Item = &'a str> + 'a {
        current
            .attributes
            .keys()
            .filter(|name| !self.attributes.contains_key(*name))
            .map(String::as_str)
    }
}

/// Computes full-replace update plans.
#[derive(Debug, Clone)]
pub struct MutationPlanner {
    policy: VersionPolicy,
}

impl MutationPlanner {
    pub fn new(policy: VersionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &VersionPolicy {
        &self.policy
    }

    /// Plans an update of `current` to exactly `desired` plus `desired_payload`.
    ///
    /// `current` should be fetched right before planning; staleness is not
    /// checked here.
    pub fn plan_update(
        &self,
        current: &EntitySnapshot,
        desired: AttributeSet,
        desired_payload: Option<Bytes>,
    ) -> Result<MutationPlan, PlanError> {
        let mut attributes = desired;
        let mut warnings = Vec::new();

        for (name, value) in &attributes {
            validate_name(name).map_err(AttributeError::from)?;
            if value.is_empty_string() {
                return Err(PlanError::InvalidRemoval { name: name.clone() });
            }
            validate_attribute(name, value)?;
        }

        if let VersionPolicy::CarryForward { attribute } = &self.policy {
            if !attributes.contains_key(attribute) {
                if let Some(value) = current.attributes.get(attribute) {
                    attributes.insert(attribute.clone(), value.clone());
                    warnings.push(PlanWarning::VersionCarriedForward { attribute: attribute.clone() });
                }
            }
        }

        let payload = match desired_payload {
            Some(payload) => payload,
            None => {
                if !current.payload.is_empty() {
                    warnings.push(PlanWarning::PayloadDropped { previous_len: current.payload.len() });
                }
                Bytes::new()
            }
        };

        for warning in &warnings {
            match warning {
                PlanWarning::PayloadDropped { previous_len } => {
                    warn!(entity = %current.key, previous_len, "update drops the current payload");
                }
                PlanWarning::VersionCarriedForward { attribute } => {
                    warn!(entity = %current.key, attribute = %attribute, "version attribute carried forward");
                }
            }
        }

        Ok(MutationPlan { entity_key: current.key.clone(), attributes, payload, warnings })
    }
}
