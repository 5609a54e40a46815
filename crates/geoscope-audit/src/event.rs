//! # Audit Events
//!
//! [`AuditEntry`] is what a caller records; a sink seals it into an
//! [`AuditEvent`] by assigning the next sequence number and linking it to
//! the digest of the previous event.
//!
//! ## Digest
//!
//! `digest = sha256(canonical(event without digest))`. The previous digest
//! is part of the hashed content, so editing, reordering or removing an
//! event breaks every link after it.

use geoscope_core::{sha256_digest, ActorId, CanonicalBytes, ContentDigest, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::AuditError;

/// Client metadata passed through from the request layer. Opaque to the
/// engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address,
            user_agent,
        }
    }
}

/// An unsealed audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub actor_id: ActorId,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub detail: Map<String, Value>,
    #[serde(flatten)]
    pub client: ClientInfo,
    pub recorded_at: Timestamp,
}

impl AuditEntry {
    pub fn new(actor_id: ActorId, action: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            actor_id,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            detail: Map::new(),
            client: ClientInfo::default(),
            recorded_at: Timestamp::now(),
        }
    }

    pub fn resource_id(mut self, id: impl ToString) -> Self {
        self.resource_id = Some(id.to_string());
        self
    }

    /// Add one detail field. Values that fail to serialize are recorded as
    /// `null` rather than dropping the whole entry.
    pub fn detail(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.detail.insert(key.into(), value);
        self
    }

    pub fn detail_map(mut self, detail: Map<String, Value>) -> Self {
        self.detail.extend(detail);
        self
    }

    pub fn client(mut self, client: ClientInfo) -> Self {
        self.client = client;
        self
    }

    /// Seal into an event with the given position in the chain.
    pub fn seal(self, sequence: u64, previous_digest: ContentDigest) -> Result<AuditEvent, AuditError> {
        let mut event = AuditEvent {
            sequence,
            event_id: Uuid::new_v4(),
            actor_id: self.actor_id,
            action: self.action,
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            detail: self.detail,
            client: self.client,
            recorded_at: self.recorded_at,
            previous_digest,
            digest: ContentDigest::zero(),
        };
        event.digest = event.compute_digest()?;
        Ok(event)
    }
}

/// A sealed, immutable audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub sequence: u64,
    pub event_id: Uuid,
    pub actor_id: ActorId,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub detail: Map<String, Value>,
    #[serde(flatten)]
    pub client: ClientInfo,
    pub recorded_at: Timestamp,
    pub previous_digest: ContentDigest,
    pub digest: ContentDigest,
}

/// The hashed view of an event: every field except `digest`.
#[derive(Serialize)]
struct DigestInput<'a> {
    sequence: u64,
    event_id: &'a Uuid,
    actor_id: ActorId,
    action: &'a str,
    resource_type: &'a str,
    resource_id: Option<&'a str>,
    detail: &'a Map<String, Value>,
    ip_address: Option<&'a str>,
    user_agent: Option<&'a str>,
    recorded_at: &'a Timestamp,
    previous_digest: &'a ContentDigest,
}

impl AuditEvent {
    /// Recompute the digest from the event's content.
    pub fn compute_digest(&self) -> Result<ContentDigest, AuditError> {
        let input = DigestInput {
            sequence: self.sequence,
            event_id: &self.event_id,
            actor_id: self.actor_id,
            action: &self.action,
            resource_type: &self.resource_type,
            resource_id: self.resource_id.as_deref(),
            detail: &self.detail,
            ip_address: self.client.ip_address.as_deref(),
            user_agent: self.client.user_agent.as_deref(),
            recorded_at: &self.recorded_at,
            previous_digest: &self.previous_digest,
        };
        Ok(sha256_digest(&CanonicalBytes::new(&input)?))
    }
}

/// Check that `events` form an unbroken chain: contiguous sequence
/// numbers, each linked to its predecessor's digest, each digest matching
/// its content. The first event of a full log (sequence 1) must link to
/// the zero digest; a tail excerpt may start anywhere.
///
/// # Errors
///
/// [`AuditError::ChainBroken`] naming the first bad sequence number.
pub fn verify_chain(events: &[AuditEvent]) -> Result<(), AuditError> {
    let mut previous: Option<&AuditEvent> = None;
    for event in events {
        let broken = |reason: String| AuditError::ChainBroken {
            sequence: event.sequence,
            reason,
        };
        match previous {
            Some(prev) => {
                if event.sequence != prev.sequence + 1 {
                    return Err(broken(format!(
                        "expected sequence {}, found {}",
                        prev.sequence + 1,
                        event.sequence
                    )));
                }
                if event.previous_digest != prev.digest {
                    return Err(broken("previous digest does not match predecessor".into()));
                }
            }
            None => {
                if event.sequence == 1 && event.previous_digest != ContentDigest::zero() {
                    return Err(broken("first event must link to the zero digest".into()));
                }
            }
        }
        if event.compute_digest()? != event.digest {
            return Err(broken("digest does not match content".into()));
        }
        previous = Some(event);
    }
    Ok(())
}
