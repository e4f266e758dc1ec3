//! SNS envelope and SES bounce/complaint payload shapes.
//!
//! SNS delivers the SES notification as a JSON document serialized into the
//! `Message` string of its own envelope, so decoding always takes two passes:
//! [`Envelope::decode`] for the outer layer, then [`Envelope::payload`] for
//! the embedded one.
//!
//! See <https://docs.aws.amazon.com/ses/latest/DeveloperGuide/notification-contents.html>.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::AppError;

/// `Type` value of the one-time control message sent when a subscription is created.
pub const SUBSCRIPTION_CONFIRMATION: &str = "SubscriptionConfirmation";

/// `Type` value of a regular notification.
pub const NOTIFICATION: &str = "Notification";

/// The only bounce classification that triggers remediation.
pub const PERMANENT_BOUNCE: &str = "Permanent";

/// Outer SNS envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    #[serde(rename = "Type", deserialize_with = "null_as_default")]
    pub kind: String,

    /// Present only on subscription confirmations.
    #[serde(rename = "SubscribeURL", skip_serializing_if = "Option::is_none")]
    pub subscribe_url: Option<String>,

    /// Inner payload, JSON encoded as a string.
    #[serde(rename = "Message", deserialize_with = "null_as_default")]
    pub message: String,
}

/// SNS and SES send `null` where a field has no value; treat it like absence.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Classification of the outer envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    SubscriptionConfirmation,
    Notification,
    Unsupported,
}

impl Envelope {
    pub fn decode(bytes: &[u8]) -> Result<Self, AppError> {
        serde_json::from_slice(bytes).map_err(|e| AppError::Decode(format!("envelope: {}", e)))
    }

    pub fn kind(&self) -> EnvelopeKind {
        match self.kind.as_str() {
            SUBSCRIPTION_CONFIRMATION => EnvelopeKind::SubscriptionConfirmation,
            NOTIFICATION => EnvelopeKind::Notification,
            _ => EnvelopeKind::Unsupported,
        }
    }

    /// Second decoding pass over the embedded `Message` string.
    pub fn payload(&self) -> Result<SesNotification, AppError> {
        serde_json::from_str(&self.message)
            .map_err(|e| AppError::Decode(format!("message payload: {}", e)))
    }
}

/// SES event type carried in `notificationType`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationType {
    Bounce,
    Complaint,
    Delivery,
    #[default]
    #[serde(other)]
    Other,
}

impl NotificationType {
    /// Only bounces and complaints lead to remediation.
    pub fn is_actionable(self) -> bool {
        matches!(self, NotificationType::Bounce | NotificationType::Complaint)
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationType::Bounce => write!(f, "Bounce"),
            NotificationType::Complaint => write!(f, "Complaint"),
            NotificationType::Delivery => write!(f, "Delivery"),
            NotificationType::Other => write!(f, "Other"),
        }
    }
}

/// Inner SES notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SesNotification {
    #[serde(deserialize_with = "null_as_default")]
    pub notification_type: NotificationType,
    #[serde(deserialize_with = "null_as_default")]
    pub mail: Mail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounce: Option<Bounce>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complaint: Option<Complaint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mail {
    /// Address the original message was sent from; the routing key.
    #[serde(deserialize_with = "null_as_default")]
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Bounce {
    /// `Permanent`, `Transient` or `Undetermined`.
    #[serde(deserialize_with = "null_as_default")]
    pub bounce_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub bounced_recipients: Vec<BouncedRecipient>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BouncedRecipient {
    #[serde(deserialize_with = "null_as_default")]
    pub email_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub diagnostic_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Complaint {
    #[serde(deserialize_with = "null_as_default")]
    pub complained_recipients: Vec<ComplainedRecipient>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComplainedRecipient {
    #[serde(deserialize_with = "null_as_default")]
    pub email_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub complaint_feedback_type: String,
}

/// An address selected for remediation together with the reason SES gave.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipient<'a> {
    pub address: &'a str,
    pub reason: &'a str,
    pub kind: NotificationType,
}

impl SesNotification {
    /// Recipients that must be remediated, in notification order.
    ///
    /// Bounced recipients count only for permanent bounces; complained
    /// recipients always count.
    pub fn recipients(&self) -> Vec<Recipient<'_>> {
        let mut out = Vec::new();

        if let Some(bounce) = self
            .bounce
            .as_ref()
            .filter(|b| b.bounce_type == PERMANENT_BOUNCE)
        {
            out.extend(bounce.bounced_recipients.iter().map(|r| Recipient {
                address: &r.email_address,
                reason: &r.diagnostic_code,
                kind: NotificationType::Bounce,
            }));
        }

        if let Some(complaint) = &self.complaint {
            out.extend(complaint.complained_recipients.iter().map(|r| Recipient {
                address: &r.email_address,
                reason: &r.complaint_feedback_type,
                kind: NotificationType::Complaint,
            }));
        }

        out
    }
}
