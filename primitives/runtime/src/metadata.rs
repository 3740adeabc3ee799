//! Metadata carried alongside handler results.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tonic::metadata::{AsciiMetadataKey, AsciiMetadataValue, MetadataMap};
use tonic::Status;

/// Header and trailer metadata captured from one RPC invocation.
///
/// Each handler invocation builds its own instance; instances are never
/// shared between concurrent calls.
#[derive(Debug, Clone, Default)]
pub struct ServerMetadata {
    /// Response header metadata
    pub header: MetadataMap,
    /// Response trailer metadata
    pub trailer: MetadataMap,
}

impl ServerMetadata {
    /// Empty header and trailer
    pub fn new() -> Self { Self::default() }

    /// Metadata with the given header and an empty trailer
    pub fn with_header(header: MetadataMap) -> Self { Self { header, trailer: MetadataMap::new() } }
}

/// A transport attachment value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentValue {
    /// Single string
    Str(String),
    /// List of strings; the only shape merged into trailer metadata
    Strings(Vec<String>),
    /// Opaque bytes
    Bytes(Vec<u8>),
}

/// Out-of-band key/value data a transport returns beside the response.
///
/// Transports place it in the response extensions of a successful call, or
/// attach it to the [`Status`] of a failed one with
/// [`Attachments::attach_to`]. Generated unary handlers merge it into trailer
/// metadata either way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attachments(BTreeMap<String, AttachmentValue>);

impl Attachments {
    /// Empty attachments
    pub fn new() -> Self { Self::default() }

    /// Insert or replace an attachment
    pub fn insert(&mut self, key: impl Into<String>, value: AttachmentValue) {
        self.0.insert(key.into(), value);
    }

    /// Look up an attachment
    pub fn get(&self, key: &str) -> Option<&AttachmentValue> { self.0.get(key) }

    /// Iterate attachments in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttachmentValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of attachments
    pub fn len(&self) -> usize { self.0.len() }

    /// Whether there are no attachments
    pub fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Carry these attachments on a failed call's status.
    ///
    /// They become the status source, replacing any source already set.
    pub fn attach_to(self, status: &mut Status) { status.set_source(Arc::new(FailedCallAttachments(self))); }

    /// Attachments a transport carried on a failed call's status
    pub fn from_status(status: &Status) -> Option<&Attachments> {
        let source = std::error::Error::source(status)?;
        source.downcast_ref::<FailedCallAttachments>().map(|carried| &carried.0)
    }
}

/// Status source holding the attachments of a failed call
#[derive(Debug, Error)]
#[error("call failed with {} attachment(s)", .0.len())]
struct FailedCallAttachments(Attachments);

/// Merge list-of-strings attachments into `trailer`, replacing existing
/// values under the same key.
///
/// Attachments of any other shape and keys that are not valid ASCII metadata
/// keys are skipped. Values that are not valid metadata values are dropped; a
/// key left with no valid value keeps whatever the trailer already holds.
/// Returns the number of keys merged.
pub fn merge_attachments(trailer: &mut MetadataMap, attachments: &Attachments) -> usize {
    let mut merged = 0;
    for (key, value) in attachments.iter() {
        let AttachmentValue::Strings(values) = value else {
            continue;
        };
        let Ok(key) = AsciiMetadataKey::from_bytes(key.as_bytes()) else {
            continue;
        };
        let values: Vec<AsciiMetadataValue> =
            values.iter().filter_map(|v| AsciiMetadataValue::try_from(v.as_str()).ok()).collect();
        if values.is_empty() {
            continue;
        }
        trailer.remove(key.as_str());
        for value in values {
            trailer.append(key.clone(), value);
        }
        merged += 1;
    }
    merged
}

/// Request extension naming the service interface (`package.Service`) a
/// unary call targets, for transports that route on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InterfaceKey(String);

impl InterfaceKey {
    /// Key for a fully-qualified service name
    pub fn new(interface: impl Into<String>) -> Self { Self(interface.into()) }

    /// The service name
    pub fn as_str(&self) -> &str { &self.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_string_lists_are_merged() {
        let mut attachments = Attachments::new();
        attachments.insert("x-trace", AttachmentValue::Strings(vec!["a".into(), "b".into()]));
        attachments.insert("x-single", AttachmentValue::Str("ignored".into()));
        attachments.insert("x-raw", AttachmentValue::Bytes(vec![1, 2]));
        attachments.insert("bad key", AttachmentValue::Strings(vec!["v".into()]));

        let mut trailer = MetadataMap::new();
        trailer.insert("x-trace", AsciiMetadataValue::from_static("old"));
        assert_eq!(merge_attachments(&mut trailer, &attachments), 1);

        let values: Vec<_> = trailer.get_all("x-trace").iter().map(|v| v.to_str().expect("ascii")).collect();
        assert_eq!(values, vec!["a", "b"]);
        assert!(trailer.get("x-single").is_none());
        assert!(trailer.get("x-raw").is_none());
    }

    #[test]
    fn malformed_values_are_ignored() {
        let mut attachments = Attachments::new();
        attachments.insert("x-multi", AttachmentValue::Strings(vec!["ok".into(), "bad\nvalue".into()]));
        let mut trailer = MetadataMap::new();
        merge_attachments(&mut trailer, &attachments);
        assert_eq!(trailer.get_all("x-multi").iter().count(), 1);
    }

    #[test]
    fn all_malformed_values_keep_the_existing_trailer() {
        let mut attachments = Attachments::new();
        attachments.insert("x-trace", AttachmentValue::Strings(vec!["bad\nvalue".into()]));
        attachments.insert("x-empty", AttachmentValue::Strings(Vec::new()));
        let mut trailer = MetadataMap::new();
        trailer.insert("x-trace", AsciiMetadataValue::from_static("kept"));
        trailer.insert("x-empty", AsciiMetadataValue::from_static("kept"));

        assert_eq!(merge_attachments(&mut trailer, &attachments), 0);
        assert_eq!(trailer.get("x-trace").map(|v| v.to_str().ok()), Some(Some("kept")));
        assert_eq!(trailer.get("x-empty").map(|v| v.to_str().ok()), Some(Some("kept")));
    }

    #[test]
    fn attachments_ride_on_a_failed_status() {
        let mut attachments = Attachments::new();
        attachments.insert("x-retry", AttachmentValue::Strings(vec!["later".into()]));
        let mut status = Status::unavailable("backend down");
        assert!(Attachments::from_status(&status).is_none());

        attachments.clone().attach_to(&mut status);
        assert_eq!(Attachments::from_status(&status), Some(&attachments));
        assert_eq!(status.message(), "backend down");
    }
}
