//! Notification bridge helpers shared by both backends
//!
//! Backends drain their own event queues; once they hold an authoritative
//! raw value they hand it to `confirm`, which updates the cache and fires
//! the consumer callback for real changes only.

use tracing::debug;

use super::cache::{Reconciled, StateCache};
use crate::data::{AbstractValue, AttributeId, RawValue};

/// Consumer callback: attribute and its new abstract value
pub type Notify<'a> = dyn FnMut(AttributeId, AbstractValue) + 'a;

/// Store an authoritative value and notify on an actual change.
///
/// Returns true if the callback fired.
pub fn confirm(cache: &mut StateCache, id: AttributeId, raw: RawValue, notify: &mut Notify<'_>) -> bool {
    match cache.reconcile(id, raw) {
        Reconciled::Changed(Some(value)) => {
            debug!("{} changed to {} (raw {})", id, value, raw);
            notify(id, value);
            true
        }
        Reconciled::Changed(None) => {
            debug!("{} changed to untranslatable raw {}", id, raw);
            false
        }
        Reconciled::Unchanged => {
            debug!("{} unchanged at raw {}, ignoring notification", id, raw);
            false
        }
        Reconciled::Unknown => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AttributeMetadata;
    use crate::engine::Handle;

    #[test]
    fn test_confirm_notifies_once_per_change() {
        let mut cache = StateCache::new();
        cache.insert(
            AttributeId::Aspect,
            Handle::Symbol(1),
            AttributeMetadata::Enum { values: vec![40, 41] },
            40,
        );
        let mut seen = Vec::new();
        let mut notify = |id: AttributeId, value: AbstractValue| seen.push((id, value));

        assert!(confirm(&mut cache, AttributeId::Aspect, 41, &mut notify));
        assert!(!confirm(&mut cache, AttributeId::Aspect, 41, &mut notify));
        assert!(!confirm(&mut cache, AttributeId::Aspect, 77, &mut notify));
        assert!(confirm(&mut cache, AttributeId::Aspect, 40, &mut notify));

        assert_eq!(seen, vec![(AttributeId::Aspect, 1), (AttributeId::Aspect, 0)]);
    }
}
