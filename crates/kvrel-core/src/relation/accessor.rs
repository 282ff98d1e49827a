use crate::{
    obs::sink::{MetricsEvent, record},
    registry::RelationRecord,
    store::{Pk, Store, StoreError},
};
use std::collections::BTreeSet;

///
/// ReverseAccessor
///
/// Read-only lookup installed on a target model under its related name.
/// Every call goes to the store; nothing is cached.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReverseAccessor {
    record: RelationRecord,
}

impl ReverseAccessor {
    pub(crate) const fn new(record: RelationRecord) -> Self {
        Self { record }
    }

    #[must_use]
    pub const fn record(&self) -> &RelationRecord {
        &self.record
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.record.related_name()
    }

    /// Pks of source records whose relation field references `pk`.
    pub fn call<S: Store + ?Sized>(&self, store: &S, pk: &Pk) -> Result<BTreeSet<Pk>, StoreError> {
        let pks = store.query_by_field(self.record.source(), self.record.field(), pk.as_str())?;

        record(MetricsEvent::ReverseLookup {
            model: self.record.target().as_str(),
            rows: u64::try_from(pks.len()).unwrap_or(u64::MAX),
        });

        Ok(pks)
    }
}
