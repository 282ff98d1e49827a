use crate::{
    Error,
    model::{ModelKey, OnDelete},
    obs::sink::{MetricsEvent, record},
    relation::{RelationError, ReverseAccessor},
    store::{Pk, Store},
};

///
/// CascadeReport
///
/// Outcome of clearing references to one deleted instance.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CascadeReport {
    /// Relations targeting the deleted model.
    pub relations: usize,
    /// Single-valued fields cleared.
    pub cleared: u64,
    /// Collection members removed.
    pub removed: u64,
}

/// Clear every reference to `target:pk` held through `accessors`.
///
/// Phase 1 refuses the delete if a restricting relation still references
/// the pk; nothing is mutated in that case. Phase 2 issues one conditional
/// mutation per referencing record, so re-running after a partial failure
/// only touches what is still stale.
pub(crate) fn on_delete<S: Store + ?Sized>(
    store: &S,
    accessors: &[ReverseAccessor],
    target: &ModelKey,
    pk: &Pk,
) -> Result<CascadeReport, Error> {
    // Phase 1: restrict
    for accessor in accessors {
        let relation = accessor.record();
        if relation.on_delete() != OnDelete::Restrict {
            continue;
        }

        let referencing = accessor.call(store, pk)?;
        let blocker = referencing
            .into_iter()
            .find(|source_pk| !(relation.source() == target && source_pk == pk));

        if let Some(referencing) = blocker {
            log::warn!(
                "delete of {target}:{pk} blocked by {relation} on record '{referencing}'"
            );
            record(MetricsEvent::DeleteBlocked {
                model: target.as_str(),
            });

            return Err(RelationError::DeleteBlocked {
                target: target.clone(),
                pk: pk.clone(),
                source_model: relation.source().clone(),
                field: relation.field().to_string(),
                referencing,
            }
            .into());
        }
    }

    // Phase 2: clear
    let mut report = CascadeReport {
        relations: accessors.len(),
        ..CascadeReport::default()
    };

    for accessor in accessors {
        let relation = accessor.record();
        let storage = relation.kind().storage();

        for source_pk in accessor.call(store, pk)? {
            if storage.is_collection() {
                if store.remove_member(
                    relation.source(),
                    &source_pk,
                    relation.field(),
                    storage,
                    pk.as_str(),
                )? {
                    report.removed += 1;
                }
            } else if store.clear_if(
                relation.source(),
                &source_pk,
                relation.field(),
                storage,
                pk.as_str(),
            )? {
                report.cleared += 1;
            }
        }
    }

    log::info!(
        "cascade {target}:{pk}: {} relations, {} cleared, {} removed",
        report.relations,
        report.cleared,
        report.removed
    );
    record(MetricsEvent::Cascade {
        model: target.as_str(),
        cleared: report.cleared,
        removed: report.removed,
    });

    Ok(report)
}
