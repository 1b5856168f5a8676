//! Time accounting engine: event stream → state → discounts → invoice.

use std::collections::HashMap;

use crate::db::models::{ExecutionEventRecord, StepRecord, VisitRecord};
use crate::db::repository::FullRepository;
use crate::error::{OdbError, OdbResult};
use crate::models::{ChargeClass, DatasetQaState, StepId, Timestamp, TimestampInterval, VisitId};
use crate::services::twilight::{night_window, TwilightBound};

use super::charge::{CategorizedTime, TimeChargeInvoice};
use super::discount::{Discount, DiscountCategory};
use super::state::{Context, TimeAccountingState};

/// Engine configuration; the twilight bound is set by the deployment.
#[derive(Debug, Copy, Clone)]
pub struct AccountingConfig {
    pub twilight: TwilightBound,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        AccountingConfig {
            twilight: TwilightBound::Nautical,
        }
    }
}

/// Fail on the first non-monotonic timestamp pair.
pub fn validate_event_order(events: &[ExecutionEventRecord]) -> OdbResult<()> {
    for pair in events.windows(2) {
        if pair[1].event.timestamp <= pair[0].event.timestamp {
            return Err(OdbError::internal(format!(
                "event stream out of order at {}: {} follows {}",
                pair[1].id, pair[1].event.timestamp, pair[0].event.timestamp
            )));
        }
    }
    Ok(())
}

fn context_for(
    visit: &VisitRecord,
    record: &ExecutionEventRecord,
    steps: &HashMap<StepId, StepRecord>,
) -> Context {
    let visit_level = Context::visit(visit.id, ChargeClass::Program);
    match record.event.step_id() {
        Some(step_id) => match steps.get(&step_id) {
            Some(step) => Context::for_step(
                visit.id,
                step.atom_id,
                step.id,
                step.observe_class.charge_class(),
            ),
            None => visit_level,
        },
        None => visit_level,
    }
}

/// Fold an ordered event stream into accounting state.
///
/// Contiguous events sharing a context become one chunk spanning first to
/// last timestamp; the remaining time between the first and last event is
/// attributed to the visit.
pub fn fold_events(
    visit: &VisitRecord,
    events: &[ExecutionEventRecord],
    steps: &HashMap<StepId, StepRecord>,
) -> OdbResult<TimeAccountingState> {
    validate_event_order(events)?;

    let (first, last) = match (events.first(), events.last()) {
        (Some(f), Some(l)) => (f.event.timestamp, l.event.timestamp),
        _ => return Ok(TimeAccountingState::empty()),
    };

    // group contiguous events sharing a context
    let mut groups: Vec<(TimestampInterval, Context)> = Vec::new();
    let mut current: Option<(Timestamp, Timestamp, Context)> = None;
    for record in events {
        let context = context_for(visit, record, steps);
        let t = record.event.timestamp;
        current = Some(match current.take() {
            Some((start, _, ctx)) if ctx == context => (start, t, ctx),
            Some((start, end, ctx)) => {
                groups.push((TimestampInterval::between(start, end), ctx));
                (t, t, context)
            }
            None => (t, t, context),
        });
    }
    if let Some((start, end, ctx)) = current {
        groups.push((TimestampInterval::between(start, end), ctx));
    }

    // fill gaps (and empty-group holes) with visit-level time
    let visit_level = Context::visit(visit.id, ChargeClass::Program);
    let mut entries: Vec<(TimestampInterval, Context)> = Vec::new();
    let mut cursor = first;
    for (interval, context) in groups.into_iter().filter(|(i, _)| !i.is_empty()) {
        if cursor < interval.start {
            entries.push((TimestampInterval::between(cursor, interval.start), visit_level));
        }
        cursor = cursor.max(interval.end);
        entries.push((interval, context));
    }
    if cursor < last {
        entries.push((TimestampInterval::between(cursor, last), visit_level));
    }

    Ok(TimeAccountingState::from_entries(entries))
}

/// Discount the portions of the state outside the site's night window.
fn discount_daylight(
    state: TimeAccountingState,
    visit: &VisitRecord,
    config: &AccountingConfig,
) -> (TimeAccountingState, Vec<Discount>) {
    let Some(span) = state.span() else {
        return (state, Vec::new());
    };
    let Some(window) = night_window(visit.site, span.start, config.twilight) else {
        return (state, Vec::new());
    };

    let mut discounts = Vec::new();
    for region in span.minus(&window) {
        let portion = state.between(&region);
        if portion.is_empty() {
            continue;
        }
        discounts.push(Discount {
            interval: portion.span().unwrap_or(region),
            amounts: portion.charge(),
            category: DiscountCategory::Daylight { site: visit.site },
            comment: format!("time outside {:?} twilight", config.twilight).to_lowercase(),
        });
    }
    if discounts.is_empty() {
        (state, discounts)
    } else {
        (state.between(&window), discounts)
    }
}

/// Discount everything when the visit produced no dataset-bearing steps.
fn discount_no_data(state: TimeAccountingState) -> (TimeAccountingState, Vec<Discount>) {
    if !state.all_atoms().is_empty() || state.charge().is_zero() {
        return (state, Vec::new());
    }
    let span = match state.span() {
        Some(span) => span,
        None => return (state, Vec::new()),
    };
    let discount = Discount {
        interval: span,
        amounts: state.charge(),
        category: DiscountCategory::NoData,
        comment: "visit produced no data".to_string(),
    };
    (TimeAccountingState::empty(), vec![discount])
}

/// Discount the atom-spanning interval of every step whose dataset failed
/// QA. Atom boundaries are never split.
fn discount_qa_failed(
    mut state: TimeAccountingState,
    failed_steps: &[StepId],
) -> (TimeAccountingState, Vec<Discount>) {
    let mut discounts = Vec::new();
    for step_id in failed_steps {
        let step_chunks: Vec<TimestampInterval> = state
            .entries()
            .iter()
            .filter(|(_, ctx)| ctx.step_id() == Some(*step_id))
            .map(|(interval, _)| *interval)
            .collect();
        let Some(first) = step_chunks.first() else {
            continue;
        };
        let step_interval = step_chunks.iter().fold(*first, |acc, i| acc.span(i));

        let (inside, widened, outside) = state.partition_on_atom_boundary(&step_interval);
        if inside.is_empty() {
            continue;
        }
        discounts.push(Discount {
            interval: widened,
            amounts: inside.charge(),
            category: DiscountCategory::Qa,
            comment: "dataset failed quality assessment".to_string(),
        });
        state = outside;
    }
    (state, discounts)
}

/// Compute the auditable invoice for one visit from its recorded history.
pub async fn invoice_for_visit(
    repo: &dyn FullRepository,
    visit_id: VisitId,
    config: &AccountingConfig,
) -> OdbResult<TimeChargeInvoice> {
    let visit = repo
        .get_visit(visit_id)
        .await?
        .ok_or_else(|| OdbError::visit_not_found(visit_id))?;

    let events = repo.list_events(visit_id).await?;
    let steps: HashMap<StepId, StepRecord> = repo
        .list_steps(visit.observation_id)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();

    let state = fold_events(&visit, &events, &steps)?;
    let execution_time: CategorizedTime = state.charge();

    let (state, mut discounts) = discount_daylight(state, &visit, config);
    let (state, no_data) = discount_no_data(state);
    discounts.extend(no_data);

    let mut failed_steps: Vec<(StepId, crate::models::DatasetFilename)> = repo
        .list_datasets(visit_id)
        .await?
        .into_iter()
        .filter(|d| d.qa_state == Some(DatasetQaState::Fail))
        .map(|d| (d.step_id, d.filename))
        .collect();
    failed_steps.sort_by_key(|(_, filename)| *filename);
    failed_steps.dedup_by_key(|(step_id, _)| *step_id);
    let failed_step_ids: Vec<StepId> = failed_steps.into_iter().map(|(s, _)| s).collect();

    let (_state, qa) = discount_qa_failed(state, &failed_step_ids);
    discounts.extend(qa);

    let corrections = repo.list_corrections(visit_id).await?;

    Ok(TimeChargeInvoice::compute(
        execution_time,
        discounts,
        corrections,
    ))
}
