//! Time accounting state: an ordered mapping from non-overlapping,
//! non-empty intervals to charge contexts.
//!
//! Normalization invariants, preserved by every operation:
//! - intervals are strictly ordered by start and pairwise disjoint;
//! - no interval is empty;
//! - abutting intervals with identical context are merged.

use serde::{Deserialize, Serialize};

use std::collections::BTreeSet;

use crate::models::{AtomId, ChargeClass, StepId, Timestamp, TimestampInterval, VisitId};

use super::charge::CategorizedTime;

/// Step-level charge context.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StepContext {
    pub atom_id: AtomId,
    pub step_id: StepId,
    pub charge_class: ChargeClass,
}

/// What an interval of time was spent on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Context {
    pub visit_id: VisitId,
    pub charge_class: ChargeClass,
    pub step: Option<StepContext>,
}

impl Context {
    /// Visit-level context with no step attribution.
    pub fn visit(visit_id: VisitId, charge_class: ChargeClass) -> Context {
        Context {
            visit_id,
            charge_class,
            step: None,
        }
    }

    pub fn for_step(
        visit_id: VisitId,
        atom_id: AtomId,
        step_id: StepId,
        charge_class: ChargeClass,
    ) -> Context {
        Context {
            visit_id,
            charge_class,
            step: Some(StepContext {
                atom_id,
                step_id,
                charge_class,
            }),
        }
    }

    pub fn atom_id(&self) -> Option<AtomId> {
        self.step.map(|s| s.atom_id)
    }

    pub fn step_id(&self) -> Option<StepId> {
        self.step.map(|s| s.step_id)
    }

    /// Step context charge class when present, visit-level otherwise.
    pub fn effective_charge_class(&self) -> ChargeClass {
        self.step.map(|s| s.charge_class).unwrap_or(self.charge_class)
    }
}

/// Ordered, disjoint, labeled interval sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeAccountingState {
    entries: Vec<(TimestampInterval, Context)>,
}

impl TimeAccountingState {
    pub fn empty() -> TimeAccountingState {
        TimeAccountingState::default()
    }

    /// Normalize a chunk list: drop empty intervals, order by start, merge
    /// abutting runs with identical context. Input intervals must be
    /// disjoint.
    pub fn from_entries<I>(entries: I) -> TimeAccountingState
    where
        I: IntoIterator<Item = (TimestampInterval, Context)>,
    {
        let mut chunks: Vec<(TimestampInterval, Context)> = entries
            .into_iter()
            .filter(|(interval, _)| !interval.is_empty())
            .collect();
        chunks.sort_by_key(|(interval, _)| (interval.start, interval.end));

        let mut merged: Vec<(TimestampInterval, Context)> = Vec::with_capacity(chunks.len());
        for (interval, context) in chunks {
            match merged.last_mut() {
                Some((last, last_ctx))
                    if *last_ctx == context && last.end == interval.start =>
                {
                    last.end = interval.end;
                }
                _ => {
                    debug_assert!(
                        merged
                            .last()
                            .map(|(last, _)| last.end <= interval.start)
                            .unwrap_or(true),
                        "overlapping intervals in accounting state input"
                    );
                    merged.push((interval, context));
                }
            }
        }

        TimeAccountingState { entries: merged }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Chunks in start order.
    pub fn entries(&self) -> &[(TimestampInterval, Context)] {
        &self.entries
    }

    /// Smallest interval covering the whole state.
    pub fn span(&self) -> Option<TimestampInterval> {
        let first = self.entries.first()?.0;
        let last = self.entries.last()?.0;
        Some(first.span(&last))
    }

    /// The part strictly before `t`. A chunk straddling `t` is split; a
    /// chunk starting at `t` belongs wholly to [`TimeAccountingState::from`].
    pub fn until(&self, t: Timestamp) -> TimeAccountingState {
        let entries = self.entries.iter().filter_map(|(interval, context)| {
            if interval.end <= t {
                Some((*interval, *context))
            } else if interval.start < t {
                Some((TimestampInterval::between(interval.start, t), *context))
            } else {
                None
            }
        });
        TimeAccountingState::from_entries(entries)
    }

    /// The part at or after `t`.
    pub fn from(&self, t: Timestamp) -> TimeAccountingState {
        let entries = self.entries.iter().filter_map(|(interval, context)| {
            if interval.start >= t {
                Some((*interval, *context))
            } else if interval.end > t {
                Some((TimestampInterval::between(t, interval.end), *context))
            } else {
                None
            }
        });
        TimeAccountingState::from_entries(entries)
    }

    /// The part inside `interval`; empty for an empty interval.
    pub fn between(&self, interval: &TimestampInterval) -> TimeAccountingState {
        if interval.is_empty() {
            return TimeAccountingState::empty();
        }
        self.from(interval.start).until(interval.end)
    }

    /// The part outside `interval`. `between` and `excluding` partition the
    /// state.
    pub fn excluding(&self, interval: &TimestampInterval) -> TimeAccountingState {
        if interval.is_empty() {
            return self.clone();
        }
        let mut entries: Vec<(TimestampInterval, Context)> =
            self.until(interval.start).entries.clone();
        entries.extend(self.from(interval.end).entries.iter().copied());
        TimeAccountingState::from_entries(entries)
    }

    /// Total charged time per class.
    pub fn charge(&self) -> CategorizedTime {
        self.entries
            .iter()
            .map(|(interval, context)| (context.effective_charge_class(), interval.duration()))
            .collect()
    }

    /// Every atom appearing in a step context.
    pub fn all_atoms(&self) -> BTreeSet<AtomId> {
        self.entries
            .iter()
            .filter_map(|(_, context)| context.atom_id())
            .collect()
    }

    /// Atoms whose chunks intersect `interval`.
    pub fn atoms_intersecting(&self, interval: &TimestampInterval) -> BTreeSet<AtomId> {
        self.entries
            .iter()
            .filter(|(chunk, _)| chunk.intersection(interval).is_some())
            .filter_map(|(_, context)| context.atom_id())
            .collect()
    }

    /// Smallest interval covering every chunk of the given atoms.
    pub fn interval_containing(&self, atoms: &BTreeSet<AtomId>) -> Option<TimestampInterval> {
        let mut result: Option<TimestampInterval> = None;
        for (interval, context) in &self.entries {
            if context.atom_id().is_some_and(|a| atoms.contains(&a)) {
                result = Some(match result {
                    Some(acc) => acc.span(interval),
                    None => *interval,
                });
            }
        }
        result
    }

    /// Split the state around `interval`, grown so that no atom is split:
    /// the first half is everything inside the widened interval, the second
    /// everything outside. The widening covers the full extent of every
    /// atom intersecting `interval` (and the interval itself), keeping the
    /// two halves a partition of the state.
    pub fn partition_on_atom_boundary(
        &self,
        interval: &TimestampInterval,
    ) -> (TimeAccountingState, TimestampInterval, TimeAccountingState) {
        let atoms = self.atoms_intersecting(interval);
        let widened = match self.interval_containing(&atoms) {
            Some(atom_span) => atom_span.span(interval),
            None => *interval,
        };
        (self.between(&widened), widened, self.excluding(&widened))
    }

    /// Split by whether the step context belongs to the given atom.
    pub fn partition_on_atom(&self, atom_id: AtomId) -> (TimeAccountingState, TimeAccountingState) {
        let (matching, rest): (Vec<_>, Vec<_>) = self
            .entries
            .iter()
            .copied()
            .partition(|(_, context)| context.atom_id() == Some(atom_id));
        (
            TimeAccountingState::from_entries(matching),
            TimeAccountingState::from_entries(rest),
        )
    }

    /// Concatenate two states with disjoint coverage.
    pub fn merged_with(&self, other: &TimeAccountingState) -> TimeAccountingState {
        let mut entries = self.entries.clone();
        entries.extend(other.entries.iter().copied());
        TimeAccountingState::from_entries(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimeSpan;

    fn ts(secs: i64) -> Timestamp {
        Timestamp::from_microseconds(secs * 1_000_000).unwrap()
    }

    fn iv(a: i64, b: i64) -> TimestampInterval {
        TimestampInterval::between(ts(a), ts(b))
    }

    fn visit_ctx(visit_id: VisitId) -> Context {
        Context::visit(visit_id, ChargeClass::Program)
    }

    #[test]
    fn test_from_entries_merges_abutting_equal_context() {
        let v = VisitId::random();
        let state = TimeAccountingState::from_entries(vec![
            (iv(0, 5), visit_ctx(v)),
            (iv(5, 10), visit_ctx(v)),
        ]);
        assert_eq!(state.entries().len(), 1);
        assert_eq!(state.entries()[0].0, iv(0, 10));
    }

    #[test]
    fn test_from_entries_keeps_distinct_contexts() {
        let v = VisitId::random();
        let a = AtomId::random();
        let s = StepId::random();
        let state = TimeAccountingState::from_entries(vec![
            (iv(0, 5), visit_ctx(v)),
            (iv(5, 10), Context::for_step(v, a, s, ChargeClass::Program)),
        ]);
        assert_eq!(state.entries().len(), 2);
    }

    #[test]
    fn test_from_entries_drops_empty() {
        let v = VisitId::random();
        let state = TimeAccountingState::from_entries(vec![(iv(5, 5), visit_ctx(v))]);
        assert!(state.is_empty());
    }

    #[test]
    fn test_until_from_partition() {
        let v = VisitId::random();
        let state = TimeAccountingState::from_entries(vec![(iv(0, 10), visit_ctx(v))]);
        let until = state.until(ts(4));
        let from = state.from(ts(4));
        assert_eq!(until.entries()[0].0, iv(0, 4));
        assert_eq!(from.entries()[0].0, iv(4, 10));
        assert_eq!(until.merged_with(&from), state);
    }

    #[test]
    fn test_boundary_chunk_goes_to_from() {
        let v = VisitId::random();
        let state = TimeAccountingState::from_entries(vec![(iv(4, 10), visit_ctx(v))]);
        assert!(state.until(ts(4)).is_empty());
        assert_eq!(state.from(ts(4)), state);
    }

    #[test]
    fn test_between_excluding_partition() {
        let v = VisitId::random();
        let state = TimeAccountingState::from_entries(vec![(iv(0, 30), visit_ctx(v))]);
        let i = iv(10, 20);
        let inside = state.between(&i);
        let outside = state.excluding(&i);
        assert_eq!(inside.charge().total(), TimeSpan::from_seconds(10));
        assert_eq!(outside.charge().total(), TimeSpan::from_seconds(20));
        assert_eq!(inside.merged_with(&outside), state);
    }

    #[test]
    fn test_charge_uses_step_context_class() {
        let v = VisitId::random();
        let a = AtomId::random();
        let s = StepId::random();
        let state = TimeAccountingState::from_entries(vec![
            (iv(0, 5), Context::for_step(v, a, s, ChargeClass::Partner)),
            (iv(5, 8), visit_ctx(v)),
        ]);
        let charge = state.charge();
        assert_eq!(charge.get(ChargeClass::Partner), TimeSpan::from_seconds(5));
        assert_eq!(charge.get(ChargeClass::Program), TimeSpan::from_seconds(3));
    }

    #[test]
    fn test_partition_on_atom_boundary_never_splits_atom() {
        let v = VisitId::random();
        let a1 = AtomId::random();
        let a2 = AtomId::random();
        let s = StepId::random;
        let state = TimeAccountingState::from_entries(vec![
            (iv(0, 4), Context::for_step(v, a1, s(), ChargeClass::Program)),
            (iv(4, 8), Context::for_step(v, a1, s(), ChargeClass::Program)),
            (iv(8, 12), Context::for_step(v, a2, s(), ChargeClass::Program)),
        ]);
        // query covers only part of a1
        let (inside, widened, outside) = state.partition_on_atom_boundary(&iv(2, 3));
        assert_eq!(widened, iv(0, 8));
        assert_eq!(inside.all_atoms(), BTreeSet::from([a1]));
        assert_eq!(outside.all_atoms(), BTreeSet::from([a2]));
        assert_eq!(inside.merged_with(&outside), state);
    }

    #[test]
    fn test_partition_on_atom() {
        let v = VisitId::random();
        let a1 = AtomId::random();
        let a2 = AtomId::random();
        let s = StepId::random;
        let state = TimeAccountingState::from_entries(vec![
            (iv(0, 4), Context::for_step(v, a1, s(), ChargeClass::Program)),
            (iv(4, 8), Context::for_step(v, a2, s(), ChargeClass::Program)),
            (iv(8, 12), Context::for_step(v, a1, s(), ChargeClass::Program)),
        ]);
        let (matching, rest) = state.partition_on_atom(a1);
        assert_eq!(matching.all_atoms(), BTreeSet::from([a1]));
        assert_eq!(rest.all_atoms(), BTreeSet::from([a2]));
        assert_eq!(
            matching.charge().total(),
            TimeSpan::from_seconds(8)
        );
    }
}
