use crate::report::{BatchReport, CompletedTarget};
use crate::view_model::BatchViewModel;
use crate::{FailureReason, Outcome, Target, TargetIndex};

/// Pre-sized slot array with one terminal outcome per target.
///
/// Slots are addressed by input index, so the order in which workers finish
/// never leaks into the report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchState {
    targets: Vec<Target>,
    slots: Vec<Option<Outcome>>,
    succeeded: usize,
    failed: usize,
}

impl BatchState {
    pub fn new(targets: Vec<Target>) -> Self {
        let slots = vec![None; targets.len()];
        Self {
            targets,
            slots,
            succeeded: 0,
            failed: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Stores the terminal outcome for `index`.
    ///
    /// Returns `false` and leaves state untouched when the index is out of
    /// range or the slot already holds an outcome.
    pub fn record(&mut self, index: TargetIndex, outcome: Outcome) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if slot.is_some() {
            return false;
        }
        if outcome.is_success() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        *slot = Some(outcome);
        true
    }

    pub fn outcome(&self, index: TargetIndex) -> Option<&Outcome> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn is_complete(&self) -> bool {
        self.succeeded + self.failed == self.slots.len()
    }

    /// Records `Cancelled` for every target that never got an outcome.
    ///
    /// `filename_for` supplies the filename the target would have used.
    pub fn cancel_remaining<F>(&mut self, mut filename_for: F) -> usize
    where
        F: FnMut(&Target) -> String,
    {
        let pending: Vec<TargetIndex> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(index, _)| index)
            .collect();
        for &index in &pending {
            let filename = filename_for(&self.targets[index]);
            self.record(index, Outcome::failure(filename, FailureReason::Cancelled));
        }
        pending.len()
    }

    pub fn view(&self) -> BatchViewModel {
        BatchViewModel {
            total: self.slots.len(),
            completed: self.succeeded + self.failed,
            succeeded: self.succeeded,
            failed: self.failed,
        }
    }

    /// Consumes the state into a report in input order.
    ///
    /// Slots still empty at this point count as cancelled with no filename.
    pub fn into_report(self) -> BatchReport {
        let entries = self
            .targets
            .into_iter()
            .zip(self.slots)
            .map(|(target, slot)| CompletedTarget {
                index: target.index,
                url: target.url,
                outcome: slot
                    .unwrap_or_else(|| Outcome::failure(String::new(), FailureReason::Cancelled)),
            })
            .collect();
        BatchReport::new(entries)
    }
}
