/// Progress snapshot of a running batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchViewModel {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchViewModel {
    pub fn remaining(&self) -> usize {
        self.total - self.completed
    }
}
