/// Number of active rows the consumer wants, grown on demand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capacity {
    initial: usize,
    rows: usize,
    step: usize,
}

impl Capacity {
    pub fn new(initial: usize, step: usize) -> Self {
        Self {
            initial,
            rows: initial,
            step,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// Adds one step of rows and returns the new capacity.
    pub fn grow(&mut self) -> usize {
        self.rows = self.rows.saturating_add(self.step);
        self.rows
    }

    pub fn reset(&mut self) {
        self.rows = self.initial;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_by_step_and_resets_to_initial() {
        let mut capacity = Capacity::new(30, 10);
        assert_eq!(capacity.grow(), 40);
        assert_eq!(capacity.grow(), 50);
        assert_eq!(capacity.rows(), 50);
        capacity.reset();
        assert_eq!(capacity.rows(), 30);
    }

    #[test]
    fn growth_saturates() {
        let mut capacity = Capacity::new(usize::MAX - 1, 10);
        assert_eq!(capacity.grow(), usize::MAX);
    }
}
