use crate::state::PageState;
use crate::HarvestError;

/// Tracks one listing page through the page state machine
#[derive(Debug, Clone)]
pub struct PageCycle {
    page: u32,
    state: PageState,
}

impl PageCycle {
    /// Starts a new cycle for `page` in the `Fetching` state
    pub fn start(page: u32) -> Self {
        tracing::trace!(page, "page {}", PageState::Fetching);
        Self {
            page,
            state: PageState::Fetching,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    /// Moves to `next`, or fails with `InvalidTransition` if the step is illegal
    pub fn advance(&mut self, next: PageState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::trace!(page = self.page, "page {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}
