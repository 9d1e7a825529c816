//! Per-PID 4-bit continuity counters.

/// Counter stamped into outgoing packets of one PID.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContinuityCounter(u8);

impl ContinuityCounter {
    pub const MAX: u8 = 0x0F;

    pub fn new() -> Self {
        Self(0)
    }

    /// Returns the current value and advances, wrapping after 15.
    pub fn next(&mut self) -> u8 {
        let current = self.0;
        self.0 = (self.0 + 1) & Self::MAX;
        current
    }

    pub fn reset(&mut self) {
        self.0 = 0;
    }
}

/// Outcome of checking one received counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuity {
    Continuous,
    /// Same counter as the previous packet. One repeat is allowed and the
    /// packet carries nothing new.
    Duplicate,
    Gap,
}

/// Receive-side tracking of one PID.
///
/// A gap raises the error flag, which stays set until the owner clears it
/// at the next payload unit start.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContinuityState {
    last: Option<u8>,
    repeated: bool,
    error: bool,
}

impl ContinuityState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a counter from a packet carrying payload.
    pub fn check(&mut self, counter: u8) -> Continuity {
        let counter = counter & ContinuityCounter::MAX;
        let result = match self.last {
            None => Continuity::Continuous,
            Some(last) if counter == (last + 1) & ContinuityCounter::MAX => Continuity::Continuous,
            Some(last) if counter == last && !self.repeated => Continuity::Duplicate,
            Some(_) => Continuity::Gap,
        };
        match result {
            Continuity::Duplicate => self.repeated = true,
            Continuity::Gap => {
                self.error = true;
                self.repeated = false;
            }
            Continuity::Continuous => self.repeated = false,
        }
        self.last = Some(counter);
        result
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    pub fn clear_error(&mut self) {
        self.error = false;
    }

    pub fn last(&self) -> Option<u8> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn test_counter_wraps() {
        let mut cc = ContinuityCounter::new();
        let values: Vec<u8> = (0..18).map(|_| cc.next()).collect();
        assert_eq!(&values[..3], &[0, 1, 2]);
        assert_eq!(values[15], 15);
        assert_eq!(values[16], 0);
        assert_eq!(cc.next(), 2);
        cc.reset();
        assert_eq!(cc.next(), 0);
    }

    #[test]
    fn test_state_detects_gap() {
        let mut state = ContinuityState::new();
        assert_eq!(state.check(14), Continuity::Continuous);
        assert_eq!(state.check(15), Continuity::Continuous);
        assert_eq!(state.check(0), Continuity::Continuous);
        assert!(!state.has_error());

        assert_eq!(state.check(2), Continuity::Gap);
        assert!(state.has_error());
        // recovers relative to the new value, flag stays until cleared
        assert_eq!(state.check(3), Continuity::Continuous);
        assert!(state.has_error());
        state.clear_error();
        assert!(!state.has_error());
        assert_eq!(state.last(), Some(3));
    }

    #[test]
    fn test_state_allows_one_duplicate() {
        let mut state = ContinuityState::new();
        assert_eq!(state.check(7), Continuity::Continuous);
        assert_eq!(state.check(7), Continuity::Duplicate);
        assert!(!state.has_error());
        assert_eq!(state.check(8), Continuity::Continuous);

        // a second repeat of the same counter is a gap
        assert_eq!(state.check(8), Continuity::Duplicate);
        assert_eq!(state.check(8), Continuity::Gap);
        assert!(state.has_error());
    }

    #[quickcheck]
    fn prop_counter_sequence_is_continuous(start: u8, steps: u8) -> bool {
        let mut counter = ContinuityCounter(start & ContinuityCounter::MAX);
        let mut state = ContinuityState::new();
        (0..steps).all(|_| state.check(counter.next()) == Continuity::Continuous) && !state.has_error()
    }
}
