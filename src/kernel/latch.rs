/// A boolean that can be set but never cleared.
/// The only way back to unarmed is dropping the owner (ending the session).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Latch {
    armed: bool,
}

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the latch. Returns true if this call did the arming.
    pub fn arm(&mut self) -> bool {
        let was_armed = self.armed;
        self.armed = true;
        !was_armed
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }
}
