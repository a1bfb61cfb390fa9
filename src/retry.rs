/// Sliding per-byte deadline plus a bounded retransmission counter.
///
/// The deadline is pushed out on every accepted byte, so only silence longer
/// than `byte_timeout_ms` expires it. Tick values wrap.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    byte_timeout_ms: u32,
    remaining: u8,
    deadline: u32,
}

impl RetryPolicy {
    pub const fn new(byte_timeout_ms: u32) -> RetryPolicy {
        RetryPolicy {
            byte_timeout_ms,
            remaining: 0,
            deadline: 0,
        }
    }

    /// Start a new operation with `retransmissions` resends allowed
    pub fn reset(&mut self, retransmissions: u8) {
        self.remaining = retransmissions;
    }

    /// Set the deadline one byte period from `now`
    pub fn arm(&mut self, now: u32) {
        self.deadline = now.wrapping_add(self.byte_timeout_ms);
    }

    pub fn expired(&self, now: u32) -> bool {
        now.wrapping_sub(self.deadline) as i32 >= 0
    }

    /// Consume one retransmission, if any are left
    pub fn take(&mut self) -> bool {
        match self.remaining.checked_sub(1) {
            Some(left) => {
                self.remaining = left;
                true
            }
            None => false,
        }
    }

    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    pub fn deadline(&self) -> u32 {
        self.deadline
    }
}
