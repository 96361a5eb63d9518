/// Connection edge seen by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEdge {
    Connected,
    Disconnected,
}

/// Two-state edge detector over the transport's `connected` flag
///
/// Repeated observations of the same level produce no edge, so duplicated
/// callbacks from the radio stack never fire twice.
#[derive(Debug, Default)]
pub struct ConnectionMonitor {
    previous: bool,
    connects: u32,
}

impl ConnectionMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, connected: bool) -> Option<LinkEdge> {
        if connected == self.previous {
            return None;
        }
        self.previous = connected;

        if connected {
            self.connects += 1;
            Some(LinkEdge::Connected)
        } else {
            Some(LinkEdge::Disconnected)
        }
    }

    pub fn is_connected(&self) -> bool {
        self.previous
    }

    /// Connect edges seen so far
    pub fn connects(&self) -> u32 {
        self.connects
    }
}
