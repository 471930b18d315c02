//! IRCv3 capability negotiation.
//!
//! The session opens with `CAP LS 302`, requests the intersection of the
//! configured capability set with what the server advertised (plus `sasl`
//! when SASL is configured), and tracks ACK/NAK until the pending set
//! drains. The machine here is sans-IO: it records phase and pending
//! requests while the protocol handler issues the actual frames.
//!
//! # Reference
//! - IRCv3 Capability Negotiation: <https://ircv3.net/specs/extensions/capability-negotiation>

/// Negotiation phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CapPhase {
    /// Nothing sent yet.
    #[default]
    None,
    /// `CAP LS 302` sent, collecting the (possibly multi-line) listing.
    LsOpen,
    /// `CAP REQ` sent, waiting for ACK/NAK.
    Requested,
    /// Every requested capability was answered.
    Acked,
    /// `CAP END` sent.
    End,
}

/// Tracks capability negotiation for one connection attempt.
#[derive(Clone, Debug, Default)]
pub struct CapNegotiation {
    phase: CapPhase,
    ls_buffer: Vec<(String, Option<String>)>,
    pending: Vec<String>,
}

impl CapNegotiation {
    /// Reset for a fresh connection and mark the listing open.
    pub fn start(&mut self) {
        *self = Self {
            phase: CapPhase::LsOpen,
            ..Self::default()
        };
    }

    /// Current phase.
    pub fn phase(&self) -> CapPhase {
        self.phase
    }

    /// Capabilities requested but not yet answered.
    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Absorb one `CAP * LS` frame.
    ///
    /// A `*` marker before the capability list means more lines follow.
    /// Returns the complete advertised set once the final line arrives.
    pub fn absorb_ls(&mut self, more_coming: bool, caps: &str) -> Option<Vec<(String, Option<String>)>> {
        for cap in caps.split_whitespace() {
            let (name, value) = match cap.split_once('=') {
                Some((n, v)) => (n.to_string(), Some(v.to_string())),
                None => (cap.to_string(), None),
            };
            self.ls_buffer.push((name, value));
        }
        if more_coming {
            return None;
        }
        Some(std::mem::take(&mut self.ls_buffer))
    }

    /// Decide what to request: the configured capabilities the server
    /// advertises, plus `sasl` when SASL is configured.
    ///
    /// Returns the deduplicated request list (empty means negotiation can
    /// end immediately) and records it as pending.
    pub fn compute_request(
        &mut self,
        wanted: &[String],
        sasl: bool,
        advertised: impl Fn(&str) -> bool,
    ) -> Vec<String> {
        let mut request: Vec<String> = wanted
            .iter()
            .filter(|cap| advertised(cap))
            .cloned()
            .collect();
        if sasl {
            request.push("sasl".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        request.retain(|cap| seen.insert(cap.clone()));
        self.pending = request.clone();
        self.phase = if request.is_empty() {
            CapPhase::Acked
        } else {
            CapPhase::Requested
        };
        request
    }

    /// Remove acknowledged capabilities from the pending set.
    ///
    /// Returns true when nothing remains pending.
    pub fn ack(&mut self, caps: &str) -> bool {
        self.retire(caps)
    }

    /// Remove rejected capabilities from the pending set.
    ///
    /// Returns true when nothing remains pending.
    pub fn nak(&mut self, caps: &str) -> bool {
        self.retire(caps)
    }

    fn retire(&mut self, caps: &str) -> bool {
        for cap in caps.split_whitespace() {
            let name = cap.trim_start_matches(['-', '~', '=']);
            self.pending.retain(|p| p != name);
        }
        if self.pending.is_empty() {
            self.phase = CapPhase::Acked;
            true
        } else {
            false
        }
    }

    /// Mark `CAP END` sent.
    pub fn finish(&mut self) {
        self.phase = CapPhase::End;
    }
}
