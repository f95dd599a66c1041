//! Supervisor states and the admissible-transition table.
//!
//! Six states cover the bootloader lifecycle:
//!
//! ```text
//! IDLE ──START_SESSION──> DFU_ACTIVE ──END_SESSION──> DFU_VERIFY
//!   │                         │                            │
//!   │<───────ABORT────────────┘              valid ────> RUNNING_APP ──> IDLE
//!   │                                       invalid ────> ERROR ──heal──> IDLE
//!   │
//!   └──JUMP_APP──> DFU_VERIFY
//!
//! any state ──EMERGENCY_RESET / escalation──> EMERGENCY_RECOVERY ──heal──> IDLE
//! ```
//!
//! The table below is the single source of truth for which transitions the
//! supervisor may take; a request outside it forces entry into [`State::Error`].

/// A supervisor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for a session or a launch request.
    Idle,
    /// A firmware transfer is in progress.
    DfuActive,
    /// The received image is being fingerprint-checked.
    DfuVerify,
    /// Control is being handed to the installed application.
    RunningApp,
    /// Quarantine: only diagnostic traffic is honoured.
    EmergencyRecovery,
    /// A failure was recorded; the supervisor self-heals back to idle.
    Error,
}

impl State {
    /// A string name for logs and status reports.
    pub fn name(self) -> &'static str {
        match self {
            State::Idle => "IDLE",
            State::DfuActive => "DFU_ACTIVE",
            State::DfuVerify => "DFU_VERIFY",
            State::RunningApp => "RUNNING_APP",
            State::EmergencyRecovery => "EMERGENCY_RECOVERY",
            State::Error => "ERROR",
        }
    }
}

/// Whether the supervisor may move from `from` to `to`.
pub fn transition_admissible(from: State, to: State) -> bool {
    use State::*;
    match from {
        // Launch requests reach RunningApp via DfuVerify, so the verify
        // entry is an admissible step out of Idle.
        Idle => matches!(to, DfuActive | DfuVerify | RunningApp | EmergencyRecovery | Error),
        DfuActive => matches!(to, DfuVerify | Idle | EmergencyRecovery | Error),
        DfuVerify => matches!(to, RunningApp | Idle | EmergencyRecovery | Error),
        RunningApp => matches!(to, Idle | EmergencyRecovery | Error),
        EmergencyRecovery => matches!(to, Idle | Error),
        Error => matches!(to, Idle | EmergencyRecovery),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use State::*;

    const ALL: [State; 6] = [Idle, DfuActive, DfuVerify, RunningApp, EmergencyRecovery, Error];

    #[test]
    fn admissible_table_matches_design() {
        let admissible: &[(State, &[State])] = &[
            (Idle, &[DfuActive, DfuVerify, RunningApp, EmergencyRecovery, Error]),
            (DfuActive, &[DfuVerify, Idle, EmergencyRecovery, Error]),
            (DfuVerify, &[RunningApp, Idle, EmergencyRecovery, Error]),
            (RunningApp, &[Idle, EmergencyRecovery, Error]),
            (EmergencyRecovery, &[Idle, Error]),
            (Error, &[Idle, EmergencyRecovery]),
        ];

        for (from, allowed) in admissible {
            for to in ALL {
                assert_eq!(
                    transition_admissible(*from, to),
                    allowed.contains(&to),
                    "{} -> {}",
                    from.name(),
                    to.name(),
                );
            }
        }
    }

    #[test]
    fn no_self_transitions() {
        for state in ALL {
            assert!(!transition_admissible(state, state), "{}", state.name());
        }
    }

    #[test]
    fn recovery_only_heals_to_idle_or_fails() {
        assert!(transition_admissible(EmergencyRecovery, Idle));
        assert!(transition_admissible(EmergencyRecovery, Error));
        assert!(!transition_admissible(EmergencyRecovery, DfuActive));
        assert!(!transition_admissible(EmergencyRecovery, RunningApp));
    }
}
