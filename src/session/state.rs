/// step of an execution a [Session](super::Session) is at
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum State {
    /// nothing in flight, last execution succeeded or none started
    Idle,
    /// interrupting the device and waiting for the raw banners
    EnteringRaw,
    /// at raw prompt, asking for raw-paste mode
    Negotiating,
    /// sending the program body
    Transferring,
    /// program sent, waiting for its output streams
    AwaitingOutput,
    /// output received, returning the device to its normal REPL
    ExitingRaw,
    /// last execution failed, the device state is unknown
    Failed,
}

impl State {
    /// whether an execution can move from this state to `next`
    pub fn can_advance(self, next: Self) -> bool {
        use State::*;
        matches!((self, next),
            (Idle | Failed, EnteringRaw)
            | (EnteringRaw, Negotiating)
            | (Negotiating, Transferring)
            | (Transferring, AwaitingOutput)
            | (AwaitingOutput, ExitingRaw)
            | (ExitingRaw, Idle)
            | (EnteringRaw | Negotiating | Transferring | AwaitingOutput | ExitingRaw, Failed)
            )
    }
    /// whether an execution is in progress
    pub fn is_busy(self) -> bool {
        ! matches!(self, Self::Idle | Self::Failed)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use State::*;

    const ALL: [State; 7] = [Idle, EnteringRaw, Negotiating, Transferring, AwaitingOutput, ExitingRaw, Failed];

    #[test]
    fn nominal_sequence() {
        let sequence = [Idle, EnteringRaw, Negotiating, Transferring, AwaitingOutput, ExitingRaw, Idle];
        for pair in sequence.windows(2) {
            assert!(pair[0].can_advance(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn no_skipping() {
        assert!(! Idle.can_advance(Transferring));
        assert!(! Negotiating.can_advance(AwaitingOutput));
        assert!(! EnteringRaw.can_advance(ExitingRaw));
        assert!(! AwaitingOutput.can_advance(Idle));
        for state in ALL {
            assert!(! state.can_advance(state), "{:?} loops on itself", state);
        }
    }

    #[test]
    fn failures() {
        for state in ALL {
            assert_eq!(state.can_advance(Failed), state.is_busy());
        }
        // a failed session can try again
        assert!(Failed.can_advance(EnteringRaw));
        assert!(! Failed.can_advance(Idle));
    }
}
