//! State - invocation の状態
//!
//! # 状態遷移
//! ```text
//! Init -> DriverConnecting -> DriverReady | DriverFailed
//! DriverReady -> PipelineRunning
//! PipelineRunning -> PipelineSucceeded | PipelineRetrying | PipelineFailed
//! PipelineRetrying -> PipelineRunning
//! ```

/// InvocationState は 1 回の呼び出しの進行状況
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    Init,
    DriverConnecting,
    DriverReady,
    /// 終端: driver が期限内に ready にならなかった
    DriverFailed,
    PipelineRunning,
    PipelineRetrying,
    /// 終端
    PipelineSucceeded,
    /// 終端
    PipelineFailed,
}

impl InvocationState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            InvocationState::DriverFailed
                | InvocationState::PipelineSucceeded
                | InvocationState::PipelineFailed
        )
    }

    pub fn can_transition_to(self, next: InvocationState) -> bool {
        use InvocationState::*;

        matches!(
            (self, next),
            (Init, DriverConnecting)
                | (DriverConnecting, DriverReady)
                | (DriverConnecting, DriverFailed)
                | (DriverReady, PipelineRunning)
                | (PipelineRunning, PipelineSucceeded)
                | (PipelineRunning, PipelineRetrying)
                | (PipelineRunning, PipelineFailed)
                | (PipelineRetrying, PipelineRunning)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::InvocationState::*;
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::connect(Init, DriverConnecting)]
    #[case::ready(DriverConnecting, DriverReady)]
    #[case::not_ready(DriverConnecting, DriverFailed)]
    #[case::start(DriverReady, PipelineRunning)]
    #[case::retry(PipelineRunning, PipelineRetrying)]
    #[case::rerun(PipelineRetrying, PipelineRunning)]
    #[case::done(PipelineRunning, PipelineSucceeded)]
    #[case::failed(PipelineRunning, PipelineFailed)]
    fn allowed_transitions(#[case] from: InvocationState, #[case] to: InvocationState) {
        assert!(from.can_transition_to(to));
    }

    #[rstest]
    #[case::skip_wait(Init, PipelineRunning)]
    #[case::skip_connect(Init, DriverFailed)]
    #[case::after_driver_failed(DriverFailed, PipelineRunning)]
    #[case::after_success(PipelineSucceeded, PipelineRunning)]
    #[case::retry_without_run(PipelineRetrying, PipelineSucceeded)]
    #[case::ready_to_success(DriverReady, PipelineSucceeded)]
    fn rejected_transitions(#[case] from: InvocationState, #[case] to: InvocationState) {
        assert!(!from.can_transition_to(to));
    }

    #[test]
    fn terminal_states() {
        let terminal: Vec<_> = [
            Init,
            DriverConnecting,
            DriverReady,
            DriverFailed,
            PipelineRunning,
            PipelineRetrying,
            PipelineSucceeded,
            PipelineFailed,
        ]
        .into_iter()
        .filter(|s| s.is_terminal())
        .collect();

        assert_eq!(terminal, vec![DriverFailed, PipelineSucceeded, PipelineFailed]);
    }
}
