//! 실행 대상 추상화
//!
//! [`ExecTarget`] trait은 검증 로직이 대상 워크로드에 요구하는 기능 집합입니다.
//! 운영 코드는 [`KubePodTarget`](crate::kubernetes::KubePodTarget)이나
//! [`DockerContainerTarget`](crate::docker::DockerContainerTarget)을,
//! 테스트는 `MockTarget`을 사용합니다.
//!
//! ```text
//!   PackageVerifier / readiness / snippet
//!                  │
//!                  ▼
//!           ┌────────────┐
//!           │ ExecTarget │ (trait)
//!           └────────────┘
//!            │     │     │
//!            ▼     ▼     ▼
//!          Kube  Docker  Mock
//! ```

use std::future::Future;

use workbench_probe_core::types::{TargetPhase, TargetSnapshot};

use crate::error::{PreconditionFailure, VerifierError};

/// 검증 대상 워크로드의 기능 집합
///
/// `Send + Sync + 'static`이므로 `Arc`로 감싸 여러 검증기가 공유할 수 있습니다.
///
/// # Error Handling
///
/// - 명령이 0이 아닌 코드로 종료되거나 exec 스트림이 끊기면 `VerifierError::Execution`
/// - API 호출 자체가 실패하면 `VerifierError::Api`
pub trait ExecTarget: Send + Sync + 'static {
    /// 대상 이름 (Pod 이름 또는 컨테이너 이름)
    fn name(&self) -> &str;

    /// 현재 상태를 조회합니다. 대상이 없으면 `Ok(None)`.
    fn snapshot(
        &self,
    ) -> impl Future<Output = Result<Option<TargetSnapshot>, VerifierError>> + Send;

    /// 컨테이너 안에서 argv를 실행하고 stdout을 반환합니다.
    ///
    /// argv는 셸을 거치지 않고 그대로 실행됩니다.
    fn execute(
        &self,
        container: &str,
        argv: &[String],
    ) -> impl Future<Output = Result<String, VerifierError>> + Send;

    /// 컨테이너 로그의 마지막 `tail_lines`줄을 반환합니다.
    fn log(
        &self,
        container: &str,
        tail_lines: u32,
    ) -> impl Future<Output = Result<String, VerifierError>> + Send;

    /// 대상 존재 여부
    fn exists(&self) -> impl Future<Output = Result<bool, VerifierError>> + Send {
        async move { Ok(self.snapshot().await?.is_some()) }
    }

    /// 현재 phase. 대상이 없으면 `PreconditionFailure::TargetMissing`.
    fn phase(&self) -> impl Future<Output = Result<TargetPhase, VerifierError>> + Send {
        async move {
            match self.snapshot().await? {
                Some(snapshot) => Ok(snapshot.phase),
                None => Err(PreconditionFailure::TargetMissing {
                    target: self.name().to_owned(),
                }
                .into()),
            }
        }
    }

    /// 선언된 컨테이너 이름 목록 (선언 순서)
    fn container_names(&self) -> impl Future<Output = Result<Vec<String>, VerifierError>> + Send {
        async move {
            match self.snapshot().await? {
                Some(snapshot) => Ok(snapshot.container_names()),
                None => Err(PreconditionFailure::TargetMissing {
                    target: self.name().to_owned(),
                }
                .into()),
            }
        }
    }
}

#[cfg(test)]
pub use mock::{MockCall, MockTarget};

#[cfg(test)]
mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use workbench_probe_core::types::{
        ContainerSpec, TargetCondition, TargetPhase, TargetSnapshot,
    };

    use super::ExecTarget;
    use crate::error::VerifierError;

    /// MockTarget에 기록되는 호출
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum MockCall {
        Snapshot,
        Execute { container: String, argv: Vec<String> },
        Log { container: String, tail_lines: u32 },
    }

    /// 테스트용 Mock 대상
    ///
    /// 설정 가능한 응답을 반환하고 모든 호출을 기록합니다.
    pub struct MockTarget {
        name: String,
        /// 조회마다 앞에서 하나씩 꺼내고, 마지막 하나는 계속 반환
        snapshots: Mutex<VecDeque<Option<TargetSnapshot>>>,
        /// 마지막 argv 인자에 키가 포함되면 해당 사유로 실행 실패
        exec_failures: HashMap<String, String>,
        exec_output: String,
        transient_exec_errors: AtomicU32,
        exec_delay: Option<Duration>,
        log_result: Result<String, String>,
        calls: Mutex<Vec<MockCall>>,
    }

    impl MockTarget {
        /// Running 상태이고 Ready 조건이 True인 대상을 생성합니다.
        pub fn running(name: &str, containers: &[&str]) -> Self {
            let mut snapshot = TargetSnapshot::new(name, TargetPhase::Running);
            snapshot.containers = containers.iter().map(|c| ContainerSpec::named(*c)).collect();
            snapshot.conditions = vec![TargetCondition {
                kind: "Ready".to_owned(),
                status: "True".to_owned(),
            }];
            Self::with_initial(name, Some(snapshot))
        }

        /// 존재하지 않는 대상을 생성합니다.
        pub fn missing(name: &str) -> Self {
            Self::with_initial(name, None)
        }

        fn with_initial(name: &str, snapshot: Option<TargetSnapshot>) -> Self {
            Self {
                name: name.to_owned(),
                snapshots: Mutex::new(VecDeque::from([snapshot])),
                exec_failures: HashMap::new(),
                exec_output: String::new(),
                transient_exec_errors: AtomicU32::new(0),
                exec_delay: None,
                log_result: Ok("notebook log line".to_owned()),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// 조회 결과를 하나로 고정합니다.
        pub fn with_snapshot(self, snapshot: Option<TargetSnapshot>) -> Self {
            self.with_snapshot_sequence(vec![snapshot])
        }

        /// 조회 결과를 순서대로 반환합니다 (마지막 값은 반복).
        pub fn with_snapshot_sequence(self, sequence: Vec<Option<TargetSnapshot>>) -> Self {
            *self.snapshots.lock().unwrap() = VecDeque::from(sequence);
            self
        }

        /// phase만 바꿉니다.
        pub fn with_phase(self, phase: TargetPhase) -> Self {
            let snapshot = self
                .snapshots
                .lock()
                .unwrap()
                .front()
                .cloned()
                .flatten()
                .map(|mut s| {
                    s.phase = phase;
                    s
                });
            self.with_snapshot(snapshot)
        }

        /// 특정 패키지 import를 실패시킵니다.
        pub fn with_failing_import(self, package: &str, reason: &str) -> Self {
            self.with_exec_failure(&format!("import {package}"), reason)
        }

        /// 마지막 인자에 `needle`이 포함된 명령을 실패시킵니다.
        pub fn with_exec_failure(mut self, needle: &str, reason: &str) -> Self {
            self.exec_failures
                .insert(needle.to_owned(), reason.to_owned());
            self
        }

        /// 성공한 명령의 stdout을 설정합니다.
        pub fn with_exec_output(mut self, output: &str) -> Self {
            self.exec_output = output.to_owned();
            self
        }

        /// 처음 `count`번의 실행을 API 에러로 실패시킵니다.
        pub fn with_transient_exec_errors(self, count: u32) -> Self {
            self.transient_exec_errors.store(count, Ordering::SeqCst);
            self
        }

        /// 실행마다 지연을 추가합니다.
        pub fn with_exec_delay(mut self, delay: Duration) -> Self {
            self.exec_delay = Some(delay);
            self
        }

        /// 로그 조회 결과를 설정합니다.
        pub fn with_logs(mut self, logs: &str) -> Self {
            self.log_result = Ok(logs.to_owned());
            self
        }

        /// 로그 조회를 실패시킵니다.
        pub fn with_failing_logs(mut self) -> Self {
            self.log_result = Err("log endpoint unavailable".to_owned());
            self
        }

        /// 기록된 호출 목록
        pub fn calls(&self) -> Vec<MockCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn execute_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, MockCall::Execute { .. }))
                .count()
        }

        pub fn log_count(&self) -> usize {
            self.calls()
                .iter()
                .filter(|c| matches!(c, MockCall::Log { .. }))
                .count()
        }

        fn record(&self, call: MockCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl ExecTarget for MockTarget {
        fn name(&self) -> &str {
            &self.name
        }

        async fn snapshot(&self) -> Result<Option<TargetSnapshot>, VerifierError> {
            self.record(MockCall::Snapshot);
            let mut snapshots = self.snapshots.lock().unwrap();
            let current = if snapshots.len() > 1 {
                snapshots.pop_front().flatten()
            } else {
                snapshots.front().cloned().flatten()
            };
            Ok(current)
        }

        async fn execute(&self, container: &str, argv: &[String]) -> Result<String, VerifierError> {
            self.record(MockCall::Execute {
                container: container.to_owned(),
                argv: argv.to_vec(),
            });

            if let Some(delay) = self.exec_delay {
                tokio::time::sleep(delay).await;
            }

            let transient = self.transient_exec_errors.load(Ordering::SeqCst);
            if transient > 0 {
                self.transient_exec_errors
                    .store(transient - 1, Ordering::SeqCst);
                return Err(VerifierError::Api("mock transient failure".to_owned()));
            }

            let last = argv.last().map(String::as_str).unwrap_or_default();
            if let Some((_, reason)) = self
                .exec_failures
                .iter()
                .find(|(needle, _)| last.contains(needle.as_str()))
            {
                return Err(VerifierError::Execution {
                    container: container.to_owned(),
                    reason: reason.clone(),
                });
            }

            Ok(self.exec_output.clone())
        }

        async fn log(&self, container: &str, tail_lines: u32) -> Result<String, VerifierError> {
            self.record(MockCall::Log {
                container: container.to_owned(),
                tail_lines,
            });
            self.log_result
                .clone()
                .map_err(VerifierError::DiagnosticCollection)
        }
    }
}
