//! 로컬 Docker 컨테이너 실행 백엔드
//!
//! 워크벤치 이미지를 클러스터에 배포하기 전에 로컬 컨테이너로 띄워
//! 같은 검증을 미리 돌려볼 때 사용합니다.
//! 대상 컨테이너 하나가 곧 스냅샷의 유일한 컨테이너입니다.
//!
//! # Examples
//!
//! ```ignore
//! use std::sync::Arc;
//! use workbench_pod_verifier::{DockerContainerTarget, PackageVerifier, VerifierConfig};
//!
//! let target = DockerContainerTarget::connect_local("nb-preflight")?;
//! let verifier = PackageVerifier::new(Arc::new(target), VerifierConfig::default());
//! let report = verifier.verify("nb-preflight", &["numpy".to_owned()]).await?;
//! # Ok::<(), workbench_pod_verifier::VerifierError>(())
//! ```

use std::sync::Arc;

use bollard::container::{LogOutput, LogsOptions};
use bollard::errors::Error as BollardError;
use bollard::exec::{CreateExecOptions, StartExecResults};
use bollard::models::{
    ContainerInspectResponse, ContainerStateStatusEnum, HealthStatusEnum, HostConfig,
};
use futures::{Stream, StreamExt};
use tracing::debug;

use workbench_probe_core::types::{
    ContainerSpec, ContainerState, ContainerStatus, ResourceRequirements, TargetCondition,
    TargetPhase, TargetSnapshot,
};

use crate::error::VerifierError;
use crate::readiness::READY_CONDITION;
use crate::target::ExecTarget;

/// Docker 컨테이너 대상
///
/// 내부적으로 `Arc<bollard::Docker>`를 사용하므로 복제 비용이 작습니다.
#[derive(Clone)]
pub struct DockerContainerTarget {
    docker: Arc<bollard::Docker>,
    name: String,
}

impl DockerContainerTarget {
    /// 플랫폼 기본 소켓으로 Docker에 연결합니다.
    ///
    /// # Errors
    ///
    /// 연결 실패 시 `VerifierError::Connection`.
    pub fn connect_local(name: &str) -> Result<Self, VerifierError> {
        let docker = bollard::Docker::connect_with_local_defaults().map_err(|e| {
            VerifierError::Connection(format!("failed to connect to docker: {e}"))
        })?;
        Ok(Self {
            docker: Arc::new(docker),
            name: name.to_owned(),
        })
    }

    /// 지정한 소켓 경로로 Docker에 연결합니다.
    ///
    /// # Errors
    ///
    /// 연결 실패 시 `VerifierError::Connection`.
    pub fn connect_with_socket(socket_path: &str, name: &str) -> Result<Self, VerifierError> {
        let docker =
            bollard::Docker::connect_with_socket(socket_path, 120, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    VerifierError::Connection(format!(
                        "failed to connect to docker at {socket_path}: {e}"
                    ))
                })?;
        Ok(Self {
            docker: Arc::new(docker),
            name: name.to_owned(),
        })
    }
}

impl ExecTarget for DockerContainerTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn snapshot(&self) -> Result<Option<TargetSnapshot>, VerifierError> {
        match self.docker.inspect_container(&self.name, None).await {
            Ok(details) => Ok(Some(snapshot_from_inspect(&self.name, &details))),
            Err(BollardError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(VerifierError::Api(format!(
                "inspect container '{}' failed: {e}",
                self.name
            ))),
        }
    }

    async fn execute(&self, container: &str, argv: &[String]) -> Result<String, VerifierError> {
        debug!(container = self.name.as_str(), ?argv, "docker exec");
        if container != self.name {
            debug!(requested = container, "docker target has a single container, ignoring name");
        }

        let exec = self
            .docker
            .create_exec(
                &self.name,
                CreateExecOptions {
                    cmd: Some(argv.to_vec()),
                    attach_stdout: Some(true),
                    attach_stderr: Some(true),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| VerifierError::Api(format!("create exec failed: {e}")))?;

        let started = self
            .docker
            .start_exec(&exec.id, None)
            .await
            .map_err(|e| VerifierError::Api(format!("start exec failed: {e}")))?;

        let (stdout, stderr) = match started {
            StartExecResults::Attached { output, .. } => collect_output(output).await?,
            StartExecResults::Detached => (String::new(), String::new()),
        };

        let inspected = self
            .docker
            .inspect_exec(&exec.id)
            .await
            .map_err(|e| VerifierError::Api(format!("inspect exec failed: {e}")))?;

        match inspected.exit_code {
            Some(0) | None => Ok(stdout),
            Some(code) => {
                let stderr = stderr.trim();
                let reason = if stderr.is_empty() {
                    format!("command exited with code {code}")
                } else {
                    format!("command exited with code {code}: {stderr}")
                };
                Err(VerifierError::Execution {
                    container: self.name.clone(),
                    reason,
                })
            }
        }
    }

    async fn log(&self, _container: &str, tail_lines: u32) -> Result<String, VerifierError> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            tail: tail_lines.to_string(),
            ..Default::default()
        };
        let (stdout, stderr) = collect_output(self.docker.logs(&self.name, Some(options)))
            .await
            .map_err(|e| VerifierError::DiagnosticCollection(e.to_string()))?;
        Ok(stdout + &stderr)
    }
}

/// 출력 스트림을 stdout / stderr로 나눠 모읍니다.
async fn collect_output<S>(output: S) -> Result<(String, String), VerifierError>
where
    S: Stream<Item = Result<LogOutput, BollardError>>,
{
    let mut output = std::pin::pin!(output);
    let mut stdout = String::new();
    let mut stderr = String::new();
    while let Some(chunk) = output.next().await {
        let chunk = chunk.map_err(|e| VerifierError::Api(format!("output stream failed: {e}")))?;
        match chunk {
            LogOutput::StdErr { message } => stderr.push_str(&String::from_utf8_lossy(&message)),
            LogOutput::StdOut { message } | LogOutput::Console { message } => {
                stdout.push_str(&String::from_utf8_lossy(&message));
            }
            LogOutput::StdIn { .. } => {}
        }
    }
    Ok((stdout, stderr))
}

/// inspect 결과를 스냅샷으로 변환합니다.
pub fn snapshot_from_inspect(name: &str, details: &ContainerInspectResponse) -> TargetSnapshot {
    let state = details.state.as_ref();
    let status = state.and_then(|s| s.status).unwrap_or(ContainerStateStatusEnum::EMPTY);
    let exit_code = state
        .and_then(|s| s.exit_code)
        .and_then(|c| i32::try_from(c).ok())
        .unwrap_or_default();
    let healthy = !matches!(
        state.and_then(|s| s.health.as_ref()).and_then(|h| h.status),
        Some(HealthStatusEnum::STARTING | HealthStatusEnum::UNHEALTHY)
    );

    let (phase, container_state) = match status {
        ContainerStateStatusEnum::RUNNING => (TargetPhase::Running, ContainerState::Running),
        ContainerStateStatusEnum::CREATED | ContainerStateStatusEnum::RESTARTING => (
            TargetPhase::Pending,
            ContainerState::Waiting {
                reason: Some(status.to_string()),
                message: state.and_then(|s| s.error.clone()).filter(|e| !e.is_empty()),
            },
        ),
        ContainerStateStatusEnum::EXITED | ContainerStateStatusEnum::DEAD => (
            if exit_code == 0 {
                TargetPhase::Succeeded
            } else {
                TargetPhase::Failed
            },
            ContainerState::Terminated {
                exit_code,
                reason: state.and_then(|s| s.error.clone()).filter(|e| !e.is_empty()),
            },
        ),
        other => (TargetPhase::Unknown(other.to_string()), ContainerState::Unknown),
    };

    let ready = phase.is_running() && healthy;
    let mut snapshot = TargetSnapshot::new(name, phase);
    snapshot.containers = vec![ContainerSpec {
        name: name.to_owned(),
        image: details.config.as_ref().and_then(|c| c.image.clone()),
        resources: details
            .host_config
            .as_ref()
            .map(host_resources)
            .unwrap_or_default(),
    }];
    snapshot.container_statuses = vec![ContainerStatus {
        name: name.to_owned(),
        ready,
        state: container_state,
    }];
    snapshot.conditions = vec![TargetCondition {
        kind: READY_CONDITION.to_owned(),
        status: if ready { "True" } else { "False" }.to_owned(),
    }];
    snapshot
}

/// nano CPU와 메모리 바이트를 Kubernetes quantity 표기로 바꿉니다.
fn host_resources(host: &HostConfig) -> ResourceRequirements {
    let mut resources = ResourceRequirements::default();
    if let Some(nano) = host.nano_cpus.filter(|n| *n > 0) {
        resources
            .limits
            .insert("cpu".to_owned(), format!("{}m", nano / 1_000_000));
    }
    if let Some(bytes) = host.memory.filter(|b| *b > 0) {
        resources.limits.insert("memory".to_owned(), bytes.to_string());
    }
    if let Some(bytes) = host.memory_reservation.filter(|b| *b > 0) {
        resources
            .requests
            .insert("memory".to_owned(), bytes.to_string());
    }
    resources
}
