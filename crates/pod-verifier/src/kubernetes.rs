//! Kubernetes Pod 실행 백엔드
//!
//! kube-rs `Api<Pod>`로 Pod 상태 조회, exec, 로그 조회를 수행합니다.
//! exec는 셸 없이 argv 그대로 전달되고, stdout/stderr를 동시에 읽은 뒤
//! 상태 채널의 `Status`로 성공 여부를 판단합니다.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{
    Container, ContainerStatus as K8sContainerStatus, Pod, ResourceRequirements as K8sResources,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::api::{Api, AttachParams, LogParams};
use kube::config::KubeConfigOptions;
use kube::{Client, Config};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

use workbench_probe_core::types::{
    ContainerSpec, ContainerState, ContainerStatus, ResourceRequirements, TargetCondition,
    TargetPhase, TargetSnapshot,
};

use crate::error::VerifierError;
use crate::target::ExecTarget;

/// exec 성공을 나타내는 `Status.status` 값
const STATUS_SUCCESS: &str = "Success";

/// Kubernetes Pod 대상
#[derive(Clone)]
pub struct KubePodTarget {
    pods: Api<Pod>,
    namespace: String,
    name: String,
}

impl KubePodTarget {
    /// kubeconfig(또는 in-cluster 설정)로 클라이언트를 만들고 대상을 생성합니다.
    ///
    /// `context`가 있으면 해당 kubeconfig context를 사용합니다.
    ///
    /// # Errors
    ///
    /// 설정 로드나 클라이언트 생성이 실패하면 `VerifierError::Connection`.
    pub async fn connect(
        namespace: &str,
        name: &str,
        context: Option<&str>,
    ) -> Result<Self, VerifierError> {
        let config = match context {
            Some(context) => {
                let options = KubeConfigOptions {
                    context: Some(context.to_owned()),
                    ..KubeConfigOptions::default()
                };
                Config::from_kubeconfig(&options).await.map_err(|e| {
                    VerifierError::Connection(format!(
                        "failed to load kubeconfig context '{context}': {e}"
                    ))
                })?
            }
            None => Config::infer().await.map_err(|e| {
                VerifierError::Connection(format!("failed to infer Kubernetes config: {e}"))
            })?,
        };

        let client = Client::try_from(config).map_err(|e| {
            VerifierError::Connection(format!("failed to create Kubernetes client: {e}"))
        })?;

        info!(namespace, pod = name, "kubernetes client created");
        Ok(Self::from_client(client, namespace, name))
    }

    /// 기존 클라이언트로 대상을 생성합니다.
    pub fn from_client(client: Client, namespace: &str, name: &str) -> Self {
        Self {
            pods: Api::namespaced(client, namespace),
            namespace: namespace.to_owned(),
            name: name.to_owned(),
        }
    }

    /// 네임스페이스
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl ExecTarget for KubePodTarget {
    fn name(&self) -> &str {
        &self.name
    }

    async fn snapshot(&self) -> Result<Option<TargetSnapshot>, VerifierError> {
        let pod = self.pods.get_opt(&self.name).await.map_err(|e| {
            VerifierError::Api(format!("failed to get pod {}/{}: {e}", self.namespace, self.name))
        })?;
        Ok(pod.as_ref().map(snapshot_from_pod))
    }

    async fn execute(&self, container: &str, argv: &[String]) -> Result<String, VerifierError> {
        debug!(pod = self.name.as_str(), container, ?argv, "pod exec");

        let params = AttachParams::default()
            .container(container)
            .stdout(true)
            .stderr(true);
        let mut attached = self
            .pods
            .exec(&self.name, argv.to_vec(), &params)
            .await
            .map_err(|e| VerifierError::Api(format!("exec in '{container}' failed: {e}")))?;

        let (stdout, stderr) = tokio::join!(
            read_stream(attached.stdout()),
            read_stream(attached.stderr())
        );
        let stdout = stdout.map_err(|e| VerifierError::Execution {
            container: container.to_owned(),
            reason: format!("failed to read stdout: {e}"),
        })?;
        let stderr = stderr.unwrap_or_default();

        let status = match attached.take_status() {
            Some(status) => status.await,
            None => None,
        };
        if let Err(e) = attached.join().await {
            debug!(error = %e, "exec session did not close cleanly");
        }

        match status {
            Some(status) if status.status.as_deref() != Some(STATUS_SUCCESS) => {
                let reason = if stderr.trim().is_empty() {
                    status
                        .message
                        .or(status.reason)
                        .unwrap_or_else(|| "command failed".to_owned())
                } else {
                    stderr.trim().to_owned()
                };
                Err(VerifierError::Execution {
                    container: container.to_owned(),
                    reason,
                })
            }
            _ => Ok(stdout),
        }
    }

    async fn log(&self, container: &str, tail_lines: u32) -> Result<String, VerifierError> {
        let params = LogParams {
            container: Some(container.to_owned()),
            tail_lines: Some(i64::from(tail_lines)),
            ..LogParams::default()
        };
        self.pods.logs(&self.name, &params).await.map_err(|e| {
            VerifierError::DiagnosticCollection(format!(
                "failed to get logs for {}/{}: {e}",
                self.name, container
            ))
        })
    }
}

async fn read_stream<R>(stream: Option<R>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buf = String::new();
    if let Some(mut reader) = stream {
        reader.read_to_string(&mut buf).await?;
    }
    Ok(buf)
}

/// `Pod` 오브젝트를 스냅샷으로 변환합니다.
pub fn snapshot_from_pod(pod: &Pod) -> TargetSnapshot {
    let name = pod.metadata.name.clone().unwrap_or_default();
    let status = pod.status.as_ref();

    let phase = status
        .and_then(|s| s.phase.as_deref())
        .map_or(TargetPhase::Pending, TargetPhase::parse);

    let mut snapshot = TargetSnapshot::new(name, phase);

    if let Some(spec) = &pod.spec {
        snapshot.containers = spec.containers.iter().map(container_spec).collect();
    }

    if let Some(status) = status {
        snapshot.container_statuses = status
            .container_statuses
            .iter()
            .flatten()
            .map(container_status)
            .collect();
        snapshot.conditions = status
            .conditions
            .iter()
            .flatten()
            .map(|c| TargetCondition {
                kind: c.type_.clone(),
                status: c.status.clone(),
            })
            .collect();
    }

    snapshot
}

fn container_spec(container: &Container) -> ContainerSpec {
    ContainerSpec {
        name: container.name.clone(),
        image: container.image.clone(),
        resources: container
            .resources
            .as_ref()
            .map(resource_requirements)
            .unwrap_or_default(),
    }
}

fn resource_requirements(resources: &K8sResources) -> ResourceRequirements {
    ResourceRequirements {
        requests: quantities(resources.requests.as_ref()),
        limits: quantities(resources.limits.as_ref()),
    }
}

fn quantities(map: Option<&BTreeMap<String, Quantity>>) -> BTreeMap<String, String> {
    map.into_iter()
        .flatten()
        .map(|(name, quantity)| (name.clone(), quantity.0.clone()))
        .collect()
}

fn container_status(status: &K8sContainerStatus) -> ContainerStatus {
    let state = match &status.state {
        Some(state) => {
            if let Some(waiting) = &state.waiting {
                ContainerState::Waiting {
                    reason: waiting.reason.clone(),
                    message: waiting.message.clone(),
                }
            } else if let Some(terminated) = &state.terminated {
                ContainerState::Terminated {
                    exit_code: terminated.exit_code,
                    reason: terminated.reason.clone(),
                }
            } else if state.running.is_some() {
                ContainerState::Running
            } else {
                ContainerState::Unknown
            }
        }
        None => ContainerState::Unknown,
    };

    ContainerStatus {
        name: status.name.clone(),
        ready: status.ready,
        state,
    }
}
