use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use codeloom_types::{JobInfo, JobParams, JobStatus, labels};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Pod, Service};
use kube::api::{DeleteParams, ListParams, LogParams, Patch, PatchParams};
use kube::{Api, Client};

use crate::decide::{service_url_from_ingress, status_from_replicas};
use crate::error::OrchestratorError;
use crate::resources::{build_deployment, build_service};
use crate::traits::Orchestrator;

const MANAGER_NAME: &str = "codeloom-orchestrator";
const MAX_PATCH_ATTEMPTS: u32 = 3;
const BACKOFF: Duration = Duration::from_millis(200);

/// Orchestrator adapter backed by a real cluster: maps codespaces
/// onto a `Deployment` + a `LoadBalancer` `Service`.
#[derive(Clone)]
pub struct KubeOrchestrator {
    client: Client,
    namespace: String,
    students_root: PathBuf,
}

impl KubeOrchestrator {
    pub fn new(client: Client, namespace: impl Into<String>, students_root: PathBuf) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            students_root,
        }
    }

    fn deployments(&self) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn services(&self) -> Api<Service> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    fn pods(&self) -> Api<Pod> {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    async fn get_deployment(&self, name: &str) -> Result<Option<Deployment>, OrchestratorError> {
        Ok(self.deployments().get_opt(name).await?)
    }

    /// Applies `mutate` to a clone of the current deployment and
    /// patches the diff, retrying on optimistic-concurrency conflicts.
    async fn patch_deployment(
        &self,
        name: &str,
        mutate: impl Fn(&mut Deployment),
    ) -> Result<Deployment, OrchestratorError> {
        let api = self.deployments();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let current = api
                .get(name)
                .await?;
            let mut modified = current.clone();
            mutate(&mut modified);
            let patch = Patch::Json::<Deployment>(json_patch::diff(
                &serde_json::to_value(&current)?,
                &serde_json::to_value(&modified)?,
            ));
            match api.patch(name, &PatchParams::apply(MANAGER_NAME), &patch).await {
                Ok(patched) => return Ok(patched),
                Err(kube::Error::Api(ae)) if ae.code == 409 && attempt < MAX_PATCH_ATTEMPTS => {
                    tokio::time::sleep(BACKOFF * attempt).await;
                    continue;
                }
                Err(kube::Error::Api(ae)) if ae.code == 409 => {
                    return Err(OrchestratorError::Conflict {
                        name: name.to_string(),
                        attempts: attempt,
                        source: kube::Error::Api(ae),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn original_replicas(deployment: &Deployment) -> i32 {
        deployment
            .metadata
            .annotations
            .as_ref()
            .and_then(|a| a.get(codeloom_types::annotations::ORIGINAL_REPLICAS))
            .and_then(|v| v.parse().ok())
            .unwrap_or(1)
    }
}

#[async_trait]
impl Orchestrator for KubeOrchestrator {
    async fn allocate(&self, params: &JobParams) -> Result<JobInfo, OrchestratorError> {
        if self.get_deployment(&params.name).await?.is_some() {
            return self.info(&params.name).await;
        }

        let deployment = build_deployment(params, &self.namespace, &self.students_root);
        match self.deployments().create(&Default::default(), &deployment).await {
            Ok(_) => {}
            Err(kube::Error::Api(ae)) if ae.code == 409 => {}
            Err(e) => return Err(e.into()),
        }

        let service = build_service(params, &self.namespace);
        match self.services().create(&Default::default(), &service).await {
            Ok(_) => {}
            Err(kube::Error::Api(ae)) if ae.code == 409 => {}
            Err(e) => return Err(e.into()),
        }

        self.info(&params.name).await
    }

    async fn submit(&self, params: &JobParams) -> Result<JobInfo, OrchestratorError> {
        self.allocate(params).await?;

        let env = params.env.clone();
        let image = params.image.clone();
        self.patch_deployment(&params.name, move |d| {
            let original = Self::original_replicas(d);
            if let Some(spec) = d.spec.as_mut() {
                spec.replicas = Some(original);
            }
            if let Some(annotations) = d.metadata.annotations.as_mut() {
                annotations.remove(codeloom_types::annotations::SUSPENDED);
            }
            if let Some(container) = d
                .spec
                .as_mut()
                .and_then(|s| s.template.spec.as_mut())
                .and_then(|p| p.containers.first_mut())
            {
                container.image = Some(image.clone());
                container.env = Some(
                    env.iter()
                        .map(|(k, v)| k8s_openapi::api::core::v1::EnvVar {
                            name: k.clone(),
                            value: Some(v.clone()),
                            ..Default::default()
                        })
                        .collect(),
                );
            }
        })
        .await?;

        self.info(&params.name).await
    }

    async fn status(&self, name: &str) -> Result<JobStatus, OrchestratorError> {
        let deployment = self
            .get_deployment(name)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(name.to_string()))?;
        let status = deployment.status.unwrap_or_default();
        let replicas = deployment.spec.and_then(|s| s.replicas).unwrap_or(0);
        Ok(status_from_replicas(
            status.ready_replicas.unwrap_or(0),
            status.unavailable_replicas.unwrap_or(0),
            replicas,
        ))
    }

    async fn info(&self, name: &str) -> Result<JobInfo, OrchestratorError> {
        let deployment = self
            .get_deployment(name)
            .await?
            .ok_or_else(|| OrchestratorError::NotFound(name.to_string()))?;
        let service = self.services().get_opt(name).await?;

        let status = {
            let s = deployment.status.clone().unwrap_or_default();
            let replicas = deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
            status_from_replicas(s.ready_replicas.unwrap_or(0), s.unavailable_replicas.unwrap_or(0), replicas)
        };

        let container = deployment
            .spec
            .as_ref()
            .and_then(|s| s.template.spec.as_ref())
            .and_then(|p| p.containers.first());

        let env: BTreeMap<String, String> = container
            .and_then(|c| c.env.as_ref())
            .map(|vars| {
                vars.iter()
                    .filter_map(|v| v.value.clone().map(|val| (v.name.clone(), val)))
                    .collect()
            })
            .unwrap_or_default();

        let user_id = deployment
            .metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(labels::USER_ID_KEY))
            .cloned()
            .unwrap_or_default();

        let ports = container
            .and_then(|c| c.ports.as_ref())
            .map(|ports| {
                ports
                    .iter()
                    .map(|p| codeloom_types::PortMapping {
                        name: p.name.clone().unwrap_or_default(),
                        port: p.container_port as u16,
                        target_port: p.container_port as u16,
                        protocol: codeloom_types::PortProtocol::Tcp,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let port = ports.first().map(|p: &codeloom_types::PortMapping| p.port).unwrap_or(80);
        let ingress: Vec<(Option<String>, Option<String>)> = service
            .as_ref()
            .and_then(|svc| svc.status.as_ref())
            .and_then(|s| s.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_ref())
            .map(|points| points.iter().map(|p| (p.ip.clone(), p.hostname.clone())).collect())
            .unwrap_or_default();
        let service_url = service_url_from_ingress(&ingress, port);

        Ok(JobInfo {
            id: name.to_string(),
            name: name.to_string(),
            namespace: self.namespace.clone(),
            user_id,
            image: container.and_then(|c| c.image.clone()).unwrap_or_default(),
            ports,
            env,
            status,
            service_url,
            created_at: deployment
                .metadata
                .creation_timestamp
                .map(|t| t.0.timestamp())
                .unwrap_or(0),
        })
    }

    async fn suspend(&self, name: &str) -> Result<(), OrchestratorError> {
        self.patch_deployment(name, |d| {
            let current = d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0);
            if current > 0
                && let Some(annotations) = d.metadata.annotations.as_mut()
            {
                annotations.insert(
                    codeloom_types::annotations::ORIGINAL_REPLICAS.to_string(),
                    current.to_string(),
                );
            }
            if let Some(annotations) = d.metadata.annotations.as_mut() {
                annotations.insert(codeloom_types::annotations::SUSPENDED.to_string(), "true".to_string());
            }
            if let Some(spec) = d.spec.as_mut() {
                spec.replicas = Some(0);
            }
        })
        .await?;
        Ok(())
    }

    async fn release(&self, name: &str) -> Result<(), OrchestratorError> {
        let dp = DeleteParams::default();
        match self.deployments().delete(name, &dp).await {
            Ok(_) => {}
            Err(kube::Error::Api(ae)) if ae.code == 404 => {}
            Err(e) => return Err(e.into()),
        }
        match self.services().delete(name, &dp).await {
            Ok(_) => {}
            Err(kube::Error::Api(ae)) if ae.code == 404 => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn logs(&self, name: &str, tail_lines: i64) -> Result<String, OrchestratorError> {
        let selector = format!("{}={}", labels::APP_KEY, name);
        let pods = self
            .pods()
            .list(&ListParams::default().labels(&selector))
            .await?;
        let Some(pod) = pods.items.into_iter().next() else {
            return Err(OrchestratorError::NotFound(name.to_string()));
        };
        let pod_name = pod.metadata.name.unwrap_or_default();
        let text = self
            .pods()
            .logs(
                &pod_name,
                &LogParams {
                    tail_lines: Some(tail_lines),
                    ..Default::default()
                },
            )
            .await?;
        Ok(text)
    }

    async fn list(&self) -> Result<Vec<JobInfo>, OrchestratorError> {
        let selector = format!(
            "{}={},{}={}",
            labels::MANAGED_BY_KEY,
            labels::MANAGED_BY_VALUE,
            labels::TYPE_KEY,
            labels::TYPE_VALUE,
        );
        let deployments = self
            .deployments()
            .list(&ListParams::default().labels(&selector))
            .await?;
        let mut infos = Vec::with_capacity(deployments.items.len());
        for deployment in deployments.items {
            if let Some(name) = deployment.metadata.name {
                infos.push(self.info(&name).await?);
            }
        }
        Ok(infos)
    }
}
