use std::collections::BTreeMap;
use std::path::Path;

use codeloom_types::{JobParams, labels};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, EnvVar, HostPathVolumeSource, Service, ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;

use codeloom_types::annotations;

pub fn workload_labels(params: &JobParams) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::MANAGED_BY_KEY.to_string(), labels::MANAGED_BY_VALUE.to_string()),
        (labels::USER_ID_KEY.to_string(), params.user_id.clone()),
        (labels::TYPE_KEY.to_string(), labels::TYPE_VALUE.to_string()),
        (labels::APP_KEY.to_string(), params.name.clone()),
    ])
}

fn selector_labels(params: &JobParams) -> BTreeMap<String, String> {
    BTreeMap::from([(labels::APP_KEY.to_string(), params.name.clone())])
}

/// Builds the deployment for a codespace, suspended (replicas 0) and
/// annotated as such. Callers that want it running call `submit`,
/// which resumes it.
pub fn build_deployment(params: &JobParams, namespace: &str, students_root: &Path) -> Deployment {
    let sid = &params.user_id;
    let student_root = students_root.join(sid);

    let volumes = ["code", "io", "root"]
        .iter()
        .map(|sub| Volume {
            name: format!("{sub}-volume"),
            host_path: Some(HostPathVolumeSource {
                path: student_root.join(sub).to_string_lossy().into_owned(),
                type_: Some("DirectoryOrCreate".to_string()),
            }),
            ..Default::default()
        })
        .collect::<Vec<_>>();

    let volume_mounts = ["code", "io", "root"]
        .iter()
        .map(|sub| VolumeMount {
            name: format!("{sub}-volume"),
            mount_path: format!("/{sub}"),
            ..Default::default()
        })
        .collect::<Vec<_>>();

    let env = params
        .env
        .iter()
        .map(|(k, v)| EnvVar {
            name: k.clone(),
            value: Some(v.clone()),
            ..Default::default()
        })
        .collect::<Vec<_>>();

    let container = Container {
        name: "codespace".to_string(),
        image: Some(params.image.clone()),
        env: Some(env),
        ports: Some(
            params
                .ports
                .iter()
                .map(|p| k8s_openapi::api::core::v1::ContainerPort {
                    container_port: p.target_port as i32,
                    name: Some(p.name.clone()),
                    ..Default::default()
                })
                .collect(),
        ),
        volume_mounts: Some(volume_mounts),
        ..Default::default()
    };

    let mut annotations = BTreeMap::new();
    annotations.insert(annotations::SUSPENDED.to_string(), "true".to_string());
    annotations.insert(annotations::ORIGINAL_REPLICAS.to_string(), "1".to_string());

    Deployment {
        metadata: ObjectMeta {
            name: Some(params.name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(workload_labels(params)),
            annotations: Some(annotations),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(0),
            selector: LabelSelector {
                match_labels: Some(selector_labels(params)),
                ..Default::default()
            },
            template: k8s_openapi::api::core::v1::PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector_labels(params)),
                    ..Default::default()
                }),
                spec: Some(k8s_openapi::api::core::v1::PodSpec {
                    containers: vec![container],
                    volumes: Some(volumes),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

pub fn build_service(params: &JobParams, namespace: &str) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(params.name.clone()),
            namespace: Some(namespace.to_string()),
            labels: Some(workload_labels(params)),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("LoadBalancer".to_string()),
            selector: Some(selector_labels(params)),
            ports: Some(
                params
                    .ports
                    .iter()
                    .map(|p| ServicePort {
                        name: Some(p.name.clone()),
                        port: p.port as i32,
                        target_port: Some(IntOrString::Int(p.target_port as i32)),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        status: None,
    }
}
