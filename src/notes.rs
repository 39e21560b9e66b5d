//! Post-install access instructions.
//!
//! Describes how an operator reaches the server once the manifests are
//! applied. Nothing here talks to a cluster; the output is text with the
//! `kubectl` commands a human would run.

use std::fmt;

use tracing::warn;

use crate::config::ServiceType;
use crate::resolver::{ResolvedDeploymentSpec, ingress_scheme};
use crate::resources::common::HTTP_PORT_NAME;

/// How to reach the deployed server, keyed by exposure mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AccessInstructions {
    /// Ingress with a host: a direct URL.
    Url { url: String },
    /// NodePort Service: look up the node port and a node address.
    NodePort {
        namespace: String,
        service: String,
    },
    /// LoadBalancer Service: wait for the external IP.
    LoadBalancer {
        namespace: String,
        service: String,
        port: i32,
    },
    /// ClusterIP Service: port-forward to a server pod.
    PortForward {
        namespace: String,
        selector: String,
        local_port: i32,
    },
    /// Ingress without a host; no usable address can be derived.
    Undetermined,
}

impl AccessInstructions {
    /// Direct URL, when one is known at render time.
    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Url { url } => Some(url),
            _ => None,
        }
    }

    pub fn is_determined(&self) -> bool {
        !matches!(self, Self::Undetermined)
    }
}

/// Local port suggested for `kubectl port-forward`
pub const LOCAL_FORWARD_PORT: i32 = 8080;

/// Derive access instructions from the resolved deployment.
pub fn describe_access(spec: &ResolvedDeploymentSpec) -> AccessInstructions {
    let config = spec.config();
    let namespace = spec.release().namespace.clone();
    let service = spec.names().fullname.clone();

    if config.ingress.enabled {
        return match &config.ingress.host {
            Some(host) if !host.trim().is_empty() => AccessInstructions::Url {
                url: format!("{}://{}{}", ingress_scheme(config), host, config.ingress.path),
            },
            _ => {
                warn!(
                    fullname = %service,
                    "Ingress is enabled without a host, access instructions are undetermined"
                );
                AccessInstructions::Undetermined
            }
        };
    }

    match config.service.service_type {
        ServiceType::NodePort => AccessInstructions::NodePort { namespace, service },
        ServiceType::LoadBalancer => AccessInstructions::LoadBalancer {
            namespace,
            service,
            port: config.service.port,
        },
        ServiceType::ClusterIP => AccessInstructions::PortForward {
            namespace,
            selector: format!(
                "app.kubernetes.io/name={},app.kubernetes.io/instance={}",
                spec.names().name,
                spec.release().name
            ),
            local_port: LOCAL_FORWARD_PORT,
        },
    }
}

impl fmt::Display for AccessInstructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url { url } => {
                writeln!(f, "Get the ZenML server URL by running these commands:")?;
                writeln!(f, "  {url}")
            }
            Self::NodePort { namespace, service } => {
                writeln!(f, "Get the ZenML server URL by running these commands:")?;
                writeln!(
                    f,
                    "  export NODE_PORT=$(kubectl get --namespace {namespace} -o jsonpath=\"{{.spec.ports[0].nodePort}}\" services {service})"
                )?;
                writeln!(
                    f,
                    "  export NODE_IP=$(kubectl get nodes --namespace {namespace} -o jsonpath=\"{{.items[0].status.addresses[0].address}}\")"
                )?;
                writeln!(f, "  echo http://$NODE_IP:$NODE_PORT")
            }
            Self::LoadBalancer {
                namespace,
                service,
                port,
            } => {
                writeln!(f, "Get the ZenML server URL by running these commands:")?;
                writeln!(
                    f,
                    "     NOTE: It may take a few minutes for the LoadBalancer IP to be available."
                )?;
                writeln!(
                    f,
                    "           You can watch the status of it by running 'kubectl get --namespace {namespace} svc -w {service}'"
                )?;
                writeln!(
                    f,
                    "  export SERVICE_IP=$(kubectl get svc --namespace {namespace} {service} --template \"{{{{ range (index .status.loadBalancer.ingress 0) }}}}{{{{.}}}}{{{{ end }}}}\")"
                )?;
                writeln!(f, "  echo http://$SERVICE_IP:{port}")
            }
            Self::PortForward {
                namespace,
                selector,
                local_port,
            } => {
                writeln!(f, "Get the ZenML server URL by running these commands:")?;
                writeln!(
                    f,
                    "  export POD_NAME=$(kubectl get pods --namespace {namespace} -l \"{selector}\" -o jsonpath=\"{{.items[0].metadata.name}}\")"
                )?;
                writeln!(
                    f,
                    "  export CONTAINER_PORT=$(kubectl get pod --namespace {namespace} $POD_NAME -o jsonpath=\"{{.spec.containers[0].ports[?(@.name=='{HTTP_PORT_NAME}')].containerPort}}\")"
                )?;
                writeln!(
                    f,
                    "  echo \"Visit http://127.0.0.1:{local_port} to use the ZenML server\""
                )?;
                writeln!(
                    f,
                    "  kubectl --namespace {namespace} port-forward $POD_NAME {local_port}:$CONTAINER_PORT"
                )
            }
            Self::Undetermined => writeln!(
                f,
                "The ZenML server URL could not be determined: ingress is enabled but ingress.host is not set."
            ),
        }
    }
}
