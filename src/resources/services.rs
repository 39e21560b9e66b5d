//! Service generation for the ZenML server.
//!
//! One Service exposes the server's `http` container port on the configured
//! port, using the configured exposure type.

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use crate::resolver::ResolvedDeploymentSpec;
use crate::resources::common::{HTTP_PORT_NAME, object_meta, pod_selector_labels};

/// Generate the server Service.
pub fn generate_service(spec: &ResolvedDeploymentSpec) -> Service {
    let service = &spec.config().service;

    Service {
        metadata: object_meta(spec, &spec.names().fullname),
        spec: Some(ServiceSpec {
            type_: Some(service.service_type.to_string()),
            selector: Some(pod_selector_labels(spec)),
            ports: Some(vec![ServicePort {
                port: service.port,
                target_port: Some(IntOrString::String(HTTP_PORT_NAME.to_string())),
                name: Some(HTTP_PORT_NAME.to_string()),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::get_unwrap
)]
mod tests {
    use super::*;
    use crate::config::{Configuration, Release, ServiceType};
    use crate::resolver::resolve;

    fn spec_for(config: &Configuration) -> ResolvedDeploymentSpec {
        resolve(config, &Release::new("prod", "zenml")).unwrap()
    }

    #[test]
    fn test_generate_service() {
        let svc = generate_service(&spec_for(&Configuration::default()));

        assert_eq!(svc.metadata.name, Some("prod-zenml".to_string()));
        assert_eq!(svc.metadata.namespace, Some("zenml".to_string()));

        let spec = svc.spec.unwrap();
        assert_eq!(spec.type_, Some("ClusterIP".to_string()));

        let ports = spec.ports.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports.first().unwrap().name, Some("http".to_string()));
        assert_eq!(ports.first().unwrap().port, 80);
        assert_eq!(
            ports.first().unwrap().target_port,
            Some(IntOrString::String("http".to_string()))
        );
    }

    #[test]
    fn test_service_type_and_port() {
        let mut config = Configuration::default();
        config.service.service_type = ServiceType::LoadBalancer;
        config.service.port = 8080;

        let spec = generate_service(&spec_for(&config)).spec.unwrap();
        assert_eq!(spec.type_, Some("LoadBalancer".to_string()));
        assert_eq!(spec.ports.unwrap()[0].port, 8080);
    }

    #[test]
    fn test_service_selects_server_pods() {
        let spec = spec_for(&Configuration::default());
        let svc = generate_service(&spec);
        assert_eq!(svc.spec.unwrap().selector, Some(pod_selector_labels(&spec)));
    }
}
