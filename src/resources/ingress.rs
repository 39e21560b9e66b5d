//! Ingress generation for the ZenML server.
//!
//! Routes `ingress.path` on `ingress.host` (or any host when unset) to the
//! server Service. TLS is terminated at the ingress when enabled.

use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};

use crate::resolver::ResolvedDeploymentSpec;
use crate::resources::common::{non_empty_map, object_meta};

/// Path type used for the server route
const PATH_TYPE: &str = "Prefix";

/// Generate the Ingress, if enabled.
pub fn generate_ingress(spec: &ResolvedDeploymentSpec) -> Option<Ingress> {
    let ingress = &spec.config().ingress;
    if !ingress.enabled {
        return None;
    }

    let fullname = &spec.names().fullname;
    let mut metadata = object_meta(spec, fullname);
    metadata.annotations = non_empty_map(&ingress.annotations);

    let tls = ingress.tls.enabled.then(|| {
        vec![IngressTLS {
            hosts: ingress.host.clone().map(|host| vec![host]),
            secret_name: Some(ingress.tls.secret_name.clone()),
        }]
    });

    Some(Ingress {
        metadata,
        spec: Some(IngressSpec {
            ingress_class_name: ingress.class_name.clone(),
            tls,
            rules: Some(vec![IngressRule {
                host: ingress.host.clone(),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some(ingress.path.clone()),
                        path_type: PATH_TYPE.to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: fullname.clone(),
                                port: Some(ServiceBackendPort {
                                    number: Some(spec.config().service.port),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    })
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
    use crate::config::{Configuration, Release};
    use crate::resolver::resolve;

    fn spec_for(config: &Configuration) -> ResolvedDeploymentSpec {
        resolve(config, &Release::new("prod", "zenml")).unwrap()
    }

    fn ingress_config() -> Configuration {
        let mut config = Configuration::default();
        config.ingress.enabled = true;
        config.ingress.host = Some("zenml.example.com".to_string());
        config
    }

    #[test]
    fn test_disabled_ingress() {
        assert!(generate_ingress(&spec_for(&Configuration::default())).is_none());
    }

    #[test]
    fn test_generate_ingress() {
        let ingress = generate_ingress(&spec_for(&ingress_config())).unwrap();
        assert_eq!(ingress.metadata.name, Some("prod-zenml".to_string()));
        assert!(ingress.metadata.annotations.is_none());

        let spec = ingress.spec.unwrap();
        assert!(spec.tls.is_none());
        let rule = &spec.rules.unwrap()[0];
        assert_eq!(rule.host, Some("zenml.example.com".to_string()));

        let path = &rule.http.as_ref().unwrap().paths[0];
        assert_eq!(path.path, Some("/".to_string()));
        assert_eq!(path.path_type, "Prefix");
        let backend = path.backend.service.as_ref().unwrap();
        assert_eq!(backend.name, "prod-zenml");
        assert_eq!(backend.port.as_ref().unwrap().number, Some(80));
    }

    #[test]
    fn test_ingress_tls_and_class() {
        let mut config = ingress_config();
        config.ingress.tls.enabled = true;
        config.ingress.class_name = Some("nginx".to_string());
        config.ingress.annotations.insert(
            "cert-manager.io/cluster-issuer".to_string(),
            "letsencrypt".to_string(),
        );

        let ingress = generate_ingress(&spec_for(&config)).unwrap();
        assert_eq!(
            ingress.metadata.annotations.unwrap().get("cert-manager.io/cluster-issuer"),
            Some(&"letsencrypt".to_string())
        );
        let spec = ingress.spec.unwrap();
        assert_eq!(spec.ingress_class_name, Some("nginx".to_string()));
        let tls = &spec.tls.unwrap()[0];
        assert_eq!(tls.hosts, Some(vec!["zenml.example.com".to_string()]));
        assert_eq!(tls.secret_name, Some("zenml-tls-certs".to_string()));
    }

    #[test]
    fn test_hostless_rule() {
        let mut config = ingress_config();
        config.ingress.host = None;
        let ingress = generate_ingress(&spec_for(&config)).unwrap();
        assert_eq!(ingress.spec.unwrap().rules.unwrap()[0].host, None);
    }
}
