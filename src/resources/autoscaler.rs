//! HorizontalPodAutoscaler generation.
//!
//! Only produced when the resolver hands the replica count to an autoscaler,
//! which requires an external database.

use k8s_openapi::api::autoscaling::v2::{
    CrossVersionObjectReference, HorizontalPodAutoscaler, HorizontalPodAutoscalerSpec,
    MetricSpec, MetricTarget, ResourceMetricSource,
};

use crate::resolver::ResolvedDeploymentSpec;
use crate::resources::common::object_meta;

/// Generate the autoscaler targeting the server Deployment.
pub fn generate_autoscaler(spec: &ResolvedDeploymentSpec) -> Option<HorizontalPodAutoscaler> {
    let autoscaling = spec.autoscaling()?;
    let fullname = &spec.names().fullname;

    let metrics: Vec<MetricSpec> = [
        ("cpu", autoscaling.target_cpu_utilization_percentage),
        ("memory", autoscaling.target_memory_utilization_percentage),
    ]
    .into_iter()
    .filter_map(|(resource, target)| {
        target
            .filter(|value| *value > 0)
            .map(|value| utilization_metric(resource, value))
    })
    .collect();

    Some(HorizontalPodAutoscaler {
        metadata: object_meta(spec, fullname),
        spec: Some(HorizontalPodAutoscalerSpec {
            scale_target_ref: CrossVersionObjectReference {
                api_version: Some("apps/v1".to_string()),
                kind: "Deployment".to_string(),
                name: fullname.clone(),
            },
            min_replicas: Some(autoscaling.min_replicas),
            max_replicas: autoscaling.max_replicas,
            metrics: if metrics.is_empty() {
                None
            } else {
                Some(metrics)
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Average utilization target for a container resource.
fn utilization_metric(resource: &str, average_utilization: i32) -> MetricSpec {
    MetricSpec {
        type_: "Resource".to_string(),
        resource: Some(ResourceMetricSource {
            name: resource.to_string(),
            target: MetricTarget {
                type_: "Utilization".to_string(),
                average_utilization: Some(average_utilization),
                ..Default::default()
            },
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
    use crate::config::{Configuration, DatabaseSpec, Release};
    use crate::resolver::resolve;

    fn autoscaled(url: Option<&str>) -> Configuration {
        let mut config = Configuration {
            database: DatabaseSpec {
                url: url.map(str::to_string),
                ..Default::default()
            },
            ..Default::default()
        };
        config.autoscaling.enabled = true;
        config.autoscaling.min_replicas = 2;
        config.autoscaling.max_replicas = 6;
        config
    }

    #[test]
    fn test_generate_autoscaler() {
        let config = autoscaled(Some("mysql://db/zenml"));
        let spec = resolve(&config, &Release::new("prod", "ns")).unwrap();
        let hpa = generate_autoscaler(&spec).unwrap();
        let hpa_spec = hpa.spec.unwrap();
        assert_eq!(hpa_spec.scale_target_ref.kind, "Deployment");
        assert_eq!(hpa_spec.scale_target_ref.name, "prod-zenml");
        assert_eq!(hpa_spec.min_replicas, Some(2));
        assert_eq!(hpa_spec.max_replicas, 6);

        let metrics = hpa_spec.metrics.unwrap();
        assert_eq!(metrics.len(), 1);
        let resource = metrics[0].resource.as_ref().unwrap();
        assert_eq!(resource.name, "cpu");
        assert_eq!(resource.target.average_utilization, Some(80));
    }

    #[test]
    fn test_memory_target() {
        let mut config = autoscaled(Some("mysql://db/zenml"));
        config.autoscaling.target_cpu_utilization_percentage = None;
        config.autoscaling.target_memory_utilization_percentage = Some(70);
        let spec = resolve(&config, &Release::default()).unwrap();
        let metrics = generate_autoscaler(&spec).unwrap().spec.unwrap().metrics.unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].resource.as_ref().unwrap().name, "memory");
    }

    #[test]
    fn test_zero_cpu_target_gives_memory_only() {
        let config = crate::config::ValuesLoader::new()
            .unwrap()
            .with_yaml(
                "database:\n  url: mysql://db/zenml\nautoscaling:\n  enabled: true\n  \
                 targetCPUUtilizationPercentage: 0\n  targetMemoryUtilizationPercentage: 70\n",
            )
            .unwrap()
            .build()
            .unwrap();
        let spec = resolve(&config, &Release::default()).unwrap();
        let metrics = generate_autoscaler(&spec).unwrap().spec.unwrap().metrics.unwrap();
        assert_eq!(metrics.len(), 1);
        let resource = metrics[0].resource.as_ref().unwrap();
        assert_eq!(resource.name, "memory");
        assert_eq!(resource.target.average_utilization, Some(70));
    }

    #[test]
    fn test_no_autoscaler_without_database() {
        let spec = resolve(&autoscaled(None), &Release::default()).unwrap();
        assert!(generate_autoscaler(&spec).is_none());
    }
}
