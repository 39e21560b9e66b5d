//! ServiceAccount generation.

use k8s_openapi::api::core::v1::ServiceAccount;

use crate::resolver::ResolvedDeploymentSpec;
use crate::resources::common::{non_empty_map, object_meta};

/// Generate the server ServiceAccount when `serviceAccount.create` is set.
pub fn generate_service_account(spec: &ResolvedDeploymentSpec) -> Option<ServiceAccount> {
    let service_account = &spec.config().service_account;
    if !service_account.create {
        return None;
    }

    let mut metadata = object_meta(spec, &spec.names().service_account);
    metadata.annotations = non_empty_map(&service_account.annotations);

    Some(ServiceAccount {
        metadata,
        ..Default::default()
    })
}
