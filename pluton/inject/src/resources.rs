use std::collections::BTreeMap;

use k8s_openapi::{
    api::core::v1::ResourceRequirements, apimachinery::pkg::api::resource::Quantity,
};
use pluton_config::ResourcesConfig;

use crate::{
    error::{InjectError, ResourceField, Result},
    quantity::parse_quantity,
};

/// Parses a pair of raw quantities into a `ResourceList`.
///
/// Empty strings are left out. `None` when nothing is left, so that the container doesn't get an
/// empty `limits: {}` / `requests: {}`.
fn resource_list(
    entries: [(ResourceField, &str); 2],
) -> Result<Option<BTreeMap<String, Quantity>>> {
    let list = entries
        .into_iter()
        .filter(|(_, raw)| !raw.is_empty())
        .map(|(field, raw)| {
            parse_quantity(raw)
                .map(|quantity| (field.resource_name().to_owned(), quantity))
                .map_err(|source| InjectError::InvalidQuantity {
                    field,
                    raw: raw.to_owned(),
                    source,
                })
        })
        .collect::<Result<BTreeMap<_, _>>>()?;

    Ok((!list.is_empty()).then_some(list))
}

/// Builds the container's resource requirements from the four raw quantities.
///
/// A field is present only if its raw string is non-empty. The first invalid quantity (in
/// argument order) fails the whole call.
pub fn resolve(
    limits_cpu: &str,
    limits_mem: &str,
    requests_cpu: &str,
    requests_mem: &str,
) -> Result<ResourceRequirements> {
    let limits = resource_list([
        (ResourceField::LimitsCpu, limits_cpu),
        (ResourceField::LimitsMemory, limits_mem),
    ])?;
    let requests = resource_list([
        (ResourceField::RequestsCpu, requests_cpu),
        (ResourceField::RequestsMemory, requests_mem),
    ])?;

    Ok(ResourceRequirements {
        limits,
        requests,
        ..Default::default()
    })
}

/// [`resolve`] for an agent's [`ResourcesConfig`].
pub fn resolve_config(resources: &ResourcesConfig) -> Result<ResourceRequirements> {
    resolve(
        &resources.limits_cpu,
        &resources.limits_mem,
        &resources.requests_cpu,
        &resources.requests_mem,
    )
}
