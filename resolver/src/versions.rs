//! Multi-key resolution: every key is its own parameter, and the value for a
//! given version is found in the parameter's history by its description.
use crate::gateway::{GatewayError, ParameterStore};
use crate::metrics_defs::PARAMETERS_OMITTED;
use crate::types::{Parameter, ParameterVersion, ResolvedDocument};
use shared::counter;

/// Lists the parameters in the `scope_prefix` namespace and loads their
/// versions.
///
/// Only names below `scope_prefix.` belong to the scope, so a sibling
/// application sharing the prefix (`billing-worker` next to `billing`) is not
/// listed. A parameter whose versions could not be loaded is left out. A
/// failed listing yields no parameters at all.
pub async fn resolve_history(store: &dyn ParameterStore, scope_prefix: &str) -> Vec<Parameter> {
    let namespace = format!("{scope_prefix}.");
    let summaries = match store.list_by_filter(&namespace).await {
        Ok(summaries) => summaries,
        Err(e) => {
            tracing::error!(prefix = scope_prefix, error = %e, "Encountered an error listing parameters");
            return Vec::new();
        }
    };

    let mut parameters = Vec::with_capacity(summaries.len());
    for summary in summaries {
        if !summary.name.starts_with(&namespace) {
            tracing::warn!(parameter = %summary.name, prefix = scope_prefix, "Skipping parameter outside of scope");
            continue;
        }
        match load_versions(store, &summary.name).await {
            Ok(versions) => parameters.push(Parameter {
                name: summary.name,
                versions,
            }),
            Err(e) => {
                tracing::error!(parameter = %summary.name, error = %e, "Could not load parameter history");
            }
        }
    }
    parameters
}

/// Current value first, labelled with the description from an exact-name
/// listing, followed by the history in store order.
async fn load_versions(
    store: &dyn ParameterStore,
    name: &str,
) -> Result<Vec<ParameterVersion>, GatewayError> {
    let history = store.get_history(name).await?;
    let current = store.get_value(name).await?;

    let current_label = store
        .list_by_filter(name)
        .await?
        .into_iter()
        .find(|summary| summary.name == name)
        .ok_or_else(|| GatewayError::MissingValue {
            name: name.to_string(),
        })?
        .description
        .unwrap_or_default();

    let mut versions = Vec::with_capacity(history.len() + 1);
    versions.push(ParameterVersion::new(current, current_label));
    versions.extend(
        history
            .into_iter()
            .map(|entry| ParameterVersion::new(entry.value, entry.description.unwrap_or_default())),
    );
    Ok(versions)
}

/// Builds the document for `version`, keyed by each parameter's short key.
/// Parameters without a matching version are left out.
pub fn select_version(parameters: &[Parameter], version: &str) -> ResolvedDocument {
    let mut document = ResolvedDocument::new();
    for parameter in parameters {
        match parameter.find_version(version) {
            Some(matched) => {
                document.insert(parameter.short_key().to_string(), matched.value.clone());
            }
            None => {
                counter!(PARAMETERS_OMITTED).increment(1);
                tracing::warn!(
                    parameter = %parameter.name,
                    version,
                    "Could not find version for parameter"
                );
            }
        }
    }
    document
}
