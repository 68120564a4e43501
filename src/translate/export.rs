//! Rebuilding bundles from live services.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{BUNDLE_EXTENSION, BundlePort, BundleService, Bundlefile};
use crate::error::Result;
use crate::swarm::Service;

/// Stack assigned to services without a namespace label.
pub const DEFAULT_EXPORT_STACK: &str = "services";

/// Groups live services into one bundle per stack.
#[must_use]
pub fn export_bundles(services: &[Service]) -> BTreeMap<String, Bundlefile> {
    let mut bundles: BTreeMap<String, Bundlefile> = BTreeMap::new();

    for service in services {
        let stack = service.stack().unwrap_or(DEFAULT_EXPORT_STACK);
        let name = service
            .spec
            .name
            .strip_prefix(&format!("{stack}_"))
            .unwrap_or(&service.spec.name)
            .to_string();

        bundles
            .entry(stack.to_string())
            .or_default()
            .services
            .insert(name, bundle_service(service));
    }

    bundles
}

/// Converts one live service into its bundle form.
#[must_use]
pub fn bundle_service(service: &Service) -> BundleService {
    let container = &service.spec.task_template.container_spec;

    BundleService {
        image: container.image.clone(),
        command: container.command.clone(),
        args: container.args.clone(),
        env: container.env.clone(),
        labels: container.labels.clone(),
        service_labels: service.spec.labels.clone(),
        ports: service
            .endpoint
            .ports
            .iter()
            .map(|p| BundlePort {
                protocol: p.protocol.clone(),
                port: p.target_port,
                published_port: Some(p.published_port).filter(|p| *p != 0),
            })
            .collect(),
        working_dir: Some(container.dir.clone()).filter(|d| !d.is_empty()),
        user: Some(container.user.clone()).filter(|u| !u.is_empty()),
        networks: service
            .spec
            .networks
            .iter()
            .flat_map(|n| n.aliases.iter().cloned())
            .collect(),
    }
}

/// Writes each bundle to `<dir>/<stack>.dab`.
///
/// # Errors
///
/// Returns an error if a file cannot be written.
pub fn write_bundles(dir: &Path, bundles: &BTreeMap<String, Bundlefile>) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(bundles.len());
    for (stack, bundle) in bundles {
        let path = dir.join(format!("{stack}.{BUNDLE_EXTENSION}"));
        let mut json = serde_json::to_vec_pretty(bundle)?;
        json.push(b'\n');
        std::fs::write(&path, json)?;
        info!("Exported stack {stack} to {}", path.display());
        written.push(path);
    }
    Ok(written)
}
