//! Bundle to swarm service translation.

use std::collections::BTreeMap;

use tracing::debug;

use crate::canonical::{Entity, EntitySet, ToCanonical};
use crate::config::{BundleService, Bundlefile};
use crate::planner::{NetworkInfo, NetworkSpec};
use crate::swarm::{
    ContainerSpec, EndpointSpec, NAMESPACE_LABEL, NetworkAttachmentConfig, PortConfig,
    ReplicatedService, ServiceMode, ServiceSpec, TaskSpec, UpdateConfig,
};

/// Replica count given to every bundle service.
const DEFAULT_REPLICAS: u64 = 1;

/// Resolution mode the daemon fills in when none is given.
const ENDPOINT_MODE: &str = "vip";

/// Driver for stack networks.
const NETWORK_DRIVER: &str = "overlay";

/// Translates a stack's bundle into desired entities.
#[derive(Debug, Clone)]
pub struct StackTranslator {
    scope: String,
}

/// Desired state of one stack.
#[derive(Debug, Clone, Default)]
pub struct TranslatedStack {
    /// Desired services.
    pub services: EntitySet,
    /// Networks the services need, sorted by name.
    pub networks: Vec<NetworkSpec>,
}

impl StackTranslator {
    /// Creates a translator for `scope`.
    #[must_use]
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    /// Fully-qualified name of a stack object.
    #[must_use]
    pub fn scoped(&self, name: &str) -> String {
        format!("{}_{name}", self.scope)
    }

    /// Labels every object of the stack carries.
    #[must_use]
    pub fn namespace_labels(&self) -> BTreeMap<String, String> {
        BTreeMap::from([(NAMESPACE_LABEL.to_string(), self.scope.clone())])
    }

    /// Translates a bundle.
    ///
    /// `existing` lists the stack networks already on the control plane;
    /// attachments to them are expressed by id, the way the control plane
    /// reports them back.
    #[must_use]
    pub fn translate(&self, bundle: &Bundlefile, existing: &[NetworkInfo]) -> TranslatedStack {
        let services = bundle
            .services
            .iter()
            .map(|(name, service)| {
                let spec = self.service_spec(name, service, existing);
                Entity::new(spec.name.clone(), spec.to_canonical())
            })
            .collect::<EntitySet>();

        let networks = bundle
            .network_names()
            .iter()
            .map(|net| NetworkSpec {
                name: self.scoped(net),
                driver: String::from(NETWORK_DRIVER),
                labels: self.namespace_labels(),
            })
            .collect::<Vec<_>>();

        debug!(
            "Translated stack {} into {} services and {} networks",
            self.scope,
            services.len(),
            networks.len()
        );
        TranslatedStack { services, networks }
    }

    /// Builds the swarm spec of one bundle service.
    #[must_use]
    pub fn service_spec(
        &self,
        name: &str,
        service: &BundleService,
        existing: &[NetworkInfo],
    ) -> ServiceSpec {
        let mut labels = service.service_labels.clone();
        labels.extend(self.namespace_labels());

        let networks = service
            .networks
            .iter()
            .map(|net| {
                let target = self.scoped(net);
                let target = existing
                    .iter()
                    .find(|n| n.name == target)
                    .map_or(target, |n| n.id.clone());
                NetworkAttachmentConfig {
                    target,
                    aliases: vec![name.to_string()],
                }
            })
            .collect();

        let ports: Vec<PortConfig> = service
            .ports
            .iter()
            .map(|p| PortConfig {
                name: String::new(),
                protocol: if p.protocol.is_empty() {
                    String::from("tcp")
                } else {
                    p.protocol.clone()
                },
                target_port: p.port,
                published_port: p.published_port.unwrap_or(0),
            })
            .collect();

        ServiceSpec {
            name: self.scoped(name),
            labels,
            task_template: TaskSpec {
                container_spec: ContainerSpec {
                    image: service.image.clone(),
                    labels: service.labels.clone(),
                    command: service.command.clone(),
                    args: service.args.clone(),
                    env: service.env.clone(),
                    dir: service.working_dir.clone().unwrap_or_default(),
                    user: service.user.clone().unwrap_or_default(),
                },
                force_update: 0,
            },
            mode: ServiceMode {
                replicated: Some(ReplicatedService {
                    replicas: Some(DEFAULT_REPLICAS),
                }),
                global: None,
            },
            update_config: Some(UpdateConfig {
                parallelism: 1,
                delay: 0,
                failure_action: String::from("pause"),
            }),
            networks,
            endpoint_spec: Some(EndpointSpec {
                mode: String::from(ENDPOINT_MODE),
                ports,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BundlePort;

    fn bundle() -> Bundlefile {
        let mut bundle = Bundlefile::new();
        bundle.services.insert(
            String::from("web"),
            BundleService {
                image: String::from("nginx:1"),
                networks: vec![String::from("front"), String::from("back")],
                ports: vec![BundlePort {
                    protocol: String::new(),
                    port: 80,
                    published_port: None,
                }],
                service_labels: BTreeMap::from([(String::from("tier"), String::from("edge"))]),
                ..BundleService::default()
            },
        );
        bundle.services.insert(
            String::from("db"),
            BundleService {
                image: String::from("postgres:9.6"),
                networks: vec![String::from("back")],
                user: Some(String::from("postgres")),
                ..BundleService::default()
            },
        );
        bundle
    }

    #[test]
    fn test_service_spec_defaults() {
        let translator = StackTranslator::new("app");
        let spec = translator.service_spec("web", &bundle().services["web"], &[]);

        assert_eq!(spec.name, "app_web");
        assert_eq!(spec.labels[NAMESPACE_LABEL], "app");
        assert_eq!(spec.labels["tier"], "edge");
        assert_eq!(spec.mode.replicated.and_then(|r| r.replicas), Some(1));
        assert_eq!(spec.update_config.map(|u| u.failure_action).as_deref(), Some("pause"));

        let endpoint = spec.endpoint_spec.unwrap();
        assert_eq!(endpoint.mode, "vip");
        assert_eq!(endpoint.ports[0].protocol, "tcp");
        assert_eq!(endpoint.ports[0].target_port, 80);
    }

    #[test]
    fn test_portless_service_keeps_vip_endpoint() {
        let spec = StackTranslator::new("app").service_spec("db", &bundle().services["db"], &[]);

        let endpoint = spec.endpoint_spec.unwrap();
        assert_eq!(endpoint.mode, "vip");
        assert!(endpoint.ports.is_empty());
        assert_eq!(spec.task_template.container_spec.user, "postgres");
        assert_eq!(spec.task_template.container_spec.dir, "");
    }

    #[test]
    fn test_existing_networks_are_referenced_by_id() {
        let existing = [NetworkInfo {
            id: String::from("n-back"),
            name: String::from("app_back"),
        }];
        let spec =
            StackTranslator::new("app").service_spec("web", &bundle().services["web"], &existing);

        let targets: Vec<&str> = spec.networks.iter().map(|n| n.target.as_str()).collect();
        assert_eq!(targets, ["app_front", "n-back"]);
        assert_eq!(spec.networks[0].aliases, ["web"]);
    }

    #[test]
    fn test_translate_collects_unique_networks() {
        let stack = StackTranslator::new("app").translate(&bundle(), &[]);

        let names: Vec<&str> = stack.services.names().collect();
        assert_eq!(names, ["app_db", "app_web"]);

        let networks: Vec<&str> = stack.networks.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(networks, ["app_back", "app_front"]);
        assert_eq!(stack.networks[0].driver, "overlay");
        assert_eq!(stack.networks[0].labels[NAMESPACE_LABEL], "app");
    }

    #[test]
    fn test_translation_is_deterministic() {
        let translator = StackTranslator::new("app");
        let a = translator.translate(&bundle(), &[]);
        let b = translator.translate(&bundle(), &[]);

        assert_eq!(a.services, b.services);
    }
}
