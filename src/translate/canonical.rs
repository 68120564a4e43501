//! Canonical form of swarm service specs.
//!
//! Desired and observed services both go through these impls, so the diff
//! engine always compares trees of one schema. Labels match the Engine API
//! field names, which lets [`CanonicalValue::to_json`] produce request bodies
//! directly.

use crate::canonical::{CanonicalValue, Field, ToCanonical};
use crate::swarm::{
    ContainerSpec, EndpointSpec, GlobalService, NetworkAttachmentConfig, PortConfig,
    ReplicatedService, ServiceMode, ServiceSpec, TaskSpec, UpdateConfig,
};

impl ToCanonical for ServiceSpec {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::record(vec![
            Field::public("Name", self.name.to_canonical()),
            Field::public("Labels", self.labels.to_canonical()),
            Field::public("TaskTemplate", self.task_template.to_canonical()),
            Field::public("Mode", self.mode.to_canonical()),
            Field::public("UpdateConfig", self.update_config.to_canonical()),
            Field::public("Networks", self.networks.to_canonical()),
            Field::public("EndpointSpec", self.endpoint_spec.to_canonical()),
        ])
    }
}

impl ToCanonical for TaskSpec {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::record(vec![
            Field::public("ContainerSpec", self.container_spec.to_canonical()),
            // Bumped by the control plane on forced redeploys.
            Field::internal("ForceUpdate", self.force_update.to_canonical()),
        ])
    }
}

impl ToCanonical for ContainerSpec {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::record(vec![
            Field::public("Image", self.image.to_canonical()),
            Field::public("Labels", self.labels.to_canonical()),
            Field::public("Command", self.command.to_canonical()),
            Field::public("Args", self.args.to_canonical()),
            Field::public("Env", self.env.to_canonical()),
            Field::public("Dir", self.dir.to_canonical()),
            Field::public("User", self.user.to_canonical()),
        ])
    }
}

impl ToCanonical for ServiceMode {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::record(vec![
            Field::public("Replicated", self.replicated.to_canonical()),
            Field::public("Global", self.global.to_canonical()),
        ])
    }
}

impl ToCanonical for ReplicatedService {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::record(vec![Field::public("Replicas", self.replicas.to_canonical())])
    }
}

impl ToCanonical for GlobalService {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::record(Vec::new())
    }
}

impl ToCanonical for UpdateConfig {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::record(vec![
            Field::public("Parallelism", self.parallelism.to_canonical()),
            Field::public("Delay", self.delay.to_canonical()),
            Field::public("FailureAction", self.failure_action.to_canonical()),
        ])
    }
}

impl ToCanonical for NetworkAttachmentConfig {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::record(vec![
            Field::public("Target", self.target.to_canonical()),
            Field::public("Aliases", self.aliases.to_canonical()),
        ])
    }
}

impl ToCanonical for EndpointSpec {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::record(vec![
            Field::public("Mode", self.mode.to_canonical()),
            Field::public("Ports", self.ports.to_canonical()),
        ])
    }
}

impl ToCanonical for PortConfig {
    fn to_canonical(&self) -> CanonicalValue {
        CanonicalValue::record(vec![
            Field::public("Name", self.name.to_canonical()),
            Field::public("Protocol", self.protocol.to_canonical()),
            Field::public("TargetPort", self.target_port.to_canonical()),
            Field::public("PublishedPort", self.published_port.to_canonical()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::DiffEngine;

    fn spec() -> ServiceSpec {
        ServiceSpec {
            name: String::from("app_web"),
            task_template: TaskSpec {
                container_spec: ContainerSpec {
                    image: String::from("nginx:1"),
                    ..ContainerSpec::default()
                },
                force_update: 0,
            },
            mode: ServiceMode {
                replicated: Some(ReplicatedService { replicas: Some(1) }),
                global: None,
            },
            ..ServiceSpec::default()
        }
    }

    #[test]
    fn test_payload_uses_api_field_names() {
        let json = spec().to_canonical().to_json();

        assert_eq!(json["Name"], "app_web");
        assert_eq!(json["TaskTemplate"]["ContainerSpec"]["Image"], "nginx:1");
        assert_eq!(json["Mode"]["Replicated"]["Replicas"], 1);
        assert!(json["Mode"].get("Global").is_none());
        assert!(json.get("EndpointSpec").is_none());
    }

    #[test]
    fn test_force_update_is_not_a_difference() {
        let mut observed = spec();
        observed.task_template.force_update = 4;

        let report = DiffEngine::new()
            .diff(&observed.to_canonical(), &spec().to_canonical())
            .unwrap();
        assert!(!report.any_changed());
    }

    #[test]
    fn test_replica_change_is_reported_with_path() {
        let mut observed = spec();
        observed.mode.replicated = Some(ReplicatedService { replicas: Some(3) });

        let report = DiffEngine::new()
            .diff(&observed.to_canonical(), &spec().to_canonical())
            .unwrap();
        let lines: Vec<String> = report.changed().map(ToString::to_string).collect();
        assert_eq!(lines, [r#".Mode.Replicated.Replicas: "3" => "1""#]);
    }
}
