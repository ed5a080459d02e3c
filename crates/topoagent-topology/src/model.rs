//! Generic topology model: components, relations and instance-scoped
//! snapshots, with the wire field names collectors agree on.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifies one configured check target within a snapshot, so the same
/// check can run against several clusters/servers without mixing their
/// topology.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceKey {
    /// Instance type discriminator, e.g. `kubernetes`.
    #[serde(rename = "type")]
    pub instance_type: String,

    /// Target URL, for checks whose identity is the server they poll.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InstanceKey {
    pub fn new(instance_type: impl Into<String>) -> Self {
        Self {
            instance_type: instance_type.into(),
            url: None,
        }
    }

    pub fn with_url(instance_type: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            instance_type: instance_type.into(),
            url: Some(url.into()),
        }
    }
}

/// Named type descriptor attached to components and relations,
/// serialized as `{"name": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A topology entity (node, pod, container, configuration item) with
/// free-form attribute data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,

    #[serde(rename = "type")]
    pub component_type: TypeDescriptor,

    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Component {
    pub fn new(id: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component_type: TypeDescriptor::new(type_name),
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }
}

/// A directed edge between two components' identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "sourceId")]
    pub source_id: String,

    #[serde(rename = "targetId")]
    pub target_id: String,

    #[serde(rename = "type")]
    pub relation_type: TypeDescriptor,

    #[serde(default)]
    pub data: Map<String, Value>,
}

impl Relation {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            relation_type: TypeDescriptor::new(type_name),
            data: Map::new(),
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }
}

/// An instance-scoped topology snapshot.
///
/// Mirrors the collector emission protocol: a check opens the snapshot,
/// accumulates components and relations, and closes it. Consumers may
/// treat a snapshot without both markers as partial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub instance: InstanceKey,

    #[serde(rename = "startSnapshot")]
    pub start_snapshot: bool,

    #[serde(rename = "stopSnapshot")]
    pub stop_snapshot: bool,

    #[serde(default)]
    pub components: Vec<Component>,

    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl TopologySnapshot {
    /// Open a snapshot for `instance`.
    pub fn start(instance: InstanceKey) -> Self {
        Self {
            instance,
            start_snapshot: true,
            stop_snapshot: false,
            components: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Report a component.
    pub fn component(&mut self, component: Component) -> &mut Self {
        self.components.push(component);
        self
    }

    /// Report a relation.
    pub fn relation(&mut self, relation: Relation) -> &mut Self {
        self.relations.push(relation);
        self
    }

    /// Close the snapshot.
    pub fn stop(mut self) -> Self {
        self.stop_snapshot = true;
        self
    }

    /// Whether both markers are present.
    pub fn is_complete(&self) -> bool {
        self.start_snapshot && self.stop_snapshot
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_snapshot_accumulates_and_closes() {
        let mut snapshot = TopologySnapshot::start(InstanceKey::new("kubernetes"));
        assert!(!snapshot.is_complete());

        snapshot
            .component(Component::new("node-1", "KUBERNETES_NODE"))
            .component(Component::new("pod-9", "KUBERNETES_POD"))
            .relation(Relation::new("pod-9", "node-1", "HOSTED_ON"));

        let snapshot = snapshot.stop();
        assert!(snapshot.is_complete());
        assert_eq!(snapshot.components.len(), 2);
        assert_eq!(snapshot.relations.len(), 1);
    }

    #[test]
    fn test_component_serializes_wire_field_names() {
        let mut data = Map::new();
        data.insert("uid".to_string(), json!("abc-123"));
        let component = Component::new("pod-1", "KUBERNETES_POD").with_data(data);

        let value = serde_json::to_value(&component).unwrap();
        assert_eq!(value["id"], "pod-1");
        assert_eq!(value["type"]["name"], "KUBERNETES_POD");
        assert_eq!(value["data"]["uid"], "abc-123");
    }

    #[test]
    fn test_relation_serializes_wire_field_names() {
        let relation = Relation::new("container-5", "pod-1", "HOSTED_ON");

        let value = serde_json::to_value(&relation).unwrap();
        assert_eq!(value["sourceId"], "container-5");
        assert_eq!(value["targetId"], "pod-1");
        assert_eq!(value["type"]["name"], "HOSTED_ON");
    }

    #[test]
    fn test_instance_key_url_is_omitted_when_unset() {
        let bare = serde_json::to_value(InstanceKey::new("kubernetes")).unwrap();
        assert_eq!(bare, json!({"type": "kubernetes"}));

        let keyed =
            serde_json::to_value(InstanceKey::with_url("servicenow_cmdb", "https://cmdb.example"))
                .unwrap();
        assert_eq!(keyed["url"], "https://cmdb.example");
    }

    #[test]
    fn test_snapshot_round_trips_through_json() {
        let mut snapshot = TopologySnapshot::start(InstanceKey::with_url("mesos", "http://master:5050"));
        snapshot.component(Component::new("task-1", "MESOS_TASK"));
        let snapshot = snapshot.stop();

        let text = serde_json::to_string(&snapshot).unwrap();
        let back: TopologySnapshot = serde_json::from_str(&text).unwrap();
        assert_eq!(back, snapshot);
    }
}
