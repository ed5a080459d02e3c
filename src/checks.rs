//! Built-in process-inventory check: reports the agent process and its
//! configured worker command as a tiny topology. Mostly useful for
//! exercising the emission pipeline end to end.

use serde_json::{Map, json};

use topoagent_topology::{
    CheckError, Component, InstanceConfig, InstanceKey, Relation, TopologyCheck, TopologySnapshot,
};

use crate::agent::AGENT_NAME;

pub(crate) struct ProcessInventoryCheck {
    worker: Vec<String>,
}

impl ProcessInventoryCheck {
    pub(crate) fn new(worker: Vec<String>) -> Self {
        Self { worker }
    }
}

impl TopologyCheck for ProcessInventoryCheck {
    fn instance_type(&self) -> &str {
        "process_inventory"
    }

    fn check(&mut self, instance: &InstanceConfig) -> Result<TopologySnapshot, CheckError> {
        let mut snapshot = TopologySnapshot::start(InstanceKey::new(self.instance_type()));

        let agent_id = format!("process:{}", std::process::id());
        let mut agent_data = Map::new();
        agent_data.insert("name".to_string(), json!(AGENT_NAME));
        agent_data.insert("pid".to_string(), json!(std::process::id()));
        agent_data.insert("tags".to_string(), json!(instance.tags));
        snapshot.component(Component::new(&agent_id, "AGENT_PROCESS").with_data(agent_data));

        if let Some(program) = self.worker.first() {
            let worker_id = format!("command:{program}");
            let mut worker_data = Map::new();
            worker_data.insert("command".to_string(), json!(self.worker));
            snapshot.component(Component::new(&worker_id, "WORKER_COMMAND").with_data(worker_data));
            snapshot.relation(Relation::new(&agent_id, &worker_id, "EXECUTES"));
        }

        Ok(snapshot.stop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_without_worker_is_one_component() {
        let mut check = ProcessInventoryCheck::new(Vec::new());
        let snapshot = check.check(&InstanceConfig::default()).unwrap();

        assert!(snapshot.is_complete());
        assert_eq!(snapshot.components.len(), 1);
        assert!(snapshot.relations.is_empty());
        assert_eq!(snapshot.components[0].component_type.name, "AGENT_PROCESS");
    }

    #[test]
    fn test_inventory_links_agent_to_worker() {
        let worker = vec!["sts-check-runner".to_string(), "--poll".to_string()];
        let mut check = ProcessInventoryCheck::new(worker);
        let snapshot = check.check(&InstanceConfig::default()).unwrap();

        assert_eq!(snapshot.components.len(), 2);
        assert_eq!(snapshot.relations.len(), 1);
        let relation = &snapshot.relations[0];
        assert_eq!(relation.relation_type.name, "EXECUTES");
        assert_eq!(relation.target_id, "command:sts-check-runner");
    }

    #[test]
    fn test_instance_tags_land_in_agent_data() {
        let instance = InstanceConfig {
            tags: vec!["env:prod".to_string()],
            ..Default::default()
        };
        let mut check = ProcessInventoryCheck::new(Vec::new());
        let snapshot = check.check(&instance).unwrap();
        assert_eq!(snapshot.components[0].data["tags"], json!(["env:prod"]));
    }
}
